//! The bottleneck: receives units from every sender, queues them per destination, and forwards
//! one unit per service interval.

mod queue;
mod scheduler;

pub use queue::BoundedQueue;
pub use scheduler::{Admission, QueueStats, RouterScheduler};

use std::net;
use std::time;

use crate::addr;
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::socket;

const REPORT_INTERVAL_DEFAULT: time::Duration = time::Duration::from_secs(1);

/// Configuration for a [`Router`] object.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to receive units on.
    pub bind_addr: net::SocketAddr,

    /// Address of receiver *k* at index `k - 1`.
    pub receiver_addrs: Vec<net::SocketAddr>,

    /// Number of queues. One queue is shared by every destination; otherwise receiver *k* is
    /// served by queue `k - 1`, in priority order.
    pub queue_count: usize,

    /// Capacity of each queue, in units.
    pub queue_capacity: usize,

    /// Time to forward one unit.
    pub service_interval: time::Duration,

    /// Interval between statistics reports.
    pub report_interval: time::Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: (net::Ipv4Addr::UNSPECIFIED, addr::ROUTER_PORT).into(),
            receiver_addrs: Vec::new(),
            queue_count: 1,
            queue_capacity: 64,
            service_interval: time::Duration::from_millis(10),
            report_interval: REPORT_INTERVAL_DEFAULT,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.queue_count == 0 {
            return Err(Error::Config("queue count must be nonzero"));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue capacity must be nonzero"));
        }
        if self.service_interval.is_zero() {
            return Err(Error::Config("service interval must be nonzero"));
        }
        if self.report_interval.is_zero() {
            return Err(Error::Config("report interval must be nonzero"));
        }
        if self.receiver_addrs.is_empty() {
            return Err(Error::Config("no receivers configured"));
        }
        if self.queue_count > 1 && self.queue_count > self.receiver_addrs.len() {
            return Err(Error::Config("more queues than receivers"));
        }
        Ok(())
    }
}

/// A router process: one socket, one scheduler, one thread.
pub struct Router {
    config: Config,
    socket_tx: socket::SocketTx,
    socket_rx: socket::SocketRx,
    scheduler: RouterScheduler,
    next_tick: time::Instant,
    next_report: time::Instant,
    malformed_count: u64,
    unknown_dest_count: u64,
}

impl Router {
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let (socket_tx, socket_rx) = socket::bind(config.bind_addr)?;

        let now = time::Instant::now();

        let scheduler = RouterScheduler::new(config.queue_count, config.queue_capacity);

        tracing::info!(
            addr = %socket_rx.local_addr(),
            queues = config.queue_count,
            capacity = config.queue_capacity,
            service_ms = config.service_interval.as_secs_f64() * 1000.0,
            "router listening"
        );

        Ok(Self {
            next_tick: now + config.service_interval,
            next_report: now + config.report_interval,
            config,
            socket_tx,
            socket_rx,
            scheduler,
            malformed_count: 0,
            unknown_dest_count: 0,
        })
    }

    pub fn local_addr(&self) -> net::SocketAddr {
        self.socket_rx.local_addr()
    }

    pub fn scheduler(&self) -> &RouterScheduler {
        &self.scheduler
    }

    /// Units discarded because no queue or address serves their receiver id.
    pub fn unroutable_count(&self) -> u64 {
        self.unknown_dest_count + self.scheduler.unroutable_count()
    }

    /// Well-formed units received, whether or not they were queued.
    pub fn arrival_count(&self) -> u64 {
        self.unknown_dest_count + self.scheduler.arrival_count()
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed_count
    }

    fn destination(&self, receiver_id: u32) -> Option<net::SocketAddr> {
        let index = receiver_id.checked_sub(1)? as usize;
        self.config.receiver_addrs.get(index).copied()
    }

    fn handle_datagram(&mut self, decoded: Result<Packet>, source_addr: net::SocketAddr) {
        let packet = match decoded {
            Ok(packet) => packet,
            Err(err) => {
                self.malformed_count += 1;
                tracing::warn!(%source_addr, "discarding datagram: {err}");
                return;
            }
        };

        let (seq, sender_id, receiver_id) = (packet.seq, packet.sender_id, packet.receiver_id);

        if self.destination(receiver_id).is_none() {
            self.unknown_dest_count += 1;
            tracing::warn!(seq, sender_id, receiver_id, "no route to receiver");
            return;
        }

        match self.scheduler.enqueue(packet) {
            Admission::Queued(queue) => {
                tracing::trace!(seq, sender_id, queue, len = self.scheduler.len(queue), "queued");
            }
            Admission::Dropped(queue) => {
                tracing::debug!(
                    seq,
                    sender_id,
                    queue,
                    drops = self.scheduler.drop_count(queue),
                    "queue full, dropped"
                );
            }
            Admission::Unroutable => {
                tracing::warn!(seq, sender_id, receiver_id, "no queue for receiver");
            }
        }
    }

    /// Reads and enqueues as many units as possible without blocking.
    fn handle_datagrams(&mut self) -> Result<()> {
        loop {
            let (decoded, source_addr) = match self.socket_rx.try_read()? {
                Some((bytes, source_addr)) => (Packet::decode(bytes), source_addr),
                None => return Ok(()),
            };

            self.handle_datagram(decoded, source_addr);
        }
    }

    /// Reads and enqueues as many units as possible, waiting up to `wait_timeout` for the first.
    fn handle_datagrams_wait(&mut self, wait_timeout: time::Duration) -> Result<()> {
        if self.socket_rx.wait_readable(Some(wait_timeout))? {
            self.handle_datagrams()?;
        }

        Ok(())
    }

    fn process_tick(&mut self) -> Result<()> {
        if let Some((queue, packet)) = self.scheduler.tick() {
            // Routed units always have a destination
            if let Some(dest_addr) = self.destination(packet.receiver_id) {
                self.socket_tx.send(&packet.encode(), &dest_addr)?;

                tracing::trace!(seq = packet.seq, queue, %dest_addr, "forwarded");
            }
        }

        Ok(())
    }

    fn report(&self) {
        for queue in 0..self.scheduler.queue_count() {
            if let Some(stats) = self.scheduler.stats(queue) {
                tracing::info!(
                    queue,
                    len = stats.len,
                    capacity = stats.capacity,
                    forwarded = stats.forwarded,
                    drops = stats.drops,
                    avg_len = stats.avg_len.unwrap_or(0.0),
                    "queue stats"
                );
            }
        }

        tracing::info!(
            arrivals = self.arrival_count(),
            unroutable = self.unroutable_count(),
            malformed = self.malformed_count,
            "router stats"
        );
    }

    /// Runs one iteration of the router loop: waits up to `max_wait` (or until the next service
    /// tick, whichever is sooner) for arrivals, enqueues them, then serves the queues if a tick is
    /// due.
    pub fn poll(&mut self, max_wait: time::Duration) -> Result<()> {
        let now = time::Instant::now();

        let until_event = self
            .next_tick
            .min(self.next_report)
            .saturating_duration_since(now);

        self.handle_datagrams_wait(max_wait.min(until_event))?;

        let now = time::Instant::now();

        if now >= self.next_tick {
            self.process_tick()?;

            // One unit per interval; idle time does not accumulate into a burst
            self.next_tick = (self.next_tick + self.config.service_interval).max(now);
        }

        if now >= self.next_report {
            self.report();
            self.next_report = now + self.config.report_interval;
        }

        Ok(())
    }

    /// Serves forever, or until a socket fault.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll(self.config.report_interval)?;
        }
    }
}
