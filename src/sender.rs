//! A traffic source.
//!
//! In the default mode the sender runs Go-Back-N over a [`SendWindow`]: departures are paced by
//! exponentially distributed gaps, a full window blocks until an acknowledgment or the
//! retransmission deadline, and acknowledgments are drained in batches. In open-loop mode it is a
//! plain Poisson source that never looks at acknowledgments.

use std::net;
use std::time;

use crate::addr;
use crate::clock::Timestamp;
use crate::delay::DelayModel;
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::socket;
use crate::window::{AckOutcome, SendWindow, SendWindowConfig};

const MEAN_INTERVAL_MAX_MS: f64 = 60_000.0;

/// Configuration for a [`Sender`] object.
#[derive(Clone, Debug)]
pub struct Config {
    /// Window parameters, including this sender's id and its destination receiver id.
    pub window: SendWindowConfig,

    /// Address acknowledgments are received on.
    pub bind_addr: net::SocketAddr,

    /// Address of the router all units are sent through.
    pub router_addr: net::SocketAddr,

    /// Mean gap between departures, in milliseconds.
    pub mean_interval_ms: f64,

    /// Send sequentially numbered units without waiting for acknowledgments.
    pub open_loop: bool,

    /// Stop after this long. Runs until a socket fault if unset.
    pub run_for: Option<time::Duration>,

    /// Interval between statistics reports.
    pub report_interval: time::Duration,

    /// Seed for the pacing delays. Drawn from entropy if unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: Default::default(),
            bind_addr: (net::Ipv4Addr::UNSPECIFIED, addr::SENDER_PORT_BASE).into(),
            router_addr: (net::Ipv4Addr::LOCALHOST, addr::ROUTER_PORT).into(),
            mean_interval_ms: 10.0,
            open_loop: false,
            run_for: None,
            report_interval: time::Duration::from_secs(1),
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;

        if !(self.mean_interval_ms >= 0.0 && self.mean_interval_ms <= MEAN_INTERVAL_MAX_MS) {
            return Err(Error::Config("mean interval out of range"));
        }
        if self.report_interval.is_zero() {
            return Err(Error::Config("report interval must be nonzero"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SenderStats {
    pub sent: u64,
    pub acks: u64,
    pub timeouts: u64,
    pub go_backs: u64,
    pub malformed: u64,
}

/// A sender process: one socket, one window, one thread.
pub struct Sender {
    config: Config,
    socket_tx: socket::SocketTx,
    socket_rx: socket::SocketRx,
    window: SendWindow,
    delay: DelayModel,
    // Sequence counter for open-loop mode
    open_loop_seq: u32,
    // Acknowledgments drained in the current pass
    ack_batch: Vec<Packet>,
    next_departure: time::Instant,
    next_report: time::Instant,
    end_time: Option<time::Instant>,
    stats: SenderStats,
}

impl Sender {
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let (socket_tx, socket_rx) = socket::bind(config.bind_addr)?;

        let delay = match config.seed {
            Some(seed) => DelayModel::seeded(seed),
            None => DelayModel::new(),
        };

        let now = time::Instant::now();

        tracing::info!(
            id = config.window.sender_id,
            receiver_id = config.window.receiver_id,
            addr = %socket_rx.local_addr(),
            router = %config.router_addr,
            window = config.window.window_size,
            aimd = config.window.aimd,
            open_loop = config.open_loop,
            "sender started"
        );

        Ok(Self {
            window: SendWindow::new(&config.window),
            next_departure: now,
            next_report: now + config.report_interval,
            end_time: config.run_for.map(|run_for| now + run_for),
            config,
            socket_tx,
            socket_rx,
            delay,
            open_loop_seq: 0,
            ack_batch: Vec::new(),
            stats: Default::default(),
        })
    }

    pub fn local_addr(&self) -> net::SocketAddr {
        self.socket_rx.local_addr()
    }

    pub fn window(&self) -> &SendWindow {
        &self.window
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Returns true once the configured run time has elapsed.
    pub fn finished(&self) -> bool {
        self.end_time
            .map_or(false, |end_time| time::Instant::now() >= end_time)
    }

    fn schedule_departure(&mut self, now: time::Instant) {
        self.next_departure = now + self.delay.sample_exponential(self.config.mean_interval_ms);
    }

    fn transmit(&mut self, packet: &Packet) -> Result<()> {
        self.socket_tx.send(&packet.encode(), &self.config.router_addr)?;
        self.stats.sent += 1;

        tracing::trace!(seq = packet.seq, "sent");

        Ok(())
    }

    fn send_open_loop(&mut self, now: time::Instant) -> Result<()> {
        let packet = Packet::new(
            self.open_loop_seq,
            Timestamp::now(),
            self.config.window.sender_id,
            self.config.window.receiver_id,
        );

        self.transmit(&packet)?;

        self.open_loop_seq = self.open_loop_seq.wrapping_add(1);
        self.schedule_departure(now);

        Ok(())
    }

    /// Sends the next unit if the window allows. A full window leaves the departure pending.
    fn send_windowed(&mut self, now: time::Instant) -> Result<()> {
        let now_ts = Timestamp::now();

        if self.window.poll_timeout(now_ts) {
            self.stats.timeouts += 1;

            tracing::debug!(
                base = self.window.base_id(),
                next = self.window.next_id(),
                rto_ms = self.window.timeout_ms(),
                "retransmission timeout"
            );
        }

        if let Some(packet) = self.window.try_send(now_ts) {
            self.transmit(&packet)?;
            self.schedule_departure(now);
        }

        Ok(())
    }

    fn process_acks(&mut self) {
        if self.ack_batch.is_empty() {
            return;
        }

        let acks = std::mem::take(&mut self.ack_batch);

        self.stats.acks += acks.len() as u64;

        let outcome = self.window.on_acks(&acks, Timestamp::now());

        if let Some(outcome) = outcome {
            if outcome == AckOutcome::GoBack {
                self.stats.go_backs += 1;
            }

            tracing::debug!(
                ?outcome,
                batch = acks.len(),
                base = self.window.base_id(),
                next = self.window.next_id(),
                window = self.window.size(),
                rto_ms = self.window.timeout_ms(),
                "acknowledged"
            );
        }

        // Reuse the allocation
        self.ack_batch = acks;
        self.ack_batch.clear();
    }

    fn handle_datagram(&mut self, decoded: Result<Packet>, source_addr: net::SocketAddr) {
        match decoded {
            Ok(ack) => {
                if ack.sender_id != self.config.window.sender_id {
                    tracing::warn!(
                        %source_addr,
                        sender_id = ack.sender_id,
                        "acknowledgment for another sender"
                    );
                    return;
                }

                self.ack_batch.push(ack);
            }
            Err(err) => {
                self.stats.malformed += 1;
                tracing::warn!(%source_addr, "discarding datagram: {err}");
            }
        }
    }

    /// Reads as many acknowledgments as possible without blocking.
    fn handle_datagrams(&mut self) -> Result<()> {
        loop {
            let (decoded, source_addr) = match self.socket_rx.try_read()? {
                Some((bytes, source_addr)) => (Packet::decode(bytes), source_addr),
                None => return Ok(()),
            };

            self.handle_datagram(decoded, source_addr);
        }
    }

    fn handle_datagrams_wait(&mut self, wait_timeout: time::Duration) -> Result<()> {
        if self.socket_rx.wait_readable(Some(wait_timeout))? {
            self.handle_datagrams()?;
        }

        Ok(())
    }

    /// Time until the next thing this sender has to do on its own.
    fn next_timeout(&self, now: time::Instant) -> time::Duration {
        let mut timeout = self.next_report.saturating_duration_since(now);

        if let Some(end_time) = self.end_time {
            timeout = timeout.min(end_time.saturating_duration_since(now));
        }

        let departure_due = now >= self.next_departure;

        if !departure_due {
            timeout = timeout.min(self.next_departure - now);
        } else if self.config.open_loop || self.window.can_send() {
            timeout = time::Duration::ZERO;
        } else if let Some(deadline) = self.window.deadline() {
            // Blocked on a full window
            timeout = timeout.min(Timestamp::now().until(deadline));
        }

        timeout
    }

    fn report(&self) {
        tracing::info!(
            sent = self.stats.sent,
            acks = self.stats.acks,
            retransmits = self.window.retransmit_count(),
            timeouts = self.stats.timeouts,
            go_backs = self.stats.go_backs,
            base = self.window.base_id(),
            window = self.window.size(),
            rto_ms = self.window.timeout_ms(),
            avg_rtt_ms = self.window.rtt().avg_rtt().unwrap_or(0.0),
            "sender stats"
        );
    }

    /// Runs one iteration of the sender loop: waits up to `max_wait` (less if something is due
    /// sooner) for acknowledgments, applies them, then sends if a departure is due.
    pub fn poll(&mut self, max_wait: time::Duration) -> Result<()> {
        let wait_timeout = max_wait.min(self.next_timeout(time::Instant::now()));

        self.handle_datagrams_wait(wait_timeout)?;

        if !self.config.open_loop {
            self.process_acks();
        } else {
            self.ack_batch.clear();
        }

        let now = time::Instant::now();

        if now >= self.next_departure {
            if self.config.open_loop {
                self.send_open_loop(now)?;
            } else {
                self.send_windowed(now)?;
            }
        }

        if now >= self.next_report {
            self.report();
            self.next_report = now + self.config.report_interval;
        }

        Ok(())
    }

    /// Sends until the configured run time elapses, or forever if none is set.
    pub fn run(&mut self) -> Result<()> {
        while !self.finished() {
            self.poll(self.config.report_interval)?;
        }

        self.report();

        Ok(())
    }
}
