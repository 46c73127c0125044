//! A traffic sink.
//!
//! Every arriving unit is marked in the [`ReceiveWindow`] of its sender and answered with one
//! cumulative acknowledgment, sent straight back to the sender (acknowledgments do not cross the
//! router).

use std::collections::BTreeMap;
use std::net;
use std::time;

use crate::addr;
use crate::clock::Timestamp;
use crate::delay::{self, DelayModel};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::socket;
use crate::window::{ReceiveWindow, WINDOW_SIZE_MAX};

const JITTER_LOW_MS: u32 = 5;
const JITTER_HIGH_MS: u32 = 15;
const JITTER_PERIOD: time::Duration = time::Duration::from_secs(5);

/// Configuration for a [`Receiver`] object.
#[derive(Clone, Debug)]
pub struct Config {
    /// This receiver's id, starting at 1.
    pub id: u32,

    /// Address units are received on.
    pub bind_addr: net::SocketAddr,

    /// Host that senders receive acknowledgments on.
    pub sender_ip: net::IpAddr,

    /// Sender *k* receives acknowledgments on `sender_port_base + k - 1`.
    pub sender_port_base: u16,

    /// Lookahead tracked beyond the next expected sequence number.
    pub window_size: u32,

    /// Pause for a uniformly drawn processing delay before each read. The bound alternates
    /// between 5 and 15 ms every 5 seconds.
    pub jitter: bool,

    /// Interval between statistics reports.
    pub report_interval: time::Duration,

    /// Seed for the processing delays. Drawn from entropy if unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: 1,
            bind_addr: (net::Ipv4Addr::UNSPECIFIED, addr::RECEIVER_PORT_BASE).into(),
            sender_ip: net::Ipv4Addr::LOCALHOST.into(),
            sender_port_base: addr::SENDER_PORT_BASE,
            window_size: 32,
            jitter: false,
            report_interval: time::Duration::from_secs(1),
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 || self.id > addr::ROLE_ID_MAX {
            return Err(Error::Config("receiver id out of range"));
        }
        if self.window_size == 0 || self.window_size > WINDOW_SIZE_MAX {
            return Err(Error::Config("receiver window size out of range"));
        }
        if self.sender_port_base.checked_add((addr::ROLE_ID_MAX - 1) as u16).is_none() {
            return Err(Error::Config("sender port range exceeds 65535"));
        }
        if self.report_interval.is_zero() {
            return Err(Error::Config("report interval must be nonzero"));
        }
        Ok(())
    }
}

// Upper bound on the processing delay, flipping between two levels on a fixed period.
struct Jitter {
    bound_ms: u32,
    next_switch: time::Instant,
}

impl Jitter {
    fn new(now: time::Instant) -> Self {
        Self {
            bound_ms: JITTER_LOW_MS,
            next_switch: now + JITTER_PERIOD,
        }
    }

    fn bound_ms(&mut self, now: time::Instant) -> u32 {
        if now >= self.next_switch {
            self.bound_ms = if self.bound_ms == JITTER_LOW_MS {
                JITTER_HIGH_MS
            } else {
                JITTER_LOW_MS
            };
            self.next_switch = now + JITTER_PERIOD;

            tracing::debug!(bound_ms = self.bound_ms, "processing delay bound changed");
        }

        self.bound_ms
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReceiverStats {
    pub arrivals: u64,
    pub acks: u64,
    pub misdelivered: u64,
    pub malformed: u64,
    // Sum and count of one-way delays
    delay_total_ms: f64,
    delay_count: u64,
}

impl ReceiverStats {
    /// Average of arrival time minus origin timestamp, in milliseconds.
    pub fn avg_one_way_delay_ms(&self) -> Option<f64> {
        (self.delay_count > 0).then(|| self.delay_total_ms / self.delay_count as f64)
    }
}

/// A receiver process: one socket, one window per sender, one thread.
pub struct Receiver {
    config: Config,
    socket_tx: socket::SocketTx,
    socket_rx: socket::SocketRx,
    windows: BTreeMap<u32, ReceiveWindow>,
    delay: DelayModel,
    jitter: Option<Jitter>,
    next_report: time::Instant,
    stats: ReceiverStats,
}

impl Receiver {
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let (socket_tx, socket_rx) = socket::bind(config.bind_addr)?;

        let delay = match config.seed {
            Some(seed) => DelayModel::seeded(seed),
            None => DelayModel::new(),
        };

        let now = time::Instant::now();

        tracing::info!(
            id = config.id,
            addr = %socket_rx.local_addr(),
            window = config.window_size,
            jitter = config.jitter,
            "receiver listening"
        );

        Ok(Self {
            jitter: config.jitter.then(|| Jitter::new(now)),
            next_report: now + config.report_interval,
            config,
            socket_tx,
            socket_rx,
            windows: BTreeMap::new(),
            delay,
            stats: Default::default(),
        })
    }

    pub fn local_addr(&self) -> net::SocketAddr {
        self.socket_rx.local_addr()
    }

    /// Window tracking units from `sender_id`, if any have arrived.
    pub fn window(&self, sender_id: u32) -> Option<&ReceiveWindow> {
        self.windows.get(&sender_id)
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    fn handle_unit(&mut self, packet: Packet) -> Result<()> {
        let now_ts = Timestamp::now();

        self.stats.arrivals += 1;

        let one_way_ms = now_ts.millis_since(packet.timestamp);
        if one_way_ms >= 0.0 {
            self.stats.delay_total_ms += one_way_ms;
            self.stats.delay_count += 1;
        }

        let window_size = self.config.window_size;

        let window = self
            .windows
            .entry(packet.sender_id)
            .or_insert_with(|| ReceiveWindow::new(window_size));

        let arrival = window.mark(packet.seq);
        let next_expected = window.expected();

        tracing::trace!(
            seq = packet.seq,
            sender_id = packet.sender_id,
            ?arrival,
            next_expected,
            "arrival"
        );

        let ack = packet.ack(next_expected);

        let sender_port = addr::role_port(self.config.sender_port_base, ack.sender_id)?;
        let sender_addr = net::SocketAddr::new(self.config.sender_ip, sender_port);

        self.socket_tx.send(&ack.encode(), &sender_addr)?;
        self.stats.acks += 1;

        Ok(())
    }

    fn handle_datagram(
        &mut self,
        decoded: Result<Packet>,
        source_addr: net::SocketAddr,
    ) -> Result<()> {
        match decoded {
            Ok(packet) => {
                if packet.receiver_id != self.config.id {
                    self.stats.misdelivered += 1;
                    tracing::warn!(
                        %source_addr,
                        receiver_id = packet.receiver_id,
                        "unit addressed to another receiver"
                    );
                    return Ok(());
                }

                if packet.sender_id == 0 || packet.sender_id > addr::ROLE_ID_MAX {
                    self.stats.malformed += 1;
                    tracing::warn!(%source_addr, sender_id = packet.sender_id, "unknown sender");
                    return Ok(());
                }

                self.handle_unit(packet)
            }
            Err(err) => {
                self.stats.malformed += 1;
                tracing::warn!(%source_addr, "discarding datagram: {err}");
                Ok(())
            }
        }
    }

    fn pause_for_jitter(&mut self) {
        if let Some(jitter) = self.jitter.as_mut() {
            let bound_ms = jitter.bound_ms(time::Instant::now());
            delay::pause(self.delay.sample_uniform(bound_ms));
        }
    }

    /// Reads and acknowledges as many units as possible without blocking.
    fn handle_datagrams(&mut self) -> Result<()> {
        loop {
            self.pause_for_jitter();

            let (decoded, source_addr) = match self.socket_rx.try_read()? {
                Some((bytes, source_addr)) => (Packet::decode(bytes), source_addr),
                None => return Ok(()),
            };

            self.handle_datagram(decoded, source_addr)?;
        }
    }

    fn handle_datagrams_wait(&mut self, wait_timeout: time::Duration) -> Result<()> {
        if self.socket_rx.wait_readable(Some(wait_timeout))? {
            self.handle_datagrams()?;
        }

        Ok(())
    }

    fn report(&self) {
        let beyond_window: u64 = self.windows.values().map(|w| w.beyond_window_count()).sum();
        let duplicates: u64 = self.windows.values().map(|w| w.duplicate_count()).sum();

        for (sender_id, window) in self.windows.iter() {
            tracing::info!(sender_id, expected = window.expected(), "receive window");
        }

        tracing::info!(
            arrivals = self.stats.arrivals,
            acks = self.stats.acks,
            duplicates,
            beyond_window,
            malformed = self.stats.malformed,
            avg_delay_ms = self.stats.avg_one_way_delay_ms().unwrap_or(0.0),
            "receiver stats"
        );
    }

    /// Runs one iteration of the receiver loop: waits up to `max_wait` for units and acknowledges
    /// everything that arrived.
    pub fn poll(&mut self, max_wait: time::Duration) -> Result<()> {
        let now = time::Instant::now();

        let wait_timeout = max_wait.min(self.next_report.saturating_duration_since(now));

        self.handle_datagrams_wait(wait_timeout)?;

        let now = time::Instant::now();

        if now >= self.next_report {
            self.report();
            self.next_report = now + self.config.report_interval;
        }

        Ok(())
    }

    /// Receives forever, or until a socket fault.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll(self.config.report_interval)?;
        }
    }
}
