use std::collections::VecDeque;

use bottleneck::router::RouterScheduler;
use bottleneck::window::{AckOutcome, ReceiveWindow, SendWindow, SendWindowConfig};
use bottleneck::{Packet, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct ScenarioConfig {
    pub window: SendWindowConfig,
    pub receiver_window_size: u32,
    pub queue_capacity: usize,
    /// Milliseconds per router service tick
    pub service_ms: u64,
    /// Milliseconds between departures; 0 sends as much as the window allows
    pub departure_gap_ms: u64,
    /// Extra delay drawn uniformly from `[0, departure_jitter_ms]` and added to each gap
    pub departure_jitter_ms: u64,
    pub seed: u64,
    /// One-way delay of the acknowledgment path
    pub ack_delay_ms: u64,
    /// Units forwarded before this time vanish
    pub blackout_until_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            window: SendWindowConfig {
                initial_timeout_ms: 100.0,
                ..Default::default()
            },
            receiver_window_size: 32,
            queue_capacity: 64,
            service_ms: 10,
            departure_gap_ms: 20,
            departure_jitter_ms: 0,
            seed: 0,
            ack_delay_ms: 1,
            blackout_until_ms: 0,
        }
    }
}

/// One sender, one single-queue router and one receiver, driven by a virtual millisecond clock.
pub struct Scenario {
    pub config: ScenarioConfig,
    pub sender: SendWindow,
    pub router: RouterScheduler,
    pub receiver: ReceiveWindow,
    pub now_ms: u64,
    pub outcomes: Vec<AckOutcome>,
    pub timeouts: u64,
    pub min_size_seen: u32,
    pub max_size_seen: u32,
    next_departure_ms: u64,
    acks: VecDeque<(u64, Packet)>,
    rng: StdRng,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Self {
        let sender = SendWindow::new(&config.window);
        let size = sender.size();
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            router: RouterScheduler::new(1, config.queue_capacity),
            receiver: ReceiveWindow::new(config.receiver_window_size),
            sender,
            config,
            now_ms: 0,
            outcomes: Vec::new(),
            timeouts: 0,
            min_size_seen: size,
            max_size_seen: size,
            next_departure_ms: 0,
            acks: VecDeque::new(),
            rng,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms)
    }

    fn deliver_acks(&mut self) {
        let mut batch = Vec::new();

        while let Some((due_ms, _)) = self.acks.front() {
            if *due_ms > self.now_ms {
                break;
            }

            if let Some((_, ack)) = self.acks.pop_front() {
                batch.push(ack);
            }
        }

        if let Some(outcome) = self.sender.on_acks(&batch, self.now()) {
            self.outcomes.push(outcome);
        }
    }

    fn service(&mut self) {
        if self.now_ms == 0 || self.now_ms % self.config.service_ms != 0 {
            return;
        }

        if let Some((_, packet)) = self.router.tick() {
            if self.now_ms < self.config.blackout_until_ms {
                return;
            }

            let next_expected = self.receiver.on_arrival(packet.seq);

            self.acks
                .push_back((self.now_ms + self.config.ack_delay_ms, packet.ack(next_expected)));
        }
    }

    fn depart(&mut self) {
        if self.now_ms < self.next_departure_ms {
            return;
        }

        loop {
            if self.sender.poll_timeout(self.now()) {
                self.timeouts += 1;
            }

            match self.sender.try_send(self.now()) {
                Some(packet) => {
                    let _ = self.router.enqueue(packet);

                    let mut gap_ms = self.config.departure_gap_ms;

                    if self.config.departure_jitter_ms > 0 {
                        gap_ms += self.rng.gen_range(0..=self.config.departure_jitter_ms);
                    }

                    if gap_ms > 0 {
                        self.next_departure_ms = self.now_ms + gap_ms;
                        return;
                    }
                }
                None => return,
            }
        }
    }

    /// Advances the clock by one millisecond.
    pub fn step(&mut self) {
        self.deliver_acks();
        self.service();
        self.depart();

        self.min_size_seen = self.min_size_seen.min(self.sender.size());
        self.max_size_seen = self.max_size_seen.max(self.sender.size());

        self.now_ms += 1;
    }

    /// Steps until `done` holds or `limit_ms` passes. Returns whether `done` held.
    pub fn run_until<F>(&mut self, limit_ms: u64, done: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        while self.now_ms < limit_ms {
            if done(self) {
                return true;
            }

            self.step();
        }

        done(self)
    }
}
