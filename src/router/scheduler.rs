use crate::packet::Packet;

use super::queue::BoundedQueue;

/// Where an arriving unit ended up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    Queued(usize),
    /// The selected queue was full.
    Dropped(usize),
    /// No queue serves the unit's receiver id.
    Unroutable,
}

struct Lane {
    queue: BoundedQueue<Packet>,
    // Sum of pre-dequeue lengths over `service_count` dequeues
    len_total: u64,
    service_count: u64,
}

/// Snapshot of one queue's counters.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub drops: u64,
    pub forwarded: u64,
    /// Average length seen by the scheduler at dequeue time, if anything was dequeued.
    pub avg_len: Option<f64>,
}

/// Drop-tail queues served in strict priority order.
///
/// With a single queue every arrival shares it. Otherwise receiver *k* is served by queue `k - 1`,
/// and lower-numbered queues always go first.
pub struct RouterScheduler {
    lanes: Vec<Lane>,
    arrival_count: u64,
    unroutable_count: u64,
}

impl RouterScheduler {
    pub fn new(queue_count: usize, capacity: usize) -> Self {
        let lanes = (0..queue_count)
            .map(|_| Lane {
                queue: BoundedQueue::new(capacity),
                len_total: 0,
                service_count: 0,
            })
            .collect();

        Self {
            lanes,
            arrival_count: 0,
            unroutable_count: 0,
        }
    }

    pub fn queue_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn arrival_count(&self) -> u64 {
        self.arrival_count
    }

    pub fn unroutable_count(&self) -> u64 {
        self.unroutable_count
    }

    /// Queue serving `receiver_id`, if any.
    pub fn route(&self, receiver_id: u32) -> Option<usize> {
        if self.lanes.len() == 1 {
            return Some(0);
        }

        let index = receiver_id.checked_sub(1)? as usize;

        (index < self.lanes.len()).then_some(index)
    }

    pub fn enqueue(&mut self, packet: Packet) -> Admission {
        self.arrival_count += 1;

        let Some(index) = self.route(packet.receiver_id) else {
            self.unroutable_count += 1;
            return Admission::Unroutable;
        };

        match self.lanes[index].queue.enqueue(packet) {
            Ok(()) => Admission::Queued(index),
            Err(_) => Admission::Dropped(index),
        }
    }

    /// Serves one unit from the highest-priority non-empty queue, returning the queue index and
    /// the unit. Returns None if every queue is empty.
    pub fn tick(&mut self) -> Option<(usize, Packet)> {
        let (index, lane) = self
            .lanes
            .iter_mut()
            .enumerate()
            .find(|(_, lane)| !lane.queue.is_empty())?;

        lane.len_total += lane.queue.len() as u64;
        lane.service_count += 1;

        lane.queue.dequeue().map(|packet| (index, packet))
    }

    pub fn len(&self, index: usize) -> usize {
        self.lanes.get(index).map_or(0, |lane| lane.queue.len())
    }

    pub fn drop_count(&self, index: usize) -> u64 {
        self.lanes.get(index).map_or(0, |lane| lane.queue.drop_count())
    }

    pub fn avg_len(&self, index: usize) -> Option<f64> {
        let lane = self.lanes.get(index)?;

        (lane.service_count > 0).then(|| lane.len_total as f64 / lane.service_count as f64)
    }

    pub fn stats(&self, index: usize) -> Option<QueueStats> {
        let lane = self.lanes.get(index)?;

        Some(QueueStats {
            len: lane.queue.len(),
            capacity: lane.queue.capacity(),
            drops: lane.queue.drop_count(),
            forwarded: lane.service_count,
            avg_len: self.avg_len(index),
        })
    }
}
