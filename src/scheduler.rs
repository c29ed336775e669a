use std::time::{Duration, Instant};

/// Cancellable one-shot timers, at most one pending per key.
///
/// Every entry remembers the generation it was scheduled in. Bumping the
/// generation drops everything scheduled before it, which is how a new round
/// discards leftovers of the previous one.
#[derive(Debug)]
pub struct Scheduler<K> {
    generation: u64,
    pending: Vec<Pending<K>>,
}

#[derive(Debug, Clone, Copy)]
struct Pending<K> {
    key: K,
    due: Instant,
    generation: u64,
}

impl<K: Copy + PartialEq> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            pending: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates every pending timer and returns the new generation.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending.clear();
        self.generation
    }

    /// Schedules `key` at `now + delay`, replacing a pending timer of the same
    /// key.
    pub fn schedule(&mut self, key: K, now: Instant, delay: Duration) {
        self.cancel(key);
        self.pending.push(Pending {
            key,
            due: now + delay,
            generation: self.generation,
        });
    }

    pub fn cancel(&mut self, key: K) {
        self.pending.retain(|p| p.key != key);
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|p| p.key == key)
    }

    pub fn due_at(&self, key: K) -> Option<Instant> {
        self.pending.iter().find(|p| p.key == key).map(|p| p.due)
    }

    /// Removes and returns the earliest timer due at `now`, with the instant
    /// it was due.
    pub fn pop_due(&mut self, now: Instant) -> Option<(K, Instant)> {
        let generation = self.generation;
        self.pending.retain(|p| p.generation == generation);

        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| p.due)
            .map(|(idx, _)| idx)?;

        let fired = self.pending.remove(idx);
        Some((fired.key, fired.due))
    }
}

impl<K: Copy + PartialEq> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}
