use rand::rngs::StdRng;
use rand::seq::index;

use crate::ai::Transition;
use crate::error::TrainingError;

/// Fixed-capacity ring buffer of state transitions. Once full, every
/// insertion overwrites the slot at the write cursor and advances it, so
/// the logical length never exceeds the capacity.
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
        }
    }

    /// Add a transition, recycling the oldest slot when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Draw a batch uniformly without replacement from the current
    /// contents. Requesting more transitions than are stored fails.
    pub fn sample(
        &self,
        batch_size: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<&Transition>, TrainingError> {
        if batch_size > self.buffer.len() {
            return Err(TrainingError::InsufficientSamples {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }
        let indices = index::sample(rng, self.buffer.len(), batch_size);
        Ok(indices.iter().map(|i| &self.buffer[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot access in storage order, for inspecting overwrite behavior.
    pub fn get(&self, slot: usize) -> &Transition {
        &self.buffer[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use rand::SeedableRng;

    fn transition(tag: f64) -> Transition {
        Transition {
            state: arr1(&[tag, 0.0]),
            action: 0,
            reward: 0.0,
            next_state: None,
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut buf = ReplayBuffer::new(10);
        assert_eq!(buf.len(), 0);

        buf.push(transition(0.0));
        assert_eq!(buf.len(), 1);

        for i in 1..10 {
            buf.push(transition(i as f64));
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_ring_overwrites_in_circular_order() {
        let capacity = 5;
        let mut buf = ReplayBuffer::new(capacity);
        for i in 0..8 {
            buf.push(transition(i as f64));
        }
        assert_eq!(buf.len(), capacity);

        // The most recent insertion (index 7) landed at slot 7 mod 5.
        assert_eq!(buf.get(7 % capacity).state[0], 7.0);
        // Slots not yet recycled still hold the first pass.
        assert_eq!(buf.get(3).state[0], 3.0);
        assert_eq!(buf.get(4).state[0], 4.0);
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..50 {
            buf.push(transition(i as f64));
        }
        let mut rng = StdRng::seed_from_u64(17);
        let batch = buf.sample(10, &mut rng).unwrap();
        assert_eq!(batch.len(), 10);

        let mut tags: Vec<i64> = batch.iter().map(|t| t.state[0] as i64).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), 10, "sampling must not repeat transitions");
    }

    #[test]
    fn test_sample_more_than_stored_fails() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(transition(0.0));
        let mut rng = StdRng::seed_from_u64(17);
        let err = buf.sample(5, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::InsufficientSamples {
                requested: 5,
                available: 1
            }
        ));
    }
}
