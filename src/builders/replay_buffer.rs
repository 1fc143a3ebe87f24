use crate::replay_buffer::ReplayBuffer;
use crate::error::{Result, DdpgError};

/// Builder for ReplayBuffer
pub struct ReplayBufferBuilder {
    capacity: Option<usize>,
    seed: Option<u64>,
}

impl ReplayBufferBuilder {
    /// Create a new replay buffer builder
    pub fn new() -> Self {
        ReplayBufferBuilder { capacity: None, seed: None }
    }

    /// Set the capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Make sampling reproducible
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the replay buffer
    pub fn build(self) -> Result<ReplayBuffer> {
        let capacity = self.capacity.ok_or_else(|| DdpgError::InvalidParameter {
            name: "capacity".to_string(),
            reason: "Capacity not specified".to_string(),
        })?;

        if capacity == 0 {
            return Err(DdpgError::InvalidParameter {
                name: "capacity".to_string(),
                reason: "Capacity must be greater than 0".to_string(),
            });
        }

        Ok(match self.seed {
            Some(seed) => ReplayBuffer::with_seed(capacity, seed),
            None => ReplayBuffer::new(capacity),
        })
    }
}

impl Default for ReplayBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}
