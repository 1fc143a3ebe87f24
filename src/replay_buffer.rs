use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::error::{DdpgError, Result};

/// Capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 10_000;

/// One step of experience. There is no terminal flag: every transition is
/// bootstrapped from its successor state.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    pub reward: f32,
    pub next_state: Array1<f32>,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: Array1<f32>, reward: f32, next_state: Array1<f32>) -> Self {
        Transition { state, action, reward, next_state }
    }
}

/// A sampled batch with one transition per row
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Array2<f32>,
    pub actions: Array2<f32>,
    /// Shape `(batch, 1)`
    pub rewards: Array2<f32>,
    pub next_states: Array2<f32>,
}

impl TransitionBatch {
    /// Stack transitions row-wise; every transition must agree on vector lengths.
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        Ok(TransitionBatch {
            states: stack_rows(transitions.iter().map(|t| &t.state), "state")?,
            actions: stack_rows(transitions.iter().map(|t| &t.action), "action")?,
            rewards: Array2::from_shape_fn((transitions.len(), 1), |(i, _)| transitions[i].reward),
            next_states: stack_rows(transitions.iter().map(|t| &t.next_state), "next_state")?,
        })
    }

    pub fn len(&self) -> usize {
        self.states.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn stack_rows<'a, I>(rows: I, field: &str) -> Result<Array2<f32>>
where
    I: ExactSizeIterator<Item = &'a Array1<f32>>,
{
    let n = rows.len();
    let mut width = None;
    let mut flat = Vec::new();
    for row in rows {
        match width {
            None => {
                width = Some(row.len());
                flat.reserve(n * row.len());
            }
            Some(w) if w != row.len() => {
                return Err(DdpgError::dimension_mismatch(
                    format!("every {} of length {}", field, w),
                    format!("a {} of length {}", field, row.len()),
                ));
            }
            Some(_) => {}
        }
        flat.extend(row.iter().copied());
    }
    Array2::from_shape_vec((n, width.unwrap_or(0)), flat)
        .map_err(|e| DdpgError::dimension_mismatch(field.to_string(), e.to_string()))
}

/// Bounded FIFO store of transitions with uniform sampling without replacement.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    /// Buffer whose sampling RNG is seeded from the OS
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Buffer with reproducible sampling
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            rng,
        }
    }

    /// Append a transition, evicting the oldest one when full.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// `batch_size` distinct transitions chosen uniformly at random.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<&Transition>> {
        if self.buffer.len() < batch_size {
            return Err(DdpgError::InsufficientData {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }
        let indices = index::sample(&mut self.rng, self.buffer.len(), batch_size);
        Ok(indices.into_iter().map(|i| &self.buffer[i]).collect())
    }

    /// Sample and stack into row-major arrays.
    pub fn sample_batch(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        let transitions = self.sample(batch_size)?;
        TransitionBatch::from_transitions(&transitions)
    }

    /// Stored transitions from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
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

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
