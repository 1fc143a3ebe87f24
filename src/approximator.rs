//! The trainable-function capability shared by the actor and the critic.
//!
//! Anything that can evaluate a batch, expose its parameters as an ordered list
//! of tensors, accept a replacement list of the same shapes, and take one
//! optimizer step from a matching list of gradients can sit behind the agent.
//! Target networks and soft updates are written purely against this trait.

use ndarray::{Array2, ArrayD};

use crate::error::Result;
use crate::optimizer::OptimizerWrapper;

/// Ordered parameter (or gradient) tensors of one network
pub type Parameters = Vec<ArrayD<f32>>;

pub trait FunctionApproximator {
    /// Borrowed batch input, one sample per row
    type Input<'a>;

    /// Pure forward evaluation; never mutates the approximator.
    fn forward(&self, input: Self::Input<'_>) -> Result<Array2<f32>>;

    /// Snapshot of every trainable tensor, in a fixed order.
    fn parameters(&self) -> Parameters;

    /// Replace every trainable tensor; shapes must match [`FunctionApproximator::parameters`].
    fn set_parameters(&mut self, parameters: &[ArrayD<f32>]) -> Result<()>;

    /// One optimizer step against `gradients`, aligned with [`FunctionApproximator::parameters`].
    fn apply_gradients(&mut self, gradients: &[ArrayD<f32>], optimizer: &mut OptimizerWrapper) -> Result<()>;

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}
