//! Actor and critic function approximators for continuous control.
//!
//! Both are built from [`DenseLayer`](crate::layers::DenseLayer)s and implement
//! [`FunctionApproximator`](crate::approximator::FunctionApproximator), so the
//! agent can create, evaluate, train and track them uniformly.

pub mod actor;
pub mod critic;

pub use actor::Actor;
pub use critic::{Critic, CriticGradients, CriticTrace};

/// Width of every hidden transformation unless configured otherwise
pub const DEFAULT_HIDDEN_SIZE: usize = 512;
