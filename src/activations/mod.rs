//! # Activation Functions Module
//!
//! Element-wise nonlinearities applied after each dense transformation.
//!
//! ## Available Activations
//!
//! - **ReLU** (Rectified Linear Unit): `max(0, x)`, used by every hidden layer of
//!   the actor and the critic
//! - **Sigmoid**: `1 / (1 + e^(-x))`, bounds actor outputs to the open interval (0, 1)
//! - **Tanh**: Hyperbolic tangent, outputs between -1 and 1
//! - **Linear**: Identity function, used by the critic's value head
//!
//! ## Usage Example
//!
//! ```rust
//! use ddpg::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
