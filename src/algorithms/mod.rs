//! # Actor-critic algorithms
//!
//! ## DDPG (Deep Deterministic Policy Gradient)
//!
//! - Off-policy learning from a bounded replay buffer
//! - A deterministic actor trained by following the critic's action gradient
//! - Slowly tracking target networks for the bootstrapped critic target
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ddpg::algorithms::DdpgBuilder;
//! use ndarray::array;
//!
//! let mut agent = DdpgBuilder::new(3, 2)
//!     .hidden_size(64)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let state = array![0.1, 0.2, 0.3];
//! let action = agent.act(state.view()).unwrap();
//! agent.remember(state, action, 1.0, array![0.2, 0.3, 0.4]);
//!
//! if let Some(stats) = agent.train_step(1).unwrap() {
//!     println!("critic loss {}", stats.critic_loss);
//! }
//! agent.update_target_networks().unwrap();
//! ```

pub mod ddpg;

pub use ddpg::{DdpgAgent, DdpgBuilder, TrainStats};
