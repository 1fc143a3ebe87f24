//! # DDPG - Deep Deterministic Policy Gradient
//!
//! A small actor-critic reinforcement learning library for continuous action
//! spaces. Networks are dense feed-forward stacks over `ndarray`, trained with
//! explicit backpropagation and Adam.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddpg::algorithms::DdpgAgent;
//! use ddpg::config::DdpgConfig;
//! use ndarray::array;
//!
//! let config = DdpgConfig::new(3, 2).seed(0);
//! let mut agent = DdpgAgent::new(config).unwrap();
//!
//! let state = array![0.0, 0.5, -0.5];
//! let action = agent.act(state.view()).unwrap();
//! agent.remember(state.clone(), action, 0.0, state);
//! agent.train_step(64).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Sigmoid, Tanh, Linear)
//! - [`algorithms`] - The DDPG agent and its builder
//! - [`approximator`] - The trait shared by actor and critic
//! - [`builders`] - Builder patterns for convenient object construction
//! - [`config`] - Hyperparameters, with JSON loading
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layers and weight initialization
//! - [`loss`] - Loss functions for training
//! - [`models`] - Actor and critic networks
//! - [`network`] - Feed-forward network with backpropagation
//! - [`optimizer`] - Optimization algorithms
//! - [`replay_buffer`] - Experience replay
//! - [`target`] - Soft and hard target-network updates

pub mod activations;
pub mod algorithms;
pub mod approximator;
pub mod builders;
pub mod config;
pub mod error;
pub mod layers;
pub mod loss;
pub mod models;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod target;

#[cfg(test)]
mod tests;
