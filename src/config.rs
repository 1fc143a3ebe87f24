//! Agent hyperparameters.
//!
//! A [`DdpgConfig`] is plain data: it can be built in code with the setter
//! chain, or read from JSON. Missing JSON fields fall back to the defaults
//! below, so a file only has to name the dimensions it cares about.

use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::error::{DdpgError, Result};
use crate::layers::WeightInit;
use crate::models::DEFAULT_HIDDEN_SIZE;
use crate::optimizer::{Adam, OptimizerWrapper, SGD};
use crate::replay_buffer::DEFAULT_CAPACITY;

/// Which update rule the actor and critic optimizers use
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum OptimizerConfig {
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
    Sgd,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
    }
}

impl OptimizerConfig {
    /// A fresh optimizer with no accumulated state
    pub fn build(&self, learning_rate: f32) -> OptimizerWrapper {
        match *self {
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(learning_rate, beta1, beta2, epsilon))
            }
            OptimizerConfig::Sgd => OptimizerWrapper::SGD(SGD::new(learning_rate)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DdpgConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    pub hidden_size: usize,
    /// Weight scheme for all four networks; biases always start at zero
    pub weight_init: WeightInit,
    /// Discount factor
    pub gamma: f32,
    /// Soft update rate
    pub tau: f32,
    pub actor_lr: f32,
    pub critic_lr: f32,
    pub buffer_capacity: usize,
    /// Batch size used by [`DdpgAgent::train`](crate::algorithms::DdpgAgent::train)
    pub batch_size: usize,
    pub optimizer: OptimizerConfig,
    /// Seeds weight initialization and replay sampling
    pub seed: Option<u64>,
    /// Copy online weights into the targets at construction
    pub sync_targets_on_init: bool,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        DdpgConfig {
            state_dim: 0,
            action_dim: 0,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            weight_init: WeightInit::default(),
            gamma: 0.99,
            tau: 0.001,
            actor_lr: 0.001,
            critic_lr: 0.002,
            buffer_capacity: DEFAULT_CAPACITY,
            batch_size: 64,
            optimizer: OptimizerConfig::default(),
            seed: None,
            sync_targets_on_init: false,
        }
    }
}

impl DdpgConfig {
    pub fn new(state_dim: usize, action_dim: usize) -> Self {
        DdpgConfig {
            state_dim,
            action_dim,
            ..Default::default()
        }
    }

    pub fn hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = init;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn tau(mut self, tau: f32) -> Self {
        self.tau = tau;
        self
    }

    pub fn actor_lr(mut self, lr: f32) -> Self {
        self.actor_lr = lr;
        self
    }

    pub fn critic_lr(mut self, lr: f32) -> Self {
        self.critic_lr = lr;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sync_targets_on_init(mut self, sync: bool) -> Self {
        self.sync_targets_on_init = sync;
        self
    }

    /// Check every field before anything is allocated from it.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("state_dim", self.state_dim),
            ("action_dim", self.action_dim),
            ("hidden_size", self.hidden_size),
            ("buffer_capacity", self.buffer_capacity),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DdpgError::invalid_parameter(name.to_string(), "must be greater than 0".to_string()));
            }
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DdpgError::invalid_parameter(
                "gamma".to_string(),
                format!("{} is outside [0, 1]", self.gamma),
            ));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(DdpgError::invalid_parameter(
                "tau".to_string(),
                format!("{} is outside (0, 1]", self.tau),
            ));
        }
        for (name, lr) in [("actor_lr", self.actor_lr), ("critic_lr", self.critic_lr)] {
            if !(lr > 0.0 && lr.is_finite()) {
                return Err(DdpgError::invalid_parameter(name.to_string(), format!("{} is not a positive learning rate", lr)));
            }
        }
        if let OptimizerConfig::Adam { beta1, beta2, epsilon } = self.optimizer {
            if !(0.0..1.0).contains(&beta1) || !(0.0..1.0).contains(&beta2) {
                return Err(DdpgError::invalid_parameter(
                    "optimizer".to_string(),
                    "Adam betas must lie in [0, 1)".to_string(),
                ));
            }
            if epsilon <= 0.0 {
                return Err(DdpgError::invalid_parameter(
                    "optimizer".to_string(),
                    "Adam epsilon must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
