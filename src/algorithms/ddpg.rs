use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::approximator::FunctionApproximator;
use crate::config::DdpgConfig;
use crate::error::{DdpgError, Result};
use crate::layers::WeightInit;
use crate::loss::{Loss, MSE};
use crate::models::{Actor, Critic};
use crate::optimizer::OptimizerWrapper;
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::target;

/// Deep Deterministic Policy Gradient agent
///
/// Owns an actor, a critic, a slowly tracking copy of each, a replay buffer
/// and one optimizer per online network. Actions are the raw actor output in
/// (0, 1) with no exploration noise; callers add noise and rescale as needed.
///
/// Target networks are only moved by [`DdpgAgent::update_target_networks`] and
/// [`DdpgAgent::sync_targets_hard`]; [`DdpgAgent::train_step`] never touches them.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DdpgAgent {
    config: DdpgConfig,
    actor: Actor,
    critic: Critic,
    target_actor: Actor,
    target_critic: Critic,
    actor_optimizer: OptimizerWrapper,
    critic_optimizer: OptimizerWrapper,
    /// Completed train steps
    train_steps: u64,
    #[serde(skip)]
    replay_buffer: ReplayBuffer,
}

/// Losses from one [`DdpgAgent::train_step`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainStats {
    /// Mean squared TD error before the critic step
    pub critic_loss: f32,
    /// Negated mean Q of the actor's actions, after the critic step
    pub actor_loss: f32,
    pub batch_size: usize,
}

impl DdpgAgent {
    /// Validate `config` and initialize all four networks independently.
    pub fn new(config: DdpgConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (state_dim, action_dim, hidden) = (config.state_dim, config.action_dim, config.hidden_size);
        let init = config.weight_init;
        let actor = Actor::new_using(state_dim, action_dim, hidden, init, &mut rng)?;
        let critic = Critic::new_using(state_dim, action_dim, hidden, init, &mut rng)?;
        let mut target_actor = Actor::new_using(state_dim, action_dim, hidden, init, &mut rng)?;
        let mut target_critic = Critic::new_using(state_dim, action_dim, hidden, init, &mut rng)?;

        if config.sync_targets_on_init {
            target::hard_update(&mut target_actor, &actor)?;
            target::hard_update(&mut target_critic, &critic)?;
        }

        let replay_buffer = ReplayBuffer::with_seed(config.buffer_capacity, rng.gen());
        let actor_optimizer = config.optimizer.build(config.actor_lr);
        let critic_optimizer = config.optimizer.build(config.critic_lr);

        info!(
            "created DDPG agent: state_dim={} action_dim={} hidden={} actor params={} critic params={}",
            state_dim,
            action_dim,
            hidden,
            actor.num_parameters(),
            critic.num_parameters()
        );

        Ok(DdpgAgent {
            config,
            actor,
            critic,
            target_actor,
            target_critic,
            actor_optimizer,
            critic_optimizer,
            train_steps: 0,
            replay_buffer,
        })
    }

    /// Deterministic action for one state.
    pub fn act(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let actions = self.actor.forward(state.insert_axis(Axis(0)))?;
        Ok(actions.index_axis_move(Axis(0), 0))
    }

    /// Store a transition. Shapes are checked only when a batch is stacked.
    pub fn remember(&mut self, state: Array1<f32>, action: Array1<f32>, reward: f32, next_state: Array1<f32>) {
        self.replay_buffer.push(Transition::new(state, action, reward, next_state));
    }

    /// One critic step followed by one actor step on a uniformly sampled batch.
    ///
    /// Returns `Ok(None)` without touching anything when fewer than
    /// `batch_size` transitions are stored.
    pub fn train_step(&mut self, batch_size: usize) -> Result<Option<TrainStats>> {
        if batch_size == 0 {
            return Err(DdpgError::invalid_parameter(
                "batch_size".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let batch = match self.replay_buffer.sample_batch(batch_size) {
            Ok(batch) => batch,
            Err(DdpgError::InsufficientData { requested, available }) => {
                trace!("skipping train step: {} of {} transitions stored", available, requested);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // Critic: regress Q(s, a) onto r + gamma * Q'(s', mu'(s'))
        trace!("critic phase");
        let next_actions = self.target_actor.forward(batch.next_states.view())?;
        let next_values = self.target_critic.forward((batch.next_states.view(), next_actions.view()))?;
        let targets = &batch.rewards + &(next_values * self.config.gamma);

        let (predicted, critic_trace) = self.critic.forward_traced(batch.states.view(), batch.actions.view())?;
        let critic_loss = MSE.compute_batch(predicted.view(), targets.view())?;
        let value_errors = MSE.gradient_batch(predicted.view(), targets.view())?;
        let critic_grads = self.critic.backward(&critic_trace, value_errors.view())?;
        self.critic.apply_gradients(&critic_grads.parameters, &mut self.critic_optimizer)?;

        // Actor: ascend Q(s, mu(s)) through the freshly updated critic
        trace!("actor phase");
        let (actions, actor_trace) = self.actor.forward_traced(batch.states.view())?;
        let (values, value_trace) = self.critic.forward_traced(batch.states.view(), actions.view())?;
        let actor_loss = -values.mean().unwrap_or(0.0);

        let upstream = Array2::from_elem(values.raw_dim(), -1.0 / batch_size as f32);
        let action_errors = self.critic.action_gradients(&value_trace, upstream.view())?;
        let actor_grads = self.actor.backward(&actor_trace, action_errors.view())?;
        self.actor.apply_gradients(&actor_grads, &mut self.actor_optimizer)?;

        self.train_steps += 1;
        if !critic_loss.is_finite() || !actor_loss.is_finite() {
            warn!("non-finite loss: critic={} actor={}", critic_loss, actor_loss);
        }
        debug!("train step: batch={} critic_loss={:.6} actor_loss={:.6}", batch_size, critic_loss, actor_loss);

        Ok(Some(TrainStats { critic_loss, actor_loss, batch_size }))
    }

    /// [`DdpgAgent::train_step`] with the configured batch size
    pub fn train(&mut self) -> Result<Option<TrainStats>> {
        self.train_step(self.config.batch_size)
    }

    /// Polyak-average both targets towards their online networks at rate `tau`.
    pub fn update_target_networks(&mut self) -> Result<()> {
        target::soft_update(&mut self.target_actor, &self.actor, self.config.tau)?;
        target::soft_update(&mut self.target_critic, &self.critic, self.config.tau)?;
        Ok(())
    }

    /// Copy both online networks into their targets exactly.
    pub fn sync_targets_hard(&mut self) -> Result<()> {
        target::hard_update(&mut self.target_actor, &self.actor)?;
        target::hard_update(&mut self.target_critic, &self.critic)?;
        debug!("targets synchronised with online networks");
        Ok(())
    }

    /// Number of train steps that updated the networks
    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    pub fn config(&self) -> &DdpgConfig {
        &self.config
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn target_actor(&self) -> &Actor {
        &self.target_actor
    }

    pub fn target_critic(&self) -> &Critic {
        &self.target_critic
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }

    pub fn actor_optimizer(&self) -> &OptimizerWrapper {
        &self.actor_optimizer
    }

    pub fn critic_optimizer(&self) -> &OptimizerWrapper {
        &self.critic_optimizer
    }

    /// Save networks, optimizer state and configuration. The replay buffer is not saved.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), serialized)?;
        info!("saved DDPG agent to {}", path.as_ref().display());
        Ok(())
    }

    /// Load an agent written by [`DdpgAgent::save`], with an empty replay buffer.
    ///
    /// A seeded agent's buffer is reseeded from the seed and the saved step
    /// count, so reloads from different points in training sample differently.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mut agent: Self = bincode::deserialize(&data)?;
        agent.config.validate()?;
        agent.check_dimensions()?;

        agent.replay_buffer = match agent.config.seed {
            Some(seed) => ReplayBuffer::with_seed(
                agent.config.buffer_capacity,
                seed ^ agent.train_steps.rotate_left(32),
            ),
            None => ReplayBuffer::new(agent.config.buffer_capacity),
        };
        info!("loaded DDPG agent from {}", path.as_ref().display());
        Ok(agent)
    }

    fn check_dimensions(&self) -> Result<()> {
        let expected = (self.config.state_dim, self.config.action_dim);
        let found = [
            (self.actor.state_dim(), self.actor.action_dim()),
            (self.target_actor.state_dim(), self.target_actor.action_dim()),
            (self.critic.state_dim(), self.critic.action_dim()),
            (self.target_critic.state_dim(), self.target_critic.action_dim()),
        ];
        match found.iter().find(|&&dims| dims != expected) {
            Some(dims) => Err(DdpgError::dimension_mismatch(
                format!("networks for state_dim={} action_dim={}", expected.0, expected.1),
                format!("a network for state_dim={} action_dim={}", dims.0, dims.1),
            )),
            None => Ok(()),
        }
    }
}

/// Builder for DdpgAgent
pub struct DdpgBuilder {
    config: DdpgConfig,
}

impl DdpgBuilder {
    pub fn new(state_dim: usize, action_dim: usize) -> Self {
        DdpgBuilder { config: DdpgConfig::new(state_dim, action_dim) }
    }

    /// Start from an existing configuration
    pub fn from_config(config: DdpgConfig) -> Self {
        DdpgBuilder { config }
    }

    pub fn hidden_size(mut self, hidden_size: usize) -> Self {
        self.config = self.config.hidden_size(hidden_size);
        self
    }

    pub fn weight_init(mut self, init: WeightInit) -> Self {
        self.config = self.config.weight_init(init);
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config = self.config.gamma(gamma);
        self
    }

    pub fn tau(mut self, tau: f32) -> Self {
        self.config = self.config.tau(tau);
        self
    }

    pub fn learning_rates(mut self, actor_lr: f32, critic_lr: f32) -> Self {
        self.config = self.config.actor_lr(actor_lr).critic_lr(critic_lr);
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.buffer_capacity(capacity);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config = self.config.batch_size(batch_size);
        self
    }

    pub fn optimizer(mut self, optimizer: crate::config::OptimizerConfig) -> Self {
        self.config = self.config.optimizer(optimizer);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config = self.config.seed(seed);
        self
    }

    pub fn sync_targets_on_init(mut self, sync: bool) -> Self {
        self.config = self.config.sync_targets_on_init(sync);
        self
    }

    pub fn build(self) -> Result<DdpgAgent> {
        DdpgAgent::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Optimizer;
    use ndarray::array;

    fn small_agent(seed: u64) -> DdpgAgent {
        DdpgBuilder::new(3, 2).hidden_size(16).seed(seed).build().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let agent = DdpgBuilder::new(4, 1).hidden_size(8).build().unwrap();
        assert_eq!(agent.config().gamma, 0.99);
        assert_eq!(agent.config().tau, 0.001);
        assert_eq!(agent.actor_optimizer().learning_rate(), 0.001);
        assert_eq!(agent.critic_optimizer().learning_rate(), 0.002);
        assert_eq!(agent.replay_buffer().capacity(), 10_000);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        assert!(DdpgBuilder::new(0, 2).build().is_err());
        assert!(DdpgBuilder::new(3, 2).tau(2.0).build().is_err());
    }

    #[test]
    fn test_act_shape_and_bounds() {
        let agent = small_agent(0);
        let action = agent.act(array![0.1, -0.4, 2.0].view()).unwrap();
        assert_eq!(action.len(), 2);
        assert!(action.iter().all(|&a| a > 0.0 && a < 1.0));
    }

    #[test]
    fn test_act_wrong_state_length() {
        let agent = small_agent(0);
        assert!(matches!(
            agent.act(array![0.1, 0.2].view()),
            Err(DdpgError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_seeded_agents_are_identical() {
        let a = small_agent(42);
        let b = small_agent(42);
        assert_eq!(a.actor().parameters(), b.actor().parameters());
        assert_eq!(a.target_critic().parameters(), b.target_critic().parameters());
    }

    #[test]
    fn test_targets_independent_unless_synced() {
        let agent = small_agent(1);
        assert_ne!(agent.actor().parameters(), agent.target_actor().parameters());

        let synced = DdpgBuilder::new(3, 2).hidden_size(16).seed(1).sync_targets_on_init(true).build().unwrap();
        assert_eq!(synced.actor().parameters(), synced.target_actor().parameters());
        assert_eq!(synced.critic().parameters(), synced.target_critic().parameters());
    }

    #[test]
    fn test_weight_init_reaches_every_network() {

        let zeroed = DdpgBuilder::new(3, 2).hidden_size(8).weight_init(WeightInit::Zeros).seed(0).build().unwrap();
        for params in [zeroed.actor().parameters(), zeroed.target_critic().parameters()] {
            assert!(params.iter().all(|p| p.iter().all(|&w| w == 0.0)));
        }
        // Sigmoid of zero for every component
        let action = zeroed.act(array![1.0, -1.0, 0.5].view()).unwrap();
        assert_eq!(action, array![0.5, 0.5]);

        let bounded = DdpgBuilder::new(3, 2)
            .hidden_size(8)
            .weight_init(WeightInit::Uniform { min: -0.01, max: 0.01 })
            .seed(0)
            .build()
            .unwrap();
        assert!(bounded.critic().parameters().iter().all(|p| p.iter().all(|w| w.abs() <= 0.01)));

        assert!(DdpgBuilder::new(3, 2)
            .weight_init(WeightInit::Uniform { min: 1.0, max: 0.0 })
            .build()
            .is_err());
    }

    #[test]
    fn test_reload_sampling_depends_on_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = small_agent(12);
        for i in 0..50 {
            let s = array![i as f32, 0.0, 0.0];
            agent.remember(s.clone(), array![0.5, 0.5], i as f32, s);
        }

        agent.train_step(8).unwrap();
        agent.save(dir.path().join("one.bin")).unwrap();
        agent.train_step(8).unwrap();
        agent.save(dir.path().join("two.bin")).unwrap();

        let mut first = DdpgAgent::load(dir.path().join("one.bin")).unwrap();
        let mut second = DdpgAgent::load(dir.path().join("two.bin")).unwrap();
        assert_eq!(first.train_steps(), 1);
        assert_eq!(second.train_steps(), 2);

        for i in 0..50 {
            let s = array![i as f32, 0.0, 0.0];
            first.remember(s.clone(), array![0.5, 0.5], i as f32, s.clone());
            second.remember(s.clone(), array![0.5, 0.5], i as f32, s);
        }
        let a: Vec<f32> = first.replay_buffer.sample(10).unwrap().iter().map(|t| t.reward).collect();
        let b: Vec<f32> = second.replay_buffer.sample(10).unwrap().iter().map(|t| t.reward).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_batch_size() {
        let mut agent = small_agent(2);
        assert!(matches!(agent.train_step(0), Err(DdpgError::InvalidParameter { .. })));
    }

    #[test]
    fn test_train_uses_configured_batch_size() {
        let mut agent = DdpgBuilder::new(3, 2).hidden_size(16).batch_size(4).seed(3).build().unwrap();
        for i in 0..4 {
            let s = array![i as f32, 0.0, 1.0];
            agent.remember(s.clone(), array![0.5, 0.5], 1.0, s);
        }
        let stats = agent.train().unwrap().unwrap();
        assert_eq!(stats.batch_size, 4);
        assert!(stats.critic_loss.is_finite());
    }

    #[test]
    fn test_ragged_transition_surfaces_error() {
        let mut agent = small_agent(4);
        agent.remember(array![0.0, 0.0, 0.0], array![0.5, 0.5], 0.0, array![0.0, 0.0, 0.0]);
        agent.remember(array![0.0, 0.0], array![0.5, 0.5], 0.0, array![0.0, 0.0]);
        assert!(matches!(agent.train_step(2), Err(DdpgError::DimensionMismatch { .. })));
    }
}
