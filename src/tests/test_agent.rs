use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::algorithms::{DdpgAgent, DdpgBuilder};
use crate::approximator::FunctionApproximator;
use crate::config::DdpgConfig;
use crate::layers::WeightInit;
use crate::models::{Actor, Critic};
use crate::optimizer::{Optimizer, OptimizerWrapper, SGD};
use crate::target::parameter_distance;

fn fill(agent: &mut DdpgAgent, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let state_dim = agent.config().state_dim;
    let action_dim = agent.config().action_dim;
    for _ in 0..count {
        let state = Array1::from_shape_fn(state_dim, |_| rng.gen_range(-1.0..1.0));
        let action = Array1::from_shape_fn(action_dim, |_| rng.gen_range(0.0..1.0));
        let next_state = Array1::from_shape_fn(state_dim, |_| rng.gen_range(-1.0..1.0));
        let reward = rng.gen_range(-1.0..1.0);
        agent.remember(state, action, reward, next_state);
    }
}

fn adam_steps(optimizer: &OptimizerWrapper) -> u32 {
    match optimizer {
        OptimizerWrapper::Adam(adam) => adam.t,
        OptimizerWrapper::SGD(_) => 0,
    }
}

#[test]
fn test_end_to_end_training_step() {
    let mut agent = DdpgAgent::new(DdpgConfig::new(3, 2).seed(0)).unwrap();
    fill(&mut agent, 100, 1);
    assert_eq!(agent.replay_buffer().len(), 100);

    let actor_before = agent.actor().parameters();
    let critic_before = agent.critic().parameters();
    let target_actor_before = agent.target_actor().parameters();
    let target_critic_before = agent.target_critic().parameters();

    let stats = agent.train_step(64).unwrap().expect("enough data to train");
    assert_eq!(stats.batch_size, 64);
    assert!(stats.critic_loss.is_finite());
    assert!(stats.actor_loss.is_finite());

    assert_ne!(agent.actor().parameters(), actor_before);
    assert_ne!(agent.critic().parameters(), critic_before);
    // Targets only move on request
    assert_eq!(agent.target_actor().parameters(), target_actor_before);
    assert_eq!(agent.target_critic().parameters(), target_critic_before);

    // Too few transitions for this batch: nothing changes
    let actor_after = agent.actor().parameters();
    let critic_after = agent.critic().parameters();
    assert!(agent.train_step(200).unwrap().is_none());
    assert_eq!(agent.actor().parameters(), actor_after);
    assert_eq!(agent.critic().parameters(), critic_after);
    assert_eq!(adam_steps(agent.actor_optimizer()), 1);
    assert_eq!(adam_steps(agent.critic_optimizer()), 1);
}

#[test]
fn test_train_step_without_data_is_a_no_op() {
    let mut agent = DdpgBuilder::new(3, 2).hidden_size(16).seed(8).build().unwrap();
    fill(&mut agent, 10, 2);
    let snapshot = agent.clone();

    assert_eq!(agent.train_step(11).unwrap(), None);

    assert_eq!(agent.actor().parameters(), snapshot.actor().parameters());
    assert_eq!(agent.critic().parameters(), snapshot.critic().parameters());
    assert_eq!(agent.target_actor().parameters(), snapshot.target_actor().parameters());
    assert_eq!(agent.target_critic().parameters(), snapshot.target_critic().parameters());
    assert_eq!(adam_steps(agent.critic_optimizer()), 0);
    assert_eq!(agent.replay_buffer().len(), 10);
}

#[test]
fn test_update_target_networks_formula() {
    let mut agent = DdpgBuilder::new(3, 2).hidden_size(16).tau(0.001).seed(3).build().unwrap();
    let online_actor = agent.actor().parameters();
    let online_critic = agent.critic().parameters();
    let target_actor = agent.target_actor().parameters();
    let target_critic = agent.target_critic().parameters();

    agent.update_target_networks().unwrap();

    let pairs = [
        (online_actor, target_actor, agent.target_actor().parameters()),
        (online_critic, target_critic, agent.target_critic().parameters()),
    ];
    for (online, before, after) in pairs.iter() {
        for ((a, b), updated) in online.iter().zip(before).zip(after) {
            let expected = a * 0.001 + b * 0.999;
            assert!((updated - &expected).iter().all(|d| d.abs() < 1e-6));
        }
    }
    // Online networks are untouched by target updates
    assert_eq!(agent.actor().parameters(), pairs[0].0);
}

#[test]
fn test_targets_converge_towards_frozen_online() {
    let mut agent = DdpgBuilder::new(3, 2).hidden_size(16).tau(0.01).seed(4).build().unwrap();
    let mut previous = parameter_distance(agent.target_actor(), agent.actor()).unwrap();

    for _ in 0..50 {
        agent.update_target_networks().unwrap();
        let distance = parameter_distance(agent.target_actor(), agent.actor()).unwrap();
        assert!(distance < previous);
        assert!(distance > 0.0);
        previous = distance;
    }
}

#[test]
fn test_sync_targets_hard() {
    let mut agent = DdpgBuilder::new(3, 2).hidden_size(16).seed(5).build().unwrap();
    assert_ne!(agent.target_critic().parameters(), agent.critic().parameters());

    agent.sync_targets_hard().unwrap();
    assert_eq!(agent.target_actor().parameters(), agent.actor().parameters());
    assert_eq!(agent.target_critic().parameters(), agent.critic().parameters());
}

#[test]
fn test_act_does_not_change_agent() {
    let agent = DdpgBuilder::new(3, 2).hidden_size(16).seed(6).build().unwrap();
    let state = array![0.3, -0.1, 0.8];
    let first = agent.act(state.view()).unwrap();
    let second = agent.act(state.view()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_critic_loss_decreases_on_fixed_data() {
    let mut agent = DdpgBuilder::new(2, 1).hidden_size(32).seed(7).build().unwrap();
    fill(&mut agent, 32, 9);

    let mut losses = Vec::new();
    for _ in 0..300 {
        losses.push(agent.train_step(32).unwrap().unwrap().critic_loss);
    }
    let early: f32 = losses[..10].iter().sum::<f32>() / 10.0;
    let late: f32 = losses[losses.len() - 10..].iter().sum::<f32>() / 10.0;
    assert!(late < early, "critic loss went from {} to {}", early, late);
}

#[test]
fn test_actor_step_increases_critic_value() {
    let mut rng = StdRng::seed_from_u64(10);
    let mut actor = Actor::new_using(3, 2, 16, WeightInit::XavierUniform, &mut rng).unwrap();
    let critic = Critic::new_using(3, 2, 16, WeightInit::XavierUniform, &mut rng).unwrap();
    let states = Array2::from_shape_fn((8, 3), |_| rng.gen_range(-1.0..1.0));
    let batch = states.nrows() as f32;

    let objective = |actor: &Actor| -> f32 {
        let actions = actor.forward(states.view()).unwrap();
        let values = critic.forward((states.view(), actions.view())).unwrap();
        -values.mean().unwrap()
    };

    let before = objective(&actor);
    let (actions, actor_trace) = actor.forward_traced(states.view()).unwrap();
    let (values, critic_trace) = critic.forward_traced(states.view(), actions.view()).unwrap();
    let upstream = Array2::from_elem(values.raw_dim(), -1.0 / batch);
    let action_errors = critic.backward(&critic_trace, upstream.view()).unwrap().actions;
    let grads = actor.backward(&actor_trace, action_errors.view()).unwrap();

    let mut optimizer = OptimizerWrapper::SGD(SGD::new(0.01));
    assert_eq!(optimizer.learning_rate(), 0.01);
    actor.apply_gradients(&grads, &mut optimizer).unwrap();

    assert!(objective(&actor) < before);
}
