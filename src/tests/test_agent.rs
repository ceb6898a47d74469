use ndarray::array;

use crate::activations::{argmax, softmax};
use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::SnakeQError;
use crate::replay_buffer::Transition;

fn small_config() -> AgentConfig {
    AgentConfig {
        max_explore: 10,
        hidden_dim: 8,
        max_memory: 50,
        ..AgentConfig::default()
    }
}

fn transition(tag: f32) -> Transition {
    Transition {
        state: array![tag, 0.0, 0.0, 0.0],
        action: 0,
        reward: 1.0,
        next_state: array![tag + 1.0, 0.0, 0.0, 0.0],
        done: false,
    }
}

#[test]
fn test_exploration_never_triggers_after_annealing() {
    // With n_game >= max_explore, epsilon <= 0 and the draw in
    // [0, max_explore] can never fall below it.
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let state = array![0.2, -0.1, 0.4, 0.0];
    let greedy = argmax(agent.trainer.model.forward(state.view()).view());

    for n_game in [10, 11, 100] {
        for _ in 0..25 {
            let action = agent.get_action(state.view(), n_game, true).unwrap();
            assert_eq!(action, greedy);
        }
    }
}

#[test]
fn test_explore_flag_off_is_always_greedy() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let state = array![0.2, -0.1, 0.4, 0.0];
    let greedy = argmax(agent.trainer.model.forward(state.view()).view());

    for _ in 0..25 {
        let action = agent.get_action(state.view(), 0, false).unwrap();
        assert_eq!(action, greedy);
    }
}

#[test]
fn test_exploring_actions_stay_in_range() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let state = array![0.2, -0.1, 0.4, 0.0];

    for _ in 0..50 {
        let action = agent.get_action(state.view(), 0, true).unwrap();
        assert!(action < 3);
    }
}

#[test]
fn test_get_action_rejects_wrong_state_length() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let result = agent.get_action(array![1.0, 2.0].view(), 0, true);
    assert!(matches!(result, Err(SnakeQError::ShapeMismatch { .. })));
}

#[test]
fn test_remember_respects_buffer_capacity() {
    let config = AgentConfig {
        max_memory: 3,
        hidden_dim: 8,
        ..AgentConfig::default()
    };
    let mut agent = Agent::new(4, 3, &config).unwrap();
    for i in 0..5 {
        agent.remember(transition(i as f32));
    }
    assert_eq!(agent.memory.len(), 3);
}

#[test]
fn test_train_long_memory_uses_whole_buffer_when_small() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    agent.remember(transition(0.0));
    agent.remember(transition(1.0));

    let loss = agent.train_long_memory(256).unwrap();
    assert!(loss.is_finite());
}

#[test]
fn test_train_long_memory_rejects_empty_buffer() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let result = agent.train_long_memory(32);
    assert!(matches!(result, Err(SnakeQError::EmptyBuffer(_))));
}

#[test]
fn test_train_short_memory_single_step() {
    let mut agent = Agent::new(4, 3, &small_config()).unwrap();
    let loss = agent.train_short_memory(&transition(0.5)).unwrap();
    assert!(loss.is_finite());
}

#[test]
fn test_softmax_is_a_distribution() {
    let probabilities = softmax(array![1.0, 2.0, 3.0].view());
    assert!((probabilities.sum() - 1.0).abs() < 1e-6);
    assert!(probabilities.iter().all(|&p| p > 0.0));
    // Higher Q-values carry more probability mass.
    assert!(probabilities[2] > probabilities[1]);
    assert!(probabilities[1] > probabilities[0]);
}
