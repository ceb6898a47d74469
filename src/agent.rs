use ndarray::ArrayView1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{thread_rng, Rng};

use crate::activations::{argmax, softmax};
use crate::config::AgentConfig;
use crate::error::{Result, SnakeQError};
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::trainer::QTrainer;

/// DQN agent: owns the replay buffer and the exploration policy, and drives
/// short-term (per-step) and long-term (batched) learning through the trainer.
pub struct Agent {
    pub n_state: usize,
    pub n_action: usize,
    pub max_explore: i32,
    pub n_game: i32,
    pub memory: ReplayBuffer,
    pub trainer: QTrainer,
}

impl Agent {
    pub fn new(n_state: usize, n_action: usize, config: &AgentConfig) -> Result<Self> {
        let trainer = QTrainer::new(
            config.learning_rate,
            config.gamma,
            n_state,
            config.hidden_dim,
            n_action,
        )?;
        Ok(Agent {
            n_state,
            n_action,
            max_explore: config.max_explore,
            n_game: 0,
            memory: ReplayBuffer::new(config.max_memory),
            trainer,
        })
    }

    /// Choose an action for the given state.
    ///
    /// Epsilon anneals linearly with games played: `epsilon = max_explore -
    /// n_game`. An exploring draw samples from the softmax distribution over
    /// the raw Q-values rather than uniformly; otherwise the arg-max action
    /// is taken.
    pub fn get_action(&mut self, state: ArrayView1<f32>, n_game: i32, explore: bool) -> Result<usize> {
        if state.len() != self.n_state {
            return Err(SnakeQError::shape_mismatch(
                format!("state of length {}", self.n_state),
                format!("state of length {}", state.len()),
            ));
        }

        let prediction = self.trainer.model.forward(state);
        let epsilon = self.max_explore - n_game;
        let mut rng = thread_rng();

        if explore && rng.gen_range(0..=self.max_explore) < epsilon {
            let probabilities = softmax(prediction.view());
            let distribution = WeightedIndex::new(probabilities.iter().cloned()).map_err(|e| {
                SnakeQError::NumericalError(format!(
                    "softmax over Q-values is not a valid distribution: {}",
                    e
                ))
            })?;
            Ok(distribution.sample(&mut rng))
        } else {
            Ok(argmax(prediction.view()))
        }
    }

    /// Record a transition. Eviction of the oldest entry is handled by the
    /// buffer's fixed-capacity policy.
    pub fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One gradient step on a single transition, taken immediately after acting.
    pub fn train_short_memory(&mut self, transition: &Transition) -> Result<f32> {
        self.trainer.train_step(&[transition])
    }

    /// One gradient step on a batch sampled without replacement from the
    /// replay buffer. If the buffer holds no more than `batch_size`
    /// transitions, the entire buffer is used.
    pub fn train_long_memory(&mut self, batch_size: usize) -> Result<f32> {
        if self.memory.is_empty() {
            return Err(SnakeQError::EmptyBuffer(
                "replay buffer holds no transitions".to_string(),
            ));
        }
        let batch = if self.memory.len() > batch_size {
            self.memory.sample(batch_size)
        } else {
            self.memory.iter().collect()
        };
        self.trainer.train_step(&batch)
    }
}
