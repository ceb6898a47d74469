use std::path::PathBuf;

/// Default checkpoint filename inside the model directory.
pub const CHECKPOINT_FILE: &str = "model.pth";

/// Default frozen-graph filename inside the model directory.
pub const FROZEN_FILE: &str = "model.pt";

/// Agent hyperparameters.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Exploration anneals linearly: epsilon = max_explore - games played.
    pub max_explore: i32,
    /// Discount factor for future rewards, in (0, 1).
    pub gamma: f32,
    /// Replay buffer capacity.
    pub max_memory: usize,
    /// Fixed Adam learning rate.
    pub learning_rate: f32,
    /// Width of both hidden layers.
    pub hidden_dim: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_explore: 100,
            gamma: 0.9,
            max_memory: 5000,
            learning_rate: 0.001,
            hidden_dim: 128,
        }
    }
}

/// Training-loop parameters.
#[derive(Clone, Debug)]
pub struct TrainConfig {
    /// Batch size for long-memory training steps.
    pub batch_size: usize,
    /// Sync the target network every this many environment steps.
    pub sync_every: usize,
    /// Directory receiving checkpoints and exported models.
    pub model_dir: PathBuf,
    /// Stop after this many games; `None` trains until interrupted.
    pub max_games: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            batch_size: 256,
            sync_every: 10,
            model_dir: PathBuf::from("./model"),
            max_games: None,
        }
    }
}
