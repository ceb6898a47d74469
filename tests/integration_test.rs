use ndarray::{array, Array1};
use tempfile::tempdir;

use snakeq::config::{AgentConfig, TrainConfig, CHECKPOINT_FILE, FROZEN_FILE};
use snakeq::env::Environment;
use snakeq::modes;
use snakeq::network::QNetwork;
use snakeq::quantize::export_quantized_from_checkpoint;

/// Deterministic stand-in for the game: episodes last five steps, score is
/// steps survived, and the reward prefers action 0.
struct StubEnv {
    step: usize,
    in_game_steps: usize,
}

impl StubEnv {
    fn new() -> Self {
        StubEnv {
            step: 0,
            in_game_steps: 0,
        }
    }
}

impl Environment for StubEnv {
    fn n_state(&self) -> usize {
        4
    }

    fn n_action(&self) -> usize {
        3
    }

    fn get_state(&self) -> Array1<f32> {
        let phase = (self.step % 5) as f32 / 5.0;
        array![phase, 1.0 - phase, (self.step % 2) as f32, 0.5]
    }

    fn play_step(&mut self, action: usize) -> (f32, bool, i32) {
        self.step += 1;
        self.in_game_steps += 1;
        let reward = if action == 0 { 1.0 } else { -0.1 };
        let done = self.in_game_steps >= 5;
        (reward, done, self.in_game_steps as i32)
    }

    fn reset(&mut self) {
        self.in_game_steps = 0;
    }
}

#[test]
fn test_end_to_end_training_and_export() {
    let dir = tempdir().unwrap();
    let model_dir = dir.path().join("model");

    let agent_config = AgentConfig {
        hidden_dim: 8,
        max_memory: 100,
        max_explore: 2,
        ..AgentConfig::default()
    };
    let train_config = TrainConfig {
        batch_size: 16,
        sync_every: 5,
        model_dir: model_dir.clone(),
        max_games: Some(3),
    };

    let mut env = StubEnv::new();
    let report = modes::train(&mut env, &agent_config, &train_config).unwrap();
    assert_eq!(report.games, 3);
    assert!(report.total_steps >= 15);
    assert!(report.record > 0);
    assert!(model_dir.join(CHECKPOINT_FILE).exists());

    // Freeze the checkpoint and play greedily from it.
    modes::export_frozen(&model_dir, 4, 8, 3).unwrap();
    assert!(model_dir.join(FROZEN_FILE).exists());

    let mut env = StubEnv::new();
    let scores = modes::play(&mut env, &model_dir, 2).unwrap();
    assert_eq!(scores.len(), 2);

    // Quantize the same checkpoint with states drawn from the environment.
    let calibration: Vec<Array1<f32>> = (0..10)
        .map(|i| {
            let phase = (i % 5) as f32 / 5.0;
            array![phase, 1.0 - phase, (i % 2) as f32, 0.5]
        })
        .collect();
    let artifact = model_dir.join("model_int8.bin");
    export_quantized_from_checkpoint(
        &model_dir.join(CHECKPOINT_FILE),
        &artifact,
        4,
        8,
        3,
        calibration,
    )
    .unwrap();

    let bytes = std::fs::read(&artifact).unwrap();
    assert!(!bytes.is_empty());
    let header = std::fs::read_to_string(model_dir.join("model_int8.h")).unwrap();
    assert!(header.contains(&format!("const int model_int8_len = {};", bytes.len())));
}

#[test]
fn test_fresh_network_on_zero_state() {
    let mut network = QNetwork::new(11, 128, 3);
    let output = network.forward(Array1::zeros(11).view());
    assert_eq!(output.len(), 3);
    assert!(output.iter().all(|v| v.is_finite()));
}
