use ndarray::array;
use tempfile::tempdir;

use crate::error::SnakeQError;
use crate::replay_buffer::Transition;
use crate::trainer::QTrainer;

fn terminal_transition(reward: f32) -> Transition {
    Transition {
        state: array![0.1, 0.2, 0.3, 0.4],
        action: 1,
        reward,
        next_state: array![0.5, 0.6, 0.7, 0.8],
        done: true,
    }
}

#[test]
fn test_terminal_target_is_raw_reward() {
    // The discount term is zeroed for terminal transitions, independent of gamma.
    for gamma in [0.1, 0.5, 0.99] {
        let mut trainer = QTrainer::new(0.001, gamma, 4, 8, 2).unwrap();
        let transition = terminal_transition(5.0);
        let targets = trainer.compute_targets(&[&transition]).unwrap();
        assert_eq!(targets[0], 5.0);
    }
}

#[test]
fn test_bootstrap_target_uses_target_network() {
    let mut trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();
    let next_state = array![0.5, 0.6, 0.7, 0.8];

    let next_q = trainer.target_model.forward(next_state.view());
    let max_next_q = next_q.iter().fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let expected = 1.0 + 0.9 * max_next_q;

    let transition = Transition {
        state: array![0.1, 0.2, 0.3, 0.4],
        action: 0,
        reward: 1.0,
        next_state,
        done: false,
    };
    let targets = trainer.compute_targets(&[&transition]).unwrap();
    assert!((targets[0] - expected).abs() < 1e-6);
}

#[test]
fn test_copy_model_hard_syncs_all_parameters() {
    let mut trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();
    for layer in &mut trainer.model.layers {
        layer.weights.mapv_inplace(|w| w + 1.0);
        layer.biases.mapv_inplace(|b| b - 0.5);
    }

    trainer.copy_model();
    for (target, online) in trainer.target_model.layers.iter().zip(&trainer.model.layers) {
        assert_eq!(target.weights, online.weights);
        assert_eq!(target.biases, online.biases);
    }
}

#[test]
fn test_train_step_reduces_loss_on_fixed_target() {
    let mut trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();
    let transition = terminal_transition(1.0);

    let first_loss = trainer.train_step(&[&transition]).unwrap();
    let mut last_loss = first_loss;
    for _ in 0..200 {
        last_loss = trainer.train_step(&[&transition]).unwrap();
    }
    assert!(last_loss < first_loss, "loss {} did not decrease from {}", last_loss, first_loss);
}

#[test]
fn test_train_step_rejects_empty_batch() {
    let mut trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();
    let result = trainer.train_step(&[]);
    assert!(matches!(result, Err(SnakeQError::EmptyBuffer(_))));
}

#[test]
fn test_invalid_gamma_rejected() {
    assert!(QTrainer::new(0.001, 0.0, 4, 8, 2).is_err());
    assert!(QTrainer::new(0.001, 1.0, 4, 8, 2).is_err());
    assert!(QTrainer::new(0.001, 1.5, 4, 8, 2).is_err());
}

#[test]
fn test_export_onnx_prefers_new_exporter() {
    let dir = tempdir().unwrap();
    let trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();

    let preferred = dir.path().join("preferred.onnx");
    trainer.export_onnx(&preferred, 17).unwrap();
    let graph: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&preferred).unwrap()).unwrap();
    assert_eq!(graph["producer"], "snakeq-graph");
    assert_eq!(graph["opset_version"], 17);

    // Below the preferred exporter's minimum opset the plain exporter takes over.
    let legacy = dir.path().join("legacy.onnx");
    trainer.export_onnx(&legacy, 13).unwrap();
    let graph: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&legacy).unwrap()).unwrap();
    assert_eq!(graph["producer"], "snakeq-legacy");
    assert_eq!(graph["opset_version"], 13);
}

#[test]
fn test_export_failure_carries_cause() {
    let dir = tempdir().unwrap();
    let trainer = QTrainer::new(0.001, 0.9, 4, 8, 2).unwrap();

    let missing_dir = dir.path().join("does-not-exist").join("model.onnx");
    let err = trainer.export_onnx(&missing_dir, 17).unwrap_err();
    assert!(matches!(err, SnakeQError::ExportFailure(_)));
    assert!(std::error::Error::source(&err).is_some());
}
