use ndarray::{array, Array1, Array2};
use tempfile::tempdir;

use crate::error::SnakeQError;
use crate::export::frozen::FrozenModel;
use crate::network::{Checkpoint, QNetwork};

#[test]
fn test_output_length_matches_architecture() {
    let mut network = QNetwork::new(11, 128, 3);
    let output = network.forward(Array1::zeros(11).view());
    assert_eq!(output.len(), 3);
    assert!(output.iter().all(|v| v.is_finite()));
}

#[test]
fn test_forward_batch_shape() {
    let mut network = QNetwork::new(4, 8, 2);
    let inputs = Array2::zeros((5, 4));
    let outputs = network.forward_batch(inputs.view());
    assert_eq!(outputs.shape(), &[5, 2]);
}

#[test]
fn test_save_load_roundtrip_identical_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pth");

    let mut network = QNetwork::new(4, 8, 2);
    let input = array![0.3, -0.7, 1.2, 0.0];
    let before = network.forward(input.view());

    network.save(&path).unwrap();
    let mut reloaded = QNetwork::load(&path, 4, 8, 2).unwrap();
    let after = reloaded.forward(input.view());

    assert_eq!(before, after);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("model").join("model.pth");

    let network = QNetwork::new(4, 8, 2);
    network.save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_load_rejects_mismatched_architecture() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pth");

    QNetwork::new(4, 8, 2).save(&path).unwrap();
    let result = QNetwork::load(&path, 4, 16, 2);
    assert!(matches!(result, Err(SnakeQError::ShapeMismatch { .. })));
}

#[test]
fn test_load_accepts_wrapped_checkpoint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.pth");

    let mut network = QNetwork::new(4, 8, 2);
    let input = array![0.1, 0.2, 0.3, 0.4];
    let before = network.forward(input.view());

    let checkpoint = Checkpoint {
        state_dict: network.state_dict(),
        n_game: 42,
        record: 31,
    };
    std::fs::write(&path, bincode::serialize(&checkpoint).unwrap()).unwrap();

    let mut reloaded = QNetwork::load(&path, 4, 8, 2).unwrap();
    assert_eq!(before, reloaded.forward(input.view()));
}

#[test]
fn test_load_accepts_serialized_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("full.pth");

    let mut network = QNetwork::new(4, 8, 2);
    let input = array![0.5, 0.5, -0.5, -0.5];
    let before = network.forward(input.view());

    std::fs::write(&path, bincode::serialize(&network).unwrap()).unwrap();

    let mut reloaded = QNetwork::load(&path, 4, 8, 2).unwrap();
    assert_eq!(before, reloaded.forward(input.view()));
}

#[test]
fn test_frozen_model_matches_network() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pt");

    let mut network = QNetwork::new(4, 8, 2);
    network.save_frozen(&path).unwrap();

    let frozen = FrozenModel::load(&path).unwrap();
    let input = array![1.0, -1.0, 0.25, 0.75];
    let expected = network.forward(input.view());
    let actual = frozen.forward(input.view()).unwrap();
    assert_eq!(expected, actual);
}

#[test]
fn test_frozen_model_rejects_wrong_input_length() {
    let network = QNetwork::new(4, 8, 2);
    let frozen = FrozenModel::trace(&network);
    let result = frozen.forward(array![1.0, 2.0].view());
    assert!(matches!(result, Err(SnakeQError::ShapeMismatch { .. })));
}

#[test]
fn test_onnx_export_names_and_opset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.onnx");

    let network = QNetwork::new(11, 16, 3);
    network.export_onnx(&path, 13).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let graph: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(graph["opset_version"], 13);
    assert_eq!(graph["graph"]["inputs"][0]["name"], "state");
    assert_eq!(graph["graph"]["inputs"][0]["shape"][0], "batch");
    assert_eq!(graph["graph"]["outputs"][0]["name"], "q_values");
    assert_eq!(graph["graph"]["outputs"][0]["shape"][1], 3);
}
