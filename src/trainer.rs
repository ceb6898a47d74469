use ndarray::{Array1, Array2};
use std::path::Path;

use crate::error::{Result, SnakeQError};
use crate::export::onnx::OnnxExporter;
use crate::network::QNetwork;
use crate::optimizer::Adam;
use crate::replay_buffer::Transition;

/// Temporal-difference trainer owning the online and target networks.
///
/// The target network's parameters are a point-in-time copy of the online
/// network's; they diverge between `copy_model` syncs and are never trained
/// directly.
pub struct QTrainer {
    pub gamma: f32,
    pub learning_rate: f32,
    pub model: QNetwork,
    pub target_model: QNetwork,
    optimizer: Adam,
}

impl QTrainer {
    pub fn new(
        learning_rate: f32,
        gamma: f32,
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
    ) -> Result<Self> {
        if !(0.0..1.0).contains(&gamma) || gamma == 0.0 {
            return Err(SnakeQError::invalid_parameter(
                "gamma",
                format!("discount factor must be in (0, 1), got {}", gamma),
            ));
        }
        if learning_rate <= 0.0 {
            return Err(SnakeQError::invalid_parameter(
                "learning_rate",
                format!("learning rate must be positive, got {}", learning_rate),
            ));
        }

        let model = QNetwork::new(input_dim, hidden_dim, output_dim);
        let target_model = QNetwork::new(input_dim, hidden_dim, output_dim);
        let optimizer = Adam::default_for(&model.layers);

        let mut trainer = QTrainer {
            gamma,
            learning_rate,
            model,
            target_model,
            optimizer,
        };
        trainer.copy_model();
        Ok(trainer)
    }

    /// Hard sync: overwrite every target-network parameter with the current
    /// online-network value.
    pub fn copy_model(&mut self) {
        for (target, online) in self.target_model.layers.iter_mut().zip(&self.model.layers) {
            target.weights = online.weights.clone();
            target.biases = online.biases.clone();
        }
    }

    /// Bootstrap targets for a batch: `r + gamma * max_a' Q_target(s', a')`
    /// for non-terminal transitions, the raw reward for terminal ones. The
    /// target network is evaluated without any gradient flow.
    pub(crate) fn compute_targets(&mut self, batch: &[&Transition]) -> Result<Array1<f32>> {
        let batch_size = batch.len();
        let mut next_states = Array2::zeros((batch_size, self.model.input_dim));
        for (i, transition) in batch.iter().enumerate() {
            if transition.next_state.len() != self.model.input_dim {
                return Err(SnakeQError::shape_mismatch(
                    format!("state of length {}", self.model.input_dim),
                    format!("state of length {}", transition.next_state.len()),
                ));
            }
            next_states.row_mut(i).assign(&transition.next_state);
        }

        let next_q_values = self.target_model.forward_batch(next_states.view());
        let mut targets = Array1::zeros(batch_size);
        for (i, transition) in batch.iter().enumerate() {
            targets[i] = if transition.done {
                transition.reward
            } else {
                let max_next_q = next_q_values
                    .row(i)
                    .iter()
                    .fold(f32::NEG_INFINITY, |max, &v| max.max(v));
                transition.reward + self.gamma * max_next_q
            };
        }
        Ok(targets)
    }

    /// One TD update on a batch of transitions. Returns the MSE loss between
    /// the predicted action-values and the bootstrap targets.
    pub fn train_step(&mut self, batch: &[&Transition]) -> Result<f32> {
        if batch.is_empty() {
            return Err(SnakeQError::EmptyBuffer(
                "no transitions to train on".to_string(),
            ));
        }

        let batch_size = batch.len();
        let mut states = Array2::zeros((batch_size, self.model.input_dim));
        for (i, transition) in batch.iter().enumerate() {
            if transition.state.len() != self.model.input_dim {
                return Err(SnakeQError::shape_mismatch(
                    format!("state of length {}", self.model.input_dim),
                    format!("state of length {}", transition.state.len()),
                ));
            }
            if transition.action >= self.model.output_dim {
                return Err(SnakeQError::invalid_parameter(
                    "action",
                    format!(
                        "action {} out of range for {} actions",
                        transition.action, self.model.output_dim
                    ),
                ));
            }
            states.row_mut(i).assign(&transition.state);
        }

        let targets = self.compute_targets(batch)?;

        // Forward pass caches activations for the backward pass.
        let predictions = self.model.forward_batch(states.view());

        // MSE over the taken-action entries only; other outputs carry no error.
        let mut loss = 0.0;
        let mut output_errors = Array2::zeros(predictions.raw_dim());
        for (i, transition) in batch.iter().enumerate() {
            let predicted = predictions[[i, transition.action]];
            let diff = predicted - targets[i];
            loss += diff * diff;
            output_errors[[i, transition.action]] = 2.0 * diff / batch_size as f32;
        }
        loss /= batch_size as f32;

        let gradients = self.model.backward_batch(output_errors.view());
        self.optimizer
            .step(&mut self.model.layers, &gradients, self.learning_rate);

        Ok(loss)
    }

    /// Freeze the online network to an interchange graph at the given schema
    /// version, preferring the newer exporter and falling back to the plain
    /// one when the capability probe rejects the requested version. Any
    /// failure from either path is wrapped with its cause.
    pub fn export_onnx(&self, path: &Path, opset_version: u32) -> Result<()> {
        let result = if OnnxExporter::supports_opset(opset_version) {
            OnnxExporter::export_preferred(&self.model, path, opset_version)
        } else {
            OnnxExporter::export(&self.model, path, opset_version)
        };
        result.map_err(SnakeQError::export_failure)
    }
}
