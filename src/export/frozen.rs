use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::error::{Result, SnakeQError};
use crate::network::QNetwork;

/// One affine transform of a frozen graph.
#[derive(Serialize, Deserialize, Clone)]
struct FrozenDense {
    weights: Array2<f32>,
    biases: Array1<f32>,
    activation: Activation,
}

/// A traced, inference-only copy of a trained network.
///
/// The graph has a fixed input shape and no control flow or training state;
/// it exists so deployment code can run predictions without carrying the
/// trainable network around. Default filename counterpart: `model.pt`.
#[derive(Serialize, Deserialize, Clone)]
pub struct FrozenModel {
    pub input_dim: usize,
    pub output_dim: usize,
    layers: Vec<FrozenDense>,
}

impl FrozenModel {
    /// Trace a network into a frozen graph by copying its parameters in
    /// evaluation order.
    pub fn trace(network: &QNetwork) -> Self {
        let layers = network
            .layers
            .iter()
            .map(|layer| FrozenDense {
                weights: layer.weights.clone(),
                biases: layer.biases.clone(),
                activation: layer.activation,
            })
            .collect();
        FrozenModel {
            input_dim: network.input_dim,
            output_dim: network.output_dim,
            layers,
        }
    }

    /// Run inference on a single state vector.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let input = input.insert_axis(Axis(0));
        let output = self.forward_batch(input)?;
        let shape = output.shape()[1];
        Ok(output.into_shape((shape,)).unwrap())
    }

    /// Run inference on a batch of state vectors.
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.shape()[1] != self.input_dim {
            return Err(SnakeQError::shape_mismatch(
                format!("input of length {}", self.input_dim),
                format!("input of length {}", inputs.shape()[1]),
            ));
        }
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let mut outputs = current.dot(&layer.weights.t()) + &layer.biases.clone().insert_axis(Axis(0));
            layer.activation.apply_batch(&mut outputs);
            current = outputs;
        }
        Ok(current)
    }

    /// Serialize the frozen graph, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a frozen graph from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let model = bincode::deserialize(&bytes)?;
        Ok(model)
    }
}
