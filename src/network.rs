use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::error::{Result, SnakeQError};
use crate::export::frozen::FrozenModel;
use crate::export::onnx::OnnxExporter;
use crate::transplant::WeightedLayer;

/// A fully connected layer of the Q-network.
///
/// Weights are stored `(out, in)` with a bias of shape `(out,)`, the layout
/// the checkpoint format and the weight transplant assume.
#[derive(Serialize, Deserialize, Clone)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new layer with uniform random weights in [-0.1, 0.1] and zero biases.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        let weights = Array2::random((output_size, input_size), Uniform::new(-0.1, 0.1));
        let biases = Array1::zeros(output_size);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Forward pass for a batch of input vectors, caching the inputs and
    /// pre-activation outputs for the backward pass.
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights.t()) + &self.biases.clone().insert_axis(Axis(0));
        self.pre_activation = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Backward pass for a batch of output errors. Returns the error
    /// propagated to the previous layer along with the weight and bias
    /// gradients for this layer.
    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
        let pre_activation = self
            .pre_activation
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let inputs = self
            .inputs
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let adjusted_error = output_errors.to_owned() * &self.activation.derivative_batch(pre_activation.view());
        let weight_gradients = adjusted_error.t().dot(inputs);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_error = adjusted_error.dot(&self.weights);
        (input_error, weight_gradients, bias_gradients)
    }
}

/// One named parameter tensor of a checkpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StateEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Ordered key -> tensor mapping, the persistent parameter-state payload.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StateDict {
    pub entries: Vec<StateEntry>,
}

/// A checkpoint wrapper carrying the parameter state alongside training
/// bookkeeping. `QNetwork::load` accepts this payload as well as a raw
/// [`StateDict`] or a fully serialized [`QNetwork`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Checkpoint {
    pub state_dict: StateDict,
    pub n_game: u32,
    pub record: i32,
}

/// The fixed Q-network architecture: two hidden affine+ReLU transforms of
/// width `hidden_dim` followed by a linear output transform. Layer order is
/// fixed at construction and never changes.
#[derive(Serialize, Deserialize, Clone)]
pub struct QNetwork {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
    pub layers: Vec<DenseLayer>,
}

impl QNetwork {
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Self {
        let layers = vec![
            DenseLayer::new(input_dim, hidden_dim, Activation::Relu),
            DenseLayer::new(hidden_dim, hidden_dim, Activation::Relu),
            DenseLayer::new(hidden_dim, output_dim, Activation::Linear),
        ];
        QNetwork {
            input_dim,
            hidden_dim,
            output_dim,
            layers,
        }
    }

    /// Forward pass for a single state vector.
    pub fn forward(&mut self, input: ArrayView1<f32>) -> Array1<f32> {
        let input = input.insert_axis(Axis(0)); // Treat single instance as a minibatch of size 1
        let output = self.forward_batch(input);
        let shape = output.shape()[1];
        output.into_shape((shape,)).unwrap()
    }

    /// Forward pass for a batch of state vectors.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current = inputs.to_owned();
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view());
        }
        current
    }

    /// Backpropagate a batch of output errors, returning per-layer weight and
    /// bias gradients in layer order.
    pub fn backward_batch(&mut self, output_errors: ArrayView2<f32>) -> Vec<(Array2<f32>, Array1<f32>)> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for i in (0..self.layers.len()).rev() {
            let (input_error, weight_gradients, bias_gradients) =
                self.layers[i].backward_batch(current_error.view());
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = input_error;
            }
        }

        gradients.reverse();
        gradients
    }

    /// Enumerate the weighted layers in forward-evaluation order, as
    /// transplant source descriptors. The architecture is fixed, so the
    /// traversal is the declaration order of the three dense layers.
    pub fn weighted_layers(&self) -> Vec<WeightedLayer> {
        self.layers
            .iter()
            .map(|layer| WeightedLayer::Dense {
                weight: layer.weights.clone(),
                bias: layer.biases.clone(),
            })
            .collect()
    }

    /// Serialize the full parameter state to an ordered key -> tensor mapping.
    pub fn state_dict(&self) -> StateDict {
        let mut entries = Vec::with_capacity(self.layers.len() * 2);
        for (i, layer) in self.layers.iter().enumerate() {
            entries.push(StateEntry {
                name: format!("linear{}.weight", i + 1),
                shape: layer.weights.shape().to_vec(),
                data: layer.weights.iter().cloned().collect(),
            });
            entries.push(StateEntry {
                name: format!("linear{}.bias", i + 1),
                shape: layer.biases.shape().to_vec(),
                data: layer.biases.to_vec(),
            });
        }
        StateDict { entries }
    }

    /// Construct a network from a parameter state dict, failing with a shape
    /// mismatch if any tensor disagrees with the requested architecture.
    pub fn from_state_dict(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        state: &StateDict,
    ) -> Result<Self> {
        let mut network = QNetwork::new(input_dim, hidden_dim, output_dim);
        let expected = network.layers.len() * 2;
        if state.entries.len() != expected {
            return Err(SnakeQError::shape_mismatch(
                format!("{} parameter tensors", expected),
                format!("{} parameter tensors", state.entries.len()),
            ));
        }

        for (i, layer) in network.layers.iter_mut().enumerate() {
            let weight = &state.entries[i * 2];
            let bias = &state.entries[i * 2 + 1];
            if weight.shape != layer.weights.shape().to_vec() {
                return Err(SnakeQError::shape_mismatch(
                    format!("{} with shape {:?}", weight.name, layer.weights.shape()),
                    format!("shape {:?}", weight.shape),
                ));
            }
            if bias.shape != layer.biases.shape().to_vec() {
                return Err(SnakeQError::shape_mismatch(
                    format!("{} with shape {:?}", bias.name, layer.biases.shape()),
                    format!("shape {:?}", bias.shape),
                ));
            }
            layer.weights = Array2::from_shape_vec(
                (weight.shape[0], weight.shape[1]),
                weight.data.clone(),
            )
            .map_err(|e| SnakeQError::SerializationError(e.to_string()))?;
            layer.biases = Array1::from_vec(bias.data.clone());
        }

        Ok(network)
    }

    /// Save the parameter state dict to a persistent checkpoint file,
    /// creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = bincode::serialize(&self.state_dict())?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a checkpoint into a freshly constructed network.
    ///
    /// Accepts, in order: a raw parameter-state payload, a wrapped payload
    /// with a `state_dict` field, or a fully serialized model. Layer shapes
    /// that disagree with the requested architecture fail with a shape
    /// mismatch.
    pub fn load(path: &Path, input_dim: usize, hidden_dim: usize, output_dim: usize) -> Result<Self> {
        let bytes = fs::read(path)?;

        if let Ok(state) = bincode::deserialize::<StateDict>(&bytes) {
            if let Ok(network) = Self::from_state_dict(input_dim, hidden_dim, output_dim, &state) {
                return Ok(network);
            }
        }

        if let Ok(checkpoint) = bincode::deserialize::<Checkpoint>(&bytes) {
            return Self::from_state_dict(input_dim, hidden_dim, output_dim, &checkpoint.state_dict);
        }

        if let Ok(network) = bincode::deserialize::<QNetwork>(&bytes) {
            if network.input_dim != input_dim
                || network.hidden_dim != hidden_dim
                || network.output_dim != output_dim
            {
                return Err(SnakeQError::shape_mismatch(
                    format!("architecture ({}, {}, {})", input_dim, hidden_dim, output_dim),
                    format!(
                        "architecture ({}, {}, {})",
                        network.input_dim, network.hidden_dim, network.output_dim
                    ),
                ));
            }
            return Ok(network);
        }

        // The raw state-dict probe may have parsed but failed shape checks;
        // rerun it so the caller sees the shape error rather than a generic one.
        if let Ok(state) = bincode::deserialize::<StateDict>(&bytes) {
            Self::from_state_dict(input_dim, hidden_dim, output_dim, &state)?;
        }

        Err(SnakeQError::SerializationError(format!(
            "checkpoint {} is neither a state dict, a wrapped checkpoint, nor a serialized model",
            path.display()
        )))
    }

    /// Export a traced, inference-only copy of the network with a fixed
    /// input shape. Default filename counterpart: `model.pt`.
    pub fn save_frozen(&self, path: &Path) -> Result<()> {
        FrozenModel::trace(self).save(path)
    }

    /// Export the network as an interchange graph with input `state` and
    /// output `q_values`, both with a symbolic batch dimension.
    pub fn export_onnx(&self, path: &Path, opset_version: u32) -> Result<()> {
        OnnxExporter::export(self, path, opset_version)
    }
}
