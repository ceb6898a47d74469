use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// An enumeration of the activation functions used by the Q-network layers.
/// Hidden layers use ReLU; the output layer is linear so Q-values stay unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation function to a batch of pre-activations in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }

    /// Apply the activation function to a single vector in-place.
    pub fn apply(&self, input: &mut Array1<f32>) {
        match self {
            Activation::Relu => {
                input.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }

    /// Compute the derivative of the activation function for a batch of
    /// pre-activation values.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => {
                // Derivative of linear activation is always 1
                Array2::ones(inputs.dim())
            }
        }
    }
}

/// Softmax over raw values: `exp(x_i) / sum_j exp(x_j)`.
///
/// Deliberately applied without a max-subtraction shift so the exploration
/// distribution matches the deployed policy exactly; large Q-values can
/// overflow to infinity, which the caller surfaces as an error.
pub fn softmax(values: ArrayView1<f32>) -> Array1<f32> {
    let exps = values.mapv(f32::exp);
    let sum = exps.sum();
    exps / sum
}

/// Index of the largest element, ties resolved to the first occurrence.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
