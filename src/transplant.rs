use ndarray::{Array1, Array2, Array4, ArrayView1, Axis};

use crate::activations::Activation;
use crate::error::{Result, SnakeQError};
use crate::network::QNetwork;

/// Source-side descriptor of a weighted layer, in the source framework's
/// tensor layouts. Produced by enumerating a trained network's weighted
/// layers in forward-evaluation order.
#[derive(Clone, Debug)]
pub enum WeightedLayer {
    /// Dense affine layer: weight `(out, in)`, bias `(out,)`.
    Dense {
        weight: Array2<f32>,
        bias: Array1<f32>,
    },
    /// 2D convolution: weight `(out_channels, in_channels, kH, kW)`.
    Conv2D {
        weight: Array4<f32>,
        bias: Option<Array1<f32>>,
    },
    /// Batch normalization: scale, shift, running mean, running variance.
    BatchNorm {
        gamma: Array1<f32>,
        beta: Array1<f32>,
        running_mean: Array1<f32>,
        running_var: Array1<f32>,
    },
    /// Embedding table: weighted, but with no destination-framework
    /// conversion. Transplanting one fails with an unsupported-kind error.
    Embedding { weight: Array2<f32> },
}

impl WeightedLayer {
    pub fn kind(&self) -> &'static str {
        match self {
            WeightedLayer::Dense { .. } => "dense",
            WeightedLayer::Conv2D { .. } => "conv2d",
            WeightedLayer::BatchNorm { .. } => "batch_norm",
            WeightedLayer::Embedding { .. } => "embedding",
        }
    }
}

/// Destination-side layer with the target framework's weight layouts.
#[derive(Clone, Debug)]
pub enum KerasLayer {
    /// Marker layer carrying no weights; skipped by the weighted filter.
    InputLayer { dim: usize },
    /// Dense layer: kernel `(in, out)`, bias `(out,)`.
    Dense {
        kernel: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    },
    /// 2D convolution: kernel `(kH, kW, in_channels, out_channels)`.
    Conv2D {
        kernel: Array4<f32>,
        bias: Array1<f32>,
    },
    /// Batch normalization: gamma, beta, moving mean, moving variance.
    BatchNorm {
        gamma: Array1<f32>,
        beta: Array1<f32>,
        moving_mean: Array1<f32>,
        moving_var: Array1<f32>,
    },
}

impl KerasLayer {
    fn has_weights(&self) -> bool {
        !matches!(self, KerasLayer::InputLayer { .. })
    }

    fn kind(&self) -> &'static str {
        match self {
            KerasLayer::InputLayer { .. } => "input",
            KerasLayer::Dense { .. } => "dense",
            KerasLayer::Conv2D { .. } => "conv2d",
            KerasLayer::BatchNorm { .. } => "batch_norm",
        }
    }
}

/// Declaration-ordered destination-framework model.
#[derive(Clone, Debug)]
pub struct KerasModel {
    pub layers: Vec<KerasLayer>,
}

impl KerasModel {
    /// Indices of the layers exposing trainable weights, in declaration order.
    pub fn weighted_indices(&self) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.has_weights())
            .map(|(i, _)| i)
            .collect()
    }

    /// Float inference through the dense/batch-norm path; used to calibrate
    /// activation ranges before quantization.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let mut current = input.to_owned();
        for layer in &self.layers {
            current = match layer {
                KerasLayer::InputLayer { dim } => {
                    if current.len() != *dim {
                        return Err(SnakeQError::shape_mismatch(
                            format!("input of length {}", dim),
                            format!("input of length {}", current.len()),
                        ));
                    }
                    current
                }
                KerasLayer::Dense {
                    kernel,
                    bias,
                    activation,
                } => {
                    let mut output = current
                        .insert_axis(Axis(0))
                        .dot(kernel)
                        .index_axis_move(Axis(0), 0)
                        + bias;
                    activation.apply(&mut output);
                    output
                }
                KerasLayer::BatchNorm {
                    gamma,
                    beta,
                    moving_mean,
                    moving_var,
                } => {
                    let normalized = (&current - moving_mean) / moving_var.mapv(|v| (v + 1e-5).sqrt());
                    normalized * gamma + beta
                }
                KerasLayer::Conv2D { .. } => {
                    return Err(SnakeQError::UnsupportedLayerKind(
                        "conv2d inference on vector input".to_string(),
                    ));
                }
            };
        }
        Ok(current)
    }
}

/// Build the destination-framework clone of the fixed Q-network
/// architecture: two hidden dense+ReLU layers and a linear output layer.
pub fn keras_sin_net(input_dim: usize, hidden_dim: usize, output_dim: usize) -> KerasModel {
    KerasModel {
        layers: vec![
            KerasLayer::InputLayer { dim: input_dim },
            KerasLayer::Dense {
                kernel: Array2::zeros((input_dim, hidden_dim)),
                bias: Array1::zeros(hidden_dim),
                activation: Activation::Relu,
            },
            KerasLayer::Dense {
                kernel: Array2::zeros((hidden_dim, hidden_dim)),
                bias: Array1::zeros(hidden_dim),
                activation: Activation::Relu,
            },
            KerasLayer::Dense {
                kernel: Array2::zeros((hidden_dim, output_dim)),
                bias: Array1::zeros(output_dim),
                activation: Activation::Linear,
            },
        ],
    }
}

/// Converted tensors for one destination slot, staged before assignment.
enum ConvertedWeights {
    Dense { kernel: Array2<f32>, bias: Array1<f32> },
    Conv2D { kernel: Array4<f32>, bias: Array1<f32> },
    BatchNorm {
        gamma: Array1<f32>,
        beta: Array1<f32>,
        moving_mean: Array1<f32>,
        moving_var: Array1<f32>,
    },
}

fn convert_pair(source: &WeightedLayer, destination: &KerasLayer) -> Result<ConvertedWeights> {
    match (source, destination) {
        (WeightedLayer::Dense { weight, bias }, KerasLayer::Dense { kernel, .. }) => {
            // (out, in) -> (in, out)
            let converted = weight.t().to_owned();
            if converted.dim() != kernel.dim() {
                return Err(SnakeQError::shape_mismatch(
                    format!("dense kernel of shape {:?}", kernel.dim()),
                    format!("transposed source weight of shape {:?}", converted.dim()),
                ));
            }
            Ok(ConvertedWeights::Dense {
                kernel: converted,
                bias: bias.clone(),
            })
        }
        (WeightedLayer::Conv2D { weight, bias }, KerasLayer::Conv2D { kernel, bias: dest_bias }) => {
            // (out_c, in_c, kH, kW) -> (kH, kW, in_c, out_c)
            let converted = weight.view().permuted_axes([2, 3, 1, 0]).to_owned();
            if converted.dim() != kernel.dim() {
                return Err(SnakeQError::shape_mismatch(
                    format!("conv kernel of shape {:?}", kernel.dim()),
                    format!("permuted source weight of shape {:?}", converted.dim()),
                ));
            }
            let bias = match bias {
                Some(b) => b.clone(),
                None => Array1::zeros(dest_bias.len()),
            };
            Ok(ConvertedWeights::Conv2D {
                kernel: converted,
                bias,
            })
        }
        (
            WeightedLayer::BatchNorm {
                gamma,
                beta,
                running_mean,
                running_var,
            },
            KerasLayer::BatchNorm { .. },
        ) => Ok(ConvertedWeights::BatchNorm {
            gamma: gamma.clone(),
            beta: beta.clone(),
            moving_mean: running_mean.clone(),
            moving_var: running_var.clone(),
        }),
        (WeightedLayer::Embedding { .. }, _) => Err(SnakeQError::UnsupportedLayerKind(
            source.kind().to_string(),
        )),
        (source, destination) => Err(SnakeQError::shape_mismatch(
            format!("{} destination layer", destination.kind()),
            format!("{} source layer", source.kind()),
        )),
    }
}

/// Copy a trained source network's weighted layers pairwise into an
/// architecturally equivalent destination model, converting each tensor to
/// the destination framework's layout.
///
/// One-shot and all-or-nothing: the enumerations must pair up exactly and
/// every pair must convert before any destination weight is assigned.
pub fn transplant(source_layers: &[WeightedLayer], destination: &mut KerasModel) -> Result<()> {
    let target_indices = destination.weighted_indices();
    if source_layers.len() != target_indices.len() {
        return Err(SnakeQError::LayerCountMismatch {
            source: source_layers.len(),
            target: target_indices.len(),
        });
    }

    // Stage every conversion before touching the destination.
    let mut staged = Vec::with_capacity(source_layers.len());
    for (source, &target_idx) in source_layers.iter().zip(&target_indices) {
        staged.push(convert_pair(source, &destination.layers[target_idx])?);
    }

    for (converted, target_idx) in staged.into_iter().zip(target_indices) {
        match (converted, &mut destination.layers[target_idx]) {
            (ConvertedWeights::Dense { kernel, bias }, KerasLayer::Dense { kernel: k, bias: b, .. }) => {
                *k = kernel;
                *b = bias;
            }
            (ConvertedWeights::Conv2D { kernel, bias }, KerasLayer::Conv2D { kernel: k, bias: b }) => {
                *k = kernel;
                *b = bias;
            }
            (
                ConvertedWeights::BatchNorm {
                    gamma,
                    beta,
                    moving_mean,
                    moving_var,
                },
                KerasLayer::BatchNorm {
                    gamma: g,
                    beta: bt,
                    moving_mean: mm,
                    moving_var: mv,
                },
            ) => {
                *g = gamma;
                *bt = beta;
                *mm = moving_mean;
                *mv = moving_var;
            }
            _ => unreachable!("staged conversions match their destination slots"),
        }
    }

    Ok(())
}

/// Transplant a trained Q-network into its destination-framework clone.
pub fn transplant_network(network: &QNetwork, destination: &mut KerasModel) -> Result<()> {
    transplant(&network.weighted_layers(), destination)
}
