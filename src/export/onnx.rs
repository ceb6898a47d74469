use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::json;

use crate::activations::Activation;
use crate::error::{Result, SnakeQError};
use crate::network::QNetwork;

/// Default schema version for the plain exporter.
pub const DEFAULT_OPSET: u32 = 13;

/// Default schema version for the preferred exporter.
pub const PREFERRED_DEFAULT_OPSET: u32 = 17;

// The preferred exporter only emits the newer schema revisions.
const PREFERRED_MIN_OPSET: u32 = 14;

/// Interchange-graph export for Q-networks.
///
/// Emits an ONNX-style JSON graph: input tensor named `state`, output tensor
/// named `q_values`, both with a symbolic batch dimension, at a selectable
/// opset version.
pub struct OnnxExporter;

impl OnnxExporter {
    /// Capability probe for the preferred exporter.
    pub fn supports_opset(opset_version: u32) -> bool {
        opset_version >= PREFERRED_MIN_OPSET
    }

    /// Export with the plain exporter.
    pub fn export(network: &QNetwork, path: &Path, opset_version: u32) -> Result<()> {
        Self::write_graph(network, path, opset_version, "legacy")
    }

    /// Export with the preferred exporter. Fails the capability probe for
    /// opset versions below its minimum, so callers can fall back to the
    /// plain exporter.
    pub fn export_preferred(network: &QNetwork, path: &Path, opset_version: u32) -> Result<()> {
        if !Self::supports_opset(opset_version) {
            return Err(SnakeQError::invalid_parameter(
                "opset_version",
                format!(
                    "preferred exporter supports opset >= {}, got {}",
                    PREFERRED_MIN_OPSET, opset_version
                ),
            ));
        }
        Self::write_graph(network, path, opset_version, "graph")
    }

    fn write_graph(network: &QNetwork, path: &Path, opset_version: u32, exporter: &str) -> Result<()> {
        let mut nodes = Vec::new();
        let mut initializers = Vec::new();
        let mut previous = "state".to_string();

        for (i, layer) in network.layers.iter().enumerate() {
            let weight_name = format!("linear{}.weight", i + 1);
            let bias_name = format!("linear{}.bias", i + 1);
            let weights: Vec<Vec<f32>> = layer
                .weights
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect();

            initializers.push(json!({
                "name": weight_name,
                "shape": layer.weights.shape().to_vec(),
                "data": weights,
            }));
            initializers.push(json!({
                "name": bias_name,
                "shape": layer.biases.shape().to_vec(),
                "data": layer.biases.to_vec(),
            }));

            let is_last = i == network.layers.len() - 1;
            let affine_output = if is_last && layer.activation == Activation::Linear {
                "q_values".to_string()
            } else {
                format!("gemm{}_out", i + 1)
            };
            nodes.push(json!({
                "op_type": "Gemm",
                "name": format!("gemm{}", i + 1),
                "inputs": [previous, weight_name, bias_name],
                "outputs": [affine_output],
                "attributes": { "transB": 1 },
            }));
            previous = affine_output;

            if layer.activation == Activation::Relu {
                let relu_output = if is_last {
                    "q_values".to_string()
                } else {
                    format!("relu{}_out", i + 1)
                };
                nodes.push(json!({
                    "op_type": "Relu",
                    "name": format!("relu{}", i + 1),
                    "inputs": [previous],
                    "outputs": [relu_output],
                }));
                previous = relu_output;
            }
        }

        let graph = json!({
            "format": "onnx",
            "producer": format!("snakeq-{}", exporter),
            "opset_version": opset_version,
            "graph": {
                "inputs": [{
                    "name": "state",
                    "elem_type": "float32",
                    "shape": ["batch", network.input_dim],
                }],
                "outputs": [{
                    "name": "q_values",
                    "elem_type": "float32",
                    "shape": ["batch", network.output_dim],
                }],
                "nodes": nodes,
                "initializers": initializers,
            },
        });

        let json_str = serde_json::to_string_pretty(&graph)
            .map_err(|e| SnakeQError::SerializationError(e.to_string()))?;
        let mut file = File::create(path)?;
        file.write_all(json_str.as_bytes())?;

        Ok(())
    }
}
