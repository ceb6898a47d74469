use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::activations::Activation;
use crate::error::{Result, SnakeQError};
use crate::network::QNetwork;
use crate::transplant::{keras_sin_net, transplant_network, KerasLayer, KerasModel};

// Degenerate calibration ranges (all-zero activations) still need a usable scale.
const MIN_RANGE: f32 = 1e-6;

/// Affine int8 quantization parameters for one tensor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TensorQuant {
    pub scale: f32,
    pub zero_point: i32,
}

impl TensorQuant {
    /// Parameters covering `[min, max]`, widened to include zero so the
    /// zero point is exactly representable.
    fn from_range(min: f32, max: f32) -> Self {
        let lo = min.min(0.0);
        let hi = max.max(0.0);
        let scale = ((hi - lo).max(MIN_RANGE)) / 255.0;
        let zero_point = (-128.0 - lo / scale).round().clamp(-128.0, 127.0) as i32;
        TensorQuant { scale, zero_point }
    }

    pub fn quantize(&self, value: f32) -> i8 {
        ((value / self.scale).round() as i32 + self.zero_point).clamp(-128, 127) as i8
    }

    pub fn dequantize(&self, quantized: i8) -> f32 {
        (quantized as i32 - self.zero_point) as f32 * self.scale
    }
}

/// Observes the value range of one activation tensor across the
/// calibration stream.
struct RangeObserver {
    min: f32,
    max: f32,
}

impl RangeObserver {
    fn new() -> Self {
        RangeObserver {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    fn observe(&mut self, values: ArrayView1<f32>) {
        for &v in values.iter() {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    fn quant_params(&self) -> TensorQuant {
        TensorQuant::from_range(self.min, self.max)
    }
}

/// One fully quantized dense layer: int8 kernel `(in, out)` with a symmetric
/// per-tensor scale, int32 bias at `input_scale * weight_scale`, and the
/// calibrated output quantization.
#[derive(Serialize, Deserialize, Clone)]
pub struct QuantDense {
    pub kernel: Array2<i8>,
    pub bias: Array1<i32>,
    pub weight_scale: f32,
    pub output: TensorQuant,
    pub activation: Activation,
}

/// The fully integer-quantized inference artifact. Input and output tensors
/// are int8; accumulation is int32 with a requantization after each layer.
#[derive(Serialize, Deserialize, Clone)]
pub struct QuantizedModel {
    pub input_dim: usize,
    pub output_dim: usize,
    pub input: TensorQuant,
    pub output: TensorQuant,
    pub layers: Vec<QuantDense>,
}

impl QuantizedModel {
    pub fn quantize_input(&self, input: ArrayView1<f32>) -> Array1<i8> {
        input.mapv(|v| self.input.quantize(v))
    }

    pub fn dequantize_output(&self, output: ArrayView1<i8>) -> Array1<f32> {
        output.mapv(|q| self.output.dequantize(q))
    }

    /// Run int8 inference: per layer, accumulate in int32, add the int32
    /// bias, rescale to the calibrated output quantization, and apply ReLU
    /// in the quantized domain.
    pub fn invoke(&self, input: ArrayView1<i8>) -> Result<Array1<i8>> {
        if input.len() != self.input_dim {
            return Err(SnakeQError::shape_mismatch(
                format!("input of length {}", self.input_dim),
                format!("input of length {}", input.len()),
            ));
        }

        let mut current = input.to_owned();
        let mut current_quant = self.input.clone();

        for layer in &self.layers {
            let (in_dim, out_dim) = layer.kernel.dim();
            debug_assert_eq!(current.len(), in_dim);

            let rescale = current_quant.scale * layer.weight_scale / layer.output.scale;
            let mut output = Array1::zeros(out_dim);
            for o in 0..out_dim {
                let mut acc: i32 = layer.bias[o];
                for i in 0..in_dim {
                    acc += (current[i] as i32 - current_quant.zero_point)
                        * layer.kernel[[i, o]] as i32;
                }
                let mut q = (acc as f32 * rescale).round() as i32 + layer.output.zero_point;
                if layer.activation == Activation::Relu {
                    // ReLU in the quantized domain: clamp at the zero point
                    q = q.max(layer.output.zero_point);
                }
                output[o] = q.clamp(-128, 127) as i8;
            }

            current = output;
            current_quant = layer.output.clone();
        }

        Ok(current)
    }

    /// Float convenience wrapper: quantize the input, invoke, dequantize.
    pub fn predict(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let quantized_input = self.quantize_input(input);
        let quantized_output = self.invoke(quantized_input.view())?;
        Ok(self.dequantize_output(quantized_output.view()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// Post-training full-integer quantization of a destination-framework model.
///
/// The representative dataset calibrates every activation range and is
/// consumed exactly once; an empty stream is an error. Weights are
/// quantized symmetrically per tensor, biases to int32 at the product of
/// input and weight scales.
pub fn convert_full_int8<I>(model: &KerasModel, representative_data: I) -> Result<QuantizedModel>
where
    I: IntoIterator<Item = Array1<f32>>,
{
    // The converter handles the fixed dense architecture only.
    let mut input_dim = None;
    let mut dense_layers = Vec::new();
    for layer in &model.layers {
        match layer {
            KerasLayer::InputLayer { dim } => input_dim = Some(*dim),
            KerasLayer::Dense {
                kernel,
                bias,
                activation,
            } => dense_layers.push((kernel, bias, *activation)),
            other => {
                return Err(SnakeQError::UnsupportedLayerKind(format!(
                    "{} in quantization converter",
                    match other {
                        KerasLayer::Conv2D { .. } => "conv2d",
                        KerasLayer::BatchNorm { .. } => "batch_norm",
                        _ => "unknown",
                    }
                )))
            }
        }
    }
    if dense_layers.is_empty() {
        return Err(SnakeQError::EmptyBuffer(
            "model has no dense layers to quantize".to_string(),
        ));
    }
    let input_dim = input_dim.unwrap_or_else(|| dense_layers[0].0.dim().0);
    let output_dim = dense_layers.last().unwrap().0.dim().1;

    // Calibration pass: observe the input and every post-activation output.
    let mut input_observer = RangeObserver::new();
    let mut output_observers: Vec<RangeObserver> =
        (0..dense_layers.len()).map(|_| RangeObserver::new()).collect();
    let mut samples = 0usize;

    for sample in representative_data {
        // Single-example batch of shape (1, input_dim).
        if sample.len() != input_dim {
            return Err(SnakeQError::shape_mismatch(
                format!("calibration vector of length {}", input_dim),
                format!("calibration vector of length {}", sample.len()),
            ));
        }
        samples += 1;
        input_observer.observe(sample.view());

        let mut current = sample;
        for ((kernel, bias, activation), observer) in
            dense_layers.iter().zip(output_observers.iter_mut())
        {
            let mut output = current.dot(*kernel) + *bias;
            activation.apply(&mut output);
            observer.observe(output.view());
            current = output;
        }
    }

    if samples == 0 {
        return Err(SnakeQError::EmptyBuffer(
            "representative dataset yielded no calibration samples".to_string(),
        ));
    }

    let input_quant = input_observer.quant_params();

    // Quantize weights and biases, chaining each layer's input quantization
    // to the previous layer's calibrated output.
    let mut layers = Vec::with_capacity(dense_layers.len());
    let mut incoming = input_quant.clone();
    for ((kernel, bias, activation), observer) in dense_layers.iter().zip(&output_observers) {
        let max_abs = kernel.iter().fold(0.0f32, |acc, &w| acc.max(w.abs()));
        let weight_scale = (max_abs / 127.0).max(MIN_RANGE);
        let quantized_kernel = kernel.mapv(|w| {
            ((w / weight_scale).round() as i32).clamp(-127, 127) as i8
        });

        let bias_scale = incoming.scale * weight_scale;
        let quantized_bias = bias.mapv(|b| (b / bias_scale).round() as i32);

        let output = observer.quant_params();
        incoming = output.clone();
        layers.push(QuantDense {
            kernel: quantized_kernel,
            bias: quantized_bias,
            weight_scale,
            output,
            activation: *activation,
        });
    }

    Ok(QuantizedModel {
        input_dim,
        output_dim,
        input: input_quant,
        output: layers.last().unwrap().output.clone(),
        layers,
    })
}

/// Convert a saved checkpoint into a fully integer-quantized artifact.
///
/// Loads the checkpoint, builds the destination-framework clone, transplants
/// the weights, calibrates with the representative dataset, writes the
/// binary artifact to `output_path` (creating parent directories), and
/// additionally emits a `.h` sibling holding the artifact as an unsigned
/// byte-array literal. Header emission failure is logged and swallowed;
/// every earlier failure aborts the export.
pub fn export_quantized_from_checkpoint<I>(
    checkpoint_path: &Path,
    output_path: &Path,
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    representative_data: I,
) -> Result<()>
where
    I: IntoIterator<Item = Array1<f32>>,
{
    let network = QNetwork::load(checkpoint_path, input_dim, hidden_dim, output_dim)?;

    let mut keras_model = keras_sin_net(input_dim, hidden_dim, output_dim);
    transplant_network(&network, &mut keras_model)?;

    let quantized = convert_full_int8(&keras_model, representative_data)?;
    let bytes = quantized.to_bytes()?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, &bytes)?;

    match write_c_header(output_path, &bytes) {
        Ok(header_path) => println!(
            "exported: {} and {}",
            output_path.display(),
            header_path.display()
        ),
        Err(e) => println!("failed to write header file (ignored): {}", e),
    }

    Ok(())
}

/// Render the binary artifact as a C byte-array source file next to it.
fn write_c_header(binary_path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let header_path = binary_path.with_extension("h");
    let name = binary_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .replace(|c: char| !c.is_ascii_alphanumeric() && c != '_', "_");

    let array = bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let contents = format!(
        "const unsigned char {}[] = {{{}}};\nconst int {}_len = {};\n",
        name,
        array,
        name,
        bytes.len()
    );
    fs::write(&header_path, contents)?;
    Ok(header_path)
}
