//! Model export formats: traced/frozen inference graphs and the
//! interchange (ONNX-style) graph writer.

pub mod frozen;
pub mod onnx;

pub use frozen::FrozenModel;
pub use onnx::OnnxExporter;
