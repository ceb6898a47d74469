//! # snakeq - Snake DQN training and quantized deployment
//!
//! snakeq trains a small deep Q-network against a Snake-style environment,
//! then converts the trained network across model representations for
//! deployment on constrained hardware: a native checkpoint, a traced
//! inference-only graph, an interchange (ONNX-style) graph, and a fully
//! integer-quantized artifact with a companion C byte-array header.
//!
//! ## Key Features
//!
//! - **Fixed Q-network**: two hidden affine+ReLU layers and a linear output,
//!   with checkpoint save/load and shape validation
//! - **DQN trainer**: online/target network pair, temporal-difference
//!   updates, Adam optimization, hard target syncs
//! - **Agent**: bounded experience replay with linearly annealed
//!   exploration, sampling exploratory actions from the softmax over Q-values
//! - **Weight transplant**: layer-by-layer tensor conversion into an
//!   architecturally equivalent destination-framework model
//! - **Quantization pipeline**: post-training full-int8 conversion driven by
//!   a calibration stream, emitting a binary artifact plus a `.h` source file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snakeq::agent::Agent;
//! use snakeq::config::AgentConfig;
//! use ndarray::Array1;
//!
//! // Snake exposes 11 state features and 3 actions
//! let mut agent = Agent::new(11, 3, &AgentConfig::default()).unwrap();
//!
//! let state = Array1::<f32>::zeros(11);
//! let action = agent.get_action(state.view(), agent.n_game, true).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions and softmax/argmax helpers
//! - [`agent`] - The replay-driven DQN agent
//! - [`config`] - Explicit configuration passed to every operation
//! - [`env`] - The environment contract the game implements
//! - [`error`] - Error types and result handling
//! - [`export`] - Frozen-graph and interchange-graph exporters
//! - [`modes`] - Top-level train / play / export routines
//! - [`network`] - The fixed feed-forward Q-network
//! - [`optimizer`] - Adam optimization with per-layer state
//! - [`quantize`] - Post-training int8 quantization pipeline
//! - [`replay_buffer`] - Bounded FIFO experience replay
//! - [`trainer`] - The temporal-difference update rule
//! - [`transplant`] - Cross-framework weight transplant

pub mod activations;
pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod export;
pub mod modes;
pub mod network;
pub mod optimizer;
pub mod quantize;
pub mod replay_buffer;
pub mod trainer;
pub mod transplant;

#[cfg(test)]
mod tests;
