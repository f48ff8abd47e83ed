//! Local embedding generation

mod onnx_embedder;

pub use onnx_embedder::{l2_normalize, mean_pool, OnnxEmbedder};
