//! ONNX-based embedding generation
//!
//! Uses all-MiniLM-L6-v2 model for fast, high-quality 384-dimensional embeddings.
//! The model and tokenizer are downloaded into the cache directory on first use
//! and loaded once; every request shares the same session.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

/// Loaded model state; inference needs exclusive access to the session
struct OnnxModel {
    /// ONNX Runtime session
    session: Session,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Maximum sequence length
    max_length: usize,
    /// Batch size
    batch_size: usize,
}

/// ONNX-based text embedder
#[derive(Clone)]
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    /// Embedding dimensions
    dimensions: usize,
    /// Reported as the provider name
    model_name: String,
}

impl OnnxEmbedder {
    /// Download (if needed) and load the model
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let model_dir = config.cache_dir.join(&config.model);
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            Error::Config(format!("Failed to create cache directory: {}", e))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let max_length = config.max_length;
        let batch_size = config.batch_size.max(1);

        // Session construction is CPU-heavy
        let model = tokio::task::spawn_blocking(move || -> Result<OnnxModel> {
            let session = Session::builder()
                .map_err(|e| Error::embedding(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| Error::embedding(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(4)
                .map_err(|e| Error::embedding(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::embedding(format!("Failed to load model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::embedding(format!("Failed to load tokenizer: {}", e)))?;

            Ok(OnnxModel {
                session,
                tokenizer,
                max_length,
                batch_size,
            })
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        let embedder = Self {
            model: Arc::new(Mutex::new(model)),
            dimensions: config.dimensions,
            model_name: config.model.clone(),
        };

        // Catch a model/config dimension mismatch at startup
        let probe = embedder.embed_batch(&["dimension probe".to_string()]).await?;
        let actual = probe.first().map(Vec::len).unwrap_or(0);
        if actual != config.dimensions {
            return Err(Error::Config(format!(
                "Model {} produces {}-dimensional vectors, configured for {}",
                config.model, actual, config.dimensions
            )));
        }

        tracing::info!("ONNX embedder initialized successfully");
        Ok(embedder)
    }

    /// Embed synchronously; call from a blocking thread
    fn embed_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self.model.lock();
        let batch_size = model.batch_size;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            all_embeddings.extend(model.embed_batch_internal(batch)?);
        }

        Ok(all_embeddings)
    }
}

impl OnnxModel {
    fn embed_batch_internal(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| Error::embedding(format!("Attention mask tensor creation failed: {}", e)))?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("Token type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        // last_hidden_state: [batch, seq, hidden]
        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("No output tensor"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to extract tensor: {}", e)))?;

        let hidden_size = tensor_shape
            .iter()
            .nth(2)
            .map(|&d| d as usize)
            .ok_or_else(|| Error::embedding("Unexpected output tensor rank"))?;

        let mut embeddings = mean_pool(tensor_data, &attention_mask, batch_size, max_len, hidden_size);
        for embedding in &mut embeddings {
            l2_normalize(embedding);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || embedder.embed_blocking(texts))
            .await
            .map_err(|e| Error::embedding(format!("Embedding task failed: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        // Model is loaded at construction
        Ok(true)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Average token vectors, weighting by the attention mask
///
/// `hidden` is a row-major `[batch, seq_len, hidden_size]` tensor.
pub fn mean_pool(
    hidden: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let mask_val = attention_mask[i * seq_len + j] as f32;
            if mask_val > 0.0 {
                let base = (i * seq_len + j) * hidden_size;
                for (k, value) in sum.iter_mut().enumerate() {
                    if let Some(h) = hidden.get(base + k) {
                        *value += h * mask_val;
                    }
                }
                count += mask_val;
            }
        }

        if count > 0.0 {
            for val in &mut sum {
                *val /= count;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}

/// Scale a vector to unit L2 norm; zero vectors are left unchanged
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

/// Download a file from the model's HuggingFace repository
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    );

    tracing::info!("Downloading {} from: {}", file, url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::embedding(format!("Failed to read {} bytes: {}", file, e)))?;

    // Write beside the target and rename so a partial download is never loaded
    let tmp_path: PathBuf = path.with_extension("part");
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}
