//! In-process ONNX models through fastembed. Only built with the `fastembed` feature.

use crate::embeddings::provider::EmbeddingProvider;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use vecgate_core::{AppError, AppResult};

/// Map a model identifier onto a fastembed model.
fn resolve_model(name: &str) -> AppResult<EmbeddingModel> {
    let model = match name.trim().to_lowercase().as_str() {
        "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "bge-small-zh-v1.5" => EmbeddingModel::BGESmallZHV15,
        "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
        "multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
        "multilingual-e5-large" => EmbeddingModel::MultilingualE5Large,
        "paraphrase-multilingual-minilm-l12-v2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
        _ => {
            return Err(AppError::Config(format!(
                "Unsupported local embedding model: '{}'",
                name
            )));
        }
    };
    Ok(model)
}

/// Local provider backed by a fastembed `TextEmbedding`.
///
/// Inference is CPU-bound and runs on the blocking pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load the model (downloading it on first use) and check that its
    /// native dimension equals `expected_dimensions`.
    pub async fn load(model_name: &str, expected_dimensions: usize) -> AppResult<Self> {
        let model_id = resolve_model(model_name)?;
        tracing::info!("Loading local embedding model {}", model_name);

        let name = model_name.to_string();
        let (model, native) = tokio::task::spawn_blocking(move || -> AppResult<_> {
            let mut model = TextEmbedding::try_new(
                InitOptions::new(model_id).with_show_download_progress(false),
            )
            .map_err(|e| AppError::Config(format!("Failed to load model '{}': {}", name, e)))?;

            let probe = model
                .embed(vec!["dimension probe".to_string()], None)
                .map_err(|e| AppError::Config(format!("Failed to probe model '{}': {}", name, e)))?;
            let native = probe.first().map(|v| v.len()).unwrap_or(0);
            Ok((model, native))
        })
        .await
        .map_err(|e| AppError::Other(format!("Model loading task failed: {}", e)))??;

        if native != expected_dimensions {
            return Err(AppError::Config(format!(
                "Model '{}' produces {}-dimensional vectors but VECTOR_DIMENSION is {}",
                model_name, native, expected_dimensions
            )));
        }

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
            dimensions: native,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let inputs = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| AppError::Provider("Embedding model lock poisoned".to_string()))?;
            guard
                .embed(inputs, None)
                .map_err(|e| AppError::Provider(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| AppError::Other(format!("Embedding task failed: {}", e)))?
    }
}
