//! Built-in `trigram-v1` model: hashed character n-gram embeddings.

use crate::embeddings::config::TRIGRAM_MODEL;
use crate::embeddings::provider::EmbeddingProvider;
use std::collections::HashMap;
use vecgate_core::AppResult;

/// Local, offline embedding provider.
///
/// Each text is lowercased and split on whitespace. Every token contributes
/// its character bigrams, its character trigrams and the token itself,
/// hashed into `dimensions` buckets. The result is L2-normalized, so equal
/// texts get cosine similarity 1.0. Texts without whitespace (CJK) still
/// share n-grams when they share substrings.
///
/// Not a semantic model. Good for development, tests and air-gapped setups.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, feature: &str, seed: u64) -> usize {
        // FNV-1a, stable across processes and platforms
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
        for b in feature.as_bytes() {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimensions as u64) as usize
    }

    fn features(text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        let lower = text.to_lowercase();

        for token in lower.split_whitespace() {
            let chars: Vec<char> = token.chars().collect();
            for n in [2, 3] {
                for window in chars.windows(n) {
                    let gram: String = window.iter().collect();
                    *counts.entry(gram).or_insert(0) += 1;
                }
            }
            *counts.entry(format!("#{}", token)).or_insert(0) += 1;
        }

        counts
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for (feature, count) in Self::features(text) {
            // Token features get their own hash seed so a one-char token and
            // a bigram with the same text don't reinforce each other
            let seed = if feature.starts_with('#') { 1 } else { 0 };
            embedding[self.bucket(&feature, seed)] += (count as f32).sqrt();
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        } else if let Some(first) = embedding.first_mut() {
            // Blank input still gets a unit vector
            *first = 1.0;
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        TRIGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_embedding_is_unit_length() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("hello world").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_count() {
        let provider = TrigramProvider::new(128);
        let texts = vec![
            "vector search".to_string(),
            "document store".to_string(),
            "vector search".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings[0], embeddings[2]);
        assert_ne!(embeddings[0], embeddings[1]);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let a = TrigramProvider::new(256).embed("深度学习").await.unwrap();
        let b = TrigramProvider::new(256).embed("深度学习").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_substrings_score_higher() {
        let provider = TrigramProvider::new(1024);
        let query = provider.embed("机器学习").await.unwrap();
        let related = provider.embed("深度学习是机器学习的一个子领域").await.unwrap();
        let unrelated = provider.embed("人工智能是计算机科学的一个分支").await.unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_blank_text_still_unit_vector() {
        let provider = TrigramProvider::new(16);
        let embedding = provider.embed("   ").await.unwrap();
        assert_eq!(embedding[0], 1.0);
    }
}
