//! Trigram embedding provider using character trigrams and word hashes.

use crate::embeddings::provider::EmbeddingProvider;
use crimestat_core::AppResult;
use std::collections::{BTreeMap, HashSet};

/// English and Spanish function words ignored when embedding.
const STOP_WORDS: &[&str] = &[
    "the", "which", "are", "was", "were", "for", "and", "but", "with", "from", "this", "that",
    "have", "has", "had", "its", "their", "they", "them", "how", "many", "what", "del", "los",
    "las", "que", "por", "para", "con", "una", "uno", "como", "cual", "hay", "son", "muy", "mas",
    "of", "in", "to", "is", "de", "la", "el", "en", "y", "o",
];

/// Hashed bag of character trigrams and whole words.
///
/// Words shorter than three characters (single-letter names, counts) have no
/// trigrams and only land in their word bucket.
///
/// Runs offline and is fully deterministic. Vectors carry no semantics, but
/// a query naming a municipality or crime type shares trigrams with the
/// chunks that mention it, which is what ranking by distance needs.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

/// Polynomial string hash.
fn poly_hash(bytes: impl IntoIterator<Item = u8>, base: u64) -> u64 {
    bytes
        .into_iter()
        .fold(0u64, |acc, b| acc.wrapping_mul(base).wrapping_add(u64::from(b)))
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }

    /// Count of each content word, ordered so float accumulation is stable.
    fn word_counts<'a>(&self, lower: &'a str) -> BTreeMap<&'a str, u32> {
        let mut counts = BTreeMap::new();
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if !word.is_empty() && !self.stop_words.contains(word) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
        counts
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lower = text.to_lowercase();
        for (word, count) in self.word_counts(&lower) {
            let count = count as f32;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(poly_hash(trigram.bytes(), 37))] += count.sqrt();
            }

            vector[self.bucket(poly_hash(word.bytes(), 31))] += count;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::squared_l2;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_dimensions() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_single() {
        let provider = TrigramProvider::new(384);
        let embedding = provider
            .embed("Municipality: Bucaramanga. Total records: 50.")
            .await
            .unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "Predictions for Giron. Top crimes: hurto: 3, lesiones: 1.";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = TrigramProvider::new(384).embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_trigram_provider_different_texts() {
        let provider = TrigramProvider::new(384);

        let embedding1 = provider.embed("Municipality: Giron").await.unwrap();
        let embedding2 = provider.embed("Municipality: Floridablanca").await.unwrap();

        assert_ne!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_trigram_provider_punctuation_ignored() {
        let provider = TrigramProvider::new(384);

        let a = provider.embed("theft: 30").await.unwrap();
        let b = provider.embed("theft 30").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_short_tokens_contribute() {
        let provider = TrigramProvider::new(384);

        let a = provider.embed("A").await.unwrap();
        assert!((norm(&a) - 1.0).abs() < 0.001);

        let chunk_a = provider
            .embed("Municipality: A. Total records: 50.")
            .await
            .unwrap();
        let chunk_b = provider
            .embed("Municipality: B. Total records: 5.")
            .await
            .unwrap();
        assert!(squared_l2(&a, &chunk_a) < squared_l2(&a, &chunk_b));

        // Function words alone still embed to nothing
        let stop = provider.embed("de la en").await.unwrap();
        assert!(stop.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_query_closer_to_matching_municipality() {
        let provider = TrigramProvider::new(384);
        let giron = provider
            .embed("Municipality: Giron. Total records: 12.")
            .await
            .unwrap();
        let piedecuesta = provider
            .embed("Municipality: Piedecuesta. Total records: 40.")
            .await
            .unwrap();
        let query = provider.embed("¿Cuántos delitos hay en Giron?").await.unwrap();

        assert!(squared_l2(&query, &giron) < squared_l2(&query, &piedecuesta));
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_trigram_provider_utf8_safety() {
        let provider = TrigramProvider::new(384);

        let text = "Predicción de riesgo en Málaga ñandú 🚓 según histórico";
        let embedding = provider.embed(text).await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
