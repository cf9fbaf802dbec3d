//! Relevance ranking over the knowledge corpus.

use std::sync::Arc;

use deskbot_models::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::vector::nearest;
use crate::knowledge::KnowledgeEntry;
use crate::types::KnowledgeId;

/// Minimum similarity for an entry to be used as generation context.
pub const GENERATION_THRESHOLD: f32 = 0.4;

/// Minimum similarity for general "similar entries" queries.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// An entry that cleared the threshold, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub id: KnowledgeId,
    pub similarity: f32,
    pub subject: String,
    pub information: String,
}

/// Outcome of a degrading retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// At least one entry cleared the threshold.
    Ranked(Vec<RankedEntry>),
    /// Nothing ranked, or ranking was impossible; present the whole corpus.
    FullCorpus,
}

/// Ranks knowledge entries against a query with the embedding capability.
#[derive(Clone)]
pub struct KnowledgeIndex {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl KnowledgeIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    /// Rank `corpus` by similarity to `query`.
    ///
    /// Only entries with an embedding take part. Entries below `threshold`
    /// are dropped; the rest are sorted by descending similarity, ties in
    /// corpus order. The embedding call is skipped entirely when no entry
    /// has an embedding.
    ///
    /// # Errors
    ///
    /// Propagates the provider error if the query cannot be embedded.
    #[instrument(skip(self, query, corpus), fields(corpus = corpus.len()), level = "debug")]
    pub async fn rank(
        &self,
        query: &str,
        corpus: &[KnowledgeEntry],
        threshold: f32,
    ) -> deskbot_models::Result<Vec<RankedEntry>> {
        if !corpus.iter().any(KnowledgeEntry::has_embedding) {
            debug!("no corpus entry has an embedding");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let candidates = corpus.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .embedding
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (index, v))
        });

        let ranked: Vec<RankedEntry> = nearest(&query_vector, candidates, threshold)
            .into_iter()
            .map(|(index, similarity)| {
                let entry = &corpus[index];
                RankedEntry {
                    id: entry.id,
                    similarity,
                    subject: entry.subject.clone(),
                    information: entry.information.clone(),
                }
            })
            .collect();
        debug!(ranked = ranked.len(), threshold, "ranked knowledge");
        Ok(ranked)
    }

    /// Rank, absorbing every failure into [`Retrieval::FullCorpus`].
    pub async fn retrieve(
        &self,
        query: &str,
        corpus: &[KnowledgeEntry],
        threshold: f32,
    ) -> Retrieval {
        match self.rank(query, corpus, threshold).await {
            Ok(ranked) if !ranked.is_empty() => Retrieval::Ranked(ranked),
            Ok(_) => Retrieval::FullCorpus,
            Err(e) => {
                warn!(provider = self.embedder.name(), error = %e, "embedding failed, using full corpus");
                Retrieval::FullCorpus
            }
        }
    }

    /// Entries similar to `query` at the general similarity threshold.
    pub async fn similar(
        &self,
        query: &str,
        corpus: &[KnowledgeEntry],
    ) -> deskbot_models::Result<Vec<RankedEntry>> {
        self.rank(query, corpus, SIMILARITY_THRESHOLD).await
    }
}

/// Entries whose subject and `message` contain one another, ignoring case.
///
/// Blank subjects and blank messages never match.
pub fn lexical_matches<'a>(message: &str, corpus: &'a [KnowledgeEntry]) -> Vec<&'a KnowledgeEntry> {
    let message = message.trim().to_lowercase();
    if message.is_empty() {
        return Vec::new();
    }

    corpus
        .iter()
        .filter(|entry| {
            let subject = entry.subject.trim().to_lowercase();
            !subject.is_empty() && (message.contains(&subject) || subject.contains(&message))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use chrono::Utc;

    fn entry(subject: &str, information: &str, embedding: Option<Vec<f32>>) -> KnowledgeEntry {
        KnowledgeEntry {
            id: KnowledgeId::new(),
            subject: subject.to_string(),
            information: information.to_string(),
            embedding,
            created_at: Utc::now(),
        }
    }

    /// A unit vector whose cosine against `[1, 0]` is `similarity`.
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    #[tokio::test]
    async fn rank_returns_entry_above_threshold() {
        let corpus = vec![entry("Refund Policy", "30 days", Some(at_similarity(0.7)))];
        let embedder = MockEmbedder::new().with_vector("what's your refund window", vec![1.0, 0.0]);
        let index = KnowledgeIndex::new(Arc::new(embedder));

        let ranked = index
            .rank("what's your refund window", &corpus, GENERATION_THRESHOLD)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, corpus[0].id);
        assert!((ranked[0].similarity - 0.7).abs() < 1e-4);
    }

    #[tokio::test]
    async fn rank_drops_entries_below_threshold_and_unembedded_entries() {
        let corpus = vec![
            entry("low", "x", Some(at_similarity(0.3))),
            entry("none", "x", None),
            entry("mid", "x", Some(at_similarity(0.6))),
            entry("high", "x", Some(at_similarity(0.9))),
        ];
        let index = KnowledgeIndex::new(Arc::new(MockEmbedder::new().with_default(vec![1.0, 0.0])));

        let ranked = index.rank("q", &corpus, GENERATION_THRESHOLD).await.unwrap();

        let subjects: Vec<_> = ranked.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["high", "mid"]);
        assert!(ranked.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn rank_skips_embedding_when_nothing_is_embedded() {
        let corpus = vec![entry("a", "b", None)];
        let embedder = Arc::new(MockEmbedder::failing());
        let index = KnowledgeIndex::new(embedder.clone());

        let ranked = index.rank("q", &corpus, GENERATION_THRESHOLD).await.unwrap();

        assert!(ranked.is_empty());
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn rank_propagates_embedding_failure() {
        let corpus = vec![entry("a", "b", Some(vec![1.0]))];
        let index = KnowledgeIndex::new(Arc::new(MockEmbedder::failing()));

        assert!(index.rank("q", &corpus, GENERATION_THRESHOLD).await.is_err());
    }

    #[tokio::test]
    async fn retrieve_degrades_to_full_corpus() {
        let corpus = vec![entry("a", "b", Some(at_similarity(0.1)))];

        let failing = KnowledgeIndex::new(Arc::new(MockEmbedder::failing()));
        assert_eq!(
            failing.retrieve("q", &corpus, GENERATION_THRESHOLD).await,
            Retrieval::FullCorpus
        );

        let unrelated = KnowledgeIndex::new(Arc::new(MockEmbedder::new().with_default(vec![1.0, 0.0])));
        assert_eq!(
            unrelated.retrieve("q", &corpus, GENERATION_THRESHOLD).await,
            Retrieval::FullCorpus
        );
    }

    #[tokio::test]
    async fn similar_uses_stricter_threshold() {
        let corpus = vec![entry("borderline", "x", Some(at_similarity(0.45)))];
        let index = KnowledgeIndex::new(Arc::new(MockEmbedder::new().with_default(vec![1.0, 0.0])));

        assert_eq!(index.rank("q", &corpus, GENERATION_THRESHOLD).await.unwrap().len(), 1);
        assert!(index.similar("q", &corpus).await.unwrap().is_empty());
    }

    #[test]
    fn lexical_matches_either_direction_ignoring_case() {
        let corpus = vec![
            entry("Reembolso", "30 dias", None),
            entry("Horário de atendimento", "9h às 18h", None),
            entry("  ", "blank subject", None),
        ];

        let found = lexical_matches("Como funciona o REEMBOLSO?", &corpus);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Reembolso");

        let found = lexical_matches("horário", &corpus);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Horário de atendimento");

        assert!(lexical_matches("   ", &corpus).is_empty());
    }
}
