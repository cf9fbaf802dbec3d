//! Operator-authored knowledge entries.
//!
//! An entry is immutable once created; the only permitted mutation is
//! filling in a missing embedding.

use chrono::{DateTime, Utc};
use deskbot_models::{Embedding, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::storage::Store;
use crate::types::{KnowledgeId, now};

/// Longest subject accepted for a knowledge entry, in characters.
pub const MAX_SUBJECT_CHARS: usize = 256;

/// A single piece of operator knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: KnowledgeId,
    pub subject: String,
    pub information: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Text that is embedded for this entry.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.subject, &self.information)
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

fn embedding_text(subject: &str, information: &str) -> String {
    format!("{} {}", subject, information)
}

/// Operator input for a new knowledge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewKnowledgeEntry {
    pub subject: String,
    pub information: String,
}

impl NewKnowledgeEntry {
    pub fn new(subject: impl Into<String>, information: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            information: information.into(),
        }
    }

    /// Reject malformed input before anything is persisted.
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(Error::Validation("subject must not be blank".into()));
        }
        if self.information.trim().is_empty() {
            return Err(Error::Validation("information must not be blank".into()));
        }
        if self.subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(Error::Validation(format!(
                "subject must be at most {} characters",
                MAX_SUBJECT_CHARS
            )));
        }
        Ok(())
    }
}

/// Validate, embed and persist a new entry.
///
/// An embedding failure does not block creation; the entry is stored
/// without a vector and retrieval treats it as unranked.
#[instrument(skip(store, embedder, input), level = "debug")]
pub async fn add_entry(
    store: &dyn Store,
    embedder: &dyn EmbeddingProvider,
    input: NewKnowledgeEntry,
) -> Result<KnowledgeEntry> {
    input.validate()?;

    let subject = input.subject.trim().to_string();
    let information = input.information.trim().to_string();

    let embedding = match embedder.embed(&embedding_text(&subject, &information)).await {
        Ok(vector) if !vector.is_empty() => Some(vector),
        Ok(_) => {
            warn!(provider = embedder.name(), "embedding provider returned an empty vector");
            None
        }
        Err(e) => {
            warn!(provider = embedder.name(), error = %e, "storing knowledge entry without embedding");
            None
        }
    };

    let entry = KnowledgeEntry {
        id: KnowledgeId::new(),
        subject,
        information,
        embedding,
        created_at: now(),
    };
    store.create_knowledge(&entry).await?;
    info!(id = %entry.id, subject = %entry.subject, "knowledge entry created");
    Ok(entry)
}

/// Compute embeddings for every entry that lacks one.
///
/// Returns how many entries were filled. Entries whose embedding fails
/// again are left as they are.
#[instrument(skip(store, embedder), level = "debug")]
pub async fn backfill_embeddings(
    store: &dyn Store,
    embedder: &dyn EmbeddingProvider,
) -> Result<usize> {
    let mut filled = 0;
    for entry in store.list_knowledge().await? {
        if entry.has_embedding() {
            continue;
        }
        match embedder.embed(&entry.embedding_text()).await {
            Ok(vector) if !vector.is_empty() => {
                if store.set_knowledge_embedding(entry.id, &vector).await? {
                    filled += 1;
                }
            }
            Ok(_) => warn!(id = %entry.id, "embedding provider returned an empty vector"),
            Err(e) => warn!(id = %entry.id, error = %e, "backfill embedding failed"),
        }
    }
    info!(filled, "knowledge backfill finished");
    Ok(filled)
}

/// Delete an entry.
#[instrument(skip(store), level = "debug")]
pub async fn delete_entry(store: &dyn Store, id: KnowledgeId) -> Result<()> {
    if !store.delete_knowledge(id).await? {
        return Err(Error::not_found("Knowledge entry", id));
    }
    info!(%id, "knowledge entry deleted");
    Ok(())
}
