//! Semantic retrieval: vector math and the knowledge index.

mod index;
mod vector;

pub use index::{
    GENERATION_THRESHOLD, KnowledgeIndex, RankedEntry, Retrieval, SIMILARITY_THRESHOLD,
    lexical_matches,
};
pub use vector::{cosine_similarity, nearest};
