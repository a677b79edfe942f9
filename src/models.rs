//! Core data models for the indexing and query pipeline.
//!
//! These types represent the documents, chunk rows, vector-store points,
//! and search results that flow from the CMS content store through
//! embedding and retrieval to the answer generator.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::locale::Locale;

/// One piece of indexable content, materialized transiently during an
/// indexing run from the CMS content store or the hotel-listing store.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Stable identifier, e.g. `content:page.home:en` or `hotel:flamingo:en`.
    pub source_id: String,
    pub title: String,
    pub locale: Locale,
    /// Public page the content belongs to.
    pub url: String,
    pub updated_at: Option<i64>,
    /// Flattened searchable text.
    pub text: String,
}

/// A bounded-length piece of a document's text, still carrying the parent's
/// metadata. The flat list of chunk rows is what the indexer embeds.
#[derive(Debug, Clone)]
pub struct ChunkRow {
    pub source_id: String,
    pub title: String,
    pub locale: Locale,
    pub url: String,
    pub updated_at: Option<i64>,
    /// Zero-based position within the parent document.
    pub chunk_index: i64,
    pub text: String,
}

/// Payload stored alongside the vector in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub source_id: String,
    pub title: String,
    pub locale: Locale,
    pub url: String,
    pub updated_at: Option<i64>,
    pub chunk_index: i64,
    pub text: String,
}

/// The unit persisted in the vector store.
#[derive(Debug, Clone, Serialize)]
pub struct Point {
    /// Deterministic UUID-shaped id derived from `source_id:chunk_index`,
    /// so re-indexing upserts in place instead of accumulating duplicates.
    pub id: String,
    /// L2-normalized embedding.
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A point plus its similarity score, as returned by a search call.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub id: String,
    pub score: f64,
    pub payload: PointPayload,
}

/// Deduplicated-by-`source_id` projection of one or more hits, used for
/// citation display. `score` is the best score seen for that source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    #[serde(rename = "sourceId")]
    pub source_id: String,
    pub title: String,
    pub locale: Locale,
    pub url: String,
    pub score: f64,
}

/// One prior turn of the conversation, supplied by the caller per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

/// Derive the deterministic, UUID-shaped point id for a chunk.
///
/// SHA-256 of `"{source_id}:{chunk_index}"`, truncated to 16 bytes with the
/// version nibble forced to 4 and the variant bits to `10` so the string
/// parses as a UUID everywhere a UUID is expected. Idempotent across runs:
/// the same document/chunk pair always maps to the same id.
pub fn point_id(source_id: &str, chunk_index: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes).to_string()
}
