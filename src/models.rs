//! Core data models for the corpus engine.
//!
//! These types represent the sources, chunks, and similarity results that
//! flow through the ingestion and retrieval pipeline, plus the moderation
//! status enum that gates corpus visibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of content a source was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Document,
    Image,
    Video,
    Webpage,
    Api,
    Chat,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::Image => "image",
            SourceKind::Video => "video",
            SourceKind::Webpage => "webpage",
            SourceKind::Api => "api",
            SourceKind::Chat => "chat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(SourceKind::Document),
            "image" => Some(SourceKind::Image),
            "video" => Some(SourceKind::Video),
            "webpage" => Some(SourceKind::Webpage),
            "api" => Some(SourceKind::Api),
            "chat" => Some(SourceKind::Chat),
            _ => None,
        }
    }
}

/// Moderation state controlling whether a source's chunks are retrievable.
///
/// Only [`Approved`](ModerationStatus::Approved) sources feed retrieval;
/// `Pending` and `Rejected` sources are fully excluded from candidate
/// generation, never merely down-ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ModerationStatus::Pending),
            "approved" => Some(ModerationStatus::Approved),
            "rejected" => Some(ModerationStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of ingested knowledge (document, chat transcript, webpage, ...).
///
/// Created in `Pending` status when ingestion begins; mutated only through
/// the moderation gate; deleted with a cascade that removes all owned chunks
/// and any relations referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: SourceKind,
    pub status: ModerationStatus,
    /// User that submitted the source.
    pub owner_id: String,
    /// Moderator that approved the source, once approved.
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Free-form caller metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One retrievable unit of text belonging to exactly one [`Source`].
///
/// A chunk without an embedding is excluded from similarity ranking but is
/// still stored and counted: ingestion is not all-or-nothing per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    /// Zero-based position of this chunk within its source.
    pub chunk_index: i64,
    pub content: String,
    /// Embedding vector; absent when the provider failed for this chunk.
    pub embedding: Option<Vec<f32>>,
    /// Caller metadata plus `chunk_index` and `total_chunks`.
    pub metadata: serde_json::Value,
    /// SHA-256 of `content`, for staleness detection on re-embedding.
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of a directed edge between two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Related,
    PartOf,
    References,
    Contradicts,
    Supports,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Related => "related",
            RelationKind::PartOf => "part_of",
            RelationKind::References => "references",
            RelationKind::Contradicts => "contradicts",
            RelationKind::Supports => "supports",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "related" => Some(RelationKind::Related),
            "part_of" => Some(RelationKind::PartOf),
            "references" => Some(RelationKind::References),
            "contradicts" => Some(RelationKind::Contradicts),
            "supports" => Some(RelationKind::Supports),
            _ => None,
        }
    }
}

/// A directed, typed, strength-weighted edge between two sources.
///
/// Not consulted by ranking; persisted alongside the corpus and removed when
/// either endpoint is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub from_source: String,
    pub to_source: String,
    pub kind: RelationKind,
    /// Edge weight in `1..=10`.
    pub strength: u8,
    pub created_at: DateTime<Utc>,
}

/// An ephemeral per-query projection of a ranked chunk.
///
/// Never persisted. Carries the owning [`Source`] so the caller can render a
/// citation; the engine does not format citations itself.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub chunk: Chunk,
    pub source: Source,
    pub similarity: f32,
}
