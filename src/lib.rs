//! # Corpus Gate
//!
//! A moderated knowledge ingestion and semantic retrieval engine for
//! conversational assistants.
//!
//! Corpus Gate turns arbitrary long-form text into searchable,
//! semantically-ranked evidence: raw text is split into overlapping chunks
//! with sentence-aware boundaries, embedded via a pluggable provider, and
//! ranked against queries with cosine similarity. A three-state moderation
//! gate (pending / approved / rejected) controls which sources' chunks are
//! ever eligible for retrieval.
//!
//! ## Architecture
//!
//! ```text
//! raw text ──▶ Chunker ──▶ Embedding ──▶ SQLite (sources,
//!                          Provider      chunks, relations)
//!                                             │
//!                              Moderation ────┤ approved only
//!                                 Gate        ▼
//! query ─────▶ Embedding ──▶ Similarity ──▶ ranked results
//!              Provider        Ranker       (with citations)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cg init                                  # create database
//! cg submit notes.txt --title "Notes" --owner alice
//! cg moderate approve <source-id> --by bob
//! cg search "deployment checklist" --limit 5
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`chunk`] | Boundary-aware overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction + stored-vector normalization |
//! | [`rank`] | Cosine similarity ranking |
//! | [`moderation`] | Moderation state machine |
//! | [`store`] | Persistence abstraction (SQLite, in-memory) |
//! | [`ingest`] | Ingestion orchestration |
//! | [`search`] | Retrieval orchestration |
//! | [`engine`] | The engine facade |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod moderation;
pub mod rank;
pub mod search;
pub mod store;
