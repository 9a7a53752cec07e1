//! SQLite [`Store`] implementation backed by sqlx.
//!
//! Rows keep timestamps as unix epoch seconds and metadata/embeddings as
//! JSON text. Embedding values are normalized through
//! [`decode_stored_vector`](crate::embedding::decode_stored_vector) at read
//! time, so corpora carrying legacy vector encodings still score correctly.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};

use crate::embedding::{decode_stored_vector, encode_stored_vector};
use crate::error::EngineError;
use crate::models::{Chunk, ModerationStatus, Relation, RelationKind, Source, SourceKind};

use super::Store;

/// sqlx-backed store over the `sources`, `chunks`, and `relations` tables.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ts(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

fn from_ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn source_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Source, EngineError> {
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");
    let metadata_json: String = row.get("metadata_json");
    let approved_at: Option<i64> = row.get("approved_at");

    Ok(Source {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        kind: SourceKind::parse(&kind_str)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown source kind: {}", kind_str)))?,
        status: ModerationStatus::parse(&status_str).ok_or_else(|| {
            EngineError::InvalidInput(format!("unknown moderation status: {}", status_str))
        })?,
        owner_id: row.get("owner_id"),
        approved_by: row.get("approved_by"),
        approved_at: approved_at.map(from_ts),
        metadata: serde_json::from_str(&metadata_json)?,
        created_at: from_ts(row.get("created_at")),
        updated_at: from_ts(row.get("updated_at")),
    })
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, EngineError> {
    let metadata_json: String = row.get("metadata_json");
    let embedding_json: Option<String> = row.get("embedding_json");

    // Normalize whatever shape the stored value carries; undecodable
    // values degrade to an absent embedding rather than failing the read.
    let embedding = match embedding_json {
        Some(text) => serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .as_ref()
            .and_then(decode_stored_vector),
        None => None,
    };

    Ok(Chunk {
        id: row.get("id"),
        source_id: row.get("source_id"),
        chunk_index: row.get("chunk_index"),
        content: row.get("content"),
        embedding,
        metadata: serde_json::from_str(&metadata_json)?,
        hash: row.get("hash"),
        created_at: from_ts(row.get("created_at")),
    })
}

fn relation_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Relation, EngineError> {
    let kind_str: String = row.get("kind");
    let strength: i64 = row.get("strength");

    Ok(Relation {
        id: row.get("id"),
        from_source: row.get("from_source"),
        to_source: row.get("to_source"),
        kind: RelationKind::parse(&kind_str).ok_or_else(|| {
            EngineError::InvalidInput(format!("unknown relation kind: {}", kind_str))
        })?,
        strength: strength as u8,
        created_at: from_ts(row.get("created_at")),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_source(&self, source: &Source) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, title, description, kind, status, owner_id,
                                 approved_by, approved_at, metadata_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&source.id)
        .bind(&source.title)
        .bind(&source.description)
        .bind(source.kind.as_str())
        .bind(source.status.as_str())
        .bind(&source.owner_id)
        .bind(&source.approved_by)
        .bind(source.approved_at.map(ts))
        .bind(serde_json::to_string(&source.metadata)?)
        .bind(ts(source.created_at))
        .bind(ts(source.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>, EngineError> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(source_from_row).transpose()
    }

    async fn list_sources(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Source>, EngineError> {
        let rows = match status {
            Some(s) => {
                sqlx::query("SELECT * FROM sources WHERE status = ? ORDER BY created_at, id")
                    .bind(s.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM sources ORDER BY created_at, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(source_from_row).collect()
    }

    async fn update_source_status(
        &self,
        id: &str,
        from: ModerationStatus,
        to: ModerationStatus,
        approver: Option<&str>,
    ) -> Result<Source, EngineError> {
        let now = ts(Utc::now());

        // The status guard serializes concurrent transitions: only one of
        // two racing moderation calls can match the expected `from` state.
        let result = if to == ModerationStatus::Approved {
            sqlx::query(
                r#"
                UPDATE sources
                SET status = ?, approved_by = ?, approved_at = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(to.as_str())
            .bind(approver)
            .bind(now)
            .bind(now)
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query("UPDATE sources SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(now)
                .bind(id)
                .bind(from.as_str())
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            return match self.get_source(id).await? {
                Some(current) => Err(EngineError::InvalidState {
                    from: current.status,
                    to,
                }),
                None => Err(EngineError::source_not_found(id)),
            };
        }

        self.get_source(id)
            .await?
            .ok_or_else(|| EngineError::source_not_found(id))
    }

    async fn delete_source(&self, id: &str) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EngineError::source_not_found(id));
        }

        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM relations WHERE from_source = ? OR to_source = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<(), EngineError> {
        let embedding_json = chunk
            .embedding
            .as_ref()
            .map(|v| serde_json::to_string(&encode_stored_vector(v)))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO chunks (id, source_id, chunk_index, content, embedding_json,
                                metadata_json, hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(embedding_json)
        .bind(serde_json::to_string(&chunk.metadata)?)
        .bind(&chunk.hash)
        .bind(ts(chunk.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_chunks(&self, source_id: &str) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn chunks_for_source(&self, source_id: &str) -> Result<Vec<Chunk>, EngineError> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE source_id = ? ORDER BY chunk_index")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(chunk_from_row).collect()
    }

    async fn create_relation(&self, relation: &Relation) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO relations (id, from_source, to_source, kind, strength, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&relation.id)
        .bind(&relation.from_source)
        .bind(&relation.to_source)
        .bind(relation.kind.as_str())
        .bind(relation.strength as i64)
        .bind(ts(relation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn relations_for_source(&self, source_id: &str) -> Result<Vec<Relation>, EngineError> {
        let rows = sqlx::query(
            "SELECT * FROM relations WHERE from_source = ? OR to_source = ? ORDER BY created_at, id",
        )
        .bind(source_id)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(relation_from_row).collect()
    }
}
