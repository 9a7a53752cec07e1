use sqlx::SqlitePool;

use crate::error::EngineError;

/// Create the schema if it does not exist. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), EngineError> {
    // Sources table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            owner_id TEXT NOT NULL,
            approved_by TEXT,
            approved_at INTEGER,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks table. embedding_json is NULL when the provider failed for
    // that chunk; its value is a JSON array (legacy rows may carry other
    // encodings, normalized at read time).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding_json TEXT,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(source_id, chunk_index),
            FOREIGN KEY (source_id) REFERENCES sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Relations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS relations (
            id TEXT PRIMARY KEY,
            from_source TEXT NOT NULL,
            to_source TEXT NOT NULL,
            kind TEXT NOT NULL,
            strength INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (from_source) REFERENCES sources(id),
            FOREIGN KEY (to_source) REFERENCES sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source_id ON chunks(source_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_status ON sources(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_relations_from ON relations(from_source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_relations_to ON relations(to_source)")
        .execute(pool)
        .await?;

    Ok(())
}
