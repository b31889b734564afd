use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::CollectionConfig;

pub async fn run_migrations(pool: &SqlitePool, collection: &CollectionConfig) -> Result<()> {
    // Create collections table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            space TEXT NOT NULL DEFAULT 'cosine',
            hnsw_m INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            initialized_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create entries table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            document TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dims INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection)")
        .execute(pool)
        .await?;

    // Register the collection; existing metadata is left untouched
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO collections (name, space, hnsw_m, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(&collection.name)
    .bind(&collection.space)
    .bind(collection.hnsw_m as i64)
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT space, hnsw_m FROM collections WHERE name = ?")
        .bind(&collection.name)
        .fetch_one(pool)
        .await?;
    let stored_space: String = row.get("space");
    let stored_m: i64 = row.get("hnsw_m");
    if stored_space != collection.space || stored_m != collection.hnsw_m as i64 {
        tracing::warn!(
            collection = %collection.name,
            stored_space = %stored_space,
            stored_hnsw_m = stored_m,
            "collection already exists with different metadata; keeping stored values"
        );
    }

    Ok(())
}
