//! SQLite-backed [`VectorStore`].
//!
//! Entries live in the `entries` table keyed by `(collection, id)`, with the
//! embedding stored as a little-endian f32 BLOB. Queries load every vector
//! of the collection and rank them by cosine distance in Rust.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{CollectionInfo, Entry, QueryHit};

use super::{rank_nearest, VectorStore};

/// SQLite implementation of [`VectorStore`] for one named collection.
///
/// The collection row must already exist; [`crate::db::open`] creates it.
pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, entry: &Entry) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO entries (collection, id, document, embedding, dims, content_hash, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                document = excluded.document,
                embedding = excluded.embedding,
                dims = excluded.dims,
                content_hash = excluded.content_hash,
                added_at = excluded.added_at
            "#,
        )
        .bind(&self.collection)
        .bind(&entry.id)
        .bind(&entry.document)
        .bind(vec_to_blob(&entry.embedding))
        .bind(entry.embedding.len() as i64)
        .bind(content_hash(&entry.document))
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert entry '{}'", entry.id))?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT id, document, embedding FROM entries WHERE collection = ?")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;

        let decoded: Vec<(String, String, Vec<f32>)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                (row.get("id"), row.get("document"), blob_to_vec(&blob))
            })
            .collect();

        Ok(rank_nearest(
            vector,
            decoded
                .iter()
                .map(|(id, doc, emb)| (id.as_str(), doc.as_str(), emb.as_slice())),
            k,
        ))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM entries WHERE collection = ? ORDER BY id")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn is_initialized(&self) -> Result<bool> {
        let flag: Option<Option<i64>> =
            sqlx::query_scalar("SELECT initialized_at FROM collections WHERE name = ?")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(matches!(flag, Some(Some(_))))
    }

    async fn mark_initialized(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE collections SET initialized_at = ? WHERE name = ?")
            .bind(now)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("collection '{}' does not exist", self.collection);
        }
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let row = sqlx::query(
            "SELECT name, space, hnsw_m, initialized_at FROM collections WHERE name = ?",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("collection '{}' does not exist", self.collection))?;

        let hnsw_m: i64 = row.get("hnsw_m");
        Ok(CollectionInfo {
            name: row.get("name"),
            space: row.get("space"),
            hnsw_m: hnsw_m as u32,
            initialized_at: row.get("initialized_at"),
        })
    }
}
