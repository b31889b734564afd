//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the narrow interface the rest of the crate
//! sees: upsert by id, k-nearest query by cosine distance, and the persisted
//! initialization flag that gates setup. Two backends:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteStore`] | Persistent collection in a SQLite file |
//! | [`InMemoryStore`] | Tests and throwaway sessions |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{CollectionInfo, Entry, QueryHit};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this handle reads and writes.
    fn collection(&self) -> &str;

    /// Insert an entry, overwriting any existing entry with the same id.
    async fn upsert(&self, entry: &Entry) -> Result<()>;

    /// Return up to `k` entries ordered by ascending cosine distance.
    ///
    /// An empty store, or `k == 0`, yields an empty vector.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    async fn count(&self) -> Result<usize>;

    /// All entry ids, sorted.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Whether setup has completed for this collection.
    async fn is_initialized(&self) -> Result<bool>;

    /// Persist the initialization flag.
    async fn mark_initialized(&self) -> Result<()>;

    async fn info(&self) -> Result<CollectionInfo>;
}

/// Brute-force k-nearest ranking shared by both backends.
///
/// Ties are broken by id so results are deterministic.
pub(crate) fn rank_nearest<'a, I>(query: &[f32], entries: I, k: usize) -> Vec<QueryHit>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a [f32])>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<QueryHit> = entries
        .into_iter()
        .map(|(id, document, embedding)| QueryHit {
            id: id.to_string(),
            document: document.to_string(),
            distance: cosine_distance(query, embedding),
        })
        .collect();

    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_ascending_and_truncates() {
        let near = [1.0f32, 0.0];
        let mid = [1.0f32, 1.0];
        let far = [0.0f32, 1.0];
        let entries = vec![
            ("far.pdf", "far", &far[..]),
            ("near.pdf", "near", &near[..]),
            ("mid.pdf", "mid", &mid[..]),
        ];
        let hits = rank_nearest(&[1.0, 0.0], entries, 2);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near.pdf", "mid.pdf"]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn zero_k_is_empty() {
        let v = [1.0f32];
        assert!(rank_nearest(&[1.0], vec![("a", "a", &v[..])], 0).is_empty());
    }

    #[test]
    fn ties_break_by_id() {
        let v = [1.0f32, 0.0];
        let entries = vec![("b", "b", &v[..]), ("a", "a", &v[..])];
        let hits = rank_nearest(&[1.0, 0.0], entries, 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
    }

    #[test]
    fn overflowing_vector_ranks_last_without_panicking() {
        let overflow = [f32::INFINITY, 1.0];
        let normal = [0.0f32, 1.0];
        let entries = vec![
            ("overflow.pdf", "overflow", &overflow[..]),
            ("normal.pdf", "normal", &normal[..]),
        ];
        let hits = rank_nearest(&[1.0, 1.0], entries, 2);
        assert_eq!(hits[0].id, "normal.pdf");
        assert_eq!(hits[1].id, "overflow.pdf");
        assert_eq!(hits[1].distance, 2.0);
    }
}
