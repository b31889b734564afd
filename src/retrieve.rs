//! Question-to-context retrieval.
//!
//! Embeds the question, asks the store for the `k` nearest documents, and
//! decides whether to use them. Only the closest hit is compared against the
//! threshold; when it passes, every one of the `k` hits contributes its text
//! to the context, closest first.

use crate::embedding::Embedder;
use crate::error::AppError;
use crate::models::{QueryHit, Retrieval};
use crate::store::VectorStore;

/// Default number of documents to retrieve.
pub const DEFAULT_K: usize = 3;
/// Default cosine-distance threshold for using retrieved context.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.7;

pub async fn retrieve(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    question: &str,
    k: usize,
    threshold: f32,
) -> Result<Retrieval, AppError> {
    let query_vec = embedder.embed(question).await?;
    let hits = store.query(&query_vec, k).await?;
    let retrieval = assemble(&hits, threshold);

    tracing::debug!(
        hits = hits.len(),
        closest = hits.first().map(|h| h.distance),
        used_context = retrieval.used_context,
        "retrieval complete"
    );

    Ok(retrieval)
}

/// Apply the threshold to ranked hits and build the context.
pub fn assemble(hits: &[QueryHit], threshold: f32) -> Retrieval {
    match hits.first() {
        Some(closest) if closest.distance < threshold => Retrieval {
            context: hits
                .iter()
                .map(|h| h.document.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            sources: hits.iter().map(|h| h.id.clone()).collect(),
            used_context: true,
        },
        _ => Retrieval::default(),
    }
}
