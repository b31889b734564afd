//! Document ingestion and one-time vector store setup.
//!
//! [`load_documents`] turns the data directory into one [`Document`] per
//! recognized file. [`run_setup`] embeds those documents into the store,
//! gated on the store's persisted initialization flag so that repeated
//! startups do not re-ingest.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::embedding::Embedder;
use crate::error::ProviderError;
use crate::extract;
use crate::models::{Document, Entry};
use crate::store::VectorStore;

/// A file that could not be ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Result of [`run_setup`].
#[derive(Debug)]
pub enum SetupReport {
    /// The initialization flag was already set; nothing was done.
    AlreadyInitialized { entries: usize },
    Ingested {
        ingested: Vec<String>,
        skipped: Vec<SkippedFile>,
    },
}

/// Read every recognized file directly inside `dir`.
///
/// Files are visited in filename order. Unreadable or unparsable files are
/// skipped with a warning; ingestion continues with the rest.
pub fn load_documents(dir: &Path, extensions: &[String]) -> Result<IngestOutcome> {
    if !dir.is_dir() {
        bail!("Document directory does not exist: {}", dir.display());
    }

    let matcher = build_extension_set(extensions)?;

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !matcher.is_match(&name) {
            continue;
        }
        paths.push((name, entry.into_path()));
    }
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let mut outcome = IngestOutcome::default();

    for (name, path) in paths {
        match extract::extract_file(&path) {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(file = %name, "no extractable text, skipping");
                outcome.skipped.push(SkippedFile {
                    file: name,
                    reason: "no extractable text".to_string(),
                });
            }
            Ok(text) => {
                tracing::debug!(file = %name, chars = text.len(), "extracted document");
                outcome.documents.push(Document { id: name, text });
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "failed to extract document, skipping");
                outcome.skipped.push(SkippedFile {
                    file: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}

fn build_extension_set(extensions: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let ext = ext.trim().trim_start_matches('.');
        let glob = GlobBuilder::new(&format!("*.{}", ext))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid extension: {}", ext))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Populate the store from `dir` unless it is already initialized.
///
/// Documents are embedded `batch_size` at a time. A document the provider
/// permanently rejects is skipped like an unreadable file. A transient
/// failure aborts setup before the initialization flag is set, so the
/// collection stays eligible for another attempt. When the flag is
/// missing but entries already exist, ingestion runs again; upserts replace
/// entries by id so no duplicates result.
pub async fn run_setup(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    dir: &Path,
    extensions: &[String],
    batch_size: usize,
) -> Result<SetupReport> {
    if store.is_initialized().await? {
        let entries = store.count().await?;
        tracing::info!(collection = store.collection(), entries, "vector store already set up");
        return Ok(SetupReport::AlreadyInitialized { entries });
    }

    let existing = store.count().await?;
    if existing > 0 {
        tracing::warn!(
            collection = store.collection(),
            existing,
            "initialization flag missing but collection has entries; re-ingesting"
        );
    }

    let IngestOutcome {
        documents,
        mut skipped,
    } = load_documents(dir, extensions)?;
    let mut ingested = Vec::with_capacity(documents.len());

    for batch in documents.chunks(batch_size.max(1)) {
        let results = embed_documents(embedder, batch).await?;

        for (doc, result) in batch.iter().zip(results) {
            match result {
                Ok(embedding) => {
                    store
                        .upsert(&Entry {
                            id: doc.id.clone(),
                            document: doc.text.clone(),
                            embedding,
                        })
                        .await?;
                    ingested.push(doc.id.clone());
                }
                Err(e) => {
                    tracing::warn!(file = %doc.id, error = %e, "embedding rejected, skipping");
                    skipped.push(SkippedFile {
                        file: doc.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    store.mark_initialized().await?;
    tracing::info!(
        collection = store.collection(),
        model = embedder.model_name(),
        ingested = ingested.len(),
        skipped = skipped.len(),
        "vector store setup complete"
    );

    Ok(SetupReport::Ingested { ingested, skipped })
}

/// Embed one batch, yielding a result per document.
///
/// Transient failures abort with `Err`. A permanent failure on a batch
/// falls back to one request per document so only the offending documents
/// are rejected.
async fn embed_documents(
    embedder: &dyn Embedder,
    batch: &[Document],
) -> Result<Vec<Result<Vec<f32>, ProviderError>>, ProviderError> {
    if batch.len() > 1 {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        match embedder.embed_batch(&texts).await {
            Ok(vectors) => return Ok(vectors.into_iter().map(Ok).collect()),
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "batch rejected, embedding documents one by one");
            }
        }
    }

    let mut results = Vec::with_capacity(batch.len());
    for doc in batch {
        match embedder.embed(&doc.text).await {
            Err(e) if e.is_transient() => return Err(e),
            other => results.push(other),
        }
    }
    Ok(results)
}
