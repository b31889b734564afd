//! Core data models shared by ingestion, retrieval, and the chat session.

use std::fmt;

/// A source document: one file, one text blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// File name, unique within the data directory.
    pub id: String,
    pub text: String,
}

/// A stored vector entry. Ids are unique within a collection.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    /// Cosine distance, `1 - cosine_similarity`. Lower is closer.
    pub distance: f32,
}

/// Outcome of a retrieval pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Retrieval {
    pub context: String,
    pub sources: Vec<String>,
    pub used_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Collection metadata row, including the persisted initialization flag.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub space: String,
    pub hnsw_m: u32,
    /// Unix timestamp of the completed setup, `None` until setup finishes.
    pub initialized_at: Option<i64>,
}
