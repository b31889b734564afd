//! # Coursebot
//!
//! A retrieval-augmented chat assistant for course documents.
//!
//! Coursebot extracts the text of every PDF in a data directory, embeds each
//! document once into a persistent vector collection, and answers questions
//! with a chat model. When the closest stored document is near enough to a
//! question, the nearest documents are passed to the model as context and
//! listed as sources; otherwise the model answers from general knowledge.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  datafiles  │──▶│   Ingest     │──▶│ VectorStore  │
//! │  (PDFs)     │   │ Extract+Embed│   │ SQLite/Memory│
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ k nearest
//!                   ┌─────────────┐   ┌──────▼───────┐
//!   question ──────▶│     App     │──▶│   Retrieve   │
//!                   │  + session  │   └──────────────┘
//!                   └──────┬──────┘
//!                          ▼
//!                   ┌─────────────┐
//!                   │    Chat     │  (OpenAI-compatible)
//!                   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! coursebot init                          # create database
//! coursebot setup                         # ingest ./datafiles once
//! coursebot ask "When is the midterm?"    # one-shot question
//! coursebot chat                          # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed provider and application errors |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`ingest`] | Directory loading and one-time setup |
//! | [`provider`] | OpenAI-compatible HTTP client with retry |
//! | [`embedding`] | Embedding provider abstraction and vector math |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`retrieve`] | Threshold-gated context assembly |
//! | [`chat`] | Answer generation |
//! | [`session`] | Conversation history |
//! | [`app`] | Application context tying the components together |
//! | [`repl`] | Interactive terminal loop |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod provider;
pub mod repl;
pub mod retrieve;
pub mod session;
pub mod store;
