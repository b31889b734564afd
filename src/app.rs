//! Application context.
//!
//! [`App`] owns every component handle and the conversation. Nothing is
//! global: the binary builds one from config with [`App::from_config`], tests
//! assemble one from fakes with [`App::new`]. Questions are processed one at
//! a time because [`App::ask`] borrows the app mutably.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::chat::{AnswerGenerator, OpenAIChat};
use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::AppError;
use crate::ingest::{self, SetupReport};
use crate::models::Role;
use crate::provider::OpenAIClient;
use crate::retrieve;
use crate::session::Conversation;
use crate::store::{SqliteStore, VectorStore};

pub const CONTEXT_NOTICE: &str = "(Using retrieved knowledge from documents)";
pub const NO_CONTEXT_NOTICE: &str =
    "(No relevant information found in documents, answering from general knowledge)";

/// Knobs for setup and retrieval, lifted out of [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub extensions: Vec<String>,
    pub batch_size: usize,
    pub k: usize,
    pub distance_threshold: f32,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            data_dir: config.ingest.dir.clone(),
            extensions: config.ingest.extensions.clone(),
            batch_size: config.embedding.batch_size,
            k: config.retrieval.k,
            distance_threshold: config.retrieval.distance_threshold,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Model answer prefixed with the context notice, as shown to the user.
    pub text: String,
    pub sources: Vec<String>,
    pub used_context: bool,
}

pub struct App {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn AnswerGenerator>,
    settings: Settings,
    session: Conversation,
}

impl App {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
        settings: Settings,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            settings,
            session: Conversation::new(),
        }
    }

    /// Wire the OpenAI clients and the SQLite store described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAIClient::from_config(&config.provider)?;
        let embedder = OpenAIEmbedder::new(client.clone(), config.embedding.model.clone());
        let generator = OpenAIChat::new(client, config.chat.clone());

        let pool = db::open(config).await?;
        let store = SqliteStore::new(pool, config.collection.name.clone());

        tracing::info!(
            base_url = %config.provider.base_url,
            embedding_model = %config.embedding.model,
            chat_model = %config.chat.model,
            collection = %config.collection.name,
            "application context ready"
        );

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(store),
            Arc::new(generator),
            Settings::from_config(config),
        ))
    }

    /// Ingest the data directory unless the store is already set up.
    pub async fn setup(&self) -> Result<SetupReport> {
        ingest::run_setup(
            self.embedder.as_ref(),
            self.store.as_ref(),
            &self.settings.data_dir,
            &self.settings.extensions,
            self.settings.batch_size,
        )
        .await
    }

    /// Answer `question` and record both turns in the conversation.
    ///
    /// On failure the assistant turn records the error notice so the
    /// transcript stays user/assistant alternating; the error is returned.
    pub async fn ask(&mut self, question: &str) -> Result<Answer, AppError> {
        self.session.append(Role::User, question);

        match self.answer(question).await {
            Ok(answer) => {
                self.session.append(Role::Assistant, answer.text.clone());
                Ok(answer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to answer question");
                self.session
                    .append(Role::Assistant, format!("(Error: {})", e));
                Err(e)
            }
        }
    }

    async fn answer(&self, question: &str) -> Result<Answer, AppError> {
        if !self.store.is_initialized().await? {
            return Err(AppError::NotInitialized {
                collection: self.store.collection().to_string(),
            });
        }

        let retrieval = retrieve::retrieve(
            self.embedder.as_ref(),
            self.store.as_ref(),
            question,
            self.settings.k,
            self.settings.distance_threshold,
        )
        .await?;

        let response = self
            .generator
            .generate(question, &retrieval.context)
            .await?;

        let notice = if retrieval.used_context {
            CONTEXT_NOTICE
        } else {
            NO_CONTEXT_NOTICE
        };

        Ok(Answer {
            text: format!("{}\n\n{}", notice, response),
            sources: retrieval.sources,
            used_context: retrieval.used_context,
        })
    }

    pub fn session(&self) -> &Conversation {
        &self.session
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::Entry;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            crate::embedding::validate_input(text)?;
            Ok(vec![1.0, 0.0])
        }
    }

    /// Records the context it was called with.
    #[derive(Default)]
    struct RecordingGenerator {
        contexts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, question: &str, context: &str) -> Result<String, ProviderError> {
            self.contexts.lock().unwrap().push(context.to_string());
            if self.fail {
                return Err(ProviderError::Transient {
                    status: Some(503),
                    message: "unavailable".into(),
                });
            }
            Ok(format!("answer to {}", question))
        }
    }

    fn app_with(store: Arc<InMemoryStore>, generator: Arc<RecordingGenerator>) -> App {
        App::new(Arc::new(FixedEmbedder), store, generator, Settings::default())
    }

    #[tokio::test]
    async fn empty_initialized_store_answers_without_context() {
        let store = Arc::new(InMemoryStore::default());
        store.mark_initialized().await.unwrap();
        let generator = Arc::new(RecordingGenerator::default());
        let mut app = app_with(store, generator.clone());

        let answer = app.ask("What is the late policy?").await.unwrap();
        assert!(!answer.used_context);
        assert!(answer.sources.is_empty());
        assert!(answer.text.starts_with(NO_CONTEXT_NOTICE));
        assert_eq!(generator.contexts.lock().unwrap().as_slice(), &[String::new()]);
    }

    #[tokio::test]
    async fn close_document_is_used_as_context() {
        let store = Arc::new(InMemoryStore::default());
        store
            .upsert(&Entry {
                id: "policies.pdf".into(),
                document: "Late work loses 10% per day.".into(),
                embedding: vec![1.0, 0.0],
            })
            .await
            .unwrap();
        store.mark_initialized().await.unwrap();
        let generator = Arc::new(RecordingGenerator::default());
        let mut app = app_with(store, generator.clone());

        let answer = app.ask("What is the late policy?").await.unwrap();
        assert!(answer.used_context);
        assert_eq!(answer.sources, vec!["policies.pdf"]);
        assert_eq!(
            answer.text,
            format!("{}\n\nanswer to What is the late policy?", CONTEXT_NOTICE)
        );
        assert_eq!(
            generator.contexts.lock().unwrap()[0],
            "Late work loses 10% per day."
        );
    }

    #[tokio::test]
    async fn two_questions_make_four_messages() {
        let store = Arc::new(InMemoryStore::default());
        store.mark_initialized().await.unwrap();
        let mut app = app_with(store, Arc::new(RecordingGenerator::default()));

        app.ask("first?").await.unwrap();
        app.ask("second?").await.unwrap();

        let roles: Vec<Role> = app.session().history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(app.session().history()[2].content, "second?");
    }

    #[tokio::test]
    async fn uninitialized_store_is_a_visible_error() {
        let store = Arc::new(InMemoryStore::default());
        let generator = Arc::new(RecordingGenerator::default());
        let mut app = app_with(store, generator.clone());

        let err = app.ask("anything?").await.unwrap_err();
        assert!(matches!(err, AppError::NotInitialized { .. }));
        assert!(generator.contexts.lock().unwrap().is_empty());
        assert_eq!(app.session().len(), 2);
        assert!(app.session().history()[1].content.starts_with("(Error:"));
    }

    #[tokio::test]
    async fn provider_failure_does_not_poison_session() {
        let store = Arc::new(InMemoryStore::default());
        store.mark_initialized().await.unwrap();
        let failing = Arc::new(RecordingGenerator {
            fail: true,
            ..Default::default()
        });
        let mut app = app_with(store, failing);

        let err = app.ask("q1").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(ref p) if p.is_transient()));
        assert_eq!(app.session().len(), 2);
    }
}
