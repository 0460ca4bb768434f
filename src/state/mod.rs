use std::sync::Arc;

use crate::agent::ReplyGenerator;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::documents::{DirectoryReader, DocumentLoader};
use crate::embeddings::{build_embedder, Embedder};
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::pipeline::PipelineController;
use crate::rag::{Collection, SqliteVectorStore, VectorStore};

pub mod error;

use error::InitializationError;

/// Process-wide clients, built once at startup and shared by every turn.
///
/// Contains:
/// - Resolved paths and the effective configuration
/// - The SQLite vector store and the configured collection
/// - The pipeline controller wired to the document reader, embedder and agent
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub store: Arc<SqliteVectorStore>,
    pub pipeline: Arc<PipelineController>,
}

impl AppState {
    /// Loads configuration for `paths`, then builds the state from it.
    pub async fn load(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load()
            .map_err(InitializationError::Config)?;
        Self::initialize(paths, config).await
    }

    /// Builds the application state.
    ///
    /// 1. Opens (or creates) the vector database and the collection
    /// 2. Builds the chat client and the embedder
    /// 3. Wires the document reader and agent into the pipeline controller
    ///
    /// A missing API key is not an error here; the first turn reports it.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let chat: Arc<dyn LlmProvider> = Arc::new(
            OpenAiCompatProvider::from_llm_config(&config.llm)
                .map_err(InitializationError::Llm)?,
        );
        if config.llm.resolve_api_key().is_none() {
            tracing::warn!(
                env = %config.llm.api_key_env,
                "No API key configured; replies will fail until it is set"
            );
        }

        let embedder: Arc<dyn Embedder> = build_embedder(&config.embedding, || {
            let provider = OpenAiCompatProvider::from_embedding_config(
                &config.embedding,
                config.llm.request_timeout(),
            )?;
            Ok(Arc::new(provider) as Arc<dyn LlmProvider>)
        })
        .map_err(InitializationError::Llm)?;

        let store_path = paths.resolve_store_path(&config.store.path);
        let store = Arc::new(
            SqliteVectorStore::open(&store_path)
                .await
                .map_err(InitializationError::Store)?,
        );
        let collection = Collection::get_or_create(
            store.clone() as Arc<dyn VectorStore>,
            &config.store.collection,
            &embedder.id(),
        )
        .await
        .map_err(InitializationError::Store)?;

        let documents_dir = paths.resolve_documents_dir(&config.documents.dir);
        let loader: Arc<dyn DocumentLoader> = Arc::new(DirectoryReader::new(
            documents_dir.clone(),
            config.documents.max_file_bytes,
        ));

        let generator = ReplyGenerator::new(&config.agent, &config.llm, chat);
        let pipeline = PipelineController::new(collection, embedder.clone(), loader, generator, &config);

        tracing::info!(
            store = %store_path.display(),
            collection = %config.store.collection,
            documents = %documents_dir.display(),
            embedder = %embedder.id(),
            model = %config.llm.model,
            "Application state initialized"
        );

        Ok(Arc::new(Self {
            paths,
            config: Arc::new(config),
            store,
            pipeline: Arc::new(pipeline),
        }))
    }
}
