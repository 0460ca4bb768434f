use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use super::step::Step;
use crate::agent::ReplyGenerator;
use crate::context::compose;
use crate::core::config::AppConfig;
use crate::core::errors::RagError;
use crate::documents::DocumentLoader;
use crate::embeddings::Embedder;
use crate::rag::{Chunker, Collection, ContextBuilder, IndexStats, VectorIndex};

/// Result of a successful run: the reply plus the states visited to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub reply: String,
    pub trace: Vec<Step>,
}

/// Internal state carrying what the next step needs.
enum State {
    Start,
    Setup,
    CreatePrompt(Arc<VectorIndex>),
    GenerateReply(String),
}

impl State {
    fn step(&self) -> Step {
        match self {
            State::Start => Step::Start,
            State::Setup => Step::Setup,
            State::CreatePrompt(_) => Step::CreatePrompt,
            State::GenerateReply(_) => Step::GenerateReply,
        }
    }
}

pub struct PipelineController {
    collection: Collection,
    embedder: Arc<dyn Embedder>,
    loader: Arc<dyn DocumentLoader>,
    chunker: Chunker,
    context_builder: ContextBuilder,
    generator: ReplyGenerator,
    top_k: usize,
    timeout: Duration,
    max_steps: usize,
    /// Process-wide index, loaded or built on the first run that needs it.
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl PipelineController {
    pub fn new(
        collection: Collection,
        embedder: Arc<dyn Embedder>,
        loader: Arc<dyn DocumentLoader>,
        generator: ReplyGenerator,
        config: &AppConfig,
    ) -> Self {
        Self {
            collection,
            embedder,
            loader,
            chunker: Chunker::new(config.chunking.clone()),
            context_builder: ContextBuilder::new(config.retrieval.max_context_chars),
            generator,
            top_k: config.retrieval.top_k,
            timeout: config.pipeline.timeout(),
            max_steps: config.pipeline.max_steps,
            index: RwLock::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn agent_name(&self) -> &str {
        self.generator.name()
    }

    /// Runs one query through the state machine within the time budget.
    pub async fn run(&self, query: &str) -> Result<PipelineOutcome, RagError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id, agent = %self.generator.name());
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.execute(query))
            .instrument(span.clone())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout(self.timeout)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        span.in_scope(|| match &result {
            Ok(outcome) => tracing::info!(
                elapsed_ms,
                steps = outcome.trace.len(),
                "Pipeline run finished"
            ),
            Err(e) => tracing::warn!(elapsed_ms, kind = e.kind(), error = %e, "Pipeline run failed"),
        });
        result
    }

    async fn execute(&self, query: &str) -> Result<PipelineOutcome, RagError> {
        let mut trace = Vec::new();
        let mut state = State::Start;

        loop {
            if trace.len() >= self.max_steps {
                return Err(RagError::Configuration(format!(
                    "pipeline exceeded its step budget ({}) after {:?}",
                    self.max_steps, trace
                )));
            }

            let step = state.step();
            trace.push(step);
            tracing::info!(step = %step, n = trace.len(), "Entering step");

            state = match state {
                State::Start => {
                    let count = self.collection.count().await?;
                    tracing::debug!(collection = self.collection.name(), count, "Collection size");
                    if count < 1 {
                        if trace.contains(&Step::Setup) {
                            return Err(RagError::EmptyCorpus(self.loader.location()));
                        }
                        State::Setup
                    } else {
                        State::CreatePrompt(self.load_index().await)
                    }
                }
                State::Setup => {
                    let stats = self.setup().await?;
                    if stats.chunks == 0 {
                        return Err(RagError::EmptyCorpus(self.loader.location()));
                    }
                    State::Start
                }
                State::CreatePrompt(index) => {
                    let retrieval = index.query(query).await?;
                    tracing::info!(
                        hits = retrieval.hits.len(),
                        sources = ?retrieval.sources(),
                        "Retrieved context"
                    );
                    let context = self.context_builder.build(&retrieval);
                    State::GenerateReply(compose(&context, query))
                }
                State::GenerateReply(prompt) => {
                    let reply = self.generator.generate(&prompt).await?;
                    return Ok(PipelineOutcome { reply, trace });
                }
            };
        }
    }

    /// Returns the process index, wrapping the existing collection on first use.
    async fn load_index(&self) -> Arc<VectorIndex> {
        if let Some(index) = self.index.read().await.as_ref() {
            return index.clone();
        }

        let mut guard = self.index.write().await;
        if let Some(index) = guard.as_ref() {
            return index.clone();
        }

        tracing::info!(collection = self.collection.name(), "Loading index from existing collection");
        let index = Arc::new(VectorIndex::from_collection(
            self.collection.clone(),
            self.embedder.clone(),
            self.top_k,
        ));
        *guard = Some(index.clone());
        index
    }

    async fn setup(&self) -> Result<IndexStats, RagError> {
        let location = self.loader.location();
        tracing::info!(location = %location, "Reading documents");
        let documents = self.loader.load().await?;

        let (index, stats) = VectorIndex::from_documents(
            &documents,
            self.collection.clone(),
            self.embedder.clone(),
            &self.chunker,
            self.top_k,
        )
        .await?;

        if stats.chunks > 0 {
            *self.index.write().await = Some(Arc::new(index));
        }
        Ok(stats)
    }
}
