//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and the
//! WebSocket adapter. Core services are generic over their ports; AppState
//! pins them to the infra implementations.

use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use uuid::Uuid;

use tickertalk_core::assistant::Analyst;
use tickertalk_core::chat::conversation::Conversation;
use tickertalk_core::knowledge::base::KnowledgeBase;
use tickertalk_core::knowledge::box_embedder::BoxEmbedder;
use tickertalk_core::llm::CompletionSettings;
use tickertalk_core::llm::box_provider::BoxLlmProvider;
use tickertalk_core::pipeline::{Pipeline, PipelineOptions};
use tickertalk_infra::config::{knowledge_dir, load_azure_settings, resolve_data_dir};
use tickertalk_infra::llm::create_provider;
use tickertalk_infra::sqlite::executor::SqliteExecutor;
use tickertalk_infra::vector::embedder::FastEmbedder;
use tickertalk_infra::vector::knowledge::LanceKnowledgeStore;
use tickertalk_infra::vector::lance::LanceVectorStore;
use tickertalk_types::chat::SessionInfo;
use tickertalk_types::config::ServiceConfig;

pub type ConcreteKnowledgeBase = KnowledgeBase<LanceKnowledgeStore>;

pub type ConcreteAnalyst = Analyst<LanceKnowledgeStore, SqliteExecutor>;

pub type ConcretePipeline = Pipeline<ConcreteAnalyst>;

/// Live sessions, keyed by session id. Entries exist only while the owning
/// connection is open.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, SessionInfo>>,
}

impl SessionRegistry {
    pub fn register(&self, info: &SessionInfo) {
        self.sessions.insert(info.id, info.clone());
    }

    /// Refresh the stored snapshot after a completed exchange.
    pub fn update(&self, info: &SessionInfo) {
        if let Some(mut entry) = self.sessions.get_mut(&info.id) {
            *entry = info.clone();
        }
    }

    pub fn unregister(&self, id: &Uuid) {
        self.sessions.remove(id);
    }

    /// Snapshot of all live sessions, oldest first.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub knowledge: Arc<ConcreteKnowledgeBase>,
    pub provider: Arc<BoxLlmProvider>,
    pub settings: CompletionSettings,
    pub pipeline: Arc<ConcretePipeline>,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Wire every service. Fails before serving anything when credentials,
    /// the stock database or the knowledge store are unavailable.
    pub async fn init(config: ServiceConfig) -> anyhow::Result<Self> {
        let azure = load_azure_settings().context("Azure OpenAI configuration is incomplete")?;

        let executor = SqliteExecutor::open(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open stock database {}",
                    config.database.path.display()
                )
            })?;

        let knowledge = Arc::new(open_knowledge(&config).await?);
        let provider = Arc::new(create_provider(&azure, &config.llm));
        let settings = CompletionSettings::from(&config.llm);

        let analyst = Analyst::new(
            Arc::clone(&knowledge),
            Arc::clone(&provider),
            executor,
            settings.clone(),
        )
        .with_max_prompt_tokens(config.pipeline.max_prompt_tokens)
        .with_followup_requests(config.pipeline.followup_requests);

        let pipeline = Arc::new(Pipeline::new(
            Arc::new(analyst),
            PipelineOptions::from(&config.pipeline),
        ));

        Ok(Self {
            config: Arc::new(config),
            knowledge,
            provider,
            settings,
            pipeline,
            sessions: SessionRegistry::default(),
        })
    }

    /// A fresh session: empty history, shared client handle.
    pub fn new_conversation(&self) -> Conversation {
        Conversation::new(Arc::clone(&self.provider), self.settings.clone())
    }
}

/// Open the knowledge base without touching LLM credentials. Used by
/// `train` as well as by [`AppState::init`].
pub async fn open_knowledge(config: &ServiceConfig) -> anyhow::Result<ConcreteKnowledgeBase> {
    knowledge_with_store(config, open_store(config).await?)
}

/// Put the local embedder in front of an already opened store.
pub fn knowledge_with_store(
    config: &ServiceConfig,
    store: LanceKnowledgeStore,
) -> anyhow::Result<ConcreteKnowledgeBase> {
    let embedder = FastEmbedder::new(resolve_data_dir().join("models"))
        .context("Failed to load the embedding model")?;

    Ok(KnowledgeBase::new(BoxEmbedder::new(embedder), store)
        .with_results_per_category(config.knowledge.results_per_category))
}

pub async fn open_store(config: &ServiceConfig) -> anyhow::Result<LanceKnowledgeStore> {
    let path = knowledge_dir(config);
    let lance = LanceVectorStore::new(path.clone())
        .await
        .with_context(|| format!("Failed to open knowledge store {}", path.display()))?;
    Ok(LanceKnowledgeStore::new(lance))
}
