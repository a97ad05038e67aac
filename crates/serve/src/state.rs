//! Shared application state
//!
//! The runtime context assembled once at startup and cloned into every
//! handler: settings, the prompt catalog, the task manager with its durable
//! store, and the engine cache. Engines are created lazily per
//! `provider:model` pair and the whole cache is dropped on any configuration
//! mutation so later requests see the new values.

use crate::store::SqliteStore;
use crate::tasks::TaskManager;
use crate::ServerConfig;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use textproof_core::{
    create_provider, CorrectionEngine, EngineOptions, PromptManager, ProviderKind, Result,
    Settings, TextSplitter,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Process-wide settings, mutable through the config endpoint
    pub settings: Arc<RwLock<Settings>>,
    /// Prompt catalog
    pub prompts: Arc<PromptManager>,
    /// Task manager over the durable store
    pub tasks: Arc<TaskManager>,
    /// Engine cache keyed by `provider:model`
    engines: Arc<Mutex<HashMap<String, Arc<CorrectionEngine>>>>,
    /// Dotfile path configuration changes persist to
    pub env_file: Arc<PathBuf>,
}

impl AppState {
    /// Assemble the state: load settings, open the store (running the legacy
    /// migration), build the prompt catalog.
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let settings = Settings::load(&config.env_file)?;
        let prompts = Arc::new(PromptManager::from_settings(&settings));
        let store = Arc::new(SqliteStore::open(&config.cache_dir).await?);
        info!(
            "state assembled: cache dir {}, default provider {}",
            config.cache_dir.display(),
            settings.default_provider
        );

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            prompts,
            tasks: Arc::new(TaskManager::new(store)),
            engines: Arc::new(Mutex::new(HashMap::new())),
            env_file: Arc::new(config.env_file.clone()),
        })
    }

    /// Build a state over pre-assembled parts (tests)
    pub fn from_parts(
        settings: Settings,
        prompts: Arc<PromptManager>,
        tasks: Arc<TaskManager>,
        env_file: PathBuf,
    ) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            prompts,
            tasks,
            engines: Arc::new(Mutex::new(HashMap::new())),
            env_file: Arc::new(env_file),
        }
    }

    /// Resolve request-level provider/model against the configured defaults
    pub fn resolve_provider(
        &self,
        provider: Option<&str>,
        model_name: Option<&str>,
    ) -> Result<(ProviderKind, String)> {
        let settings = self.settings.read();
        let provider_name = provider.unwrap_or(&settings.default_provider).to_string();
        let model = model_name
            .unwrap_or(&settings.default_model_name)
            .to_string();
        Ok((ProviderKind::from_str(&provider_name)?, model))
    }

    /// Cached engine for a provider/model pair, creating it lazily
    pub fn engine_for(
        &self,
        provider: Option<&str>,
        model_name: Option<&str>,
    ) -> Result<Arc<CorrectionEngine>> {
        let (kind, model) = self.resolve_provider(provider, model_name)?;
        let key = format!("{}:{}", kind, model);

        if let Some(engine) = self.engines.lock().get(&key) {
            return Ok(engine.clone());
        }

        let engine = Arc::new(self.build_engine(kind, &model, None, None)?);
        self.engines.lock().insert(key, engine.clone());
        Ok(engine)
    }

    /// One-off engine with explicit chunking overrides, never cached
    pub fn engine_with_overrides(
        &self,
        provider: Option<&str>,
        model_name: Option<&str>,
        chunk_size: Option<usize>,
        chunk_overlap: Option<usize>,
    ) -> Result<Arc<CorrectionEngine>> {
        let (kind, model) = self.resolve_provider(provider, model_name)?;
        Ok(Arc::new(self.build_engine(
            kind,
            &model,
            chunk_size,
            chunk_overlap,
        )?))
    }

    /// Insert a pre-built engine into the cache (tests)
    pub fn seed_engine(
        &self,
        provider: &str,
        model_name: &str,
        engine: Arc<CorrectionEngine>,
    ) {
        let key = format!("{}:{}", provider, model_name);
        self.engines.lock().insert(key, engine);
    }

    /// Drop every cached engine; the next request rebuilds from settings
    pub fn clear_engines(&self) {
        self.engines.lock().clear();
    }

    fn build_engine(
        &self,
        kind: ProviderKind,
        model: &str,
        chunk_size: Option<usize>,
        chunk_overlap: Option<usize>,
    ) -> Result<CorrectionEngine> {
        let settings = self.settings.read();
        let mut options = EngineOptions::from_settings(&settings);
        if let Some(size) = chunk_size {
            options.chunk_size = size;
        }
        if let Some(overlap) = chunk_overlap {
            options.chunk_overlap = overlap;
        }
        // Surface an invalid override before the provider is even built
        TextSplitter::new(options.chunk_size, options.chunk_overlap)?;

        let provider = create_provider(kind, model, &settings)?;
        CorrectionEngine::new(provider, kind, self.prompts.clone(), options)
    }
}
