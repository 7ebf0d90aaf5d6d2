//! Service facade
//!
//! `RuleService` is what front ends talk to. It owns the shared store and
//! exposes the four lifecycle entry points (ingest, review, check and
//! persistence) without leaking how they are wired together.

use ruleforge_core::{Catalog, CatalogError, CheckResult, Config, DynamicRule, ReviewDecision};
use ruleforge_store::{JsonFileBackend, RuleStore, StoreBackend, StoreError};
use ruleforge_synth::PatternSynthesizer;
use std::sync::Arc;

use crate::ingest::{IngestOutcome, Ingestor};
use crate::matcher::MatchEngine;

/// Errors raised while assembling a service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Entry point for ingestion, review, checking and persistence
pub struct RuleService {
    store: Arc<RuleStore>,
    engine: MatchEngine,
    ingestor: Ingestor,
    backend: Option<Box<dyn StoreBackend>>,
}

impl RuleService {
    /// Wrap an existing store
    pub fn new(store: Arc<RuleStore>, synthesizer: PatternSynthesizer) -> Self {
        Self {
            engine: MatchEngine::new(Arc::clone(&store)),
            ingestor: Ingestor::new(Arc::clone(&store), synthesizer),
            store,
            backend: None,
        }
    }

    /// Set the backend used by `persist` and `restore`
    pub fn with_backend(mut self, backend: Box<dyn StoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build a service from configuration
    ///
    /// Restores the persisted state when there is one, then loads the
    /// configured catalogue (or the built-in one) over it so edits to the
    /// catalogue take effect on the next start.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let catalog = match &config.catalog.path {
            Some(path) => Catalog::from_file(&config.resolve(path))?,
            None => Catalog::builtin()?,
        };

        let service = Self::new(
            Arc::new(RuleStore::new()),
            PatternSynthesizer::from_config(&config.synthesis),
        )
        .with_backend(Box::new(JsonFileBackend::new(config.store_path())));

        service.restore()?;

        let (rules, entries) = catalog.into_parts();
        service.store.load_static(rules, entries)?;

        Ok(service)
    }

    /// The shared store
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Ingest one release body
    pub fn ingest(&self, raw: &str, version: &str) -> IngestOutcome {
        self.ingestor.ingest(raw, version)
    }

    /// Ingest a multi-release changelog document
    pub fn ingest_document(&self, text: &str) -> IngestOutcome {
        self.ingestor.ingest_document(text)
    }

    /// Record an operator decision on a Draft rule
    pub fn review(&self, rule_id: &str, decision: ReviewDecision) -> Result<DynamicRule, StoreError> {
        self.store.set_review_status(rule_id, decision.into())
    }

    /// Check source text against the active rules
    pub fn check(&self, text: &str) -> CheckResult {
        self.engine.check(text)
    }

    /// Save the store; `false` when no backend is configured
    pub fn persist(&self) -> Result<bool, StoreError> {
        match &self.backend {
            Some(backend) => self.store.persist(backend.as_ref()).map(|()| true),
            None => Ok(false),
        }
    }

    /// Reload the store; `false` when there is no backend or nothing saved
    pub fn restore(&self) -> Result<bool, StoreError> {
        match &self.backend {
            Some(backend) => self.store.restore(backend.as_ref()),
            None => Ok(false),
        }
    }
}
