//! Service wiring (in-memory for dev/test, Postgres-backed counters for production).

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use factoryerp_documents::LineItemCalculator;
use factoryerp_events::InMemoryEventBus;
use factoryerp_lifecycle::{AuditRecord, DocumentLifecycleService};
use factoryerp_numbering::{CounterStore, DocumentNumberGenerator, InMemoryCounterStore};

use crate::config::EngineConfig;
use crate::counter::PostgresCounterStore;
use crate::repository::InMemoryDocumentRepository;
use crate::stock::InMemoryStockReservations;

pub type AuditBus = InMemoryEventBus<AuditRecord>;

pub type EngineService = DocumentLifecycleService<
    Arc<InMemoryDocumentRepository>,
    Arc<dyn CounterStore>,
    Arc<InMemoryStockReservations>,
    Arc<AuditBus>,
>;

/// Handles to the wired service and the collaborators it shares.
pub struct Engine {
    pub service: EngineService,
    pub repository: Arc<InMemoryDocumentRepository>,
    pub stock: Arc<InMemoryStockReservations>,
    pub audit: Arc<AuditBus>,
}

/// Wire the service around `counter`, using in-memory collaborators for everything else.
pub fn build_engine(config: &EngineConfig, counter: Arc<dyn CounterStore>, stock: InMemoryStockReservations) -> Engine {
    let repository = Arc::new(InMemoryDocumentRepository::new());
    let stock = Arc::new(stock);
    let audit: Arc<AuditBus> = Arc::new(InMemoryEventBus::new());

    let service = DocumentLifecycleService::new(
        repository.clone(),
        DocumentNumberGenerator::with_scheme(counter, config.numbering.clone()),
        LineItemCalculator::new(config.rounding),
        stock.clone(),
        audit.clone(),
    );

    Engine {
        service,
        repository,
        stock,
        audit,
    }
}

pub fn build_in_memory_engine(config: &EngineConfig) -> Engine {
    build_engine(config, Arc::new(InMemoryCounterStore::new()), InMemoryStockReservations::new())
}

/// Connect the Postgres counter store when configured, otherwise stay in memory.
pub async fn build_engine_from_config(config: &EngineConfig) -> anyhow::Result<Engine> {
    if !config.use_persistent_stores {
        info!("using in-memory numbering counters");
        return Ok(build_in_memory_engine(config));
    }

    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let pool = PgPool::connect(url)
        .await
        .context("failed to connect to Postgres")?;

    let counter = PostgresCounterStore::new(pool);
    counter.ensure_schema().await?;
    info!("using Postgres numbering counters");

    Ok(build_engine(config, Arc::new(counter), InMemoryStockReservations::new()))
}
