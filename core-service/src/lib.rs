//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! clock) and the provider adapters selected by [`AppConfig`] into the sync
//! core. The `desktop-shims` feature (on by default) adds
//! [`bootstrap_desktop`], which uses the adapters from `bridge-desktop`.

pub mod error;
pub mod scheduler;

pub use error::{CoreError, Result};
pub use scheduler::CycleScheduler;

use std::sync::Arc;

use bridge_traits::{
    catalog::CatalogSource,
    http::HttpClient,
    notify::Notifier,
    object_store::ObjectStore,
    record::RecordStore,
    storage::FileSystemAccess,
    time::{Clock, SystemClock},
};
use core_runtime::config::{AppConfig, RecordStoreSettings};
use core_runtime::logging::redact_if_sensitive;
use core_sync::{
    CycleOutcome, SqliteRecordStore, StagingArea, SyncCoordinator, SyncWorker, TaskQueue,
};
use provider_cloudflare::{D1Config, D1RecordStore, R2Config, R2ObjectStore};
use provider_discord::DiscordWebhookNotifier;
use provider_envato::EnvatoConnector;
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(http_client: Arc<dyn HttpClient>, filesystem: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            http_client,
            filesystem,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to the binary and to embedding hosts.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<AppConfig>,
    coordinator: Arc<SyncCoordinator>,
}

impl CoreService {
    /// Build every adapter named by `config` and assemble the sync pipeline.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(config: AppConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let staging = Arc::new(StagingArea::new(
            Arc::clone(&deps.filesystem),
            config.staging_dir.clone(),
        ));
        staging.prepare().await?;

        let catalog: Arc<dyn CatalogSource> = Arc::new(
            EnvatoConnector::new(Arc::clone(&deps.http_client), config.envato.token.expose())
                .with_api_base(config.envato.api_base.as_str()),
        );

        let object_store: Arc<dyn ObjectStore> = Arc::new(
            R2ObjectStore::new(
                Arc::clone(&deps.http_client),
                R2Config {
                    endpoint: config.object_store.endpoint.clone(),
                    bucket: config.object_store.bucket.clone(),
                    access_key: config.object_store.access_key.expose().to_string(),
                    secret_key: config.object_store.secret_key.expose().to_string(),
                    region: config.object_store.region.clone(),
                },
            )
            .map_err(initialization_failed)?
            .with_clock(Arc::clone(&deps.clock)),
        );

        let records = build_record_store(&config.record_store, &deps).await?;

        let mut worker = SyncWorker::new(
            Arc::clone(&catalog),
            Arc::clone(&deps.http_client),
            object_store,
            Arc::clone(&records),
            staging,
        )
        .with_clock(Arc::clone(&deps.clock));

        match &config.webhook_url {
            Some(url) => {
                let notifier: Arc<dyn Notifier> = Arc::new(
                    DiscordWebhookNotifier::new(Arc::clone(&deps.http_client), url.expose())
                        .map_err(initialization_failed)?,
                );
                worker = worker.with_notifier(notifier);
                info!(
                    webhook = %redact_if_sensitive("webhook_url", url.expose()),
                    "Notifications enabled"
                );
            }
            None => info!("No webhook configured; notifications disabled"),
        }

        let queue = Arc::new(TaskQueue::new(config.concurrency)?);
        let coordinator = Arc::new(SyncCoordinator::new(
            catalog,
            records,
            Arc::new(worker),
            queue,
        ));

        info!(
            concurrency = config.concurrency,
            staging_dir = %config.staging_dir.display(),
            "Core service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            coordinator,
        })
    }

    /// Run one sync cycle now.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        Ok(self.coordinator.run_cycle().await?)
    }

    /// Wait for the running cycle, if any, and every queued task to finish.
    pub async fn wait_idle(&self) -> Result<()> {
        Ok(self.coordinator.wait_idle().await?)
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn build_record_store(
    settings: &RecordStoreSettings,
    deps: &CoreDependencies,
) -> Result<Arc<dyn RecordStore>> {
    match settings {
        RecordStoreSettings::D1(d1) => {
            let store = D1RecordStore::new(
                Arc::clone(&deps.http_client),
                D1Config {
                    api_base: d1.api_base.clone(),
                    api_token: d1.api_token.expose().to_string(),
                    account_id: d1.account_id.clone(),
                    database_id: d1.database_id.clone(),
                    table: d1.table.clone(),
                },
            )
            .map_err(initialization_failed)?;
            store.initialize().await.map_err(initialization_failed)?;
            info!(table = %store.table(), "Using D1 record store");
            Ok(Arc::new(store))
        }
        RecordStoreSettings::Sqlite { path } => {
            let store = SqliteRecordStore::connect(path).await?;
            store.initialize().await?;
            info!(path = %path.display(), "Using SQLite record store");
            Ok(Arc::new(store))
        }
    }
}

fn initialization_failed(err: impl std::fmt::Display) -> CoreError {
    CoreError::InitializationFailed(err.to_string())
}

/// Build the service with the native reqwest and tokio::fs adapters.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(config: AppConfig) -> Result<CoreService> {
    let http_client =
        bridge_desktop::ReqwestHttpClient::new().map_err(initialization_failed)?;
    let filesystem = bridge_desktop::TokioFileSystem::new();
    let deps = CoreDependencies::new(Arc::new(http_client), Arc::new(filesystem));
    CoreService::new(config, deps).await
}
