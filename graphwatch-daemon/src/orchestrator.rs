//! Daemon orchestrator.
//!
//! Builds every component from configuration, wires the ingest channel,
//! spawns the background tasks, and owns the shutdown broadcast.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{error, info, warn};

use graphwatch_core::GraphwatchConfig;
use graphwatch_core::store::GraphStore;
use graphwatch_detection::{RuleExecutor, RuleLoader, RuleRegistry};
use graphwatch_graph::{
    AlertStore, EventDedupPolicy, GraphWriter, HttpGraphStore, MemoryGraphStore,
};
use graphwatch_normalizer::Normalizer;

use crate::consumer::{self, Ingestor};
use crate::intake;
use crate::metrics_server;

/// Capacity of the shutdown broadcast channel.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 4;

/// Owns the graphwatch component graph and background task lifecycle.
pub struct Orchestrator {
    config: GraphwatchConfig,
    store: Arc<dyn GraphStore>,
    ingestor: Arc<Ingestor>,
    registry: Arc<RwLock<RuleRegistry>>,
    executor: Arc<RuleExecutor>,
    alerts: Arc<AlertStore>,
    ingest_tx: mpsc::Sender<Vec<u8>>,
    ingest_rx: Option<mpsc::Receiver<Vec<u8>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    pub async fn build(config_path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = GraphwatchConfig::load(&config_path)
            .await
            .with_context(|| {
                format!(
                    "failed to load configuration from {}",
                    config_path.as_ref().display()
                )
            })?;
        Self::build_from_config(config).await
    }

    /// Build every component from an already validated configuration.
    ///
    /// The metrics recorder is installed first so component construction
    /// and rule loading are observable from the start.
    pub async fn build_from_config(config: GraphwatchConfig) -> Result<Self> {
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let store = build_store(&config)?;

        let dedup = EventDedupPolicy::from_config(&config.graph.event_dedup)
            .context("invalid event_dedup policy")?;
        let writer = GraphWriter::new(store.clone()).with_dedup_policy(dedup);
        let ingestor = Arc::new(Ingestor::new(Normalizer::with_defaults(), writer));

        let mut registry = RuleRegistry::new();
        if !config.detection.rules_file.is_empty() {
            let rules = RuleLoader::load_file(&config.detection.rules_file)
                .await
                .context("failed to load detection rules file")?;
            let ids = registry
                .load_bulk(rules)
                .context("failed to register detection rules")?;
            info!(
                count = ids.len(),
                path = %config.detection.rules_file,
                "detection rules loaded"
            );
        }
        let registry = Arc::new(RwLock::new(registry));

        let executor = Arc::new(RuleExecutor::new(store.clone()));
        let alerts = Arc::new(AlertStore::new(store.clone()));

        let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            store,
            ingestor,
            registry,
            executor,
            alerts,
            ingest_tx,
            ingest_rx: Some(ingest_rx),
            shutdown_tx,
        })
    }

    /// Sender half of the ingest queue.
    pub fn ingest_sender(&self) -> mpsc::Sender<Vec<u8>> {
        self.ingest_tx.clone()
    }

    /// Shared rule registry handle.
    pub fn rule_registry(&self) -> Arc<RwLock<RuleRegistry>> {
        self.registry.clone()
    }

    /// The configured graph store.
    pub fn store(&self) -> Arc<dyn GraphStore> {
        self.store.clone()
    }

    /// Run the daemon until ctrl-c.
    pub async fn run(mut self) -> Result<()> {
        let mut handles = Vec::new();

        if self.config.ingest.enabled {
            let rx = self
                .ingest_rx
                .take()
                .context("orchestrator already running")?;
            let ingestor = self.ingestor.clone();
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(consumer::run_consumer(ingestor, rx, shutdown)));

            if !self.config.ingest.intake_bind.is_empty() {
                let bind = self.config.ingest.intake_bind.clone();
                let tx = self.ingest_tx.clone();
                let shutdown = self.shutdown_tx.subscribe();
                handles.push(tokio::spawn(async move {
                    if let Err(e) = intake::run_intake(&bind, tx, shutdown).await {
                        error!(error = %e, "event intake terminated");
                    }
                }));
            }
        } else {
            info!("ingest disabled, running detection-only");
        }

        if self.config.detection.sweep_interval_secs > 0 {
            handles.push(tokio::spawn(run_sweep_loop(
                self.executor.clone(),
                self.registry.clone(),
                self.alerts.clone(),
                self.config.detection.store_alerts,
                Duration::from_secs(self.config.detection.sweep_interval_secs),
                self.shutdown_tx.subscribe(),
            )));
        }

        let rule_count = self.registry.read().await.rule_count();
        info!(
            backend = %self.config.graph.backend,
            rules = rule_count,
            "graphwatch daemon started"
        );

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("shutdown signal received, stopping tasks");

        // All receivers may already be gone if every task exited early.
        let _ = self.shutdown_tx.send(());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked during shutdown");
            }
        }

        info!("graphwatch daemon stopped");
        Ok(())
    }
}

fn build_store(config: &GraphwatchConfig) -> Result<Arc<dyn GraphStore>> {
    match config.graph.backend.as_str() {
        "http" => {
            let store = HttpGraphStore::new(
                &config.graph.uri,
                &config.graph.user,
                &config.graph.password,
                &config.graph.database,
            );
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryGraphStore::new())),
        other => anyhow::bail!("unknown graph backend '{}'", other),
    }
}

/// Periodic detection sweep. Runs every enabled rule and materializes
/// alerts back into the graph when `store_alerts` is set.
async fn run_sweep_loop(
    executor: Arc<RuleExecutor>,
    registry: Arc<RwLock<RuleRegistry>>,
    alerts: Arc<AlertStore>,
    store_alerts: bool,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so the sweep cadence
    // starts one full interval after boot.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = {
                    let registry = registry.read().await;
                    executor.run(&registry, None).await
                };
                match report {
                    Ok(report) => {
                        for failure in &report.failures {
                            warn!(
                                rule_id = %failure.rule_id,
                                reason = %failure.reason,
                                "rule execution failed during sweep"
                            );
                        }
                        if !report.alerts.is_empty() {
                            info!(count = report.alerts.len(), "detection sweep produced alerts");
                        }
                        if store_alerts {
                            for alert in &report.alerts {
                                alerts.store(alert).await;
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "detection sweep failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                return;
            }
        }
    }
}
