//! Ingest queue consumer.
//!
//! Drains raw event payloads from the bounded ingest queue, normalizes
//! them into canonical events, and writes them to the graph store. One
//! bad payload never stops the loop; it is counted, logged, and skipped.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

use graphwatch_core::error::{GraphwatchError, StorageError};
use graphwatch_core::metrics::{INGEST_EVENTS_TOTAL, INGEST_MALFORMED_TOTAL, LABEL_FORMAT};
use graphwatch_graph::GraphWriter;
use graphwatch_normalizer::detector::detect_format;
use graphwatch_normalizer::mapper::Normalizer;

/// Wire envelope accepted by the intake socket.
///
/// `source_format` is an optional sender-declared format hint. When it is
/// absent the format is auto-detected from the event body. A payload that
/// is not an envelope at all is treated as a bare raw event.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: serde_json::Value,
    #[serde(default)]
    pub source_format: Option<String>,
}

/// Normalize-and-write front door shared by the consumer loop and tests.
pub struct Ingestor {
    normalizer: Normalizer,
    writer: GraphWriter,
}

impl Ingestor {
    pub fn new(normalizer: Normalizer, writer: GraphWriter) -> Self {
        Self { normalizer, writer }
    }

    /// Process one raw payload end to end. Returns the graph event id.
    pub async fn ingest(
        &self,
        raw: &serde_json::Value,
        declared_format: Option<&str>,
    ) -> Result<String, GraphwatchError> {
        let format = match declared_format {
            Some(f) => f.to_owned(),
            None => detect_format(raw).to_owned(),
        };
        metrics::counter!(INGEST_EVENTS_TOTAL, LABEL_FORMAT => format.clone()).increment(1);

        let event = self.normalizer.normalize(raw, declared_format)?;
        let event_id = self.writer.write(&event).await?;
        debug!(event_id = %event_id, format = %format, "event ingested");
        Ok(event_id)
    }

    /// Parse a wire payload (envelope or bare event) and ingest it.
    pub async fn ingest_bytes(&self, bytes: &[u8]) -> Result<String, GraphwatchError> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
            metrics::counter!(INGEST_MALFORMED_TOTAL).increment(1);
            GraphwatchError::Normalize(graphwatch_core::error::NormalizeError::MappingFailed {
                format: "json".to_owned(),
                reason: e.to_string(),
            })
        })?;

        // Envelope payloads carry an "event" field; anything else is a
        // bare raw event with format auto-detection.
        if value.get("event").is_some() {
            match serde_json::from_value::<Envelope>(value) {
                Ok(envelope) => {
                    self.ingest(&envelope.event, envelope.source_format.as_deref())
                        .await
                }
                Err(e) => {
                    metrics::counter!(INGEST_MALFORMED_TOTAL).increment(1);
                    Err(GraphwatchError::Normalize(
                        graphwatch_core::error::NormalizeError::MappingFailed {
                            format: "envelope".to_owned(),
                            reason: e.to_string(),
                        },
                    ))
                }
            }
        } else {
            self.ingest(&value, None).await
        }
    }
}

/// Consumer loop. Runs until the queue closes or shutdown is signalled.
///
/// Malformed payloads and per-event write failures are logged and skipped.
/// A store outage is surfaced at error level but does not abort the loop;
/// the next payload retries against the store.
pub async fn run_consumer(
    ingestor: Arc<Ingestor>,
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else {
                    debug!("ingest queue closed, consumer exiting");
                    break;
                };
                match ingestor.ingest_bytes(&payload).await {
                    Ok(_) => {}
                    Err(GraphwatchError::Storage(StorageError::Unavailable(reason))) => {
                        error!(reason = %reason, "graph store unavailable, event dropped");
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to ingest event, skipping");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("shutdown signal received, consumer exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use graphwatch_graph::{GraphWriter, MemoryGraphStore};

    fn ingestor(store: Arc<MemoryGraphStore>) -> Ingestor {
        Ingestor::new(Normalizer::with_defaults(), GraphWriter::new(store))
    }

    #[tokio::test]
    async fn bare_event_is_ingested() {
        let store = Arc::new(MemoryGraphStore::new());
        let ing = ingestor(store.clone());

        let payload = serde_json::json!({
            "facility": 4, "severity": 3, "timestamp": "2026-08-30T10:00:00Z",
            "hostname": "fw-1", "message": "login failed"
        });
        let id = ing
            .ingest_bytes(payload.to_string().as_bytes())
            .await
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.count_label("Event"), 1);
    }

    #[tokio::test]
    async fn envelope_declared_format_wins() {
        let store = Arc::new(MemoryGraphStore::new());
        let ing = ingestor(store.clone());

        // Body looks like CEF, but the envelope pins it to syslog.
        let payload = serde_json::json!({
            "event": {
                "deviceVendor": "Acme",
                "severity": 7,
                "message": "probe"
            },
            "source_format": "syslog"
        });
        ing.ingest_bytes(payload.to_string().as_bytes())
            .await
            .unwrap();
        assert_eq!(store.count_label("Event"), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let store = Arc::new(MemoryGraphStore::new());
        let ing = ingestor(store.clone());

        let err = ing.ingest_bytes(b"{not json").await.unwrap_err();
        assert!(matches!(err, GraphwatchError::Normalize(_)));
        assert_eq!(store.node_count(), 0);
    }

    #[tokio::test]
    async fn consumer_drains_queue_and_skips_bad_payloads() {
        let store = Arc::new(MemoryGraphStore::new());
        let ing = Arc::new(ingestor(store.clone()));

        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, _) = broadcast::channel(1);

        tx.send(b"garbage".to_vec()).await.unwrap();
        tx.send(
            serde_json::json!({"hostname": "h1", "severity": 2, "facility": 1})
                .to_string()
                .into_bytes(),
        )
        .await
        .unwrap();
        tx.send(
            serde_json::json!({"hostname": "h2", "severity": 5, "facility": 1})
                .to_string()
                .into_bytes(),
        )
        .await
        .unwrap();
        drop(tx);

        run_consumer(ing, rx, shutdown_tx.subscribe()).await;
        assert_eq!(store.count_label("Event"), 2);
    }

    #[tokio::test]
    async fn store_outage_is_surfaced_and_loop_continues() {
        use async_trait::async_trait;
        use graphwatch_core::store::{GraphStore, Params};
        use graphwatch_core::types::Row;

        struct OfflineStore;

        #[async_trait]
        impl GraphStore for OfflineStore {
            async fn execute_query(
                &self,
                _query: &str,
                _params: Params,
            ) -> Result<Vec<Row>, StorageError> {
                Err(StorageError::Unavailable("connection refused".to_owned()))
            }

            async fn execute_write(
                &self,
                _query: &str,
                _params: Params,
            ) -> Result<(), StorageError> {
                Err(StorageError::Unavailable("connection refused".to_owned()))
            }
        }

        let ing = Ingestor::new(
            Normalizer::with_defaults(),
            GraphWriter::new(Arc::new(OfflineStore)),
        );
        let payload = serde_json::json!({"hostname": "h1", "severity": 2});
        let err = ing
            .ingest_bytes(payload.to_string().as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphwatchError::Storage(StorageError::Unavailable(_))
        ));

        // The consumer loop drops the event and keeps draining.
        let (tx, rx) = mpsc::channel(2);
        let (shutdown_tx, _) = broadcast::channel(1);
        tx.send(payload.to_string().into_bytes()).await.unwrap();
        drop(tx);
        run_consumer(Arc::new(ing), rx, shutdown_tx.subscribe()).await;
    }

    #[tokio::test]
    async fn consumer_stops_on_shutdown() {
        let store = Arc::new(MemoryGraphStore::new());
        let ing = Arc::new(ingestor(store));

        let (_tx, rx) = mpsc::channel::<Vec<u8>>(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        let handle = tokio::spawn(run_consumer(ing, rx, shutdown_tx.subscribe()));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
