//! TCP line intake.
//!
//! Accepts connections on the configured bind address and forwards each
//! newline-delimited JSON line into the bounded ingest queue. Backpressure
//! comes from the queue: when it is full the connection task waits, which
//! in turn slows the sender.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Accept loop. Runs until shutdown is signalled.
pub async fn run_intake(
    bind: &str,
    tx: mpsc::Sender<Vec<u8>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind intake listener on {}", bind))?;
    info!(bind = %bind, "event intake listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(peer = %peer, "intake connection accepted");
                        let tx = tx.clone();
                        let shutdown = shutdown_rx.resubscribe();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, tx, shutdown).await {
                                warn!(peer = %peer, error = %e, "intake connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "intake accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("shutdown signal received, intake exiting");
                return Ok(());
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    tx: mpsc::Sender<Vec<u8>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("intake read failed")? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(line.into_bytes()).await.is_err() {
                    // Queue closed, the daemon is shutting down.
                    return Ok(());
                }
            }
            _ = shutdown_rx.recv() => {
                return Ok(());
            }
        }
    }
}
