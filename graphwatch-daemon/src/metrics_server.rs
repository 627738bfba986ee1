//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose a Prometheus scrape endpoint at `/metrics`.

use std::net::SocketAddr;

use anyhow::Result;
use graphwatch_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process. After calling this,
/// all `metrics::counter!()` / `metrics::gauge!()` macros record to the
/// Prometheus registry.
///
/// # Errors
///
/// - Listen address does not parse
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address '{}': {}", config.listen, e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_listen_address_is_rejected() {
        let config = MetricsConfig {
            enabled: true,
            listen: "not-an-address".to_owned(),
        };
        assert!(install_metrics_recorder(&config).is_err());
    }
}
