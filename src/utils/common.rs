// src/utils/common.rs

use axum::{http::StatusCode, routing::get, serve, Router};
use lapin::{Connection, ConnectionProperties, Result as LapinResult};
use prometheus::{gather, Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Opens a RabbitMQ connection on the tokio executor. A single attempt; callers decide
/// whether to try again.
pub async fn connect_rabbitmq(addr: &str) -> LapinResult<Connection> {
    let options = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);

    match Connection::connect(addr, options).await {
        Ok(conn) => {
            info!("Successfully connected to RabbitMQ at {}", addr);
            Ok(conn)
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to RabbitMQ at {}", addr);
            Err(e)
        }
    }
}

// Axum handler for /metrics
async fn metrics_handler() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&gather(), &mut buffer) {
        error!("Could not encode prometheus metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not encode prometheus metrics: {}", e),
        );
    }
    match String::from_utf8(buffer) {
        Ok(s) => (StatusCode::OK, s),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Prometheus metrics UTF-8 error: {}", e),
        ),
    }
}

/// Serves `/metrics` in the background when a port is given. The returned handle is the
/// server task; it runs until the runtime shuts down.
pub fn setup_prometheus_metrics(metrics_port: Option<u16>) -> Option<JoinHandle<()>> {
    let Some(port) = metrics_port else {
        info!("Prometheus metrics endpoint not configured (no port specified).");
        return None;
    };

    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener_addr = format!("0.0.0.0:{}", port);
    info!(
        "Metrics endpoint will be available at http://{}/metrics",
        listener_addr
    );

    Some(tokio::spawn(async move {
        match TcpListener::bind(&listener_addr).await {
            Ok(listener) => {
                if let Err(e) = serve(listener, app).await {
                    error!("Metrics server error: {}", e);
                }
            }
            Err(e) => error!("Failed to bind metrics server to {}: {}", listener_addr, e),
        }
    }))
}
