// src/bin/mq_publish.rs

//! # mq-publish
//!
//! Publishes a single message through the connector layer. Useful for smoke-testing
//! a broker setup:
//!
//! ```text
//! mq-publish -q task_queue -m 'hello' -o '{"persistent": true}'
//! ```
//!
//! The broker URI comes from `--amqp-addr`, or from a YAML file given with `--config`.
//! Logging is controlled through `RUST_LOG` (default `info`). With `--metrics-port` the
//! process keeps serving `/metrics` after publishing, until Ctrl-C.

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use mq_connector::config::connector::{load_connector_config, ConnectorConfig};
use mq_connector::config::publisher::Args;
use mq_connector::utils::common::setup_prometheus_metrics;
use mq_connector::{get_connector, PublishRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    let metrics_server = setup_prometheus_metrics(args.metrics_port);

    let config = match &args.config {
        Some(path) => load_connector_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let config = ConnectorConfig::new(args.amqp_addr.clone());
            config.validate()?;
            config
        }
    };

    let mut request = PublishRequest::new(args.queue.clone(), args.message.clone().into_bytes());
    if let Some(exchange) = &args.exchange {
        request = request.with_exchange(exchange.clone());
    }
    if let Some(raw) = &args.options {
        match serde_json::from_str::<Value>(raw).context("--options is not valid JSON")? {
            Value::Object(options) => request = request.with_options(options),
            _ => bail!("--options must be a JSON object"),
        }
    }

    let connector = get_connector(config.connector_type, &config);
    let outcome = connector.send_message(request).await;

    if let Err(e) = connector.close().await {
        error!(error = %e, "Failed to close connector cleanly");
    }

    let result = outcome?;
    info!(
        queue = %args.queue,
        exchange = args.exchange.as_deref().unwrap_or(""),
        ?result,
        "Message published"
    );

    if let Some(server) = metrics_server {
        info!("Serving metrics until Ctrl-C");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
        server.abort();
    }
    Ok(())
}
