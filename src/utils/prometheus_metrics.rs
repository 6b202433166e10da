// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_histogram, Counter, Histogram};

pub static MESSAGES_PUBLISHED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "connector_messages_published_total",
        "Total number of messages accepted by the broker."
    )
    .expect("Failed to register MESSAGES_PUBLISHED_TOTAL counter")
});

pub static PUBLISH_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "connector_publish_errors_total",
        "Total number of failed send_message calls (any stage)."
    )
    .expect("Failed to register PUBLISH_ERRORS_TOTAL counter")
});

pub static PUBLISH_CHANNELS_CREATED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "connector_publish_channels_created_total",
        "Total number of publish channels opened."
    )
    .expect("Failed to register PUBLISH_CHANNELS_CREATED_TOTAL counter")
});

pub static PUBLISH_CHANNEL_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "connector_publish_channel_errors_total",
        "Total number of failed publish channel creations."
    )
    .expect("Failed to register PUBLISH_CHANNEL_ERRORS_TOTAL counter")
});

pub static PUBLISH_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "connector_publish_duration_seconds",
        "Histogram of dispatch latencies (from send to broker confirm)."
    )
    .expect("Failed to register PUBLISH_DURATION_SECONDS histogram")
});
