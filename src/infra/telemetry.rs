use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "brezza_events_delivered_total",
            Unit::Count,
            "Total number of tracking events delivered to the endpoint."
        );
        describe_counter!(
            "brezza_events_retried_total",
            Unit::Count,
            "Total number of delivery attempts that failed and were retried."
        );
        describe_counter!(
            "brezza_events_dropped_total",
            Unit::Count,
            "Total number of events dropped to the fallback store after exhausting retries."
        );
        describe_counter!(
            "brezza_events_replayed_total",
            Unit::Count,
            "Total number of fallback-store events delivered during a replay pass."
        );
        describe_gauge!(
            "brezza_event_queue_len",
            Unit::Count,
            "Current number of tracking events buffered for the next flush."
        );
        describe_gauge!(
            "brezza_search_index_documents",
            Unit::Count,
            "Number of documents in the most recently loaded search index."
        );
    });
}
