//! Tracing and OpenTelemetry setup.
//!
//! [`init_tracing`] wires the global `tracing` subscriber once at startup
//! and returns a guard that flushes span batches on drop.  Behaviour is
//! driven entirely by the environment:
//!
//! * `RUST_LOG` — log filter, defaults to `info`.
//! * `CLOUDGRID_LOG_FORMAT=json` — newline-delimited JSON instead of the
//!   compact console format.
//! * `OTEL_EXPORTER_OTLP_ENDPOINT` — when present, spans are additionally
//!   exported over OTLP/HTTP to that collector.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Flushes and shuts down the OTLP span pipeline when dropped.  Hold the
/// returned guard in `main` for the whole process lifetime.
pub struct TelemetryGuard(Option<SdkTracerProvider>);

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[cloudgrid] span pipeline shutdown failed: {e}");
            }
        }
    }
}

/// Install the global subscriber: env filter, console or JSON formatter,
/// and (if an OTLP endpoint is configured) an OpenTelemetry span layer.
pub fn init_tracing(service_name: &str) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer: Box<dyn Layer<_> + Send + Sync> =
        if std::env::var("CLOUDGRID_LOG_FORMAT").as_deref() == Ok("json") {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().compact().boxed()
        };

    let base = Registry::default().with(filter).with(fmt_layer);

    match otlp_provider(service_name) {
        Some(provider) => {
            let tracer = provider.tracer("cloudgrid");
            base.with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
            TelemetryGuard(Some(provider))
        }
        None => {
            base.init();
            TelemetryGuard(None)
        }
    }
}

/// Build the OTLP tracer provider, or `None` when no endpoint is configured
/// or the exporter fails to initialise (logging still works without it).
fn otlp_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("[cloudgrid] OTLP exporter init failed: {e}");
            return None;
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        // Simple exporter: spans flush synchronously on shutdown, no
        // background batch task to race the runtime teardown.
        .with_simple_exporter(exporter)
        .build();
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_endpoint_means_no_provider() {
        // SAFETY: single-threaded test; no other thread reads this env-var.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(otlp_provider("test-service").is_none());
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        drop(TelemetryGuard(None));
    }
}
