use anyhow::{Context, Result};
use cep_weather_core::TelemetryConfig;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Keeps the tracer provider alive; flushes pending spans on [`Telemetry::shutdown`].
#[must_use]
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        let Some(provider) = self.provider else { return };
        if let Err(e) = provider.shutdown() {
            tracing::error!(error = %e, "failed to flush traces");
        }
    }
}

/// Installs the global `tracing` subscriber, logging to stderr. Spans are
/// exported over OTLP/gRPC only when an endpoint is configured.
pub fn init(cfg: &TelemetryConfig, default_service: &str) -> Result<Telemetry> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let provider = match &cfg.otlp_endpoint {
        Some(endpoint) => {
            let service_name = cfg.service_name.as_deref().unwrap_or(default_service);
            Some(build_provider(endpoint, service_name)?)
        }
        None => None,
    };

    let otel = provider.as_ref().map(|p| {
        let tracer = p.tracer(cfg.service_name.clone().unwrap_or_else(|| default_service.to_owned()));
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(endpoint) = &cfg.otlp_endpoint {
        tracing::info!(%endpoint, "exporting traces over OTLP");
    }

    Ok(Telemetry { provider })
}

fn build_provider(endpoint: &str, service_name: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("Failed to build OTLP exporter for {endpoint}"))?;

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", service_name.to_owned()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this binary that installs the global subscriber.
    #[test]
    fn init_without_endpoint_logs_locally_and_shuts_down_quietly() {
        let telemetry = init(&TelemetryConfig::default(), "lookup").expect("first init succeeds");
        assert!(telemetry.provider.is_none());
        telemetry.shutdown();

        let err = init(&TelemetryConfig::default(), "lookup").err().expect("second init fails");
        assert!(err.to_string().contains("Failed to install tracing subscriber"));
    }
}
