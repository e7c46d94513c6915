//! OTLP metrics export for the cleanup job.
//!
//! When no endpoint is configured the job records against the global meter,
//! which is a no-op until a provider is installed.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;

pub const METER_NAME: &str = "bucketsweep";

pub struct Telemetry {
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(METER_NAME)
    }

    /// Flush pending data points and stop the periodic exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.meter_provider.force_flush() {
            tracing::warn!(error = %e, "Failed to flush meter provider");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "Failed to shutdown meter provider");
        }
    }
}

/// Meter to record job metrics against: the exporting provider if one was
/// set up, otherwise the global one.
pub fn job_meter(telemetry: Option<&Telemetry>) -> Meter {
    match telemetry {
        Some(telemetry) => telemetry.meter(),
        None => opentelemetry::global::meter(METER_NAME),
    }
}

pub fn init_telemetry(endpoint: Option<&str>, service_name: &str) -> Result<Option<Telemetry>> {
    let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    let resource = Resource::builder()
        .with_attributes(vec![
            KeyValue::new("service.name", service_name.to_string()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let metric_exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.to_string())
        .build()
        .context("Failed to build metric exporter")?;
    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_periodic_exporter(metric_exporter)
        .build();

    tracing::info!(endpoint = %endpoint, "OTLP metrics export enabled");

    Ok(Some(Telemetry { meter_provider }))
}
