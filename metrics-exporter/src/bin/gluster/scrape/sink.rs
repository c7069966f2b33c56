use prometheus::{core::Collector, proto::MetricFamily, Encoder, Registry, TextEncoder};
use tracing::{error, warn};

/// Receives the collectors of a single scrape and renders their samples.
#[derive(Default)]
pub(crate) struct MetricSink {
    registry: Registry,
}

impl MetricSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a collector, logging a conflicting registration.
    pub(crate) fn register(&self, name: &str, collector: Box<dyn Collector>) {
        if let Err(error) = self.registry.register(collector) {
            warn!(%error, collector = name, "Collector already registered");
        }
    }

    /// Collects the samples of every registered collector.
    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Encodes metric families in the prometheus text exposition format.
pub(crate) fn encode_text(families: &[MetricFamily]) -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(error) = encoder.encode(families, &mut buffer) {
        error!(%error, "Could not encode custom metrics");
    };
    match String::from_utf8(buffer) {
        Ok(text) => text,
        Err(error) => {
            error!(%error, "Prometheus metrics could not be parsed from_utf8'd");
            String::default()
        }
    }
}
