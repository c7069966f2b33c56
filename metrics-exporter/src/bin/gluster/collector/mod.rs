use crate::{
    client::{
        volume::{volume_info, VolumeInfo},
        CommandRunner,
    },
    config::ScrapeSettings,
    error::ExporterError,
};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    CounterVec, GaugeVec, Opts,
};
use strum_macros::AsRefStr;
use tracing::error;

/// Module for the mount health collector.
pub(crate) mod mount;
/// Module for the peer collector.
pub(crate) mod peer;
/// Module for the volume profile collector.
pub(crate) mod profile;
/// Module for the quota collector.
pub(crate) mod quota;
/// Module for the volume collector.
pub(crate) mod volume;

/// Prefix of every exported metric.
pub(crate) const NAMESPACE: &str = "gluster";

/// Identifies a collector in the exporter's own metrics.
#[derive(AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectorKind {
    #[strum(serialize = "collect.global_status")]
    Volume,
    #[strum(serialize = "collect.peer_status")]
    Peer,
    #[strum(serialize = "collect.profile_status")]
    Profile,
    #[strum(serialize = "collect.quota_status")]
    Quota,
    #[strum(serialize = "collect.mount_status")]
    Mount,
}

/// A collector whose samples are gathered from gluster before being collected.
#[async_trait]
pub(crate) trait SubCollector: Collector {
    fn kind(&self) -> CollectorKind;

    /// Gathers the samples collected later on by `Collector::collect`.
    /// Returns the number of failed units of work (a volume, a mount) that did not abort
    /// the collector.
    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError>;
}

/// State shared by the collectors of a single scrape.
pub(crate) struct ScrapeContext<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a ScrapeSettings,
    volume_info: tokio::sync::OnceCell<VolumeInfo>,
}

impl<'a> ScrapeContext<'a> {
    pub(crate) fn new(runner: &'a dyn CommandRunner, settings: &'a ScrapeSettings) -> Self {
        Self {
            runner,
            settings,
            volume_info: tokio::sync::OnceCell::new(),
        }
    }

    pub(crate) fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    pub(crate) fn settings(&self) -> &'a ScrapeSettings {
        self.settings
    }

    /// Volume info, fetched at most once per scrape unless fetching fails.
    pub(crate) async fn volume_info(&self) -> Result<&VolumeInfo, ExporterError> {
        self.volume_info
            .get_or_try_init(|| volume_info(self.runner))
            .await
    }

    /// Names of the volumes passing the volume filter.
    pub(crate) async fn selected_volumes(&self) -> Result<Vec<&str>, ExporterError> {
        let info = self.volume_info().await?;
        Ok(info
            .volumes
            .iter()
            .map(|volume| volume.name())
            .filter(|name| self.settings.volumes.matches(name))
            .collect())
    }
}

fn opts(subsystem: &str, metric_name: &str, metric_desc: &str, labels: &[&str]) -> Opts {
    Opts::new(metric_name, metric_desc)
        .namespace(NAMESPACE)
        .subsystem(subsystem)
        .variable_labels(labels.iter().map(ToString::to_string).collect())
}

/// Initializes a GaugeVec metric with the provided subsystem, metric name, description and
/// labels, and appends its descriptors.
pub(crate) fn init_gauge_vec(
    subsystem: &str,
    metric_name: &str,
    metric_desc: &str,
    labels: &[&str],
    descs: &mut Vec<Desc>,
) -> GaugeVec {
    let gauge_vec = GaugeVec::new(opts(subsystem, metric_name, metric_desc, labels), labels)
        .unwrap_or_else(|_| panic!("Unable to create gauge metric type for {}", metric_name));
    descs.extend(gauge_vec.desc().into_iter().cloned());
    gauge_vec
}

/// Initializes a CounterVec metric, see `init_gauge_vec`.
pub(crate) fn init_counter_vec(
    subsystem: &str,
    metric_name: &str,
    metric_desc: &str,
    labels: &[&str],
    descs: &mut Vec<Desc>,
) -> CounterVec {
    let counter_vec = CounterVec::new(opts(subsystem, metric_name, metric_desc, labels), labels)
        .unwrap_or_else(|_| panic!("Unable to create counter metric type for {}", metric_name));
    descs.extend(counter_vec.desc().into_iter().cloned());
    counter_vec
}

/// Sets the gauge with the given label values.
pub(crate) fn set_gauge(gauge_vec: &GaugeVec, label_values: &[&str], value: f64) {
    match gauge_vec.get_metric_with_label_values(label_values) {
        Ok(gauge) => gauge.set(value),
        Err(error) => error!(%error, ?label_values, "Error while creating gauge with label values"),
    }
}

/// Adds to the counter with the given label values.
pub(crate) fn inc_counter(counter_vec: &CounterVec, label_values: &[&str], value: f64) {
    match counter_vec.get_metric_with_label_values(label_values) {
        Ok(counter) => counter.inc_by(value),
        Err(error) => {
            error!(%error, ?label_values, "Error while creating counter with label values")
        }
    }
}
