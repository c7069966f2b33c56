use super::{
    init_counter_vec, init_gauge_vec, inc_counter, set_gauge, CollectorKind, ScrapeContext,
    SubCollector,
};
use crate::{
    client::profile::{volume_profile, VolumeProfile},
    error::ExporterError,
};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    CounterVec, GaugeVec,
};
use tracing::{trace, warn};

const BRICK_LABELS: &[&str] = &["volume", "brick"];
const FOP_LABELS: &[&str] = &["volume", "brick", "fop_name"];

/// Collects cumulative volume profile statistics per brick.
#[derive(Clone, Debug)]
pub(crate) struct ProfileCollector {
    brick_duration: CounterVec,
    brick_data_read: CounterVec,
    brick_data_written: CounterVec,
    brick_fop_hits: CounterVec,
    brick_fop_latency_avg: GaugeVec,
    brick_fop_latency_min: GaugeVec,
    brick_fop_latency_max: GaugeVec,
    descs: Vec<Desc>,
}

impl Default for ProfileCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCollector {
    /// Initialize all the metrics to be defined for the profile collector.
    pub(crate) fn new() -> Self {
        let mut descs = Vec::new();
        let brick_duration = init_counter_vec(
            "profile",
            "brick_duration",
            "Time running volume brick profiling.",
            BRICK_LABELS,
            &mut descs,
        );
        let brick_data_read = init_counter_vec(
            "profile",
            "brick_data_read",
            "Total amount of data read by brick.",
            BRICK_LABELS,
            &mut descs,
        );
        let brick_data_written = init_counter_vec(
            "profile",
            "brick_data_written",
            "Total amount of data written by brick.",
            BRICK_LABELS,
            &mut descs,
        );
        let brick_fop_hits = init_counter_vec(
            "profile",
            "brick_fop_hits",
            "Total amount of file operation hits.",
            FOP_LABELS,
            &mut descs,
        );
        let brick_fop_latency_avg = init_gauge_vec(
            "profile",
            "brick_fop_latency_avg",
            "Average file operations latency over total uptime.",
            FOP_LABELS,
            &mut descs,
        );
        let brick_fop_latency_min = init_gauge_vec(
            "profile",
            "brick_fop_latency_min",
            "Minimum file operations latency over total uptime.",
            FOP_LABELS,
            &mut descs,
        );
        let brick_fop_latency_max = init_gauge_vec(
            "profile",
            "brick_fop_latency_max",
            "Maximum file operations latency over total uptime.",
            FOP_LABELS,
            &mut descs,
        );

        Self {
            brick_duration,
            brick_data_read,
            brick_data_written,
            brick_fop_hits,
            brick_fop_latency_avg,
            brick_fop_latency_min,
            brick_fop_latency_max,
            descs,
        }
    }

    fn record(&self, volume: &str, profile: &VolumeProfile, local_host: Option<&str>) {
        let bricks = profile
            .bricks
            .iter()
            .filter(|brick| local_host.map_or(true, |host| brick.is_hosted_on(host)));
        for brick in bricks {
            let stats = brick.cumulative();
            let labels = [volume, brick.name()];
            inc_counter(&self.brick_duration, &labels, stats.duration() as f64);
            inc_counter(&self.brick_data_read, &labels, stats.total_read() as f64);
            inc_counter(&self.brick_data_written, &labels, stats.total_write() as f64);

            for fop in stats.fops() {
                let labels = [volume, brick.name(), fop.name()];
                inc_counter(&self.brick_fop_hits, &labels, fop.hits() as f64);
                set_gauge(&self.brick_fop_latency_avg, &labels, fop.avg_latency());
                set_gauge(&self.brick_fop_latency_min, &labels, fop.min_latency());
                set_gauge(&self.brick_fop_latency_max, &labels, fop.max_latency());
            }
        }
    }
}

#[async_trait]
impl SubCollector for ProfileCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Profile
    }

    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError> {
        let settings = ctx.settings();
        let local_host = settings
            .local_bricks_only
            .then_some(settings.hostname.as_str());
        let mut partial_failures = 0;
        for volume in ctx.selected_volumes().await? {
            match volume_profile(ctx.runner(), volume).await {
                Ok(profile) => {
                    trace!(
                        volume = profile.volname(),
                        bricks = profile.bricks.len(),
                        "Decoded volume profile"
                    );
                    self.record(volume, &profile, local_host);
                }
                Err(error) => {
                    warn!(%error, volume, "Failed to get volume profile");
                    partial_failures += 1;
                }
            }
        }
        Ok(partial_failures)
    }
}

impl Collector for ProfileCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut metric_family = Vec::with_capacity(self.descs.len());
        for counter_vec in [
            &self.brick_duration,
            &self.brick_data_read,
            &self.brick_data_written,
            &self.brick_fop_hits,
        ] {
            metric_family.extend(counter_vec.collect());
        }
        for gauge_vec in [
            &self.brick_fop_latency_avg,
            &self.brick_fop_latency_min,
            &self.brick_fop_latency_max,
        ] {
            metric_family.extend(gauge_vec.collect());
        }
        metric_family
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{
            profile::profile_args,
            testing::{ScriptedRunner, VOLUME_INFO, VOLUME_PROFILE},
            volume::VOLUME_INFO_ARGS,
        },
        collector::testing::{sample, sample_count},
        config::{ScrapeSettings, VolumeFilter},
    };

    fn settings(local_bricks_only: bool) -> ScrapeSettings {
        ScrapeSettings {
            volumes: VolumeFilter::All,
            collectors: Default::default(),
            hostname: "node1".to_string(),
            local_bricks_only,
            mount_table: "/proc/mounts".into(),
            probe_timeout: std::time::Duration::from_secs(30),
        }
    }

    // gv_cluster has no profile scripted and fails.
    fn runner() -> ScriptedRunner {
        ScriptedRunner::default()
            .with(VOLUME_INFO_ARGS, VOLUME_INFO)
            .with(&profile_args("gv_test"), VOLUME_PROFILE)
    }

    #[tokio::test]
    async fn brick_and_fop_samples() {
        let runner = runner();
        let settings = settings(false);
        let collector = ProfileCollector::new();
        let partial = collector
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .unwrap();
        assert_eq!(partial, 1);

        let families = collector.collect();
        let brick = [("volume", "gv_test"), ("brick", "node1:/mnt/gv_test")];
        assert_eq!(
            sample(&families, "gluster_profile_brick_duration", &brick),
            Some(16932.0)
        );
        assert_eq!(
            sample(&families, "gluster_profile_brick_data_read", &brick),
            Some(0.0)
        );
        assert_eq!(
            sample(&families, "gluster_profile_brick_data_written", &brick),
            Some(7590710.0)
        );

        let write = [
            ("volume", "gv_test"),
            ("brick", "node1:/mnt/gv_test"),
            ("fop_name", "WRITE"),
        ];
        assert_eq!(
            sample(&families, "gluster_profile_brick_fop_hits", &write),
            Some(58.0)
        );
        assert_eq!(
            sample(&families, "gluster_profile_brick_fop_latency_avg", &write),
            Some(224.5)
        );
        assert_eq!(
            sample(&families, "gluster_profile_brick_fop_latency_min", &write),
            Some(183.0)
        );
        assert_eq!(
            sample(&families, "gluster_profile_brick_fop_latency_max", &write),
            Some(807.0)
        );
        assert_eq!(sample_count(&families, "gluster_profile_brick_duration"), 2);
        assert_eq!(sample_count(&families, "gluster_profile_brick_fop_hits"), 4);
    }

    #[tokio::test]
    async fn local_bricks_only() {
        let runner = runner();
        let settings = settings(true);
        let collector = ProfileCollector::new();
        collector
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .unwrap();

        let families = collector.collect();
        assert_eq!(sample_count(&families, "gluster_profile_brick_duration"), 1);
        assert_eq!(
            sample(
                &families,
                "gluster_profile_brick_duration",
                &[("volume", "gv_test"), ("brick", "node2:/mnt/gv_test")]
            ),
            None
        );
    }

    #[tokio::test]
    async fn volume_info_failure_is_an_error() {
        let runner = ScriptedRunner::default();
        let settings = settings(false);
        let collector = ProfileCollector::new();
        assert!(collector
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .is_err());
    }
}
