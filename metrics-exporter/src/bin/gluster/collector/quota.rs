use super::{init_gauge_vec, set_gauge, CollectorKind, ScrapeContext, SubCollector};
use crate::{
    client::quota::{volume_quota, QuotaLimit},
    error::ExporterError,
};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    GaugeVec,
};
use tracing::{debug, error, warn};

const QUOTA_LABELS: &[&str] = &["path", "volume"];

/// Collects directory quota usage of the selected volumes.
#[derive(Clone, Debug)]
pub(crate) struct QuotaCollector {
    hard_limit: GaugeVec,
    soft_limit: GaugeVec,
    used: GaugeVec,
    available: GaugeVec,
    soft_limit_exceeded: GaugeVec,
    hard_limit_exceeded: GaugeVec,
    descs: Vec<Desc>,
}

impl Default for QuotaCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaCollector {
    /// Initialize all the metrics to be defined for the quota collector.
    pub(crate) fn new() -> Self {
        let mut descs = Vec::new();
        let mut quota_gauge = |name: &str, desc: &str| {
            init_gauge_vec("quota", name, desc, QUOTA_LABELS, &mut descs)
        };
        let hard_limit = quota_gauge("volume_quota_hardlimit", "Quota hard limit (bytes) in a volume");
        let soft_limit = quota_gauge("volume_quota_softlimit", "Quota soft limit (bytes) in a volume");
        let used = quota_gauge("volume_quota_used", "Current data (bytes) used in a quota");
        let available = quota_gauge(
            "volume_quota_available",
            "Current data (bytes) available in a quota",
        );
        let soft_limit_exceeded = quota_gauge(
            "volume_quota_softlimit_exceeded",
            "Is the quota soft-limit exceeded",
        );
        let hard_limit_exceeded = quota_gauge(
            "volume_quota_hardlimit_exceeded",
            "Is the quota hard-limit exceeded",
        );

        Self {
            hard_limit,
            soft_limit,
            used,
            available,
            soft_limit_exceeded,
            hard_limit_exceeded,
            descs,
        }
    }

    fn record(&self, volume: &str, limit: &QuotaLimit) {
        let labels = [limit.path(), volume];
        let flag = |exceeded: bool| if exceeded { 1.0 } else { 0.0 };
        set_gauge(&self.hard_limit, &labels, limit.hard_limit() as f64);
        set_gauge(&self.soft_limit, &labels, limit.soft_limit() as f64);
        set_gauge(&self.used, &labels, limit.used() as f64);
        set_gauge(&self.available, &labels, limit.available() as f64);
        set_gauge(
            &self.soft_limit_exceeded,
            &labels,
            flag(limit.soft_limit_exceeded()),
        );
        set_gauge(
            &self.hard_limit_exceeded,
            &labels,
            flag(limit.hard_limit_exceeded()),
        );
    }
}

#[async_trait]
impl SubCollector for QuotaCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Quota
    }

    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError> {
        let mut partial_failures = 0;
        for volume in ctx.selected_volumes().await? {
            let limits = match volume_quota(ctx.runner(), volume).await {
                Ok(limits) => limits,
                Err(error) if error.is_decode() => {
                    error!(%error, volume, "Failed to decode volume quota");
                    partial_failures += 1;
                    continue;
                }
                // Listing fails when quota is not enabled on the volume.
                Err(error) => {
                    warn!(%error, volume, "Failed to list volume quota");
                    partial_failures += 1;
                    continue;
                }
            };
            if limits.is_empty() {
                debug!(volume, "No quota limits set on volume");
            }
            for limit in &limits {
                self.record(volume, limit);
            }
        }
        Ok(partial_failures)
    }
}

impl Collector for QuotaCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        [
            &self.hard_limit,
            &self.soft_limit,
            &self.used,
            &self.available,
            &self.soft_limit_exceeded,
            &self.hard_limit_exceeded,
        ]
        .iter()
        .flat_map(|gauge_vec| gauge_vec.collect())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{
            quota::quota_args,
            testing::{ScriptedRunner, VOLUME_INFO, VOLUME_QUOTA},
            volume::VOLUME_INFO_ARGS,
        },
        collector::testing::{sample, sample_count},
        config::{ScrapeSettings, VolumeFilter},
    };

    fn settings(volumes: VolumeFilter) -> ScrapeSettings {
        ScrapeSettings {
            volumes,
            collectors: Default::default(),
            hostname: "node1".to_string(),
            local_bricks_only: false,
            mount_table: "/proc/mounts".into(),
            probe_timeout: std::time::Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn quota_limits() {
        let runner = ScriptedRunner::default()
            .with(VOLUME_INFO_ARGS, VOLUME_INFO)
            .with(&quota_args("gv_test"), VOLUME_QUOTA);
        let settings = settings(VolumeFilter::Only(vec!["gv_test".to_string()]));
        let collector = QuotaCollector::new();
        let partial = collector
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .unwrap();
        assert_eq!(partial, 0);

        let families = collector.collect();
        let foo = [("path", "/foo"), ("volume", "gv_test")];
        let expected = [
            ("gluster_quota_volume_quota_hardlimit", 10737418240.0),
            ("gluster_quota_volume_quota_softlimit", 8589934592.0),
            ("gluster_quota_volume_quota_used", 428160000.0),
            ("gluster_quota_volume_quota_available", 10309258240.0),
            ("gluster_quota_volume_quota_softlimit_exceeded", 0.0),
            ("gluster_quota_volume_quota_hardlimit_exceeded", 0.0),
        ];
        for (name, value) in expected {
            assert_eq!(sample(&families, name, &foo), Some(value), "{name}");
        }
        assert_eq!(sample_count(&families, "gluster_quota_volume_quota_used"), 2);
    }

    #[tokio::test]
    async fn disabled_and_malformed_quota_are_partial_failures() {
        // gv_cluster has no quota enabled, gv_test answers garbage.
        let runner = ScriptedRunner::default()
            .with(VOLUME_INFO_ARGS, VOLUME_INFO)
            .with(&quota_args("gv_test"), "<cliOutput><volQuota></cliOutput>");
        let settings = settings(VolumeFilter::All);
        let collector = QuotaCollector::new();
        let partial = collector
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .unwrap();
        assert_eq!(partial, 2);
        assert!(collector
            .collect()
            .iter()
            .all(|family| family.get_metric().is_empty()));
    }

    #[tokio::test]
    async fn empty_quota_list_is_not_a_failure() {
        let runner = ScriptedRunner::default()
            .with(VOLUME_INFO_ARGS, VOLUME_INFO)
            .with(&quota_args("gv_cluster"), "<cliOutput><opRet>0</opRet></cliOutput>")
            .with(&quota_args("gv_test"), "<cliOutput><opRet>0</opRet></cliOutput>");
        let settings = settings(VolumeFilter::All);
        let partial = QuotaCollector::new()
            .scrape(&ScrapeContext::new(&runner, &settings))
            .await
            .unwrap();
        assert_eq!(partial, 0);
    }
}
