use super::{init_gauge_vec, set_gauge, CollectorKind, ScrapeContext, SubCollector};
use crate::{
    client::mount::{probe_writable, read_mount_table, ProbeFs, TokioFs},
    error::ExporterError,
};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    GaugeVec,
};
use std::sync::Arc;
use tracing::{debug, warn};

const MOUNT_LABELS: &[&str] = &["volume", "mountpoint"];

/// Collects health of the glusterfs mounts of this node.
#[derive(Clone, Debug)]
pub(crate) struct MountCollector {
    mount_successful: GaugeVec,
    mount_writable: GaugeVec,
    fs: Arc<dyn ProbeFs>,
    descs: Vec<Desc>,
}

impl Default for MountCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MountCollector {
    /// Initialize all the metrics to be defined for the mount collector.
    pub(crate) fn new() -> Self {
        Self::with_probe_fs(Arc::new(TokioFs))
    }

    /// Mount collector probing writability through `fs`.
    pub(crate) fn with_probe_fs(fs: Arc<dyn ProbeFs>) -> Self {
        let mut descs = Vec::new();
        let mount_successful = init_gauge_vec(
            "mount",
            "mount_successful",
            "Checks if mountpoint exists, returns a bool value 0 or 1",
            MOUNT_LABELS,
            &mut descs,
        );
        let mount_writable = init_gauge_vec(
            "mount",
            "mount_writable",
            "Writes and deletes file in Volume and checks if it is writable",
            MOUNT_LABELS,
            &mut descs,
        );
        Self {
            mount_successful,
            mount_writable,
            fs,
            descs,
        }
    }
}

#[async_trait]
impl SubCollector for MountCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Mount
    }

    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError> {
        let mounts = read_mount_table(&ctx.settings().mount_table).await?;
        let mut partial_failures = 0;
        for mount in &mounts {
            let mount_point = mount.mount_point().display().to_string();
            let labels = [mount.volume(), mount_point.as_str()];
            set_gauge(&self.mount_successful, &labels, 1.0);

            if mount.is_read_only() {
                debug!(volume = mount.volume(), %mount_point, fs_type = mount.fs_type(), "Probing read only mount");
            }
            let probe = probe_writable(self.fs.as_ref(), mount.mount_point());
            let writable = match tokio::time::timeout(ctx.settings().probe_timeout, probe).await {
                Ok(writable) => writable,
                Err(_) => {
                    warn!(
                        volume = mount.volume(),
                        %mount_point,
                        timeout = ?ctx.settings().probe_timeout,
                        "Write probe timed out"
                    );
                    false
                }
            };
            if !writable {
                warn!(volume = mount.volume(), %mount_point, "Mount is not writable");
                partial_failures += 1;
            }
            set_gauge(&self.mount_writable, &labels, if writable { 1.0 } else { 0.0 });
        }
        Ok(partial_failures)
    }
}

impl Collector for MountCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut metric_family = self.mount_successful.collect();
        metric_family.extend(self.mount_writable.collect());
        metric_family
    }
}
