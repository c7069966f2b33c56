use super::{init_gauge_vec, set_gauge, CollectorKind, ScrapeContext, SubCollector};
use crate::{client::volume::volume_status_detail, error::ExporterError};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    GaugeVec,
};
use tracing::{debug, warn};

const NODE_LABELS: &[&str] = &["hostname", "path", "volume"];

/// Collects cluster availability, volume info and brick capacity.
#[derive(Clone, Debug)]
pub(crate) struct VolumeCollector {
    up: GaugeVec,
    volumes_count: GaugeVec,
    brick_count: GaugeVec,
    volume_status: GaugeVec,
    node_size_total: GaugeVec,
    node_size_free: GaugeVec,
    node_inodes_total: GaugeVec,
    node_inodes_free: GaugeVec,
    descs: Vec<Desc>,
}

impl Default for VolumeCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeCollector {
    /// Initialize all the metrics to be defined for the volume collector.
    pub(crate) fn new() -> Self {
        let mut descs = Vec::new();
        let up = init_gauge_vec(
            "",
            "up",
            "Was the last query of Gluster successful.",
            &[],
            &mut descs,
        );
        let volumes_count = init_gauge_vec(
            "volume",
            "volumes_count",
            "Number of volumes in the cluster at the last query, whatever their status.",
            &[],
            &mut descs,
        );
        let brick_count = init_gauge_vec(
            "volume",
            "brick_count",
            "Number of bricks at last query.",
            &["volume"],
            &mut descs,
        );
        let volume_status = init_gauge_vec(
            "volume",
            "volume_status",
            "Status code of requested volume.",
            &["volume"],
            &mut descs,
        );
        let node_size_total = init_gauge_vec(
            "volume",
            "node_size_total_bytes",
            "Total bytes of the brick filesystem.",
            NODE_LABELS,
            &mut descs,
        );
        let node_size_free = init_gauge_vec(
            "volume",
            "node_size_free_bytes",
            "Free bytes of the brick filesystem.",
            NODE_LABELS,
            &mut descs,
        );
        let node_inodes_total = init_gauge_vec(
            "volume",
            "node_inodes_total",
            "Total inodes of the brick filesystem.",
            NODE_LABELS,
            &mut descs,
        );
        let node_inodes_free = init_gauge_vec(
            "volume",
            "node_inodes_free",
            "Free inodes of the brick filesystem.",
            NODE_LABELS,
            &mut descs,
        );

        Self {
            up,
            volumes_count,
            brick_count,
            volume_status,
            node_size_total,
            node_size_free,
            node_inodes_total,
            node_inodes_free,
            descs,
        }
    }
}

#[async_trait]
impl SubCollector for VolumeCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Volume
    }

    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError> {
        let info = match ctx.volume_info().await {
            Ok(info) => info,
            Err(error) => {
                set_gauge(&self.up, &[], 0.0);
                return Err(error);
            }
        };
        if !info.is_up() {
            warn!(
                op_errno = info.op_errno(),
                op_errstr = info.op_errstr(),
                "Gluster reported an error for volume info"
            );
        }
        set_gauge(&self.up, &[], if info.is_up() { 1.0 } else { 0.0 });
        set_gauge(&self.volumes_count, &[], info.count() as f64);

        let filter = &ctx.settings().volumes;
        for volume in info.volumes.iter().filter(|v| filter.matches(v.name())) {
            debug!(
                volume = volume.name(),
                started = volume.is_started(),
                dist_count = volume.dist_count(),
                "Volume info"
            );
            set_gauge(&self.brick_count, &[volume.name()], volume.brick_count() as f64);
            set_gauge(&self.volume_status, &[volume.name()], volume.status() as f64);
        }

        let detail = volume_status_detail(ctx.runner()).await?;
        for status in detail.volumes.iter().filter(|v| filter.matches(v.vol_name())) {
            for node in status.online_nodes() {
                let labels = [node.hostname(), node.path(), status.vol_name()];
                set_gauge(&self.node_size_total, &labels, node.size_total() as f64);
                set_gauge(&self.node_size_free, &labels, node.size_free() as f64);
                set_gauge(&self.node_inodes_total, &labels, node.inodes_total() as f64);
                set_gauge(&self.node_inodes_free, &labels, node.inodes_free() as f64);
            }
        }
        Ok(0)
    }
}

impl Collector for VolumeCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        [
            &self.up,
            &self.volumes_count,
            &self.brick_count,
            &self.volume_status,
            &self.node_size_total,
            &self.node_size_free,
            &self.node_inodes_total,
            &self.node_inodes_free,
        ]
        .iter()
        .flat_map(|gauge_vec| gauge_vec.collect())
        .collect()
    }
}
