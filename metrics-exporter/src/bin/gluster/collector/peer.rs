use super::{init_gauge_vec, set_gauge, CollectorKind, ScrapeContext, SubCollector};
use crate::{client::peer::peer_status, error::ExporterError};
use async_trait::async_trait;
use prometheus::{
    core::{Collector, Desc},
    proto::MetricFamily,
    GaugeVec,
};
use tracing::debug;

/// Collects the number of cluster peers.
#[derive(Clone, Debug)]
pub(crate) struct PeerCollector {
    peers_connected: GaugeVec,
    peers_total: GaugeVec,
    descs: Vec<Desc>,
}

impl Default for PeerCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerCollector {
    /// Initialize all the metrics to be defined for the peer collector.
    pub(crate) fn new() -> Self {
        let mut descs = Vec::new();
        let peers_connected = init_gauge_vec(
            "peer",
            "peers_connected",
            "Is peer connected to gluster cluster.",
            &[],
            &mut descs,
        );
        let peers_total = init_gauge_vec(
            "peer",
            "peers_total",
            "Number of peers known to the gluster cluster.",
            &[],
            &mut descs,
        );
        Self {
            peers_connected,
            peers_total,
            descs,
        }
    }
}

#[async_trait]
impl SubCollector for PeerCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Peer
    }

    async fn scrape(&self, ctx: &ScrapeContext<'_>) -> Result<u64, ExporterError> {
        let status = peer_status(ctx.runner()).await?;
        for peer in status.peers.iter().filter(|peer| !peer.is_in_cluster()) {
            debug!(
                uuid = peer.uuid(),
                hostname = peer.hostname(),
                state = peer.state_str(),
                "Peer is not connected"
            );
        }
        set_gauge(&self.peers_connected, &[], status.connected() as f64);
        set_gauge(&self.peers_total, &[], status.total() as f64);
        Ok(0)
    }
}

impl Collector for PeerCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut metric_family = self.peers_connected.collect();
        metric_family.extend(self.peers_total.collect());
        metric_family
    }
}
