use super::{decode_xml, lenient, CommandRunner};
use crate::error::ExporterError;
use serde::Deserialize;

/// Arguments of `gluster peer status`.
pub(crate) const PEER_STATUS_ARGS: &[&str] = &["peer", "status"];

/// Peer state meaning "Peer in Cluster".
const STATE_IN_CLUSTER: i64 = 3;

/// A cluster member as seen from the local node.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Peer {
    uuid: String,
    hostname: String,
    #[serde(deserialize_with = "lenient")]
    connected: i64,
    #[serde(deserialize_with = "lenient")]
    state: i64,
    state_str: String,
}

impl Peer {
    pub(crate) fn uuid(&self) -> &str {
        &self.uuid
    }

    pub(crate) fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn state_str(&self) -> &str {
        &self.state_str
    }

    /// Connected and fully joined. A connected peer still negotiating does not count.
    pub(crate) fn is_in_cluster(&self) -> bool {
        self.connected == 1 && self.state == STATE_IN_CLUSTER
    }
}

/// Output of `gluster peer status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PeerStatus {
    pub(crate) peers: Vec<Peer>,
}

impl PeerStatus {
    /// Number of peers connected and in the cluster.
    pub(crate) fn connected(&self) -> usize {
        self.peers.iter().filter(|peer| peer.is_in_cluster()).count()
    }

    /// Number of peers regardless of their state.
    pub(crate) fn total(&self) -> usize {
        self.peers.len()
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PeerStatusXml {
    peer_status: PeersXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PeersXml {
    #[serde(rename = "peer")]
    peers: Vec<Peer>,
}

/// Decodes the output of `gluster peer status`.
pub(crate) fn decode_peer_status(bytes: &[u8]) -> Result<PeerStatus, ExporterError> {
    decode_xml::<PeerStatusXml>("peer status", bytes).map(|xml| PeerStatus {
        peers: xml.peer_status.peers,
    })
}

/// Runs and decodes `gluster peer status`.
pub(crate) async fn peer_status(runner: &dyn CommandRunner) -> Result<PeerStatus, ExporterError> {
    decode_peer_status(&runner.run(PEER_STATUS_ARGS).await?)
}
