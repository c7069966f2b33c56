use super::{decode_xml, lenient, CommandRunner};
use crate::error::ExporterError;
use serde::Deserialize;

/// Arguments of `gluster volume profile <volume> info cumulative`.
pub(crate) fn profile_args(volume: &str) -> [&str; 5] {
    ["volume", "profile", volume, "info", "cumulative"]
}

/// Statistics of one file operation type. Latencies are in microseconds.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Fop {
    name: String,
    #[serde(deserialize_with = "lenient")]
    hits: u64,
    #[serde(deserialize_with = "lenient")]
    avg_latency: f64,
    #[serde(deserialize_with = "lenient")]
    min_latency: f64,
    #[serde(deserialize_with = "lenient")]
    max_latency: f64,
}

impl Fop {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits
    }

    pub(crate) fn avg_latency(&self) -> f64 {
        self.avg_latency
    }

    pub(crate) fn min_latency(&self) -> f64 {
        self.min_latency
    }

    pub(crate) fn max_latency(&self) -> f64 {
        self.max_latency
    }
}

/// Counters accumulated since profiling was started on the brick.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct CumulativeStats {
    fop_stats: FopStatsXml,
    #[serde(deserialize_with = "lenient")]
    duration: u64,
    #[serde(deserialize_with = "lenient")]
    total_read: u64,
    #[serde(deserialize_with = "lenient")]
    total_write: u64,
}

impl CumulativeStats {
    /// Seconds the brick has been profiled.
    pub(crate) fn duration(&self) -> u64 {
        self.duration
    }

    /// Bytes read by the brick.
    pub(crate) fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Bytes written by the brick.
    pub(crate) fn total_write(&self) -> u64 {
        self.total_write
    }

    pub(crate) fn fops(&self) -> &[Fop] {
        &self.fop_stats.fops
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
struct FopStatsXml {
    #[serde(rename = "fop")]
    fops: Vec<Fop>,
}

/// Profile of a single brick.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct BrickProfile {
    brick_name: String,
    cumulative_stats: CumulativeStats,
}

impl BrickProfile {
    /// Get the brick name, `<host>:<path>`.
    pub(crate) fn name(&self) -> &str {
        &self.brick_name
    }

    pub(crate) fn cumulative(&self) -> &CumulativeStats {
        &self.cumulative_stats
    }

    /// Whether the brick is hosted on the given node.
    pub(crate) fn is_hosted_on(&self, hostname: &str) -> bool {
        self.brick_name
            .strip_prefix(hostname)
            .map_or(false, |rest| rest.starts_with(':'))
    }
}

/// Output of `gluster volume profile <volume> info cumulative`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct VolumeProfile {
    volname: String,
    #[serde(rename = "brick")]
    pub(crate) bricks: Vec<BrickProfile>,
}

impl VolumeProfile {
    /// Get name of the profiled volume.
    pub(crate) fn volname(&self) -> &str {
        &self.volname
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct VolumeProfileXml {
    vol_profile: VolumeProfile,
}

/// Decodes the output of `gluster volume profile <volume> info cumulative`.
pub(crate) fn decode_volume_profile(bytes: &[u8]) -> Result<VolumeProfile, ExporterError> {
    decode_xml::<VolumeProfileXml>("volume profile", bytes).map(|xml| xml.vol_profile)
}

/// Runs and decodes the cumulative profile of a volume.
pub(crate) async fn volume_profile(
    runner: &dyn CommandRunner,
    volume: &str,
) -> Result<VolumeProfile, ExporterError> {
    decode_volume_profile(&runner.run(&profile_args(volume)).await?)
}
