use super::{decode_xml, lenient, CommandRunner};
use crate::error::ExporterError;
use serde::Deserialize;

/// Arguments of `gluster volume info`.
pub(crate) const VOLUME_INFO_ARGS: &[&str] = &["volume", "info"];
/// Arguments of `gluster volume status all detail`.
pub(crate) const VOLUME_STATUS_DETAIL_ARGS: &[&str] = &["volume", "status", "all", "detail"];

/// Volume status code of a started volume.
const STATUS_STARTED: i64 = 1;
/// Node status code of an online brick process.
const NODE_ONLINE: i64 = 1;

/// A volume as reported by `gluster volume info`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Volume {
    name: String,
    #[serde(deserialize_with = "lenient")]
    status: i64,
    #[serde(deserialize_with = "lenient")]
    brick_count: u64,
    #[serde(deserialize_with = "lenient")]
    dist_count: u64,
}

impl Volume {
    /// Get name of the volume.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Get the raw status code of the volume.
    pub(crate) fn status(&self) -> i64 {
        self.status
    }

    /// Whether the volume is started.
    pub(crate) fn is_started(&self) -> bool {
        self.status == STATUS_STARTED
    }

    /// Get number of bricks of the volume.
    pub(crate) fn brick_count(&self) -> u64 {
        self.brick_count
    }

    /// Get the distribution count of the volume.
    pub(crate) fn dist_count(&self) -> u64 {
        self.dist_count
    }
}

/// Output of `gluster volume info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct VolumeInfo {
    op_errno: i64,
    op_errstr: String,
    count: u64,
    pub(crate) volumes: Vec<Volume>,
}

impl VolumeInfo {
    /// The cluster answered without an error code.
    pub(crate) fn is_up(&self) -> bool {
        self.op_errno == 0
    }

    /// Get the error code of the command.
    pub(crate) fn op_errno(&self) -> i64 {
        self.op_errno
    }

    /// Get the error message of the command.
    pub(crate) fn op_errstr(&self) -> &str {
        &self.op_errstr
    }

    /// Number of volumes. Falls back to the listed volumes when the count is not reported.
    pub(crate) fn count(&self) -> u64 {
        if self.count == 0 {
            self.volumes.len() as u64
        } else {
            self.count
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct VolumeInfoXml {
    #[serde(deserialize_with = "lenient")]
    op_errno: i64,
    op_errstr: String,
    vol_info: VolInfoXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolInfoXml {
    volumes: VolumesXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolumesXml {
    #[serde(rename = "volume")]
    volumes: Vec<Volume>,
    #[serde(deserialize_with = "lenient")]
    count: u64,
}

impl From<VolumeInfoXml> for VolumeInfo {
    fn from(value: VolumeInfoXml) -> Self {
        Self {
            op_errno: value.op_errno,
            op_errstr: value.op_errstr,
            count: value.vol_info.volumes.count,
            volumes: value.vol_info.volumes.volumes,
        }
    }
}

/// A brick process as reported by `gluster volume status all detail`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Node {
    hostname: String,
    path: String,
    #[serde(deserialize_with = "lenient")]
    status: i64,
    #[serde(deserialize_with = "lenient")]
    size_total: u64,
    #[serde(deserialize_with = "lenient")]
    size_free: u64,
    #[serde(deserialize_with = "lenient")]
    inodes_total: u64,
    #[serde(deserialize_with = "lenient")]
    inodes_free: u64,
}

impl Node {
    pub(crate) fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Whether the brick process is online.
    pub(crate) fn is_online(&self) -> bool {
        self.status == NODE_ONLINE
    }

    pub(crate) fn size_total(&self) -> u64 {
        self.size_total
    }

    pub(crate) fn size_free(&self) -> u64 {
        self.size_free
    }

    pub(crate) fn inodes_total(&self) -> u64 {
        self.inodes_total
    }

    pub(crate) fn inodes_free(&self) -> u64 {
        self.inodes_free
    }
}

/// Brick processes of one volume.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct VolumeStatus {
    vol_name: String,
    #[serde(rename = "node")]
    pub(crate) nodes: Vec<Node>,
}

impl VolumeStatus {
    /// Get name of the volume.
    pub(crate) fn vol_name(&self) -> &str {
        &self.vol_name
    }

    /// Online brick processes of the volume.
    pub(crate) fn online_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_online())
    }
}

/// Output of `gluster volume status all detail`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct VolumeStatusDetail {
    pub(crate) volumes: Vec<VolumeStatus>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct VolumeStatusXml {
    vol_status: VolStatusXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolStatusXml {
    volumes: VolStatusVolumesXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolStatusVolumesXml {
    #[serde(rename = "volume")]
    volumes: Vec<VolumeStatus>,
}

impl From<VolumeStatusXml> for VolumeStatusDetail {
    fn from(value: VolumeStatusXml) -> Self {
        Self {
            volumes: value.vol_status.volumes.volumes,
        }
    }
}

/// Decodes the output of `gluster volume info`.
pub(crate) fn decode_volume_info(bytes: &[u8]) -> Result<VolumeInfo, ExporterError> {
    decode_xml::<VolumeInfoXml>("volume info", bytes).map(VolumeInfo::from)
}

/// Decodes the output of `gluster volume status all detail`.
pub(crate) fn decode_volume_status_detail(
    bytes: &[u8],
) -> Result<VolumeStatusDetail, ExporterError> {
    decode_xml::<VolumeStatusXml>("volume status detail", bytes).map(VolumeStatusDetail::from)
}

/// Runs and decodes `gluster volume info`.
pub(crate) async fn volume_info(runner: &dyn CommandRunner) -> Result<VolumeInfo, ExporterError> {
    decode_volume_info(&runner.run(VOLUME_INFO_ARGS).await?)
}

/// Runs and decodes `gluster volume status all detail`.
pub(crate) async fn volume_status_detail(
    runner: &dyn CommandRunner,
) -> Result<VolumeStatusDetail, ExporterError> {
    decode_volume_status_detail(&runner.run(VOLUME_STATUS_DETAIL_ARGS).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{VOLUME_INFO, VOLUME_STATUS_DETAIL};

    #[test]
    fn decodes_volume_info() {
        let info = decode_volume_info(VOLUME_INFO.as_bytes()).unwrap();
        assert!(info.is_up());
        assert_eq!(info.op_errstr(), "");
        assert_eq!(info.count(), 2);

        let names = info.volumes.iter().map(Volume::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["gv_cluster", "gv_test"]);
        for volume in &info.volumes {
            assert_eq!(volume.brick_count(), 4);
            assert_eq!(volume.status(), 1);
            assert!(volume.is_started());
        }
        assert_eq!(info.volumes[0].dist_count(), 2);
        assert_eq!(info.volumes[1].dist_count(), 4);
    }

    #[test]
    fn decoding_is_pure() {
        let first = decode_volume_info(VOLUME_INFO.as_bytes()).unwrap();
        let second = decode_volume_info(VOLUME_INFO.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_fields_decode_as_defaults() {
        let xml = r#"<cliOutput>
            <opRet>-1</opRet>
            <opErrno>2</opErrno>
            <opErrstr>Connection failed. Please check if gluster daemon is operational.</opErrstr>
            <volInfo><volumes><volume><name>gv_new</name><futureField>x</futureField></volume></volumes></volInfo>
        </cliOutput>"#;
        let info = decode_volume_info(xml.as_bytes()).unwrap();
        assert!(!info.is_up());
        assert_eq!(info.op_errno(), 2);
        assert_eq!(info.count(), 1);
        assert_eq!(info.volumes[0].name(), "gv_new");
        assert_eq!(info.volumes[0].brick_count(), 0);
        assert!(!info.volumes[0].is_started());
    }

    #[test]
    fn malformed_markup_fails() {
        let error = decode_volume_info(b"<cliOutput><opRet>0</opErrno>").unwrap_err();
        assert!(error.is_decode());
        let error = decode_volume_info(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(error.is_decode());
    }

    #[test]
    fn decodes_volume_status_detail() {
        let detail = decode_volume_status_detail(VOLUME_STATUS_DETAIL.as_bytes()).unwrap();
        assert_eq!(detail.volumes.len(), 2);

        let gv_test = &detail.volumes[0];
        assert_eq!(gv_test.vol_name(), "gv_test");
        assert_eq!(gv_test.nodes.len(), 2);
        let online = gv_test.online_nodes().collect::<Vec<_>>();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].hostname(), "node1.example.local");
        assert_eq!(online[0].path(), "/mnt/gluster/gv_test");
        assert_eq!(online[0].size_total(), 20507914240);
        assert_eq!(online[0].size_free(), 19517558784);
        assert_eq!(online[0].inodes_total(), 10010624);
        assert_eq!(online[0].inodes_free(), 10009950);
        assert_eq!(gv_test.nodes[1].hostname(), "node2.example.local");
        assert!(!gv_test.nodes[1].is_online());

        // Empty inode elements decode as zero.
        let gv_test2 = &detail.volumes[1];
        assert_eq!(gv_test2.nodes[0].inodes_total(), 0);
        assert_eq!(gv_test2.nodes[0].size_total(), 20507914240);
    }
}
