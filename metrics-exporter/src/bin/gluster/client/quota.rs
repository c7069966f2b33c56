use super::{decode_xml, lenient, CommandRunner};
use crate::error::ExporterError;
use serde::Deserialize;

/// Arguments of `gluster volume quota <volume> list`.
pub(crate) fn quota_args(volume: &str) -> [&str; 4] {
    ["volume", "quota", volume, "list"]
}

/// The cli reports exceeded limits with anything but this literal.
const NOT_EXCEEDED: &str = "No";

/// A quota limit on a directory of a volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct QuotaLimit {
    path: String,
    hard_limit: u64,
    soft_limit: u64,
    used: u64,
    available: u64,
    soft_limit_exceeded: bool,
    hard_limit_exceeded: bool,
}

impl QuotaLimit {
    /// Get the limited directory, relative to the volume root.
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn hard_limit(&self) -> u64 {
        self.hard_limit
    }

    pub(crate) fn soft_limit(&self) -> u64 {
        self.soft_limit
    }

    pub(crate) fn used(&self) -> u64 {
        self.used
    }

    pub(crate) fn available(&self) -> u64 {
        self.available
    }

    pub(crate) fn soft_limit_exceeded(&self) -> bool {
        self.soft_limit_exceeded
    }

    pub(crate) fn hard_limit_exceeded(&self) -> bool {
        self.hard_limit_exceeded
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LimitXml {
    path: String,
    #[serde(deserialize_with = "lenient")]
    hard_limit: u64,
    #[serde(deserialize_with = "lenient")]
    soft_limit_value: u64,
    #[serde(deserialize_with = "lenient")]
    used_space: u64,
    #[serde(deserialize_with = "lenient")]
    avail_space: u64,
    sl_exceeded: String,
    hl_exceeded: String,
}

fn exceeded(flag: &str) -> bool {
    flag.trim() != NOT_EXCEEDED
}

impl From<LimitXml> for QuotaLimit {
    fn from(value: LimitXml) -> Self {
        Self {
            soft_limit_exceeded: exceeded(&value.sl_exceeded),
            hard_limit_exceeded: exceeded(&value.hl_exceeded),
            path: value.path,
            hard_limit: value.hard_limit,
            soft_limit: value.soft_limit_value,
            used: value.used_space,
            available: value.avail_space,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct VolumeQuotaXml {
    vol_quota: VolQuotaXml,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolQuotaXml {
    #[serde(rename = "limit")]
    limits: Vec<LimitXml>,
}

/// Decodes the output of `gluster volume quota <volume> list`.
pub(crate) fn decode_volume_quota(bytes: &[u8]) -> Result<Vec<QuotaLimit>, ExporterError> {
    decode_xml::<VolumeQuotaXml>("volume quota", bytes).map(|xml| {
        xml.vol_quota
            .limits
            .into_iter()
            .map(QuotaLimit::from)
            .collect()
    })
}

/// Runs and decodes the quota limits of a volume.
pub(crate) async fn volume_quota(
    runner: &dyn CommandRunner,
    volume: &str,
) -> Result<Vec<QuotaLimit>, ExporterError> {
    decode_volume_quota(&runner.run(&quota_args(volume)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::VOLUME_QUOTA;

    #[test]
    fn decodes_volume_quota() {
        let limits = decode_volume_quota(VOLUME_QUOTA.as_bytes()).unwrap();
        assert_eq!(limits.len(), 2);

        let foo = &limits[0];
        assert_eq!(foo.path(), "/foo");
        assert_eq!(foo.hard_limit(), 10737418240);
        assert_eq!(foo.soft_limit(), 8589934592);
        assert_eq!(foo.used(), 428160000);
        assert_eq!(foo.available(), 10309258240);
        assert!(!foo.soft_limit_exceeded());
        assert!(!foo.hard_limit_exceeded());

        assert_eq!(limits[1].path(), "/bar");
        assert_eq!(limits[1].hard_limit(), 2147483648);
    }

    #[test]
    fn anything_but_no_is_exceeded() {
        let xml = r#"<cliOutput><volQuota>
            <limit><path>/a</path><sl_exceeded>Yes</sl_exceeded><hl_exceeded>No</hl_exceeded></limit>
            <limit><path>/b</path><sl_exceeded>N/A</sl_exceeded><hl_exceeded></hl_exceeded></limit>
        </volQuota></cliOutput>"#;
        let limits = decode_volume_quota(xml.as_bytes()).unwrap();
        assert!(limits[0].soft_limit_exceeded());
        assert!(!limits[0].hard_limit_exceeded());
        assert!(limits[1].soft_limit_exceeded());
        assert!(limits[1].hard_limit_exceeded());
    }

    #[test]
    fn no_limits() {
        let xml = "<cliOutput><opRet>0</opRet><volQuota/></cliOutput>";
        assert!(decode_volume_quota(xml.as_bytes()).unwrap().is_empty());
    }
}
