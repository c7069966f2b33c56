/// Gluster cli client module.
pub(crate) mod cli_client;
/// Live mount table module.
pub(crate) mod mount;
/// PeerStatus module.
pub(crate) mod peer;
/// VolumeProfile module.
pub(crate) mod profile;
/// VolumeQuota module.
pub(crate) mod quota;
/// VolumeInfo and VolumeStatusDetail module.
pub(crate) mod volume;

use crate::error::{ExporterError, InvalidUtf8, XmlDecode};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use snafu::ResultExt;
use std::str::FromStr;

/// Flag appended to every gluster invocation to get machine readable output.
pub(crate) const XML_FLAG: &str = "--xml";

/// Executes gluster cli commands.
#[async_trait]
pub(crate) trait CommandRunner: Send + Sync {
    /// Runs the cli with the given arguments and the xml flag, returning its standard output.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ExporterError>;
}

/// Decodes the xml output of a gluster command.
/// Only malformed markup fails, missing elements take their default value.
fn decode_xml<T: DeserializeOwned>(snapshot: &'static str, bytes: &[u8]) -> Result<T, ExporterError> {
    let text = std::str::from_utf8(bytes).context(InvalidUtf8 { snapshot })?;
    quick_xml::de::from_str(text).context(XmlDecode { snapshot })
}

/// Deserializes a scalar element, falling back to the default for empty or unparsable text.
/// Cli versions differ in which fields they fill in (e.g. `N/A` ports or empty inode counts).
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text
        .as_deref()
        .map(str::trim)
        .and_then(|text| text.parse().ok())
        .unwrap_or_default())
}
