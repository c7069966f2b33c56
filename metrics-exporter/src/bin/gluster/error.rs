use snafu::Snafu;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Errors used in the gluster exporter.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub(crate) enum ExporterError {
    #[snafu(display("Failed to execute '{}': {}", command, source))]
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("'{}' exited with {}: {}", command, status, stderr))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[snafu(display("'{}' did not complete within {:?}", command, timeout))]
    CommandTimeout { command: String, timeout: Duration },
    #[snafu(display("Output of {} is not valid UTF-8: {}", snapshot, source))]
    InvalidUtf8 {
        snapshot: &'static str,
        source: std::str::Utf8Error,
    },
    #[snafu(display("Failed to decode {} output: {}", snapshot, source))]
    XmlDecode {
        snapshot: &'static str,
        source: quick_xml::DeError,
    },
    #[snafu(display("Failed to read mount table {}: {}", path.display(), source))]
    MountTableRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Gluster executable {} not found", path.display()))]
    GlusterBinary { path: PathBuf },
    #[snafu(display("Unable to get hostname: {}", source))]
    Hostname { source: std::io::Error },
    #[snafu(display("Failed to bind endpoint {} to http server: {}", endpoint, source))]
    HttpBind {
        endpoint: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("Failed to start http service: {}", source))]
    HttpServer { source: std::io::Error },
}

impl ExporterError {
    /// Whether the cli ran but its output could not be decoded.
    pub(crate) fn is_decode(&self) -> bool {
        matches!(self, Self::InvalidUtf8 { .. } | Self::XmlDecode { .. })
    }
}
