use once_cell::sync::OnceCell;
use std::{
    convert::Infallible,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

static CONFIG: OnceCell<ExporterConfig> = OnceCell::new();

/// Sentinel volume filter value selecting every volume.
pub(crate) const ALL_VOLUMES: &str = "_all";

/// Exporter config that can be passed through arguments.
#[derive(Debug)]
pub(crate) struct ExporterConfig {
    /// Network address where the prometheus metrics endpoint will listen (example: 0.0.0.0:9189).
    metrics_endpoint: SocketAddr,
    /// Path under which metrics are exposed.
    metrics_path: String,
    /// Resolved path of the gluster executable.
    gluster_path: PathBuf,
    /// Upper bound for a single gluster cli invocation.
    command_timeout: Duration,
    /// Credentials required to read the metrics, if any.
    auth: Option<BasicAuth>,
    scrape: ScrapeSettings,
}

impl ExporterConfig {
    pub(crate) fn new(
        metrics_endpoint: SocketAddr,
        metrics_path: String,
        gluster_path: PathBuf,
        command_timeout: Duration,
        auth: Option<BasicAuth>,
        scrape: ScrapeSettings,
    ) -> Self {
        Self {
            metrics_endpoint,
            metrics_path,
            gluster_path,
            command_timeout,
            auth,
            scrape,
        }
    }

    /// Initialize exporter configs.
    pub(crate) fn initialize(self) {
        CONFIG.get_or_init(|| self);
    }

    /// Get exporter config.
    pub(crate) fn get_config() -> &'static ExporterConfig {
        CONFIG.get().expect("Exporter config is not initialized")
    }

    /// Get metrics endpoint.
    pub(crate) fn metrics_endpoint(&self) -> &SocketAddr {
        &self.metrics_endpoint
    }

    /// Get metrics path.
    pub(crate) fn metrics_path(&self) -> &str {
        &self.metrics_path
    }

    /// Get the gluster executable path.
    pub(crate) fn gluster_path(&self) -> &Path {
        &self.gluster_path
    }

    /// Get the per invocation timeout.
    pub(crate) fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Get the basic auth credentials.
    pub(crate) fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    /// Get the statically configured scrape settings.
    pub(crate) fn scrape_settings(&self) -> &ScrapeSettings {
        &self.scrape
    }
}

/// Username and password for the basic auth gate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BasicAuth {
    user: String,
    password: String,
}

impl BasicAuth {
    /// Returns credentials only when both parts are non empty.
    pub(crate) fn new(user: Option<String>, password: Option<String>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some(Self { user, password })
            }
            _ => None,
        }
    }

    pub(crate) fn matches(&self, user: &str, password: &str) -> bool {
        self.user == user && self.password == password
    }
}

/// Selects which volumes are reported.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VolumeFilter {
    All,
    /// Exact, case sensitive volume names.
    Only(Vec<String>),
}

impl VolumeFilter {
    /// Whether metrics of the named volume should be emitted.
    pub(crate) fn matches(&self, volume: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(volumes) => volumes.iter().any(|name| name == volume),
        }
    }
}

impl Default for VolumeFilter {
    fn default() -> Self {
        Self::All
    }
}

impl FromStr for VolumeFilter {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let volumes = value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if volumes.iter().any(|name| name == ALL_VOLUMES) {
            return Ok(Self::All);
        }
        Ok(Self::Only(volumes))
    }
}

/// Optional collectors. The volume collector is always enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct EnabledCollectors {
    pub(crate) peer: bool,
    pub(crate) profile: bool,
    pub(crate) quota: bool,
    pub(crate) mount: bool,
}

impl EnabledCollectors {
    /// Restricts the set to the collectors named by a request.
    /// An empty request keeps the set unchanged; a request never enables a disabled collector.
    pub(crate) fn narrowed<S: AsRef<str>>(&self, requested: &[S]) -> Self {
        if requested.is_empty() {
            return *self;
        }
        let wants = |name: &str| requested.iter().any(|r| r.as_ref() == name);
        Self {
            peer: self.peer && wants("peer"),
            profile: self.profile && wants("profile"),
            quota: self.quota && wants("quota"),
            mount: self.mount && wants("mount"),
        }
    }
}

/// Settings a single scrape runs with.
#[derive(Debug, Clone)]
pub(crate) struct ScrapeSettings {
    pub(crate) volumes: VolumeFilter,
    pub(crate) collectors: EnabledCollectors,
    /// Hostname of the node the exporter runs on.
    pub(crate) hostname: String,
    /// Only report profile metrics of bricks hosted on this node.
    pub(crate) local_bricks_only: bool,
    /// Mount table listing the live mounts.
    pub(crate) mount_table: PathBuf,
    /// Upper bound for the write probe of a single mount.
    pub(crate) probe_timeout: Duration,
}

impl ScrapeSettings {
    /// Copy of the settings with the collector set narrowed by a request.
    pub(crate) fn narrowed<S: AsRef<str>>(&self, requested: &[S]) -> Self {
        Self {
            collectors: self.collectors.narrowed(requested),
            ..self.clone()
        }
    }
}
