use crate::error::{ExporterError, MountTableRead};
use async_trait::async_trait;
use snafu::ResultExt;
use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Filesystem type of a glusterfs fuse mount.
pub(crate) const GLUSTER_FS_TYPE: &str = "fuse.glusterfs";
/// Device, mount point, type and options.
const MIN_MOUNT_COLUMNS: usize = 4;
/// Prefix of the files created by the write probe.
const PROBE_PREFIX: &str = ".gluster_exporter_probe";

/// A live glusterfs mount.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MountRecord {
    volume: String,
    mount_point: PathBuf,
    fs_type: String,
    options: String,
}

impl MountRecord {
    /// Get the mounted volume, i.e. the device column (`<server>:/<volume>`).
    pub(crate) fn volume(&self) -> &str {
        &self.volume
    }

    pub(crate) fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub(crate) fn fs_type(&self) -> &str {
        &self.fs_type
    }

    /// Whether the mount was made read only.
    pub(crate) fn is_read_only(&self) -> bool {
        self.options.split(',').any(|option| option == "ro")
    }
}

/// Parses a mount table in the `/proc/mounts` format, keeping glusterfs fuse mounts only.
/// Rows with too few columns are skipped.
pub(crate) fn parse_mount_table(table: &str) -> Vec<MountRecord> {
    table
        .lines()
        .filter_map(|line| {
            let columns = line.split_whitespace().collect::<Vec<_>>();
            if columns.len() < MIN_MOUNT_COLUMNS {
                if !line.trim().is_empty() {
                    debug!(line, "Skipping short mount table row");
                }
                return None;
            }
            Some(MountRecord {
                volume: unescape(columns[0]),
                mount_point: PathBuf::from(unescape(columns[1])),
                fs_type: columns[2].to_string(),
                options: columns[3].to_string(),
            })
        })
        .filter(|mount| mount.fs_type == GLUSTER_FS_TYPE)
        .collect()
}

/// The kernel escapes whitespace and backslashes in mount table fields as `\ooo`.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let octal = bytes
            .get(index + 1..index + 4)
            .filter(|digits| digits.iter().all(|digit| (b'0'..=b'7').contains(digit)))
            .and_then(|digits| {
                std::str::from_utf8(digits)
                    .ok()
                    .and_then(|digits| u8::from_str_radix(digits, 8).ok())
            });
        match (bytes[index], octal) {
            (b'\\', Some(byte)) => {
                out.push(byte);
                index += 4;
            }
            (byte, _) => {
                out.push(byte);
                index += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Reads and parses the mount table at `path`.
pub(crate) async fn read_mount_table(path: &Path) -> Result<Vec<MountRecord>, ExporterError> {
    let table = tokio::fs::read_to_string(path)
        .await
        .context(MountTableRead { path })?;
    Ok(parse_mount_table(&table))
}

/// Name of a probe file, unique per invocation.
fn probe_file_name() -> String {
    format!(
        "{}_{}_{}",
        PROBE_PREFIX,
        chrono::Utc::now().format("%Y%m%d%H%M%S%f"),
        uuid::Uuid::new_v4().simple()
    )
}

/// File operations of the write probe.
#[async_trait]
pub(crate) trait ProbeFs: std::fmt::Debug + Send + Sync {
    /// Creates `path`, failing when it already exists.
    async fn create(&self, path: &Path) -> io::Result<()>;
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Probe file operations on the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TokioFs;

#[async_trait]
impl ProbeFs for TokioFs {
    async fn create(&self, path: &Path) -> io::Result<()> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map(drop)
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Checks that a file can be created under `mount_point`, removing it again.
/// Returns whether the file could be created; a failed removal only logs.
pub(crate) async fn probe_writable(fs: &dyn ProbeFs, mount_point: &Path) -> bool {
    let probe = mount_point.join(probe_file_name());
    let created = fs.create(&probe).await;
    if let Err(error) = &created {
        debug!(%error, probe = %probe.display(), "Write probe failed");
    }
    if let Err(error) = fs.remove(&probe).await {
        if created.is_ok() {
            warn!(%error, probe = %probe.display(), "Failed to remove write probe");
        }
    }
    created.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
node1:/gv_test /mnt/gv_test fuse.glusterfs rw,relatime,user_id=0,group_id=0,allow_other,max_read=131072 0 0
broken-row /mnt/broken
node1:/gv_cluster /mnt/gluster\\040cluster fuse.glusterfs ro,relatime 0 0
/dev/sda1 / ext4 rw,relatime 0 0
";

    #[test]
    fn keeps_gluster_mounts_only() {
        let mounts = parse_mount_table(MOUNTS);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].volume(), "node1:/gv_test");
        assert_eq!(mounts[0].mount_point(), Path::new("/mnt/gv_test"));
        assert_eq!(mounts[0].fs_type(), GLUSTER_FS_TYPE);
        assert!(!mounts[0].is_read_only());
        assert_eq!(mounts[1].mount_point(), Path::new("/mnt/gluster cluster"));
        assert!(mounts[1].is_read_only());
    }

    #[test]
    fn short_rows_do_not_affect_later_rows() {
        let table = "node1:/gv_a /mnt/a fuse.glusterfs\nnode1:/gv_b /mnt/b fuse.glusterfs rw 0 0\n";
        let mounts = parse_mount_table(table);
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].volume(), "node1:/gv_b");
    }

    #[test]
    fn unescapes_octal_sequences() {
        assert_eq!(unescape("a\\040b\\011c\\134d"), "a b\tc\\d");
        assert_eq!(unescape("trailing\\04"), "trailing\\04");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn only_octal_digits_are_unescaped() {
        assert_eq!(unescape("/mnt/a\\+12b"), "/mnt/a\\+12b");
        assert_eq!(unescape("/mnt/a\\-12b"), "/mnt/a\\-12b");
        assert_eq!(unescape("/mnt/a\\089b"), "/mnt/a\\089b");
    }

    #[tokio::test]
    async fn reads_mount_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounts");
        std::fs::write(&path, MOUNTS).unwrap();
        assert_eq!(read_mount_table(&path).await.unwrap().len(), 2);

        let error = read_mount_table(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(error, ExporterError::MountTableRead { .. }));
    }

    #[tokio::test]
    async fn probe_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_writable(&TokioFs, dir.path()).await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn probe_fails_on_missing_mount() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!probe_writable(&TokioFs, &dir.path().join("not_mounted")).await);
    }

    /// Creates on disk but can never remove.
    #[derive(Debug)]
    struct StickyFs;

    #[async_trait]
    impl ProbeFs for StickyFs {
        async fn create(&self, path: &Path) -> io::Result<()> {
            TokioFs.create(path).await
        }

        async fn remove(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "remove denied"))
        }
    }

    #[tokio::test]
    async fn failed_removal_still_counts_as_writable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_writable(&StickyFs, dir.path()).await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn probe_names_are_unique() {
        let first = probe_file_name();
        assert!(first.starts_with(PROBE_PREFIX));
        assert_ne!(first, probe_file_name());
    }
}
