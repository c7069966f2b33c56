use super::{CommandRunner, XML_FLAG};
use crate::error::{CommandFailed, CommandSpawn, CommandTimeout, ExporterError, GlusterBinary};
use async_trait::async_trait;
use snafu::{ensure, ResultExt};
use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::process::Command;
use tracing::trace;

/// Runs the gluster cli found at a fixed path.
#[derive(Debug, Clone)]
pub(crate) struct GlusterCli {
    binary: PathBuf,
    timeout: Duration,
}

impl GlusterCli {
    /// Return a new `Self` using `binary` with the given per invocation timeout.
    pub(crate) fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }
}

#[async_trait]
impl CommandRunner for GlusterCli {
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ExporterError> {
        let command = format!("{} {} {}", self.binary.display(), args.join(" "), XML_FLAG);
        trace!(%command, "Running gluster command");
        let child = Command::new(&self.binary)
            .args(args)
            .arg(XML_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed out child is dropped with the future waiting on it.
            .kill_on_drop(true)
            .spawn()
            .context(CommandSpawn { command: &command })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                CommandTimeout {
                    command: &command,
                    timeout: self.timeout,
                }
                .build()
            })?
            .context(CommandSpawn { command: &command })?;

        ensure!(
            output.status.success(),
            CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim(),
            }
        );
        Ok(output.stdout)
    }
}

/// Resolves the gluster executable. A bare name is looked up in `PATH`,
/// anything else has to exist as given.
pub(crate) fn resolve_gluster_binary(path: &Path) -> Result<PathBuf, ExporterError> {
    if path.components().count() == 1 && !path.is_absolute() {
        let found = env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(path))
                .find(|candidate| candidate.is_file())
        });
        return found.ok_or_else(|| GlusterBinary { path }.build());
    }
    ensure!(path.is_file(), GlusterBinary { path });
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(timeout: Duration) -> GlusterCli {
        GlusterCli::new(PathBuf::from("/bin/sh"), timeout)
    }

    #[tokio::test]
    async fn captures_stdout() {
        // `sh -c script --xml` runs the script with `--xml` as $0.
        let output = shell(Duration::from_secs(5))
            .run(&["-c", "printf '<cliOutput/>'; echo \" $0\""])
            .await
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "<cliOutput/> --xml\n");
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let error = shell(Duration::from_secs(5))
            .run(&["-c", "echo 'quota: No quota configured on volume gv_test' >&2; exit 2"])
            .await
            .unwrap_err();
        match error {
            ExporterError::CommandFailed { stderr, .. } => {
                assert_eq!(stderr, "quota: No quota configured on volume gv_test")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let cli = GlusterCli::new(
            PathBuf::from("/nonexistent/sbin/gluster"),
            Duration::from_secs(5),
        );
        let error = cli.run(&["volume", "info"]).await.unwrap_err();
        assert!(matches!(error, ExporterError::CommandSpawn { .. }));
    }

    #[tokio::test]
    async fn hung_command_times_out() {
        let error = shell(Duration::from_millis(100))
            .run(&["-c", "sleep 5"])
            .await
            .unwrap_err();
        assert!(matches!(error, ExporterError::CommandTimeout { .. }));
    }

    #[test]
    fn binary_resolution() {
        assert!(resolve_gluster_binary(Path::new("sh")).is_ok());
        assert!(resolve_gluster_binary(Path::new("/bin/sh")).is_ok());
        assert!(matches!(
            resolve_gluster_binary(Path::new("/nonexistent/sbin/gluster")),
            Err(ExporterError::GlusterBinary { .. })
        ));
    }
}
