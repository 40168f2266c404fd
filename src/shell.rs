/// External command execution for `!cmd` and `ls`.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShellOutput {
    /// Exit code; `None` if killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait ShellRunner {
    /// Run `command` through the shell in `cwd` and capture its output.
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput>;
}

/// Runs commands with `sh -c`.
#[derive(Default)]
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput> {
        debug!("sh -c {:?} in {}", command, cwd.display());
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to run '{}'", command))?;

        Ok(ShellOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_output_and_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let out = SystemShell.run("ls; echo oops >&2; exit 3", dir.path()).unwrap();
        assert_eq!(out.stdout.trim(), "marker.txt");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
    }

    #[test]
    fn test_missing_cwd_is_error() {
        let err = SystemShell.run("true", Path::new("/definitely/not/here"));
        assert!(err.is_err());
    }
}
