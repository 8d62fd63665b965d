//! Process liveness checks used during browser teardown.
//!
//! The session manager never assumes it can inspect the process table. It is
//! handed a [`ProcessInspector`]; when the inspector cannot tell whether a
//! process is alive the manager treats it as still running and skips the
//! forced kill.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// How long a terminated process gets to exit before it is reported as stuck.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Inspect and terminate OS processes by id.
pub trait ProcessInspector: Send + Sync {
    /// `Some(true)` when the process exists, `Some(false)` when it does not,
    /// `None` when this inspector cannot tell.
    fn is_running(&self, pid: u32) -> Option<bool>;

    /// Terminate the process and wait briefly for it to exit.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Uses the `kill` utility to probe and signal processes.
#[derive(Debug, Default, Clone)]
pub struct SystemProcessInspector;

impl ProcessInspector for SystemProcessInspector {
    #[cfg(unix)]
    fn is_running(&self, pid: u32) -> Option<bool> {
        use std::process::Command;
        let output = Command::new("kill")
            .args(["-0", &pid.to_string()])
            .env("LC_ALL", "C")
            .output()
            .ok()?;
        liveness_from_kill(output.status.success(), &String::from_utf8_lossy(&output.stderr))
    }

    #[cfg(not(unix))]
    fn is_running(&self, _pid: u32) -> Option<bool> {
        None
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> Result<()> {
        use std::process::Command;
        let output = Command::new("kill")
            .arg(pid.to_string())
            .output()
            .context("failed to send SIGTERM")?;
        if !output.status.success() {
            bail!("failed to send SIGTERM to PID {pid} (process may have already exited)");
        }

        let polls = TERMINATE_GRACE.as_millis() / 100;
        for _ in 0..polls {
            std::thread::sleep(Duration::from_millis(100));
            if self.is_running(pid) == Some(false) {
                return Ok(());
            }
        }

        let _ = Command::new("kill").args(["-9", &pid.to_string()]).output();
        if self.is_running(pid) == Some(true) {
            bail!("PID {pid} still running after SIGKILL");
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> Result<()> {
        bail!("cannot terminate PID {pid}: process control unavailable on this platform")
    }
}

/// Read a `kill -0` outcome. Only "No such process" proves the process is
/// gone; any other failure (EPERM for another user's process) is unknown.
fn liveness_from_kill(success: bool, stderr: &str) -> Option<bool> {
    if success {
        Some(true)
    } else if stderr.contains("No such process") {
        Some(false)
    } else {
        None
    }
}

/// An inspector for environments without process-table access.
#[derive(Debug, Default, Clone)]
pub struct UnavailableInspector;

impl ProcessInspector for UnavailableInspector {
    fn is_running(&self, _pid: u32) -> Option<bool> {
        None
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        bail!("cannot terminate PID {pid}: no process inspector available")
    }
}
