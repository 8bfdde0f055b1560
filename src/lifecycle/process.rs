//! Load balancer process control.
//!
//! # Responsibilities
//! - Start HAProxy in master-worker mode when the controller owns it
//! - Ask the running load balancer to reload committed configuration
//!
//! # Design Decisions
//! - Reload is graceful (SIGUSR2 to the master); workers finish their
//!   connections while new workers pick up the new server list
//! - A failed reload never undoes a committed transaction

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Errors from process control.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("load balancer process is not running ({0})")]
    Exited(String),

    #[error("failed to signal load balancer: {0}")]
    Signal(std::io::Error),

    #[error("reload command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// How long a stopped load balancer gets to exit before it is killed.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Tells the load balancer to pick up committed configuration.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    async fn reload(&self) -> ProcessResult<()>;

    /// Stop anything this control started. Nothing to do by default.
    async fn shutdown(&self) -> ProcessResult<()> {
        Ok(())
    }
}

/// HAProxy started by the controller in master-worker mode.
#[derive(Debug)]
pub struct MasterWorkerProcess {
    child: Mutex<Child>,
    pid: u32,
}

impl MasterWorkerProcess {
    /// Spawn `binary -W -f config_file`.
    pub fn spawn(binary: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> ProcessResult<Self> {
        let binary = binary.into();
        let child = Command::new(&binary)
            .arg("-W")
            .arg("-f")
            .arg(config_file.into())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: binary.display().to_string(),
                source,
            })?;
        let pid = child
            .id()
            .ok_or_else(|| ProcessError::Exited("exited during startup".to_string()))?;

        tracing::info!(pid, binary = %binary.display(), "Started load balancer process");
        Ok(Self {
            child: Mutex::new(child),
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> ProcessResult<()> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc != 0 {
        return Err(ProcessError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[async_trait]
impl ProcessControl for MasterWorkerProcess {
    async fn reload(&self) -> ProcessResult<()> {
        let mut child = self.child.lock().await;
        if let Some(status) = child.try_wait()? {
            return Err(ProcessError::Exited(status.to_string()));
        }

        #[cfg(unix)]
        {
            send_signal(self.pid, libc::SIGUSR2)
        }
        #[cfg(not(unix))]
        {
            Err(ProcessError::Signal(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "signals are only available on unix",
            )))
        }
    }

    /// SIGTERM the master and wait for it; kill it after `STOP_GRACE`.
    async fn shutdown(&self) -> ProcessResult<()> {
        let mut child = self.child.lock().await;
        if child.try_wait()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        send_signal(self.pid, libc::SIGTERM)?;
        #[cfg(not(unix))]
        child.start_kill()?;

        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(status) => {
                tracing::info!(pid = self.pid, status = %status?, "Load balancer process stopped");
            }
            Err(_) => {
                tracing::warn!(pid = self.pid, "Load balancer ignored SIGTERM, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}

/// Reload by running an external command such as `systemctl reload haproxy`.
#[derive(Debug, Clone)]
pub struct ReloadCommand {
    program: String,
    args: Vec<String>,
}

impl ReloadCommand {
    /// First element is the program, the rest are its arguments.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl ProcessControl for ReloadCommand {
    async fn reload(&self) -> ProcessResult<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                binary: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// For registries that reload the load balancer on commit themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReload;

#[async_trait]
impl ProcessControl for NoReload {
    async fn reload(&self) -> ProcessResult<()> {
        Ok(())
    }
}
