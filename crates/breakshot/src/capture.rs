//! Capture subprocess - command line construction and the owned process handle.

use crate::error::TerminationTimeout;
use crate::workspace::Workspace;
use breakconf::CaptureConfig;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Fully resolved encoder invocation for one session.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    program: PathBuf,
    args: Vec<OsString>,
    log_path: PathBuf,
}

impl CaptureCommand {
    /// Build the low-latency HLS encode of a V4L2 device.
    ///
    /// `hls_list_size 0` keeps every segment in the manifest so the whole
    /// session stays seekable; the workspace purge is the only cleanup.
    pub fn from_config(capture: &CaptureConfig, workspace: &Workspace, log_path: &Path) -> Self {
        let mut args: Vec<OsString> = Vec::with_capacity(40);
        let mut push = |values: &[&str]| args.extend(values.iter().map(OsString::from));

        let framerate = capture.framerate.to_string();
        let gop = capture.gop.to_string();
        let segment_seconds = capture.segment_seconds.to_string();

        push(&["-y"]);
        push(&["-f", "v4l2"]);
        push(&["-framerate", &framerate]);
        push(&["-video_size", &capture.video_size]);
        push(&["-i", &capture.device]);
        push(&["-c:v", "libx264"]);
        push(&["-preset", &capture.preset]);
        push(&["-tune", "zerolatency"]);
        push(&["-pix_fmt", "yuv420p"]);
        push(&["-g", &gop]);
        push(&["-sc_threshold", "0"]);
        push(&["-f", "hls"]);
        push(&["-hls_time", &segment_seconds]);
        push(&["-hls_list_size", "0"]);
        push(&["-hls_flags", "delete_segments+append_list"]);
        push(&["-hls_segment_filename"]);
        args.push(workspace.segment_template().into_os_string());
        args.push(workspace.manifest_path().into_os_string());

        Self {
            program: capture.program.clone(),
            args,
            log_path: log_path.to_path_buf(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Render for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Launch the encoder with stdout and stderr going to the log file.
    ///
    /// The log is truncated, so it only ever describes the latest session.
    pub fn spawn(&self) -> io::Result<CaptureProcess> {
        let log = File::create(&self.log_path)?;
        let log_err = log.try_clone()?;

        info!("🚀 Starting encoder: {}", self.display());

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn()?;

        Ok(CaptureProcess { child })
    }
}

/// How a capture process ended.
#[derive(Debug)]
pub enum Termination {
    /// It had already exited before the stop request.
    AlreadyExited(ExitStatus),
    /// It exited within the grace period.
    Exited(ExitStatus),
    /// It was killed after the grace period ran out.
    Killed,
}

impl Termination {
    pub fn was_forced(&self) -> bool {
        matches!(self, Self::Killed)
    }
}

/// Owned handle to a running encoder.
///
/// Teardown is explicit through `terminate`; dropping the handle only kills
/// the process as a last resort.
#[derive(Debug)]
pub struct CaptureProcess {
    child: Child,
}

impl CaptureProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit status if the process has already exited, without blocking.
    pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to poll capture process: {}", e);
                None
            }
        }
    }

    /// Ask the encoder to finish, then kill it if it is still around after `grace`.
    pub async fn terminate(mut self, grace: Duration) -> Termination {
        if let Some(status) = self.try_exit_status() {
            return Termination::AlreadyExited(status);
        }

        let pid = self.id();
        if let Err(e) = self.request_exit() {
            warn!("Failed to signal capture process {:?}: {}", pid, e);
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("🛑 Encoder exited: {}", status);
                Termination::Exited(status)
            }
            Ok(Err(e)) => {
                warn!("Failed waiting for capture process {:?}: {}", pid, e);
                self.kill().await
            }
            Err(_) => {
                warn!("{}, killing", TerminationTimeout { pid, grace });
                self.kill().await
            }
        }
    }

    async fn kill(&mut self) -> Termination {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill capture process: {}", e);
        }
        Termination::Killed
    }

    /// SIGTERM lets ffmpeg finalize the manifest before exiting.
    #[cfg(unix)]
    fn request_exit(&mut self) -> io::Result<()> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let pid: libc::pid_t = pid
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))?;

        let result = unsafe { libc::kill(pid, libc::SIGTERM) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}
