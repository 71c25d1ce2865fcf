//! Process supervisor - the single recording session and its encoder handle.
//!
//! `Idle --launch ok--> Running --detach--> Idle`. A failed launch stays idle,
//! and a launch while running is refused without touching the session.
//! "Active" is derived from holding a process handle, so the two can never
//! disagree.

use crate::capture::{CaptureCommand, CaptureProcess};
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Identity of a started session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// A session removed from the supervisor, still owning its process.
#[derive(Debug)]
pub struct DetachedSession {
    pub info: SessionInfo,
    pub process: CaptureProcess,
}

/// What the encoder is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderHealth {
    Idle,
    Running,
    /// The session is still open but the encoder has exited on its own.
    Exited(Option<i32>),
}

#[derive(Debug)]
struct RunningSession {
    info: SessionInfo,
    process: CaptureProcess,
}

#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    running: Option<RunningSession>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn current(&self) -> Option<SessionInfo> {
        self.running.as_ref().map(|r| r.info)
    }

    /// Singleton guard.
    pub fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Err(SessionError::AlreadyRunning)
        } else {
            Ok(())
        }
    }

    /// Spawn the encoder and become `Running`.
    pub fn launch(
        &mut self,
        command: &CaptureCommand,
        now: DateTime<Utc>,
    ) -> Result<SessionInfo, SessionError> {
        self.ensure_idle()?;

        let process = command.spawn().map_err(|source| {
            warn!("❌ Encoder failed to start: {}", source);
            SessionError::LaunchFailed {
                program: command.program().to_path_buf(),
                source,
            }
        })?;

        let info = SessionInfo {
            id: Uuid::new_v4(),
            started_at: now,
        };
        info!(session.id = %info.id, pid = ?process.id(), "recording session started");

        self.running = Some(RunningSession { info, process });
        Ok(info)
    }

    /// Become `Idle`, handing the process to the caller for teardown.
    pub fn detach(&mut self) -> Option<DetachedSession> {
        self.running.take().map(|r| DetachedSession {
            info: r.info,
            process: r.process,
        })
    }

    /// Observe the encoder without changing session state.
    pub fn health(&mut self) -> EncoderHealth {
        match self.running.as_mut() {
            None => EncoderHealth::Idle,
            Some(running) => match running.process.try_exit_status() {
                None => EncoderHealth::Running,
                Some(status) => EncoderHealth::Exited(status.code()),
            },
        }
    }
}
