//! Session controller - the one context object every request goes through.
//!
//! Owns the supervisor and the timeline behind a single lock so a status read
//! always sees a consistent pair. Start and stop are further serialized by an
//! async lifecycle mutex, which is the only lock held across an `.await`.

use crate::capture::{CaptureCommand, Termination};
use crate::error::SessionError;
use crate::supervisor::{DetachedSession, EncoderHealth, ProcessSupervisor, SessionInfo};
use crate::timeline::{ScoreAction, ScoreBoard, Timeline, TimelineSnapshot};
use crate::workspace::Workspace;
use breakconf::{BreakConfig, CaptureConfig};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Result of a stop request. Stop never fails.
#[derive(Debug)]
pub enum StopOutcome {
    NotRunning,
    Stopped {
        info: SessionInfo,
        termination: Termination,
    },
}

/// Point-in-time view for the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub recording: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub scores: ScoreBoard,
}

#[derive(Debug, Default)]
struct ControllerState {
    supervisor: ProcessSupervisor,
    timeline: Timeline,
}

#[derive(Debug)]
pub struct SessionController {
    capture: CaptureConfig,
    workspace: Workspace,
    encoder_log: PathBuf,
    lifecycle: tokio::sync::Mutex<()>,
    state: RwLock<ControllerState>,
}

impl SessionController {
    pub fn new(config: &BreakConfig) -> Self {
        Self {
            capture: config.capture.clone(),
            workspace: Workspace::new(config.paths.workspace_dir.clone()),
            encoder_log: config.paths.encoder_log.clone(),
            lifecycle: tokio::sync::Mutex::new(()),
            state: RwLock::new(ControllerState::default()),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Purge the workspace, launch the encoder and re-anchor the timeline.
    ///
    /// On error nothing has changed except the purge: the session is still
    /// idle and the history still belongs to the previous session.
    pub async fn start(&self) -> Result<SessionInfo, SessionError> {
        let _lifecycle = self.lifecycle.lock().await;

        self.read_state().supervisor.ensure_idle()?;

        self.workspace.purge();
        let command = CaptureCommand::from_config(&self.capture, &self.workspace, &self.encoder_log);

        let mut state = self.write_state();
        let info = state.supervisor.launch(&command, Utc::now())?;
        state.timeline.reset_for_new_session(info.started_at);
        Ok(info)
    }

    /// End the running session, if any.
    ///
    /// The session is idle as soon as the handle is detached; waiting for the
    /// encoder happens outside the state lock.
    pub async fn stop(&self) -> StopOutcome {
        let _lifecycle = self.lifecycle.lock().await;

        let detached = self.write_state().supervisor.detach();
        let Some(DetachedSession { info, process }) = detached else {
            debug!("stop requested with no session running");
            return StopOutcome::NotRunning;
        };

        let termination = process.terminate(self.capture.grace_period()).await;
        info!(
            session.id = %info.id,
            forced = termination.was_forced(),
            "recording session stopped"
        );
        StopOutcome::Stopped { info, termination }
    }

    /// Apply a scoreboard action. Works with or without a running session.
    pub fn record_event(&self, player: &str, action: ScoreAction) -> ScoreBoard {
        let mut state = self.write_state();
        if state.timeline.record_mutation(player, action.delta(), Utc::now()) {
            debug!(player, ?action, "score changed");
        }
        state.timeline.scores().clone()
    }

    pub fn reset_scores(&self) -> ScoreBoard {
        let mut state = self.write_state();
        state.timeline.reset_scores(Utc::now());
        info!("scores reset");
        state.timeline.scores().clone()
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.read_state();
        StatusSnapshot {
            recording: state.supervisor.is_active(),
            started_at: state.timeline.started_at(),
            scores: state.timeline.scores().clone(),
        }
    }

    pub fn history(&self) -> TimelineSnapshot {
        self.read_state().timeline.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.read_state().supervisor.is_active()
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        self.read_state().supervisor.current()
    }

    pub fn health(&self) -> EncoderHealth {
        self.write_state().supervisor.health()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ControllerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ControllerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn controller_with(program: PathBuf) -> (SessionController, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut config = BreakConfig::default();
        config.paths.workspace_dir = temp.path().join("hls");
        config.paths.encoder_log = temp.path().join("ffmpeg.log");
        config.capture.program = program;
        (SessionController::new(&config), temp)
    }

    #[test]
    fn test_idle_status_before_any_session() {
        let (controller, _temp) = controller_with(PathBuf::from("ffmpeg"));

        let status = controller.status();
        assert!(!status.recording);
        assert!(status.started_at.is_none());
        assert!(status.scores.is_empty());
        assert_eq!(controller.health(), EncoderHealth::Idle);
    }

    #[test]
    fn test_scores_work_without_session() {
        let (controller, _temp) = controller_with(PathBuf::from("ffmpeg"));

        controller.record_event("alice", ScoreAction::Add);
        let scores = controller.record_event("alice", ScoreAction::Add);

        assert_eq!(scores.get("alice"), Some(&2));
        assert_eq!(controller.history().history.len(), 2);
    }

    #[test]
    fn test_reset_returns_zeroed_board() {
        let (controller, _temp) = controller_with(PathBuf::from("ffmpeg"));
        controller.record_event("alice", ScoreAction::Add);

        let scores = controller.reset_scores();

        assert_eq!(scores.get("alice"), Some(&0));
    }

    #[tokio::test]
    async fn test_stop_when_idle_keeps_history() {
        let (controller, _temp) = controller_with(PathBuf::from("ffmpeg"));
        controller.record_event("bob", ScoreAction::Add);
        let before = controller.history();

        let outcome = controller.stop().await;

        assert!(matches!(outcome, StopOutcome::NotRunning));
        assert!(!controller.is_active());
        assert_eq!(controller.history(), before);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_timeline_alone() {
        let temp = TempDir::new().unwrap();
        let (controller, _dir) = controller_with(temp.path().join("missing-encoder"));
        controller.record_event("alice", ScoreAction::Add);
        let before = controller.history();

        let err = controller.start().await.unwrap_err();

        assert!(matches!(err, SessionError::LaunchFailed { .. }));
        assert!(!controller.is_active());
        assert_eq!(controller.history(), before);
        assert!(controller.workspace().dir().is_dir(), "purge created the workspace");
    }
}
