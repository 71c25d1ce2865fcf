//! Breakshot - live HLS capture with a scrub-aligned scoreboard.
//!
//! A single recording session drives an external encoder that writes an HLS
//! playlist into the workspace. Score changes are recorded as full snapshots
//! against wall-clock time so a player can replay the board in sync with the
//! video.

pub mod capture;
pub mod controller;
pub mod devices;
pub mod error;
pub mod serve;
pub mod supervisor;
pub mod telemetry;
pub mod timeline;
pub mod web;
pub mod workspace;

pub use controller::{SessionController, StatusSnapshot, StopOutcome};
pub use error::SessionError;
pub use supervisor::{EncoderHealth, SessionInfo};
pub use timeline::{HistoryEntry, ScoreAction, ScoreBoard, TimelineSnapshot};
pub use workspace::Workspace;
