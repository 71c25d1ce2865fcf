//! Session timeline - the scoreboard and its timestamped change history.
//!
//! Every history entry is a full copy of the scoreboard, so a player seeking
//! to time `t` only needs the last entry at or before `t`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Player name to score. Players are created at zero on first mention and
/// never removed.
pub type ScoreBoard = BTreeMap<String, u32>;

/// Score mutations accepted from the scoreboard UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreAction {
    Add,
    Subtract,
}

impl ScoreAction {
    pub fn delta(self) -> i64 {
        match self {
            Self::Add => 1,
            Self::Subtract => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(serialize_with = "serialize_epoch")]
    pub timestamp: DateTime<Utc>,
    pub scores: ScoreBoard,
}

/// Read-only copy of the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub scores: ScoreBoard,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Default)]
pub struct Timeline {
    started_at: Option<DateTime<Utc>>,
    scores: ScoreBoard,
    history: Vec<HistoryEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Anchor a new session: the history restarts with one entry at
    /// `started_at` carrying the scores as they are now (not zeroed).
    pub fn reset_for_new_session(&mut self, started_at: DateTime<Utc>) {
        self.started_at = Some(started_at);
        self.history = vec![HistoryEntry {
            timestamp: started_at,
            scores: self.scores.clone(),
        }];
    }

    /// Apply `delta` to `player`, never going below zero.
    ///
    /// Returns whether the score changed; only a change is recorded.
    pub fn record_mutation(&mut self, player: &str, delta: i64, now: DateTime<Utc>) -> bool {
        let score = self.scores.entry(player.to_string()).or_insert(0);
        let before = *score;
        let after = i64::from(before)
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX)) as u32;
        *score = after;

        if after == before {
            return false;
        }
        self.append(now);
        true
    }

    /// Zero every known player and mark the reset in the history, even when
    /// nothing was above zero.
    pub fn reset_scores(&mut self, now: DateTime<Utc>) {
        for score in self.scores.values_mut() {
            *score = 0;
        }
        self.append(now);
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            started_at: self.started_at,
            scores: self.scores.clone(),
            history: self.history.clone(),
        }
    }

    fn append(&mut self, now: DateTime<Utc>) {
        // Clamp so a wall clock stepping backwards cannot reorder the history.
        let floor = self
            .history
            .last()
            .map(|e| e.timestamp)
            .or(self.started_at);
        let timestamp = match floor {
            Some(floor) if floor > now => floor,
            _ => now,
        };

        self.history.push(HistoryEntry {
            timestamp,
            scores: self.scores.clone(),
        });
    }
}

/// Unix epoch seconds with sub-second precision, as the player expects.
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

fn serialize_epoch<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(epoch_seconds(*ts))
}
