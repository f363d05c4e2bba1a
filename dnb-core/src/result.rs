use crate::trial::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the N level evolves between sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Adaptive,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adaptation {
    Up,
    Down,
    #[default]
    Stay,
}

impl fmt::Display for Adaptation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adaptation::Up => f.write_str("up"),
            Adaptation::Down => f.write_str("down"),
            Adaptation::Stay => f.write_str("stay"),
        }
    }
}

/// Outcome tallies for one modality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCounts {
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub correct_rejects: u32,
}

impl DetectionCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
            Outcome::FalseAlarm => self.false_alarms += 1,
            Outcome::CorrectReject => self.correct_rejects += 1,
        }
    }

    /// Trials where a match was present
    pub fn signal_total(&self) -> u32 {
        self.hits + self.misses
    }

    /// Trials where no match was present
    pub fn noise_total(&self) -> u32 {
        self.false_alarms + self.correct_rejects
    }

    /// Denominator of the accuracy score. Correct rejects are left out.
    pub fn strict_total(&self) -> u32 {
        self.hits + self.misses + self.false_alarms
    }

    pub fn merged(&self, other: &DetectionCounts) -> DetectionCounts {
        DetectionCounts {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            false_alarms: self.false_alarms + other.false_alarms,
            correct_rejects: self.correct_rejects + other.correct_rejects,
        }
    }
}

/// Snapshot of a session in progress, emitted after every scored trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub position: DetectionCounts,
    pub audio: DetectionCounts,
    pub position_accuracy: Option<u32>,
    pub audio_accuracy: Option<u32>,
    pub overall_accuracy: Option<u32>,
    pub avg_reaction_time_ms: Option<u32>,
    pub position_d_prime: Option<f64>,
    pub audio_d_prime: Option<f64>,
    pub overall_d_prime: Option<f64>,
}

impl RunningStats {
    pub fn total_false_alarms(&self) -> u32 {
        self.position.false_alarms + self.audio.false_alarms
    }

    pub fn total_misses(&self) -> u32 {
        self.position.misses + self.audio.misses
    }
}

/// Frozen summary of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub n_level: u32,
    pub trials: usize,
    pub interval_ms: u64,
    pub mode: Mode,
    pub position_accuracy: Option<u32>,
    pub audio_accuracy: Option<u32>,
    pub overall_accuracy: Option<u32>,
    pub avg_reaction_time_ms: Option<u32>,
    pub position: DetectionCounts,
    pub audio: DetectionCounts,
    pub position_d_prime: Option<f64>,
    pub audio_d_prime: Option<f64>,
    pub overall_d_prime: Option<f64>,
    pub adaptation: Adaptation,
    pub new_n_level: u32,
}

/// A session as persisted by a history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    pub timestamp_ms: u64,
    /// ISO-8601 UTC, e.g. `2026-02-15T01:30:00Z`
    pub date: String,
    #[serde(flatten)]
    pub result: SessionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_total_excludes_correct_rejects() {
        let mut counts = DetectionCounts::default();
        for outcome in [
            Outcome::Hit,
            Outcome::Hit,
            Outcome::Miss,
            Outcome::FalseAlarm,
            Outcome::CorrectReject,
            Outcome::CorrectReject,
        ] {
            counts.record(outcome);
        }
        assert_eq!(counts.strict_total(), 4);
        assert_eq!(counts.signal_total(), 3);
        assert_eq!(counts.noise_total(), 3);
    }
}
