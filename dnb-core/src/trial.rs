use crate::stimulus::{Letter, Modality, Position};
use serde::{Deserialize, Serialize};

/// Signal-detection classification of one modality in one trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hit,
    Miss,
    FalseAlarm,
    CorrectReject,
}

impl Outcome {
    pub fn classify(is_match: bool, pressed: bool) -> Self {
        match (is_match, pressed) {
            (true, true) => Outcome::Hit,
            (true, false) => Outcome::Miss,
            (false, true) => Outcome::FalseAlarm,
            (false, false) => Outcome::CorrectReject,
        }
    }
}

/// Responses collected during one trial's window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrialResponse {
    pub position_pressed: bool,
    pub audio_pressed: bool,
    pub position_rt_ms: Option<f64>,
    pub audio_rt_ms: Option<f64>,
}

impl TrialResponse {
    pub fn pressed(&self, modality: Modality) -> bool {
        match modality {
            Modality::Position => self.position_pressed,
            Modality::Audio => self.audio_pressed,
        }
    }

    pub fn reaction_time_ms(&self, modality: Modality) -> Option<f64> {
        match modality {
            Modality::Position => self.position_rt_ms,
            Modality::Audio => self.audio_rt_ms,
        }
    }

    /// Marks `modality` as pressed. Returns false if it already was.
    pub fn press(&mut self, modality: Modality, rt_ms: f64) -> bool {
        let (pressed, rt) = match modality {
            Modality::Position => (&mut self.position_pressed, &mut self.position_rt_ms),
            Modality::Audio => (&mut self.audio_pressed, &mut self.audio_rt_ms),
        };
        if *pressed {
            return false;
        }
        *pressed = true;
        *rt = Some(rt_ms);
        true
    }
}

/// Per-trial record kept for every scored trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDetail {
    pub index: usize,
    pub position_match: bool,
    pub position_pressed: bool,
    pub audio_match: bool,
    pub audio_pressed: bool,
    pub position_rt_ms: Option<f64>,
    pub audio_rt_ms: Option<f64>,
}

/// What the presentation layer needs to show a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialCue {
    pub index: usize,
    pub total: usize,
    pub position: Position,
    pub letter: Letter,
    pub can_respond: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_all_four_outcomes() {
        assert_eq!(Outcome::classify(true, true), Outcome::Hit);
        assert_eq!(Outcome::classify(true, false), Outcome::Miss);
        assert_eq!(Outcome::classify(false, true), Outcome::FalseAlarm);
        assert_eq!(Outcome::classify(false, false), Outcome::CorrectReject);
    }

    #[test]
    fn second_press_is_ignored() {
        let mut response = TrialResponse::default();
        assert!(response.press(Modality::Audio, 420.0));
        assert!(!response.press(Modality::Audio, 900.0));
        assert_eq!(response.audio_rt_ms, Some(420.0));
        assert!(!response.pressed(Modality::Position));
    }
}
