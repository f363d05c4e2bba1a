/// Defines the phases a single trial moves through
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn shows_stimulus(&self) -> bool;
    /// Next phase within the same trial, `None` once the trial is over
    fn next(&self) -> Option<Self>;
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialPhase {
    /// Stimulus on screen, response window open
    #[default]
    Presenting,
    /// Blank inter-trial gap
    Gap,
}

impl Phase for TrialPhase {
    fn allows_input(&self) -> bool {
        matches!(self, Self::Presenting)
    }

    fn shows_stimulus(&self) -> bool {
        matches!(self, Self::Presenting)
    }

    fn next(&self) -> Option<Self> {
        match self {
            Self::Presenting => Some(Self::Gap),
            Self::Gap => None,
        }
    }
}

/// Scheduler lifecycle
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running(TrialPhase),
    Ended,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn phase(&self) -> Option<TrialPhase> {
        match self {
            Self::Running(phase) => Some(*phase),
            _ => None,
        }
    }
}
