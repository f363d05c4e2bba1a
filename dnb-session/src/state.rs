use super::aggregate::summarize;
use super::config::{INTER_TRIAL_GAP_MS, SessionConfig, StartError, is_valid_n_level};
use super::scoring::SessionStats;
use super::sequence::TrialPlan;
use dnb_core::{
    AudioOutput, Modality, Phase, RunningStats, SessionResult, SessionState, SessionStore,
    SilentAudio, StoredSession, TrialCue, TrialPhase, TrialResponse,
};
use dnb_timing::Timer;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;

const NS_PER_MS: u64 = 1_000_000;

/// Notifications for the presentation layer, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TrialStart(TrialCue),
    TrialClear,
    StatsUpdate(RunningStats),
    SessionEnd(SessionSummary),
}

/// Result of a finished session, plus its stored form when persisted
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub result: SessionResult,
    pub stored: Option<StoredSession>,
}

/// The trial currently on screen (or in its trailing gap)
#[derive(Debug, Clone)]
pub struct ActiveTrial {
    pub index: usize,
    pub start_ns: u64,
    pub response: TrialResponse,
}

/// One dual N-back game.
///
/// Nothing happens on its own: `tick` reads the timer and performs every
/// transition whose deadline has passed, and input arrives through
/// `respond_position` / `respond_audio`.
pub struct NBackSession<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub timer: T,
    pub rng: R,
    state: SessionState,
    config: SessionConfig,
    n_level: u32,
    plan: Option<TrialPlan>,
    stats: SessionStats,
    current: Option<ActiveTrial>,
    deadline_ns: u64,
    audio: Box<dyn AudioOutput>,
    store: Option<Arc<dyn SessionStore>>,
}

impl<T, R> NBackSession<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(timer: T, rng: R) -> Self {
        let config = SessionConfig::default();
        Self {
            timer,
            rng,
            state: SessionState::Idle,
            n_level: config.n_level,
            config,
            plan: None,
            stats: SessionStats::new(),
            current: None,
            deadline_ns: 0,
            audio: Box::new(SilentAudio),
            store: None,
        }
    }

    pub fn with_audio(mut self, audio: impl AudioOutput + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Begins a session and presents trial 0.
    ///
    /// An invalid config or a session already in progress leaves everything
    /// as it was.
    pub fn start(&mut self, config: SessionConfig) -> Result<Vec<SessionEvent>, StartError> {
        if self.state.is_running() {
            warn!("start ignored: session already running");
            return Err(StartError::AlreadyRunning);
        }
        if let Err(e) = config.validate() {
            warn!("start rejected: {e}");
            return Err(e);
        }

        self.config = config;
        self.n_level = config.n_level;
        self.plan = Some(TrialPlan::generate(
            &mut self.rng,
            config.total_trials,
            config.n_level as usize,
        ));
        self.stats = SessionStats::new();
        info!(
            "Session started: n={}, {} trials, {} ms interval, {:?} mode",
            config.n_level, config.total_trials, config.interval_ms, config.mode
        );

        let mut events = Vec::new();
        let now = self.timer.now();
        self.present_trial(0, now, &mut events);
        Ok(events)
    }

    /// Aborts the running session. No result is produced.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        let reached = self.current.as_ref().map_or(0, |t| t.index);
        self.state = SessionState::Idle;
        self.current = None;
        self.plan = None;
        self.stats = SessionStats::new();
        self.deadline_ns = 0;
        info!("Session aborted at trial {reached}");
        true
    }

    /// Advances the session to the timer's current time
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let now = self.timer.now();

        while let SessionState::Running(phase) = self.state {
            if now < self.deadline_ns {
                break;
            }
            match phase.next() {
                Some(next) => {
                    self.state = SessionState::Running(next);
                    self.deadline_ns += INTER_TRIAL_GAP_MS * NS_PER_MS;
                    debug!("Stimulus cleared at {} ns", now);
                    events.push(SessionEvent::TrialClear);
                }
                None => self.advance_trial(&mut events),
            }
        }

        events
    }

    pub fn respond_position(&mut self) -> Option<bool> {
        self.respond(Modality::Position)
    }

    pub fn respond_audio(&mut self) -> Option<bool> {
        self.respond(Modality::Audio)
    }

    /// Records a match claim for the current trial.
    ///
    /// Returns whether the claim was right, or `None` when it does not count:
    /// no session, window closed, trial unscoreable or modality already answered.
    fn respond(&mut self, modality: Modality) -> Option<bool> {
        let phase = self.state.phase()?;
        let now = self.timer.now();
        if !phase.allows_input() || now >= self.deadline_ns {
            return None;
        }
        let plan = self.plan.as_ref()?;
        let trial = self.current.as_mut()?;
        let is_match = plan.is_match(modality, trial.index)?;

        let rt_ms = now.saturating_sub(trial.start_ns) as f64 / NS_PER_MS as f64;
        if !trial.response.press(modality, rt_ms) {
            return None;
        }
        debug!(
            "Trial {} {} response, RT = {:.3} ms, match = {}",
            trial.index, modality, rt_ms, is_match
        );
        self.audio.play_feedback(is_match);
        Some(is_match)
    }

    fn present_trial(&mut self, index: usize, start_ns: u64, events: &mut Vec<SessionEvent>) {
        let Some((position, letter)) = self.plan.as_ref().and_then(|p| p.get(index)) else {
            return;
        };
        self.current = Some(ActiveTrial {
            index,
            start_ns,
            response: TrialResponse::default(),
        });
        self.state = SessionState::Running(TrialPhase::Presenting);
        self.deadline_ns = start_ns + self.config.display_ms() * NS_PER_MS;

        self.audio.speak_letter(letter);
        debug!("Trial {index} started at {start_ns} ns: cell {position}, letter {letter}");
        events.push(SessionEvent::TrialStart(TrialCue {
            index,
            total: self.config.total_trials,
            position,
            letter,
            can_respond: index >= self.config.n_level as usize,
        }));
    }

    /// Gap over: score the trial that just finished, then show the next one
    fn advance_trial(&mut self, events: &mut Vec<SessionEvent>) {
        let next = self.current.as_ref().map_or(0, |t| t.index + 1);
        if next >= self.config.total_trials {
            self.end_session(events);
            return;
        }
        self.score_current(events);
        let start_ns = self.deadline_ns;
        self.present_trial(next, start_ns, events);
    }

    fn score_current(&mut self, events: &mut Vec<SessionEvent>) {
        let (Some(plan), Some(trial)) = (self.plan.as_ref(), self.current.as_ref()) else {
            return;
        };
        if self
            .stats
            .score_trial(plan, trial.index, &trial.response)
            .is_some()
        {
            events.push(SessionEvent::StatsUpdate(self.stats.running_stats()));
        }
    }

    /// The last trial has no successor to trigger its scoring, so it is
    /// scored here before the result is frozen.
    fn end_session(&mut self, events: &mut Vec<SessionEvent>) {
        self.score_current(events);
        self.state = SessionState::Ended;
        self.current = None;
        self.plan = None;

        let result = summarize(&self.config, &self.stats);
        self.n_level = result.new_n_level;
        info!(
            "Session complete: n={}, accuracy {:?}%, d' {:?}, adaptation {} -> n={}",
            result.n_level,
            result.overall_accuracy,
            result.overall_d_prime,
            result.adaptation,
            result.new_n_level
        );

        let stored = self
            .store
            .as_ref()
            .and_then(|store| match store.save_session(&result) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!("Failed to store session: {e:#}");
                    None
                }
            });
        self.audio.play_session_end();
        events.push(SessionEvent::SessionEnd(SessionSummary { result, stored }));
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn n_level(&self) -> u32 {
        self.n_level
    }

    /// Changes the level for the next session. Refused while running or out of range.
    pub fn set_n_level(&mut self, n: u32) -> bool {
        if self.state.is_running() || !is_valid_n_level(n) {
            return false;
        }
        self.n_level = n;
        true
    }

    /// Stimulus to draw right now, if any
    pub fn current_cue(&self) -> Option<TrialCue> {
        let phase = self.state.phase()?;
        if !phase.shows_stimulus() {
            return None;
        }
        let trial = self.current.as_ref()?;
        let (position, letter) = self.plan.as_ref()?.get(trial.index)?;
        Some(TrialCue {
            index: trial.index,
            total: self.config.total_trials,
            position,
            letter,
            can_respond: trial.index >= self.config.n_level as usize,
        })
    }

    pub fn current_response(&self) -> Option<&TrialResponse> {
        self.current.as_ref().map(|t| &t.response)
    }

    pub fn running_stats(&self) -> RunningStats {
        self.stats.running_stats()
    }

    /// (1-based trial number, total) while running
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if !self.state.is_running() {
            return None;
        }
        self.current
            .as_ref()
            .map(|t| (t.index + 1, self.config.total_trials))
    }

    /// Time left before the next scheduled transition
    pub fn until_next_transition_ns(&self) -> Option<u64> {
        self.state
            .is_running()
            .then(|| self.deadline_ns.saturating_sub(self.timer.now()))
    }
}
