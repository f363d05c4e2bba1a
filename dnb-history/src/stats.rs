use crate::calendar::Day;
use dnb_core::{SessionResult, StoredSession};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_INTERVAL_MS: u64 = 3000;
const HEATMAP_DAYS: i64 = 90;

/// Mean accuracy of one day in a trend series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAccuracy {
    pub day: Day,
    pub accuracy: Option<u32>,
    pub sessions: usize,
}

/// Everything played on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayAggregate {
    pub max_n: u32,
    pub sessions: usize,
    pub reaction_times: Vec<u32>,
    pub accuracies: Vec<u32>,
    pub position_accuracies: Vec<u32>,
    pub audio_accuracies: Vec<u32>,
}

impl DayAggregate {
    fn add(&mut self, r: &SessionResult) {
        self.max_n = self.max_n.max(r.n_level);
        self.sessions += 1;
        self.reaction_times.extend(r.avg_reaction_time_ms.filter(|&rt| rt > 0));
        self.accuracies.extend(r.overall_accuracy);
        self.position_accuracies.extend(r.position_accuracy);
        self.audio_accuracies.extend(r.audio_accuracy);
    }

    pub fn mean_accuracy(&self) -> Option<u32> {
        mean_u32(&self.accuracies)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Records {
    pub max_n: u32,
    pub best_accuracy: Option<u32>,
    pub best_reaction_time_ms: Option<u32>,
    pub best_d_prime: Option<f64>,
    pub longest_streak: u32,
    pub total_sessions: usize,
}

/// Which personal bests a new session broke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NewRecords {
    pub is_first: bool,
    pub max_n: bool,
    pub best_accuracy: bool,
    pub best_reaction_time: bool,
    pub best_d_prime: bool,
}

impl NewRecords {
    pub fn any(&self) -> bool {
        self.max_n || self.best_accuracy || self.best_reaction_time || self.best_d_prime
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalProgress {
    pub done: usize,
    pub goal: u32,
}

impl GoalProgress {
    pub fn is_met(&self) -> bool {
        self.done >= self.goal as usize
    }

    /// Completed fraction, capped at 1
    pub fn fraction(&self) -> f64 {
        if self.goal == 0 {
            return 1.0;
        }
        (self.done as f64 / self.goal as f64).min(1.0)
    }
}

/// Longitudinal statistics over the whole history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_sessions: usize,
    pub max_n: u32,
    pub best_accuracy: Option<u32>,
    pub best_reaction_time_ms: Option<u32>,
    pub avg_reaction_time_ms: Option<u32>,
    pub best_d_prime: Option<f64>,
    pub avg_d_prime: Option<f64>,
    pub total_trials: usize,
    pub total_minutes: u64,
    pub streak: u32,
    pub today_count: usize,
    pub today_max_n: u32,
    pub today_avg_accuracy: Option<u32>,
    pub daily_goal: u32,
    pub last_7_days: Vec<DayAccuracy>,
    pub by_day: BTreeMap<Day, DayAggregate>,
    pub records: Records,
}

impl HistoryStats {
    /// None for an empty history
    pub fn compute(sessions: &[StoredSession], today: Day, daily_goal: u32) -> Option<Self> {
        if sessions.is_empty() {
            return None;
        }
        let records = records(sessions, today)?;

        let rts: Vec<u32> = sessions.iter().filter_map(reaction_time).collect();
        let dps: Vec<f64> = sessions
            .iter()
            .filter_map(|s| s.result.overall_d_prime)
            .collect();

        let total_trials: usize = sessions.iter().map(|s| s.result.trials).sum();
        let avg_interval = sessions
            .iter()
            .map(|s| match s.result.interval_ms {
                0 => DEFAULT_INTERVAL_MS,
                ms => ms,
            })
            .sum::<u64>() as f64
            / sessions.len() as f64;
        let total_minutes = (total_trials as f64 * avg_interval / 60_000.0).round() as u64;

        let by_day = aggregate_by_day(sessions);
        let today_agg = by_day.get(&today);

        Some(Self {
            total_sessions: sessions.len(),
            max_n: records.max_n,
            best_accuracy: records.best_accuracy,
            best_reaction_time_ms: records.best_reaction_time_ms,
            avg_reaction_time_ms: mean_u32(&rts),
            best_d_prime: records.best_d_prime,
            avg_d_prime: (!dps.is_empty())
                .then(|| round2(dps.iter().sum::<f64>() / dps.len() as f64)),
            total_trials,
            total_minutes,
            streak: records.longest_streak,
            today_count: today_agg.map_or(0, |d| d.sessions),
            today_max_n: today_agg.map_or(0, |d| d.max_n),
            today_avg_accuracy: today_agg.and_then(DayAggregate::mean_accuracy),
            daily_goal,
            last_7_days: last_days_accuracy(&by_day, today, 7),
            by_day,
            records,
        })
    }

    pub fn goal_progress(&self) -> GoalProgress {
        GoalProgress {
            done: self.today_count,
            goal: self.daily_goal,
        }
    }
}

fn reaction_time(s: &StoredSession) -> Option<u32> {
    s.result.avg_reaction_time_ms.filter(|&rt| rt > 0)
}

fn session_day(s: &StoredSession) -> Day {
    Day::parse(&s.date).unwrap_or_else(|| Day::from_epoch_ms(s.timestamp_ms))
}

fn mean_u32(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    Some((sum as f64 / values.len() as f64).round() as u32)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn records(sessions: &[StoredSession], today: Day) -> Option<Records> {
    let max_n = sessions.iter().map(|s| s.result.n_level).max()?;
    Some(Records {
        max_n,
        best_accuracy: sessions.iter().filter_map(|s| s.result.overall_accuracy).max(),
        best_reaction_time_ms: sessions.iter().filter_map(reaction_time).min(),
        best_d_prime: best_d_prime(sessions.iter()),
        longest_streak: streak(sessions, today),
        total_sessions: sessions.len(),
    })
}

fn best_d_prime<'a>(sessions: impl Iterator<Item = &'a StoredSession>) -> Option<f64> {
    sessions
        .filter_map(|s| s.result.overall_d_prime)
        .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.max(d))))
}

/// Consecutive active days ending at the most recent one.
/// Zero unless today or yesterday was active.
pub fn streak(sessions: &[StoredSession], today: Day) -> u32 {
    let days: BTreeSet<Day> = sessions.iter().map(session_day).collect();
    if !days.contains(&today) && !days.contains(&today.pred()) {
        return 0;
    }
    let Some(&latest) = days.iter().next_back() else {
        return 0;
    };
    let mut count = 0;
    let mut day = latest;
    while days.contains(&day) {
        count += 1;
        day = day.pred();
    }
    count
}

pub fn aggregate_by_day(sessions: &[StoredSession]) -> BTreeMap<Day, DayAggregate> {
    let mut map: BTreeMap<Day, DayAggregate> = BTreeMap::new();
    for s in sessions {
        map.entry(session_day(s)).or_default().add(&s.result);
    }
    map
}

fn last_days_accuracy(
    by_day: &BTreeMap<Day, DayAggregate>,
    today: Day,
    days: i64,
) -> Vec<DayAccuracy> {
    (0..days)
        .rev()
        .map(|back| {
            let day = today.offset(-back);
            let agg = by_day.get(&day);
            DayAccuracy {
                day,
                accuracy: agg.and_then(DayAggregate::mean_accuracy),
                sessions: agg.map_or(0, |a| a.sessions),
            }
        })
        .collect()
}

/// Sessions per day over the last 90 days, oldest first
pub fn heatmap(sessions: &[StoredSession], today: Day) -> Vec<(Day, usize)> {
    let mut counts: BTreeMap<Day, usize> = BTreeMap::new();
    for s in sessions {
        *counts.entry(session_day(s)).or_default() += 1;
    }
    (0..HEATMAP_DAYS)
        .rev()
        .map(|back| {
            let day = today.offset(-back);
            (day, counts.get(&day).copied().unwrap_or(0))
        })
        .collect()
}

/// Compares `latest` against every other stored session
pub fn check_new_records(sessions: &[StoredSession], latest: &StoredSession) -> NewRecords {
    let previous: Vec<&StoredSession> = sessions.iter().filter(|s| s.id != latest.id).collect();
    if previous.is_empty() {
        return NewRecords {
            is_first: true,
            ..Default::default()
        };
    }

    let r = &latest.result;
    let prev_max_n = previous.iter().map(|s| s.result.n_level).max().unwrap_or(0);
    let prev_best_acc = previous.iter().filter_map(|s| s.result.overall_accuracy).max();
    let prev_best_rt = previous.iter().filter_map(|s| reaction_time(s)).min();
    let prev_best_dp = best_d_prime(previous.iter().copied());

    NewRecords {
        is_first: false,
        max_n: r.n_level > prev_max_n,
        best_accuracy: match (r.overall_accuracy, prev_best_acc) {
            (Some(acc), Some(best)) => acc > best,
            (Some(_), None) => true,
            (None, _) => false,
        },
        best_reaction_time: match (reaction_time(latest), prev_best_rt) {
            (Some(rt), Some(best)) => rt < best,
            (Some(_), None) => true,
            (None, _) => false,
        },
        best_d_prime: match (r.overall_d_prime, prev_best_dp) {
            (Some(dp), Some(best)) => dp > best,
            (Some(_), None) => true,
            (None, _) => false,
        },
    }
}
