//! Session history: persistence, settings and longitudinal statistics.

pub mod calendar;
pub mod demo;
pub mod export;
pub mod settings;
pub mod stats;
pub mod store;

pub use calendar::Day;
pub use settings::Settings;
pub use stats::{DayAggregate, DayAccuracy, GoalProgress, HistoryStats, NewRecords, Records};
pub use store::{HistoryStore, JsonStore, MemoryStore};
