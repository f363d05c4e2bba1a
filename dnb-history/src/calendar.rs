//! UTC calendar days without a date library.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const MS_PER_DAY: u64 = 86_400_000;

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Full ISO-8601 timestamp, e.g. `2026-02-15T01:30:00Z`
pub fn format_iso8601(epoch_ms: u64) -> String {
    let secs = epoch_ms / 1000;
    let (year, month, day) = Day::from_epoch_ms(epoch_ms).civil();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

/// A UTC calendar day, counted from 1970-01-01
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Day(pub i64);

impl Day {
    pub fn from_epoch_ms(ms: u64) -> Self {
        Day((ms / MS_PER_DAY) as i64)
    }

    pub fn today() -> Self {
        Self::from_epoch_ms(now_ms())
    }

    /// Midnight of this day in epoch milliseconds
    pub fn start_ms(&self) -> u64 {
        (self.0.max(0) as u64) * MS_PER_DAY
    }

    pub fn offset(&self, days: i64) -> Self {
        Day(self.0 + days)
    }

    pub fn pred(&self) -> Self {
        self.offset(-1)
    }

    pub fn from_civil(year: i64, month: u32, day: u32) -> Self {
        let y = if month <= 2 { year - 1 } else { year };
        let era = y.div_euclid(400);
        let yoe = y - era * 400;
        let m = month as i64;
        let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        Day(era * 146_097 + doe - 719_468)
    }

    /// (year, month, day)
    pub fn civil(&self) -> (i64, u32, u32) {
        let z = self.0 + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z - era * 146_097;
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
        let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
        (year, month, day)
    }

    /// Parses the leading `YYYY-MM-DD` of a date or timestamp string
    pub fn parse(s: &str) -> Option<Self> {
        let date = s.get(..10)?;
        let mut parts = date.split('-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self::from_civil(year, month, day))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, m, d) = self.civil();
        write!(f, "{:04}-{:02}-{:02}", y, m, d)
    }
}

impl Serialize for Day {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_day_zero() {
        assert_eq!(Day(0).to_string(), "1970-01-01");
        assert_eq!(Day::from_civil(1970, 1, 1), Day(0));
    }

    #[test]
    fn civil_round_trip_across_leap_day() {
        let leap = Day::from_civil(2024, 2, 29);
        assert_eq!(leap.civil(), (2024, 2, 29));
        assert_eq!(leap.offset(1).to_string(), "2024-03-01");
        assert_eq!(leap.pred().to_string(), "2024-02-28");
    }

    #[test]
    fn parse_accepts_full_timestamps() {
        let day = Day::parse("2026-02-15T01:30:00Z").unwrap();
        assert_eq!(day.to_string(), "2026-02-15");
        assert_eq!(Day::parse("2026-13-01"), None);
        assert_eq!(Day::parse("nope"), None);
    }

    #[test]
    fn format_iso8601_known_instant() {
        // 2026-02-15T01:30:00Z
        let ms = Day::from_civil(2026, 2, 15).start_ms() + (90 * 60 * 1000);
        assert_eq!(format_iso8601(ms), "2026-02-15T01:30:00Z");
    }
}
