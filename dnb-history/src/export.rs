use crate::calendar::Day;
use anyhow::{Context, Result, bail};
use dnb_core::StoredSession;
use log::info;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 18] = [
    "date",
    "n_level",
    "trials",
    "interval_ms",
    "position_accuracy",
    "audio_accuracy",
    "overall_accuracy",
    "avg_reaction_time_ms",
    "position_hits",
    "position_misses",
    "position_false_alarms",
    "audio_hits",
    "audio_misses",
    "audio_false_alarms",
    "position_d_prime",
    "audio_d_prime",
    "overall_d_prime",
    "adaptation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

pub fn file_name(format: ExportFormat, day: Day) -> String {
    format!("dual-n-back-{day}.{}", format.extension())
}

pub fn to_json(sessions: &[StoredSession]) -> Result<String> {
    serde_json::to_string_pretty(sessions).context("cannot serialize sessions")
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// CSV with a UTF-8 byte order mark; unavailable values are empty cells
pub fn to_csv(sessions: &[StoredSession]) -> String {
    let mut out = String::from('\u{feff}');
    out.push_str(&CSV_HEADER.join(","));
    for s in sessions {
        let r = &s.result;
        let row = [
            s.date.clone(),
            r.n_level.to_string(),
            r.trials.to_string(),
            r.interval_ms.to_string(),
            cell(r.position_accuracy),
            cell(r.audio_accuracy),
            cell(r.overall_accuracy),
            cell(r.avg_reaction_time_ms),
            r.position.hits.to_string(),
            r.position.misses.to_string(),
            r.position.false_alarms.to_string(),
            r.audio.hits.to_string(),
            r.audio.misses.to_string(),
            r.audio.false_alarms.to_string(),
            cell(r.position_d_prime),
            cell(r.audio_d_prime),
            cell(r.overall_d_prime),
            r.adaptation.to_string(),
        ];
        out.push('\n');
        out.push_str(&row.join(","));
    }
    out
}

/// Writes `sessions` into `dir` under the dated export name
pub fn write_export(
    dir: &Path,
    sessions: &[StoredSession],
    format: ExportFormat,
    day: Day,
) -> Result<PathBuf> {
    if sessions.is_empty() {
        bail!("no sessions to export");
    }
    let contents = match format {
        ExportFormat::Json => to_json(sessions)?,
        ExportFormat::Csv => to_csv(sessions),
    };
    let path = dir.join(file_name(format, day));
    fs::write(&path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    info!("Exported {} sessions to {}", sessions.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::stamp;
    use crate::store::tests::result;

    #[test]
    fn csv_rows_follow_header() {
        let mut r = result(2, Some(70));
        r.audio_accuracy = None;
        let session = stamp(&r, 1_000);
        let csv = to_csv(&[session]);

        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("\u{feff}date,n_level,"));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row.len(), CSV_HEADER.len());
        assert_eq!(row[0], "1970-01-01T00:00:01Z");
        assert_eq!(row[1], "2");
        assert_eq!(row[5], "");
        assert_eq!(row[8], "5");
        assert_eq!(row[15], "");
        assert_eq!(row[17], "stay");
    }

    #[test]
    fn export_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let day = Day::from_civil(2026, 2, 15);
        let sessions = vec![stamp(&result(3, Some(80)), 5)];

        let path = write_export(dir.path(), &sessions, ExportFormat::Json, day).unwrap();
        assert_eq!(path.file_name().unwrap(), "dual-n-back-2026-02-15.json");
        let back: Vec<StoredSession> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, sessions);
    }

    #[test]
    fn empty_history_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let day = Day::from_civil(2026, 2, 15);
        assert!(write_export(dir.path(), &[], ExportFormat::Csv, day).is_err());
    }
}
