//! Files a run leaves behind: the digest itself and the stats history.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use digest_common::{FetchStats, Result};
use serde::Serialize;
use serde_json::Value;

/// Stats history keeps this many runs.
pub const STATS_HISTORY: usize = 30;

#[derive(Serialize)]
struct StatsEntry<'a> {
    timestamp: String,
    #[serde(flatten)]
    stats: &'a FetchStats,
}

/// Write `output/digest_YYYYmmdd_HHMMSS.md`, creating the directory.
pub fn save_digest(dir: &Path, digest: &str, now: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("digest_{}.md", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, digest)?;
    Ok(path)
}

/// Append one entry to the JSON array at `path`, keeping the last [`STATS_HISTORY`].
///
/// An unreadable or malformed history file is replaced.
pub fn append_stats(path: &Path, stats: &FetchStats, now: DateTime<Local>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut history: Vec<Value> = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "stats history unreadable; starting over");
            Vec::new()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    history.push(serde_json::to_value(StatsEntry {
        timestamp: now.to_rfc3339(),
        stats,
    })?);
    if history.len() > STATS_HISTORY {
        history.drain(..history.len() - STATS_HISTORY);
    }

    fs::write(path, serde_json::to_string_pretty(&history)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, h, 5, 9).unwrap()
    }

    #[test]
    fn digest_file_is_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        let path = save_digest(&out, "# digest", at(8)).unwrap();
        assert_eq!(path.file_name().unwrap(), "digest_20261019_080509.md");
        assert_eq!(fs::read_to_string(path).unwrap(), "# digest");
    }

    #[test]
    fn stats_history_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/stats.json");
        for i in 0..(STATS_HISTORY + 5) {
            let stats = FetchStats {
                total_tweets: i,
                ..Default::default()
            };
            append_stats(&path, &stats, at(8)).unwrap();
        }

        let history: Vec<Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(history.len(), STATS_HISTORY);
        assert_eq!(history[0]["total_tweets"], 5);
        assert_eq!(history.last().unwrap()["total_tweets"], STATS_HISTORY + 4);
        assert!(history[0]["timestamp"].as_str().unwrap().starts_with("2026-10-19T08:05:09"));
    }

    #[test]
    fn corrupt_history_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "{not json").unwrap();
        append_stats(&path, &FetchStats::default(), at(9)).unwrap();
        let history: Vec<Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(history.len(), 1);
    }
}
