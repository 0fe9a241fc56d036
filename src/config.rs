use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const APP_TITLE: &str = "NBA Player Stats Explorer";

/// Seasons offered by the year selector (inclusive).
pub const FIRST_SEASON: u16 = 1950;
pub const LAST_SEASON: u16 = 2020;

pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com/leagues";
pub const DATA_SOURCE_URL: &str = "https://www.basketball-reference.com/leagues/";
pub const USER_AGENT: &str = concat!("nba-stats-explorer/", env!("CARGO_PKG_VERSION"));

/// File name offered for the CSV download.
pub const DOWNLOAD_FILE_NAME: &str = "playerstats.csv";

/// Column names on the per-game page. Older pages use `Tm`, newer ones `Team`.
pub const TEAM_COLUMNS: &[&str] = &["Tm", "Team"];
pub const POSITION_COLUMN: &str = "Pos";
pub const RANK_COLUMN: &str = "Rk";
/// Repeated header bands carry this text in their `Age` cell.
pub const AGE_COLUMN: &str = "Age";

/// Seasons in selector order, newest first.
pub fn seasons() -> impl Iterator<Item = u16> {
    (FIRST_SEASON..=LAST_SEASON).rev()
}

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// Settings that can be overridden from the environment.
///
/// | variable                     | default                   |
/// |------------------------------|---------------------------|
/// | `NBA_EXPLORER_BASE_URL`      | [`DEFAULT_BASE_URL`]      |
/// | `NBA_EXPLORER_TIMEOUT_SECS`  | 30                        |
/// | `NBA_EXPLORER_BANNER`        | `back.png`                |
/// | `NBA_EXPLORER_SCRATCH_CSV`   | `output.csv`              |
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Duration,
    /// Banner image shown above the sidebar; optional.
    pub banner_path: PathBuf,
    /// Scratch file the heatmap round-trips the filtered table through.
    pub scratch_csv: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            banner_path: PathBuf::from("back.png"),
            scratch_csv: PathBuf::from("output.csv"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        if let Some(url) = lookup("NBA_EXPLORER_BASE_URL") {
            settings.base_url = url;
        }
        if let Some(raw) = lookup("NBA_EXPLORER_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => settings.timeout = Duration::from_secs(secs),
                _ => log::warn!("Ignoring NBA_EXPLORER_TIMEOUT_SECS={raw:?}"),
            }
        }
        if let Some(path) = lookup("NBA_EXPLORER_BANNER") {
            settings.banner_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("NBA_EXPLORER_SCRATCH_CSV") {
            settings.scratch_csv = PathBuf::from(path);
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn seasons_run_newest_first() {
        let all: Vec<u16> = seasons().collect();
        assert_eq!(all.first(), Some(&2020));
        assert_eq!(all.last(), Some(&1950));
        assert_eq!(all.len(), 71);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NBA_EXPLORER_BASE_URL", "http://localhost:8080"),
            ("NBA_EXPLORER_TIMEOUT_SECS", "5"),
            ("NBA_EXPLORER_SCRATCH_CSV", "/tmp/scratch.csv"),
        ]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.scratch_csv, PathBuf::from("/tmp/scratch.csv"));
        assert_eq!(settings.banner_path, PathBuf::from("back.png"));
    }

    #[test]
    fn bad_timeout_keeps_default() {
        let settings = Settings::from_lookup(|k| {
            (k == "NBA_EXPLORER_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(settings.timeout, Settings::default().timeout);
    }
}
