//! Configuration: the system zone and the ordered list of periods.
//!
//! Loaded once at startup into an immutable [`Config`] that is passed around
//! explicitly.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{FixError, Result};
use crate::pattern::{DatePattern, RegexTarget};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MTIME_FIX_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "mtime-fix.toml";

#[derive(Debug, Clone)]
pub struct Config {
    /// Zone used for periods that do not name their own.
    pub system_zone: Tz,
    /// Checked in order, the first period that yields a date wins.
    pub periods: Vec<PeriodConfig>,
}

#[derive(Debug, Clone)]
pub struct PeriodConfig {
    /// Canonical, existing directory.
    pub directory: PathBuf,
    pub pattern: DatePattern,
    pub zone: Tz,
    /// Inclusive date range the extracted date must fall in.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Take missing month, day and time of day from the current mtime.
    pub keep_time: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    system_zone: String,
    #[serde(default)]
    periods: Vec<RawPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeriod {
    directory: PathBuf,
    pattern: RawPattern,
    zone: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(default)]
    keep_time: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Builtin(BuiltinPattern),
    Regex {
        regex: String,
        #[serde(default)]
        target: RegexTarget,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum BuiltinPattern {
    DateTimeInName,
    DateInName,
    DateInDir,
}

/// `$MTIME_FIX_CONFIG`, or `mtime-fix.toml` in the working directory.
pub fn default_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| FixError::Config(format!("Failed to read {path:?}: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| FixError::Config(format!("Failed to parse config: {e}")))?;

        let system_zone = parse_zone(&raw.system_zone)?;
        let periods = raw
            .periods
            .into_iter()
            .map(|period| PeriodConfig::from_raw(period, system_zone))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            system_zone,
            periods,
        })
    }
}

impl PeriodConfig {
    fn from_raw(raw: RawPeriod, system_zone: Tz) -> Result<Self> {
        let directory = fs::canonicalize(&raw.directory).map_err(|e| {
            FixError::Config(format!("Directory {:?} is not accessible: {e}", raw.directory))
        })?;
        if !directory.is_dir() {
            return Err(FixError::Config(format!(
                "{:?} is not a directory",
                raw.directory
            )));
        }

        let zone = match raw.zone {
            Some(zone) => parse_zone(&zone)?,
            None => system_zone,
        };

        if let (Some(start), Some(end)) = (raw.start, raw.end) {
            if start > end {
                return Err(FixError::Config(format!(
                    "Period for {:?} starts ({start}) after it ends ({end})",
                    raw.directory
                )));
            }
        }

        let pattern = match raw.pattern {
            RawPattern::Builtin(BuiltinPattern::DateTimeInName) => DatePattern::DateTimeInName,
            RawPattern::Builtin(BuiltinPattern::DateInName) => DatePattern::DateInName,
            RawPattern::Builtin(BuiltinPattern::DateInDir) => DatePattern::DateInDir,
            RawPattern::Regex { regex, target } => DatePattern::regex(&regex, target)?,
        };

        Ok(Self {
            directory,
            pattern,
            zone,
            start: raw.start,
            end: raw.end,
            keep_time: raw.keep_time,
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.directory)
    }

    pub fn in_range(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| start <= date) && self.end.map_or(true, |end| date <= end)
    }
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| FixError::Config(format!("Unknown timezone {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn toml_path(dir: &Path) -> String {
        dir.display().to_string().replace('\\', "\\\\")
    }

    #[test]
    fn loads_periods_in_order() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let content = format!(
            r#"
system_zone = "Europe/Moscow"

[[periods]]
directory = "{}"
pattern = "date-in-dir"
zone = "Europe/Berlin"
start = "2019-05-01"
end = "2019-06-30"

[[periods]]
directory = "{}"
pattern = {{ regex = '(?P<year>\d{{4}})(?P<month>\d{{2}})', target = "stem" }}
keep_time = true
"#,
            toml_path(a.path()),
            toml_path(b.path())
        );

        let config = Config::from_toml_str(&content).unwrap();
        assert_eq!(config.system_zone, chrono_tz::Europe::Moscow);
        assert_eq!(config.periods.len(), 2);

        let first = &config.periods[0];
        assert!(matches!(first.pattern, DatePattern::DateInDir));
        assert_eq!(first.zone, chrono_tz::Europe::Berlin);
        assert_eq!(first.start, NaiveDate::from_ymd_opt(2019, 5, 1));
        assert!(!first.keep_time);
        assert!(first.in_range(NaiveDate::from_ymd_opt(2019, 6, 30).unwrap()));
        assert!(!first.in_range(NaiveDate::from_ymd_opt(2019, 7, 1).unwrap()));

        let second = &config.periods[1];
        assert!(matches!(
            second.pattern,
            DatePattern::Regex {
                target: RegexTarget::Stem,
                ..
            }
        ));
        assert_eq!(second.zone, chrono_tz::Europe::Moscow);
        assert!(second.keep_time);
        assert_eq!(second.directory, fs::canonicalize(b.path()).unwrap());
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = Config::from_toml_str(r#"system_zone = "Mars/Olympus""#).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let content = format!(
            "system_zone = \"UTC\"\n[[periods]]\ndirectory = \"{}\"\npattern = \"date-in-name\"\n",
            toml_path(&missing)
        );
        assert!(matches!(
            Config::from_toml_str(&content),
            Err(FixError::Config(_))
        ));
    }

    #[test]
    fn rejects_reversed_range_and_bad_pattern() {
        let dir = TempDir::new().unwrap();
        let path = toml_path(dir.path());

        let reversed = format!(
            "system_zone = \"UTC\"\n[[periods]]\ndirectory = \"{path}\"\npattern = \"date-in-name\"\nstart = \"2020-01-02\"\nend = \"2020-01-01\"\n"
        );
        assert!(Config::from_toml_str(&reversed).is_err());

        let unknown = format!(
            "system_zone = \"UTC\"\n[[periods]]\ndirectory = \"{path}\"\npattern = \"date-in-exif\"\n"
        );
        assert!(Config::from_toml_str(&unknown).is_err());

        let no_year = format!(
            "system_zone = \"UTC\"\n[[periods]]\ndirectory = \"{path}\"\npattern = {{ regex = '(?P<day>\\d\\d)' }}\n"
        );
        assert!(Config::from_toml_str(&no_year).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("mtime-fix.toml")).unwrap_err();
        assert!(matches!(err, FixError::Config(_)));
    }
}
