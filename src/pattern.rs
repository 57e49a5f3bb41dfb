//! Declarative date patterns.
//!
//! A pattern looks at a file path (and the directory of the period it belongs to)
//! and either yields the date components it found or nothing. No filesystem access
//! happens here.

use std::path::{Component, Path};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use serde::Deserialize;

use crate::error::{FixError, Result};

/// Date components read from a path. Anything missing is filled in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateParts {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DateParts {
    fn is_valid(&self) -> bool {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .is_some()
            && NaiveTime::from_hms_opt(
                self.hour.unwrap_or(0),
                self.minute.unwrap_or(0),
                self.second.unwrap_or(0),
            )
            .is_some()
    }

    /// Builds a naive datetime.
    ///
    /// Missing month and day come from `fallback` if given, else 1. Without an hour
    /// the time of day comes from `fallback`, else midnight. Returns `None` when the
    /// combination is not a calendar date (day 31 borrowed into February, say).
    pub fn to_naive(&self, fallback: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        let month = self
            .month
            .or_else(|| fallback.map(|f| f.month()))
            .unwrap_or(1);
        let day = self.day.or_else(|| fallback.map(|f| f.day())).unwrap_or(1);
        let date = NaiveDate::from_ymd_opt(self.year, month, day)?;

        let time = match (self.hour, fallback) {
            (Some(hour), _) => {
                NaiveTime::from_hms_opt(hour, self.minute.unwrap_or(0), self.second.unwrap_or(0))?
            }
            (None, Some(f)) => NaiveTime::from_hms_opt(f.hour(), f.minute(), f.second())?,
            (None, None) => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        Some(date.and_time(time))
    }
}

/// Where a regex pattern is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexTarget {
    /// File name with extension.
    #[default]
    Name,
    /// File name without extension.
    Stem,
    /// Name of the directory holding the file.
    Dir,
    /// Path relative to the period directory, `/`-separated.
    Path,
}

#[derive(Debug, Clone)]
pub enum DatePattern {
    /// `YYYYMMDD_HHMMSS` starting at the first digit of the stem,
    /// e.g. `IMG_20191127_194031.jpg` or `PXL_20230906_111508295.jpg`.
    DateTimeInName,
    /// `YYYYMMDD` or `YYYY-MM-DD` starting at the first digit of the stem,
    /// e.g. `VID-20200412-WA0000.mp4`.
    DateInName,
    /// Nearest enclosing directory whose name starts with a year, read as
    /// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`, e.g. `2019-06-01_trip/img001.jpg`.
    DateInDir,
    /// Named groups `year` (required), `month`, `day`, `hour`, `minute`, `second`.
    Regex { regex: Regex, target: RegexTarget },
}

const GROUPS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

impl DatePattern {
    pub fn regex(source: &str, target: RegexTarget) -> Result<Self> {
        let regex = Regex::new(source)
            .map_err(|e| FixError::Config(format!("Invalid pattern {source:?}: {e}")))?;
        if !regex.capture_names().flatten().any(|name| name == "year") {
            return Err(FixError::Config(format!(
                "Pattern {source:?} has no named group `year`"
            )));
        }
        Ok(DatePattern::Regex { regex, target })
    }

    /// Applies the pattern to `path`, a file somewhere below `root`.
    pub fn extract(&self, path: &Path, root: &Path) -> Option<DateParts> {
        match self {
            DatePattern::DateTimeInName => {
                let stem = from_first_digit(path.file_stem()?.to_str()?)?;
                parse_layout(stem, "YYYYMMDD_hhmmss")
            }
            DatePattern::DateInName => {
                let stem = from_first_digit(path.file_stem()?.to_str()?)?;
                ["YYYYMMDD", "YYYY-MM-DD"]
                    .iter()
                    .find_map(|layout| parse_layout(stem, layout))
            }
            DatePattern::DateInDir => {
                let dir = path
                    .parent()?
                    .ancestors()
                    .take_while(|dir| dir.starts_with(root))
                    .filter_map(|dir| dir.file_name()?.to_str())
                    .find(|name| starts_with_year(name))?;
                ["YYYY-MM-DD", "YYYY-MM", "YYYY"]
                    .iter()
                    .find_map(|layout| parse_layout(dir, layout))
            }
            DatePattern::Regex { regex, target } => {
                let text = target_text(path, root, *target)?;
                let caps = regex.captures(&text)?;
                let mut values = [None; 6];
                for (value, group) in values.iter_mut().zip(GROUPS) {
                    if let Some(m) = caps.name(group) {
                        *value = Some(m.as_str().parse::<u32>().ok()?);
                    }
                }
                let parts = DateParts {
                    year: i32::try_from(values[0]?).ok()?,
                    month: values[1],
                    day: values[2],
                    hour: values[3],
                    minute: values[4],
                    second: values[5],
                };
                parts.is_valid().then_some(parts)
            }
        }
    }
}

fn from_first_digit(s: &str) -> Option<&str> {
    s.find(|c: char| c.is_ascii_digit()).map(|i| &s[i..])
}

fn starts_with_year(name: &str) -> bool {
    name.len() >= 4 && name.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

fn target_text(path: &Path, root: &Path, target: RegexTarget) -> Option<String> {
    let text = match target {
        RegexTarget::Name => path.file_name()?.to_str()?.to_owned(),
        RegexTarget::Stem => path.file_stem()?.to_str()?.to_owned(),
        RegexTarget::Dir => path.parent()?.file_name()?.to_str()?.to_owned(),
        RegexTarget::Path => {
            let relative = path.strip_prefix(root).ok()?;
            let mut parts = Vec::new();
            for component in relative.components() {
                if let Component::Normal(part) = component {
                    parts.push(part.to_str()?);
                }
            }
            parts.join("/")
        }
    };
    Some(text)
}

/// Reads a fixed-width prefix of `candidate` described by `layout`.
///
/// `Y` `M` `D` `h` `m` `s` stand for year, month, day, hour, minute and second
/// digits; every other layout character must appear literally.
fn parse_layout(candidate: &str, layout: &str) -> Option<DateParts> {
    let candidate = candidate.get(..layout.len())?;
    let mut fields: [Option<u32>; 6] = [None; 6];
    for (c, l) in candidate.chars().zip(layout.chars()) {
        let slot = match l {
            'Y' => 0,
            'M' => 1,
            'D' => 2,
            'h' => 3,
            'm' => 4,
            's' => 5,
            literal => {
                if c != literal {
                    return None;
                }
                continue;
            }
        };
        let digit = c.to_digit(10)?;
        fields[slot] = Some(fields[slot].unwrap_or(0) * 10 + digit);
    }
    let parts = DateParts {
        year: i32::try_from(fields[0]?).ok()?,
        month: fields[1],
        day: fields[2],
        hour: fields[3],
        minute: fields[4],
        second: fields[5],
    };
    parts.is_valid().then_some(parts)
}
