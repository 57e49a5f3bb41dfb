//! Turns a file path into a timezone-aware datetime using the configured periods.

use std::path::Path;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::{Config, PeriodConfig};

/// Finds the date for `path`.
///
/// Periods are tried in configuration order; the first one that contains the file
/// and yields an in-range date wins. `None` means the file should be skipped.
pub fn extract(config: &Config, path: &Path, current_mtime: DateTime<Utc>) -> Option<DateTime<Tz>> {
    config
        .periods
        .iter()
        .filter(|period| period.contains(path))
        .find_map(|period| extract_for_period(period, path, current_mtime))
}

pub fn extract_for_period(
    period: &PeriodConfig,
    path: &Path,
    current_mtime: DateTime<Utc>,
) -> Option<DateTime<Tz>> {
    let parts = period.pattern.extract(path, &period.directory)?;

    let fallback = period
        .keep_time
        .then(|| current_mtime.with_timezone(&period.zone).naive_local());
    let Some(naive) = parts.to_naive(fallback) else {
        log::warn!("{:?} date {:?} combined with mtime is not a valid date", path, parts);
        return None;
    };

    if !period.in_range(naive.date()) {
        log::warn!(
            "{:?} date {} is outside the period {:?}..{:?}",
            path,
            naive.date(),
            period.start,
            period.end
        );
        return None;
    }

    localize(naive, period.zone).or_else(|| {
        log::warn!("{:?} local time {} does not exist in {}", path, naive, period.zone);
        None
    })
}

/// Attaches `zone` to a wall-clock time. Ambiguous times take the earlier instant,
/// times skipped by a DST jump give `None`.
pub fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::DatePattern;
    use chrono::NaiveDate;
    use chrono_tz::Europe::Berlin;
    use std::path::PathBuf;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn period(dir: &str, pattern: DatePattern, zone: Tz) -> PeriodConfig {
        PeriodConfig {
            directory: PathBuf::from(dir),
            pattern,
            zone,
            start: None,
            end: None,
            keep_time: false,
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 17, 45, 30).unwrap()
    }

    #[test]
    fn berlin_trip_folder() {
        let config = Config {
            system_zone: Tz::UTC,
            periods: vec![period("/photos", DatePattern::DateInDir, Berlin)],
        };
        let dt = extract(&config, Path::new("/photos/2019-06-01_trip/img001.jpg"), epoch()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2019-06-01T00:00:00+02:00");
    }

    #[test]
    fn first_matching_period_wins() {
        let config = Config {
            system_zone: Tz::UTC,
            periods: vec![
                period("/photos/phone", DatePattern::DateTimeInName, chrono_tz::Asia::Tokyo),
                period("/photos", DatePattern::DateInName, Berlin),
            ],
        };

        let dt = extract(&config, Path::new("/photos/phone/IMG_20200101_120000.jpg"), epoch()).unwrap();
        assert_eq!(dt.timezone(), chrono_tz::Asia::Tokyo);

        // Falls through to the outer period when the inner pattern does not apply.
        let dt = extract(&config, Path::new("/photos/phone/VID-20200412-WA0000.mp4"), epoch()).unwrap();
        assert_eq!(dt.timezone(), Berlin);

        assert_eq!(extract(&config, Path::new("/music/20200412.mp3"), epoch()), None);
    }

    #[test]
    fn keep_time_uses_current_mtime() {
        let mut p = period("/p", DatePattern::DateInName, Berlin);
        p.keep_time = true;
        let dt = extract_for_period(&p, Path::new("/p/VID-20200412-WA0000.mp4"), epoch()).unwrap();
        // 17:45:30 UTC in March is 18:45:30 in Berlin.
        assert_eq!(dt.naive_local(), naive(2020, 4, 12, 18, 45, 30));
    }

    #[test]
    fn out_of_range_dates_are_skipped() {
        let mut p = period("/p", DatePattern::DateInName, Berlin);
        p.start = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert_eq!(extract_for_period(&p, Path::new("/p/20200412.jpg"), epoch()), None);
        assert!(extract_for_period(&p, Path::new("/p/20210412.jpg"), epoch()).is_some());
    }

    #[test]
    fn dst_edges() {
        // 02:30 on the spring-forward night does not exist in Berlin.
        assert_eq!(localize(naive(2021, 3, 28, 2, 30, 0), Berlin), None);
        // 02:30 on the fall-back night happens twice; the first one (CEST) is used.
        let dt = localize(naive(2021, 10, 31, 2, 30, 0), Berlin).unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-10-31T02:30:00+02:00");
    }
}
