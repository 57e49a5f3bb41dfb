//! Walks the configured directories and reports or applies the new mtimes.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use filetime::FileTime;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{FixError, Result};
use crate::extractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only print what would change.
    DryRun,
    /// Set the mtimes.
    Apply,
}

/// What is known about a file while it is processed.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub current_mtime: DateTime<Utc>,
    pub extracted: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unmatched,
    Unchanged,
    Reported,
    Applied,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub scanned: usize,
    pub matched: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Summary {
    /// Counts one processed file. Per-file failures are logged and counted; only a
    /// failure to write the report itself is passed on.
    pub fn record(&mut self, result: Result<Outcome>) -> Result<()> {
        match result {
            Ok(Outcome::Unmatched) => {}
            Ok(Outcome::Unchanged) => {
                self.matched += 1;
                self.unchanged += 1;
            }
            Ok(Outcome::Reported | Outcome::Applied) => {
                self.matched += 1;
                self.changed += 1;
            }
            Err(err @ FixError::Report(_)) => return Err(err),
            Err(err) => {
                self.failed += 1;
                log::error!("{err}");
            }
        }
        Ok(())
    }
}

/// Runs the whole pass, writing report lines to stdout.
pub fn run(config: &Config, mode: Mode) -> Result<Summary> {
    let stdout = io::stdout();
    run_with_output(config, mode, &mut stdout.lock())
}

pub fn run_with_output<W: Write>(config: &Config, mode: Mode, out: &mut W) -> Result<Summary> {
    process_paths(config, walk(config), mode, out)
}

/// Files below the configured directories, each yielded once.
///
/// A file under several overlapping directories belongs to the walk of the first
/// period that contains it.
pub fn walk(config: &Config) -> impl Iterator<Item = PathBuf> + '_ {
    config
        .periods
        .iter()
        .enumerate()
        .flat_map(move |(i, period)| {
            log::debug!("scanning {:?}", period.directory);
            WalkDir::new(&period.directory)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::warn!("{err}");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(move |entry| {
                    !config.periods[..i]
                        .iter()
                        .any(|earlier| earlier.contains(entry.path()))
                })
                .map(walkdir::DirEntry::into_path)
        })
}

pub fn process_paths<W, I>(config: &Config, paths: I, mode: Mode, out: &mut W) -> Result<Summary>
where
    W: Write,
    I: IntoIterator<Item = PathBuf>,
{
    let mut summary = Summary::default();
    for path in paths {
        summary.scanned += 1;
        summary.record(process_file(config, &path, mode, out))?;
    }
    Ok(summary)
}

pub fn process_file<W: Write>(
    config: &Config,
    path: &Path,
    mode: Mode,
    out: &mut W,
) -> Result<Outcome> {
    let record = inspect(config, path)?;
    let Some(target) = record.extracted else {
        log::debug!("{:?} no date found, skipped", record.path);
        return Ok(Outcome::Unmatched);
    };

    // Apply writes whole seconds, so sub-second parts never count as a difference.
    if record.current_mtime.timestamp() == target.timestamp() {
        log::debug!("{:?} already at {}", record.path, target);
        return Ok(Outcome::Unchanged);
    }

    let name = record
        .path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let shown = target.to_rfc3339_opts(SecondsFormat::Secs, false);

    match mode {
        Mode::DryRun => {
            writeln!(out, "would set {name} to {shown}")?;
            Ok(Outcome::Reported)
        }
        Mode::Apply => {
            filetime::set_file_mtime(&record.path, FileTime::from_unix_time(target.timestamp(), 0))
                .map_err(|e| FixError::from_io(&record.path, e))?;
            log::debug!("{:?} mtime {} -> {}", record.path, record.current_mtime, shown);
            writeln!(out, "set {name} to {shown}")?;
            Ok(Outcome::Applied)
        }
    }
}

/// Reads the current mtime and extracts the target date for `path`.
pub fn inspect(config: &Config, path: &Path) -> Result<FileRecord> {
    let meta = fs::metadata(path).map_err(|e| FixError::from_io(path, e))?;
    let mtime = FileTime::from_last_modification_time(&meta);
    let current_mtime = DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds())
        .ok_or_else(|| {
            FixError::from_io(
                path,
                io::Error::new(io::ErrorKind::InvalidData, "mtime out of range"),
            )
        })?;

    Ok(FileRecord {
        path: path.to_path_buf(),
        current_mtime,
        extracted: extractor::extract(config, path, current_mtime),
    })
}
