//! Sets file modification times from dates found in file and directory names.
//!
//! Each configured period names a directory, a [`pattern::DatePattern`] and a
//! timezone. Files below the directory whose path matches get their mtime set to
//! the extracted date, or in dry-run mode only reported.

pub mod config;
pub mod error;
pub mod extractor;
pub mod fixer;
pub mod pattern;

pub use config::{Config, PeriodConfig};
pub use error::{FixError, Result};
pub use fixer::{FileRecord, Mode, Summary};
