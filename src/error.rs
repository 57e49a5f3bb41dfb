use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FixError>;

#[derive(Error, Debug)]
pub enum FixError {
    /// Anything wrong with the configuration. Fatal, raised before any file is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied for {path:?}: {source}")]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report: {0}")]
    Report(#[from] io::Error),
}

impl FixError {
    /// Classifies a per-file I/O failure, keeping permission problems distinct.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            FixError::Permission { path, source }
        } else {
            FixError::Io { path, source }
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, FixError::Permission { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_classified() {
        let err = FixError::from_io(
            "/x/a.jpg",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(err.is_permission());

        let err = FixError::from_io("/x/a.jpg", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_permission());
        assert!(err.to_string().contains("a.jpg"));
    }
}
