//! DLK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DirlockError>;

/// Top-level error type for the directory-lock subsystem.
///
/// Most failure modes in this crate deliberately do *not* surface here:
/// media-type detection degrades to `false`, and lock contention is retried
/// forever. The variants below cover the handful of conditions that are
/// reported to the immediate caller.
#[derive(Debug, Error)]
pub enum DirlockError {
    #[error("[DLK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DLK-1002] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DLK-1003] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DLK-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[DLK-2001] unable to open directory for locking {path}: {source}")]
    OpenDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DLK-2002] release failure for {path}: {details}")]
    Release { path: PathBuf, details: String },

    #[error("[DLK-2003] no lock held on {path}")]
    NothingToRelease { path: PathBuf },

    #[error("[DLK-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DirlockError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DLK-1001",
            Self::ConfigParse { .. } => "DLK-1002",
            Self::MissingConfig { .. } => "DLK-1003",
            Self::UnsupportedPlatform { .. } => "DLK-1101",
            Self::OpenDir { .. } => "DLK-2001",
            Self::Release { .. } => "DLK-2002",
            Self::NothingToRelease { .. } => "DLK-2003",
            Self::Io { .. } => "DLK-3001",
        }
    }

    /// Whether the failure is fatal to lock acquisition.
    ///
    /// Only the initial directory open is — everything after it retries
    /// forever inside the driver and never produces an error at all.
    #[must_use]
    pub const fn is_fatal_acquire(&self) -> bool {
        matches!(self, Self::OpenDir { .. } | Self::UnsupportedPlatform { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<toml::de::Error> for DirlockError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<DirlockError> {
        vec![
            DirlockError::InvalidConfig {
                details: String::new(),
            },
            DirlockError::ConfigParse {
                context: "",
                details: String::new(),
            },
            DirlockError::MissingConfig {
                path: PathBuf::new(),
            },
            DirlockError::UnsupportedPlatform {
                details: String::new(),
            },
            DirlockError::OpenDir {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "test"),
            },
            DirlockError::Release {
                path: PathBuf::new(),
                details: String::new(),
            },
            DirlockError::NothingToRelease {
                path: PathBuf::new(),
            },
            DirlockError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_dlk_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("DLK-"),
                "code {} must start with DLK-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = DirlockError::OpenDir {
            path: PathBuf::from("/srv/plots"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("DLK-2001"),
            "display should contain error code: {msg}"
        );
        assert!(
            msg.contains("/srv/plots"),
            "display should contain path: {msg}"
        );
    }

    #[test]
    fn only_open_and_platform_failures_are_fatal_to_acquire() {
        for err in &all_variants() {
            let fatal = matches!(
                err,
                DirlockError::OpenDir { .. } | DirlockError::UnsupportedPlatform { .. }
            );
            assert_eq!(err.is_fatal_acquire(), fatal, "mismatch for {}", err.code());
        }
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: DirlockError = toml_err.into();
        assert_eq!(err.code(), "DLK-1002");
    }

    #[test]
    fn io_convenience_constructor() {
        let err = DirlockError::io(
            "/srv/plots/lock.toml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.code(), "DLK-3001");
        assert!(err.to_string().contains("/srv/plots/lock.toml"));
    }
}
