//! Retry-interval configuration: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DirlockError, Result};
use crate::lock::driver::BackoffPolicy;

/// Full directory-lock configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LockConfig {
    pub backoff: BackoffConfig,
}

/// Retry intervals for the indefinite acquisition loop.
///
/// Both intervals govern retry pacing only; there is no deadline and no retry
/// limit anywhere in the subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackoffConfig {
    /// Sleep between attempts while another holder has the lock.
    pub contended_ms: u64,
    /// Sleep after an unexpected (non-contention) acquisition error.
    pub faulted_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            contended_ms: 10_000,
            faulted_ms: 60_000,
        }
    }
}

impl LockConfig {
    /// Load config from a TOML file, then apply env overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DirlockError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| DirlockError::io(path, source))?;
        let mut cfg = Self::from_toml_str(&raw)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse config from TOML text without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `DIRLOCK_*` env var overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_from(|name| env::var(name).ok())
    }

    /// Env-override core, parameterized over the variable source so tests can
    /// substitute a map for the process environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        set_env_u64(&lookup, "DIRLOCK_CONTENDED_MS", &mut self.backoff.contended_ms)?;
        set_env_u64(&lookup, "DIRLOCK_FAULTED_MS", &mut self.backoff.faulted_ms)?;
        Ok(())
    }

    /// Reject configurations that would turn the retry loop into a spin loop.
    pub fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("backoff.contended_ms", self.backoff.contended_ms),
            ("backoff.faulted_ms", self.backoff.faulted_ms),
        ] {
            if val == 0 {
                return Err(DirlockError::InvalidConfig {
                    details: format!("{name} must be positive, got 0"),
                });
            }
        }
        Ok(())
    }

    /// Effective retry intervals as durations.
    #[must_use]
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            contended: Duration::from_millis(self.backoff.contended_ms),
            faulted: Duration::from_millis(self.backoff.faulted_ms),
        }
    }
}

fn set_env_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    slot: &mut u64,
) -> Result<()> {
    let Some(raw) = lookup(name).filter(|raw| !raw.trim().is_empty()) else {
        return Ok(());
    };
    *slot = raw
        .trim()
        .parse::<u64>()
        .map_err(|error| DirlockError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    Ok(())
}
