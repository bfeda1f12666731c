use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Tunables for the persistence engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Indent structured artifacts
    pub pretty_json: bool,
    /// Sub-directory levels scanned below the load directory; `Some(0)` scans
    /// only its top level, `None` is unlimited
    pub max_depth: Option<usize>,
    /// Follow symbolic links while scanning on load
    pub follow_links: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            pretty_json: false,
            max_depth: None,
            follow_links: false,
        }
    }
}

impl PersistenceConfig {
    /// Build from `CALIBRATION_*` environment variables, falling back to defaults
    pub fn from_env() -> StoreResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            pretty_json: env_or("CALIBRATION_PRETTY_JSON", defaults.pretty_json)?,
            max_depth: match env::var("CALIBRATION_MAX_SCAN_DEPTH") {
                Ok(v) => Some(parse_var("CALIBRATION_MAX_SCAN_DEPTH", &v)?),
                Err(_) => defaults.max_depth,
            },
            follow_links: env_or("CALIBRATION_FOLLOW_LINKS", defaults.follow_links)?,
        })
    }

    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => parse_var(key, &v),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| StoreError::Config(format!("{}={:?}: {}", key, value, e)))
}
