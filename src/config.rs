// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration for the engine and its worker pool.

use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::db;

pub const ENV_DB: &str = "FINLEDGER_DB";
pub const ENV_BUSY_TIMEOUT_MS: &str = "FINLEDGER_BUSY_TIMEOUT_MS";
/// Attempts per unit of work, the first one included.
pub const ENV_MAX_ATTEMPTS: &str = "FINLEDGER_MAX_ATTEMPTS";
pub const ENV_WORKERS: &str = "FINLEDGER_WORKERS";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    /// How long a connection waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
    /// Attempts per unit of work, the first one included.
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff: Duration,
    pub workers: usize,
}

impl EngineConfig {
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: Duration::from_millis(5_000),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(10),
            workers: 4,
        }
    }

    /// Defaults to the platform data dir, overridden by `FINLEDGER_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup(ENV_DB) {
            Some(path) => PathBuf::from(path),
            None => db::default_db_path()?,
        };
        let mut config = Self::with_path(db_path);
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_BUSY_TIMEOUT_MS)? {
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, ENV_MAX_ATTEMPTS)? {
            config.max_attempts = attempts.max(1);
        }
        if let Some(workers) = parse_var::<usize>(&lookup, ENV_WORKERS)? {
            config.workers = workers.max(1);
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
        None => Ok(None),
    }
}
