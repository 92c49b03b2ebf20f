// src/config.rs

//! Configuration loading utilities.
//!
//! Loads `config.toml` (falling back to defaults) and applies `FANOUT_*`
//! environment overrides on top.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Environment variables read by [`apply_env_overrides`].
pub mod env {
    pub const API_KEY: &str = "FANOUT_API_KEY";
    pub const ENDPOINT: &str = "FANOUT_ENDPOINT";
    pub const DRY_RUN: &str = "FANOUT_DRY_RUN";
    pub const POOL_SIZE: &str = "FANOUT_POOL_SIZE";
    pub const MAX_ATTEMPTS: &str = "FANOUT_MAX_ATTEMPTS";
}

/// Load configuration from a TOML file, apply environment overrides and
/// validate the result.
///
/// A missing or unreadable file falls back to defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Override configuration values from the environment.
///
/// `lookup` is `std::env::var` in production. Unparseable numbers are
/// ignored with a warning.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup(env::API_KEY) {
        config.gateway.api_key = key;
    }

    if let Some(endpoint) = lookup(env::ENDPOINT) {
        config.gateway.endpoint = endpoint;
    }

    if let Some(flag) = lookup(env::DRY_RUN) {
        match parse_flag(&flag) {
            Some(dry_run) => config.notifier.dry_run = dry_run,
            None => log::warn!("Ignoring {}={:?}: not a boolean", env::DRY_RUN, flag),
        }
    }

    if let Some(size) = lookup(env::POOL_SIZE) {
        match size.trim().parse() {
            Ok(n) => config.dispatch.pool_size = n,
            Err(e) => log::warn!("Ignoring {}={:?}: {}", env::POOL_SIZE, size, e),
        }
    }

    if let Some(attempts) = lookup(env::MAX_ATTEMPTS) {
        match attempts.trim().parse() {
            Ok(n) => config.notifier.max_attempts = n,
            Err(e) => log::warn!("Ignoring {}={:?}: {}", env::MAX_ATTEMPTS, attempts, e),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
