// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./memoria.toml` > `~/.config/memoria/memoria.toml` > `/etc/memoria/memoria.toml`
//! with environment variable overrides via `MEMORIA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MemoriaConfig;

/// Top-level sections, used to turn `MEMORIA_<SECTION>_<KEY>` into `<section>.<key>`.
const SECTIONS: &[&str] = &["general", "provider", "store", "memory", "background"];

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/memoria/memoria.toml";

/// Local config file name, resolved against the working directory.
pub const LOCAL_CONFIG_FILE: &str = "memoria.toml";

/// Path of the per-user XDG config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("memoria").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/memoria/memoria.toml` (system-wide)
/// 3. `~/.config/memoria/memoria.toml` (user XDG config)
/// 4. `./memoria.toml` (local directory)
/// 5. `MEMORIA_*` environment variables
pub fn load_config() -> Result<MemoriaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MemoriaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemoriaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MemoriaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemoriaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MemoriaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `MEMORIA_MEMORY_SIMILARITY_THRESHOLD` must land on
/// `memory.similarity_threshold`, not `memory.similarity.threshold`.
fn env_provider() -> Env {
    Env::prefixed("MEMORIA_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
///
/// Only the first underscore after a known section name becomes a dot.
/// Names without a known section are returned unchanged.
pub fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_first_underscore_only() {
        assert_eq!(
            env_key_to_path("memory_similarity_threshold"),
            "memory.similarity_threshold"
        );
        assert_eq!(env_key_to_path("provider_api_key"), "provider.api_key");
        assert_eq!(
            env_key_to_path("background_task_timeout_secs"),
            "background.task_timeout_secs"
        );
        assert_eq!(env_key_to_path("general_log_level"), "general.log_level");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(env_key_to_path("something_else"), "something_else");
        assert_eq!(env_key_to_path("memory"), "memory");
    }

    #[test]
    fn user_config_path_points_into_memoria_dir() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("memoria/memoria.toml"));
        }
    }
}
