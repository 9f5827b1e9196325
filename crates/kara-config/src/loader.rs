// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based loader.
//!
//! Merge order, later wins: compiled defaults, `/etc/kara/kara.toml`,
//! `$XDG_CONFIG_HOME/kara/kara.toml`, `./kara.toml`, `KARA_*` env vars.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KaraConfig;

/// Top-level sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "agent",
    "provider",
    "rate_limit",
    "storage",
    "imap",
    "smtp",
    "worker",
    "prometheus",
];

/// Config files consulted by [`load_config`], lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/kara/kara.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("kara").join("kara.toml"));
    }
    paths.push(PathBuf::from("kara.toml"));
    paths
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<KaraConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<KaraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KaraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from one explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<KaraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KaraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(KaraConfig::default()));
    for path in config_file_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// `KARA_IMAP_PASSWORD` becomes `imap.password`, `KARA_RATE_LIMIT_COOLDOWN_SECS`
/// becomes `rate_limit.cooldown_secs`.
///
/// Splitting on `_` would break keys such as `max_attempts`, so the section
/// prefix is matched explicitly.
fn env_provider() -> Env {
    Env::prefixed("KARA_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}
