//! Engine configuration, read from the environment.
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `TALLYFORGE_GRAPH_CACHE` | `true` | cache built conversion graphs per (tenant, group) |
//! | `TALLYFORGE_LOG` | `info` | `tracing` filter directive |
//! | `TALLYFORGE_LOG_FORMAT` | `json` | `json` or `plain` log lines |

use core::str::FromStr;

use anyhow::{Context, bail};

pub const GRAPH_CACHE_VAR: &str = "TALLYFORGE_GRAPH_CACHE";
pub const LOG_VAR: &str = "TALLYFORGE_LOG";
pub const LOG_FORMAT_VAR: &str = "TALLYFORGE_LOG_FORMAT";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "plain" | "text" => Ok(LogFormat::Plain),
            other => bail!("unknown log format {other:?} (expected json or plain)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub graph_cache: bool,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            graph_cache: true,
            log_filter: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset variables take their
    /// defaults; malformed ones are errors naming the variable.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(GRAPH_CACHE_VAR) {
            config.graph_cache =
                parse_bool(&raw).with_context(|| format!("invalid {GRAPH_CACHE_VAR}"))?;
        }
        if let Some(raw) = lookup(LOG_VAR) {
            if !raw.trim().is_empty() {
                config.log_filter = raw.trim().to_string();
            }
        }
        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            config.log_format = raw.parse().with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = EngineConfig::from_lookup(lookup(&[
            (GRAPH_CACHE_VAR, "off"),
            (LOG_VAR, "tallyforge_uom=debug"),
            (LOG_FORMAT_VAR, "Plain"),
        ]))
        .unwrap();

        assert!(!config.graph_cache);
        assert_eq!(config.log_filter, "tallyforge_uom=debug");
        assert_eq!(config.log_format, LogFormat::Plain);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = EngineConfig::from_lookup(lookup(&[(GRAPH_CACHE_VAR, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(GRAPH_CACHE_VAR));

        let err = EngineConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).unwrap_err();
        assert!(err.to_string().contains(LOG_FORMAT_VAR));
    }
}
