//! CLI configuration via environment variables
//!
//! Settings that shape the process itself rather than which library is
//! bound; library selection lives in panlua-config.

use std::env;
use std::path::PathBuf;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Log filter directives (PANLUA_LOG, e.g. "panlua_runtime=debug")
    pub log_filter: Option<String>,
    /// Global config file replacing ~/.panlua/config.toml (PANLUA_CONFIG)
    pub global_config: Option<PathBuf>,
}

/// Filter used when PANLUA_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            log_filter: env::var("PANLUA_LOG").ok().filter(|v| !v.trim().is_empty()),
            global_config: env::var_os("PANLUA_CONFIG")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Effective log filter; `verbose` raises it to debug
    pub fn log_filter(&self, verbose: bool) -> &str {
        if verbose {
            return "debug";
        }
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
