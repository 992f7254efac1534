//! Configuration Loader
//!
//! Loads the global and project files, then applies environment overrides.

use crate::settings::{validate_version, PanluaConfig};
use crate::{ConfigError, ConfigResult};
use panlua_runtime::LibraryId;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "panlua.toml";

/// Library path or short name
pub const ENV_LIBRARY: &str = "PANLUA_LIBRARY";
/// Two-digit Lua version
pub const ENV_LUA_VERSION: &str = "PANLUA_LUA_VERSION";
/// Extra library directories, in the platform's path-list syntax
pub const ENV_SEARCH_PATH: &str = "PANLUA_SEARCH_PATH";

/// Configuration loader
///
/// Merges configuration with this precedence, lowest first:
/// 1. Global config (~/.panlua/config.toml)
/// 2. Project config (panlua.toml, found by walking up from the start directory)
/// 3. Environment variables (PANLUA_*)
///
/// CLI flags are applied afterwards by the caller.
pub struct ConfigLoader {
    /// Global config path; resolved from the home directory when unset
    global_config_path: Option<PathBuf>,

    /// Files read by the last load, in merge order
    loaded_files: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
            loaded_files: Vec::new(),
        }
    }

    /// Use `path` instead of ~/.panlua/config.toml
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration for a run started in `start_dir`
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<PanluaConfig> {
        self.loaded_files.clear();

        let global = self.load_global_config()?;
        let project = match Self::find_project_config(start_dir) {
            Some(path) => self.read(&path)?,
            None => PanluaConfig::default(),
        };

        let merged = global.merge(project);
        let merged = merged.merge(Self::env_overrides()?);
        merged.validate()?;
        Ok(merged)
    }

    /// Files consulted by the last successful load
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    fn read(&mut self, path: &Path) -> ConfigResult<PanluaConfig> {
        let config = PanluaConfig::load_from_file(path)?;
        debug!(file = %path.display(), "loaded configuration");
        self.loaded_files.push(path.to_path_buf());
        Ok(config)
    }

    /// Nearest panlua.toml at or above `start_dir`
    fn find_project_config(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(PROJECT_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    fn load_global_config(&mut self) -> ConfigResult<PanluaConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match Self::global_config_dir() {
                Ok(dir) => dir.join("config.toml"),
                // No home directory means no global file
                Err(ConfigError::HomeNotFound) => return Ok(PanluaConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(PanluaConfig::default());
        }
        self.read(&path)
    }

    /// Configuration expressed by PANLUA_* variables
    ///
    /// `PANLUA_LIBRARY` beats `PANLUA_LUA_VERSION` when both are set. A
    /// library value containing a path separator is a file path, anything
    /// else a short name.
    pub fn env_overrides() -> ConfigResult<PanluaConfig> {
        let mut config = PanluaConfig::default();

        if let Some(version) = non_empty_var(ENV_LUA_VERSION) {
            let parsed = version
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    field: ENV_LUA_VERSION.to_string(),
                    reason: format!("not a number: {:?}", version),
                })?;
            validate_version(parsed)?;
            config.select_library(LibraryId::Version(parsed));
        }

        if let Some(library) = non_empty_var(ENV_LIBRARY) {
            config.select_library(library_from_str(&library));
        }

        if let Some(list) = env::var_os(ENV_SEARCH_PATH) {
            let dirs: Vec<PathBuf> = env::split_paths(&list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !dirs.is_empty() {
                config
                    .library
                    .get_or_insert_with(Default::default)
                    .search_paths = dirs;
            }
        }

        Ok(config)
    }

    /// Get the global configuration directory (~/.panlua)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".panlua"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a library value from the environment or command line
pub fn library_from_str(value: &str) -> LibraryId {
    let is_path = value.contains('/') || value.contains(std::path::MAIN_SEPARATOR);
    if is_path {
        LibraryId::Path(PathBuf::from(value))
    } else {
        LibraryId::Name(value.to_string())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
