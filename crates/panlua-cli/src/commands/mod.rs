//! Subcommands and the settings they share

pub mod run;
pub mod symbols;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use panlua_config::{library_from_str, ConfigLoader, PanluaConfig};
use panlua_runtime::{LibraryId, Lua};
use std::path::PathBuf;
use tracing::debug;

/// Library selection flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct LibraryArgs {
    /// Library file path or short name (e.g. lua5.4)
    #[arg(long = "lib", value_name = "PATH|NAME", conflicts_with = "lua_version")]
    pub lib: Option<String>,

    /// Lua version as two digits (e.g. 54)
    #[arg(long, value_name = "NN")]
    pub lua_version: Option<u32>,

    /// Extra directory to search for the library (repeatable)
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,
}

impl LibraryArgs {
    /// Layer these flags over loaded settings
    pub fn apply(&self, settings: &mut PanluaConfig) -> Result<()> {
        if let Some(version) = self.lua_version {
            settings.select_library(LibraryId::Version(version));
        }
        if let Some(lib) = &self.lib {
            settings.select_library(library_from_str(lib));
        }
        if !self.search_paths.is_empty() {
            let library = settings.library.get_or_insert_with(Default::default);
            let mut paths = self.search_paths.clone();
            paths.extend(library.search_paths.drain(..));
            library.search_paths = paths;
        }
        settings.validate()?;
        Ok(())
    }
}

/// Configuration files, environment, then command-line flags
pub fn load_settings(library: &LibraryArgs, cli_config: &Config) -> Result<PanluaConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli_config.global_config {
        loader = loader.with_global_config(path);
    }

    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let mut settings = loader
        .load_from_directory(&cwd)
        .context("Failed to load configuration")?;
    debug!(files = ?loader.loaded_files(), "configuration loaded");

    library.apply(&mut settings)?;
    Ok(settings)
}

/// Bind the library the settings select
pub fn bind(settings: &PanluaConfig) -> Result<Lua> {
    let id = settings.library_id();
    Lua::open_with(&settings.library_loader(), &id)
        .with_context(|| format!("Failed to bind Lua library ({})", id))
}
