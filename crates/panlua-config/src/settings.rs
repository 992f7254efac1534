//! Configuration file schema (panlua.toml and ~/.panlua/config.toml)
//!
//! Both files share one schema. Every field is optional so that a file only
//! states what it wants to change; [`PanluaConfig::merge`] layers them.

use crate::{ConfigError, ConfigResult};
use panlua_runtime::{LibraryId, LibraryLoader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lua version bound when nothing selects a library
pub const DEFAULT_LUA_VERSION: u32 = 54;

/// Load modes understood by `luaL_loadfilex`
const LOAD_MODE_CHARS: &[char] = &['b', 't'];

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PanluaConfig {
    /// Which engine library to bind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,

    /// How scripts are loaded and run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfig>,
}

/// `[library]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Lua version as two digits (54 for Lua 5.4)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// Short library name, decorated per platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Explicit library file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Extra directories searched before the platform defaults
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

/// `[run]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Chunk mode for file loading: "b", "t" or "bt"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Open the standard libraries on new states (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_libs: Option<bool>,
}

impl PanluaConfig {
    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse and validate configuration text; `origin` names it in errors
    pub fn parse(content: &str, origin: &Path) -> ConfigResult<Self> {
        let config: PanluaConfig =
            toml::from_str(content).map_err(|error| ConfigError::TomlParseError {
                file: origin.to_path_buf(),
                error,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(library) = &self.library {
            library.validate()?;
        }
        if let Some(run) = &self.run {
            run.validate()?;
        }
        Ok(())
    }

    /// Layer `overlay` on top of `self`; fields set in `overlay` win
    pub fn merge(self, overlay: PanluaConfig) -> PanluaConfig {
        PanluaConfig {
            library: merge_option(self.library, overlay.library, LibraryConfig::merge),
            run: merge_option(self.run, overlay.run, RunConfig::merge),
        }
    }

    /// The library this configuration selects, defaulting to Lua 5.4
    pub fn library_id(&self) -> LibraryId {
        self.library
            .as_ref()
            .and_then(LibraryConfig::library_id)
            .unwrap_or(LibraryId::Version(DEFAULT_LUA_VERSION))
    }

    /// Configured extra search directories, highest priority first
    pub fn search_paths(&self) -> &[PathBuf] {
        self.library
            .as_ref()
            .map(|l| l.search_paths.as_slice())
            .unwrap_or(&[])
    }

    /// A loader whose search order puts the configured directories after
    /// the working directory and ahead of the platform defaults
    pub fn library_loader(&self) -> LibraryLoader {
        let mut loader = LibraryLoader::new();
        // add_search_path inserts at a fixed slot, so add in reverse
        for path in self.search_paths().iter().rev() {
            loader.add_search_path(path.clone());
        }
        loader
    }

    /// Load mode passed to the file loader; `None` means the engine default
    pub fn load_mode(&self) -> Option<&str> {
        self.run.as_ref().and_then(|r| r.mode.as_deref())
    }

    /// Whether new states get the standard libraries
    pub fn open_libs(&self) -> bool {
        self.run.as_ref().and_then(|r| r.open_libs).unwrap_or(true)
    }

    /// Select a library, replacing any earlier selection
    pub fn select_library(&mut self, id: LibraryId) {
        self.library
            .get_or_insert_with(LibraryConfig::default)
            .select(id);
    }

    /// Override the load mode
    pub fn set_load_mode(&mut self, mode: impl Into<String>) -> ConfigResult<()> {
        let mode = mode.into();
        validate_mode(&mode)?;
        self.run.get_or_insert_with(RunConfig::default).mode = Some(mode);
        Ok(())
    }

    /// Override whether standard libraries are opened
    pub fn set_open_libs(&mut self, open: bool) {
        self.run.get_or_insert_with(RunConfig::default).open_libs = Some(open);
    }
}

impl LibraryConfig {
    /// The selected library, if this table selects one
    pub fn library_id(&self) -> Option<LibraryId> {
        if let Some(path) = &self.path {
            return Some(LibraryId::Path(path.clone()));
        }
        if let Some(name) = &self.name {
            return Some(LibraryId::Name(name.clone()));
        }
        self.version.map(LibraryId::Version)
    }

    fn select(&mut self, id: LibraryId) {
        self.version = None;
        self.name = None;
        self.path = None;
        match id {
            LibraryId::Version(v) => self.version = Some(v),
            LibraryId::Name(n) => self.name = Some(n),
            LibraryId::Path(p) => self.path = Some(p),
        }
    }

    fn has_selector(&self) -> bool {
        self.version.is_some() || self.name.is_some() || self.path.is_some()
    }

    fn validate(&self) -> ConfigResult<()> {
        let selectors = [
            self.version.is_some(),
            self.name.is_some(),
            self.path.is_some(),
        ];
        if selectors.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::InvalidValue {
                field: "library".to_string(),
                reason: "set at most one of 'version', 'name' or 'path'".to_string(),
            });
        }
        if let Some(version) = self.version {
            validate_version(version)?;
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "library.name".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    // The selector moves as a unit; search paths accumulate with the
    // overlay's directories first.
    fn merge(self, overlay: LibraryConfig) -> LibraryConfig {
        let (version, name, path) = if overlay.has_selector() {
            (overlay.version, overlay.name, overlay.path)
        } else {
            (self.version, self.name, self.path)
        };
        let mut search_paths = overlay.search_paths;
        for dir in self.search_paths {
            if !search_paths.contains(&dir) {
                search_paths.push(dir);
            }
        }
        LibraryConfig {
            version,
            name,
            path,
            search_paths,
        }
    }
}

impl RunConfig {
    fn validate(&self) -> ConfigResult<()> {
        match &self.mode {
            Some(mode) => validate_mode(mode),
            None => Ok(()),
        }
    }

    fn merge(self, overlay: RunConfig) -> RunConfig {
        RunConfig {
            mode: overlay.mode.or(self.mode),
            open_libs: overlay.open_libs.or(self.open_libs),
        }
    }
}

fn merge_option<T>(base: Option<T>, overlay: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(merge(base, overlay)),
        (base, overlay) => overlay.or(base),
    }
}

pub(crate) fn validate_version(version: u32) -> ConfigResult<()> {
    if !(10..=99).contains(&version) {
        return Err(ConfigError::InvalidValue {
            field: "library.version".to_string(),
            reason: format!("expected two digits such as 54, got {}", version),
        });
    }
    Ok(())
}

fn validate_mode(mode: &str) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: "run.mode".to_string(),
        reason: format!("{} (got {:?})", reason, mode),
    };

    if mode.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let mut seen = Vec::with_capacity(LOAD_MODE_CHARS.len());
    for c in mode.chars() {
        if !LOAD_MODE_CHARS.contains(&c) {
            return Err(invalid("only 'b' and 't' are allowed"));
        }
        if seen.contains(&c) {
            return Err(invalid("each mode letter may appear once"));
        }
        seen.push(c);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(content: &str) -> ConfigResult<PanluaConfig> {
        PanluaConfig::parse(content, Path::new("panlua.toml"))
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, PanluaConfig::default());
        assert_eq!(config.library_id(), LibraryId::Version(54));
        assert!(config.open_libs());
        assert_eq!(config.load_mode(), None);
        assert!(config.search_paths().is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[library]
name = "lua5.4"
search_paths = ["/opt/lua/lib"]

[run]
mode = "t"
open_libs = false
"#,
        )
        .unwrap();

        assert_eq!(config.library_id(), LibraryId::Name("lua5.4".to_string()));
        assert_eq!(config.search_paths(), &[PathBuf::from("/opt/lua/lib")]);
        assert_eq!(config.load_mode(), Some("t"));
        assert!(!config.open_libs());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("[library]\nflavour = \"luajit\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
        assert!(err.to_string().contains("flavour"), "{}", err);
    }

    #[test]
    fn test_two_selectors_rejected() {
        let err = parse("[library]\nversion = 54\nname = \"lua\"\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "library"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[rstest]
    #[case("b", true)]
    #[case("t", true)]
    #[case("bt", true)]
    #[case("tb", true)]
    #[case("", false)]
    #[case("x", false)]
    #[case("bb", false)]
    #[case("btb", false)]
    fn test_mode_validation(#[case] mode: &str, #[case] ok: bool) {
        let content = format!("[run]\nmode = {:?}\n", mode);
        assert_eq!(parse(&content).is_ok(), ok, "mode {:?}", mode);
    }

    #[rstest]
    #[case(54, true)]
    #[case(51, true)]
    #[case(5, false)]
    #[case(540, false)]
    fn test_version_validation(#[case] version: u32, #[case] ok: bool) {
        let content = format!("[library]\nversion = {}\n", version);
        assert_eq!(parse(&content).is_ok(), ok);
    }

    #[test]
    fn test_merge_selector_moves_as_unit() {
        let base = parse("[library]\npath = \"/a/liblua.so\"\nsearch_paths = [\"/a\"]\n").unwrap();
        let overlay = parse("[library]\nversion = 53\nsearch_paths = [\"/b\", \"/a\"]\n").unwrap();

        let merged = base.merge(overlay);
        let library = merged.library.as_ref().unwrap();
        assert_eq!(library.path, None);
        assert_eq!(merged.library_id(), LibraryId::Version(53));
        assert_eq!(
            merged.search_paths(),
            &[PathBuf::from("/b"), PathBuf::from("/a")]
        );
    }

    #[test]
    fn test_merge_keeps_base_selector_when_overlay_has_none() {
        let base = parse("[library]\nname = \"lua5.3\"\n").unwrap();
        let overlay = parse("[run]\nopen_libs = false\n").unwrap();
        let merged = base.merge(overlay);
        assert_eq!(merged.library_id(), LibraryId::Name("lua5.3".to_string()));
        assert!(!merged.open_libs());
    }

    #[test]
    fn test_merge_run_fields_individually() {
        let base = parse("[run]\nmode = \"b\"\nopen_libs = false\n").unwrap();
        let overlay = parse("[run]\nmode = \"t\"\n").unwrap();
        let merged = base.merge(overlay);
        assert_eq!(merged.load_mode(), Some("t"));
        assert!(!merged.open_libs());
    }

    #[test]
    fn test_select_library_clears_previous() {
        let mut config = parse("[library]\nname = \"lua5.3\"\n").unwrap();
        config.select_library(LibraryId::Path(PathBuf::from("/x/liblua.so")));
        let library = config.library.as_ref().unwrap();
        assert_eq!(library.name, None);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.library_id(),
            LibraryId::Path(PathBuf::from("/x/liblua.so"))
        );
    }

    #[test]
    fn test_set_load_mode_validates() {
        let mut config = PanluaConfig::default();
        assert!(config.set_load_mode("q").is_err());
        assert_eq!(config.load_mode(), None);
        config.set_load_mode("bt").unwrap();
        assert_eq!(config.load_mode(), Some("bt"));
    }

    #[test]
    fn test_library_loader_orders_configured_paths() {
        let config = parse("[library]\nsearch_paths = [\"/first\", \"/second\"]\n").unwrap();
        let loader = config.library_loader();
        let paths = loader.search_paths();
        let first = paths.iter().position(|p| p == Path::new("/first")).unwrap();
        let second = paths.iter().position(|p| p == Path::new("/second")).unwrap();
        assert!(first < second);
        assert!(second < paths.len());
    }

    #[test]
    fn test_serialize_skips_unset_fields() {
        let mut config = PanluaConfig::default();
        config.set_open_libs(false);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(text.trim(), "[run]\nopen_libs = false");
    }
}
