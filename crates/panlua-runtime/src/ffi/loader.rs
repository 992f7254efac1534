//! Dynamic library loading for the engine binding
//!
//! Locates a Lua shared library from a version number, a short name, or an
//! explicit path, using `libloading`. Handles platform-specific library
//! naming conventions and search paths.

use crate::error::BindingError;
use libloading::Library;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identifies which native library a binding attaches to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryId {
    /// Lua version as two digits, e.g. `54` for Lua 5.4
    Version(u32),
    /// Short library name, e.g. `"lua5.4"` → `liblua5.4.so`
    Name(String),
    /// Explicit file path, loaded as-is
    Path(PathBuf),
}

impl LibraryId {
    /// Base names tried for this identifier, before prefix/suffix decoration
    ///
    /// # Examples
    ///
    /// ```
    /// # use panlua_runtime::ffi::LibraryId;
    /// assert_eq!(
    ///     LibraryId::Version(54).base_names(),
    ///     vec!["lua54", "lua5.4", "lua-5.4", "lua"]
    /// );
    /// ```
    pub fn base_names(&self) -> Vec<String> {
        match self {
            LibraryId::Version(version) => {
                let (major, minor) = (version / 10, version % 10);
                vec![
                    format!("lua{}", version),
                    format!("lua{}.{}", major, minor),
                    format!("lua-{}.{}", major, minor),
                    "lua".to_string(),
                ]
            }
            LibraryId::Name(name) => vec![name.clone()],
            LibraryId::Path(path) => vec![path.display().to_string()],
        }
    }

    /// Platform file names for this identifier, in priority order
    ///
    /// - Linux: `lib{name}.so`, then the `lib{name}.so.0` soname
    /// - macOS: `lib{name}.dylib`, then `lib{name}.so`
    /// - Windows: `{name}.dll`, then `lib{name}.dll`
    pub fn file_names(&self) -> Vec<String> {
        if let LibraryId::Path(path) = self {
            return vec![path.display().to_string()];
        }

        let mut names = Vec::new();
        for base in self.base_names() {
            if cfg!(target_os = "windows") {
                names.push(format!("{}.dll", base));
                names.push(format!("lib{}.dll", base));
            } else if cfg!(target_os = "macos") {
                names.push(format!("lib{}.dylib", base));
                names.push(format!("lib{}.so", base));
            } else {
                names.push(format!("lib{}.so", base));
                names.push(format!("lib{}.so.0", base));
            }
        }
        names
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryId::Version(version) => write!(f, "lua version {}", version),
            LibraryId::Name(name) => write!(f, "{}", name),
            LibraryId::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Anything a binding can resolve entry points from
///
/// Implemented for loaded shared libraries; tests and embedders may supply
/// their own table of function addresses. The source is kept alive for as
/// long as the binding that resolved from it.
pub trait SymbolSource: Send + Sync {
    /// Label used in error messages and logs
    fn describe(&self) -> String;

    /// Address of `symbol`, or `None` if absent
    ///
    /// # Safety
    ///
    /// The returned address is only meaningful when interpreted with the
    /// signature the native side actually exports.
    unsafe fn lookup(&self, symbol: &str) -> Option<*mut c_void>;
}

/// A shared library opened by [`LibraryLoader`]
pub struct LoadedLibrary {
    library: Library,
    label: String,
}

impl LoadedLibrary {
    /// Wrap an already-opened library
    pub fn new(library: Library, label: impl Into<String>) -> Self {
        Self {
            library,
            label: label.into(),
        }
    }

    /// The image of the running process, for engines linked statically
    #[cfg(unix)]
    pub fn this() -> Self {
        let library: Library = libloading::os::unix::Library::this().into();
        Self::new(library, "<current process>")
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("label", &self.label)
            .finish()
    }
}

impl SymbolSource for LoadedLibrary {
    fn describe(&self) -> String {
        self.label.clone()
    }

    unsafe fn lookup(&self, symbol: &str) -> Option<*mut c_void> {
        let address = self
            .library
            .get::<*mut c_void>(symbol.as_bytes())
            .ok()
            .map(|sym| *sym)?;
        (!address.is_null()).then_some(address)
    }
}

/// Locates and opens engine libraries
///
/// # Safety
///
/// Loading a dynamic library runs its initialization code inside this
/// process. Callers must only point the loader at trusted libraries.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    /// Directories searched before falling back to the system loader
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a new library loader with default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// A loader searching exactly `search_paths`, in order
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Get platform-specific default library search paths
    ///
    /// Returns standard system library paths for the current platform:
    /// - Linux: /usr/lib, /usr/local/lib, /lib, the multiarch directory
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - Windows: C:\Windows\System32
    /// - All platforms: current working directory
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/lib"));

            let multiarch = format!("/usr/lib/{}-linux-gnu", std::env::consts::ARCH);
            paths.push(PathBuf::from(multiarch));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
            paths.push(PathBuf::from("/usr/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            paths.push(PathBuf::from("C:\\Windows\\System32"));
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        // Current working directory (highest priority)
        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Add a custom search path; it is searched after the working directory
    /// and before the platform defaults
    pub fn add_search_path(&mut self, path: PathBuf) {
        let position = usize::from(!self.search_paths.is_empty());
        self.search_paths.insert(position, path);
    }

    /// Directories searched, in order
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First existing file for `id` across the search paths
    ///
    /// Names are tried in priority order, each across every directory, so a
    /// versioned library anywhere on the path beats a bare `liblua` earlier
    /// on it.
    pub fn locate(&self, id: &LibraryId) -> Option<PathBuf> {
        if let LibraryId::Path(path) = id {
            return path.exists().then(|| path.clone());
        }

        let names = id.file_names();
        let dirs = &self.search_paths;
        names
            .iter()
            .flat_map(|name| dirs.iter().map(move |dir| dir.join(name)))
            .find(|candidate| {
                let found = candidate.exists();
                if !found {
                    debug!(candidate = %candidate.display(), "no library at candidate path");
                }
                found
            })
    }

    /// Load the library identified by `id`
    ///
    /// A file found on the search paths is loaded directly and any loader
    /// failure is reported as [`BindingError::LoadFailed`]. When nothing is
    /// found, each bare file name is offered to the system loader so its own
    /// search rules still apply.
    pub fn load(&self, id: &LibraryId) -> Result<LoadedLibrary, BindingError> {
        if let Some(path) = self.locate(id) {
            return Self::load_path(&path);
        }
        if matches!(id, LibraryId::Path(_)) {
            return Err(BindingError::LibraryNotFound(id.to_string()));
        }

        for name in id.file_names() {
            match unsafe { Library::new(&name) } {
                Ok(library) => {
                    debug!(library = %name, "loaded through system search path");
                    return Ok(LoadedLibrary::new(library, name));
                }
                Err(e) => debug!(library = %name, error = %e, "system loader rejected name"),
            }
        }

        Err(BindingError::LibraryNotFound(id.to_string()))
    }

    fn load_path(path: &Path) -> Result<LoadedLibrary, BindingError> {
        let label = path.display().to_string();
        let library = unsafe {
            Library::new(path).map_err(|e| BindingError::LoadFailed {
                library: label.clone(),
                reason: e.to_string(),
            })?
        };
        debug!(library = %label, "loaded library from file");
        Ok(LoadedLibrary::new(library, label))
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}
