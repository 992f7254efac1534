//! Library binding - one loaded engine library with every entry point resolved
//!
//! A [`Lua`] is built once, resolving the whole fixed symbol set up front, and
//! is immutable afterwards. It is a cheap, thread-shareable handle: every
//! [`LuaState`](crate::LuaState) and [`Continuation`](crate::Continuation)
//! keeps a clone of the binding that produced it.

use crate::error::BindingError;
use crate::ffi::loader::{LibraryId, LibraryLoader, SymbolSource};
use crate::ffi::symbols::{EntryPoints, REQUIRED_SYMBOLS};
use crate::state::NativeAddress;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Resolved binding to an engine library
///
/// # Example
///
/// ```no_run
/// use panlua_runtime::{Lua, LibraryId};
///
/// let lua = Lua::open(&LibraryId::Version(54)).unwrap();
/// let state = lua.new_state().unwrap();
/// state.open_libs();
/// let status = state.do_file("main.lua").unwrap();
/// state.close();
/// # let _ = status;
/// ```
#[derive(Clone)]
pub struct Lua {
    inner: Arc<Binding>,
}

struct Binding {
    entry: EntryPoints,
    label: String,
    // Dropped last: keeps the library mapped while entry points exist
    _source: Box<dyn SymbolSource>,
}

impl Lua {
    /// Attach to the library identified by `id` using the default search paths
    pub fn open(id: &LibraryId) -> Result<Self, BindingError> {
        Self::open_with(&LibraryLoader::new(), id)
    }

    /// Attach to the library for a Lua version, e.g. `54`
    pub fn version(version: u32) -> Result<Self, BindingError> {
        Self::open(&LibraryId::Version(version))
    }

    /// Attach using a caller-configured loader
    pub fn open_with(loader: &LibraryLoader, id: &LibraryId) -> Result<Self, BindingError> {
        let library = loader.load(id)?;
        Self::from_source(library)
    }

    /// Resolve every required entry point from `source`
    ///
    /// Fails with [`BindingError::SymbolNotFound`] naming the first absent
    /// symbol; no partially resolved binding is ever returned.
    pub fn from_source<S: SymbolSource + 'static>(source: S) -> Result<Self, BindingError> {
        let entry = EntryPoints::resolve(&source)?;
        let label = source.describe();
        info!(library = %label, symbols = REQUIRED_SYMBOLS.len(), "engine binding ready");

        Ok(Self {
            inner: Arc::new(Binding {
                entry,
                label,
                _source: Box::new(source),
            }),
        })
    }

    /// Label of the library this binding resolved from
    pub fn library(&self) -> &str {
        &self.inner.label
    }

    /// Whether two handles refer to the same binding
    pub fn same_binding(&self, other: &Lua) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Every bound symbol with the address it resolved to, in resolution order
    pub fn entry_points(&self) -> Vec<(&'static str, NativeAddress)> {
        self.inner
            .entry
            .addresses()
            .into_iter()
            .map(|(symbol, address)| (symbol, NativeAddress::new(address)))
            .collect()
    }

    pub(crate) fn entry(&self) -> &EntryPoints {
        &self.inner.entry
    }
}

impl fmt::Debug for Lua {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lua")
            .field("library", &self.inner.label)
            .finish()
    }
}
