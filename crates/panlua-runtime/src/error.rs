//! Error types for binding construction and call dispatch
//!
//! Engine results (load/call status codes, type tags) are never represented
//! here. They come back from dispatch as plain integers.

use crate::ffi::marshal::MarshalError;
use thiserror::Error;

/// Failure to construct a [`Lua`](crate::Lua) binding
///
/// Always raised from the constructor; a binding that exists has every
/// entry point resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// No candidate file for the identifier could be located or loaded
    #[error("Lua library not found: {0}")]
    LibraryNotFound(String),

    /// A candidate file was located but the system loader rejected it
    #[error("Failed to load library '{library}': {reason}")]
    LoadFailed { library: String, reason: String },

    /// A required entry point is absent from the loaded library
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },
}

/// Failure to perform a native call at all
///
/// These indicate a contract bug on the caller's side of the boundary, not a
/// condition reported by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// An argument could not be marshaled into its native representation
    #[error("Marshal error: {0}")]
    Marshal(#[from] MarshalError),

    /// `luaL_newstate` returned the null address
    #[error("Engine could not allocate a new state")]
    NullState,

    /// A continuation was passed to a call after it had been released
    #[error("Continuation has already been released")]
    ReleasedContinuation,
}
