//! panlua runtime - safe bindings to an embedded Lua engine
//!
//! This library lets Rust code drive a Lua shared library through its C API
//! without linking against it at build time:
//! - Library binding: locate the library and resolve every entry point once
//! - Call dispatch: typed wrappers that marshal arguments and return the
//!   engine's results verbatim
//! - Opaque handles for engine instances and engine-managed memory
//! - Continuations: native function pointers backed by Rust closures
//!
//! The engine's own semantics stay external. Status codes and type tags are
//! the engine's, surfaced unchanged; see [`ffi::types`].

/// panlua runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod binding;
mod dispatch;
pub mod error;
pub mod ffi;
pub mod state;

pub use binding::Lua;
pub use error::{BindingError, DispatchError};
pub use ffi::types::{
    status_name, type_name, KContext, KFunction, RawState, LUA_ERRERR, LUA_ERRFILE, LUA_ERRMEM,
    LUA_ERRRUN, LUA_ERRSYNTAX, LUA_MULTRET, LUA_OK, LUA_TBOOLEAN, LUA_TFUNCTION,
    LUA_TLIGHTUSERDATA, LUA_TNIL, LUA_TNONE, LUA_TNUMBER, LUA_TSTRING, LUA_TTABLE, LUA_TTHREAD,
    LUA_TUSERDATA, LUA_YIELD,
};
pub use ffi::{Continuation, LibraryId, LibraryLoader, LoadedLibrary, SymbolSource, TrampolineStatus};
pub use state::{LuaState, NativeAddress};
