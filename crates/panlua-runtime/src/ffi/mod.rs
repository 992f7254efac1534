//! Foreign Function Interface (FFI) infrastructure
//!
//! Everything that touches raw addresses lives here:
//! - Library location and loading (`loader`)
//! - Typed call descriptors for the engine's entry points (`symbols`)
//! - Argument marshaling (`marshal`)
//! - Native-callable continuations built from host closures (`callbacks`)
//!
//! # Safety
//!
//! FFI operations involve `unsafe` code and careful memory management.
//! All unsafe code is isolated in this module and in the dispatch layer that
//! calls through it.

pub mod callbacks;
pub mod loader;
pub mod marshal;
pub mod symbols;
pub mod types;

pub use callbacks::{Continuation, TrampolineStatus};
pub use loader::{LibraryId, LibraryLoader, LoadedLibrary, SymbolSource};
pub use marshal::{MarshalError, NativeString};
pub use symbols::REQUIRED_SYMBOLS;
pub use types::{KContext, KFunction, RawState, LUA_MULTRET};
