//! Call descriptors for the engine's entry points
//!
//! The full set is declared once in [`entry_points!`]; each entry names the
//! exported symbol and the exact `extern "C"` signature it is called with.
//! Resolution happens in one pass at binding construction and stops at the
//! first missing symbol.

use crate::error::BindingError;
use crate::ffi::loader::SymbolSource;
use crate::ffi::types::{KContext, KFunction, RawState};
use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use tracing::debug;

macro_rules! entry_points {
    ($( $field:ident = $symbol:literal : $ty:ty; )*) => {
        /// Typed call descriptors, one per bound entry point
        #[derive(Clone, Copy)]
        pub(crate) struct EntryPoints {
            $( pub(crate) $field: $ty, )*
        }

        /// Every native symbol a binding resolves, in resolution order
        pub const REQUIRED_SYMBOLS: &[&str] = &[$($symbol),*];

        impl EntryPoints {
            pub(crate) fn resolve(source: &dyn SymbolSource) -> Result<Self, BindingError> {
                Ok(Self {
                    $( $field: unsafe { resolve_one::<$ty>(source, $symbol)? }, )*
                })
            }

            /// Symbol name and resolved address of every entry point
            pub(crate) fn addresses(&self) -> Vec<(&'static str, *mut c_void)> {
                vec![$( ($symbol, self.$field as *mut c_void), )*]
            }
        }
    };
}

entry_points! {
    new_state = "luaL_newstate": unsafe extern "C" fn() -> RawState;
    close = "lua_close": unsafe extern "C" fn(RawState);
    open_libs = "luaL_openlibs": unsafe extern "C" fn(RawState);
    load_file_x = "luaL_loadfilex": unsafe extern "C" fn(RawState, *const c_char, *const c_char) -> c_int;
    load_string = "luaL_loadstring": unsafe extern "C" fn(RawState, *const c_char) -> c_int;
    pcall_k = "lua_pcallk": unsafe extern "C" fn(RawState, c_int, c_int, c_int, KContext, Option<KFunction>) -> c_int;
    get_table = "lua_gettable": unsafe extern "C" fn(RawState, c_int) -> c_int;
    set_table = "lua_settable": unsafe extern "C" fn(RawState, c_int);
    get_top = "lua_gettop": unsafe extern "C" fn(RawState) -> c_int;
    set_top = "lua_settop": unsafe extern "C" fn(RawState, c_int);
    create_table = "lua_createtable": unsafe extern "C" fn(RawState, c_int, c_int);
    new_userdata_uv = "lua_newuserdatauv": unsafe extern "C" fn(RawState, usize, c_int) -> *mut c_void;
    push_string = "lua_pushstring": unsafe extern "C" fn(RawState, *const c_char) -> *const c_char;
    push_number = "lua_pushnumber": unsafe extern "C" fn(RawState, f64);
    push_integer = "lua_pushinteger": unsafe extern "C" fn(RawState, i64);
    set_field = "lua_setfield": unsafe extern "C" fn(RawState, c_int, *const c_char);
    get_field = "lua_getfield": unsafe extern "C" fn(RawState, c_int, *const c_char) -> c_int;
    set_global = "lua_setglobal": unsafe extern "C" fn(RawState, *const c_char);
    get_global = "lua_getglobal": unsafe extern "C" fn(RawState, *const c_char) -> c_int;
    type_of = "lua_type": unsafe extern "C" fn(RawState, c_int) -> c_int;
    to_number_x = "lua_tonumberx": unsafe extern "C" fn(RawState, c_int, *mut c_int) -> f64;
    to_integer_x = "lua_tointegerx": unsafe extern "C" fn(RawState, c_int, *mut c_int) -> i64;
    to_lstring = "lua_tolstring": unsafe extern "C" fn(RawState, c_int, *mut usize) -> *const c_char;
}

/// Resolve one symbol and reinterpret its address as the declared signature
///
/// # Safety
///
/// `F` must be the function-pointer type the library actually exports under
/// `symbol`.
unsafe fn resolve_one<F: Copy>(source: &dyn SymbolSource, symbol: &str) -> Result<F, BindingError> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*mut c_void>());

    let address = source
        .lookup(symbol)
        .ok_or_else(|| BindingError::SymbolNotFound {
            library: source.describe(),
            symbol: symbol.to_string(),
        })?;

    debug!(symbol, ?address, "resolved entry point");
    Ok(std::mem::transmute_copy::<*mut c_void, F>(&address))
}
