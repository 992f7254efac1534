//! Native-side types of the Lua 5.4 C API
//!
//! Raw aliases used by the call descriptors plus the engine's status and
//! type-tag codes. The codes are plain `i32` constants: their meaning belongs
//! to the engine, and the binding hands them back to callers verbatim.
//!
//! Type mapping:
//! - `lua_State *`     → [`RawState`]
//! - `lua_KContext`    → [`KContext`] (`intptr_t`)
//! - `lua_KFunction`   → [`KFunction`]
//! - `lua_Number`      → `f64`
//! - `lua_Integer`     → `i64`

use std::ffi::c_void;
use std::os::raw::c_int;

/// Address of a native `lua_State`
pub type RawState = *mut c_void;

/// Continuation context (`lua_KContext`, pointer-width signed integer)
pub type KContext = isize;

/// Continuation function (`lua_KFunction`)
pub type KFunction = unsafe extern "C" fn(RawState, c_int, KContext) -> c_int;

/// Result-count sentinel: "return all results"
pub const LUA_MULTRET: i32 = -1;

// Status codes
pub const LUA_OK: i32 = 0;
pub const LUA_YIELD: i32 = 1;
pub const LUA_ERRRUN: i32 = 2;
pub const LUA_ERRSYNTAX: i32 = 3;
pub const LUA_ERRMEM: i32 = 4;
pub const LUA_ERRERR: i32 = 5;
pub const LUA_ERRFILE: i32 = 6;

// Type tags
pub const LUA_TNONE: i32 = -1;
pub const LUA_TNIL: i32 = 0;
pub const LUA_TBOOLEAN: i32 = 1;
pub const LUA_TLIGHTUSERDATA: i32 = 2;
pub const LUA_TNUMBER: i32 = 3;
pub const LUA_TSTRING: i32 = 4;
pub const LUA_TTABLE: i32 = 5;
pub const LUA_TFUNCTION: i32 = 6;
pub const LUA_TUSERDATA: i32 = 7;
pub const LUA_TTHREAD: i32 = 8;

/// Human-readable name of a status code, for diagnostics only
///
/// # Examples
///
/// ```
/// # use panlua_runtime::ffi::types::{status_name, LUA_ERRFILE, LUA_OK};
/// assert_eq!(status_name(LUA_OK), "ok");
/// assert_eq!(status_name(LUA_ERRFILE), "file error");
/// assert_eq!(status_name(42), "unknown status");
/// ```
pub fn status_name(code: i32) -> &'static str {
    match code {
        LUA_OK => "ok",
        LUA_YIELD => "yield",
        LUA_ERRRUN => "runtime error",
        LUA_ERRSYNTAX => "syntax error",
        LUA_ERRMEM => "memory error",
        LUA_ERRERR => "error in message handler",
        LUA_ERRFILE => "file error",
        _ => "unknown status",
    }
}

/// Name of a type tag, matching the engine's own `lua_typename`
pub fn type_name(tag: i32) -> &'static str {
    match tag {
        LUA_TNONE => "no value",
        LUA_TNIL => "nil",
        LUA_TBOOLEAN => "boolean",
        LUA_TLIGHTUSERDATA | LUA_TUSERDATA => "userdata",
        LUA_TNUMBER => "number",
        LUA_TSTRING => "string",
        LUA_TTABLE => "table",
        LUA_TFUNCTION => "function",
        LUA_TTHREAD => "thread",
        _ => "unknown",
    }
}
