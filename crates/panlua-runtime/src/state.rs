//! Opaque handles over native engine resources
//!
//! A [`LuaState`] is one engine instance. It pairs the raw `lua_State *` with
//! the binding that must be used to operate on it and offers no way to read
//! or write through the address; the only things to do with it are further
//! bound calls and [`LuaState::close`].

use crate::binding::Lua;
use crate::error::DispatchError;
use crate::ffi::callbacks::Continuation;
use crate::ffi::types::{KContext, RawState};
use std::ffi::c_void;
use std::fmt;
use std::path::Path;

/// Handle to one live engine instance
///
/// The handle returned by [`Lua::new_state`] owns the instance and must be
/// released with [`close`](LuaState::close); it is not closed on drop.
/// Handles handed to a [`Continuation`] closure are borrowed views of a
/// state owned elsewhere and are only available by reference.
pub struct LuaState {
    lua: Lua,
    raw: RawState,
}

impl LuaState {
    /// Wrap a raw state address produced by `lua`
    ///
    /// # Safety
    ///
    /// `raw` must be a live `lua_State *` created by the library `lua` is
    /// bound to.
    pub unsafe fn from_raw(lua: Lua, raw: RawState) -> Self {
        Self { lua, raw }
    }

    /// The binding this state belongs to
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// The raw address, for passing to native code outside this binding
    pub fn as_ptr(&self) -> RawState {
        self.raw
    }

    /// Tear the engine instance down (`lua_close`)
    pub fn close(self) {
        let lua = self.lua.clone();
        lua.close(self);
    }

    pub fn open_libs(&self) {
        self.lua.open_libs(self)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<i32, DispatchError> {
        self.lua.load_file(self, path)
    }

    pub fn load_file_x(
        &self,
        path: impl AsRef<Path>,
        mode: Option<&str>,
    ) -> Result<i32, DispatchError> {
        self.lua.load_file_x(self, path, mode)
    }

    pub fn load_string(&self, chunk: &str) -> Result<i32, DispatchError> {
        self.lua.load_string(self, chunk)
    }

    pub fn pcall(&self, nargs: i32, nresults: i32, msgh: i32) -> i32 {
        self.lua.pcall(self, nargs, nresults, msgh)
    }

    pub fn pcall_k(
        &self,
        nargs: i32,
        nresults: i32,
        msgh: i32,
        context: KContext,
        k: Option<&Continuation>,
    ) -> Result<i32, DispatchError> {
        self.lua.pcall_k(self, nargs, nresults, msgh, context, k)
    }

    pub fn do_file(&self, path: impl AsRef<Path>) -> Result<i32, DispatchError> {
        self.lua.do_file(self, path)
    }

    pub fn do_file_x(&self, path: impl AsRef<Path>, mode: Option<&str>) -> Result<i32, DispatchError> {
        self.lua.do_file_x(self, path, mode)
    }

    pub fn do_string(&self, chunk: &str) -> Result<i32, DispatchError> {
        self.lua.do_string(self, chunk)
    }

    pub fn get_table(&self, index: i32) -> i32 {
        self.lua.get_table(self, index)
    }

    pub fn set_table(&self, index: i32) {
        self.lua.set_table(self, index)
    }

    pub fn get_top(&self) -> i32 {
        self.lua.get_top(self)
    }

    pub fn set_top(&self, index: i32) {
        self.lua.set_top(self, index)
    }

    pub fn pop(&self, n: i32) {
        self.lua.pop(self, n)
    }

    pub fn create_table(&self, num_seq: i32, num_ent: i32) {
        self.lua.create_table(self, num_seq, num_ent)
    }

    pub fn new_table(&self) {
        self.lua.new_table(self)
    }

    pub fn new_userdata_uv(&self, size: usize, num_user_values: i32) -> NativeAddress {
        self.lua.new_userdata_uv(self, size, num_user_values)
    }

    pub fn push_string(&self, s: Option<&str>) -> Result<NativeAddress, DispatchError> {
        self.lua.push_string(self, s)
    }

    pub fn push_number(&self, n: f64) {
        self.lua.push_number(self, n)
    }

    pub fn push_integer(&self, n: i64) {
        self.lua.push_integer(self, n)
    }

    pub fn set_field(&self, index: i32, name: Option<&str>) -> Result<(), DispatchError> {
        self.lua.set_field(self, index, name)
    }

    pub fn get_field(&self, index: i32, name: &str) -> Result<i32, DispatchError> {
        self.lua.get_field(self, index, name)
    }

    pub fn set_global(&self, name: Option<&str>) -> Result<(), DispatchError> {
        self.lua.set_global(self, name)
    }

    pub fn get_global(&self, name: &str) -> Result<i32, DispatchError> {
        self.lua.get_global(self, name)
    }

    pub fn type_of(&self, index: i32) -> i32 {
        self.lua.type_of(self, index)
    }

    pub fn to_number(&self, index: i32) -> Option<f64> {
        self.lua.to_number(self, index)
    }

    pub fn to_integer(&self, index: i32) -> Option<i64> {
        self.lua.to_integer(self, index)
    }

    pub fn to_string_lossy(&self, index: i32) -> Option<String> {
        self.lua.to_string_lossy(self, index)
    }
}

impl fmt::Debug for LuaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaState")
            .field("library", &self.lua.library())
            .field("raw", &self.raw)
            .finish()
    }
}

/// Address of engine-managed memory (userdata blocks, interned strings)
///
/// The engine's collector owns the memory; this value can be compared and
/// handed back to native code but is never dereferenced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeAddress(*mut c_void);

impl NativeAddress {
    pub(crate) fn new(address: *mut c_void) -> Self {
        Self(address)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// The raw address, for native code outside this binding
    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}
