//! Call dispatch - typed wrappers over the resolved entry points
//!
//! Each operation performs exactly one native invocation through the binding's
//! call descriptor (the composites `do_file`, `do_file_x` and `do_string`
//! perform a fixed short sequence). String arguments travel in a
//! [`NativeString`] that lives only for the duration of the call.
//!
//! Engine results are returned verbatim: load and call statuses as `i32`
//! codes, lookups as type tags. `Err` is reserved for failures to perform a
//! call at all.

use crate::binding::Lua;
use crate::error::DispatchError;
use crate::ffi::callbacks::Continuation;
use crate::ffi::marshal::{copy_native_bytes, NativeString};
use crate::ffi::types::{KContext, LUA_MULTRET, LUA_OK};
use crate::state::{LuaState, NativeAddress};
use std::os::raw::c_int;
use std::path::Path;

impl Lua {
    fn check_owner(&self, state: &LuaState) {
        debug_assert!(
            self.same_binding(state.lua()),
            "state used with a binding that did not create it"
        );
    }

    /// Create a fresh engine instance (`luaL_newstate`)
    pub fn new_state(&self) -> Result<LuaState, DispatchError> {
        let raw = unsafe { (self.entry().new_state)() };
        if raw.is_null() {
            return Err(DispatchError::NullState);
        }
        Ok(unsafe { LuaState::from_raw(self.clone(), raw) })
    }

    /// Tear an engine instance down (`lua_close`)
    pub fn close(&self, state: LuaState) {
        self.check_owner(&state);
        unsafe { (self.entry().close)(state.as_ptr()) }
    }

    /// Open the standard libraries (`luaL_openlibs`)
    pub fn open_libs(&self, state: &LuaState) {
        self.check_owner(state);
        unsafe { (self.entry().open_libs)(state.as_ptr()) }
    }

    /// Load a script onto the stack without running it (`luaL_loadfilex`)
    ///
    /// `mode` is the engine's chunk-mode string (`"b"`, `"t"`, `"bt"`);
    /// `None` passes the native null pointer, meaning the engine default.
    /// Returns the load status unchanged.
    pub fn load_file_x(
        &self,
        state: &LuaState,
        path: impl AsRef<Path>,
        mode: Option<&str>,
    ) -> Result<i32, DispatchError> {
        self.check_owner(state);
        let path = NativeString::from_path(path.as_ref())?;
        let mode = NativeString::optional(mode)?;
        Ok(unsafe { (self.entry().load_file_x)(state.as_ptr(), path.as_ptr(), mode.as_ptr()) })
    }

    /// [`load_file_x`](Lua::load_file_x) with the default mode
    pub fn load_file(&self, state: &LuaState, path: impl AsRef<Path>) -> Result<i32, DispatchError> {
        self.load_file_x(state, path, None)
    }

    /// Load a chunk from a string (`luaL_loadstring`)
    pub fn load_string(&self, state: &LuaState, chunk: &str) -> Result<i32, DispatchError> {
        self.check_owner(state);
        let chunk = NativeString::new(chunk)?;
        Ok(unsafe { (self.entry().load_string)(state.as_ptr(), chunk.as_ptr()) })
    }

    /// Protected call with an optional continuation (`lua_pcallk`)
    ///
    /// `context` is handed to the engine untouched and comes back as the
    /// continuation's third argument. `k = None` passes the native null
    /// pointer. A released continuation is refused before the native call.
    pub fn pcall_k(
        &self,
        state: &LuaState,
        nargs: i32,
        nresults: i32,
        msgh: i32,
        context: KContext,
        k: Option<&Continuation>,
    ) -> Result<i32, DispatchError> {
        self.check_owner(state);
        let k = match k {
            Some(continuation) => Some(
                continuation
                    .as_kfunction()
                    .ok_or(DispatchError::ReleasedContinuation)?,
            ),
            None => None,
        };
        Ok(unsafe {
            (self.entry().pcall_k)(
                state.as_ptr(),
                nargs as c_int,
                nresults as c_int,
                msgh as c_int,
                context,
                k,
            )
        })
    }

    /// Protected call without a continuation
    pub fn pcall(&self, state: &LuaState, nargs: i32, nresults: i32, msgh: i32) -> i32 {
        self.check_owner(state);
        unsafe {
            (self.entry().pcall_k)(
                state.as_ptr(),
                nargs as c_int,
                nresults as c_int,
                msgh as c_int,
                0,
                None,
            )
        }
    }

    /// Load and run a script
    ///
    /// When loading fails its status is returned unchanged and no call is
    /// attempted. Otherwise the chunk is called with no arguments, all
    /// results kept and no message handler, and the call status is returned.
    pub fn do_file(&self, state: &LuaState, path: impl AsRef<Path>) -> Result<i32, DispatchError> {
        self.do_file_x(state, path, None)
    }

    /// [`do_file`](Lua::do_file) loading with an explicit chunk mode
    pub fn do_file_x(
        &self,
        state: &LuaState,
        path: impl AsRef<Path>,
        mode: Option<&str>,
    ) -> Result<i32, DispatchError> {
        let status = self.load_file_x(state, path, mode)?;
        if status != LUA_OK {
            return Ok(status);
        }
        Ok(self.pcall(state, 0, LUA_MULTRET, 0))
    }

    /// Load and run a chunk held in a string; same sequencing as `do_file`
    pub fn do_string(&self, state: &LuaState, chunk: &str) -> Result<i32, DispatchError> {
        let status = self.load_string(state, chunk)?;
        if status != LUA_OK {
            return Ok(status);
        }
        Ok(self.pcall(state, 0, LUA_MULTRET, 0))
    }

    /// `t[k]` where `t` is at `index` and `k` on top; returns the type tag
    pub fn get_table(&self, state: &LuaState, index: i32) -> i32 {
        self.check_owner(state);
        unsafe { (self.entry().get_table)(state.as_ptr(), index) }
    }

    /// `t[k] = v` where `t` is at `index`, `v` on top and `k` just below
    pub fn set_table(&self, state: &LuaState, index: i32) {
        self.check_owner(state);
        unsafe { (self.entry().set_table)(state.as_ptr(), index) }
    }

    pub fn get_top(&self, state: &LuaState) -> i32 {
        self.check_owner(state);
        unsafe { (self.entry().get_top)(state.as_ptr()) }
    }

    pub fn set_top(&self, state: &LuaState, index: i32) {
        self.check_owner(state);
        unsafe { (self.entry().set_top)(state.as_ptr(), index) }
    }

    /// Pop `n` values
    pub fn pop(&self, state: &LuaState, n: i32) {
        self.set_top(state, pop_index(n))
    }

    /// Push a new table with preallocated sequence/hash space
    pub fn create_table(&self, state: &LuaState, num_seq: i32, num_ent: i32) {
        self.check_owner(state);
        unsafe { (self.entry().create_table)(state.as_ptr(), num_seq, num_ent) }
    }

    /// Push a new empty table
    pub fn new_table(&self, state: &LuaState) {
        self.create_table(state, 0, 0)
    }

    /// Push a full userdata block of `size` bytes and return its address
    pub fn new_userdata_uv(&self, state: &LuaState, size: usize, num_user_values: i32) -> NativeAddress {
        self.check_owner(state);
        let address = unsafe { (self.entry().new_userdata_uv)(state.as_ptr(), size, num_user_values) };
        NativeAddress::new(address)
    }

    /// Push a string; returns the address of the engine's internal copy
    ///
    /// `None` passes the native null pointer, which the engine pushes as nil
    /// and answers with a null address.
    pub fn push_string(&self, state: &LuaState, s: Option<&str>) -> Result<NativeAddress, DispatchError> {
        self.check_owner(state);
        let s = NativeString::optional(s)?;
        let interned = unsafe { (self.entry().push_string)(state.as_ptr(), s.as_ptr()) };
        Ok(NativeAddress::new(interned as *mut _))
    }

    pub fn push_number(&self, state: &LuaState, n: f64) {
        self.check_owner(state);
        unsafe { (self.entry().push_number)(state.as_ptr(), n) }
    }

    pub fn push_integer(&self, state: &LuaState, n: i64) {
        self.check_owner(state);
        unsafe { (self.entry().push_integer)(state.as_ptr(), n) }
    }

    /// `t[name] = v` where `t` is at `index` and `v` on top
    pub fn set_field(&self, state: &LuaState, index: i32, name: Option<&str>) -> Result<(), DispatchError> {
        self.check_owner(state);
        let name = NativeString::optional(name)?;
        unsafe { (self.entry().set_field)(state.as_ptr(), index, name.as_ptr()) };
        Ok(())
    }

    /// Push `t[name]` where `t` is at `index`; returns the type tag
    pub fn get_field(&self, state: &LuaState, index: i32, name: &str) -> Result<i32, DispatchError> {
        self.check_owner(state);
        let name = NativeString::new(name)?;
        Ok(unsafe { (self.entry().get_field)(state.as_ptr(), index, name.as_ptr()) })
    }

    /// Pop a value into global `name`
    pub fn set_global(&self, state: &LuaState, name: Option<&str>) -> Result<(), DispatchError> {
        self.check_owner(state);
        let name = NativeString::optional(name)?;
        unsafe { (self.entry().set_global)(state.as_ptr(), name.as_ptr()) };
        Ok(())
    }

    /// Push global `name`; returns the type tag
    pub fn get_global(&self, state: &LuaState, name: &str) -> Result<i32, DispatchError> {
        self.check_owner(state);
        let name = NativeString::new(name)?;
        Ok(unsafe { (self.entry().get_global)(state.as_ptr(), name.as_ptr()) })
    }

    /// Type tag of the value at `index` (`LUA_TNONE` for an empty slot)
    pub fn type_of(&self, state: &LuaState, index: i32) -> i32 {
        self.check_owner(state);
        unsafe { (self.entry().type_of)(state.as_ptr(), index) }
    }

    /// Value at `index` as a number, if the engine can convert it
    pub fn to_number(&self, state: &LuaState, index: i32) -> Option<f64> {
        self.check_owner(state);
        let mut is_num: c_int = 0;
        let n = unsafe { (self.entry().to_number_x)(state.as_ptr(), index, &mut is_num) };
        (is_num != 0).then_some(n)
    }

    /// Value at `index` as an integer, if the engine can convert it exactly
    pub fn to_integer(&self, state: &LuaState, index: i32) -> Option<i64> {
        self.check_owner(state);
        let mut is_num: c_int = 0;
        let n = unsafe { (self.entry().to_integer_x)(state.as_ptr(), index, &mut is_num) };
        (is_num != 0).then_some(n)
    }

    /// Copy of the string (or number, converted in place by the engine) at
    /// `index`, with invalid UTF-8 replaced
    pub fn to_string_lossy(&self, state: &LuaState, index: i32) -> Option<String> {
        self.check_owner(state);
        let mut len: usize = 0;
        unsafe {
            let ptr = (self.entry().to_lstring)(state.as_ptr(), index, &mut len);
            copy_native_bytes(ptr, len)
        }
    }
}

/// Stack index `lua_pop` hands to `lua_settop`: `-n - 1`, computed as the
/// bitwise complement so no `n` overflows
fn pop_index(n: i32) -> i32 {
    !n
}
