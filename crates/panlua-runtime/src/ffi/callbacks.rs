//! FFI Callbacks - native continuations backed by host closures
//!
//! A [`Continuation`] turns a Rust closure into a genuine `lua_KFunction`
//! pointer. The entry point is generated with a `libffi` closure: native code
//! calls it with the plain C convention, and the trampoline rewraps the raw
//! state into a [`LuaState`], runs the host closure and returns its status.
//!
//! # Lifetime
//!
//! The generated code and the closure it wraps stay alive until
//! [`Continuation::release`] (or drop). The owner must not release while any
//! native call that received the pointer can still invoke it, including
//! reentrant invocations from inside that call.

use crate::binding::Lua;
use crate::ffi::types::{KContext, KFunction, RawState, LUA_ERRRUN};
use crate::state::LuaState;
use libffi::low;
use libffi::middle::{Cif, Closure, Type};
use std::ffi::c_void;
use std::fmt;
use std::mem::ManuallyDrop;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, trace, warn};

type HostFn = dyn Fn(&LuaState, i32, KContext) -> i32;

/// Heap-pinned data the generated entry point reads on every invocation
struct Payload {
    lua: Lua,
    callback: Box<HostFn>,
}

/// Live native entry point plus the payload it borrows
struct Trampoline {
    closure: ManuallyDrop<Closure<'static>>,
    entry: KFunction,
    payload: *mut Payload,
}

impl Trampoline {
    fn new(lua: &Lua, callback: Box<HostFn>) -> Self {
        let payload = Box::into_raw(Box::new(Payload {
            lua: lua.clone(),
            callback,
        }));

        // `int (*)(lua_State *, int, lua_KContext)`
        let cif = Cif::new(vec![Type::pointer(), Type::i32(), Type::isize()], Type::i32());
        let closure = Closure::new(cif, invoke, unsafe { &*payload });
        let entry = unsafe {
            std::mem::transmute::<unsafe extern "C" fn(), KFunction>(*closure.code_ptr())
        };

        Self {
            closure: ManuallyDrop::new(closure),
            entry,
            payload,
        }
    }
}

impl Drop for Trampoline {
    fn drop(&mut self) {
        // Code first, then the data it points at
        unsafe {
            ManuallyDrop::drop(&mut self.closure);
            drop(Box::from_raw(self.payload));
        }
    }
}

/// Entry point body shared by every generated continuation
///
/// Integral results are written widened to the full return slot, as libffi
/// requires for closures returning types narrower than a register.
unsafe extern "C" fn invoke(
    _cif: &low::ffi_cif,
    result: &mut isize,
    args: *const *const c_void,
    payload: &Payload,
) {
    let raw = *(*args.add(0) as *const RawState);
    let status = *(*args.add(1) as *const c_int);
    let context = *(*args.add(2) as *const KContext);
    trace!(?raw, status, context, "continuation invoked");

    let state = LuaState::from_raw(payload.lua.clone(), raw);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (payload.callback)(&state, status, context)));

    *result = match outcome {
        Ok(code) => code as isize,
        Err(_) => {
            error!("continuation panicked; reporting runtime error to the engine");
            LUA_ERRRUN as isize
        }
    };
}

/// Whether a continuation's native entry point may still be called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrampolineStatus {
    Active,
    Released,
}

/// Native-callable continuation built from a host closure
///
/// # Example
///
/// ```no_run
/// use panlua_runtime::{Continuation, Lua, LUA_MULTRET};
///
/// let lua = Lua::version(54).unwrap();
/// let state = lua.new_state().unwrap();
/// let mut k = Continuation::new(&lua, |_state, status, _ctx| status);
///
/// state.load_string("return 1").unwrap();
/// let status = state.pcall_k(0, LUA_MULTRET, 0, 0, Some(&k)).unwrap();
///
/// k.release();
/// state.close();
/// # let _ = status;
/// ```
pub struct Continuation {
    trampoline: Option<Trampoline>,
}

impl Continuation {
    /// Generate a native entry point that runs `f`
    ///
    /// `f` receives a borrowed handle to the state the engine called back
    /// with (bound to `lua`), the status and the context the engine passed,
    /// and its return value is handed back to the engine as-is. A panic in
    /// `f` is stopped at the boundary and reported as `LUA_ERRRUN`.
    pub fn new<F>(lua: &Lua, f: F) -> Self
    where
        F: Fn(&LuaState, i32, KContext) -> i32 + 'static,
    {
        let trampoline = Trampoline::new(lua, Box::new(f));
        trace!(entry = ?(trampoline.entry as *const ()), "continuation created");
        Self {
            trampoline: Some(trampoline),
        }
    }

    /// The generated function pointer, or `None` once released
    pub fn as_kfunction(&self) -> Option<KFunction> {
        self.trampoline.as_ref().map(|t| t.entry)
    }

    pub fn status(&self) -> TrampolineStatus {
        match self.trampoline {
            Some(_) => TrampolineStatus::Active,
            None => TrampolineStatus::Released,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == TrampolineStatus::Active
    }

    /// Free the generated code and the wrapped closure
    ///
    /// The function pointer is invalid afterwards. Releasing twice is a
    /// no-op.
    pub fn release(&mut self) {
        if let Some(trampoline) = self.trampoline.take() {
            trace!(entry = ?(trampoline.entry as *const ()), "continuation released");
            drop(trampoline);
        }
    }
}

impl Drop for Continuation {
    fn drop(&mut self) {
        if self.is_active() {
            warn!("continuation dropped while active; releasing");
            self.release();
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("status", &self.status())
            .field("entry", &self.as_kfunction().map(|k| k as *const ()))
            .finish()
    }
}
