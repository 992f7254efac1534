//! In-process stand-in for the engine library
//!
//! Exposes `extern "C"` functions under the Lua C API symbol names through a
//! [`SymbolSource`], so dispatch and continuations can be exercised without a
//! system Lua. The semantics are a small subset of the real engine's:
//!
//! - chunks are recognized by content: `error(...)` fails at run time,
//!   `coroutine.yield` yields, `@@` is a syntax error, and `name = number`
//!   lines assign globals when the chunk runs
//! - a yielding chunk under `lua_pcallk` invokes the continuation with
//!   `LUA_YIELD` and returns whatever it returns
//! - closed states are leaked so tests can inspect them afterwards

#![allow(dead_code)]

use panlua_runtime::{
    KContext, KFunction, Lua, LuaState, SymbolSource, LUA_ERRFILE, LUA_ERRRUN, LUA_ERRSYNTAX,
    LUA_OK, LUA_TFUNCTION, LUA_TNIL, LUA_TNONE, LUA_TNUMBER, LUA_TSTRING, LUA_TTABLE,
    LUA_TUSERDATA, LUA_YIELD,
};
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Returns(Vec<(String, f64)>),
    Fails(String),
    Yields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Number(f64),
    Integer(i64),
    Str(Rc<CString>),
    Table(usize),
    Userdata(usize),
    Function(Chunk),
}

impl Value {
    fn tag(&self) -> c_int {
        match self {
            Value::Nil => LUA_TNIL,
            Value::Number(_) | Value::Integer(_) => LUA_TNUMBER,
            Value::Str(_) => LUA_TSTRING,
            Value::Table(_) => LUA_TTABLE,
            Value::Userdata(_) => LUA_TUSERDATA,
            Value::Function(_) => LUA_TFUNCTION,
        }
    }

    fn key(&self) -> String {
        match self {
            Value::Str(s) => s.to_string_lossy().into_owned(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) if n.fract() == 0.0 => (*n as i64).to_string(),
            other => format!("{:?}", other),
        }
    }

    fn string(s: &str) -> Value {
        Value::Str(Rc::new(CString::new(s).unwrap_or_default()))
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub stack: Vec<Value>,
    pub globals: HashMap<String, Value>,
    pub tables: Vec<HashMap<String, Value>>,
    pub userdata: Vec<Box<[u8]>>,
    pub libs_open: bool,
    pub closed: bool,
    pub pcalls: usize,
    pub loads: Vec<(String, Option<String>)>,
    pub last_context: Option<KContext>,
}

impl FakeState {
    fn index(&self, idx: c_int) -> Option<usize> {
        let len = self.stack.len() as c_int;
        let abs = if idx > 0 { idx - 1 } else { len + idx };
        (abs >= 0 && abs < len).then_some(abs as usize)
    }

    fn at(&self, idx: c_int) -> Value {
        self.index(idx)
            .map(|i| self.stack[i].clone())
            .unwrap_or(Value::Nil)
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Nil)
    }

    fn table_at(&self, idx: c_int) -> Option<usize> {
        match self.at(idx) {
            Value::Table(id) => Some(id),
            _ => None,
        }
    }

    fn push_load_result(&mut self, source: Result<String, String>) -> c_int {
        match source {
            Err(message) => {
                self.stack.push(Value::string(&message));
                LUA_ERRFILE
            }
            Ok(source) => match compile(&source) {
                Ok(chunk) => {
                    self.stack.push(Value::Function(chunk));
                    LUA_OK
                }
                Err(message) => {
                    self.stack.push(Value::string(&message));
                    LUA_ERRSYNTAX
                }
            },
        }
    }
}

fn compile(source: &str) -> Result<Chunk, String> {
    if source.contains("@@") {
        return Err("[string]:1: unexpected symbol near '@'".to_string());
    }
    if let Some(start) = source.find("error(") {
        let message = source[start + 6..]
            .trim_end_matches(|c: char| c == ')' || c.is_whitespace())
            .trim_matches('"')
            .to_string();
        return Ok(Chunk::Fails(message));
    }
    if source.contains("coroutine.yield") {
        return Ok(Chunk::Yields);
    }

    let assignments = source
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once('=')?;
            let name = name.trim();
            let value = value.trim().parse::<f64>().ok()?;
            name.chars()
                .all(|c| c.is_alphanumeric() || c == '_')
                .then(|| (name.to_string(), value))
        })
        .collect();
    Ok(Chunk::Returns(assignments))
}

unsafe fn state<'a>(l: *mut c_void) -> &'a mut FakeState {
    &mut *(l as *mut FakeState)
}

unsafe fn text(s: *const c_char) -> Option<String> {
    (!s.is_null()).then(|| CStr::from_ptr(s).to_string_lossy().into_owned())
}

extern "C" fn new_state() -> *mut c_void {
    Box::into_raw(Box::<FakeState>::default()) as *mut c_void
}

extern "C" fn close(l: *mut c_void) {
    unsafe { state(l) }.closed = true;
}

extern "C" fn open_libs(l: *mut c_void) {
    unsafe { state(l) }.libs_open = true;
}

extern "C" fn load_file_x(l: *mut c_void, path: *const c_char, mode: *const c_char) -> c_int {
    let st = unsafe { state(l) };
    let path = unsafe { text(path) }.unwrap_or_default();
    let mode = unsafe { text(mode) };
    st.loads.push((path.clone(), mode));

    let source = std::fs::read_to_string(&path).map_err(|_| format!("cannot open {}", path));
    st.push_load_result(source)
}

extern "C" fn load_string(l: *mut c_void, s: *const c_char) -> c_int {
    let st = unsafe { state(l) };
    let source = unsafe { text(s) }.unwrap_or_default();
    st.push_load_result(Ok(source))
}

extern "C" fn pcall_k(
    l: *mut c_void,
    nargs: c_int,
    _nresults: c_int,
    _msgh: c_int,
    ctx: KContext,
    k: Option<KFunction>,
) -> c_int {
    let chunk = {
        let st = unsafe { state(l) };
        st.pcalls += 1;
        st.last_context = Some(ctx);

        let base = st.stack.len().saturating_sub(nargs as usize + 1);
        let function = st.stack.get(base).cloned();
        st.stack.truncate(base);
        match function {
            Some(Value::Function(chunk)) => chunk,
            other => {
                let tag = other.map_or(LUA_TNIL, |v| v.tag());
                let message = format!("attempt to call a {} value", panlua_runtime::type_name(tag));
                st.stack.push(Value::string(&message));
                return LUA_ERRRUN;
            }
        }
    };

    match chunk {
        Chunk::Returns(assignments) => {
            let st = unsafe { state(l) };
            for (name, value) in assignments {
                st.globals.insert(name, Value::Number(value));
            }
            LUA_OK
        }
        Chunk::Fails(message) => {
            unsafe { state(l) }.stack.push(Value::string(&message));
            LUA_ERRRUN
        }
        // No borrow of the state is held across the continuation
        Chunk::Yields => match k {
            Some(k) => unsafe { k(l, LUA_YIELD, ctx) },
            None => {
                let message = "attempt to yield across a C-call boundary";
                unsafe { state(l) }.stack.push(Value::string(message));
                LUA_ERRRUN
            }
        },
    }
}

extern "C" fn get_table(l: *mut c_void, idx: c_int) -> c_int {
    let st = unsafe { state(l) };
    let table = st.table_at(idx);
    let key = st.pop().key();
    let value = table
        .and_then(|id| st.tables[id].get(&key).cloned())
        .unwrap_or(Value::Nil);
    let tag = value.tag();
    st.stack.push(value);
    tag
}

extern "C" fn set_table(l: *mut c_void, idx: c_int) {
    let st = unsafe { state(l) };
    let table = st.table_at(idx);
    let value = st.pop();
    let key = st.pop().key();
    if let Some(id) = table {
        st.tables[id].insert(key, value);
    }
}

extern "C" fn get_top(l: *mut c_void) -> c_int {
    unsafe { state(l) }.stack.len() as c_int
}

extern "C" fn set_top(l: *mut c_void, idx: c_int) {
    let st = unsafe { state(l) };
    let len = if idx >= 0 {
        idx as usize
    } else {
        (st.stack.len() as c_int + idx + 1).max(0) as usize
    };
    st.stack.resize(len, Value::Nil);
}

extern "C" fn create_table(l: *mut c_void, narr: c_int, nrec: c_int) {
    let st = unsafe { state(l) };
    let capacity = (narr.max(0) + nrec.max(0)) as usize;
    st.tables.push(HashMap::with_capacity(capacity));
    let id = st.tables.len() - 1;
    st.stack.push(Value::Table(id));
}

extern "C" fn new_userdata_uv(l: *mut c_void, size: usize, _nuvalue: c_int) -> *mut c_void {
    let st = unsafe { state(l) };
    let mut block = vec![0u8; size.max(1)].into_boxed_slice();
    let address = block.as_mut_ptr() as *mut c_void;
    st.userdata.push(block);
    let id = st.userdata.len() - 1;
    st.stack.push(Value::Userdata(id));
    address
}

extern "C" fn push_string(l: *mut c_void, s: *const c_char) -> *const c_char {
    let st = unsafe { state(l) };
    if s.is_null() {
        st.stack.push(Value::Nil);
        return std::ptr::null();
    }
    let interned = Rc::new(unsafe { CStr::from_ptr(s) }.to_owned());
    let address = interned.as_ptr();
    st.stack.push(Value::Str(interned));
    address
}

extern "C" fn push_number(l: *mut c_void, n: f64) {
    unsafe { state(l) }.stack.push(Value::Number(n));
}

extern "C" fn push_integer(l: *mut c_void, n: i64) {
    unsafe { state(l) }.stack.push(Value::Integer(n));
}

extern "C" fn set_field(l: *mut c_void, idx: c_int, k: *const c_char) {
    let st = unsafe { state(l) };
    let table = st.table_at(idx);
    let value = st.pop();
    if let (Some(id), Some(key)) = (table, unsafe { text(k) }) {
        st.tables[id].insert(key, value);
    }
}

extern "C" fn get_field(l: *mut c_void, idx: c_int, k: *const c_char) -> c_int {
    let st = unsafe { state(l) };
    let value = match (st.table_at(idx), unsafe { text(k) }) {
        (Some(id), Some(key)) => st.tables[id].get(&key).cloned().unwrap_or(Value::Nil),
        _ => Value::Nil,
    };
    let tag = value.tag();
    st.stack.push(value);
    tag
}

extern "C" fn set_global(l: *mut c_void, name: *const c_char) {
    let st = unsafe { state(l) };
    let value = st.pop();
    if let Some(name) = unsafe { text(name) } {
        st.globals.insert(name, value);
    }
}

extern "C" fn get_global(l: *mut c_void, name: *const c_char) -> c_int {
    let st = unsafe { state(l) };
    let value = unsafe { text(name) }
        .and_then(|name| st.globals.get(&name).cloned())
        .unwrap_or(Value::Nil);
    let tag = value.tag();
    st.stack.push(value);
    tag
}

extern "C" fn type_of(l: *mut c_void, idx: c_int) -> c_int {
    let st = unsafe { state(l) };
    st.index(idx).map_or(LUA_TNONE, |i| st.stack[i].tag())
}

unsafe fn set_flag(flag: *mut c_int, ok: bool) {
    if !flag.is_null() {
        *flag = c_int::from(ok);
    }
}

extern "C" fn to_number_x(l: *mut c_void, idx: c_int, is_num: *mut c_int) -> f64 {
    let st = unsafe { state(l) };
    let n = match st.at(idx) {
        Value::Number(n) => Some(n),
        Value::Integer(i) => Some(i as f64),
        Value::Str(s) => s.to_str().ok().and_then(|s| s.trim().parse().ok()),
        _ => None,
    };
    unsafe { set_flag(is_num, n.is_some()) };
    n.unwrap_or(0.0)
}

extern "C" fn to_integer_x(l: *mut c_void, idx: c_int, is_num: *mut c_int) -> i64 {
    let st = unsafe { state(l) };
    let n = match st.at(idx) {
        Value::Integer(i) => Some(i),
        Value::Number(n) if n.fract() == 0.0 => Some(n as i64),
        Value::Str(s) => s.to_str().ok().and_then(|s| s.trim().parse().ok()),
        _ => None,
    };
    unsafe { set_flag(is_num, n.is_some()) };
    n.unwrap_or(0)
}

extern "C" fn to_lstring(l: *mut c_void, idx: c_int, len: *mut usize) -> *const c_char {
    let st = unsafe { state(l) };
    let Some(slot) = st.index(idx) else {
        return std::ptr::null();
    };
    // Numbers are converted in place, as the engine does
    let converted = match &st.stack[slot] {
        Value::Number(n) => Some(Value::string(&n.to_string())),
        Value::Integer(i) => Some(Value::string(&i.to_string())),
        _ => None,
    };
    if let Some(value) = converted {
        st.stack[slot] = value;
    }
    match &st.stack[slot] {
        Value::Str(s) => {
            if !len.is_null() {
                unsafe { *len = s.as_bytes().len() };
            }
            s.as_ptr()
        }
        _ => std::ptr::null(),
    }
}

pub fn address_of(symbol: &str) -> Option<*mut c_void> {
    let address = match symbol {
        "luaL_newstate" => new_state as *mut c_void,
        "lua_close" => close as *mut c_void,
        "luaL_openlibs" => open_libs as *mut c_void,
        "luaL_loadfilex" => load_file_x as *mut c_void,
        "luaL_loadstring" => load_string as *mut c_void,
        "lua_pcallk" => pcall_k as *mut c_void,
        "lua_gettable" => get_table as *mut c_void,
        "lua_settable" => set_table as *mut c_void,
        "lua_gettop" => get_top as *mut c_void,
        "lua_settop" => set_top as *mut c_void,
        "lua_createtable" => create_table as *mut c_void,
        "lua_newuserdatauv" => new_userdata_uv as *mut c_void,
        "lua_pushstring" => push_string as *mut c_void,
        "lua_pushnumber" => push_number as *mut c_void,
        "lua_pushinteger" => push_integer as *mut c_void,
        "lua_setfield" => set_field as *mut c_void,
        "lua_getfield" => get_field as *mut c_void,
        "lua_setglobal" => set_global as *mut c_void,
        "lua_getglobal" => get_global as *mut c_void,
        "lua_type" => type_of as *mut c_void,
        "lua_tonumberx" => to_number_x as *mut c_void,
        "lua_tointegerx" => to_integer_x as *mut c_void,
        "lua_tolstring" => to_lstring as *mut c_void,
        _ => return None,
    };
    Some(address)
}

/// Symbol table over the fake engine, optionally missing one entry point
pub struct FakeEngine {
    missing: Option<&'static str>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self { missing: None }
    }

    pub fn without(symbol: &'static str) -> Self {
        Self {
            missing: Some(symbol),
        }
    }
}

impl SymbolSource for FakeEngine {
    fn describe(&self) -> String {
        "fake-engine".to_string()
    }

    unsafe fn lookup(&self, symbol: &str) -> Option<*mut c_void> {
        if Some(symbol) == self.missing {
            return None;
        }
        address_of(symbol)
    }
}

/// A binding over the fake engine
pub fn fake_lua() -> Lua {
    Lua::from_source(FakeEngine::new()).expect("fake engine exports every symbol")
}

/// Look inside a fake engine state
pub fn inspect(state: &LuaState) -> &FakeState {
    unsafe { &*(state.as_ptr() as *const FakeState) }
}

/// Look inside a fake engine state by raw address, e.g. after `close`
pub fn inspect_raw<'a>(raw: *mut c_void) -> &'a FakeState {
    unsafe { &*(raw as *const FakeState) }
}
