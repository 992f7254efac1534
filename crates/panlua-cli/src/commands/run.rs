//! Run command - execute a Lua script in a fresh state

use super::bind;
use anyhow::{Context, Result};
use panlua_config::PanluaConfig;
use panlua_runtime::{status_name, LuaState, LUA_OK};
use std::path::Path;
use tracing::{debug, info};

/// Run `script` and return the engine's status
///
/// The state is closed whether the script succeeds, fails in the engine, or
/// the call could not be dispatched at all.
pub fn run(script: &Path, settings: &PanluaConfig) -> Result<i32> {
    let lua = bind(settings)?;
    let state = lua.new_state().context("Failed to create a Lua state")?;

    let outcome = execute(&state, script, settings);
    state.close();
    let (status, message) = outcome?;

    if status == LUA_OK {
        info!(script = %script.display(), "script finished");
    } else {
        eprintln!(
            "{}: {}",
            status_name(status),
            message.as_deref().unwrap_or("(no error message)")
        );
    }
    Ok(status)
}

/// Load and call the script; on failure also return the message the engine
/// left on top of the stack
fn execute(state: &LuaState, script: &Path, settings: &PanluaConfig) -> Result<(i32, Option<String>)> {
    if settings.open_libs() {
        state.open_libs();
    }

    let mode = settings.load_mode();
    let status = state.do_file_x(script, mode)?;
    debug!(?mode, status, "script executed");

    let message = if status == LUA_OK {
        None
    } else {
        state.to_string_lossy(-1)
    };
    Ok((status, message))
}

/// Process exit code for an engine status; out-of-range statuses map to 1
pub fn exit_code(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(1)
}
