//! Symbols command - bind the library and list its entry points

use super::bind;
use anyhow::Result;
use panlua_config::PanluaConfig;

pub fn run(settings: &PanluaConfig) -> Result<()> {
    let lua = bind(settings)?;

    println!("library: {}", lua.library());
    for (symbol, address) in lua.entry_points() {
        println!("  {:<20} {:p}", symbol, address.as_ptr());
    }
    Ok(())
}
