use anyhow::Result;
use diamond_ops::{patcher::PointerPatch, telemetry};
use std::env;
use tracing::info;

fn main() -> Result<()> {
    telemetry::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: patch_calldata <calldata_hex>");
        return Ok(());
    }

    let patched = PointerPatch::default().apply(&args[1])?;
    for (old, new) in &patched.pointers {
        info!(%old, %new, "pointer");
    }

    println!("{}", patched.to_hex());
    Ok(())
}
