use std::{path::Path, process::Command};

use anyhow::{bail, Result};
use tracing::info;

/// Opens the interactive sqlite3 console on the log. Blocks until the console is closed.
pub fn open_console(store_path: &Path) -> Result<()> {
    info!("Opening sqlite3 console for {store_path:?}");
    let status = Command::new("sqlite3").arg("-box").arg(store_path).status()?;
    if !status.success() {
        bail!("sqlite3 exited with {status}");
    }
    Ok(())
}
