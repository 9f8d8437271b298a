use std::process::Command;

use anyhow::{bail, Result};
use tracing::info;

/// Runs a rendered hook through `sh -c`.
pub fn run_hook(command: &str) -> Result<()> {
    info!("Running hook command {command:?}");
    let status = Command::new("sh").arg("-c").arg(command).status()?;
    if !status.success() {
        bail!("hook {command:?} exited with {status}");
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::run_hook;

    #[test]
    fn test_hook_status() {
        assert!(run_hook("true").is_ok());
        assert!(run_hook("exit 3").is_err());
    }
}
