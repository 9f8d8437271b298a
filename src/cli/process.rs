use std::{path::Path, process::Stdio};

use anyhow::{Context, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Terminates every running process started from the executable at `name`, except this one and its
/// children. Returns how many processes were stopped.
pub fn kill_previous_daemons(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(anyhow::Error::msg)?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// Stops previous daemons and launches a fresh one from `daemon_path`. The daemon binary detaches
/// on its own, so this only waits for the launcher to exit.
pub fn restart_daemon(daemon_path: &Path, args: &[String]) -> Result<()> {
    kill_previous_daemons(daemon_path)?;
    let mut command = std::process::Command::new(daemon_path);
    command.args(args);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {daemon_path:?} with {args:?}");
    let status = command
        .status()
        .with_context(|| format!("cannot run {daemon_path:?}"))?;
    if !status.success() {
        anyhow::bail!("daemon launcher exited with {status}");
    }
    Ok(())
}
