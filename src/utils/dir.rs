use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

const STORE_FILE_NAME: &str = ".timefor.db";

/// Location of the log when `DBFILE` isn't set.
pub fn default_store_path() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME is required to locate the activity log")?;
    Ok(PathBuf::from(home).join(STORE_FILE_NAME))
}

/// Directory for logs of both the cli and the daemon. Uses $XDG_STATE_HOME or
/// $HOME/.local/state.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .context("Couldn't find neither XDG_STATE_HOME nor HOME")?;
    path.push("timefor");

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
