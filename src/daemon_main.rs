use std::env::args;

use anyhow::Result;
use clap::Parser;
use timefor::{
    daemon::{args::DaemonArgs, start_daemon},
    storage::log_store::SqliteLogStore,
    utils::{
        dir::{create_application_default_path, default_store_path},
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::daemon_runtime,
    },
};

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let mut args = DaemonArgs::parse_from(&command_args);
    // Detaching moves the working directory to `/`.
    args.db = args.db.map(std::path::absolute).transpose()?;

    #[cfg(unix)]
    if !args.force {
        use daemonize::Daemonize;
        use tracing::error;

        let daemonize = Daemonize::new()
            .stdout(daemonize::Stdio::devnull())
            .stderr(daemonize::Stdio::devnull())
            .execute();
        match daemonize {
            daemonize::Outcome::Parent(parent) => {
                parent.inspect_err(|e| error!("Failed to create daemon on parent side {e:?}"))?;
                println!("Created daemon");
                return Ok(());
            }
            daemonize::Outcome::Child(child) => {
                child?;
            }
        }
    }

    run(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = create_application_default_path()?;
    enable_logging(DAEMON_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;
    let db = args.db.map_or_else(default_store_path, Ok)?;
    let store = SqliteLogStore::open(&db)?;
    daemon_runtime()?.block_on(start_daemon(store, args.options))
}
