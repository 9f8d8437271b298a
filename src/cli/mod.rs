pub mod daemon_path;
pub mod history;
pub mod process;
pub mod report;

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use history::{process_log_command, LogCommand};
use process::{kill_previous_daemons, restart_daemon};
use report::{process_report_command, ReportCommand};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    activity::{
        present::{self, Output, Style, Template, DEFAULT_TEMPLATE},
        tracker::Tracker,
    },
    daemon::{args::DaemonOptions, start_daemon},
    error::TrackerError,
    external::{
        console::open_console,
        menu::{MenuCommand, Selector},
        notify::NotifySend,
    },
    storage::log_store::{LogStore, SqliteLogStore},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, default_store_path},
        logging::{enable_logging, CLI_PREFIX},
        time::DurationArg,
    },
};

#[derive(Parser, Debug)]
#[command(name = "timefor", version, long_about = None)]
#[command(about = "Track time spent on named activities", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        env = "DBFILE",
        global = true,
        help = "Activity log. By default $HOME/.timefor.db"
    )]
    db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start new activity")]
    Start {
        name: String,
        #[arg(long, default_value_t = DurationArg::from_secs(0), help = "Start time shift (like 10m, 1m30s)")]
        shift: DurationArg,
    },
    #[command(about = "Select new activity using a menu program")]
    Select {
        #[arg(long, help = "Rename current activity instead")]
        update: bool,
        #[arg(long, default_value = MenuCommand::DEFAULT, help = "Menu program, it gets names on stdin and prints the selection")]
        menu: String,
    },
    #[command(about = "Update the duration of current activity (for cron use)")]
    Update {
        #[arg(long, help = "Change the name as well")]
        name: Option<String>,
    },
    #[command(about = "Finish current activity")]
    Finish,
    #[command(about = "Reject current activity")]
    Reject,
    #[command(about = "Show current activity")]
    Show {
        #[arg(short, long, default_value = DEFAULT_TEMPLATE, help = "Template for formatting. Fields are {label}, {name}, {elapsed}, {duration}, {active}, {icon}")]
        template: Template,
        #[arg(long, help = "Predefined style, overrides the template")]
        style: Option<Style>,
    },
    #[command(about = "Report today's activities")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Show latest entries of the log")]
    Log {
        #[command(flatten)]
        command: LogCommand,
    },
    #[command(about = "Open sqlite3 console for the log")]
    Db {
        #[arg(long, help = "Recreate views and exit")]
        update_views: bool,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for debugging and for process supervisors"
    )]
    Daemon {
        #[command(flatten)]
        options: DaemonOptions,
    },
    #[command(about = "Starts a daemon in the background, stopping previous ones")]
    Init {
        #[command(flatten)]
        options: DaemonOptions,
    },
    #[command(about = "Stop currently running daemon")]
    Stop,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?.join("logs"),
        logging_level,
        args.log,
    )?;

    let db = args.db.map_or_else(default_store_path, Ok)?;
    info!("Running {:?} on {db:?}", args.commands);

    match args.commands {
        Commands::Init { options } => {
            restart_daemon(
                &to_daemon_path(env::current_exe()?),
                &daemon_args(&db, &options)?,
            )?;
            println!("Daemon started");
            Ok(())
        }
        Commands::Stop => {
            let stopped = kill_previous_daemons(&to_daemon_path(env::current_exe()?))?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Daemon { options } => start_daemon(SqliteLogStore::open(&db)?, options).await,
        Commands::Db { update_views } => {
            let store = SqliteLogStore::open(&db)?;
            if update_views {
                store.refresh_views()?;
                Ok(())
            } else {
                drop(store);
                open_console(&db)
            }
        }
        Commands::Start { name, shift } => soft(
            open_tracker(&db)?
                .start(&name, shift.duration())
                .map(|_| println!("New activity {:?} started", name.trim())),
        ),
        Commands::Select { update, menu } => {
            select_activity(&mut open_tracker(&db)?, &MenuCommand::parse(&menu)?, update)
        }
        Commands::Update { name } => soft(open_tracker(&db)?.update(name.as_deref(), false)),
        Commands::Finish => soft(open_tracker(&db)?.finish()),
        Commands::Reject => {
            if !open_tracker(&db)?.reject()? {
                println!("Nothing to reject");
            }
            Ok(())
        }
        Commands::Show { template, style } => {
            let output = style.map_or(Output::Template(template), Output::Style);
            println!("{}", present::format(&open_tracker(&db)?.latest()?, &output));
            Ok(())
        }
        Commands::Report { command } => {
            process_report_command(command, &open_tracker(&db)?, &NotifySend)
        }
        Commands::Log { command } => process_log_command(command, &SqliteLogStore::open(&db)?),
    }
}

/// Arguments for a detached daemon. It doesn't share the working directory of the cli, so the log
/// path is made absolute.
fn daemon_args(db: &Path, options: &DaemonOptions) -> Result<Vec<String>> {
    let mut args = vec![format!("--db={}", std::path::absolute(db)?.display())];
    args.extend(options.to_args());
    Ok(args)
}

fn open_tracker(db: &Path) -> Result<Tracker<SqliteLogStore>> {
    Ok(Tracker::new(SqliteLogStore::open(db)?, Box::new(DefaultClock)))
}

/// Picks a name among the ones used before and starts it, or renames the current activity.
fn select_activity<S: LogStore>(
    tracker: &mut Tracker<S>,
    selector: &impl Selector,
    update: bool,
) -> Result<()> {
    let name = selector.select(&tracker.names()?)?;
    if update {
        soft(tracker.update(Some(&name), false))
    } else {
        soft(
            tracker
                .start(&name, chrono::Duration::zero())
                .map(|_| println!("New activity {:?} started", name.trim())),
        )
    }
}

/// Prints soft refusals instead of failing.
fn soft(result: Result<(), TrackerError>) -> Result<()> {
    match result {
        Err(e) if e.is_soft() => {
            println!("{e}");
            Ok(())
        }
        other => Ok(other?),
    }
}
