use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::utils::time::DurationArg;

/// Options shared by every way of running the daemon.
#[derive(clap::Args, Debug, Clone)]
pub struct DaemonOptions {
    #[arg(long = "update-interval", default_value_t = DurationArg::from_secs(30), help = "How often the duration of the current activity is saved")]
    pub update_interval: DurationArg,
    #[arg(long = "break-interval", default_value_t = DurationArg::from_secs(80 * 60), help = "Continuous activity after which a break is suggested")]
    pub break_interval: DurationArg,
    #[arg(long = "repeat-interval", default_value_t = DurationArg::from_secs(10 * 60), help = "Pause between repeated break reminders")]
    pub repeat_interval: DurationArg,
    #[arg(long, default_value_t = DurationArg::from_secs(1), help = "How often the daemon wakes up")]
    pub tick: DurationArg,
    #[arg(
        long,
        help = "Command template executed with `sh -c` whenever its rendering changes, e.g. \"echo '{label}' > /tmp/timefor\""
    )]
    pub hook: Option<String>,
}

impl DaemonOptions {
    /// Converts the options back into command line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--update-interval={}", self.update_interval),
            format!("--break-interval={}", self.break_interval),
            format!("--repeat-interval={}", self.repeat_interval),
            format!("--tick={}", self.tick),
        ];
        if let Some(hook) = &self.hook {
            args.push(format!("--hook={hook}"));
        }
        args
    }
}

/// Arguments of the standalone daemon binary.
#[derive(Parser)]
pub struct DaemonArgs {
    /// Stay in the foreground instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long, env = "DBFILE")]
    pub db: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[command(flatten)]
    pub options: DaemonOptions,
}
