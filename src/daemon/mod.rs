use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    activity::{
        present::{self, Output, Template},
        tracker::Tracker,
    },
    external::{
        hook::run_hook,
        notify::{Notifier, NotifySend},
    },
    storage::log_store::{LogStore, SqliteLogStore},
    utils::clock::{Clock, DefaultClock},
};

use args::DaemonOptions;
use reminder::BreakReminder;

pub mod args;
pub mod reminder;
pub mod shutdown;

/// Represents the starting point for the daemon. Runs until ctrl-c or a storage error.
pub async fn start_daemon(store: SqliteLogStore, options: DaemonOptions) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let daemon = DaemonLoop::new(
        Tracker::new(store, Box::new(DefaultClock)),
        Box::new(NotifySend),
        Box::new(DefaultClock),
        &options,
        shutdown_token.clone(),
    )?;

    let (_, result) = tokio::join!(shutdown::detect_shutdown(shutdown_token.clone()), async {
        let result = daemon.run().await;
        // Lets the signal listener finish when the loop stops on its own.
        shutdown_token.cancel();
        result
    });
    result.inspect_err(|e| error!("Daemon stopped with an error {e:?}"))
}

/// Keeps the current activity fresh and reminds about breaks. Ticks never overlap: each one runs
/// to completion before the loop sleeps again.
pub struct DaemonLoop<S: LogStore> {
    tracker: Tracker<S>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    options: DaemonOptions,
    hook: Option<Output>,
    last_hook: Option<String>,
    reminder: BreakReminder,
    shutdown: CancellationToken,
}

impl<S: LogStore> DaemonLoop<S> {
    pub fn new(
        tracker: Tracker<S>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        options: &DaemonOptions,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let hook = options
            .hook
            .as_deref()
            .map(Template::parse)
            .transpose()
            .context("invalid hook template")?
            .map(Output::Template);
        Ok(Self {
            tracker,
            notifier,
            clock,
            options: options.clone(),
            hook,
            last_hook: None,
            reminder: BreakReminder::new(
                options.break_interval.duration(),
                options.repeat_interval.duration(),
            ),
            shutdown,
        })
    }

    /// Executes the daemon event loop.
    pub async fn run(mut self) -> Result<()> {
        info!("Daemon started");
        loop {
            self.tick()?;

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Daemon stopped");
                    return Ok(())
                }
                _ = self.clock.sleep(self.options.tick.to_std()) => ()
            }
        }
    }

    /// A single pass of the loop. Only storage errors are returned, everything else is logged.
    pub fn tick(&mut self) -> Result<()> {
        let activity = self.tracker.latest()?;

        if let Some(hook) = &self.hook {
            let command = present::format(&activity, hook);
            if self.last_hook.as_ref() != Some(&command) {
                if let Err(e) = run_hook(&command) {
                    warn!("Hook failed {e:?}");
                }
                self.last_hook = Some(command);
            }
        }

        let now = self.clock.now();
        if !activity.is_active() || now - activity.updated() <= self.options.update_interval.duration()
        {
            return Ok(());
        }

        debug!("Updating time for {:?}", activity.name());
        self.tracker.update_if_exists(None, false)?;
        let active_for = self.tracker.active_duration()?;

        if let Some(notice) = self.reminder.check(active_for, now) {
            info!("Reminding about a break after {active_for}");
            if let Err(e) = self.notifier.notify(&notice) {
                warn!("Cannot send notification {e:?}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod daemon_tests {
    use anyhow::Result;
    use chrono::Duration;
    use clap::Parser;
    use tokio_util::sync::CancellationToken;

    use crate::{
        activity::{test_support::at, tracker::Tracker},
        external::notify::{MockNotifier, NotifyFailed, Urgency},
        storage::log_store::{LogStore, SqliteLogStore},
        utils::{
            clock::{Clock, ManualClock},
            logging::TEST_LOGGING,
        },
    };

    use super::{
        args::{DaemonArgs, DaemonOptions},
        DaemonLoop,
    };

    fn options(extra: &[&str]) -> DaemonOptions {
        let mut command = vec!["timefor-daemon"];
        command.extend_from_slice(extra);
        DaemonArgs::parse_from(command).options
    }

    fn daemon(
        clock: &ManualClock,
        notifier: MockNotifier,
        options: &DaemonOptions,
    ) -> Result<DaemonLoop<SqliteLogStore>> {
        let tracker = Tracker::new(SqliteLogStore::open_in_memory()?, Box::new(clock.clone()));
        DaemonLoop::new(
            tracker,
            Box::new(notifier),
            Box::new(clock.clone()),
            options,
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_tick_refreshes_duration() -> Result<()> {
        let clock = ManualClock::new(at(0));
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let mut daemon = daemon(&clock, notifier, &options(&[]))?;
        daemon.tracker.start("writing", Duration::zero())?;

        clock.advance(Duration::seconds(20));
        daemon.tick()?;
        assert_eq!(
            daemon.tracker.latest()?.entry().unwrap().duration,
            Duration::zero()
        );

        clock.advance(Duration::seconds(20));
        daemon.tick()?;
        assert_eq!(
            daemon.tracker.latest()?.entry().unwrap().duration,
            Duration::seconds(40)
        );
        Ok(())
    }

    #[test]
    fn test_break_reminder_is_sent_once_per_window() -> Result<()> {
        *TEST_LOGGING;
        let clock = ManualClock::new(at(0));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| notice.title == "Take a break!" && notice.urgency == Urgency::Normal)
            .times(2)
            .returning(|_| Ok(()));
        let mut daemon = daemon(&clock, notifier, &options(&[]))?;
        daemon.tracker.start("writing", Duration::minutes(81))?;

        for _ in 0..12 {
            clock.advance(Duration::minutes(1));
            daemon.tick()?;
        }
        Ok(())
    }

    #[test]
    fn test_notify_failure_is_not_fatal() -> Result<()> {
        let clock = ManualClock::new(at(0));
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| {
            Err(NotifyFailed::Spawn(std::io::Error::other("no daemon")))
        });
        let mut daemon = daemon(&clock, notifier, &options(&[]))?;
        daemon.tracker.start("writing", Duration::minutes(90))?;

        clock.advance(Duration::minutes(1));
        daemon.tick()?;
        clock.advance(Duration::minutes(1));
        daemon.tick()?;

        assert!(daemon.tracker.latest()?.is_active());
        Ok(())
    }

    #[test]
    fn test_no_reminder_without_activity() -> Result<()> {
        let clock = ManualClock::new(at(0));
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let mut daemon = daemon(&clock, notifier, &options(&[]))?;
        daemon.tracker.start("writing", Duration::minutes(90))?;
        daemon.tracker.finish()?;

        clock.advance(Duration::minutes(1));
        daemon.tick()?;
        Ok(())
    }

    #[test]
    fn test_invalid_hook_is_rejected() {
        let clock = ManualClock::new(at(0));
        let result = daemon(&clock, MockNotifier::new(), &options(&["--hook", "echo {oops"]));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_hook_runs_when_rendering_changes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("hook");
        let hook = format!("echo {{label}} >> {}", output.display());
        let clock = ManualClock::new(at(0));
        let mut daemon = daemon(&clock, MockNotifier::new(), &options(&["--hook", &hook]))?;

        daemon.tick()?;
        daemon.tick()?;
        daemon.tracker.start("writing", Duration::zero())?;
        daemon.tick()?;

        let lines = std::fs::read_to_string(&output)?;
        assert_eq!(lines.lines().collect::<Vec<_>>(), vec!["00:00 OFF", "00:00 writing"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_loop_stops_after_tick() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("log.db");
        let clock = ManualClock::new(at(0));
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let tracker = Tracker::new(SqliteLogStore::open(&path)?, Box::new(clock.clone()));
        let shutdown = CancellationToken::new();
        let mut daemon = DaemonLoop::new(
            tracker,
            Box::new(notifier),
            Box::new(clock.clone()),
            &options(&[]),
            shutdown.clone(),
        )?;
        daemon.tracker.start("writing", Duration::zero())?;
        clock.advance(Duration::minutes(5));

        shutdown.cancel();
        daemon.run().await?;

        // One tick ran, and the loop didn't sleep afterwards.
        assert_eq!(clock.time(), at(5));
        let latest = SqliteLogStore::open(&path)?.latest()?.unwrap();
        assert_eq!(latest.duration, Duration::minutes(5));
        assert!(latest.current);
        Ok(())
    }
}
