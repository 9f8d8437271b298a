use std::{process::Command, time::Duration};

#[cfg(test)]
use mockall::automock;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum NotifyFailed {
    #[error("cannot run notify-send: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("notify-send exited with {0}")]
    Exit(std::process::ExitStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

/// A desktop notification. Without a timeout the notification stays until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
    pub timeout: Option<Duration>,
}

/// Shows notifications to the user. Failing to notify is never fatal for callers.
#[cfg_attr(test, automock)]
pub trait Notifier: Send {
    fn notify(&self, notice: &Notice) -> Result<(), NotifyFailed>;
}

/// [Notifier] using `notify-send` from libnotify.
pub struct NotifySend;

impl NotifySend {
    fn args(notice: &Notice) -> Vec<String> {
        let mut args = vec![notice.title.clone(), notice.body.clone()];
        if notice.urgency == Urgency::Critical {
            args.extend(["-u".into(), "critical".into()]);
        }
        let timeout = notice.timeout.map_or(0, |v| v.as_millis());
        args.extend(["-t".into(), timeout.to_string()]);
        args
    }
}

impl Notifier for NotifySend {
    fn notify(&self, notice: &Notice) -> Result<(), NotifyFailed> {
        debug!("Sending notification {notice:?}");
        let status = Command::new("notify-send").args(Self::args(notice)).status()?;
        if !status.success() {
            return Err(NotifyFailed::Exit(status));
        }
        Ok(())
    }
}
