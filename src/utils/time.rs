use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};
use chrono::Duration;

/// This is the standard way of showing a duration in timefor: whole hours and minutes.
pub fn format_hhmm(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Non-negative duration typed on the command line, like `10m`, `1m30s` or `2h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationArg(Duration);

impl DurationArg {
    pub const fn from_secs(seconds: i64) -> Self {
        Self(Duration::seconds(seconds))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn to_std(&self) -> std::time::Duration {
        // Never negative, see `from_str`.
        self.0.to_std().unwrap_or_default()
    }
}

impl FromStr for DurationArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            bail!("duration {s:?} cannot be negative");
        }
        if s.is_empty() {
            bail!("duration cannot be empty");
        }
        // Plain numbers are seconds
        if let Ok(seconds) = s.parse::<i64>() {
            let duration =
                Duration::try_seconds(seconds).ok_or_else(|| anyhow!("duration {s:?} is too long"))?;
            return Ok(Self(duration));
        }

        let mut total = Duration::zero();
        let mut digits = String::new();
        for c in s.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let value = digits
                .parse::<i64>()
                .map_err(|_| anyhow!("expected a number before {c:?} in {s:?}"))?;
            digits.clear();
            let part = match c {
                'h' => Duration::try_hours(value),
                'm' => Duration::try_minutes(value),
                's' => Duration::try_seconds(value),
                _ => bail!("unknown unit {c:?} in {s:?}, use h, m or s"),
            };
            total = part
                .and_then(|part| total.checked_add(&part))
                .ok_or_else(|| anyhow!("duration {s:?} is too long"))?;
        }
        if !digits.is_empty() {
            bail!("missing unit after {digits} in {s:?}");
        }
        Ok(Self(total))
    }
}

impl Display for DurationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0.num_seconds())
    }
}
