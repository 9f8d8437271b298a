use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};
use tracing::warn;

use crate::{
    activity::{aggregate::DailyTotals, tracker::Tracker, Activity},
    external::notify::{Notice, Notifier, Urgency},
    storage::log_store::LogStore,
    utils::time::format_hhmm,
};

use super::Args;

const TOTAL: &str = "Total";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ReportCommand {
    #[arg(short, long, help = "Send the report as a notification instead of printing it")]
    notify: bool,
    #[arg(
        long,
        help = "Day to report. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\". Today by default"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

/// Summary of a single day: how long the user has been active and the time spent per activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub body: String,
}

impl Report {
    fn to_notice(&self) -> Notice {
        Notice {
            title: self.title.clone(),
            body: self.body.clone(),
            urgency: Urgency::Normal,
            timeout: None,
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\n{}", self.title, self.body)
    }
}

pub fn process_report_command<S: LogStore>(
    ReportCommand {
        notify,
        date,
        date_style,
    }: ReportCommand,
    tracker: &Tracker<S>,
    notifier: &dyn Notifier,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let day = match date {
        Some(date) => parse_day(&date, date_style, now)?,
        None => now,
    };
    let report = build_report(tracker, day)?;

    if notify {
        if let Err(e) = notifier.notify(&report.to_notice()) {
            warn!("Cannot send report {e:?}");
            eprintln!("cannot send notification: {e}");
        }
    } else {
        println!("{report}");
    }
    Ok(())
}

fn parse_day(date: &str, style: DateStyle, now: DateTime<Local>) -> Result<DateTime<Local>> {
    match parse_date_string(date, now, style.into()) {
        Ok(v) => Ok(v.with_timezone(&Local)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

pub fn build_report<S: LogStore>(tracker: &Tracker<S>, day: DateTime<Local>) -> Result<Report> {
    let active_for = tracker.active_duration()?;
    let latest = tracker.latest()?;
    let totals = tracker.daily_totals(day)?;
    Ok(Report {
        title: title(active_for, &latest),
        body: body(&totals),
    })
}

fn title(active_for: Duration, latest: &Activity) -> String {
    if active_for > Duration::zero() {
        format!("Active for {}", format_hhmm(active_for))
    } else {
        format!("Inactive for {}", format_hhmm(latest.time_since()))
    }
}

/// One aligned row per activity. Several rows get a separator and a total.
fn body(totals: &DailyTotals) -> String {
    let width = totals
        .totals
        .iter()
        .map(|v| v.name.chars().count())
        .max()
        .unwrap_or_default()
        .max(TOTAL.len());

    let mut lines = totals
        .totals
        .iter()
        .map(|v| format!("{:<width$}  {}", v.name, format_hhmm(v.duration)))
        .collect::<Vec<_>>();
    if lines.len() > 1 {
        lines.push(format!("{}  -----", "-".repeat(width)));
        lines.push(format!("{TOTAL:<width$}  {}", format_hhmm(totals.total())));
    }
    lines.join("\n")
}
