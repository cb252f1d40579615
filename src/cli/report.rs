use std::{fmt::Display, path::Path, path::PathBuf, sync::Arc};

use ansi_term::Style;
use anyhow::Result;
use chrono::{Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    storage::{
        entities::DomainTimers,
        store::{JsonTimerStore, TimerStore, STATE_FILE_NAME},
    },
    utils::time::{day_key, format_elapsed, local_day_key},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
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

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long = "date",
        short,
        help = "Day to report on. Examples are \"yesterday\", \"last friday\", \"15/03/2025\""
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, help = "Show every stored record with its day instead of one day's totals")]
    all: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to read from $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
}

/// Command to process the `report` command. Prints what the watch sessions
/// have accumulated, most used domains first. Only closed sessions count:
/// whatever a live watcher hasn't flushed yet is not in the file.
pub fn process_report_command(
    ReportCommand {
        date,
        date_style,
        all,
        dir: _,
    }: ReportCommand,
    dir: &Path,
) -> Result<()> {
    let store = JsonTimerStore::new(dir.join(STATE_FILE_NAME))?;
    let timers = store.load();

    if all {
        print_all(&timers);
        return Ok(());
    }

    let day = match date {
        Some(raw) => match parse_date_string(&raw, Local::now(), date_style.into()) {
            Ok(parsed) => day_key(parsed.date_naive()),
            Err(e) => {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("Failed to validate date {e}"),
                    )
                    .into());
            }
        },
        None => local_day_key(Utc::now()),
    };

    print_day(&timers, &day);
    Ok(())
}

/// Records for `day`, longest first.
fn day_rows<'a>(timers: &'a DomainTimers, day: &str) -> Vec<(Duration, &'a Arc<str>)> {
    let mut rows: Vec<_> = timers
        .iter()
        .filter(|(_, record)| record.date == day)
        .map(|(domain, record)| (record.total_time, domain))
        .collect();
    rows.sort();
    rows.reverse();
    rows
}

/// Every stored record, newest day first, longest first within a day.
fn all_rows(timers: &DomainTimers) -> Vec<(&str, Duration, &Arc<str>)> {
    let mut rows: Vec<_> = timers
        .iter()
        .map(|(domain, record)| (record.date.as_str(), record.total_time, domain))
        .collect();
    rows.sort();
    rows.reverse();
    rows
}

fn print_day(timers: &DomainTimers, day: &str) {
    let rows = day_rows(timers, day);
    if rows.is_empty() {
        println!("No time recorded for {day}");
        return;
    }

    let mut total = Duration::zero();
    for (duration, domain) in &rows {
        println!("{}\t{}", format_elapsed(*duration), domain);
        total = total + *duration;
    }
    println!(
        "{}\t{}",
        Style::new().bold().paint(format_elapsed(total)),
        Style::new().bold().paint("total")
    );
}

fn print_all(timers: &DomainTimers) {
    let rows = all_rows(timers);
    if rows.is_empty() {
        println!("Nothing recorded yet");
        return;
    }

    for (date, duration, domain) in rows {
        println!(
            "{}\t{}\t{}",
            Style::new().dimmed().paint(date),
            format_elapsed(duration),
            domain
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::storage::entities::{DomainTimerRecord, DomainTimers};

    use super::{all_rows, day_rows};

    fn record(date: &str, seconds: i64) -> DomainTimerRecord {
        DomainTimerRecord {
            total_time: Duration::seconds(seconds),
            session_start: Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap(),
            date: date.to_owned(),
        }
    }

    fn sample() -> DomainTimers {
        let mut timers = DomainTimers::new();
        timers.insert("youtube.com".into(), record("2018-07-04", 120));
        timers.insert("example.org".into(), record("2018-07-04", 3600));
        timers.insert("old.example.org".into(), record("2018-07-03", 50));
        timers
    }

    #[test]
    fn test_day_rows_filter_and_order() {
        let timers = sample();
        let rows = day_rows(&timers, "2018-07-04");

        assert_eq!(rows.len(), 2);
        assert_eq!(&**rows[0].1, "example.org");
        assert_eq!(&**rows[1].1, "youtube.com");
    }

    #[test]
    fn test_day_rows_empty_for_unknown_day() {
        let timers = sample();
        assert!(day_rows(&timers, "2020-01-01").is_empty());
    }

    #[test]
    fn test_all_rows_group_newest_day_first() {
        let timers = sample();
        let rows = all_rows(&timers);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "2018-07-04");
        assert_eq!(&**rows[0].2, "example.org");
        assert_eq!(rows[2].0, "2018-07-03");
    }
}
