use std::fmt::Display;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    daemon::storage::{entities::Event, event_store::EventStore},
    utils::time::start_of_day,
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
pub struct TimelineCommand {
    #[arg(
        help = "Day to show. Examples are \"today\", \"yesterday\", \"15/03/2025\", \"last friday\"",
        default_value = "today"
    )]
    day: String,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

/// Prints every event of one local day, oldest first, with how long each window stayed in
/// focus.
pub fn process_timeline_command(
    store: &EventStore,
    TimelineCommand { day, date_style }: TimelineCommand,
) -> Result<()> {
    let (start, end) = parse_day(&day, date_style)?;
    let events = store.events_between(start.into(), end.into())?;
    if events.is_empty() {
        println!("Nothing recorded on {}", start.format("%x"));
        return Ok(());
    }

    let now = Local::now();
    for (event, duration) in with_durations(&events, end.min(now).into()) {
        println!(
            "{}\t{}\t{}\t{}",
            event.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            format_duration(duration),
            event.app,
            event.title
        );
    }
    Ok(())
}

fn parse_day(day: &str, date_style: DateStyle) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let now = Local::now();
    let day = match parse_date_string(day, now, date_style.into()) {
        Ok(v) => v.with_timezone(&Local),
        Err(e) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate day {e}"),
                )
                .into());
        }
    };
    let start = day.beginning_of_day();
    let end = start
        .date_naive()
        .succ_opt()
        .and_then(|next| start_of_day(&Local, next))
        .context("Day is out of range")?;
    Ok((start, end))
}

/// Pairs each event with the time until the next one. The last event lasts until `close`.
fn with_durations(
    events: &[Event],
    close: DateTime<chrono::Utc>,
) -> impl Iterator<Item = (&Event, Duration)> {
    events.iter().enumerate().map(move |(i, event)| {
        let until = events.get(i + 1).map_or(close, |next| next.timestamp);
        (event, (until - event.timestamp).max(Duration::zero()))
    })
}

fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{format_duration, with_durations};
    use crate::daemon::storage::entities::Event;

    fn event(id: i64, app: &str, minutes: i64) -> Event {
        Event {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
            app: app.into(),
            title: "".into(),
            tags: vec![],
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(format_duration(Duration::seconds(3725)), "1h2m5s");
    }

    #[test]
    fn test_each_event_lasts_until_the_next() {
        let events = vec![event(1, "code", 0), event(2, "slack", 15), event(3, "code", 20)];
        let close = events[2].timestamp + Duration::minutes(3);

        let durations = with_durations(&events, close)
            .map(|(event, duration)| (event.id, duration.num_minutes()))
            .collect::<Vec<_>>();

        assert_eq!(durations, vec![(1, 15), (2, 5), (3, 3)]);
    }
}
