use anyhow::Result;
use chrono::Local;
use clap::Parser;

use crate::daemon::storage::event_store::EventStore;

const DEFAULT_STATS_LIMIT: usize = 20;

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[arg(short, long, default_value_t = DEFAULT_STATS_LIMIT, help = "Number of applications to show")]
    limit: usize,
    #[arg(long, help = "Print statistics as json")]
    json: bool,
}

pub fn process_stats_command(store: &EventStore, StatsCommand { limit, json }: StatsCommand) -> Result<()> {
    let stats = store.app_statistics(limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let total = store.count_events()?;
    for stat in stats {
        let share = if total == 0 {
            0
        } else {
            stat.count * 100 / total
        };
        println!(
            "{}\t{}%\t{}\t{}\t{}",
            stat.count,
            share,
            stat.first_seen.with_timezone(&Local).format("%x %H:%M"),
            stat.last_seen.with_timezone(&Local).format("%x %H:%M"),
            stat.app
        );
    }
    Ok(())
}
