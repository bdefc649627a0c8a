pub mod blacklist;
pub mod daemon_path;
pub mod process;
pub mod search;
pub mod stats;
pub mod timeline;

use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use blacklist::{BlacklistCommand, process_blacklist_command};
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use search::{SearchCommand, TagCommand, print_recent_searches, process_search_command, process_tag_command};
use stats::{StatsCommand, process_stats_command};
use timeline::{TimelineCommand, process_timeline_command};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{DEFAULT_COLLECTION_INTERVAL, start_daemon, storage::event_store::EventStore},
    utils::{
        dir::{create_application_default_path, database_path},
        logging::{CLI_PREFIX, enable_logging},
    },
};

#[derive(Parser, Debug)]
#[command(name = "memtrail", version, long_about = None)]
#[command(about = "Records the windows you use and lets you search through them", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct CollectionParams {
    #[arg(
        long,
        default_value_t = DEFAULT_COLLECTION_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two samples of the active window"
    )]
    interval: u64,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[command(flatten)]
        params: CollectionParams,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[command(flatten)]
        params: CollectionParams,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Search recorded activity")]
    Search {
        #[command(flatten)]
        command: SearchCommand,
    },
    #[command(about = "Show recently submitted searches")]
    Recent {},
    #[command(about = "Attach a tag to a recorded event")]
    Tag {
        #[command(flatten)]
        command: TagCommand,
    },
    #[command(about = "Manage keywords that stop windows from being recorded")]
    Blacklist {
        #[command(subcommand)]
        command: BlacklistCommand,
    },
    #[command(about = "Show the most used applications")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Display every recorded event of a single day")]
    Timeline {
        #[command(flatten)]
        command: TimelineCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init { params } => {
            restart_server(&app_dir, params.interval)?;
            Ok(())
        }
        Commands::Stop {} => {
            let process_name = env::current_exe().context("Can't locate the current executable")?;
            kill_previous_servers(&process_name)?;
            kill_previous_servers(&daemon_path::to_daemon_path(process_name))?;
            Ok(())
        }
        Commands::Serve { params } => {
            start_daemon(&app_dir, Duration::from_secs(params.interval)).await?;
            Ok(())
        }
        Commands::Search { command } => process_search_command(open_store(&app_dir)?, command),
        Commands::Recent {} => print_recent_searches(&open_store(&app_dir)?),
        Commands::Tag { command } => process_tag_command(open_store(&app_dir)?, command),
        Commands::Blacklist { command } => {
            process_blacklist_command(open_store(&app_dir)?, command)
        }
        Commands::Stats { command } => process_stats_command(&open_store(&app_dir)?, command),
        Commands::Timeline { command } => process_timeline_command(&open_store(&app_dir)?, command),
    }
}

fn open_store(app_dir: &std::path::Path) -> Result<EventStore> {
    EventStore::open(&database_path(app_dir))
}
