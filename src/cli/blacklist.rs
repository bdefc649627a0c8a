use anyhow::Result;
use clap::Subcommand;

use crate::daemon::storage::event_store::EventStore;

#[derive(Debug, Subcommand)]
pub enum BlacklistCommand {
    #[command(about = "Print current keywords")]
    List {},
    #[command(about = "Stop recording windows whose app or title contains any of the keywords")]
    Add { keywords: Vec<String> },
    #[command(about = "Remove keywords, ignoring case")]
    Remove { keywords: Vec<String> },
    #[command(about = "Remove every keyword")]
    Clear {},
}

pub fn process_blacklist_command(mut store: EventStore, command: BlacklistCommand) -> Result<()> {
    let current = store.blacklist()?;
    let keywords = match command {
        BlacklistCommand::List {} => current,
        BlacklistCommand::Add { keywords } => {
            store.set_blacklist(current.into_iter().chain(keywords))?
        }
        BlacklistCommand::Remove { keywords } => {
            store.set_blacklist(without(current, &keywords))?
        }
        BlacklistCommand::Clear {} => store.set_blacklist(Vec::<String>::new())?,
    };
    for keyword in keywords {
        println!("{keyword}");
    }
    Ok(())
}

fn without(current: Vec<String>, removed: &[String]) -> Vec<String> {
    current
        .into_iter()
        .filter(|v| {
            !removed
                .iter()
                .any(|removed| removed.trim().to_lowercase() == v.to_lowercase())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::without;

    #[test]
    fn test_remove_ignores_case() {
        let current = vec!["KeePass".to_string(), "bank".to_string()];

        assert_eq!(without(current, &[" keepass ".to_string()]), vec!["bank".to_string()]);
    }
}
