use clap::Subcommand;
use serde_json::json;
use studyroom_core::model::validate_rating;
use studyroom_core::{Config, EntityStore, Session};

use super::{open_store, print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List recorded sessions, newest first
    List {
        /// Maximum number of sessions
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Rate a session's productivity from 1 to 5
    Rate {
        /// Session ID
        id: String,
        rating: u8,
    },
}

pub fn run(action: SessionAction, config: &Config) -> CliResult {
    let store = open_store(config)?;
    let rt = runtime()?;

    match action {
        SessionAction::List { limit } => {
            let sessions: Vec<Session> =
                rt.block_on(store.list("-created_date", Some(limit)))?;
            print_json(&sessions)?;
        }
        SessionAction::Rate { id, rating } => {
            let rating = validate_rating(rating)?;
            let session: Session = rt.block_on(
                store.update(&id, json!({ "productivity_rating": rating })),
            )?;
            print_json(&session)?;
        }
    }
    Ok(())
}
