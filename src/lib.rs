pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod status;
pub mod store;

use crate::core::SystemClock;
use crate::core::config::AppConfig;
use crate::providers::util::build_client;
use crate::providers::{OfficialRateSource, P2pRateSource};
use crate::scheduler::Scheduler;
use crate::store::RateStore;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Watch,
    Once,
    History { limit: usize },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ratewatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = RateStore::open(config.database_path()?)?;

    match command {
        AppCommand::Watch => {
            let scheduler = build_scheduler(&config, store)?;
            cli::watch::watch(scheduler, config.tick_interval()).await
        }
        AppCommand::Once => {
            let scheduler = build_scheduler(&config, store)?;
            cli::watch::once(scheduler).await
        }
        AppCommand::History { limit } => cli::history::show_history(&store, &config, limit),
    }
}

/// Wires the configured rate sources, the store and the system clock together.
///
/// Both sources share one HTTP client.
pub fn build_scheduler(config: &AppConfig, store: RateStore) -> Result<Scheduler> {
    let client = build_client(&config.http)?;
    let primary = OfficialRateSource::new(&config.sources.official, client.clone());
    let secondary = P2pRateSource::new(&config.sources.p2p, client);

    Ok(Scheduler::new(
        Box::new(primary),
        Box::new(secondary),
        store,
        Box::new(SystemClock),
        config.target_hours.clone(),
    ))
}
