use super::ui;
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Runs the scheduler in a background task and renders every snapshot until
/// interrupted.
pub async fn watch(scheduler: Scheduler, period: Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(8);
    let worker = tokio::spawn(scheduler.run(period, tx));

    loop {
        tokio::select! {
            snapshot = rx.recv() => match snapshot {
                Some(snapshot) => println!("{}\n", ui::render_snapshot(&snapshot)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for interrupt")?;
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }

    worker.await.context("Scheduler task failed")?;
    Ok(())
}

/// Performs a single full refresh and prints the result.
pub async fn once(mut scheduler: Scheduler) -> Result<()> {
    let snapshot = scheduler.tick().await;
    println!("{}", ui::render_snapshot(&snapshot));
    Ok(())
}
