//! Acquisition loop deciding between full and partial refreshes.

use crate::core::{Clock, FetchResult, FetchStatus, RateSource};
use crate::status;
use crate::store::{LogOutcome, RateStore};
use chrono::{DateTime, Local, Timelike};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Both sources fetched.
    Full,
    /// Only the secondary source fetched, primary reused.
    Partial,
}

/// Everything the presentation layer needs to render one update.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub refresh: RefreshKind,
    pub primary_name: String,
    pub secondary_name: String,
    pub primary_text: String,
    pub secondary_text: String,
    pub spread_text: String,
    pub status: String,
    pub primary_valid: bool,
    pub secondary_valid: bool,
    pub spread_positive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub last_full_refresh_hour: Option<u32>,
    pub last_known_primary: f64,
    pub last_known_secondary: f64,
    last_primary: Option<FetchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Startup,
    Steady,
}

pub struct Scheduler {
    primary: Box<dyn RateSource>,
    secondary: Box<dyn RateSource>,
    store: RateStore,
    clock: Box<dyn Clock>,
    target_hours: BTreeSet<u32>,
    state: SchedulerState,
    phase: Phase,
}

impl Scheduler {
    pub fn new(
        primary: Box<dyn RateSource>,
        secondary: Box<dyn RateSource>,
        store: RateStore,
        clock: Box<dyn Clock>,
        target_hours: BTreeSet<u32>,
    ) -> Self {
        let last = store.get_last_rates();
        debug!(?last, ?target_hours, "Seeding scheduler from rate store");
        Self {
            primary,
            secondary,
            store,
            clock,
            target_hours,
            state: SchedulerState {
                last_known_primary: last.primary,
                last_known_secondary: last.secondary,
                ..SchedulerState::default()
            },
            phase: Phase::Startup,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn store(&self) -> &RateStore {
        &self.store
    }

    fn full_refresh_due(&self, hour: u32) -> bool {
        self.target_hours.contains(&hour) && self.state.last_full_refresh_hour != Some(hour)
    }

    /// Runs one acquisition cycle. The first call always performs a full refresh.
    pub async fn tick(&mut self) -> RateSnapshot {
        let now = self.clock.now();
        let hour = now.hour();
        let refresh = match self.phase {
            Phase::Startup => RefreshKind::Full,
            Phase::Steady if self.full_refresh_due(hour) => RefreshKind::Full,
            Phase::Steady => RefreshKind::Partial,
        };
        self.phase = Phase::Steady;

        match refresh {
            RefreshKind::Full => self.full_refresh(now).await,
            RefreshKind::Partial => self.partial_refresh(now).await,
        }
    }

    async fn full_refresh(&mut self, now: DateTime<Local>) -> RateSnapshot {
        let hour = now.hour();
        info!(hour, "Running full refresh");
        let fallback = self.store.get_last_rates();
        let primary = usable_or_fallback(
            self.primary.fetch(fallback, now).await,
            self.state.last_known_primary,
        );
        let secondary = usable_or_fallback(
            self.secondary.fetch(fallback, now).await,
            self.state.last_known_secondary,
        );

        if primary.status.is_failure() || secondary.status.is_failure() {
            warn!(
                primary = %primary.status,
                secondary = %secondary.status,
                "Full refresh reported a failure, will retry this hour"
            );
        } else {
            self.state.last_full_refresh_hour = Some(hour);
        }

        if let Some(rate) = primary.value {
            self.state.last_known_primary = rate;
        }
        self.state.last_primary = Some(primary);
        self.record(RefreshKind::Full, secondary, now)
    }

    async fn partial_refresh(&mut self, now: DateTime<Local>) -> RateSnapshot {
        debug!(primary = self.state.last_known_primary, "Running partial refresh");
        let fallback = self.store.get_last_rates();
        let secondary = usable_or_fallback(
            self.secondary.fetch(fallback, now).await,
            self.state.last_known_secondary,
        );
        self.record(RefreshKind::Partial, secondary, now)
    }

    /// Persists the current pair and builds the snapshot for it.
    fn record(
        &mut self,
        refresh: RefreshKind,
        secondary: FetchResult,
        now: DateTime<Local>,
    ) -> RateSnapshot {
        if let Some(rate) = secondary.value {
            self.state.last_known_secondary = rate;
        }

        let primary_rate = self.state.last_known_primary;
        let outcome = if primary_rate > 0.0 {
            self.store.log_rates_at(primary_rate, secondary.value, now.naive_local())
        } else {
            warn!("No valid primary rate available, skipping persistence");
            LogOutcome::Failed
        };
        let diff = outcome.diff();

        let primary = self.state.last_primary.clone().unwrap_or_else(|| {
            FetchResult::fallback(primary_rate, FetchStatus::GenericFail, now)
        });
        let primary_line = status::format_status(
            primary.status,
            primary.captured_at,
            diff.map(|d| d.primary),
            self.primary.name(),
        );
        let secondary_line = status::format_status(
            secondary.status,
            secondary.captured_at,
            diff.map(|d| d.secondary),
            self.secondary.name(),
        );

        let primary_value = (primary_rate > 0.0).then_some(primary_rate);
        let secondary_value = secondary.value;
        let spread = secondary_value.unwrap_or(0.0) - primary_value.unwrap_or(0.0);

        RateSnapshot {
            refresh,
            primary_name: self.primary.name().to_string(),
            secondary_name: self.secondary.name().to_string(),
            primary_text: status::format_rate(primary_value),
            secondary_text: status::format_rate(secondary_value),
            spread_text: status::format_spread(primary_value, secondary_value),
            status: status::combine(&primary_line, &secondary_line),
            primary_valid: primary_value.is_some(),
            secondary_valid: secondary_value.is_some_and(|v| v > 0.0),
            spread_positive: spread >= 0.0,
        }
    }

    /// Ticks forever on `period`, handing every snapshot to `sink`.
    ///
    /// Returns once the receiving side of `sink` is dropped.
    pub async fn run(mut self, period: Duration, sink: mpsc::Sender<RateSnapshot>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let snapshot = self.tick().await;
            if sink.send(snapshot).await.is_err() {
                info!("Snapshot receiver closed, stopping scheduler");
                return;
            }
        }
    }
}

/// Demotes a successful result without a positive rate to a parse failure
/// carrying the last known value.
fn usable_or_fallback(result: FetchResult, last_known: f64) -> FetchResult {
    if result.status.is_failure() || result.value.is_some_and(|v| v > 0.0) {
        return result;
    }
    warn!(value = ?result.value, "Source reported a non-positive rate, keeping last known");
    FetchResult::fallback(last_known, FetchStatus::ParseFail, result.captured_at)
}
