use chrono::NaiveDateTime;

/// One persisted row of the rate log.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub primary_rate: f64,
    pub secondary_rate: Option<f64>,
    pub primary_diff: f64,
    pub secondary_diff: f64,
}

impl RateSample {
    pub fn diff(&self) -> RateDiff {
        RateDiff {
            primary: self.primary_diff,
            secondary: self.secondary_diff,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateDiff {
    pub primary: f64,
    pub secondary: f64,
}

/// Result of [`RateStore::log_rates`](super::RateStore::log_rates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutcome {
    Inserted(RateDiff),
    /// Deduplicated; carries the diffs of the latest stored sample.
    Unchanged(RateDiff),
    /// Nothing could be read or written, the diff is unknown.
    Failed,
}

impl LogOutcome {
    pub fn diff(&self) -> Option<RateDiff> {
        match self {
            LogOutcome::Inserted(diff) | LogOutcome::Unchanged(diff) => Some(*diff),
            LogOutcome::Failed => None,
        }
    }
}
