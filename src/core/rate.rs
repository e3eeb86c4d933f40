//! Rate acquisition abstractions and core types

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt::Display;
use thiserror::Error;

/// Two readings are considered equal when they differ by no more than this.
pub const RATE_EPSILON: f64 = 1e-9;

/// Outcome tag attached to every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Ok,
    NetworkFail,
    ParseFail,
    EmptyData,
    GenericFail,
    /// Secondary source unavailable, value approximated from the last primary rate.
    Approximated,
}

impl FetchStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, FetchStatus::Ok)
    }
}

impl Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FetchStatus::Ok => "OK",
                FetchStatus::NetworkFail => "NETWORK_FAIL",
                FetchStatus::ParseFail => "PARSE_FAIL",
                FetchStatus::EmptyData => "EMPTY_DATA",
                FetchStatus::GenericFail => "GENERIC_FAIL",
                FetchStatus::Approximated => "APPROXIMATED",
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("response contained no usable price entries")]
    EmptyData,
    #[error("unexpected error: {0}")]
    Generic(String),
}

impl FetchError {
    pub fn status(&self) -> FetchStatus {
        match self {
            FetchError::Network(_) => FetchStatus::NetworkFail,
            FetchError::Parse(_) => FetchStatus::ParseFail,
            FetchError::EmptyData => FetchStatus::EmptyData,
            FetchError::Generic(_) => FetchStatus::GenericFail,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if err.is_builder() {
            FetchError::Generic(err.to_string())
        } else {
            // timeouts, connect/TLS failures and non-2xx statuses
            FetchError::Network(err.to_string())
        }
    }
}

/// Most recent rates known to the store, `0.0` when nothing has been recorded yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastRates {
    pub primary: f64,
    pub secondary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub value: Option<f64>,
    pub status: FetchStatus,
    pub captured_at: DateTime<Local>,
}

impl FetchResult {
    pub fn ok(value: f64, captured_at: DateTime<Local>) -> Self {
        Self {
            value: Some(value),
            status: FetchStatus::Ok,
            captured_at,
        }
    }

    /// Failed fetch carrying the best historical value, if there ever was one.
    pub fn fallback(value: f64, status: FetchStatus, captured_at: DateTime<Local>) -> Self {
        Self {
            value: (value > 0.0).then_some(value),
            status,
            captured_at,
        }
    }
}

/// A single external exchange rate source.
///
/// Implementations never propagate errors; failures degrade to `fallback` tagged
/// with the failure kind. Every result is stamped with `now`, supplied by the caller.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, fallback: LastRates, now: DateTime<Local>) -> FetchResult;
}

/// Wall-clock source for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
