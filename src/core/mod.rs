//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod rate;

// Re-export main types for cleaner imports
pub use rate::{
    Clock, FetchError, FetchResult, FetchStatus, LastRates, RATE_EPSILON, RateSource, SystemClock,
};
