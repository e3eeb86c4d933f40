use crate::core::config::OfficialSourceConfig;
use crate::core::{FetchError, FetchResult, LastRates, RateSource};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

const RATE_CONTAINER: &str = "#dolar";
const RATE_VALUE: &str = "strong";

/// Scrapes the official rate from the central bank's landing page.
pub struct OfficialRateSource {
    name: String,
    url: String,
    client: Client,
}

impl OfficialRateSource {
    pub fn new(config: &OfficialSourceConfig, client: Client) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            client,
        }
    }

    async fn fetch_rate(&self) -> Result<f64, FetchError> {
        debug!("Requesting official rate page from {}", self.url);
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_rate(&body)
    }
}

/// Locates the rate element in the page and parses its text.
pub fn extract_rate(html: &str) -> Result<f64, FetchError> {
    let container = Selector::parse(RATE_CONTAINER)
        .map_err(|e| FetchError::Generic(format!("invalid selector {RATE_CONTAINER}: {e}")))?;
    let value = Selector::parse(RATE_VALUE)
        .map_err(|e| FetchError::Generic(format!("invalid selector {RATE_VALUE}: {e}")))?;

    let document = Html::parse_document(html);
    let text = document
        .select(&container)
        .next()
        .ok_or_else(|| FetchError::Parse(format!("element {RATE_CONTAINER} not found")))?
        .select(&value)
        .next()
        .ok_or_else(|| FetchError::Parse(format!("no <{RATE_VALUE}> inside {RATE_CONTAINER}")))?
        .text()
        .collect::<String>();

    parse_locale_decimal(&text)
}

/// Parses a number written with `.` as the thousands separator and `,` as the
/// decimal separator, e.g. `36.452,1090`.
///
/// Only strictly positive rates are accepted.
pub fn parse_locale_decimal(text: &str) -> Result<f64, FetchError> {
    let normalized = text.trim().replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .filter(|v| *v > 0.0)
        .ok_or_else(|| FetchError::Parse(format!("malformed rate value: '{}'", text.trim())))
}

#[async_trait]
impl RateSource for OfficialRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "OfficialRateFetch", skip(self), fields(source = %self.name))]
    async fn fetch(&self, fallback: LastRates, now: DateTime<Local>) -> FetchResult {
        match self.fetch_rate().await {
            Ok(rate) => {
                debug!(rate, "Fetched official rate");
                FetchResult::ok(rate, now)
            }
            Err(e) => {
                warn!(error = %e, fallback = fallback.primary, "Official rate fetch failed");
                FetchResult::fallback(fallback.primary, e.status(), now)
            }
        }
    }
}
