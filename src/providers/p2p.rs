use crate::core::config::P2pSourceConfig;
use crate::core::{FetchError, FetchResult, FetchStatus, LastRates, RateSource};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    asset: &'a str,
    fiat: &'a str,
    trade_type: &'a str,
    page: u32,
    rows: u32,
    filter_type: &'a str,
    pay_types: Vec<String>,
    publisher_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Listing>>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    adv: Option<Advert>,
}

#[derive(Debug, Deserialize)]
struct Advert {
    price: Option<String>,
}

/// Peer-market rate from the P2P advert search API, with a fallback endpoint.
pub struct P2pRateSource {
    config: P2pSourceConfig,
    client: Client,
}

impl P2pRateSource {
    pub fn new(config: &P2pSourceConfig, client: Client) -> Self {
        Self {
            config: config.clone(),
            client,
        }
    }

    fn request(&self) -> SearchRequest<'_> {
        SearchRequest {
            asset: &self.config.asset,
            fiat: &self.config.fiat,
            trade_type: &self.config.trade_type,
            page: 1,
            rows: self.config.rows,
            filter_type: "all",
            pay_types: Vec::new(),
            publisher_type: None,
        }
    }

    async fn fetch_from(&self, url: &str) -> Result<f64, FetchError> {
        debug!("Requesting P2P adverts from {}", url);
        let response = self
            .client
            .post(url)
            .json(&self.request())
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Parse(format!("unexpected P2P response: {e}")))?;

        best_offer(&parsed.data.unwrap_or_default()).ok_or(FetchError::EmptyData)
    }

    /// Tries each endpoint in order, returning the first success or the last error.
    async fn fetch_rate(&self) -> Result<f64, FetchError> {
        match self.fetch_from(&self.config.primary_url).await {
            Ok(rate) => Ok(rate),
            Err(e) => {
                warn!(error = %e, "Primary P2P endpoint failed, trying fallback");
                self.fetch_from(&self.config.fallback_url).await
            }
        }
    }
}

/// Lowest valid price among the listings (the best offer for a seller).
fn best_offer(listings: &[Listing]) -> Option<f64> {
    listings
        .iter()
        .filter_map(|l| l.adv.as_ref()?.price.as_deref())
        .filter_map(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

#[async_trait]
impl RateSource for P2pRateSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(name = "P2pRateFetch", skip(self), fields(source = %self.config.name))]
    async fn fetch(&self, fallback: LastRates, now: DateTime<Local>) -> FetchResult {
        match self.fetch_rate().await {
            Ok(rate) => {
                debug!(rate, "Fetched P2P rate");
                FetchResult::ok(rate, now)
            }
            Err(e) if fallback.primary > 0.0 => {
                warn!(
                    error = %e,
                    approximation = fallback.primary,
                    "All P2P endpoints failed, approximating from primary rate"
                );
                FetchResult::fallback(fallback.primary, FetchStatus::Approximated, now)
            }
            Err(e) => {
                warn!(error = %e, fallback = fallback.secondary, "All P2P endpoints failed");
                FetchResult::fallback(fallback.secondary, FetchStatus::NetworkFail, now)
            }
        }
    }
}
