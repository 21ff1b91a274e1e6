//! USD/SOL price oracle.
//!
//! Fetches the SOL price from a CoinGecko-compatible `simple/price` endpoint
//! and keeps the latest quote. A failed fetch is logged and otherwise
//! ignored: the previous quote stays in place and ages into `Stale`.

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use solshop_core::{ExchangeRate, RateQuote};
use thiserror::Error;

use crate::config::PriceApiConfig;

/// Header carrying a CoinGecko demo API key.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Request timeout for a single price fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching a price.
#[derive(Debug, Error)]
pub enum PriceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The quoted price was zero or negative.
    #[error("Non-positive price: {0}")]
    NonPositive(Decimal),
}

/// `simple/price` response for `ids=solana&vs_currencies=usd`.
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    solana: CoinPrice,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    usd: serde_json::Number,
}

/// Parse a `simple/price` body into a positive USD price.
///
/// The JSON number is converted through its textual form so the decimal
/// matches what the API sent, not its nearest binary float.
fn parse_price(body: &str) -> Result<Decimal, PriceError> {
    let response: SimplePriceResponse =
        serde_json::from_str(body).map_err(|e| PriceError::Parse(e.to_string()))?;

    let text = response.solana.usd.to_string();
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| PriceError::Parse(format!("invalid price '{text}': {e}")))?;

    if price <= Decimal::ZERO {
        return Err(PriceError::NonPositive(price));
    }
    Ok(price)
}

/// HTTP client for the price API.
#[derive(Clone)]
pub struct PriceClient {
    client: reqwest::Client,
    base_url: String,
}

impl PriceClient {
    /// Create a new price API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the API key is not
    /// a valid header value.
    pub fn new(config: &PriceApiConfig) -> Result<Self, PriceError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        if let Some(key) = config.api_key() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| PriceError::Parse(format!("Invalid API key format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Fetch the current USD price of one SOL.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a body
    /// without a positive `solana.usd` price.
    pub async fn fetch_sol_usd(&self) -> Result<Decimal, PriceError> {
        let url = format!("{}/simple/price?ids=solana&vs_currencies=usd", self.base_url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PriceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_price(&body)
    }
}

/// Holds the latest quote and classifies it as fresh or stale on read.
pub struct PriceOracle {
    client: PriceClient,
    quote: RwLock<Option<RateQuote>>,
    stale_after: chrono::Duration,
}

impl PriceOracle {
    /// Create an oracle with no quote.
    #[must_use]
    pub fn new(client: PriceClient, stale_after: Duration) -> Self {
        Self {
            client,
            quote: RwLock::new(None),
            stale_after: chrono::Duration::from_std(stale_after)
                .unwrap_or_else(|_| chrono::Duration::MAX),
        }
    }

    /// Create an oracle from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &PriceApiConfig) -> Result<Self, PriceError> {
        Ok(Self::new(PriceClient::new(config)?, config.stale_after))
    }

    /// The current rate, classified against the staleness window.
    #[must_use]
    pub fn current(&self) -> ExchangeRate {
        let quote = *self.quote.read().unwrap_or_else(PoisonError::into_inner);
        ExchangeRate::classify(quote, Utc::now(), self.stale_after)
    }

    /// Store a quote for `usd_per_sol` taken now.
    pub fn record(&self, usd_per_sol: Decimal) -> RateQuote {
        let quote = RateQuote::new(usd_per_sol, Utc::now());
        *self.quote.write().unwrap_or_else(PoisonError::into_inner) = Some(quote);
        quote
    }

    /// Fetch a new quote, keeping the previous one on failure.
    ///
    /// Returns the current rate after the attempt.
    pub async fn refresh(&self) -> ExchangeRate {
        match self.client.fetch_sol_usd().await {
            Ok(price) => {
                let quote = self.record(price);
                tracing::info!(usd_per_sol = %quote.usd_per_sol, "Exchange rate updated");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch exchange rate");
            }
        }
        self.current()
    }

    /// Fetch once now, then every `interval` if one is given.
    pub fn spawn_refresh(self: Arc<Self>, interval: Option<Duration>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.refresh().await;

            let Some(period) = interval else {
                return;
            };

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; that fetch already happened.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.refresh().await;
            }
        })
    }
}
