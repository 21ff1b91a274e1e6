//! USD/SOL exchange rate state.
//!
//! A rate is never a bare number: until a quote has been fetched it is
//! [`ExchangeRate::Unset`], and conversion against it yields nothing rather
//! than dividing by zero.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, SolAmount};

/// A single USD price quote for one SOL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    /// Price of one SOL in USD.
    #[serde(with = "rust_decimal::serde::str")]
    pub usd_per_sol: Decimal,
    /// When the quote was received.
    pub fetched_at: DateTime<Utc>,
}

impl RateQuote {
    #[must_use]
    pub const fn new(usd_per_sol: Decimal, fetched_at: DateTime<Utc>) -> Self {
        Self {
            usd_per_sol,
            fetched_at,
        }
    }
}

/// The exchange rate as seen at a particular instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "quote", rename_all = "snake_case")]
pub enum ExchangeRate {
    /// No quote has been fetched yet.
    #[default]
    Unset,
    /// A quote within the staleness window.
    Fresh(RateQuote),
    /// A quote older than the staleness window.
    Stale(RateQuote),
}

impl ExchangeRate {
    /// Classify an optional quote against a staleness window.
    ///
    /// A quote exactly `max_age` old is still fresh.
    #[must_use]
    pub fn classify(quote: Option<RateQuote>, now: DateTime<Utc>, max_age: Duration) -> Self {
        match quote {
            None => Self::Unset,
            Some(q) if now.signed_duration_since(q.fetched_at) > max_age => Self::Stale(q),
            Some(q) => Self::Fresh(q),
        }
    }

    /// The underlying quote, fresh or stale.
    #[must_use]
    pub const fn quote(&self) -> Option<&RateQuote> {
        match self {
            Self::Unset => None,
            Self::Fresh(q) | Self::Stale(q) => Some(q),
        }
    }

    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Convert a USD price to SOL at this rate.
    ///
    /// Returns `None` when no quote is available or the quoted price is not
    /// positive.
    #[must_use]
    pub fn convert(&self, usd: Price) -> Option<SolAmount> {
        let quote = self.quote()?;
        if quote.usd_per_sol <= Decimal::ZERO {
            return None;
        }
        usd.amount.checked_div(quote.usd_per_sol).map(SolAmount::new)
    }

    /// Display a converted price, or a dash when there is no rate.
    #[must_use]
    pub fn display_sol(&self, usd: Price) -> String {
        self.convert(usd)
            .map_or_else(|| "— SOL".to_string(), |sol| sol.display())
    }
}
