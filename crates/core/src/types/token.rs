//! Native token amounts: whole SOL and lamports.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// An amount of lamports, the smallest indivisible unit of SOL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(lamports: u64) -> Self {
        Self(lamports)
    }

    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The same amount in whole SOL.
    #[must_use]
    pub fn to_sol(&self) -> SolAmount {
        SolAmount::new(Decimal::from(self.0) / Decimal::from(LAMPORTS_PER_SOL))
    }
}

impl std::fmt::Display for Lamports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} lamports", self.0)
    }
}

impl From<u64> for Lamports {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An amount of SOL as an exact decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolAmount(Decimal);

impl SolAmount {
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Exact lamport value, fractional part included.
    ///
    /// Returns `None` if the multiplication overflows.
    #[must_use]
    pub fn lamports_exact(&self) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(LAMPORTS_PER_SOL))
    }

    /// Lamport value truncated toward negative infinity.
    ///
    /// Returns `None` for negative amounts or values that do not fit in a `u64`.
    #[must_use]
    pub fn to_lamports_floor(&self) -> Option<Lamports> {
        self.lamports_exact()?.floor().to_u64().map(Lamports)
    }

    /// Format for display with four decimal places (e.g., "1.2500 SOL").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.4} SOL", self.0.round_dp(4))
    }
}
