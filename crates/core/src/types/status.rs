//! Status enums for checkout.

use serde::{Deserialize, Serialize};

/// Phase of a single checkout attempt.
///
/// ```text
/// Idle -> ValidatingWallet -> ComputingAmount -> CheckingBalance
///      -> BuildingTransaction -> AwaitingSignature -> AwaitingConfirmation
///      -> Succeeded | Failed
/// ```
///
/// Any phase before `Succeeded` may move to `Failed`. Both terminal phases
/// return to `Idle`; nothing resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    #[default]
    Idle,
    ValidatingWallet,
    ComputingAmount,
    CheckingBalance,
    BuildingTransaction,
    AwaitingSignature,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl CheckoutPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use CheckoutPhase::{
            AwaitingConfirmation, AwaitingSignature, BuildingTransaction, CheckingBalance,
            ComputingAmount, Failed, Idle, Succeeded, ValidatingWallet,
        };

        match (self, next) {
            (Idle, ValidatingWallet)
            | (ValidatingWallet, ComputingAmount)
            | (ComputingAmount, CheckingBalance)
            | (CheckingBalance, BuildingTransaction)
            | (BuildingTransaction, AwaitingSignature)
            | (AwaitingSignature, AwaitingConfirmation)
            | (AwaitingConfirmation, Succeeded)
            | (Succeeded | Failed, Idle)
            | (
                ValidatingWallet
                | ComputingAmount
                | CheckingBalance
                | BuildingTransaction
                | AwaitingSignature
                | AwaitingConfirmation,
                Failed,
            ) => true,
            _ => false,
        }
    }

    /// Whether the attempt has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a transaction may already have been handed to the network.
    #[must_use]
    pub const fn is_submitted(self) -> bool {
        matches!(self, Self::AwaitingSignature | Self::AwaitingConfirmation)
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ValidatingWallet => "validating_wallet",
            Self::ComputingAmount => "computing_amount",
            Self::CheckingBalance => "checking_balance",
            Self::BuildingTransaction => "building_transaction",
            Self::AwaitingSignature => "awaiting_signature",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Commitment level requested when confirming a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}
