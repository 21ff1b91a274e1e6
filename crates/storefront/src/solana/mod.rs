//! Solana collaborators.
//!
//! Checkout never talks to the network directly. It goes through two seams:
//!
//! - [`ChainRpc`] - balance lookup, blockhash, broadcast and signature status
//! - [`Wallet`] - key custody; signs and submits a transaction for the shopper
//!
//! [`SolanaRpc`] and [`KeypairWallet`] are the production implementations.

pub mod rpc;
pub mod transfer;
pub mod wallet;

use std::time::Duration;

use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solshop_core::{Commitment, Lamports};
use thiserror::Error;
use tokio::time::Instant;

pub use rpc::SolanaRpc;
pub use transfer::{MEMO_PROGRAM_ID, payment_instructions};
pub use wallet::{KeypairWallet, Wallet, WalletError, load_keypair};

/// Errors from the RPC collaborator.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport or JSON-RPC failure reported by the client.
    #[error("{0}")]
    Client(Box<ClientError>),

    /// The transaction landed but failed on-chain.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The signature did not reach the requested commitment in time.
    #[error("transaction {signature} was not confirmed within {waited_secs}s")]
    ConfirmationTimeout {
        signature: Signature,
        waited_secs: u64,
    },

    /// The endpoint could not serve the request.
    #[error("RPC unavailable: {0}")]
    Unavailable(String),
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        Self::Client(Box::new(err))
    }
}

/// Status of a submitted signature at a given commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Not yet seen at the requested commitment.
    Pending,
    /// Reached the requested commitment and succeeded.
    Confirmed,
    /// Reached the requested commitment with an error.
    Failed(String),
}

/// The blockchain RPC collaborator.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Balance of `pubkey` in lamports.
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<Lamports, RpcError>;

    /// Most recent blockhash, used to stamp a transaction before signing.
    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Broadcast a signed transaction.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError>;

    /// Look up a signature at `commitment`.
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<SignatureStatus, RpcError>;
}

/// Map a commitment level onto the client's config type.
#[must_use]
pub fn commitment_config(commitment: Commitment) -> CommitmentConfig {
    match commitment {
        Commitment::Processed => CommitmentConfig::processed(),
        Commitment::Confirmed => CommitmentConfig::confirmed(),
        Commitment::Finalized => CommitmentConfig::finalized(),
    }
}

/// Poll until `signature` reaches `commitment`, fails, or `timeout` elapses.
///
/// # Errors
///
/// Returns `RpcError::TransactionFailed` if the transaction errored on-chain,
/// `RpcError::ConfirmationTimeout` if it was still pending at the deadline,
/// or any error from the status lookup itself.
pub async fn await_confirmation(
    rpc: &dyn ChainRpc,
    signature: &Signature,
    commitment: Commitment,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), RpcError> {
    let deadline = Instant::now() + timeout;

    loop {
        match rpc.signature_status(signature, commitment).await? {
            SignatureStatus::Confirmed => return Ok(()),
            SignatureStatus::Failed(reason) => return Err(RpcError::TransactionFailed(reason)),
            SignatureStatus::Pending => {}
        }

        if Instant::now() >= deadline {
            return Err(RpcError::ConfirmationTimeout {
                signature: *signature,
                waited_secs: timeout.as_secs(),
            });
        }

        tracing::debug!(%signature, "Signature pending, polling again");
        tokio::time::sleep(poll_interval).await;
    }
}
