//! Wallet collaborator.
//!
//! A wallet owns the signing key. Checkout only ever asks it three things:
//! is it connected, what is its public key, and please sign and submit these
//! instructions.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer, read_keypair_file};
use solana_sdk::transaction::Transaction;
use thiserror::Error;

use super::{ChainRpc, RpcError};

/// Errors from the wallet collaborator.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("failed to load keypair from {path}: {message}")]
    Keypair { path: String, message: String },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Broadcasting the signed transaction failed. It may still land.
    #[error(transparent)]
    Submit(RpcError),
}

impl WalletError {
    /// Whether a signed transaction was handed to the network.
    #[must_use]
    pub const fn reached_network(&self) -> bool {
        matches!(self, Self::Submit(_))
    }
}

/// The wallet collaborator.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Public key of the wallet, or `None` while disconnected.
    fn public_key(&self) -> Option<Pubkey>;

    /// Connect and return the wallet's public key.
    ///
    /// # Errors
    ///
    /// Returns `WalletError` if the wallet cannot be connected.
    fn connect(&self) -> Result<Pubkey, WalletError>;

    fn disconnect(&self);

    /// Sign `instructions` as fee payer and submit them through `rpc`.
    async fn send_transaction(
        &self,
        instructions: &[Instruction],
        rpc: &dyn ChainRpc,
    ) -> Result<Signature, WalletError>;
}

/// A wallet holding a local keypair.
///
/// Built from a keypair file, or as a throwaway burner for devnet. Several
/// wallets may share one keypair while each tracks its own connection.
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    connected: AtomicBool,
}

impl KeypairWallet {
    /// Wrap an existing keypair. The wallet starts disconnected.
    #[must_use]
    pub fn new(keypair: Keypair) -> Self {
        Self::shared(Arc::new(keypair), false)
    }

    /// A wallet over a shared keypair, starting in the given connection state.
    #[must_use]
    pub const fn shared(keypair: Arc<Keypair>, connected: bool) -> Self {
        Self {
            keypair,
            connected: AtomicBool::new(connected),
        }
    }

    /// A freshly generated keypair. Only useful on devnet or testnet.
    #[must_use]
    pub fn burner() -> Self {
        Self::new(Keypair::new())
    }

    /// Load a keypair from a Solana CLI style JSON file.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Keypair` if the file is missing or malformed.
    pub fn from_file(path: &Path) -> Result<Self, WalletError> {
        load_keypair(path).map(Self::new)
    }

    /// Load from `path` when given, otherwise generate a burner.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Keypair` if a configured file cannot be read.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self, WalletError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let wallet = Self::burner();
                tracing::warn!(
                    pubkey = %wallet.keypair.pubkey(),
                    "No keypair configured, using a burner wallet"
                );
                Ok(wallet)
            }
        }
    }
}

/// Read a Solana CLI style JSON keypair file.
///
/// # Errors
///
/// Returns `WalletError::Keypair` if the file is missing or malformed.
pub fn load_keypair(path: &Path) -> Result<Keypair, WalletError> {
    read_keypair_file(path).map_err(|e| WalletError::Keypair {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Wallet for KeypairWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then(|| self.keypair.pubkey())
    }

    fn connect(&self) -> Result<Pubkey, WalletError> {
        self.connected.store(true, Ordering::Release);
        let pubkey = self.keypair.pubkey();
        tracing::info!(%pubkey, "Wallet connected");
        Ok(pubkey)
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            tracing::info!(pubkey = %self.keypair.pubkey(), "Wallet disconnected");
        }
    }

    async fn send_transaction(
        &self,
        instructions: &[Instruction],
        rpc: &dyn ChainRpc,
    ) -> Result<Signature, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::NotConnected);
        }

        let payer = self.keypair.pubkey();
        let blockhash = rpc.latest_blockhash().await?;

        let message = Message::new(instructions, Some(&payer));
        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        rpc.send_transaction(&transaction)
            .await
            .map_err(WalletError::Submit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use solana_sdk::hash::Hash;
    use solshop_core::{Commitment, Lamports};

    use super::*;
    use crate::solana::{SignatureStatus, payment_instructions};

    /// Records the last transaction it was asked to send.
    #[derive(Default)]
    struct RecordingRpc {
        sent: Mutex<Option<Transaction>>,
        fail_send: bool,
    }

    #[async_trait]
    impl ChainRpc for RecordingRpc {
        async fn get_balance(&self, _pubkey: &Pubkey) -> Result<Lamports, RpcError> {
            Ok(Lamports::ZERO)
        }

        async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
            Ok(Hash::new_unique())
        }

        async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
            if self.fail_send {
                return Err(RpcError::Unavailable("node is behind".to_string()));
            }
            *self.sent.lock().unwrap() = Some(tx.clone());
            Ok(tx.signatures.first().copied().unwrap_or_default())
        }

        async fn signature_status(
            &self,
            _signature: &Signature,
            _commitment: Commitment,
        ) -> Result<SignatureStatus, RpcError> {
            Ok(SignatureStatus::Confirmed)
        }
    }

    #[test]
    fn test_connect_and_disconnect() {
        let wallet = KeypairWallet::burner();
        assert!(!wallet.is_connected());
        assert!(wallet.public_key().is_none());

        let pubkey = wallet.connect().unwrap();
        assert!(wallet.is_connected());
        assert_eq!(wallet.public_key(), Some(pubkey));

        wallet.disconnect();
        assert!(!wallet.is_connected());
        assert!(wallet.public_key().is_none());
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let wallet = KeypairWallet::burner();
        let rpc = RecordingRpc::default();
        let err = wallet.send_transaction(&[], &rpc).await.unwrap_err();
        assert!(matches!(err, WalletError::NotConnected));
        assert!(rpc.sent.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_signs_as_fee_payer() {
        let wallet = KeypairWallet::burner();
        let payer = wallet.connect().unwrap();
        let receiver = Pubkey::new_unique();
        let rpc = RecordingRpc::default();

        let instructions = payment_instructions(&payer, &receiver, Lamports::new(42), None);
        let signature = wallet.send_transaction(&instructions, &rpc).await.unwrap();

        let sent = rpc.sent.lock().unwrap().clone().unwrap();
        assert_eq!(sent.message.account_keys.first(), Some(&payer));
        assert_eq!(sent.signatures.len(), 1);
        assert_eq!(sent.signatures.first(), Some(&signature));
        assert!(sent.verify().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_failure_reached_network() {
        let wallet = KeypairWallet::burner();
        let payer = wallet.connect().unwrap();
        let rpc = RecordingRpc {
            fail_send: true,
            ..RecordingRpc::default()
        };

        let instructions =
            payment_instructions(&payer, &Pubkey::new_unique(), Lamports::new(42), None);
        let err = wallet.send_transaction(&instructions, &rpc).await.unwrap_err();

        assert!(matches!(err, WalletError::Submit(_)));
        assert!(err.reached_network());
        assert!(!WalletError::Signing("rejected".to_string()).reached_network());
    }

    #[test]
    fn test_missing_keypair_file() {
        let err = KeypairWallet::from_file(Path::new("/nonexistent/id.json"))
            .err()
            .unwrap();
        assert!(matches!(err, WalletError::Keypair { .. }));
    }
}
