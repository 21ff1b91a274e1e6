//! Per-session wallets.
//!
//! Every shopper gets their own wallet. With `SOLSHOP_KEYPAIR_PATH` set all
//! sessions sign with that keypair; otherwise each session is given its own
//! burner on first use. Connection state always belongs to the session.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

use crate::config::SolanaConfig;
use crate::models::WalletSession;
use crate::solana::{KeypairWallet, WalletError, load_keypair};

/// Hands out the wallet a session's [`WalletSession`] record describes.
pub struct WalletProvider {
    shared: Option<Arc<Keypair>>,
    auto_connect: bool,
}

impl WalletProvider {
    /// Load the configured keypair, or fall back to per-session burners.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Keypair` if a configured file cannot be read.
    pub fn from_config(config: &SolanaConfig) -> Result<Self, WalletError> {
        match config.keypair_path.as_deref() {
            Some(path) => Ok(Self::shared(load_keypair(path)?, config.auto_connect)),
            None => {
                tracing::warn!("No keypair configured, each session gets a burner wallet");
                Ok(Self::burners(config.auto_connect))
            }
        }
    }

    /// Every session signs with `keypair`.
    #[must_use]
    pub fn shared(keypair: Keypair, auto_connect: bool) -> Self {
        Self {
            shared: Some(Arc::new(keypair)),
            auto_connect,
        }
    }

    /// Every session gets its own freshly generated keypair.
    #[must_use]
    pub const fn burners(auto_connect: bool) -> Self {
        Self {
            shared: None,
            auto_connect,
        }
    }

    /// Public key of the configured keypair, if there is one.
    #[must_use]
    pub fn shared_pubkey(&self) -> Option<Pubkey> {
        self.shared.as_ref().map(|keypair| keypair.pubkey())
    }

    /// The wallet record for a shopper seen for the first time.
    #[must_use]
    pub fn new_session(&self) -> WalletSession {
        WalletSession {
            connected: self.auto_connect,
            burner: self
                .shared
                .is_none()
                .then(|| Keypair::new().to_bytes().to_vec()),
        }
    }

    /// Open the wallet `record` describes.
    ///
    /// A burner record without a usable key is given a new one, so callers
    /// must store `record` again when it changed.
    pub fn open(&self, record: &mut WalletSession) -> KeypairWallet {
        let keypair = match &self.shared {
            Some(shared) => Arc::clone(shared),
            None => {
                let restored = record
                    .burner
                    .as_deref()
                    .and_then(|bytes| Keypair::try_from(bytes).ok());
                let keypair = restored.unwrap_or_else(|| {
                    let keypair = Keypair::new();
                    record.burner = Some(keypair.to_bytes().to_vec());
                    keypair
                });
                Arc::new(keypair)
            }
        };
        KeypairWallet::shared(keypair, record.connected)
    }
}
