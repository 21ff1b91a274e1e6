//! JSON-RPC implementation of [`ChainRpc`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solshop_core::{Commitment, Lamports};

use super::{ChainRpc, RpcError, SignatureStatus, commitment_config};

/// [`ChainRpc`] backed by the Solana nonblocking RPC client.
pub struct SolanaRpc {
    client: RpcClient,
}

impl SolanaRpc {
    /// Connect to `rpc_url` with `commitment` as the default for reads.
    #[must_use]
    pub fn new(rpc_url: &SecretString, commitment: Commitment) -> Self {
        let client = RpcClient::new_with_commitment(
            rpc_url.expose_secret().to_string(),
            commitment_config(commitment),
        );
        Self { client }
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<Lamports, RpcError> {
        let lamports = self.client.get_balance(pubkey).await?;
        Ok(Lamports::new(lamports))
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        Ok(self.client.send_transaction(transaction).await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<SignatureStatus, RpcError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment_config(commitment))
            .await?;

        Ok(match status {
            None => SignatureStatus::Pending,
            Some(Ok(())) => SignatureStatus::Confirmed,
            Some(Err(err)) => SignatureStatus::Failed(err.to_string()),
        })
    }
}
