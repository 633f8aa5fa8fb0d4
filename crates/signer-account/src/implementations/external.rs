//! Key backend that delegates to a wallet provider.
//!
//! The provider holds the key; this backend only forwards signing requests and
//! normalizes whatever recovery-id convention the provider uses.

use crate::{AccountError, KeyBackend};
use alloy_primitives::B256;
use async_trait::async_trait;
use signer_types::{
	normalize, Address, RecoverableSignature, SignedTransaction, UnsignedTransaction,
};
use std::sync::Arc;

/// A wallet that signs on request and never exposes its key.
#[async_trait]
pub trait WalletProvider: Send + Sync {
	async fn address(&self) -> Result<Address, AccountError>;

	/// Returns a 65-byte `r || s || v` signature over `message`.
	async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, AccountError>;

	/// Returns a 65-byte signature over `tx.signing_hash`.
	async fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<Vec<u8>, AccountError>;

	/// Whether `sign_message` accepts a bare 32-byte digest.
	fn signs_digests(&self) -> bool {
		true
	}
}

pub struct ExternalBackend {
	provider: Arc<dyn WalletProvider>,
	address: Address,
}

impl ExternalBackend {
	/// Queries the provider's address once, failing with
	/// [`AccountError::BackendUnavailable`] when it cannot answer.
	pub async fn new(provider: Arc<dyn WalletProvider>) -> Result<Self, AccountError> {
		let address = provider.address().await.map_err(|e| match e {
			AccountError::BackendUnavailable(msg) => AccountError::BackendUnavailable(msg),
			other => AccountError::BackendUnavailable(other.to_string()),
		})?;
		tracing::info!(address = %address, "Connected to wallet provider");
		Ok(Self { provider, address })
	}
}

#[async_trait]
impl KeyBackend for ExternalBackend {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.address)
	}

	async fn sign_raw_message(&self, message: &[u8]) -> Result<RecoverableSignature, AccountError> {
		let raw = self.provider.sign_message(message).await?;
		Ok(normalize(&raw)?)
	}

	async fn sign_hash(&self, hash: &B256) -> Result<RecoverableSignature, AccountError> {
		if !self.provider.signs_digests() {
			return Err(AccountError::UnsupportedOperation(
				"wallet provider cannot sign digests".into(),
			));
		}
		let raw = self.provider.sign_message(hash.as_slice()).await?;
		Ok(normalize(&raw)?)
	}

	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError> {
		let raw = self.provider.sign_transaction(tx).await?;
		Ok(SignedTransaction {
			unsigned: tx.clone(),
			signature: normalize(&raw)?,
		})
	}

	fn supports_hash_signing(&self) -> bool {
		self.provider.signs_digests()
	}
}
