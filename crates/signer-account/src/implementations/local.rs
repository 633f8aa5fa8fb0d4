//! In-process key backend.
//!
//! Holds a secp256k1 private key and signs without any I/O.

use crate::{AccountError, KeyBackend};
use alloy_primitives::{keccak256, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use signer_types::{
	normalize, Address, RecoverableSignature, SecretString, SignedTransaction, UnsignedTransaction,
};

pub struct LocalBackend {
	signer: PrivateKeySigner,
}

impl LocalBackend {
	/// Parses a hex private key, with or without `0x`.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(|key| key.trim().parse::<PrivateKeySigner>())
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self { signer })
	}

	fn sign_digest(&self, hash: &B256) -> Result<RecoverableSignature, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(hash)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(normalize(&signature.as_bytes())?)
	}
}

#[async_trait]
impl KeyBackend for LocalBackend {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(Address::from(self.signer.address()))
	}

	async fn sign_raw_message(&self, message: &[u8]) -> Result<RecoverableSignature, AccountError> {
		self.sign_digest(&keccak256(message))
	}

	async fn sign_hash(&self, hash: &B256) -> Result<RecoverableSignature, AccountError> {
		self.sign_digest(hash)
	}

	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError> {
		let signature = self.sign_digest(&tx.signing_hash)?;
		Ok(SignedTransaction {
			unsigned: tx.clone(),
			signature,
		})
	}
}

/// Factory function to create a local backend from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key (required)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn KeyBackend>, AccountError> {
	let key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	Ok(Box::new(LocalBackend::new(&SecretString::from(key))?))
}

/// Registry for the local key backend.
pub struct Registry;

impl signer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}
