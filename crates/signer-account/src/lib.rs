//! Key backends for the agent signer.
//!
//! A key backend owns (or reaches) the key material of one signing identity.
//! Two kinds exist: in-process keys ([`implementations::local`]) and wallet
//! providers that sign on the caller's behalf ([`implementations::external`],
//! with [`implementations::remote`] as the HTTP-reachable provider). Every
//! signature a backend returns has already gone through
//! [`signer_types::normalize`].

use alloy_primitives::B256;
use async_trait::async_trait;
use signer_types::{
	Address, ImplementationRegistry, RecoverableSignature, SignatureError, SignedTransaction,
	UnsignedTransaction,
};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod external;
	pub mod local;
	pub mod remote;
}

/// Errors that can occur during key backend operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The backend refused or failed to sign.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Key material is missing or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The backend could not be reached or did not answer.
	#[error("Backend unavailable: {0}")]
	BackendUnavailable(String),
	/// The backend has no way to perform the requested operation.
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	/// The backend returned a signature that is not 65 bytes.
	#[error(transparent)]
	MalformedSignature(#[from] SignatureError),
	/// Configuration or wiring problem.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface every key backend implements.
#[async_trait]
pub trait KeyBackend: Send + Sync {
	/// Account address controlled by this backend.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs keccak256(`message`) with no message prefix.
	async fn sign_raw_message(&self, message: &[u8]) -> Result<RecoverableSignature, AccountError>;

	/// Signs a precomputed 32-byte digest, e.g. a typed-data hash.
	async fn sign_hash(&self, hash: &B256) -> Result<RecoverableSignature, AccountError>;

	/// Signs `tx.signing_hash` and attaches the signature.
	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError>;

	/// Whether [`KeyBackend::sign_hash`] is available.
	fn supports_hash_signing(&self) -> bool {
		true
	}
}

/// Type alias for key backend factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn KeyBackend>, AccountError>;

/// Registry trait for key backend implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered key backend implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::{local, remote};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(remote::Registry::NAME, remote::Registry::factory()),
	]
}

/// A key backend bound to the address it resolved at construction.
///
/// The address is queried exactly once; later calls to [`SigningIdentity::address`]
/// never touch the backend. The backend itself is fixed for the identity's lifetime.
#[derive(Clone)]
pub struct SigningIdentity {
	address: Address,
	backend: Arc<dyn KeyBackend>,
}

impl SigningIdentity {
	pub async fn new(backend: Box<dyn KeyBackend>) -> Result<Self, AccountError> {
		let backend: Arc<dyn KeyBackend> = Arc::from(backend);
		let address = backend.address().await?;
		tracing::debug!(address = %address, "Resolved signing identity");
		Ok(Self { address, backend })
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn supports_hash_signing(&self) -> bool {
		self.backend.supports_hash_signing()
	}

	pub async fn sign_raw_message(
		&self,
		message: &[u8],
	) -> Result<RecoverableSignature, AccountError> {
		self.backend.sign_raw_message(message).await
	}

	pub async fn sign_hash(&self, hash: &B256) -> Result<RecoverableSignature, AccountError> {
		if !self.backend.supports_hash_signing() {
			return Err(AccountError::UnsupportedOperation(
				"backend cannot sign precomputed digests".into(),
			));
		}
		self.backend.sign_hash(hash).await
	}

	pub async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError> {
		self.backend.sign_transaction(tx).await
	}
}

impl std::fmt::Debug for SigningIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SigningIdentity")
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}
