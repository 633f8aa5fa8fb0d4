//! Client signer for agent payments.
//!
//! [`ClientSigner`] ties a signing identity to the chain RPC clients: it signs
//! messages and typed data, reads balances and allowances, and drives the
//! approve-broadcast-poll protocol in [`allowance`].

use alloy_primitives::U256;
use signer_account::AccountError;
use signer_delivery::DeliveryError;
use signer_types::{AddressError, NetworkError, SignatureError, TypedDataError};
use thiserror::Error;

pub mod allowance;
pub mod event_bus;
pub mod signer;

#[cfg(test)]
pub(crate) mod test_support;

pub use allowance::AllowancePolicy;
pub use event_bus::EventBus;
pub use signer::ClientSigner;

/// Errors surfaced by the client signer.
#[derive(Debug, Error)]
pub enum SignerError {
	#[error("Unsupported network: {0}")]
	UnsupportedNetwork(String),
	#[error(transparent)]
	InvalidAddress(#[from] AddressError),
	#[error(transparent)]
	MalformedSignature(#[from] SignatureError),
	#[error("Backend unavailable: {0}")]
	BackendUnavailable(String),
	#[error("Insufficient allowance: required {required}, current {current}")]
	InsufficientAllowance { required: U256, current: U256 },
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	#[error("RPC error: {0}")]
	Rpc(#[from] DeliveryError),
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Typed data error: {0}")]
	TypedData(TypedDataError),
}

impl From<NetworkError> for SignerError {
	fn from(err: NetworkError) -> Self {
		match err {
			NetworkError::UnsupportedNetwork(network) => SignerError::UnsupportedNetwork(network),
		}
	}
}

impl From<AccountError> for SignerError {
	fn from(err: AccountError) -> Self {
		match err {
			AccountError::BackendUnavailable(msg) => SignerError::BackendUnavailable(msg),
			AccountError::UnsupportedOperation(msg) => SignerError::UnsupportedOperation(msg),
			AccountError::MalformedSignature(e) => SignerError::MalformedSignature(e),
			other => SignerError::Signing(other.to_string()),
		}
	}
}

impl From<TypedDataError> for SignerError {
	fn from(err: TypedDataError) -> Self {
		match err {
			TypedDataError::InvalidAddress(e) => SignerError::InvalidAddress(e),
			other => SignerError::TypedData(other),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_account_errors_map_to_signer_taxonomy() {
		assert!(matches!(
			SignerError::from(AccountError::BackendUnavailable("down".into())),
			SignerError::BackendUnavailable(_)
		));
		assert!(matches!(
			SignerError::from(AccountError::UnsupportedOperation("digest".into())),
			SignerError::UnsupportedOperation(_)
		));
		assert!(matches!(
			SignerError::from(AccountError::MalformedSignature(
				SignatureError::MalformedSignature(64)
			)),
			SignerError::MalformedSignature(_)
		));
		assert!(matches!(
			SignerError::from(AccountError::SigningFailed("rejected".into())),
			SignerError::Signing(_)
		));
	}

	#[test]
	fn test_typed_data_address_errors_are_invalid_address() {
		assert!(matches!(
			SignerError::from(TypedDataError::InvalidAddress(AddressError::ChecksumMismatch)),
			SignerError::InvalidAddress(AddressError::ChecksumMismatch)
		));
		assert!(matches!(
			SignerError::from(TypedDataError::UnknownType("Foo".into())),
			SignerError::TypedData(_)
		));
	}
}
