//! Shared types for the agent signer.
//!
//! Network identifiers, addresses, signatures, transactions and the
//! structured-data hashing every other crate builds on.

/// Account addresses and the base58check codec.
pub mod address;
/// Allowance modes, requests and approval attempts.
pub mod allowance;
/// Events published on the signer event bus.
pub mod events;
/// Network identifiers and per-network parameters.
pub mod networks;
/// Name-to-factory registration for pluggable implementations.
pub mod registry;
/// Zeroizing secret strings.
pub mod secret_string;
/// Recoverable signatures and recovery-id normalization.
pub mod signature;
/// Contract calls, transactions and broadcast results.
pub mod transaction;
pub mod utils;

pub use address::{Address, AddressError, TRON_ADDRESS_VERSION};
pub use allowance::{
	AllowanceMode, AllowanceRequest, ApprovalAttempt, ApprovalState, TimeoutPolicy, MAX_UINT160,
};
pub use events::{AllowanceEvent, SignerEvent, SigningEvent};
pub use networks::{
	authorization_address, chain_id, deserialize_networks, is_evm_network, is_tron_network,
	zero_address, ChainParameters, NetworkConfig, NetworkError, NetworkFamily, NetworkId,
	NetworksConfig,
};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use signature::{normalize, normalize_hex, RecoverableSignature, SignatureError};
pub use transaction::{
	BroadcastResult, ContractCall, EvmTransaction, FeeParams, ReadOnlyCallResult,
	SignedTransaction, TransactionId, TransactionPayload, TransactionStatus, TronTransaction,
	UnsignedTransaction, DEFAULT_FEE_LIMIT, DEFAULT_GAS_LIMIT,
};
pub use utils::{
	format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix, CallArgument,
	Eip712Domain, TypedData, TypedDataError,
};
