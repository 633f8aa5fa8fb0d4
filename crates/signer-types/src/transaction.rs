//! Contract calls and the transaction lifecycle shared by all chain families.
//!
//! An [`UnsignedTransaction`] always carries the 32-byte hash a key backend
//! signs, so backends never need to understand chain-specific encodings.

use crate::utils::abi::{encode_arguments, function_selector, CallArgument};
use crate::{Address, NetworkId, RecoverableSignature};
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default TRON fee limit in sun (1000 TRX).
pub const DEFAULT_FEE_LIMIT: u64 = 1_000_000_000;
/// Default EVM gas limit for token approvals.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;

/// A call against a contract function with static arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
	pub network: NetworkId,
	pub contract: Address,
	/// Canonical signature, e.g. `approve(address,uint256)`.
	pub function: String,
	pub args: Vec<CallArgument>,
	/// Account the call is made from.
	pub caller: Address,
}

impl ContractCall {
	pub fn new(
		network: NetworkId,
		contract: Address,
		function: impl Into<String>,
		args: Vec<CallArgument>,
		caller: Address,
	) -> Self {
		Self {
			network,
			contract,
			function: function.into(),
			args,
			caller,
		}
	}

	pub fn selector(&self) -> [u8; 4] {
		function_selector(&self.function)
	}

	/// Encoded arguments without the selector.
	pub fn parameter(&self) -> Vec<u8> {
		encode_arguments(&self.args)
	}

	/// Selector followed by the encoded arguments.
	pub fn calldata(&self) -> Vec<u8> {
		let mut data = self.selector().to_vec();
		data.extend_from_slice(&self.parameter());
		data
	}
}

/// Fee parameters applied when building a state-changing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
	/// TRON energy fee ceiling, in sun.
	pub fee_limit: u64,
	/// EVM gas limit.
	pub gas_limit: u64,
}

impl Default for FeeParams {
	fn default() -> Self {
		Self {
			fee_limit: DEFAULT_FEE_LIMIT,
			gas_limit: DEFAULT_GAS_LIMIT,
		}
	}
}

/// Outcome of a call that does not change state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadOnlyCallResult {
	pub success: bool,
	pub return_data: Vec<u8>,
}

/// Chain-assigned transaction identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Vec<u8>);

impl TransactionId {
	/// Hex without `0x`, the form TRON nodes use.
	pub fn to_unprefixed_hex(&self) -> String {
		hex::encode(&self.0)
	}
}

impl From<B256> for TransactionId {
	fn from(hash: B256) -> Self {
		TransactionId(hash.to_vec())
	}
}

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl fmt::Debug for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TransactionId({})", self)
	}
}

/// Legacy EVM transaction fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
	pub nonce: u64,
	pub gas_price: u128,
	pub gas_limit: u64,
	pub to: Address,
	pub value: U256,
	pub data: Vec<u8>,
	pub chain_id: u64,
}

/// A transaction object as returned by a TRON node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TronTransaction {
	pub tx_id: TransactionId,
	/// The node's JSON transaction, forwarded unchanged on broadcast.
	pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionPayload {
	Evm(EvmTransaction),
	Tron(TronTransaction),
}

/// A built transaction waiting for a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub network: NetworkId,
	/// The digest a key backend signs.
	pub signing_hash: B256,
	pub payload: TransactionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
	pub unsigned: UnsignedTransaction,
	pub signature: RecoverableSignature,
}

/// Node response to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
	pub accepted: bool,
	pub tx_id: Option<TransactionId>,
	pub message: Option<String>,
}

impl BroadcastResult {
	pub fn accepted(tx_id: TransactionId) -> Self {
		Self {
			accepted: true,
			tx_id: Some(tx_id),
			message: None,
		}
	}

	pub fn rejected(message: impl Into<String>) -> Self {
		Self {
			accepted: false,
			tx_id: None,
			message: Some(message.into()),
		}
	}
}

/// Inclusion status of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
	pub included: bool,
	/// Execution result; meaningful only when `included`.
	pub success: bool,
	pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_approve_calldata_layout() {
		let network = NetworkId::parse("tron:nile").unwrap();
		let token: Address = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".parse().unwrap();
		let spender = network.authorization_address();
		let call = ContractCall::new(
			network,
			token,
			crate::utils::abi::APPROVE,
			vec![
				CallArgument::Address(spender),
				CallArgument::Uint(U256::from(7u64)),
			],
			Address::tron([1u8; 20]),
		);

		let data = call.calldata();
		assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(data.len(), 4 + 64);
		assert_eq!(&data[16..36], &spender.payload());
		assert_eq!(data[67], 7);
		assert_eq!(call.parameter(), data[4..].to_vec());
	}

	#[test]
	fn test_fee_defaults() {
		let fee = FeeParams::default();
		assert_eq!(fee.fee_limit, 1_000_000_000);
		assert_eq!(fee.gas_limit, 100_000);
	}

	#[test]
	fn test_transaction_id_formats() {
		let id = TransactionId(vec![0xab, 0xcd]);
		assert_eq!(id.to_string(), "0xabcd");
		assert_eq!(id.to_unprefixed_hex(), "abcd");
	}

	#[test]
	fn test_broadcast_constructors() {
		let ok = BroadcastResult::accepted(TransactionId(vec![1]));
		assert!(ok.accepted);
		assert!(ok.message.is_none());

		let rejected = BroadcastResult::rejected("SIGERROR");
		assert!(!rejected.accepted);
		assert!(rejected.tx_id.is_none());
		assert_eq!(rejected.message.as_deref(), Some("SIGERROR"));
	}
}
