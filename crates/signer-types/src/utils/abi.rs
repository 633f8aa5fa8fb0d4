//! Minimal ABI encoding for static contract-call arguments.
//!
//! Only the shapes needed for token reads and approvals are supported:
//! addresses and unsigned integers, each occupying one 32-byte word.

use crate::Address;
use alloy_primitives::{keccak256, B256, U256};
use serde::{Deserialize, Serialize};

/// `balanceOf(address)`
pub const BALANCE_OF: &str = "balanceOf(address)";
/// `allowance(address,address)`
pub const ALLOWANCE: &str = "allowance(address,address)";
/// `approve(address,uint256)`
pub const APPROVE: &str = "approve(address,uint256)";

/// A single static argument of a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArgument {
	Address(Address),
	Uint(U256),
}

/// Returns the 4-byte selector of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	let mut selector = [0u8; 4];
	selector.copy_from_slice(&hash[..4]);
	selector
}

/// ABI-encodes the arguments as consecutive 32-byte words.
pub fn encode_arguments(args: &[CallArgument]) -> Vec<u8> {
	let mut enc = AbiWordEncoder::new();
	for arg in args {
		match arg {
			CallArgument::Address(address) => enc.push_address(address),
			CallArgument::Uint(value) => enc.push_u256(*value),
		}
	}
	enc.finish()
}

/// Reads the first return word as a `uint256`. `None` if fewer than 32 bytes.
pub fn decode_uint256(data: &[u8]) -> Option<U256> {
	if data.len() < 32 {
		return None;
	}
	Some(U256::from_be_slice(&data[..32]))
}

/// Accumulates 32-byte ABI words.
#[derive(Debug, Default)]
pub struct AbiWordEncoder {
	buf: Vec<u8>,
}

impl AbiWordEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_word(&mut self, word: [u8; 32]) {
		self.buf.extend_from_slice(&word);
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	/// Left-pads the 20-byte payload, whichever encoding the address uses.
	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(&addr.payload());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_well_known_selectors() {
		assert_eq!(function_selector(BALANCE_OF), [0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(function_selector(ALLOWANCE), [0xdd, 0x62, 0xed, 0x3e]);
		assert_eq!(function_selector(APPROVE), [0x09, 0x5e, 0xa7, 0xb3]);
	}

	#[test]
	fn test_encode_arguments_pads_addresses() {
		let spender: Address = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".parse().unwrap();
		let encoded = encode_arguments(&[
			CallArgument::Address(spender),
			CallArgument::Uint(U256::from(100u64)),
		]);

		assert_eq!(encoded.len(), 64);
		assert_eq!(&encoded[..12], &[0u8; 12]);
		assert_eq!(&encoded[12..32], &spender.payload());
		assert_eq!(encoded[63], 100);
	}

	#[test]
	fn test_decode_uint256() {
		let mut word = [0u8; 32];
		word[31] = 42;
		assert_eq!(decode_uint256(&word), Some(U256::from(42u64)));
		assert_eq!(decode_uint256(&word[..31]), None);
		assert_eq!(decode_uint256(&[]), None);
	}
}
