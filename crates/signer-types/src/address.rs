//! Account address types and the base58check <-> hex codec.
//!
//! TRON-style chains present a 20-byte account identifier as base58check text
//! (version byte `0x41`, payload, 4-byte double-SHA256 checksum), while EVM
//! chains use the raw 20 bytes as hex. [`Address`] carries either encoding and
//! converts between them without losing information.

use crate::utils::formatting::without_0x_prefix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version byte prepended to TRON account payloads before base58check encoding.
pub const TRON_ADDRESS_VERSION: u8 = 0x41;

/// Length of the account payload shared by both encodings.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced while parsing or converting addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
	/// The base58check checksum did not match the decoded payload.
	#[error("Invalid address: checksum mismatch")]
	ChecksumMismatch,
	/// The input is not valid base58.
	#[error("Invalid address: {0}")]
	InvalidBase58(String),
	/// The input is not valid hex.
	#[error("Invalid address: bad hex ({0})")]
	InvalidHex(String),
	/// The decoded payload has the wrong number of bytes.
	#[error("Invalid address: expected {expected} bytes, got {actual}")]
	InvalidLength { expected: usize, actual: usize },
}

/// An on-chain account identifier in one of the two supported encodings.
///
/// Both variants wrap the same 20-byte account payload. Equality is
/// structural, so a `Hex20` and a `Base58Check` holding the same payload are
/// not `==`; use [`Address::same_account`] to compare accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
	/// Raw 20-byte EVM-style address.
	Hex20([u8; ADDRESS_LENGTH]),
	/// Base58check address whose checksum was verified when it was decoded.
	Base58Check {
		version: u8,
		payload: [u8; ADDRESS_LENGTH],
	},
}

impl Address {
	/// Builds a TRON address (version `0x41`) for the given payload.
	pub fn tron(payload: [u8; ADDRESS_LENGTH]) -> Self {
		Address::Base58Check {
			version: TRON_ADDRESS_VERSION,
			payload,
		}
	}

	/// Returns the 20-byte account payload regardless of encoding.
	pub fn payload(&self) -> [u8; ADDRESS_LENGTH] {
		match self {
			Address::Hex20(bytes) => *bytes,
			Address::Base58Check { payload, .. } => *payload,
		}
	}

	/// Converts to the hex encoding by dropping the version byte.
	pub fn to_hex(&self) -> Address {
		Address::Hex20(self.payload())
	}

	/// Converts to base58check with the given version byte.
	pub fn to_base58check(&self, version: u8) -> Address {
		Address::Base58Check {
			version,
			payload: self.payload(),
		}
	}

	/// True when both addresses identify the same 20-byte account.
	pub fn same_account(&self, other: &Address) -> bool {
		self.payload() == other.payload()
	}

	/// True for the all-zero payload in either encoding.
	pub fn is_zero(&self) -> bool {
		self.payload() == [0u8; ADDRESS_LENGTH]
	}

	/// Returns the payload as an alloy address.
	pub fn to_alloy(&self) -> alloy_primitives::Address {
		alloy_primitives::Address::from(self.payload())
	}
}

impl From<alloy_primitives::Address> for Address {
	fn from(address: alloy_primitives::Address) -> Self {
		Address::Hex20(address.into_array())
	}
}

/// Decodes a base58check string into its version byte and 20-byte payload.
///
/// Fails with [`AddressError::ChecksumMismatch`] when the trailing four bytes
/// are not the double-SHA256 checksum of the rest.
pub fn decode_base58check(encoded: &str) -> Result<(u8, [u8; ADDRESS_LENGTH]), AddressError> {
	let decoded = bs58::decode(encoded)
		.with_check(None)
		.into_vec()
		.map_err(|e| match e {
			bs58::decode::Error::InvalidChecksum { .. } => AddressError::ChecksumMismatch,
			other => AddressError::InvalidBase58(other.to_string()),
		})?;

	if decoded.len() != ADDRESS_LENGTH + 1 {
		return Err(AddressError::InvalidLength {
			expected: ADDRESS_LENGTH + 1,
			actual: decoded.len(),
		});
	}

	let mut payload = [0u8; ADDRESS_LENGTH];
	payload.copy_from_slice(&decoded[1..]);
	Ok((decoded[0], payload))
}

/// Encodes `version || payload || checksum` as base58.
pub fn encode_base58check(version: u8, payload: &[u8; ADDRESS_LENGTH]) -> String {
	let mut bytes = Vec::with_capacity(ADDRESS_LENGTH + 1);
	bytes.push(version);
	bytes.extend_from_slice(payload);
	bs58::encode(bytes).with_check().into_string()
}

fn decode_hex_payload(hex_str: &str) -> Result<[u8; ADDRESS_LENGTH], AddressError> {
	let bytes = hex::decode(hex_str).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
	if bytes.len() != ADDRESS_LENGTH {
		return Err(AddressError::InvalidLength {
			expected: ADDRESS_LENGTH,
			actual: bytes.len(),
		});
	}
	let mut payload = [0u8; ADDRESS_LENGTH];
	payload.copy_from_slice(&bytes);
	Ok(payload)
}

impl FromStr for Address {
	type Err = AddressError;

	/// Accepts `0x`-prefixed hex, TRON hex (`41` + 40 hex chars) and base58check.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();

		if s.starts_with("0x") || s.starts_with("0X") {
			return decode_hex_payload(without_0x_prefix(s)).map(Address::Hex20);
		}

		// TRON nodes also report addresses as 21-byte hex with the version byte.
		if s.len() == 2 * (ADDRESS_LENGTH + 1)
			&& s.starts_with("41")
			&& s.chars().all(|c| c.is_ascii_hexdigit())
		{
			return decode_hex_payload(&s[2..]).map(Address::tron);
		}

		let (version, payload) = decode_base58check(s)?;
		Ok(Address::Base58Check { version, payload })
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Address::Hex20(bytes) => write!(f, "0x{}", hex::encode(bytes)),
			Address::Base58Check { version, payload } => {
				write!(f, "{}", encode_base58check(*version, payload))
			}
		}
	}
}

impl Serialize for Address {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TRON_ZERO: &str = "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb";
	const USDT_TRC20: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
	const USDT_TRC20_HEX: &str = "a614f803b6fd780986a42c78ec9c7f77e6ded13c";

	#[test]
	fn test_tron_zero_address_decodes_to_zero_payload() {
		let address: Address = TRON_ZERO.parse().unwrap();
		assert_eq!(address, Address::tron([0u8; 20]));
		assert!(address.is_zero());
		assert_eq!(address.to_string(), TRON_ZERO);
	}

	#[test]
	fn test_known_base58_hex_pair() {
		let address: Address = USDT_TRC20.parse().unwrap();
		assert_eq!(
			address.to_hex().to_string(),
			format!("0x{}", USDT_TRC20_HEX)
		);

		let hex_address: Address = format!("0x{}", USDT_TRC20_HEX).parse().unwrap();
		assert_eq!(
			hex_address.to_base58check(TRON_ADDRESS_VERSION).to_string(),
			USDT_TRC20
		);
		assert!(address.same_account(&hex_address));
		assert_ne!(address, hex_address);
	}

	#[test]
	fn test_tron_hex_form_with_version_byte() {
		let address: Address = format!("41{}", USDT_TRC20_HEX).parse().unwrap();
		assert_eq!(address.to_string(), USDT_TRC20);
	}

	#[test]
	fn test_checksum_mismatch_is_rejected() {
		// Last character altered; payload length is unchanged.
		let tampered = "TT8rEWbCoNX7vpEUauxb7rWJsTgs8vDLAm";
		assert_eq!(
			tampered.parse::<Address>(),
			Err(AddressError::ChecksumMismatch)
		);
	}

	#[test]
	fn test_round_trip_for_arbitrary_payloads() {
		let payloads = [
			[0u8; 20],
			[0xffu8; 20],
			[
				0x5F, 0xbD, 0xB2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3F,
				0x64, 0x2f, 0x64, 0x18, 0x0a, 0xa3,
			],
		];

		for payload in payloads {
			let encoded = encode_base58check(TRON_ADDRESS_VERSION, &payload);
			let (version, decoded) = decode_base58check(&encoded).unwrap();
			assert_eq!(version, TRON_ADDRESS_VERSION);
			assert_eq!(decoded, payload);

			let base58 = Address::Hex20(payload).to_base58check(TRON_ADDRESS_VERSION);
			assert_eq!(base58.to_hex(), Address::Hex20(payload));
			assert_eq!(base58.to_hex().to_base58check(TRON_ADDRESS_VERSION), base58);
		}
	}

	#[test]
	fn test_invalid_inputs() {
		assert!(matches!(
			"0x1234".parse::<Address>(),
			Err(AddressError::InvalidLength { .. })
		));
		assert!(matches!(
			"0xzz00000000000000000000000000000000000000".parse::<Address>(),
			Err(AddressError::InvalidHex(_))
		));
		assert!(matches!(
			"not-base58-0OIl".parse::<Address>(),
			Err(AddressError::InvalidBase58(_))
		));
	}

	#[test]
	fn test_serde_uses_display_form() {
		let address: Address = USDT_TRC20.parse().unwrap();
		let json = serde_json::to_string(&address).unwrap();
		assert_eq!(json, format!("\"{}\"", USDT_TRC20));
		let back: Address = serde_json::from_str(&json).unwrap();
		assert_eq!(back, address);
	}
}
