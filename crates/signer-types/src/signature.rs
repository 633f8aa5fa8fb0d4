//! Recoverable secp256k1 signatures and recovery-id normalization.
//!
//! Signing backends disagree on the trailing recovery byte: some emit 0/1,
//! others the 27/28 form that `ecrecover` expects. Every signature that leaves
//! a backend goes through [`normalize`] so callers only see 27/28.

use crate::utils::formatting::without_0x_prefix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to raw 0/1 recovery ids.
pub const RECOVERY_ID_OFFSET: u8 = 27;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
	/// The signature is not exactly 65 bytes.
	#[error("Malformed signature: expected 65 bytes, got {0}")]
	MalformedSignature(usize),
	/// The signature text is not valid hex.
	#[error("Malformed signature: {0}")]
	InvalidHex(String),
}

/// A signature split into its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature {
	pub r: [u8; 32],
	pub s: [u8; 32],
	pub v: u8,
}

impl RecoverableSignature {
	/// Serializes back to `r || s || v`.
	pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
		let mut out = [0u8; SIGNATURE_LENGTH];
		out[..32].copy_from_slice(&self.r);
		out[32..64].copy_from_slice(&self.s);
		out[64] = self.v;
		out
	}

	/// Hex encoding without `0x`, as TRON nodes expect in `signature` arrays.
	pub fn to_unprefixed_hex(&self) -> String {
		hex::encode(self.to_bytes())
	}

	/// The 0/1 y-parity, if `v` is in a recognized form.
	pub fn y_parity(&self) -> Option<u8> {
		match self.v {
			0 | 1 => Some(self.v),
			27 | 28 => Some(self.v - RECOVERY_ID_OFFSET),
			_ => None,
		}
	}
}

/// Parses a 65-byte signature, lifting a 0/1 recovery id to 27/28.
///
/// Any other trailing byte passes through untouched.
pub fn normalize(raw: &[u8]) -> Result<RecoverableSignature, SignatureError> {
	if raw.len() != SIGNATURE_LENGTH {
		return Err(SignatureError::MalformedSignature(raw.len()));
	}

	let mut r = [0u8; 32];
	let mut s = [0u8; 32];
	r.copy_from_slice(&raw[..32]);
	s.copy_from_slice(&raw[32..64]);

	let v = match raw[64] {
		v @ (0 | 1) => v + RECOVERY_ID_OFFSET,
		v => v,
	};

	Ok(RecoverableSignature { r, s, v })
}

/// Same as [`normalize`] for hex input with or without `0x`.
pub fn normalize_hex(signature: &str) -> Result<RecoverableSignature, SignatureError> {
	let bytes = hex::decode(without_0x_prefix(signature.trim()))
		.map_err(|e| SignatureError::InvalidHex(e.to_string()))?;
	normalize(&bytes)
}

impl FromStr for RecoverableSignature {
	type Err = SignatureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		normalize_hex(s)
	}
}

impl fmt::Display for RecoverableSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", self.to_unprefixed_hex())
	}
}

impl Serialize for RecoverableSignature {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for RecoverableSignature {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		normalize_hex(&s).map_err(serde::de::Error::custom)
	}
}
