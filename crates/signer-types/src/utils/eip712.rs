//! EIP-712 (and TIP-712) structured-data hashing.
//!
//! These helpers provide:
//! - Domain separator computation over `{name, [version], chainId, verifyingContract}`
//! - Type encoding with alphabetically sorted dependencies
//! - Struct hashing for atomic, dynamic, array and nested struct fields
//! - Final digest computation (0x1901 || domainHash || structHash)
//!
//! TIP-712 is EIP-712 with TRON addresses, so `address` fields accept either
//! base58check or hex text and hash the 20-byte payload.

use super::abi::AbiWordEncoder;
use crate::{Address, AddressError};
use alloy_primitives::{keccak256, B256, I256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Domain type string for the three-field domain.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,uint256 chainId,address verifyingContract)";
/// Name of the domain type, ignored when it appears in a caller's type schema.
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypedDataError {
	#[error("Unknown type: {0}")]
	UnknownType(String),
	#[error("Missing field '{field}' in {type_name}")]
	MissingField { type_name: String, field: String },
	#[error("Invalid value for {field_type}: {message}")]
	InvalidValue { field_type: String, message: String },
	#[error("Cannot determine primary type: {0}")]
	PrimaryType(String),
	#[error(transparent)]
	InvalidAddress(#[from] AddressError),
}

fn invalid(field_type: &str, message: impl Into<String>) -> TypedDataError {
	TypedDataError::InvalidValue {
		field_type: field_type.to_string(),
		message: message.into(),
	}
}

/// Signing domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl Eip712Domain {
	pub fn new(name: impl Into<String>, chain_id: u64, verifying_contract: Address) -> Self {
		Self {
			name: name.into(),
			version: None,
			chain_id,
			verifying_contract,
		}
	}

	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}

	/// The `EIP712Domain(...)` type string for the fields present.
	pub fn encode_type(&self) -> String {
		match self.version {
			Some(_) => "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)"
				.to_string(),
			None => DOMAIN_TYPE.to_string(),
		}
	}

	pub fn separator(&self) -> B256 {
		let mut enc = AbiWordEncoder::new();
		enc.push_b256(&keccak256(self.encode_type().as_bytes()));
		enc.push_b256(&keccak256(self.name.as_bytes()));
		if let Some(version) = &self.version {
			enc.push_b256(&keccak256(version.as_bytes()));
		}
		enc.push_u256(U256::from(self.chain_id));
		enc.push_address(&self.verifying_contract);
		keccak256(enc.finish())
	}
}

/// One `{name, type}` entry of a struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
}

impl TypedField {
	pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: kind.into(),
		}
	}
}

/// Struct definitions keyed by type name; field order is significant.
pub type TypeSchema = BTreeMap<String, Vec<TypedField>>;

/// A complete structured-data signing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
	pub domain: Eip712Domain,
	pub types: TypeSchema,
	/// Inferred from `types` when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub primary_type: Option<String>,
	pub message: Map<String, Value>,
}

impl TypedData {
	pub fn new(domain: Eip712Domain, types: TypeSchema, message: Map<String, Value>) -> Self {
		Self {
			domain,
			types,
			primary_type: None,
			message,
		}
	}

	/// Returns the explicit primary type, or the single struct type that no
	/// other struct references.
	pub fn primary_type(&self) -> Result<String, TypedDataError> {
		if let Some(primary) = &self.primary_type {
			if !self.types.contains_key(primary) {
				return Err(TypedDataError::UnknownType(primary.clone()));
			}
			return Ok(primary.clone());
		}

		let referenced: BTreeSet<&str> = struct_types(&self.types)
			.flat_map(|(_, fields)| fields.iter().map(|f| base_type(&f.kind)))
			.collect();

		let roots: Vec<&str> = struct_types(&self.types)
			.map(|(name, _)| name.as_str())
			.filter(|name| !referenced.contains(name))
			.collect();

		match roots.as_slice() {
			[root] => Ok(root.to_string()),
			[] => Err(TypedDataError::PrimaryType("no root struct type".into())),
			many => Err(TypedDataError::PrimaryType(format!(
				"ambiguous roots: {}",
				many.join(", ")
			))),
		}
	}

	pub fn struct_hash(&self) -> Result<B256, TypedDataError> {
		let primary = self.primary_type()?;
		hash_struct(&primary, &self.message, &self.types)
	}

	/// The digest a backend signs.
	pub fn signing_hash(&self) -> Result<B256, TypedDataError> {
		let struct_hash = self.struct_hash()?;
		Ok(compute_final_digest(&self.domain.separator(), &struct_hash))
	}
}

/// Compute EIP-712 domain hash for the three-field domain.
pub fn compute_domain_hash(name: &str, chain_id: u64, verifying_contract: &Address) -> B256 {
	Eip712Domain::new(name, chain_id, *verifying_contract).separator()
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

fn struct_types(types: &TypeSchema) -> impl Iterator<Item = (&String, &Vec<TypedField>)> {
	types.iter().filter(|(name, _)| name.as_str() != DOMAIN_TYPE_NAME)
}

/// Strips any array suffixes: `Person[][2]` -> `Person`.
fn base_type(kind: &str) -> &str {
	kind.split('[').next().unwrap_or(kind)
}

/// For `T[]` or `T[n]`, returns `T` and the fixed length if any.
fn array_element(kind: &str) -> Option<(&str, Option<usize>)> {
	if !kind.ends_with(']') {
		return None;
	}
	let open = kind.rfind('[')?;
	let length = kind[open + 1..kind.len() - 1].parse::<usize>().ok();
	Some((&kind[..open], length))
}

/// Encodes `Primary(fields)Dep1(fields)Dep2(fields)` with dependencies sorted.
pub fn encode_type(primary: &str, types: &TypeSchema) -> Result<String, TypedDataError> {
	let mut deps = BTreeSet::new();
	collect_dependencies(primary, types, &mut deps)?;
	deps.remove(primary);

	let mut out = format_type(primary, types)?;
	for dep in &deps {
		out.push_str(&format_type(dep, types)?);
	}
	Ok(out)
}

fn collect_dependencies(
	name: &str,
	types: &TypeSchema,
	found: &mut BTreeSet<String>,
) -> Result<(), TypedDataError> {
	if found.contains(name) {
		return Ok(());
	}
	let fields = types
		.get(name)
		.ok_or_else(|| TypedDataError::UnknownType(name.to_string()))?;
	found.insert(name.to_string());

	for field in fields {
		let base = base_type(&field.kind);
		if base != DOMAIN_TYPE_NAME && types.contains_key(base) {
			collect_dependencies(base, types, found)?;
		}
	}
	Ok(())
}

fn format_type(name: &str, types: &TypeSchema) -> Result<String, TypedDataError> {
	let fields = types
		.get(name)
		.ok_or_else(|| TypedDataError::UnknownType(name.to_string()))?;
	let members: Vec<String> = fields
		.iter()
		.map(|f| format!("{} {}", f.kind, f.name))
		.collect();
	Ok(format!("{}({})", name, members.join(",")))
}

/// keccak256(typeHash || encodeData(fields)).
pub fn hash_struct(
	name: &str,
	data: &Map<String, Value>,
	types: &TypeSchema,
) -> Result<B256, TypedDataError> {
	let fields = types
		.get(name)
		.ok_or_else(|| TypedDataError::UnknownType(name.to_string()))?;

	let mut enc = AbiWordEncoder::new();
	enc.push_b256(&keccak256(encode_type(name, types)?.as_bytes()));

	for field in fields {
		let value = data.get(&field.name).ok_or_else(|| TypedDataError::MissingField {
			type_name: name.to_string(),
			field: field.name.clone(),
		})?;
		enc.push_word(encode_field(&field.kind, value, types)?);
	}

	Ok(keccak256(enc.finish()))
}

fn encode_field(kind: &str, value: &Value, types: &TypeSchema) -> Result<[u8; 32], TypedDataError> {
	if let Some((element, length)) = array_element(kind) {
		let items = value
			.as_array()
			.ok_or_else(|| invalid(kind, "expected an array"))?;
		if let Some(expected) = length {
			if items.len() != expected {
				return Err(invalid(
					kind,
					format!("expected {} elements, got {}", expected, items.len()),
				));
			}
		}
		let mut buf = Vec::with_capacity(items.len() * 32);
		for item in items {
			buf.extend_from_slice(&encode_field(element, item, types)?);
		}
		return Ok(keccak256(buf).0);
	}

	if types.contains_key(kind) {
		let object = value
			.as_object()
			.ok_or_else(|| invalid(kind, "expected an object"))?;
		return Ok(hash_struct(kind, object, types)?.0);
	}

	match kind {
		"string" => {
			let s = value.as_str().ok_or_else(|| invalid(kind, "expected a string"))?;
			Ok(keccak256(s.as_bytes()).0)
		}
		"bytes" => Ok(keccak256(parse_hex_bytes(kind, value)?).0),
		"bool" => {
			let flag = match value {
				Value::Bool(b) => *b,
				Value::String(s) if s == "true" => true,
				Value::String(s) if s == "false" => false,
				_ => return Err(invalid(kind, "expected a boolean")),
			};
			Ok(U256::from(flag as u8).to_be_bytes::<32>())
		}
		"address" => {
			let text = value.as_str().ok_or_else(|| invalid(kind, "expected a string"))?;
			let address: Address = text.parse()?;
			let mut word = [0u8; 32];
			word[12..].copy_from_slice(&address.payload());
			Ok(word)
		}
		_ if kind.starts_with("uint") => {
			let bits = integer_bits(kind, "uint")?;
			let number = parse_u256(kind, value)?;
			if number.bit_len() > bits {
				return Err(invalid(kind, "value out of range"));
			}
			Ok(number.to_be_bytes::<32>())
		}
		_ if kind.starts_with("int") => {
			let bits = integer_bits(kind, "int")?;
			let number = parse_i256(kind, value)?;
			if bits < 256 {
				// Valid range is [-2^(bits-1), 2^(bits-1) - 1].
				let bound = I256::from_raw(U256::from(1u8) << (bits - 1));
				if number >= bound || number < -bound {
					return Err(invalid(kind, "value out of range"));
				}
			}
			Ok(number.into_raw().to_be_bytes::<32>())
		}
		_ if kind.starts_with("bytes") => {
			let size = kind["bytes".len()..]
				.parse::<usize>()
				.ok()
				.filter(|n| (1..=32).contains(n))
				.ok_or_else(|| TypedDataError::UnknownType(kind.to_string()))?;
			let bytes = parse_hex_bytes(kind, value)?;
			if bytes.len() > size {
				return Err(invalid(kind, format!("expected at most {} bytes", size)));
			}
			let mut word = [0u8; 32];
			word[..bytes.len()].copy_from_slice(&bytes);
			Ok(word)
		}
		_ => Err(TypedDataError::UnknownType(kind.to_string())),
	}
}

fn integer_bits(kind: &str, prefix: &str) -> Result<usize, TypedDataError> {
	let suffix = &kind[prefix.len()..];
	if suffix.is_empty() {
		return Ok(256);
	}
	suffix
		.parse::<usize>()
		.ok()
		.filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
		.ok_or_else(|| TypedDataError::UnknownType(kind.to_string()))
}

fn parse_u256(kind: &str, value: &Value) -> Result<U256, TypedDataError> {
	match value {
		Value::Number(n) => n
			.as_u64()
			.map(U256::from)
			.ok_or_else(|| invalid(kind, format!("{} is not an unsigned integer", n))),
		Value::String(s) => {
			let s = s.trim();
			let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
				Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
				None => U256::from_str_radix(s, 10),
			};
			parsed.map_err(|e| invalid(kind, e.to_string()))
		}
		_ => Err(invalid(kind, "expected a number or numeric string")),
	}
}

fn parse_i256(kind: &str, value: &Value) -> Result<I256, TypedDataError> {
	match value {
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				I256::try_from(i).map_err(|e| invalid(kind, e.to_string()))
			} else if let Some(u) = n.as_u64() {
				I256::try_from(u).map_err(|e| invalid(kind, e.to_string()))
			} else {
				Err(invalid(kind, format!("{} is not an integer", n)))
			}
		}
		Value::String(s) => {
			let s = s.trim();
			let is_hex = s.trim_start_matches('-').starts_with("0x");
			let parsed = if is_hex {
				I256::from_hex_str(s)
			} else {
				I256::from_dec_str(s)
			};
			parsed.map_err(|e| invalid(kind, e.to_string()))
		}
		_ => Err(invalid(kind, "expected a number or numeric string")),
	}
}

fn parse_hex_bytes(kind: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
	let text = value.as_str().ok_or_else(|| invalid(kind, "expected a hex string"))?;
	hex::decode(super::formatting::without_0x_prefix(text)).map_err(|e| invalid(kind, e.to_string()))
}
