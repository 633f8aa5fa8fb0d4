//! Encoding and formatting helpers.

pub mod abi;
pub mod eip712;
pub mod formatting;

pub use abi::{
	decode_uint256, encode_arguments, function_selector, AbiWordEncoder, CallArgument, ALLOWANCE,
	APPROVE, BALANCE_OF,
};
pub use eip712::{
	compute_domain_hash, compute_final_digest, encode_type, hash_struct, Eip712Domain, TypeSchema,
	TypedData, TypedDataError, TypedField, DOMAIN_TYPE,
};
pub use formatting::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
