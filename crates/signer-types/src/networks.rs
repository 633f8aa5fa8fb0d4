//! Network identifiers and the static per-network parameter tables.
//!
//! Network identifiers follow two families: `eip155:<decimal chain id>` for
//! EVM chains and `tron:<network name>` for TRON chains. All lookups here are
//! pure; adding a network means adding a row to one of the tables below.

use crate::{Address, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by all EVM network identifiers.
pub const EVM_NETWORK_PREFIX: &str = "eip155:";
/// Prefix shared by all TRON network identifiers.
pub const TRON_NETWORK_PREFIX: &str = "tron:";

/// Chain IDs of the known TRON networks.
const TRON_CHAIN_IDS: &[(&str, u64)] = &[
	("tron:mainnet", 728126428),   // 0x2b6653dc
	("tron:shasta", 2494104990),   // 0x94a9059e
	("tron:nile", 3448148188),     // 0xcd8690dc
];

/// Deployed authorization (payment permit) contracts.
const AUTHORIZATION_CONTRACTS: &[(&str, &str)] = &[
	("tron:mainnet", "TT8rEWbCoNX7vpEUauxb7rWJsTgs8vDLAn"),
	("tron:shasta", "TR2XninQ3jsvRRLGTifFyUHTBysffooUjt"),
	("tron:nile", "TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH"),
];

/// Errors raised by network resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
	/// The identifier is malformed or not in any table.
	#[error("Unsupported network: {0}")]
	UnsupportedNetwork(String),
}

/// The chain family a network identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
	Evm,
	Tron,
}

impl NetworkFamily {
	/// Sentinel address used by this family for "no contract".
	pub fn zero_address(&self) -> Address {
		match self {
			NetworkFamily::Evm => Address::Hex20([0u8; 20]),
			NetworkFamily::Tron => Address::tron([0u8; 20]),
		}
	}

	fn of(network: &str) -> Option<Self> {
		if network.starts_with(EVM_NETWORK_PREFIX) {
			Some(NetworkFamily::Evm)
		} else if network.starts_with(TRON_NETWORK_PREFIX) {
			Some(NetworkFamily::Tron)
		} else {
			None
		}
	}
}

/// A validated network identifier tagged with its family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkId {
	raw: String,
	family: NetworkFamily,
}

impl NetworkId {
	/// Parses an identifier, failing when the prefix is not recognized.
	pub fn parse(network: &str) -> Result<Self, NetworkError> {
		let family = NetworkFamily::of(network)
			.ok_or_else(|| NetworkError::UnsupportedNetwork(network.to_string()))?;
		Ok(Self {
			raw: network.to_string(),
			family,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn family(&self) -> NetworkFamily {
		self.family
	}

	/// The part after the family prefix (`1` for `eip155:1`).
	pub fn reference(&self) -> &str {
		match self.family {
			NetworkFamily::Evm => &self.raw[EVM_NETWORK_PREFIX.len()..],
			NetworkFamily::Tron => &self.raw[TRON_NETWORK_PREFIX.len()..],
		}
	}

	pub fn is_evm(&self) -> bool {
		self.family == NetworkFamily::Evm
	}

	pub fn is_tron(&self) -> bool {
		self.family == NetworkFamily::Tron
	}

	pub fn chain_id(&self) -> Result<u64, NetworkError> {
		match self.family {
			NetworkFamily::Evm => self
				.reference()
				.parse::<u64>()
				.map_err(|_| NetworkError::UnsupportedNetwork(format!("Invalid EVM network: {}", self))),
			NetworkFamily::Tron => TRON_CHAIN_IDS
				.iter()
				.find(|(name, _)| *name == self.raw)
				.map(|(_, id)| *id)
				.ok_or_else(|| NetworkError::UnsupportedNetwork(self.raw.clone())),
		}
	}

	/// Address of the authorization contract, or the family zero address when
	/// nothing is deployed on this network yet.
	pub fn authorization_address(&self) -> Address {
		AUTHORIZATION_CONTRACTS
			.iter()
			.find(|(name, _)| *name == self.raw)
			.and_then(|(_, address)| address.parse().ok())
			.unwrap_or_else(|| self.family.zero_address())
	}

	pub fn zero_address(&self) -> Address {
		self.family.zero_address()
	}

	/// Resolves chain ID, authorization contract and zero address in one go.
	pub fn chain_parameters(&self) -> Result<ChainParameters, NetworkError> {
		Ok(ChainParameters {
			chain_id: self.chain_id()?,
			authorization_contract: self.authorization_address(),
			zero_address: self.zero_address(),
		})
	}
}

impl FromStr for NetworkId {
	type Err = NetworkError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		NetworkId::parse(s)
	}
}

impl fmt::Display for NetworkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl Serialize for NetworkId {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.raw)
	}
}

impl<'de> Deserialize<'de> for NetworkId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		NetworkId::parse(&s).map_err(serde::de::Error::custom)
	}
}

/// Per-network parameters derived from a [`NetworkId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParameters {
	pub chain_id: u64,
	pub authorization_contract: Address,
	pub zero_address: Address,
}

/// Returns the chain ID for a network identifier string.
pub fn chain_id(network: &str) -> Result<u64, NetworkError> {
	NetworkId::parse(network)?.chain_id()
}

/// Returns the authorization contract address for a network identifier string.
///
/// Unknown prefixes fall back to the TRON zero address.
pub fn authorization_address(network: &str) -> Address {
	match NetworkId::parse(network) {
		Ok(id) => id.authorization_address(),
		Err(_) => NetworkFamily::Tron.zero_address(),
	}
}

/// Returns the family zero address, failing only when the family is unknown.
pub fn zero_address(network: &str) -> Result<Address, NetworkError> {
	NetworkId::parse(network).map(|id| id.zero_address())
}

pub fn is_evm_network(network: &str) -> bool {
	network.starts_with(EVM_NETWORK_PREFIX)
}

pub fn is_tron_network(network: &str) -> bool {
	network.starts_with(TRON_NETWORK_PREFIX)
}

/// RPC endpoint settings for one network.
///
/// # Fields
///
/// * `rpc_url` - HTTP(S) endpoint of the node API
/// * `api_key` - Optional key sent with every request (e.g. `TRON-PRO-API-KEY`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_url: String,
	#[serde(default)]
	pub api_key: Option<SecretString>,
}

/// Network endpoint settings keyed by network identifier.
pub type NetworksConfig = HashMap<NetworkId, NetworkConfig>;

/// Deserializes a TOML table keyed by network identifier strings, rejecting
/// keys that are not valid identifiers.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let network = NetworkId::parse(&key)
			.map_err(|e| serde::de::Error::custom(format!("Invalid network '{}': {}", key, e)))?;
		result.insert(network, value);
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_evm_chain_id_is_parsed_from_suffix() {
		for n in [1u64, 56, 8453, 84532, 11155111] {
			assert_eq!(chain_id(&format!("eip155:{}", n)), Ok(n));
		}
	}

	#[test]
	fn test_malformed_evm_suffix_is_unsupported() {
		for network in ["eip155:", "eip155:abc", "eip155:1x", "eip155:-1"] {
			assert!(matches!(
				chain_id(network),
				Err(NetworkError::UnsupportedNetwork(_))
			));
		}
	}

	#[test]
	fn test_tron_table_values() {
		assert_eq!(chain_id("tron:mainnet"), Ok(728126428));
		assert_eq!(chain_id("tron:shasta"), Ok(2494104990));
		assert_eq!(chain_id("tron:nile"), Ok(3448148188));

		assert_eq!(
			authorization_address("tron:mainnet").to_string(),
			"TT8rEWbCoNX7vpEUauxb7rWJsTgs8vDLAn"
		);
		assert_eq!(
			authorization_address("tron:shasta").to_string(),
			"TR2XninQ3jsvRRLGTifFyUHTBysffooUjt"
		);
		assert_eq!(
			authorization_address("tron:nile").to_string(),
			"TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH"
		);
	}

	#[test]
	fn test_every_table_address_decodes() {
		for (network, address) in AUTHORIZATION_CONTRACTS {
			let parsed: Address = address.parse().unwrap();
			assert!(!parsed.is_zero(), "{} has a zero address", network);
		}
	}

	#[test]
	fn test_unknown_tron_network() {
		assert!(matches!(
			chain_id("tron:devnet"),
			Err(NetworkError::UnsupportedNetwork(_))
		));
		assert_eq!(
			authorization_address("tron:devnet").to_string(),
			"T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb"
		);
	}

	#[test]
	fn test_undeployed_evm_network_returns_zero_address() {
		let address = authorization_address("eip155:8453");
		assert_eq!(
			address.to_string(),
			"0x0000000000000000000000000000000000000000"
		);
	}

	#[test]
	fn test_zero_address_by_family() {
		assert_eq!(
			zero_address("eip155:1").unwrap().to_string(),
			"0x0000000000000000000000000000000000000000"
		);
		assert_eq!(
			zero_address("tron:nile").unwrap().to_string(),
			"T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb"
		);
		assert!(matches!(
			zero_address("solana:mainnet"),
			Err(NetworkError::UnsupportedNetwork(_))
		));
	}

	#[test]
	fn test_unrecognized_prefix_is_rejected() {
		assert!(NetworkId::parse("mainnet").is_err());
		assert!(NetworkId::parse("").is_err());
		assert!("eip155:1".parse::<NetworkId>().unwrap().is_evm());
		assert!("tron:nile".parse::<NetworkId>().unwrap().is_tron());
		assert!(is_evm_network("eip155:10"));
		assert!(is_tron_network("tron:mainnet"));
	}

	#[test]
	fn test_chain_parameters() {
		let network = NetworkId::parse("tron:nile").unwrap();
		let params = network.chain_parameters().unwrap();
		assert_eq!(params.chain_id, 3448148188);
		assert_eq!(
			params.authorization_contract.to_string(),
			"TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH"
		);
		assert!(params.zero_address.is_zero());
	}

	#[test]
	fn test_deserialize_networks_rejects_bad_keys() {
		#[derive(Deserialize)]
		struct Wrapper {
			#[serde(deserialize_with = "deserialize_networks")]
			networks: NetworksConfig,
		}

		let ok: Wrapper = toml::from_str(
			r#"
			[networks."tron:nile"]
			rpc_url = "https://nile.trongrid.io"
			"#,
		)
		.unwrap();
		assert!(ok
			.networks
			.contains_key(&NetworkId::parse("tron:nile").unwrap()));

		let bad = toml::from_str::<Wrapper>(
			r#"
			[networks."solana:mainnet"]
			rpc_url = "https://example.invalid"
			"#,
		);
		assert!(bad.is_err());
	}
}
