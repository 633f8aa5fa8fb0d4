//! Configuration for the client signer.
//!
//! Configuration is TOML with `${VAR}` and `${VAR:-default}` environment
//! substitution. A file may pull other files in with `include = [..]`; every
//! top-level section must then live in exactly one file.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use signer_types::{
	networks::deserialize_networks, AllowanceMode, FeeParams, NetworkId, NetworksConfig,
	TimeoutPolicy, DEFAULT_FEE_LIMIT, DEFAULT_GAS_LIMIT,
};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The default rendering echoes the whole input, which may hold keys.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	#[serde(default)]
	pub signer: SignerConfig,
	/// RPC endpoints keyed by network identifier.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	pub account: AccountConfig,
	#[serde(default)]
	pub allowance: AllowanceConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignerConfig {
	/// Network used when a call does not name one.
	#[serde(default)]
	pub default_network: Option<NetworkId>,
	/// Mode used by `ensure-allowance` when none is given.
	#[serde(default)]
	pub allowance_mode: AllowanceMode,
}

/// Key backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Raw settings per implementation name, handed to its factory.
	pub implementations: HashMap<String, toml::Value>,
}

/// Approval polling and fee settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AllowanceConfig {
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	#[serde(default = "default_max_poll_attempts")]
	pub max_poll_attempts: u32,
	#[serde(default)]
	pub on_timeout: TimeoutPolicy,
	/// TRON energy cap in sun.
	#[serde(default = "default_fee_limit")]
	pub fee_limit: u64,
	/// EVM gas limit for approvals.
	#[serde(default = "default_gas_limit")]
	pub gas_limit: u64,
}

fn default_poll_interval_seconds() -> u64 {
	3
}

fn default_max_poll_attempts() -> u32 {
	10
}

fn default_fee_limit() -> u64 {
	DEFAULT_FEE_LIMIT
}

fn default_gas_limit() -> u64 {
	DEFAULT_GAS_LIMIT
}

impl Default for AllowanceConfig {
	fn default() -> Self {
		Self {
			poll_interval_seconds: default_poll_interval_seconds(),
			max_poll_attempts: default_max_poll_attempts(),
			on_timeout: TimeoutPolicy::default(),
			fee_limit: default_fee_limit(),
			gas_limit: default_gas_limit(),
		}
	}
}

impl AllowanceConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}

	pub fn fee_params(&self) -> FeeParams {
		FeeParams {
			fee_limit: self.fee_limit,
			gas_limit: self.gas_limit,
		}
	}
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// A variable with no value and no default is an error. Inputs over 1MB are
/// rejected before matching.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			}
		};
		resolved.push_str(&input[last..whole.start()]);
		resolved.push_str(&value);
		last = whole.end();
	}
	resolved.push_str(&input[last..]);

	Ok(resolved)
}

impl Config {
	/// Loads a configuration file, following `include` directives relative to
	/// its directory.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path = Path::new(path);
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path.display())))?;

		ConfigLoader::new(base_dir).load_config(file_name).await
	}

	/// Network to use when a caller passes none, as configured.
	pub fn default_network(&self) -> Option<&NetworkId> {
		self.signer.default_network.as_ref()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"At least one network must be configured".into(),
			));
		}

		for (network, settings) in &self.networks {
			if settings.rpc_url.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} has an empty rpc_url",
					network
				)));
			}
			network
				.chain_id()
				.map_err(|e| ConfigError::Validation(e.to_string()))?;
		}

		if let Some(default) = &self.signer.default_network {
			if !self.networks.contains_key(default) {
				return Err(ConfigError::Validation(format!(
					"Default network {} has no [networks] entry",
					default
				)));
			}
		}

		if self.account.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Account primary implementation cannot be empty".into(),
			));
		}
		if !self.account.implementations.contains_key(&self.account.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary account implementation '{}' is not configured",
				self.account.primary
			)));
		}

		if self.allowance.max_poll_attempts == 0 {
			return Err(ConfigError::Validation(
				"max_poll_attempts must be at least 1".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
