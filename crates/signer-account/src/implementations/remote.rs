//! Wallet provider reached over JSON-RPC.
//!
//! Speaks three methods: `getAccountInfo` (returns `{address}`),
//! `signMessage` (hex message in, signature out) and `signTx`
//! (transaction in, `{signedTx, signature}` out).

use super::external::{ExternalBackend, WalletProvider};
use crate::{AccountError, KeyBackend};
use async_trait::async_trait;
use serde_json::{json, Value};
use signer_types::{with_0x_prefix, without_0x_prefix, Address, UnsignedTransaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub struct RemoteWalletProvider {
	client: reqwest::Client,
	url: String,
	next_id: AtomicU64,
}

impl RemoteWalletProvider {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AccountError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AccountError::Implementation(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self {
			client,
			url: url.into(),
			next_id: AtomicU64::new(1),
		})
	}

	async fn call(&self, method: &str, params: Value) -> Result<Value, AccountError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		tracing::debug!(method, id, "Wallet provider request");

		let response = self
			.client
			.post(&self.url)
			.json(&request)
			.send()
			.await
			.map_err(|e| AccountError::BackendUnavailable(format!("{}: {}", method, e)))?;

		let body: Value = response
			.json()
			.await
			.map_err(|e| AccountError::BackendUnavailable(format!("{}: bad response: {}", method, e)))?;

		extract_result(method, body)
	}
}

fn extract_result(method: &str, mut body: Value) -> Result<Value, AccountError> {
	if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.map(str::to_string)
			.unwrap_or_else(|| error.to_string());
		return Err(AccountError::SigningFailed(format!("{}: {}", method, message)));
	}
	body.get_mut("result")
		.map(Value::take)
		.ok_or_else(|| AccountError::Implementation(format!("{}: response has no result", method)))
}

/// Accepts either a bare hex string or an object with a `signature` field.
fn parse_signature(result: &Value) -> Result<Vec<u8>, AccountError> {
	let text = match result {
		Value::String(s) => s.as_str(),
		Value::Object(map) => map
			.get("signature")
			.and_then(Value::as_str)
			.ok_or_else(|| AccountError::SigningFailed("response has no signature".into()))?,
		other => {
			return Err(AccountError::SigningFailed(format!(
				"unexpected signature response: {}",
				other
			)))
		}
	};
	hex::decode(without_0x_prefix(text)).map_err(|e| AccountError::SigningFailed(e.to_string()))
}

fn parse_account(result: &Value) -> Result<Address, AccountError> {
	let text = result
		.get("address")
		.or(Some(result))
		.and_then(Value::as_str)
		.ok_or_else(|| AccountError::Implementation("account info has no address".into()))?;
	text.parse()
		.map_err(|e| AccountError::Implementation(format!("provider address: {}", e)))
}

#[async_trait]
impl WalletProvider for RemoteWalletProvider {
	async fn address(&self) -> Result<Address, AccountError> {
		let result = self.call("getAccountInfo", json!([])).await?;
		parse_account(&result)
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, AccountError> {
		let result = self
			.call("signMessage", json!([with_0x_prefix(&hex::encode(message))]))
			.await?;
		parse_signature(&result)
	}

	async fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<Vec<u8>, AccountError> {
		let transaction = serde_json::to_value(tx)
			.map_err(|e| AccountError::Implementation(format!("Failed to encode transaction: {}", e)))?;
		let result = self.call("signTx", json!([transaction])).await?;
		parse_signature(&result)
	}
}

/// Factory function to create a remote wallet backend from configuration.
///
/// Configuration parameters:
/// - `url`: JSON-RPC endpoint of the wallet provider (required)
/// - `timeout_seconds`: per-request timeout (default 30)
///
/// The provider is queried for its address before the backend is returned.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn KeyBackend>, AccountError> {
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::Implementation("url is required".into()))?;

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|s| s.max(1) as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let provider = Arc::new(RemoteWalletProvider::new(url, Duration::from_secs(timeout))?);

	let backend = tokio::task::block_in_place(|| {
		tokio::runtime::Handle::current().block_on(ExternalBackend::new(provider))
	})?;

	Ok(Box::new(backend))
}

/// Registry for the remote wallet backend.
pub struct Registry;

impl signer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "remote";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_extract_result_and_errors() {
		let ok = extract_result("signMessage", json!({"jsonrpc": "2.0", "id": 1, "result": "0xab"}));
		assert_eq!(ok.unwrap(), json!("0xab"));

		let err = extract_result(
			"signMessage",
			json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 4001, "message": "User rejected"}}),
		);
		match err {
			Err(AccountError::SigningFailed(msg)) => assert!(msg.contains("User rejected")),
			other => panic!("unexpected: {:?}", other),
		}

		assert!(matches!(
			extract_result("getAccountInfo", json!({"jsonrpc": "2.0", "id": 1})),
			Err(AccountError::Implementation(_))
		));
	}

	#[test]
	fn test_parse_signature_shapes() {
		let hex_sig = format!("0x{}00", "11".repeat(64));
		assert_eq!(parse_signature(&json!(hex_sig)).unwrap().len(), 65);

		let wrapped = json!({"signedTx": {}, "signature": hex_sig});
		assert_eq!(parse_signature(&wrapped).unwrap()[64], 0);

		assert!(parse_signature(&json!(42)).is_err());
		assert!(parse_signature(&json!({"signedTx": {}})).is_err());
	}

	#[test]
	fn test_parse_account() {
		let info = json!({"address": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "balance": 0});
		assert_eq!(
			parse_account(&info).unwrap().to_string(),
			"TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"
		);
		assert!(parse_account(&json!({"balance": 0})).is_err());
	}

	#[test]
	fn test_factory_requires_url() {
		let config = toml::Value::Table(toml::Table::new());
		assert!(matches!(
			create_account(&config),
			Err(AccountError::Implementation(_))
		));
	}
}
