//! TRON chain RPC client over the full-node HTTP API.
//!
//! Uses the `/wallet/*` endpoints with hex (`41`-prefixed) addresses. The
//! transaction ID TRON reports is `sha256(raw_data)`, which is also the digest
//! that gets signed, so every built transaction is checked against it first.

use crate::{ChainRpc, DeliveryError};
use alloy_primitives::B256;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use signer_types::{
	Address, BroadcastResult, ContractCall, FeeParams, NetworkConfig, NetworkId,
	ReadOnlyCallResult, SignedTransaction, TransactionId, TransactionPayload, TransactionStatus,
	TronTransaction, UnsignedTransaction, TRON_ADDRESS_VERSION,
};
use std::time::Duration;

const API_KEY_HEADER: &str = "tron-pro-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one TRON network.
pub struct TronHttpRpc {
	network: NetworkId,
	client: reqwest::Client,
	base_url: String,
}

impl TronHttpRpc {
	pub fn new(network: &NetworkId, config: &NetworkConfig) -> Result<Self, DeliveryError> {
		if !network.is_tron() {
			return Err(DeliveryError::Configuration(format!(
				"{} is not a TRON network",
				network
			)));
		}

		let base_url = config.rpc_url.trim_end_matches('/').to_string();
		reqwest::Url::parse(&base_url).map_err(|e| {
			DeliveryError::Configuration(format!("Invalid RPC URL for network {}: {}", network, e))
		})?;

		let mut headers = HeaderMap::new();
		if let Some(api_key) = config.api_key.as_ref().filter(|k| !k.is_empty()) {
			let value = api_key
				.with_exposed(HeaderValue::from_str)
				.map_err(|e| DeliveryError::Configuration(format!("Invalid API key: {}", e)))?;
			headers.insert(API_KEY_HEADER, value);
		}

		let client = reqwest::Client::builder()
			.default_headers(headers)
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| DeliveryError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			network: network.clone(),
			client,
			base_url,
		})
	}

	async fn post(&self, endpoint: &str, body: Value) -> Result<Value, DeliveryError> {
		let url = format!("{}/wallet/{}", self.base_url, endpoint);
		let response = self
			.client
			.post(&url)
			.json(&body)
			.send()
			.await
			.map_err(|e| DeliveryError::Network(format!("{}: {}", endpoint, e)))?;

		let status = response.status();
		if !status.is_success() {
			return Err(DeliveryError::Network(format!(
				"{} returned HTTP {}",
				endpoint, status
			)));
		}

		response
			.json()
			.await
			.map_err(|e| DeliveryError::Network(format!("{}: invalid JSON: {}", endpoint, e)))
	}

	fn trigger_body(&self, call: &ContractCall) -> Value {
		json!({
			"owner_address": tron_hex_address(&call.caller),
			"contract_address": tron_hex_address(&call.contract),
			"function_selector": call.function,
			"parameter": hex::encode(call.parameter()),
			"visible": false,
		})
	}
}

/// `41` followed by the 20-byte payload in hex.
pub fn tron_hex_address(address: &Address) -> String {
	format!("{:02x}{}", TRON_ADDRESS_VERSION, hex::encode(address.payload()))
}

/// TRON error messages arrive hex-encoded; fall back to the raw text.
pub fn decode_message(message: &str) -> String {
	hex::decode(message)
		.ok()
		.and_then(|bytes| String::from_utf8(bytes).ok())
		.unwrap_or_else(|| message.to_string())
}

fn result_ok(response: &Value) -> bool {
	response
		.pointer("/result/result")
		.and_then(Value::as_bool)
		.unwrap_or(false)
}

fn result_message(response: &Value) -> String {
	response
		.pointer("/result/message")
		.or_else(|| response.get("message"))
		.or_else(|| response.get("Error"))
		.and_then(Value::as_str)
		.map(decode_message)
		.unwrap_or_else(|| "unknown error".to_string())
}

/// Parses a `triggerconstantcontract` response.
pub fn parse_constant_result(response: &Value) -> ReadOnlyCallResult {
	let return_data = response
		.get("constant_result")
		.and_then(Value::as_array)
		.and_then(|results| results.first())
		.and_then(Value::as_str)
		.and_then(|data| hex::decode(data).ok())
		.unwrap_or_default();

	ReadOnlyCallResult {
		success: result_ok(response),
		return_data,
	}
}

/// Extracts and verifies the transaction from a `triggersmartcontract` response.
pub fn parse_built_transaction(response: &Value) -> Result<TronTransaction, DeliveryError> {
	if !result_ok(response) {
		return Err(DeliveryError::TransactionFailed(result_message(response)));
	}

	let transaction = response
		.get("transaction")
		.ok_or_else(|| DeliveryError::TransactionFailed("response has no transaction".into()))?;

	let tx_id_hex = transaction
		.get("txID")
		.and_then(Value::as_str)
		.ok_or_else(|| DeliveryError::InvalidTransaction("transaction has no txID".into()))?;
	let raw_data_hex = transaction
		.get("raw_data_hex")
		.and_then(Value::as_str)
		.ok_or_else(|| DeliveryError::InvalidTransaction("transaction has no raw_data_hex".into()))?;

	let tx_id = hex::decode(tx_id_hex)
		.map_err(|e| DeliveryError::InvalidTransaction(format!("txID: {}", e)))?;
	let raw_data = hex::decode(raw_data_hex)
		.map_err(|e| DeliveryError::InvalidTransaction(format!("raw_data_hex: {}", e)))?;

	if Sha256::digest(&raw_data).as_slice() != tx_id.as_slice() {
		return Err(DeliveryError::InvalidTransaction(
			"txID does not match sha256(raw_data_hex)".into(),
		));
	}

	Ok(TronTransaction {
		tx_id: TransactionId(tx_id),
		raw: transaction.clone(),
	})
}

/// Parses a `gettransactioninfobyid` response; `{}` means not yet included.
pub fn parse_transaction_info(response: &Value) -> Option<TransactionStatus> {
	let is_empty = response.as_object().map(|o| o.is_empty()).unwrap_or(true);
	if is_empty || response.get("id").is_none() {
		return None;
	}

	let success = response
		.pointer("/receipt/result")
		.and_then(Value::as_str)
		.map(|result| result == "SUCCESS")
		.unwrap_or(false);

	Some(TransactionStatus {
		included: true,
		success,
		block_number: response.get("blockNumber").and_then(Value::as_u64),
	})
}

#[async_trait]
impl ChainRpc for TronHttpRpc {
	async fn read_only_call(&self, call: &ContractCall) -> Result<ReadOnlyCallResult, DeliveryError> {
		let response = self
			.post("triggerconstantcontract", self.trigger_body(call))
			.await?;
		Ok(parse_constant_result(&response))
	}

	async fn build_contract_call(
		&self,
		call: &ContractCall,
		fee: &FeeParams,
	) -> Result<UnsignedTransaction, DeliveryError> {
		let mut body = self.trigger_body(call);
		body["fee_limit"] = json!(fee.fee_limit);
		body["call_value"] = json!(0);

		let response = self.post("triggersmartcontract", body).await?;
		let tron_tx = parse_built_transaction(&response)?;

		let signing_hash = B256::try_from(tron_tx.tx_id.0.as_slice())
			.map_err(|_| DeliveryError::InvalidTransaction("txID is not 32 bytes".into()))?;

		tracing::debug!(
			network = %self.network,
			tx_id = %tron_tx.tx_id.to_unprefixed_hex(),
			fee_limit = fee.fee_limit,
			"Built TRON transaction"
		);

		Ok(UnsignedTransaction {
			network: self.network.clone(),
			signing_hash,
			payload: TransactionPayload::Tron(tron_tx),
		})
	}

	async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError> {
		let tron_tx = match &tx.unsigned.payload {
			TransactionPayload::Tron(tron_tx) => tron_tx,
			TransactionPayload::Evm(_) => {
				return Err(DeliveryError::InvalidTransaction(
					"EVM transaction sent to a TRON client".into(),
				))
			}
		};

		let mut body = tron_tx.raw.clone();
		body["signature"] = json!([tx.signature.to_unprefixed_hex()]);

		let response = self.post("broadcasttransaction", body).await?;
		if response.get("result").and_then(Value::as_bool) == Some(true) {
			let tx_id = response
				.get("txid")
				.and_then(Value::as_str)
				.and_then(|id| hex::decode(id).ok())
				.map(TransactionId)
				.unwrap_or_else(|| tron_tx.tx_id.clone());
			Ok(BroadcastResult::accepted(tx_id))
		} else {
			let message = match response.get("code").and_then(Value::as_str) {
				Some(code) => format!("{}: {}", code, result_message(&response)),
				None => result_message(&response),
			};
			Ok(BroadcastResult::rejected(message))
		}
	}

	async fn get_transaction_status(
		&self,
		tx_id: &TransactionId,
	) -> Result<Option<TransactionStatus>, DeliveryError> {
		let response = self
			.post(
				"gettransactioninfobyid",
				json!({ "value": tx_id.to_unprefixed_hex() }),
			)
			.await?;
		Ok(parse_transaction_info(&response))
	}
}

/// Factory function to create a TRON client for one network.
pub fn create_tron_rpc(
	network: &NetworkId,
	config: &NetworkConfig,
) -> Result<Box<dyn ChainRpc>, DeliveryError> {
	Ok(Box::new(TronHttpRpc::new(network, config)?))
}

/// Registry for the TRON HTTP client.
pub struct Registry;

impl signer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "tron_http";
	type Factory = crate::DeliveryFactory;

	fn factory() -> Self::Factory {
		create_tron_rpc
	}
}

impl crate::DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn built_response(raw_data_hex: &str, tx_id: &str) -> Value {
		json!({
			"result": { "result": true },
			"transaction": {
				"visible": false,
				"txID": tx_id,
				"raw_data": { "contract": [], "fee_limit": 1_000_000_000u64 },
				"raw_data_hex": raw_data_hex,
			}
		})
	}

	#[test]
	fn test_hex_addresses_carry_version_byte() {
		let usdt: Address = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".parse().unwrap();
		assert_eq!(
			tron_hex_address(&usdt),
			"41a614f803b6fd780986a42c78ec9c7f77e6ded13c"
		);
		assert_eq!(tron_hex_address(&usdt.to_hex()), tron_hex_address(&usdt));
	}

	#[test]
	fn test_decode_message() {
		assert_eq!(decode_message(&hex::encode("REVERT opcode executed")), "REVERT opcode executed");
		assert_eq!(decode_message("plain text"), "plain text");
	}

	#[test]
	fn test_constant_result() {
		let mut word = "00".repeat(31);
		word.push_str("2a");
		let response = json!({
			"result": { "result": true },
			"energy_used": 935,
			"constant_result": [word],
		});
		let result = parse_constant_result(&response);
		assert!(result.success);
		assert_eq!(result.return_data.len(), 32);
		assert_eq!(result.return_data[31], 42);

		let failed = parse_constant_result(&json!({ "result": { "code": "CONTRACT_VALIDATE_ERROR" } }));
		assert!(!failed.success);
		assert!(failed.return_data.is_empty());
	}

	#[test]
	fn test_built_transaction_id_is_verified() {
		let raw_data_hex = "0a02d9a922085dd1b3f5a1a2b3c4";
		let raw = hex::decode(raw_data_hex).unwrap();
		let tx_id = hex::encode(Sha256::digest(&raw));

		let tx = parse_built_transaction(&built_response(raw_data_hex, &tx_id)).unwrap();
		assert_eq!(tx.tx_id.to_unprefixed_hex(), tx_id);
		assert_eq!(tx.raw["raw_data_hex"], raw_data_hex);

		let forged = "00".repeat(32);
		assert!(matches!(
			parse_built_transaction(&built_response(raw_data_hex, &forged)),
			Err(DeliveryError::InvalidTransaction(_))
		));
	}

	#[test]
	fn test_build_failure_surfaces_message() {
		let response = json!({
			"result": {
				"code": "CONTRACT_VALIDATE_ERROR",
				"message": hex::encode("Contract validate error : account not exists"),
			}
		});
		match parse_built_transaction(&response) {
			Err(DeliveryError::TransactionFailed(msg)) => assert!(msg.contains("account not exists")),
			other => panic!("unexpected: {:?}", other.map(|t| t.tx_id)),
		}
	}

	#[test]
	fn test_transaction_info() {
		assert_eq!(parse_transaction_info(&json!({})), None);

		let included = json!({
			"id": "ab".repeat(32),
			"blockNumber": 51234567u64,
			"receipt": { "energy_usage_total": 14650, "result": "SUCCESS" },
		});
		assert_eq!(
			parse_transaction_info(&included),
			Some(TransactionStatus {
				included: true,
				success: true,
				block_number: Some(51234567),
			})
		);

		let reverted = json!({
			"id": "ab".repeat(32),
			"blockNumber": 51234568u64,
			"result": "FAILED",
			"receipt": { "result": "REVERT" },
		});
		assert!(!parse_transaction_info(&reverted).unwrap().success);
	}

	#[test]
	fn test_rejects_non_tron_network() {
		let config = NetworkConfig {
			rpc_url: "https://api.trongrid.io".into(),
			api_key: Some("key".into()),
		};
		assert!(TronHttpRpc::new(&NetworkId::parse("tron:mainnet").unwrap(), &config).is_ok());
		assert!(matches!(
			TronHttpRpc::new(&NetworkId::parse("eip155:1").unwrap(), &config),
			Err(DeliveryError::Configuration(_))
		));
	}
}
