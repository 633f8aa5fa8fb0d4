//! EVM chain RPC client built on alloy.
//!
//! Transactions are legacy (type 0) with EIP-155 replay protection. The
//! unsigned transaction carries its signature hash so that any key backend
//! that can sign a 32-byte digest can sign it.

use crate::{ChainRpc, DeliveryError};
use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_primitives::{Bytes, PrimitiveSignature, TxKind, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_transport_http::Http;
use async_trait::async_trait;
use signer_types::{
	BroadcastResult, ContractCall, EvmTransaction, FeeParams, NetworkConfig, NetworkId,
	ReadOnlyCallResult, RecoverableSignature, SignedTransaction, TransactionId, TransactionPayload,
	TransactionStatus, UnsignedTransaction,
};
use std::sync::Arc;

/// Alloy-based client for one EVM network.
pub struct AlloyRpc {
	network: NetworkId,
	chain_id: u64,
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
}

impl AlloyRpc {
	pub fn new(network: &NetworkId, config: &NetworkConfig) -> Result<Self, DeliveryError> {
		let chain_id = network
			.chain_id()
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

		let url = config.rpc_url.parse::<reqwest::Url>().map_err(|e| {
			DeliveryError::Configuration(format!("Invalid RPC URL for network {}: {}", network, e))
		})?;

		let provider = ProviderBuilder::new().on_http(url);

		Ok(Self {
			network: network.clone(),
			chain_id,
			provider: Arc::new(provider),
		})
	}

	fn request(&self, call: &ContractCall) -> TransactionRequest {
		TransactionRequest::default()
			.from(call.caller.to_alloy())
			.to(call.contract.to_alloy())
			.input(call.calldata().into())
	}
}

/// Legacy transaction with EIP-155 replay protection for `tx.chain_id`.
pub fn legacy_transaction(tx: &EvmTransaction) -> TxLegacy {
	TxLegacy {
		chain_id: Some(tx.chain_id),
		nonce: tx.nonce,
		gas_price: tx.gas_price,
		gas_limit: tx.gas_limit,
		to: TxKind::Call(tx.to.to_alloy()),
		value: tx.value,
		input: Bytes::copy_from_slice(&tx.data),
	}
}

pub fn legacy_signing_hash(tx: &EvmTransaction) -> B256 {
	legacy_transaction(tx).signature_hash()
}

/// RLP envelope of the signed legacy transaction, ready for
/// `eth_sendRawTransaction`.
pub fn encode_signed_legacy(
	tx: &EvmTransaction,
	signature: &RecoverableSignature,
) -> Result<Vec<u8>, DeliveryError> {
	let parity = signature.y_parity().ok_or_else(|| {
		DeliveryError::InvalidTransaction(format!("unexpected recovery id {}", signature.v))
	})?;
	let signature = PrimitiveSignature::new(
		U256::from_be_bytes(signature.r),
		U256::from_be_bytes(signature.s),
		parity == 1,
	);

	let signed = legacy_transaction(tx).into_signed(signature);
	let mut out = Vec::new();
	signed.rlp_encode(&mut out);
	Ok(out)
}

fn evm_payload(tx: &UnsignedTransaction) -> Result<&EvmTransaction, DeliveryError> {
	match &tx.payload {
		TransactionPayload::Evm(evm) => Ok(evm),
		TransactionPayload::Tron(_) => Err(DeliveryError::InvalidTransaction(
			"TRON transaction sent to an EVM client".into(),
		)),
	}
}

#[async_trait]
impl ChainRpc for AlloyRpc {
	async fn read_only_call(&self, call: &ContractCall) -> Result<ReadOnlyCallResult, DeliveryError> {
		let output = self
			.provider
			.call(&self.request(call))
			.await
			.map_err(|e| DeliveryError::Network(format!("eth_call failed: {}", e)))?;

		Ok(ReadOnlyCallResult {
			success: true,
			return_data: output.to_vec(),
		})
	}

	async fn build_contract_call(
		&self,
		call: &ContractCall,
		fee: &FeeParams,
	) -> Result<UnsignedTransaction, DeliveryError> {
		let nonce = self
			.provider
			.get_transaction_count(call.caller.to_alloy())
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))?;

		let gas_price = self
			.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))?;

		let tx = EvmTransaction {
			nonce,
			gas_price,
			gas_limit: fee.gas_limit,
			to: call.contract,
			value: U256::ZERO,
			data: call.calldata(),
			chain_id: self.chain_id,
		};

		tracing::debug!(
			network = %self.network,
			nonce,
			gas_price,
			"Built legacy transaction"
		);

		Ok(UnsignedTransaction {
			network: self.network.clone(),
			signing_hash: legacy_signing_hash(&tx),
			payload: TransactionPayload::Evm(tx),
		})
	}

	async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError> {
		let evm = evm_payload(&tx.unsigned)?;
		let raw = encode_signed_legacy(evm, &tx.signature)?;

		match self.provider.send_raw_transaction(&raw).await {
			Ok(pending) => Ok(BroadcastResult::accepted(TransactionId::from(
				*pending.tx_hash(),
			))),
			Err(e) => {
				tracing::warn!(network = %self.network, error = %e, "Node rejected transaction");
				Ok(BroadcastResult::rejected(e.to_string()))
			}
		}
	}

	async fn get_transaction_status(
		&self,
		tx_id: &TransactionId,
	) -> Result<Option<TransactionStatus>, DeliveryError> {
		let hash = B256::try_from(tx_id.0.as_slice()).map_err(|_| {
			DeliveryError::InvalidTransaction(format!("{} is not a 32-byte hash", tx_id))
		})?;

		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionStatus {
			included: true,
			success: receipt.status(),
			block_number: receipt.block_number,
		}))
	}
}

/// Factory function to create an EVM client for one network.
pub fn create_alloy_rpc(
	network: &NetworkId,
	config: &NetworkConfig,
) -> Result<Box<dyn ChainRpc>, DeliveryError> {
	Ok(Box::new(AlloyRpc::new(network, config)?))
}

/// Registry for the alloy EVM client.
pub struct Registry;

impl signer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::DeliveryFactory;

	fn factory() -> Self::Factory {
		create_alloy_rpc
	}
}

impl crate::DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use signer_types::{normalize, Address};

	// Worked example from EIP-155.
	fn eip155_example() -> EvmTransaction {
		EvmTransaction {
			nonce: 9,
			gas_price: 20_000_000_000,
			gas_limit: 21_000,
			to: Address::Hex20([0x35; 20]),
			value: U256::from(1_000_000_000_000_000_000u64),
			data: vec![],
			chain_id: 1,
		}
	}

	#[test]
	fn test_signing_payload_matches_eip155_example() {
		let tx = eip155_example();
		let mut payload = Vec::new();
		legacy_transaction(&tx).encode_for_signing(&mut payload);
		assert_eq!(
			hex::encode(payload),
			"ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
		);
		assert_eq!(
			hex::encode(legacy_signing_hash(&tx)),
			"daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
		);
	}

	#[test]
	fn test_signed_envelope_matches_eip155_example() {
		let mut raw = hex::decode(concat!(
			"28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
			"67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
		))
		.unwrap();
		raw.push(0);
		let signature = normalize(&raw).unwrap();

		let encoded = encode_signed_legacy(&eip155_example(), &signature).unwrap();
		assert_eq!(
			hex::encode(encoded),
			concat!(
				"f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a7640000",
				"8025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
				"a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
			)
		);
	}

	#[test]
	fn test_unknown_recovery_id_is_rejected() {
		let mut raw = vec![0x11u8; 64];
		raw.push(35);
		let signature = normalize(&raw).unwrap();
		assert!(matches!(
			encode_signed_legacy(&eip155_example(), &signature),
			Err(DeliveryError::InvalidTransaction(_))
		));
	}

	#[test]
	fn test_factory_rejects_bad_inputs() {
		let config = NetworkConfig {
			rpc_url: "not a url".into(),
			api_key: None,
		};
		let network = NetworkId::parse("eip155:1").unwrap();
		assert!(matches!(
			create_alloy_rpc(&network, &config),
			Err(DeliveryError::Configuration(_))
		));

		let config = NetworkConfig {
			rpc_url: "http://localhost:8545".into(),
			api_key: None,
		};
		let bad_network = NetworkId::parse("eip155:mainnet").unwrap();
		assert!(matches!(
			create_alloy_rpc(&bad_network, &config),
			Err(DeliveryError::Configuration(_))
		));
	}
}
