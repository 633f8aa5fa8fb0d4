//! Chain RPC access for the agent signer.
//!
//! This crate defines the [`ChainRpc`] interface the signer uses for
//! read-only calls, transaction building, broadcast and status lookups, and
//! routes each request to the client registered for its network.

use async_trait::async_trait;
use signer_types::{
	BroadcastResult, ContractCall, FeeParams, ImplementationRegistry, NetworkConfig,
	NetworkFamily, NetworkId, NetworksConfig, ReadOnlyCallResult, SignedTransaction,
	TransactionId, TransactionStatus, UnsignedTransaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod tron {
		pub mod http;
	}
}

/// Errors that can occur while talking to a chain.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Transport failure or unexpected node response.
	#[error("Network error: {0}")]
	Network(String),
	/// The node refused to build or execute the transaction.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// The transaction is inconsistent or for another chain family.
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(String),
	/// No client is registered for the network.
	#[error("No provider available for {0}")]
	NoProviderAvailable(String),
	/// Endpoint settings are unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for chain RPC clients.
///
/// One instance serves exactly one network.
#[async_trait]
pub trait ChainRpc: Send + Sync {
	/// Executes `call` without changing state.
	async fn read_only_call(&self, call: &ContractCall) -> Result<ReadOnlyCallResult, DeliveryError>;

	/// Builds an unsigned state-changing transaction for `call`.
	async fn build_contract_call(
		&self,
		call: &ContractCall,
		fee: &FeeParams,
	) -> Result<UnsignedTransaction, DeliveryError>;

	/// Submits a signed transaction. A node-side rejection is reported as
	/// `accepted == false`, not as an error.
	async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError>;

	/// Returns `None` while the transaction is unknown to the node.
	async fn get_transaction_status(
		&self,
		tx_id: &TransactionId,
	) -> Result<Option<TransactionStatus>, DeliveryError>;
}

/// Type alias for chain RPC factory functions.
pub type DeliveryFactory = fn(&NetworkId, &NetworkConfig) -> Result<Box<dyn ChainRpc>, DeliveryError>;

/// Registry trait for chain RPC implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// Get all registered chain RPC implementations.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::{evm::alloy, tron::http};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(http::Registry::NAME, http::Registry::factory()),
	]
}

/// Name of the implementation serving a network family.
pub fn implementation_for(family: NetworkFamily) -> &'static str {
	use implementations::{evm::alloy, tron::http};

	match family {
		NetworkFamily::Evm => alloy::Registry::NAME,
		NetworkFamily::Tron => http::Registry::NAME,
	}
}

/// Routes chain requests to the client registered for each network.
#[derive(Clone, Default)]
pub struct DeliveryService {
	providers: HashMap<NetworkId, Arc<dyn ChainRpc>>,
}

impl DeliveryService {
	pub fn new(providers: HashMap<NetworkId, Arc<dyn ChainRpc>>) -> Self {
		Self { providers }
	}

	/// Builds one client per configured network, picking the implementation
	/// by network family.
	pub fn from_config(networks: &NetworksConfig) -> Result<Self, DeliveryError> {
		let factories: HashMap<&'static str, DeliveryFactory> =
			get_all_implementations().into_iter().collect();

		let mut providers = HashMap::new();
		for (network, config) in networks {
			let name = implementation_for(network.family());
			let factory = factories.get(name).ok_or_else(|| {
				DeliveryError::Configuration(format!("No implementation named '{}'", name))
			})?;
			let client = factory(network, config)?;
			tracing::info!(network = %network, implementation = name, "Loaded chain RPC client");
			providers.insert(network.clone(), Arc::from(client));
		}

		Ok(Self { providers })
	}

	pub fn provider(&self, network: &NetworkId) -> Result<&Arc<dyn ChainRpc>, DeliveryError> {
		self.providers
			.get(network)
			.ok_or_else(|| DeliveryError::NoProviderAvailable(network.to_string()))
	}

	pub fn networks(&self) -> impl Iterator<Item = &NetworkId> {
		self.providers.keys()
	}

	pub async fn read_only_call(&self, call: &ContractCall) -> Result<ReadOnlyCallResult, DeliveryError> {
		self.provider(&call.network)?.read_only_call(call).await
	}

	pub async fn build_contract_call(
		&self,
		call: &ContractCall,
		fee: &FeeParams,
	) -> Result<UnsignedTransaction, DeliveryError> {
		self.provider(&call.network)?.build_contract_call(call, fee).await
	}

	pub async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError> {
		self.provider(&tx.unsigned.network)?.broadcast(tx).await
	}

	pub async fn get_transaction_status(
		&self,
		network: &NetworkId,
		tx_id: &TransactionId,
	) -> Result<Option<TransactionStatus>, DeliveryError> {
		self.provider(network)?.get_transaction_status(tx_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use signer_types::Address;

	struct FixedBlock(u64);

	#[async_trait]
	impl ChainRpc for FixedBlock {
		async fn read_only_call(
			&self,
			_call: &ContractCall,
		) -> Result<ReadOnlyCallResult, DeliveryError> {
			Ok(ReadOnlyCallResult {
				success: true,
				return_data: vec![self.0 as u8],
			})
		}

		async fn build_contract_call(
			&self,
			_call: &ContractCall,
			_fee: &FeeParams,
		) -> Result<UnsignedTransaction, DeliveryError> {
			Err(DeliveryError::TransactionFailed("unused".into()))
		}

		async fn broadcast(&self, _tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError> {
			Ok(BroadcastResult::rejected("unused"))
		}

		async fn get_transaction_status(
			&self,
			_tx_id: &TransactionId,
		) -> Result<Option<TransactionStatus>, DeliveryError> {
			Ok(Some(TransactionStatus {
				included: true,
				success: true,
				block_number: Some(self.0),
			}))
		}
	}

	fn service() -> DeliveryService {
		let mut providers: HashMap<NetworkId, Arc<dyn ChainRpc>> = HashMap::new();
		providers.insert(NetworkId::parse("tron:nile").unwrap(), Arc::new(FixedBlock(1)));
		providers.insert(NetworkId::parse("eip155:8453").unwrap(), Arc::new(FixedBlock(2)));
		DeliveryService::new(providers)
	}

	#[tokio::test]
	async fn test_routes_by_network() {
		let service = service();
		let nile = NetworkId::parse("tron:nile").unwrap();
		let base = NetworkId::parse("eip155:8453").unwrap();
		let tx_id = TransactionId(vec![0; 32]);
		let nile_status = service.get_transaction_status(&nile, &tx_id).await.unwrap();
		let base_status = service.get_transaction_status(&base, &tx_id).await.unwrap();
		assert_eq!(nile_status.and_then(|s| s.block_number), Some(1));
		assert_eq!(base_status.and_then(|s| s.block_number), Some(2));

		let call = ContractCall::new(
			base.clone(),
			Address::Hex20([1; 20]),
			"balanceOf(address)",
			vec![],
			Address::Hex20([2; 20]),
		);
		assert_eq!(service.read_only_call(&call).await.unwrap().return_data, vec![2]);
	}

	#[tokio::test]
	async fn test_unknown_network_has_no_provider() {
		let service = service();
		let mainnet = NetworkId::parse("tron:mainnet").unwrap();
		assert!(matches!(
			service
				.get_transaction_status(&mainnet, &TransactionId(vec![0; 32]))
				.await,
			Err(DeliveryError::NoProviderAvailable(_))
		));
	}

	#[test]
	fn test_implementation_per_family() {
		assert_eq!(implementation_for(NetworkFamily::Evm), "evm_alloy");
		assert_eq!(implementation_for(NetworkFamily::Tron), "tron_http");
		assert_eq!(get_all_implementations().len(), 2);
	}

	#[tokio::test]
	async fn test_from_config_builds_clients_per_family() {
		let mut networks = NetworksConfig::new();
		networks.insert(
			NetworkId::parse("tron:nile").unwrap(),
			NetworkConfig {
				rpc_url: "https://nile.trongrid.io".into(),
				api_key: None,
			},
		);
		networks.insert(
			NetworkId::parse("eip155:84532").unwrap(),
			NetworkConfig {
				rpc_url: "https://sepolia.base.org".into(),
				api_key: None,
			},
		);
		let service = DeliveryService::from_config(&networks).unwrap();
		assert_eq!(service.networks().count(), 2);
	}
}
