//! In-memory chain and signer fixtures for unit tests.

use crate::ClientSigner;
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use signer_account::implementations::local::LocalBackend;
use signer_delivery::{ChainRpc, DeliveryError, DeliveryService};
use signer_types::{
	BroadcastResult, ContractCall, FeeParams, NetworkId, ReadOnlyCallResult, SecretString,
	SignedTransaction, TransactionId, TransactionPayload, TransactionStatus, TronTransaction,
	UnsignedTransaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_KEY_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const TX_HASH: [u8; 32] = [0xaa; 32];

/// Scripted chain behaviour.
#[derive(Clone)]
pub struct MockBehaviour {
	/// Value returned by every read; `None` makes reads fail.
	pub read_value: Option<U256>,
	/// Reads come back with `success == false`.
	pub read_reverts: bool,
	/// Reads succeed with fewer than 32 bytes of return data.
	pub read_short: bool,
	pub build_fails: bool,
	pub broadcast_accepts: bool,
	/// Poll number (1-based) on which the transaction shows up.
	pub include_on_poll: Option<u32>,
	pub execution_success: bool,
}

impl Default for MockBehaviour {
	fn default() -> Self {
		Self {
			read_value: Some(U256::ZERO),
			read_reverts: false,
			read_short: false,
			build_fails: false,
			broadcast_accepts: true,
			include_on_poll: Some(1),
			execution_success: true,
		}
	}
}

#[derive(Default)]
pub struct MockRpc {
	pub behaviour: MockBehaviour,
	pub reads: AtomicU32,
	pub builds: AtomicU32,
	pub broadcasts: AtomicU32,
	pub polls: AtomicU32,
	pub calls: Mutex<Vec<ContractCall>>,
	pub signed: Mutex<Vec<SignedTransaction>>,
}

impl MockRpc {
	pub fn new(behaviour: MockBehaviour) -> Arc<Self> {
		Arc::new(Self {
			behaviour,
			..Default::default()
		})
	}

	pub fn count(counter: &AtomicU32) -> u32 {
		counter.load(Ordering::SeqCst)
	}

	pub fn last_call(&self) -> Option<ContractCall> {
		self.calls.lock().unwrap().last().cloned()
	}

	pub fn last_signed(&self) -> Option<SignedTransaction> {
		self.signed.lock().unwrap().last().cloned()
	}
}

#[async_trait]
impl ChainRpc for MockRpc {
	async fn read_only_call(&self, call: &ContractCall) -> Result<ReadOnlyCallResult, DeliveryError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.calls.lock().unwrap().push(call.clone());
		if self.behaviour.read_reverts {
			return Ok(ReadOnlyCallResult {
				success: false,
				return_data: Vec::new(),
			});
		}
		if self.behaviour.read_short {
			return Ok(ReadOnlyCallResult {
				success: true,
				return_data: vec![0u8; 4],
			});
		}
		match self.behaviour.read_value {
			Some(value) => Ok(ReadOnlyCallResult {
				success: true,
				return_data: value.to_be_bytes::<32>().to_vec(),
			}),
			None => Err(DeliveryError::Network("connection reset".into())),
		}
	}

	async fn build_contract_call(
		&self,
		call: &ContractCall,
		_fee: &FeeParams,
	) -> Result<UnsignedTransaction, DeliveryError> {
		self.builds.fetch_add(1, Ordering::SeqCst);
		self.calls.lock().unwrap().push(call.clone());
		if self.behaviour.build_fails {
			return Err(DeliveryError::TransactionFailed("account not exists".into()));
		}
		Ok(UnsignedTransaction {
			network: call.network.clone(),
			signing_hash: B256::from(TX_HASH),
			payload: TransactionPayload::Tron(TronTransaction {
				tx_id: TransactionId(TX_HASH.to_vec()),
				raw: serde_json::json!({ "txID": hex::encode(TX_HASH) }),
			}),
		})
	}

	async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult, DeliveryError> {
		self.broadcasts.fetch_add(1, Ordering::SeqCst);
		self.signed.lock().unwrap().push(tx.clone());
		if self.behaviour.broadcast_accepts {
			Ok(BroadcastResult::accepted(TransactionId(TX_HASH.to_vec())))
		} else {
			Ok(BroadcastResult::rejected("SIGERROR"))
		}
	}

	async fn get_transaction_status(
		&self,
		_tx_id: &TransactionId,
	) -> Result<Option<TransactionStatus>, DeliveryError> {
		let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
		match self.behaviour.include_on_poll {
			Some(n) if poll >= n => Ok(Some(TransactionStatus {
				included: true,
				success: self.behaviour.execution_success,
				block_number: Some(100 + poll as u64),
			})),
			_ => Ok(None),
		}
	}
}

pub fn delivery_for(network: &str, rpc: Arc<MockRpc>) -> Arc<DeliveryService> {
	let mut providers: HashMap<NetworkId, Arc<dyn ChainRpc>> = HashMap::new();
	providers.insert(NetworkId::parse(network).unwrap(), rpc);
	Arc::new(DeliveryService::new(providers))
}

pub async fn local_signer(delivery: Arc<DeliveryService>) -> ClientSigner {
	let backend = LocalBackend::new(&SecretString::from(TEST_KEY)).unwrap();
	ClientSigner::new(Box::new(backend), delivery).await.unwrap()
}
