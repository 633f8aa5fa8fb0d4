//! The client signer facade.

use crate::{AllowancePolicy, EventBus, SignerError};
use alloy_primitives::U256;
use serde_json::{Map, Value};
use signer_account::{KeyBackend, SigningIdentity};
use signer_delivery::DeliveryService;
use signer_types::utils::abi::{decode_uint256, ALLOWANCE, BALANCE_OF};
use signer_types::utils::eip712::TypeSchema;
use signer_types::{
	truncate_id, Address, CallArgument, ChainParameters, ContractCall, Eip712Domain, FeeParams,
	NetworkFamily, NetworkId, RecoverableSignature, SignerEvent, SigningEvent, TypedData,
	TRON_ADDRESS_VERSION,
};
use std::sync::Arc;
use tracing::instrument;

/// Signs and reads chain state on behalf of one identity.
pub struct ClientSigner {
	pub(crate) identity: SigningIdentity,
	pub(crate) delivery: Arc<DeliveryService>,
	pub(crate) default_network: Option<NetworkId>,
	pub(crate) allowance_policy: AllowancePolicy,
	pub(crate) fee: FeeParams,
	pub(crate) event_bus: EventBus,
}

impl ClientSigner {
	/// Resolves the backend's address once and wraps it with the RPC routes.
	pub async fn new(
		backend: Box<dyn KeyBackend>,
		delivery: Arc<DeliveryService>,
	) -> Result<Self, SignerError> {
		let identity = SigningIdentity::new(backend).await?;
		Ok(Self::from_identity(identity, delivery))
	}

	pub fn from_identity(identity: SigningIdentity, delivery: Arc<DeliveryService>) -> Self {
		Self {
			identity,
			delivery,
			default_network: None,
			allowance_policy: AllowancePolicy::default(),
			fee: FeeParams::default(),
			event_bus: EventBus::default(),
		}
	}

	pub fn with_default_network(mut self, network: NetworkId) -> Self {
		self.default_network = Some(network);
		self
	}

	pub fn with_allowance_policy(mut self, policy: AllowancePolicy) -> Self {
		self.allowance_policy = policy;
		self
	}

	pub fn with_fee_params(mut self, fee: FeeParams) -> Self {
		self.fee = fee;
		self
	}

	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = event_bus;
		self
	}

	/// The identity's address, encoded for the default network's family.
	///
	/// Without a default network the address is returned as the backend
	/// reported it.
	pub fn address(&self) -> Address {
		let address = self.identity.address();
		match self.default_network.as_ref().map(NetworkId::family) {
			Some(NetworkFamily::Tron) => address.to_base58check(TRON_ADDRESS_VERSION),
			Some(NetworkFamily::Evm) => address.to_hex(),
			None => address,
		}
	}

	/// The identity's address as 20-byte hex.
	pub fn evm_address(&self) -> Address {
		self.identity.address().to_hex()
	}

	pub fn default_network(&self) -> Option<&NetworkId> {
		self.default_network.as_ref()
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Falls back to the default network; fails when neither is set.
	pub(crate) fn resolve_network(
		&self,
		network: Option<&NetworkId>,
	) -> Result<NetworkId, SignerError> {
		network
			.or(self.default_network.as_ref())
			.cloned()
			.ok_or_else(|| SignerError::UnsupportedNetwork("no network given and no default".into()))
	}

	pub fn chain_parameters(
		&self,
		network: Option<&NetworkId>,
	) -> Result<ChainParameters, SignerError> {
		Ok(self.resolve_network(network)?.chain_parameters()?)
	}

	/// Signs keccak256(`message`) with the identity's key.
	#[instrument(skip_all, fields(signer = %self.identity.address(), len = message.len()))]
	pub async fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, SignerError> {
		let signature = self.identity.sign_raw_message(message).await?;
		self.event_bus
			.publish(SignerEvent::Signing(SigningEvent::MessageSigned {
				signer: self.address(),
			}))
			.ok();
		Ok(signature)
	}

	/// Signs the EIP-712 digest of `message` under `domain`.
	///
	/// The primary type is the struct in `types` that no other struct
	/// references. `address` fields accept base58check or hex.
	#[instrument(skip_all, fields(signer = %self.identity.address(), domain = %domain.name))]
	pub async fn sign_typed_data(
		&self,
		domain: &Eip712Domain,
		types: &TypeSchema,
		message: &Map<String, Value>,
	) -> Result<RecoverableSignature, SignerError> {
		let typed = TypedData::new(domain.clone(), types.clone(), message.clone());
		self.sign_typed_data_request(&typed).await
	}

	/// Same as [`ClientSigner::sign_typed_data`] for a prebuilt request,
	/// honouring an explicit `primary_type`.
	pub async fn sign_typed_data_request(
		&self,
		typed: &TypedData,
	) -> Result<RecoverableSignature, SignerError> {
		if !self.identity.supports_hash_signing() {
			return Err(SignerError::UnsupportedOperation(
				"backend has no typed-data signing path".into(),
			));
		}

		let primary_type = typed.primary_type()?;
		let digest = typed.signing_hash()?;
		tracing::debug!(
			primary_type = %primary_type,
			digest = %truncate_id(&digest.to_string()),
			"Signing typed data"
		);

		let signature = self.identity.sign_hash(&digest).await?;
		self.event_bus
			.publish(SignerEvent::Signing(SigningEvent::TypedDataSigned {
				signer: self.address(),
				primary_type,
			}))
			.ok();
		Ok(signature)
	}

	/// `balanceOf(owner)`; unavailable balances read as zero.
	#[instrument(skip_all, fields(token = %token))]
	pub async fn check_balance(
		&self,
		token: &Address,
		network: Option<&NetworkId>,
	) -> Result<U256, SignerError> {
		let network = self.resolve_network(network)?;
		let owner = self.identity.address();
		let call = ContractCall::new(
			network,
			*token,
			BALANCE_OF,
			vec![CallArgument::Address(owner)],
			owner,
		);
		Ok(self.read_uint(&call).await)
	}

	/// `allowance(owner, authorization contract)`; unavailable values read as zero.
	#[instrument(skip_all, fields(token = %token))]
	pub async fn check_allowance(
		&self,
		token: &Address,
		network: Option<&NetworkId>,
	) -> Result<U256, SignerError> {
		let network = self.resolve_network(network)?;
		let owner = self.identity.address();
		let spender = network.authorization_address();
		let call = ContractCall::new(
			network,
			*token,
			ALLOWANCE,
			vec![CallArgument::Address(owner), CallArgument::Address(spender)],
			owner,
		);
		Ok(self.read_uint(&call).await)
	}

	async fn read_uint(&self, call: &ContractCall) -> U256 {
		match self.delivery.read_only_call(call).await {
			Ok(result) if result.success => match decode_uint256(&result.return_data) {
				Some(value) => value,
				None => {
					tracing::warn!(
						network = %call.network,
						function = %call.function,
						"Empty result, treating as zero"
					);
					U256::ZERO
				}
			},
			Ok(_) => {
				tracing::warn!(
					network = %call.network,
					function = %call.function,
					"Call reverted, treating as zero"
				);
				U256::ZERO
			}
			Err(e) => {
				tracing::warn!(
					network = %call.network,
					function = %call.function,
					error = %e,
					"Read failed, treating as zero"
				);
				U256::ZERO
			}
		}
	}
}
