//! Factory registry for key backends, and signer assembly from configuration.

use signer_account::AccountFactory;
use signer_config::Config;
use signer_core::{AllowancePolicy, ClientSigner};
use signer_delivery::DeliveryService;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Known key backend factories by name.
pub struct FactoryRegistry {
	pub account: HashMap<String, AccountFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			account: HashMap::new(),
		}
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	/// Looks up a factory, listing the registered names on failure.
	pub fn account_factory(&self, name: &str) -> Result<AccountFactory, String> {
		self.account.get(name).copied().ok_or_else(|| {
			let mut available: Vec<_> = self.account.keys().cloned().collect();
			available.sort();
			format!(
				"Unknown account implementation '{}'. Available: [{}]",
				name,
				available.join(", ")
			)
		})
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in signer_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}
		registry
	})
}

/// Chain clients for every configured network.
pub fn build_delivery(config: &Config) -> Result<Arc<DeliveryService>, Box<dyn std::error::Error>> {
	Ok(Arc::new(DeliveryService::from_config(&config.networks)?))
}

/// Builds the configured key backend and wraps it in a [`ClientSigner`].
pub async fn build_signer_from_config(
	config: &Config,
) -> Result<ClientSigner, Box<dyn std::error::Error>> {
	let primary = &config.account.primary;
	let factory = get_registry().account_factory(primary)?;
	let settings = config
		.account
		.implementations
		.get(primary)
		.ok_or_else(|| format!("No settings for account implementation '{}'", primary))?;

	let backend = factory(settings)?;
	tracing::info!(implementation = %primary, "Loaded key backend");

	let policy = AllowancePolicy {
		poll_interval: config.allowance.poll_interval(),
		max_poll_attempts: config.allowance.max_poll_attempts,
		on_timeout: config.allowance.on_timeout,
	};

	let mut signer = ClientSigner::new(backend, build_delivery(config)?)
		.await?
		.with_allowance_policy(policy)
		.with_fee_params(config.allowance.fee_params());
	if let Some(network) = config.default_network() {
		signer = signer.with_default_network(network.clone());
	}

	Ok(signer)
}
