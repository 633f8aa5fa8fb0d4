//! Command-line front end for the client signer.
//!
//! Loads a signer configuration, builds the configured key backend and chain
//! clients, and runs one operation per invocation.

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use signer_config::Config;
use signer_core::ClientSigner;
use signer_types::{format_token_amount, Address, AllowanceMode, NetworkId};
use std::path::PathBuf;

mod factory_registry;

use factory_registry::build_signer_from_config;

/// Command-line arguments for the signer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the signing address.
	Address,

	/// Print the token balance of the signing address.
	Balance {
		/// Token contract address
		token: Address,
		/// Network identifier; defaults to `[signer] default_network`
		#[arg(short, long)]
		network: Option<NetworkId>,
		/// Render the amount with this many decimals
		#[arg(short, long)]
		decimals: Option<u8>,
	},

	/// Print the allowance granted to the authorization contract.
	Allowance {
		/// Token contract address
		token: Address,
		#[arg(short, long)]
		network: Option<NetworkId>,
	},

	/// Approve the authorization contract if the allowance is below `amount`.
	EnsureAllowance {
		/// Token contract address
		token: Address,
		/// Required amount in base units
		amount: U256,
		#[arg(short, long)]
		network: Option<NetworkId>,
		/// auto, interactive or skip; defaults to `[signer] allowance_mode`
		#[arg(short, long)]
		mode: Option<AllowanceMode>,
	},

	/// Print chain ID, authorization contract and zero address.
	ChainInfo {
		#[arg(short, long)]
		network: Option<NetworkId>,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		networks = config.networks.len(),
		account = %config.account.primary,
		"Loaded configuration"
	);

	let signer = build_signer_from_config(&config).await?;
	run(&signer, &config, args.command).await
}

async fn run(
	signer: &ClientSigner,
	config: &Config,
	command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
	match command {
		Command::Address => {
			println!("{}", signer.address());
			if signer.address() != signer.evm_address() {
				println!("{}", signer.evm_address());
			}
		}
		Command::Balance {
			token,
			network,
			decimals,
		} => {
			let balance = signer.check_balance(&token, network.as_ref()).await?;
			match decimals {
				Some(decimals) => println!("{}", format_token_amount(balance, decimals)),
				None => println!("{}", balance),
			}
		}
		Command::Allowance { token, network } => {
			let allowance = signer.check_allowance(&token, network.as_ref()).await?;
			println!("{}", allowance);
		}
		Command::EnsureAllowance {
			token,
			amount,
			network,
			mode,
		} => {
			let mode = mode.unwrap_or(config.signer.allowance_mode);
			let approved = signer
				.ensure_allowance(&token, amount, network.as_ref(), mode)
				.await?;
			if !approved {
				return Err("Allowance could not be approved".into());
			}
			println!("ok");
		}
		Command::ChainInfo { network } => {
			let params = signer.chain_parameters(network.as_ref())?;
			println!("chain_id: {}", params.chain_id);
			println!("authorization_contract: {}", params.authorization_contract);
			println!("zero_address: {}", params.zero_address);
		}
	}

	Ok(())
}
