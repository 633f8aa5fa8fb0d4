//! Allowance request types and the approval attempt lifecycle.

use crate::{Address, NetworkId, SignedTransaction, TransactionId, UnsignedTransaction};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value representable in 160 bits, used as the approval amount.
pub const MAX_UINT160: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);

/// How an insufficient allowance is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowanceMode {
	/// Approve automatically.
	#[default]
	Auto,
	/// Report the shortfall to the caller.
	Interactive,
	/// Do not check at all.
	Skip,
}

impl FromStr for AllowanceMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"auto" => Ok(AllowanceMode::Auto),
			"interactive" => Ok(AllowanceMode::Interactive),
			"skip" => Ok(AllowanceMode::Skip),
			other => Err(format!("unknown allowance mode '{}'", other)),
		}
	}
}

impl fmt::Display for AllowanceMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AllowanceMode::Auto => "auto",
			AllowanceMode::Interactive => "interactive",
			AllowanceMode::Skip => "skip",
		};
		f.write_str(s)
	}
}

/// Outcome when an approval was broadcast but never observed on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
	/// Report success anyway.
	#[default]
	AssumeSuccess,
	/// Report failure.
	Fail,
}

impl TimeoutPolicy {
	pub fn outcome(&self) -> bool {
		matches!(self, TimeoutPolicy::AssumeSuccess)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceRequest {
	pub token: Address,
	/// Authorization contract of `network`.
	pub spender: Address,
	pub required_amount: U256,
	pub network: NetworkId,
	pub mode: AllowanceMode,
}

impl AllowanceRequest {
	/// Builds a request whose spender is the network's authorization contract.
	pub fn new(token: Address, required_amount: U256, network: NetworkId, mode: AllowanceMode) -> Self {
		let spender = network.authorization_address();
		Self {
			token,
			spender,
			required_amount,
			network,
			mode,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalState {
	Built,
	Signed,
	Broadcast,
	Confirmed,
	TimedOut,
	Failed,
}

impl ApprovalState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			ApprovalState::Confirmed | ApprovalState::TimedOut | ApprovalState::Failed
		)
	}
}

/// One approval transaction moving through build, sign, broadcast and poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalAttempt {
	pub unsigned_tx: UnsignedTransaction,
	pub signed_tx: Option<SignedTransaction>,
	pub tx_id: Option<TransactionId>,
	pub state: ApprovalState,
}

impl ApprovalAttempt {
	pub fn new(unsigned_tx: UnsignedTransaction) -> Self {
		Self {
			unsigned_tx,
			signed_tx: None,
			tx_id: None,
			state: ApprovalState::Built,
		}
	}

	pub fn signed(&mut self, signed_tx: SignedTransaction) {
		self.signed_tx = Some(signed_tx);
		self.state = ApprovalState::Signed;
	}

	pub fn broadcast(&mut self, tx_id: Option<TransactionId>) {
		self.tx_id = tx_id;
		self.state = ApprovalState::Broadcast;
	}

	/// Moves to a terminal state. Non-terminal targets are ignored.
	pub fn finish(&mut self, state: ApprovalState) {
		if state.is_terminal() {
			self.state = state;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{RecoverableSignature, TransactionPayload, TronTransaction};
	use alloy_primitives::B256;

	fn unsigned() -> UnsignedTransaction {
		UnsignedTransaction {
			network: NetworkId::parse("tron:nile").unwrap(),
			signing_hash: B256::repeat_byte(0x11),
			payload: TransactionPayload::Tron(TronTransaction {
				tx_id: TransactionId(vec![0x11; 32]),
				raw: serde_json::json!({}),
			}),
		}
	}

	#[test]
	fn test_max_uint160() {
		let expected = (U256::from(1u64) << 160) - U256::from(1u64);
		assert_eq!(MAX_UINT160, expected);
		assert_eq!(MAX_UINT160.bit_len(), 160);
	}

	#[test]
	fn test_mode_parsing() {
		assert_eq!("auto".parse::<AllowanceMode>(), Ok(AllowanceMode::Auto));
		assert_eq!(
			"Interactive".parse::<AllowanceMode>(),
			Ok(AllowanceMode::Interactive)
		);
		assert_eq!("skip".parse::<AllowanceMode>(), Ok(AllowanceMode::Skip));
		assert!("always".parse::<AllowanceMode>().is_err());
		assert_eq!(AllowanceMode::default(), AllowanceMode::Auto);
	}

	#[test]
	fn test_timeout_policy() {
		assert_eq!(TimeoutPolicy::default(), TimeoutPolicy::AssumeSuccess);
		assert!(TimeoutPolicy::AssumeSuccess.outcome());
		assert!(!TimeoutPolicy::Fail.outcome());

		#[derive(Deserialize)]
		struct Wrapper {
			on_timeout: TimeoutPolicy,
		}
		let w: Wrapper = toml::from_str("on_timeout = \"fail\"").unwrap();
		assert_eq!(w.on_timeout, TimeoutPolicy::Fail);
	}

	#[test]
	fn test_request_spender_is_authorization_contract() {
		let network = NetworkId::parse("tron:mainnet").unwrap();
		let token: Address = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".parse().unwrap();
		let request = AllowanceRequest::new(token, U256::from(5u64), network, AllowanceMode::Auto);
		assert_eq!(
			request.spender.to_string(),
			"TT8rEWbCoNX7vpEUauxb7rWJsTgs8vDLAn"
		);
	}

	#[test]
	fn test_attempt_transitions() {
		let tx = unsigned();
		let mut attempt = ApprovalAttempt::new(tx.clone());
		assert_eq!(attempt.state, ApprovalState::Built);

		let signature: RecoverableSignature = format!("0x{}", "00".repeat(65)).parse().unwrap();
		attempt.signed(SignedTransaction {
			unsigned: tx,
			signature,
		});
		assert_eq!(attempt.state, ApprovalState::Signed);

		attempt.broadcast(Some(TransactionId(vec![0x11; 32])));
		assert_eq!(attempt.state, ApprovalState::Broadcast);

		attempt.finish(ApprovalState::Signed);
		assert_eq!(attempt.state, ApprovalState::Broadcast);

		attempt.finish(ApprovalState::Confirmed);
		assert!(attempt.state.is_terminal());
	}
}
