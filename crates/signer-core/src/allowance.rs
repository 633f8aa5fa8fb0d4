//! Allowance checking and the approve-broadcast-poll protocol.
//!
//! An insufficient allowance in `Auto` mode is raised to [`MAX_UINT160`] for
//! the network's authorization contract. The approval is broadcast once and
//! then polled until it is included or the poll budget runs out.

use crate::{ClientSigner, SignerError};
use alloy_primitives::U256;
use signer_types::utils::abi::APPROVE;
use signer_types::{
	truncate_id, Address, AllowanceEvent, AllowanceMode, AllowanceRequest, ApprovalAttempt,
	ApprovalState, CallArgument, ContractCall, NetworkId, SignerEvent, SigningEvent,
	TimeoutPolicy, TransactionId, MAX_UINT160,
};
use std::time::Duration;
use tracing::instrument;

/// Poll budget and timeout behaviour for approvals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowancePolicy {
	pub poll_interval: Duration,
	pub max_poll_attempts: u32,
	pub on_timeout: TimeoutPolicy,
}

impl Default for AllowancePolicy {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(3),
			max_poll_attempts: 10,
			on_timeout: TimeoutPolicy::default(),
		}
	}
}

impl ClientSigner {
	/// Makes sure the authorization contract may spend `required` of `token`.
	///
	/// Returns `Ok(false)` when the approval could not be built, was rejected
	/// by the node or reverted on chain.
	#[instrument(skip_all, fields(token = %token, required = %required, mode = %mode))]
	pub async fn ensure_allowance(
		&self,
		token: &Address,
		required: U256,
		network: Option<&NetworkId>,
		mode: AllowanceMode,
	) -> Result<bool, SignerError> {
		if mode == AllowanceMode::Skip {
			tracing::debug!("Allowance check skipped");
			return Ok(true);
		}

		let network = self.resolve_network(network)?;
		let request = AllowanceRequest::new(*token, required, network, mode);
		let current = self.check_allowance(&request.token, Some(&request.network)).await?;

		self.event_bus
			.publish(SignerEvent::Allowance(AllowanceEvent::Checked {
				network: request.network.clone(),
				token: request.token,
				current,
				required,
			}))
			.ok();

		if current >= required {
			tracing::debug!(current = %current, "Allowance sufficient");
			return Ok(true);
		}

		match request.mode {
			AllowanceMode::Interactive => {
				Err(SignerError::InsufficientAllowance { required, current })
			}
			_ => self.approve(&request).await,
		}
	}

	/// Builds, signs and broadcasts `approve(spender, MAX_UINT160)`, then
	/// waits for it to be included.
	#[instrument(skip_all, fields(network = %request.network, spender = %request.spender))]
	async fn approve(&self, request: &AllowanceRequest) -> Result<bool, SignerError> {
		let owner = self.identity.address();
		let call = ContractCall::new(
			request.network.clone(),
			request.token,
			APPROVE,
			vec![
				CallArgument::Address(request.spender),
				CallArgument::Uint(MAX_UINT160),
			],
			owner,
		);

		let unsigned = match self.delivery.build_contract_call(&call, &self.fee).await {
			Ok(tx) => tx,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to build approval");
				self.reject(&request.network, e.to_string(), ApprovalState::Failed);
				return Ok(false);
			}
		};
		self.event_bus
			.publish(SignerEvent::Allowance(AllowanceEvent::ApprovalBuilt {
				network: request.network.clone(),
				token: request.token,
				amount: MAX_UINT160,
			}))
			.ok();

		let mut attempt = ApprovalAttempt::new(unsigned);
		let signed = self.identity.sign_transaction(&attempt.unsigned_tx).await?;
		self.event_bus
			.publish(SignerEvent::Signing(SigningEvent::TransactionSigned {
				signer: self.address(),
				network: request.network.clone(),
			}))
			.ok();
		attempt.signed(signed.clone());

		let result = match self.delivery.broadcast(&signed).await {
			Ok(result) if result.accepted => result,
			Ok(result) => {
				let reason = result.message.unwrap_or_else(|| "rejected".to_string());
				attempt.finish(ApprovalState::Failed);
				tracing::warn!(reason = %reason, state = ?attempt.state, "Approval rejected by node");
				self.reject(&request.network, reason, attempt.state);
				return Ok(false);
			}
			Err(e) => {
				attempt.finish(ApprovalState::Failed);
				tracing::warn!(error = %e, state = ?attempt.state, "Failed to broadcast approval");
				self.reject(&request.network, e.to_string(), attempt.state);
				return Ok(false);
			}
		};

		let tx_id = result
			.tx_id
			.unwrap_or_else(|| TransactionId::from(attempt.unsigned_tx.signing_hash));
		tracing::info!(tx_id = %truncate_id(&tx_id.to_string()), "Approval broadcast");
		attempt.broadcast(Some(tx_id.clone()));
		self.event_bus
			.publish(SignerEvent::Allowance(AllowanceEvent::ApprovalBroadcast {
				network: request.network.clone(),
				tx_id: tx_id.clone(),
			}))
			.ok();

		let approved = self.await_inclusion(&request.network, &tx_id, &mut attempt).await;
		Ok(approved)
	}

	/// Polls until the transaction is included or the budget is spent.
	async fn await_inclusion(
		&self,
		network: &NetworkId,
		tx_id: &TransactionId,
		attempt: &mut ApprovalAttempt,
	) -> bool {
		let policy = self.allowance_policy;

		for poll in 1..=policy.max_poll_attempts {
			tokio::time::sleep(policy.poll_interval).await;

			match self.delivery.get_transaction_status(network, tx_id).await {
				Ok(Some(status)) if status.included => {
					attempt.finish(if status.success {
						ApprovalState::Confirmed
					} else {
						ApprovalState::Failed
					});
					tracing::info!(
						tx_id = %truncate_id(&tx_id.to_string()),
						success = status.success,
						block = ?status.block_number,
						state = ?attempt.state,
						"Approval included"
					);
					self.event_bus
						.publish(SignerEvent::Allowance(AllowanceEvent::ApprovalConfirmed {
							network: network.clone(),
							tx_id: tx_id.clone(),
							success: status.success,
							attempts: poll,
							state: attempt.state,
						}))
						.ok();
					return status.success;
				}
				Ok(_) => {
					tracing::debug!(poll, "Waiting for approval to be included");
				}
				Err(e) => {
					tracing::debug!(poll, error = %e, "Status query failed");
				}
			}
		}

		let assumed_success = policy.on_timeout.outcome();
		attempt.finish(ApprovalState::TimedOut);
		tracing::warn!(
			tx_id = %truncate_id(&tx_id.to_string()),
			attempts = policy.max_poll_attempts,
			assumed_success,
			state = ?attempt.state,
			"Approval not included within poll budget"
		);
		self.event_bus
			.publish(SignerEvent::Allowance(AllowanceEvent::ApprovalTimedOut {
				network: network.clone(),
				tx_id: tx_id.clone(),
				attempts: policy.max_poll_attempts,
				assumed_success,
				state: attempt.state,
			}))
			.ok();
		assumed_success
	}

	fn reject(&self, network: &NetworkId, reason: String, state: ApprovalState) {
		self.event_bus
			.publish(SignerEvent::Allowance(AllowanceEvent::ApprovalRejected {
				network: network.clone(),
				reason,
				state,
			}))
			.ok();
	}
}
