//! Events published while signing and ensuring allowances.
//!
//! Events are fire-and-forget notifications for observers; nothing in the
//! signing flow depends on anyone receiving them.

use crate::{Address, ApprovalState, NetworkId, TransactionId};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignerEvent {
	Allowance(AllowanceEvent),
	Signing(SigningEvent),
}

/// Progress of an allowance check or approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AllowanceEvent {
	/// The current allowance was read.
	Checked {
		network: NetworkId,
		token: Address,
		current: U256,
		required: U256,
	},
	/// An approval transaction was built for `amount`.
	ApprovalBuilt {
		network: NetworkId,
		token: Address,
		amount: U256,
	},
	/// The node accepted the approval.
	ApprovalBroadcast {
		network: NetworkId,
		tx_id: TransactionId,
	},
	/// Building or broadcasting the approval failed.
	ApprovalRejected {
		network: NetworkId,
		reason: String,
		state: ApprovalState,
	},
	/// The approval was included on chain. `state` is `Confirmed` or `Failed`.
	ApprovalConfirmed {
		network: NetworkId,
		tx_id: TransactionId,
		success: bool,
		attempts: u32,
		state: ApprovalState,
	},
	/// The poll budget ran out before inclusion.
	ApprovalTimedOut {
		network: NetworkId,
		tx_id: TransactionId,
		attempts: u32,
		assumed_success: bool,
		state: ApprovalState,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SigningEvent {
	MessageSigned { signer: Address },
	TypedDataSigned { signer: Address, primary_type: String },
	TransactionSigned { signer: Address, network: NetworkId },
}
