//! Per-call broadcast state machine using rust-fsm.
//!
//! ```text
//! Start ──AuthorityResolved──► ResolvingSigner
//!
//! ResolvingSigner ──SignerResolved──► Submitting
//!                 ──NoSigner────────► CheckingDelegation   (posting only)
//!                 ──UpgradeRequired─► AwaitingUpgrade      (active/owner)
//!
//! CheckingDelegation ──DelegationFound───► Submitting (via relay)
//!                    ──DelegationMissing─► AwaitingUpgrade
//!
//! AwaitingUpgrade ──UpgradeSelected─► GrantingAuthority ──AuthorityGranted─► Submitting
//!                 ──SignerSelected──► Submitting
//!                 ──UpgradeCancelled► Failed
//!
//! Submitting ──SubmitSucceeded─► Finalizing ──Finalized─► Done
//! ```
//!
//! Every failure input lands in `Failed`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub broadcast_machine(Start)

    Start => {
        AuthorityResolved => ResolvingSigner
    },
    ResolvingSigner => {
        SignerResolved => Submitting,
        NoSigner => CheckingDelegation,
        UpgradeRequired => AwaitingUpgrade,
        // Key login whose key vanished between detection and lookup
        SignerFailed => Failed
    },
    CheckingDelegation => {
        DelegationFound => Submitting,
        DelegationMissing => AwaitingUpgrade,
        CheckFailed => Failed
    },
    AwaitingUpgrade => {
        // Posting: grant the delegate, then submit through the relay
        UpgradeSelected => GrantingAuthority,
        // Active/owner: submit once with the chosen signer
        SignerSelected => Submitting,
        UpgradeCancelled => Failed
    },
    GrantingAuthority => {
        AuthorityGranted => Submitting,
        GrantFailed => Failed
    },
    Submitting => {
        SubmitSucceeded => Finalizing,
        SubmitFailed => Failed
    },
    Finalizing => {
        Finalized => Done
    }
}

pub use broadcast_machine::Input as BroadcastMachineInput;
pub use broadcast_machine::State as BroadcastMachineState;
pub use broadcast_machine::StateMachine as BroadcastMachine;

/// Broadcast progress as reported to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastState {
    Start,
    ResolvingSigner,
    CheckingDelegation,
    AwaitingUpgrade,
    GrantingAuthority,
    Submitting,
    Finalizing,
    Done,
    Failed,
}

impl BroadcastState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BroadcastState::Done | BroadcastState::Failed)
    }
}

impl From<&BroadcastMachineState> for BroadcastState {
    fn from(state: &BroadcastMachineState) -> Self {
        match state {
            BroadcastMachineState::Start => BroadcastState::Start,
            BroadcastMachineState::ResolvingSigner => BroadcastState::ResolvingSigner,
            BroadcastMachineState::CheckingDelegation => BroadcastState::CheckingDelegation,
            BroadcastMachineState::AwaitingUpgrade => BroadcastState::AwaitingUpgrade,
            BroadcastMachineState::GrantingAuthority => BroadcastState::GrantingAuthority,
            BroadcastMachineState::Submitting => BroadcastState::Submitting,
            BroadcastMachineState::Finalizing => BroadcastState::Finalizing,
            BroadcastMachineState::Done => BroadcastState::Done,
            BroadcastMachineState::Failed => BroadcastState::Failed,
        }
    }
}
