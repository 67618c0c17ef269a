//! Broadcast dispatcher.
//!
//! Picks a signer for each request, walks the delegated-posting upgrade
//! flow when the current login cannot sign, submits, then runs the
//! request's activity and cache side effects.

use crate::broadcast_fsm::{BroadcastMachine, BroadcastMachineInput, BroadcastState};
use crate::mutations::BroadcastRequest;
use crate::platform::PlatformAdapter;
use crate::{
    required_authority, BroadcastError, BroadcastResult, KeyLookup, Operation, Signer,
    TxConfirmation,
};
use serde::Serialize;
use session_storage::{Authority, LoginType};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A confirmed broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastOutcome {
    pub confirmation: TxConfirmation,
    /// Backend that signed the submitted transaction.
    pub signer: LoginType,
    /// States visited, starting at `Start`.
    pub states: Vec<BroadcastState>,
}

struct Run<'a> {
    username: &'a str,
    machine: BroadcastMachine,
    states: Vec<BroadcastState>,
}

impl<'a> Run<'a> {
    fn new(username: &'a str) -> Self {
        let machine = BroadcastMachine::new();
        let states = vec![BroadcastState::from(machine.state())];
        Self {
            username,
            machine,
            states,
        }
    }

    fn step(&mut self, input: BroadcastMachineInput) -> BroadcastResult<()> {
        let from = BroadcastState::from(self.machine.state());
        self.machine.consume(&input).map_err(|_| {
            BroadcastError::InvalidStateTransition(format!("{input:?} from {from:?}"))
        })?;
        let to = BroadcastState::from(self.machine.state());
        debug!(username = %self.username, ?from, ?to, "Broadcast transition");
        self.states.push(to);
        Ok(())
    }

    /// Record `input` (a failure transition) and hand back `err`.
    fn fail<T>(&mut self, input: BroadcastMachineInput, err: BroadcastError) -> BroadcastResult<T> {
        self.step(input)?;
        Err(err)
    }
}

/// Routes broadcasts through a [`PlatformAdapter`].
#[derive(Clone)]
pub struct BroadcastDispatcher {
    platform: Arc<dyn PlatformAdapter>,
}

impl BroadcastDispatcher {
    pub fn new(platform: Arc<dyn PlatformAdapter>) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Arc<dyn PlatformAdapter> {
        &self.platform
    }

    /// Sign and submit `request` for `username`.
    pub async fn broadcast(
        &self,
        username: &str,
        request: BroadcastRequest,
    ) -> BroadcastResult<BroadcastOutcome> {
        if request.operations.is_empty() {
            return Err(BroadcastError::InvalidRequest(
                "no operations to broadcast".to_string(),
            ));
        }

        let authority = request
            .authority
            .unwrap_or_else(|| required_authority(&request.operations));

        let mut run = Run::new(username);
        run.step(BroadcastMachineInput::AuthorityResolved)?;

        let signer = self
            .resolve_signer(&mut run, authority, &request.description)
            .await?;

        let confirmation = match self
            .submit(username, &signer, &request.operations, authority)
            .await
        {
            Ok(confirmation) => {
                run.step(BroadcastMachineInput::SubmitSucceeded)?;
                confirmation
            }
            Err(e) => {
                warn!(
                    username = %username,
                    signer = %signer.login_type(),
                    error = %e,
                    "Broadcast failed"
                );
                return run.fail(BroadcastMachineInput::SubmitFailed, e);
            }
        };

        // Activity first; its outcome never blocks invalidation.
        if let Some(activity) = request.activity {
            self.platform
                .record_activity(username, activity, confirmation.block_num, &confirmation.id)
                .await;
        }
        self.platform.invalidate_queries(request.invalidate).await;
        run.step(BroadcastMachineInput::Finalized)?;

        info!(
            username = %username,
            authority = %authority,
            signer = %signer.login_type(),
            tx_id = %confirmation.id,
            block_num = confirmation.block_num,
            "Broadcast confirmed"
        );

        Ok(BroadcastOutcome {
            confirmation,
            signer: signer.login_type(),
            states: run.states,
        })
    }

    async fn resolve_signer(
        &self,
        run: &mut Run<'_>,
        authority: Authority,
        description: &str,
    ) -> BroadcastResult<Signer> {
        let username = run.username;

        if let Some(login_type) = self.platform.get_login_type(username, Some(authority)) {
            let signer = match login_type {
                LoginType::Key => match self.platform.key_for(username, authority) {
                    KeyLookup::Found(key) => Signer::LocalKey(key),
                    KeyLookup::Delegated | KeyLookup::Absent => {
                        return run.fail(
                            BroadcastMachineInput::SignerFailed,
                            BroadcastError::MissingKey {
                                username: username.to_string(),
                                authority,
                            },
                        );
                    }
                },
                LoginType::Keychain => Signer::Extension,
                LoginType::HiveAuth => Signer::MobileSession,
                LoginType::HiveSigner => Signer::OAuthRelay,
            };
            run.step(BroadcastMachineInput::SignerResolved)?;
            return Ok(signer);
        }

        if authority != Authority::Posting {
            debug!(username = %username, authority = %authority, "No signer for authority, prompting");
            run.step(BroadcastMachineInput::UpgradeRequired)?;
            return self.upgrade(run, authority, description).await;
        }

        run.step(BroadcastMachineInput::NoSigner)?;
        match self.platform.has_posting_authorization(username).await {
            Ok(true) => {
                debug!(username = %username, "Using delegated posting authority");
                run.step(BroadcastMachineInput::DelegationFound)?;
                Ok(Signer::OAuthRelay)
            }
            Ok(false) => {
                run.step(BroadcastMachineInput::DelegationMissing)?;
                self.upgrade(run, authority, description).await
            }
            Err(e) => run.fail(BroadcastMachineInput::CheckFailed, e),
        }
    }

    async fn upgrade(
        &self,
        run: &mut Run<'_>,
        authority: Authority,
        description: &str,
    ) -> BroadcastResult<Signer> {
        let username = run.username;

        let Some(choice) = self.platform.show_auth_upgrade_ui(authority, description).await else {
            info!(username = %username, authority = %authority, "Authority upgrade cancelled");
            return run.fail(
                BroadcastMachineInput::UpgradeCancelled,
                BroadcastError::Cancelled,
            );
        };

        if authority != Authority::Posting {
            run.step(BroadcastMachineInput::SignerSelected)?;
            return Ok(choice);
        }

        run.step(BroadcastMachineInput::UpgradeSelected)?;
        if let Err(e) = self.platform.grant_posting_authority(username, &choice).await {
            warn!(username = %username, error = %e, "Posting authority grant failed");
            return run.fail(BroadcastMachineInput::GrantFailed, e);
        }
        run.step(BroadcastMachineInput::AuthorityGranted)?;
        Ok(Signer::OAuthRelay)
    }

    async fn submit(
        &self,
        username: &str,
        signer: &Signer,
        operations: &[Operation],
        authority: Authority,
    ) -> BroadcastResult<TxConfirmation> {
        match signer {
            Signer::LocalKey(key) => {
                self.platform
                    .broadcast_with_key(username, operations, key)
                    .await
            }
            Signer::Extension => {
                self.platform
                    .broadcast_with_keychain(username, operations, authority)
                    .await
            }
            Signer::MobileSession => {
                self.platform
                    .broadcast_with_hive_auth(username, operations, authority)
                    .await
            }
            Signer::OAuthRelay => {
                self.platform
                    .broadcast_with_token(username, operations)
                    .await
            }
        }
    }
}
