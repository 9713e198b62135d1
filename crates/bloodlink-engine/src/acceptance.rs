//! The donor side of a request: offer → terms → profile completion → commit,
//! or a decline. Each step is resumed from the session store and the
//! registry; nothing waits between replies.

use std::sync::Arc;

use tracing::{debug, info, warn};

use bloodlink_gateway::MessagingGateway;
use bloodlink_types::events::{Action, ActionButton, MessageRef};
use bloodlink_types::models::{
    BloodRequest, Donor, DonorId, DonorUpdate, RequestId, RequestStatus, UserHandle, is_provided,
};

use crate::admin::{AdminPolicy, CommitPolicy};
use crate::error::EngineError;
use crate::messages::{self, AdminSummary};
use crate::session::{AcceptSession, SessionStore, Stage};
use crate::store::Store;

/// Where an event left the donor's acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    TermsPresented { request_id: RequestId, donor_id: DonorId },
    AwaitingName,
    AwaitingPhone,
    Committed { request_id: RequestId, donor_id: DonorId },
    Declined { request_id: RequestId, donor_id: DonorId },
    /// Another donor already committed under `first-commit-wins`.
    AlreadyMatched { request_id: RequestId },
    /// The donor committed to this request earlier; nothing was changed.
    AlreadyCommitted { request_id: RequestId, donor_id: DonorId },
    Cancelled,
    SupportPrompted,
    SupportPreviewed,
    SupportSent { message_id: i64 },
    /// Nothing to advance; the user may have been sent a hint.
    Ignored,
}

/// Whether a (request, donor) pair may still move towards a commit.
enum Gate {
    Open(BloodRequest),
    Closed(Outcome),
}

pub struct Acceptance {
    store: Store,
    gateway: Arc<dyn MessagingGateway>,
    sessions: Arc<SessionStore>,
    commit_policy: CommitPolicy,
    admin: AdminPolicy,
}

impl Acceptance {
    pub fn new(
        store: Store,
        gateway: Arc<dyn MessagingGateway>,
        sessions: Arc<SessionStore>,
        commit_policy: CommitPolicy,
        admin: AdminPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            sessions,
            commit_policy,
            admin,
        }
    }

    pub async fn on_action(
        &self,
        user: UserHandle,
        action: Action,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        // Only the user's own messages can be edited in reply.
        let message = message.filter(|m| m.user == user);

        match action {
            Action::Accept { request_id, donor_id } => {
                self.accept(user, request_id, donor_id, message).await
            }
            Action::Decline { request_id, donor_id } => {
                self.decline(user, request_id, donor_id, message).await
            }
            Action::AgreeTerms => self.agree_terms(user).await,
            Action::DeclineTerms => self.decline_terms(user, message).await,
            Action::Cancel => self.cancel(user).await,
            Action::OpenSupport | Action::SendSupport | Action::DiscardSupport => Err(
                EngineError::MalformedInput(format!("{} is not a donation action", action)),
            ),
        }
    }

    pub async fn on_text(&self, user: UserHandle, text: &str) -> Result<Outcome, EngineError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("/cancel") {
            return self.cancel(user).await;
        }

        let Some(session) = self.sessions.get(user) else {
            debug!("Ignoring text from user {} with no acceptance in progress", user);
            return Ok(Outcome::Ignored);
        };

        match session.stage {
            Stage::TermsPending => {
                self.send_best_effort(user, messages::FINISH_TERMS_FIRST).await;
                Ok(Outcome::Ignored)
            }
            Stage::AwaitingName => {
                if !is_provided(text) {
                    self.present(user, None, messages::ASK_NAME_AGAIN, &[]).await?;
                    return Ok(Outcome::AwaitingName);
                }
                let advanced = self.sessions.advance(
                    user,
                    Stage::AwaitingPhone {
                        name: text.to_string(),
                    },
                );
                if !advanced {
                    debug!("Acceptance for user {} ended before the name arrived", user);
                    return Ok(Outcome::Ignored);
                }
                self.present(user, None, messages::ASK_PHONE, &[]).await?;
                Ok(Outcome::AwaitingPhone)
            }
            Stage::AwaitingPhone { name } => {
                if !is_provided(text) {
                    self.present(user, None, messages::ASK_PHONE_AGAIN, &[]).await?;
                    return Ok(Outcome::AwaitingPhone);
                }
                let Some(session) = self.sessions.take(user) else {
                    return Ok(Outcome::Ignored);
                };

                // The profile is only written for a request that can still be committed to.
                let gate = self
                    .gate(user, session.request_id, session.donor_id, None)
                    .await?;
                let request = match gate {
                    Gate::Open(request) => request,
                    Gate::Closed(outcome) => return Ok(outcome),
                };

                let donor_id = session.donor_id;
                let update = DonorUpdate::contact(name, text);
                let updated = self
                    .store
                    .call(move |db| db.update_donor(donor_id, &update))
                    .await?;
                if !updated {
                    return Err(EngineError::NotFound("donor"));
                }
                info!("Donor {} completed their profile", donor_id);

                self.commit(session, request).await
            }
        }
    }

    async fn accept(
        &self,
        user: UserHandle,
        request_id: RequestId,
        donor_id: DonorId,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        self.owned_donor(user, donor_id).await?;

        if let Gate::Closed(outcome) = self.gate(user, request_id, donor_id, message).await? {
            return Ok(outcome);
        }

        self.sessions.begin(
            user,
            AcceptSession {
                request_id,
                donor_id,
                stage: Stage::TermsPending,
                message,
            },
        );
        info!("Donor {} accepted request {}, awaiting terms", donor_id, request_id);

        self.present(user, message, messages::DONATION_TERMS, &messages::terms_actions())
            .await?;
        Ok(Outcome::TermsPresented { request_id, donor_id })
    }

    async fn decline(
        &self,
        user: UserHandle,
        request_id: RequestId,
        donor_id: DonorId,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        self.owned_donor(user, donor_id).await?;
        self.sessions.clear_pair(user, request_id, donor_id);

        let outcome = self.record_decline(user, request_id, donor_id, message).await?;
        if matches!(outcome, Outcome::Declined { .. }) {
            info!("Donor {} declined request {}", donor_id, request_id);
            self.present_best_effort(user, message, messages::DECLINED).await;
        }
        Ok(outcome)
    }

    async fn agree_terms(&self, user: UserHandle) -> Result<Outcome, EngineError> {
        let session = self.session_for(user)?;

        match session.stage {
            Stage::TermsPending => {}
            Stage::AwaitingName => {
                self.present(user, None, messages::ASK_NAME_AGAIN, &[]).await?;
                return Ok(Outcome::AwaitingName);
            }
            Stage::AwaitingPhone { .. } => {
                self.present(user, None, messages::ASK_PHONE_AGAIN, &[]).await?;
                return Ok(Outcome::AwaitingPhone);
            }
        }

        let request = match self.gate(user, session.request_id, session.donor_id, None).await {
            Ok(Gate::Open(request)) => request,
            Ok(Gate::Closed(outcome)) => {
                self.sessions.take(user);
                return Ok(outcome);
            }
            Err(e) => {
                self.sessions.take(user);
                return Err(e);
            }
        };

        let donor = match self.load_donor(session.donor_id).await {
            Ok(donor) => donor,
            Err(e) => {
                self.sessions.take(user);
                return Err(e);
            }
        };

        if donor.has_complete_profile() {
            let Some(session) = self.sessions.take(user) else {
                return Ok(Outcome::Ignored);
            };
            return self.commit(session, request).await;
        }

        if !self.sessions.advance(user, Stage::AwaitingName) {
            debug!("Acceptance for user {} ended before the terms were agreed", user);
            return Ok(Outcome::Ignored);
        }
        self.present(user, None, messages::ASK_NAME, &[]).await?;
        Ok(Outcome::AwaitingName)
    }

    async fn decline_terms(
        &self,
        user: UserHandle,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        let session = self.session_for(user)?;
        self.sessions.take(user);

        let (request_id, donor_id) = (session.request_id, session.donor_id);
        let message = message.or(session.message);
        let outcome = self.record_decline(user, request_id, donor_id, message).await?;
        if matches!(outcome, Outcome::Declined { .. }) {
            info!("Donor {} declined the terms for request {}", donor_id, request_id);
            self.present_best_effort(user, message, messages::TERMS_DECLINED).await;
        }
        Ok(outcome)
    }

    async fn cancel(&self, user: UserHandle) -> Result<Outcome, EngineError> {
        match self.sessions.take(user) {
            Some(session) => {
                info!(
                    "Donor {} cancelled acceptance of request {}",
                    session.donor_id, session.request_id
                );
                if let Some(message) = session.message {
                    self.present_best_effort(user, Some(message), messages::CANCELLED).await;
                } else {
                    self.send_best_effort(user, messages::CANCELLED).await;
                }
                Ok(Outcome::Cancelled)
            }
            None => {
                self.send_best_effort(user, messages::NOTHING_TO_CANCEL).await;
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Persist the commitment and introduce both parties. The session has
    /// already been removed from the store and the request passed the gate.
    async fn commit(
        &self,
        session: AcceptSession,
        request: BloodRequest,
    ) -> Result<Outcome, EngineError> {
        let AcceptSession { request_id, donor_id, .. } = session;
        let donor = self.load_donor(donor_id).await?;

        let first_wins = self.commit_policy == CommitPolicy::FirstCommitWins;
        self.store
            .call(move |db| {
                db.record_donor_accepted(request_id, donor_id)?;
                if first_wins {
                    db.update_request_status(request_id, RequestStatus::Fulfilled)?;
                }
                Ok(())
            })
            .await?;
        info!("Donor {} committed to request {}", donor_id, request_id);

        self.introduce(&request, &donor).await;
        Ok(Outcome::Committed { request_id, donor_id })
    }

    /// Decide whether the pair may still commit. A donor who already
    /// committed, or a request another donor has taken under
    /// `first-commit-wins`, closes the gate after telling the user.
    async fn gate(
        &self,
        user: UserHandle,
        request_id: RequestId,
        donor_id: DonorId,
        message: Option<MessageRef>,
    ) -> Result<Gate, EngineError> {
        let (request, own, successful) = self
            .store
            .call(move |db| {
                Ok((
                    db.get_request_by_id(request_id)?,
                    db.get_donation(request_id, donor_id)?,
                    db.count_successful_donations(request_id)?,
                ))
            })
            .await?;
        let request = request.ok_or(EngineError::NotFound("request"))?;

        if own.is_some_and(|d| d.status.is_successful()) {
            debug!("Donor {} already committed to request {}", donor_id, request_id);
            self.present_best_effort(user, message, messages::ALREADY_COMMITTED).await;
            return Ok(Gate::Closed(Outcome::AlreadyCommitted { request_id, donor_id }));
        }
        if self.commit_policy == CommitPolicy::FirstCommitWins && successful > 0 {
            info!(
                "Request {} already matched, turning away donor {}",
                request_id, donor_id
            );
            self.present_best_effort(user, message, messages::ALREADY_MATCHED).await;
            return Ok(Gate::Closed(Outcome::AlreadyMatched { request_id }));
        }
        if request.status != RequestStatus::Active {
            return Err(EngineError::NotFound("active request"));
        }
        Ok(Gate::Open(request))
    }

    /// Record a decline unless the donor already committed to the request.
    async fn record_decline(
        &self,
        user: UserHandle,
        request_id: RequestId,
        donor_id: DonorId,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        let (request, own) = self
            .store
            .call(move |db| {
                Ok((
                    db.get_request_by_id(request_id)?,
                    db.get_donation(request_id, donor_id)?,
                ))
            })
            .await?;
        if request.is_none() {
            return Err(EngineError::NotFound("request"));
        }
        if own.is_some_and(|d| d.status.is_successful()) {
            self.present_best_effort(user, message, messages::ALREADY_COMMITTED).await;
            return Ok(Outcome::AlreadyCommitted { request_id, donor_id });
        }

        self.store
            .call(move |db| db.record_donor_declined(request_id, donor_id))
            .await?;
        Ok(Outcome::Declined { request_id, donor_id })
    }

    /// The three commit notifications. Each is attempted regardless of
    /// whether the others were delivered.
    async fn introduce(&self, request: &BloodRequest, donor: &Donor) {
        let donor_handle = self.resolve_handle(donor.user).await;
        let requester_handle = self.resolve_handle(request.requester).await;

        self.send_isolated(
            donor.user,
            &messages::donor_committed(request, requester_handle.as_deref()),
            &messages::feedback_actions("Share Donation Experience"),
            "donor",
        )
        .await;
        self.send_isolated(
            request.requester,
            &messages::requester_notice(donor, donor_handle.as_deref()),
            &messages::feedback_actions("Share Feedback About Donor"),
            "requester",
        )
        .await;

        let Some(admin) = self.admin.handle() else {
            return;
        };
        let total_operations = match self.store.call(|db| db.get_operations_stats()).await {
            Ok(stats) => stats.total_operations,
            Err(e) => {
                warn!("Could not count operations for admin summary: {}", e);
                0
            }
        };
        let summary = messages::admin_summary(&AdminSummary {
            donor,
            donor_handle: donor_handle.as_deref(),
            request,
            requester_handle: requester_handle.as_deref(),
            total_operations,
        });
        self.send_isolated(admin, &summary, &[], "admin").await;
        info!("Admin notified about donation operation #{}", total_operations);
    }

    fn session_for(&self, user: UserHandle) -> Result<AcceptSession, EngineError> {
        self.sessions
            .get(user)
            .ok_or_else(|| EngineError::MalformedInput("no donation acceptance in progress".into()))
    }

    /// The donor, provided it belongs to the acting user.
    async fn owned_donor(&self, user: UserHandle, donor_id: DonorId) -> Result<Donor, EngineError> {
        let donor = self.load_donor(donor_id).await?;
        if donor.user != user {
            return Err(EngineError::MalformedInput(format!(
                "donor {} does not belong to user {}",
                donor_id, user
            )));
        }
        Ok(donor)
    }

    async fn load_donor(&self, id: DonorId) -> Result<Donor, EngineError> {
        self.store
            .call(move |db| db.get_donor_by_id(id))
            .await?
            .ok_or(EngineError::NotFound("donor"))
    }

    /// Edit the message the user pressed on, or send a new one.
    async fn present(
        &self,
        user: UserHandle,
        message: Option<MessageRef>,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), EngineError> {
        match message {
            Some(message) => self.gateway.edit_message(message, text, actions).await?,
            None => {
                self.gateway.send_message(user, text, actions).await?;
            }
        }
        Ok(())
    }

    async fn present_best_effort(&self, user: UserHandle, message: Option<MessageRef>, text: &str) {
        if let Err(e) = self.present(user, message, text, &[]).await {
            warn!("Failed to update user {}: {}", user, e);
        }
    }

    async fn send_best_effort(&self, user: UserHandle, text: &str) {
        self.present_best_effort(user, None, text).await;
    }

    async fn send_isolated(&self, to: UserHandle, text: &str, actions: &[ActionButton], role: &str) {
        if let Err(e) = self.gateway.send_message(to, text, actions).await {
            warn!("Failed to notify {} {}: {}", role, to, e);
        }
    }

    async fn resolve_handle(&self, user: UserHandle) -> Option<String> {
        match self.gateway.resolve_public_handle(user).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not resolve handle for user {}: {}", user, e);
                None
            }
        }
    }
}
