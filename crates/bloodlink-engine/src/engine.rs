use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use bloodlink_db::Database;
use bloodlink_gateway::MessagingGateway;
use bloodlink_types::events::{Action, MessageRef, UserEvent};
use bloodlink_types::models::{
    BloodRequest, Donor, DonorId, NewDonor, NewRequest, RequestId, UserHandle,
};

use crate::acceptance::{Acceptance, Outcome};
use crate::admin::{AdminPolicy, CommitPolicy};
use crate::error::EngineError;
use crate::messages;
use crate::notifier::Notifier;
use crate::ranker::{self, RECENT_REQUEST_LIMIT};
use crate::session::SessionStore;
use crate::store::Store;
use crate::support::SupportDesk;

pub const DEFAULT_SEND_PACING: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between consecutive offers of one request.
    pub send_pacing: Duration,
    pub commit_policy: CommitPolicy,
    pub admin: AdminPolicy,
}

impl EngineConfig {
    pub fn new(admin: AdminPolicy) -> Self {
        Self {
            send_pacing: DEFAULT_SEND_PACING,
            commit_policy: CommitPolicy::default(),
            admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered {
        donor_id: DonorId,
        /// Recent requests offered to the new donor.
        offered: Vec<RequestId>,
    },
    AlreadyRegistered(DonorId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request_id: RequestId,
    /// Donors reached, in rank order.
    pub notified: Vec<DonorId>,
}

/// Matching and notification engine. Cheap to clone; HTTP handlers and the
/// event loop share one instance.
#[derive(Clone)]
pub struct Engine {
    store: Store,
    gateway: Arc<dyn MessagingGateway>,
    notifier: Notifier,
    sessions: Arc<SessionStore>,
    acceptance: Arc<Acceptance>,
    support: Arc<SupportDesk>,
}

impl Engine {
    pub fn new(db: Arc<Database>, gateway: Arc<dyn MessagingGateway>, config: EngineConfig) -> Self {
        let store = Store::new(db);
        let sessions = Arc::new(SessionStore::new());
        let notifier = Notifier::new(store.clone(), gateway.clone(), config.send_pacing);
        let acceptance = Arc::new(Acceptance::new(
            store.clone(),
            gateway.clone(),
            sessions.clone(),
            config.commit_policy,
            config.admin.clone(),
        ));
        let support = Arc::new(SupportDesk::new(store.clone(), gateway.clone(), config.admin));

        Self {
            store,
            gateway,
            notifier,
            sessions,
            acceptance,
            support,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Deliver an administrator reply to a chat user and record it.
    pub async fn reply_to_user(&self, user: UserHandle, text: &str) -> Result<i64, EngineError> {
        self.support.reply(user, text).await
    }

    /// Store a new request, then rank and notify compatible donors before
    /// returning.
    pub async fn submit_request(&self, new: NewRequest) -> Result<Submission, EngineError> {
        let request_id = self.store.call(move |db| db.save_request(&new)).await?;
        let request = self
            .store
            .call(move |db| db.get_request_by_id(request_id))
            .await?
            .ok_or(EngineError::NotFound("request"))?;

        info!(
            "Request {} created: {} needed at {}/{} ({})",
            request.id, request.blood_group, request.division, request.district, request.urgency
        );

        let notified = self.notify_matching_donors(&request).await?;
        Ok(Submission {
            request_id,
            notified,
        })
    }

    /// Rank compatible donors and offer them the request. No candidates is
    /// not an error; nothing is sent or recorded.
    pub async fn notify_matching_donors(
        &self,
        request: &BloodRequest,
    ) -> Result<Vec<DonorId>, EngineError> {
        let candidates = ranker::rank_for_request(&self.store, request).await?;
        if candidates.is_empty() {
            info!("No donors to notify for request {}", request.id);
            return Ok(vec![]);
        }
        self.notifier.notify(request, &candidates).await
    }

    /// Register a donor on first contact and offer them recent requests they
    /// could serve.
    pub async fn register_donor(&self, new: NewDonor) -> Result<Registration, EngineError> {
        let user = new.user;
        if let Some(existing) = self
            .store
            .call(move |db| db.get_donor_by_user_handle(user))
            .await?
        {
            return Ok(Registration::AlreadyRegistered(existing.id));
        }

        let donor_id = self.store.call(move |db| db.save_donor(&new)).await?;
        let donor = self
            .store
            .call(move |db| db.get_donor_by_id(donor_id))
            .await?
            .ok_or(EngineError::NotFound("donor"))?;
        info!(
            "Donor {} registered: {} in {}/{}",
            donor.id, donor.blood_type, donor.division, donor.district
        );

        let offered = match self.offer_recent_requests(&donor).await {
            Ok(offered) => offered,
            Err(e) => {
                warn!("Could not offer recent requests to donor {}: {}", donor.id, e);
                vec![]
            }
        };

        Ok(Registration::Registered { donor_id, offered })
    }

    /// Offer up to three nearby active requests the donor is compatible with.
    /// Offered requests count the donor as notified.
    pub async fn offer_recent_requests(&self, donor: &Donor) -> Result<Vec<RequestId>, EngineError> {
        let matches = ranker::requests_for_donor(&self.store, donor, RECENT_REQUEST_LIMIT).await?;

        if matches.is_empty() {
            if let Err(e) = self
                .gateway
                .send_message(donor.user, messages::NO_RECENT_REQUESTS, &[])
                .await
            {
                debug!("Donor {} not reachable: {}", donor.id, e);
            }
            return Ok(vec![]);
        }

        if let Err(e) = self
            .gateway
            .send_message(donor.user, messages::RECENT_REQUESTS_HEADER, &[])
            .await
        {
            warn!("Failed to reach donor {}: {}", donor.id, e);
        }

        let mut offered = Vec::with_capacity(matches.len());
        for (request, tier) in matches {
            let text = messages::recent_request(&request, tier);
            let actions = messages::offer_actions(request.id, donor.id);
            match self.gateway.send_message(donor.user, &text, &actions).await {
                Ok(_) => {
                    let (request_id, donor_id) = (request.id, donor.id);
                    self.store
                        .call(move |db| db.merge_notified_donors(request_id, &[donor_id]))
                        .await?;
                    offered.push(request.id);
                }
                Err(e) => warn!(
                    "Failed to offer request {} to donor {}: {}",
                    request.id, donor.id, e
                ),
            }
        }
        Ok(offered)
    }

    /// Route one inbound chat event. Failures are reported to the acting
    /// user in plain language and returned for logging.
    pub async fn handle_event(&self, event: UserEvent) -> Result<Outcome, EngineError> {
        let user = event.user();

        let result = match event {
            UserEvent::ButtonPressed {
                action_id,
                user,
                message,
            } => match action_id.parse::<Action>() {
                Ok(action) => self.route_action(user, action, message).await,
                Err(e) => Err(EngineError::MalformedInput(e.to_string())),
            },
            // A support draft and an acceptance are never open together.
            UserEvent::TextReceived { text, user } if self.support.has_draft(user) => {
                self.support.on_text(user, &text).await
            }
            UserEvent::TextReceived { text, user } => self.acceptance.on_text(user, &text).await,
        };

        if let Err(e) = &result {
            match e {
                EngineError::PersistenceFailure(_) => error!("Event from user {} failed: {}", user, e),
                _ => warn!("Event from user {} failed: {}", user, e),
            }
            if let Err(send_err) = self.gateway.send_message(user, e.user_message(), &[]).await {
                warn!("Could not report failure to user {}: {}", user, send_err);
            }
        }
        result
    }

    /// Opening the support box ends an acceptance in progress, and accepting
    /// a request drops an unsent support draft.
    async fn route_action(
        &self,
        user: UserHandle,
        action: Action,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        if action.is_support() {
            if action == Action::OpenSupport && self.sessions.take(user).is_some() {
                info!("User {} left their acceptance for the support box", user);
            }
            return self.support.on_action(user, action, message).await;
        }
        if matches!(action, Action::Accept { .. }) {
            self.support.forget(user);
        }
        self.acceptance.on_action(user, action, message).await
    }

    /// Consume gateway events one at a time until the channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<UserEvent>) {
        info!("Engine event loop started");
        while let Some(event) = events.recv().await {
            if let Ok(outcome) = self.handle_event(event).await {
                debug!("Event handled: {:?}", outcome);
            }
        }
        info!("Event channel closed, engine loop exiting");
    }
}
