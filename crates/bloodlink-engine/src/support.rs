//! Feedback and support questions from chat users to the administrator.
//! A user composes a message, previews it, then sends or discards it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use bloodlink_gateway::MessagingGateway;
use bloodlink_types::events::{Action, ActionButton, MessageRef};
use bloodlink_types::models::{UserHandle, is_provided};

use crate::acceptance::Outcome;
use crate::admin::AdminPolicy;
use crate::error::EngineError;
use crate::messages;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Draft {
    Composing,
    Confirming { text: String },
}

pub struct SupportDesk {
    store: Store,
    gateway: Arc<dyn MessagingGateway>,
    admin: AdminPolicy,
    drafts: Mutex<HashMap<UserHandle, Draft>>,
}

impl SupportDesk {
    pub fn new(store: Store, gateway: Arc<dyn MessagingGateway>, admin: AdminPolicy) -> Self {
        Self {
            store,
            gateway,
            admin,
            drafts: Mutex::new(HashMap::new()),
        }
    }

    /// True while the user is writing a support message; their text goes here.
    pub fn has_draft(&self, user: UserHandle) -> bool {
        self.lock().contains_key(&user)
    }

    /// Drop the user's draft without telling them.
    pub fn forget(&self, user: UserHandle) {
        if self.lock().remove(&user).is_some() {
            debug!("Dropped support draft of user {}", user);
        }
    }

    pub async fn on_action(
        &self,
        user: UserHandle,
        action: Action,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        let message = message.filter(|m| m.user == user);

        match action {
            Action::OpenSupport => self.open(user).await,
            Action::SendSupport => self.send(user, message).await,
            Action::DiscardSupport => self.discard(user, message).await,
            other => Err(EngineError::MalformedInput(format!(
                "{} is not a support action",
                other
            ))),
        }
    }

    pub async fn on_text(&self, user: UserHandle, text: &str) -> Result<Outcome, EngineError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("/cancel") {
            return self.discard(user, None).await;
        }
        if !self.has_draft(user) {
            return Ok(Outcome::Ignored);
        }

        if !is_provided(text) {
            self.present(user, None, messages::SUPPORT_PROMPT_AGAIN, &[]).await?;
            return Ok(Outcome::SupportPrompted);
        }

        // A second message before confirming replaces the first.
        self.lock().insert(
            user,
            Draft::Confirming {
                text: text.to_string(),
            },
        );
        self.present(user, None, &messages::support_preview(text), &messages::support_actions())
            .await?;
        Ok(Outcome::SupportPreviewed)
    }

    /// Send a reply from the administrator and keep a record of it.
    pub async fn reply(&self, user: UserHandle, text: &str) -> Result<i64, EngineError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(EngineError::MalformedInput("empty reply".into()));
        }

        self.gateway
            .send_message(user, &messages::admin_reply(&text), &messages::reply_actions())
            .await?;
        let reply_id = self
            .store
            .call(move |db| db.record_admin_reply(user, &text))
            .await?;
        info!("Admin replied to user {} (reply {})", user, reply_id);
        Ok(reply_id)
    }

    async fn open(&self, user: UserHandle) -> Result<Outcome, EngineError> {
        self.lock().insert(user, Draft::Composing);
        let cancel = [ActionButton::new("Cancel", Action::DiscardSupport)];
        self.present(user, None, messages::SUPPORT_PROMPT, &cancel).await?;
        Ok(Outcome::SupportPrompted)
    }

    async fn send(
        &self,
        user: UserHandle,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        let text = {
            let mut drafts = self.lock();
            match drafts.get(&user) {
                Some(Draft::Confirming { text }) => {
                    let text = text.clone();
                    drafts.remove(&user);
                    text
                }
                Some(Draft::Composing) | None => {
                    return Err(EngineError::MalformedInput("no support message to send".into()));
                }
            }
        };

        let user_name = self.display_name(user).await;
        let (name, body) = (user_name.clone(), text.clone());
        let id = self
            .store
            .call(move |db| db.store_support_message(user, &name, &body))
            .await?;
        info!("Support message {} stored from user {}", id, user);

        if let Some(admin) = self.admin.handle() {
            let notice = messages::support_notice(id, user, &user_name, &text);
            if let Err(e) = self.gateway.send_message(admin, &notice, &[]).await {
                warn!("Failed to notify admin {} of support message {}: {}", admin, id, e);
            }
        }

        self.present_best_effort(user, message, messages::SUPPORT_SENT).await;
        Ok(Outcome::SupportSent { message_id: id })
    }

    async fn discard(
        &self,
        user: UserHandle,
        message: Option<MessageRef>,
    ) -> Result<Outcome, EngineError> {
        if self.lock().remove(&user).is_none() {
            return Ok(Outcome::Ignored);
        }
        self.present_best_effort(user, message, messages::SUPPORT_DISCARDED).await;
        Ok(Outcome::Cancelled)
    }

    /// Registered donor name, else the public chat handle, else empty.
    async fn display_name(&self, user: UserHandle) -> String {
        match self.store.call(move |db| db.get_donor_by_user_handle(user)).await {
            Ok(Some(donor)) if is_provided(&donor.name) => return donor.name,
            Ok(_) => {}
            Err(e) => warn!("Could not look up donor for user {}: {}", user, e),
        }
        match self.gateway.resolve_public_handle(user).await {
            Ok(Some(handle)) => format!("@{}", handle),
            Ok(None) => String::new(),
            Err(e) => {
                debug!("No public handle for user {}: {}", user, e);
                String::new()
            }
        }
    }

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

    fn lock(&self) -> MutexGuard<'_, HashMap<UserHandle, Draft>> {
        self.drafts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
