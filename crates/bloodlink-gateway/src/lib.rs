pub mod connection;
pub mod dispatcher;

use async_trait::async_trait;
use thiserror::Error;

use bloodlink_types::events::{ActionButton, MessageRef};
use bloodlink_types::models::UserHandle;

pub use dispatcher::Dispatcher;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("mailbox for user {0} is full")]
    MailboxFull(UserHandle),

    #[error("event channel closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound side of the chat platform. Delivery is best effort: an `Ok`
/// means the message was handed to the user's connection or mailbox.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(
        &self,
        user: UserHandle,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<MessageRef, GatewayError>;

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), GatewayError>;

    /// The user's public chat handle, when they have one.
    async fn resolve_public_handle(&self, user: UserHandle) -> Result<Option<String>, GatewayError>;
}
