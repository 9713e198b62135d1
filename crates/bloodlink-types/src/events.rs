use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DonorId, RequestId, UserHandle};

/// Button actions the engine understands. The wire form is what a chat
/// client echoes back when the button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Accept { request_id: RequestId, donor_id: DonorId },
    Decline { request_id: RequestId, donor_id: DonorId },
    AgreeTerms,
    DeclineTerms,
    Cancel,
    /// Start writing feedback or a support question to the administrator.
    OpenSupport,
    SendSupport,
    DiscardSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed action: {0:?}")]
pub struct ActionParseError(pub String);

impl Action {
    pub fn to_wire(&self) -> String {
        match self {
            Self::Accept { request_id, donor_id } => format!("accept:{}:{}", request_id, donor_id),
            Self::Decline { request_id, donor_id } => format!("decline:{}:{}", request_id, donor_id),
            Self::AgreeTerms => "terms:agree".to_string(),
            Self::DeclineTerms => "terms:decline".to_string(),
            Self::Cancel => "cancel".to_string(),
            Self::OpenSupport => "support:open".to_string(),
            Self::SendSupport => "support:send".to_string(),
            Self::DiscardSupport => "support:discard".to_string(),
        }
    }

    pub fn is_support(&self) -> bool {
        matches!(self, Self::OpenSupport | Self::SendSupport | Self::DiscardSupport)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ActionParseError(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();

        match parts.as_slice() {
            ["accept", req, donor] => Ok(Self::Accept {
                request_id: req.parse().map_err(|_| err())?,
                donor_id: donor.parse().map_err(|_| err())?,
            }),
            ["decline", req, donor] => Ok(Self::Decline {
                request_id: req.parse().map_err(|_| err())?,
                donor_id: donor.parse().map_err(|_| err())?,
            }),
            ["terms", "agree"] => Ok(Self::AgreeTerms),
            ["terms", "decline"] => Ok(Self::DeclineTerms),
            ["cancel"] => Ok(Self::Cancel),
            ["support", "open"] => Ok(Self::OpenSupport),
            ["support", "send"] => Ok(Self::SendSupport),
            ["support", "discard"] => Ok(Self::DiscardSupport),
            _ => Err(err()),
        }
    }
}

/// A button attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub action_id: String,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action_id: action.to_wire(),
        }
    }
}

/// Identifies a message previously delivered to a user, so it can be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub user: UserHandle,
    pub message_id: Uuid,
}

/// Inbound events delivered by the messaging gateway to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    ButtonPressed {
        action_id: String,
        user: UserHandle,
        message: Option<MessageRef>,
    },
    TextReceived {
        text: String,
        user: UserHandle,
    },
}

impl UserEvent {
    pub fn user(&self) -> UserHandle {
        match self {
            Self::ButtonPressed { user, .. } | Self::TextReceived { user, .. } => *user,
        }
    }
}

/// Frames sent FROM server TO chat clients over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the connection is bound to a user handle
    Ready { user_handle: UserHandle },

    /// A new message, optionally with buttons
    Message {
        message_id: Uuid,
        text: String,
        actions: Vec<ActionButton>,
    },

    /// Replace text and buttons of an earlier message
    MessageEdit {
        message_id: Uuid,
        text: String,
        actions: Vec<ActionButton>,
    },
}

/// Frames sent FROM chat clients TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Bind the connection to a chat user
    Identify {
        user_handle: UserHandle,
        #[serde(default)]
        public_handle: Option<String>,
    },

    /// A button was pressed on a message
    Press {
        action_id: String,
        #[serde(default)]
        message_id: Option<Uuid>,
    },

    /// Free text typed by the user
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_form_parses_back() {
        let actions = [
            Action::Accept { request_id: RequestId(12), donor_id: DonorId(7) },
            Action::Decline { request_id: RequestId(1), donor_id: DonorId(99) },
            Action::AgreeTerms,
            Action::DeclineTerms,
            Action::Cancel,
            Action::OpenSupport,
            Action::SendSupport,
            Action::DiscardSupport,
        ];
        for action in actions {
            assert_eq!(action.to_wire().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn rejects_malformed_actions() {
        assert!("accept:12".parse::<Action>().is_err());
        assert!("accept:x:7".parse::<Action>().is_err());
        assert!("accept_12_7".parse::<Action>().is_err());
        assert!("terms:maybe".parse::<Action>().is_err());
        assert!("support".parse::<Action>().is_err());
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn command_frames_are_tagged() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"Press","data":{"action_id":"terms:agree"}}"#,
        )
        .unwrap();
        match cmd {
            GatewayCommand::Press { action_id, message_id } => {
                assert_eq!(action_id, "terms:agree");
                assert!(message_id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
