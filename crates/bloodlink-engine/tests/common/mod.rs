// Shared fixtures for engine integration tests. Not every test binary uses
// every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use bloodlink_db::Database;
use bloodlink_engine::{AdminPolicy, CommitPolicy, Engine, EngineConfig};
use bloodlink_gateway::{GatewayError, MessagingGateway};
use bloodlink_types::BloodType;
use bloodlink_types::events::{Action, ActionButton, MessageRef, UserEvent};
use bloodlink_types::models::{DonorId, DonorUpdate, NewDonor, NewRequest, Urgency, UserHandle};

pub const ADMIN: UserHandle = UserHandle(1);
pub const REQUESTER: UserHandle = UserHandle(500);

#[derive(Debug, Clone)]
pub struct Sent {
    pub message: MessageRef,
    pub text: String,
    pub actions: Vec<ActionButton>,
}

#[derive(Debug, Clone)]
pub struct Edit {
    pub message: MessageRef,
    pub text: String,
    pub actions: Vec<ActionButton>,
}

/// Records every outgoing message. Users marked unreachable get a
/// delivery error instead.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    edits: Mutex<Vec<Edit>>,
    unreachable: Mutex<HashSet<UserHandle>>,
    handles: Mutex<HashMap<UserHandle, String>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, user: UserHandle) {
        self.unreachable.lock().unwrap().insert(user);
    }

    pub fn set_handle(&self, user: UserHandle, handle: &str) {
        self.handles.lock().unwrap().insert(user, handle.to_string());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user: UserHandle) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| s.message.user == user).collect()
    }

    pub fn texts_to(&self, user: UserHandle) -> Vec<String> {
        self.sent_to(user).into_iter().map(|s| s.text).collect()
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.edits.lock().unwrap().clone()
    }

    /// The most recent offer (a message with Accept/Decline buttons) sent to the user.
    pub fn last_offer_to(&self, user: UserHandle) -> Option<Sent> {
        self.sent_to(user)
            .into_iter()
            .filter(|s| s.actions.iter().any(|a| a.action_id.starts_with("accept:")))
            .last()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_message(
        &self,
        user: UserHandle,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<MessageRef, GatewayError> {
        if self.unreachable.lock().unwrap().contains(&user) {
            return Err(GatewayError::Delivery(format!("user {} unreachable", user)));
        }
        let message = MessageRef {
            user,
            message_id: Uuid::new_v4(),
        };
        self.sent.lock().unwrap().push(Sent {
            message,
            text: text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), GatewayError> {
        if self.unreachable.lock().unwrap().contains(&message.user) {
            return Err(GatewayError::Delivery(format!("user {} unreachable", message.user)));
        }
        self.edits.lock().unwrap().push(Edit {
            message,
            text: text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }

    async fn resolve_public_handle(&self, user: UserHandle) -> Result<Option<String>, GatewayError> {
        Ok(self.handles.lock().unwrap().get(&user).cloned())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub db: Arc<Database>,
    pub gateway: Arc<RecordingGateway>,
}

pub fn harness() -> Harness {
    harness_with(CommitPolicy::AllowMultiple)
}

pub fn harness_with(commit_policy: CommitPolicy) -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let gateway = RecordingGateway::new();
    let config = EngineConfig {
        send_pacing: Duration::ZERO,
        commit_policy,
        admin: AdminPolicy::new(Some(ADMIN), "test-admin-token"),
    };
    let engine = Engine::new(db.clone(), gateway.clone(), config);
    Harness {
        engine,
        db,
        gateway,
    }
}

pub fn add_donor(db: &Database, user: i64, blood: BloodType, division: &str, district: &str) -> DonorId {
    db.save_donor(&NewDonor {
        user: UserHandle(user),
        blood_type: blood,
        division: division.to_string(),
        district: district.to_string(),
        area: None,
        name: None,
        phone: None,
        age: None,
        gender: None,
    })
    .unwrap()
}

pub fn add_complete_donor(
    db: &Database,
    user: i64,
    blood: BloodType,
    division: &str,
    district: &str,
    name: &str,
) -> DonorId {
    let id = add_donor(db, user, blood, division, district);
    db.update_donor(id, &DonorUpdate::contact(name, format!("0171{:07}", user)))
        .unwrap();
    id
}

pub fn new_request(blood: &str, division: &str, district: &str) -> NewRequest {
    NewRequest {
        requester: REQUESTER,
        patient_name: "Fatema Begum".into(),
        patient_age: "52".into(),
        hospital_name: "Dhaka Medical College Hospital".into(),
        hospital_address: "Bakshibazar, Dhaka".into(),
        area: "Lalbagh".into(),
        district: district.into(),
        division: division.into(),
        urgency: Urgency::Urgent,
        phone: "01900000001".into(),
        blood_group: blood.into(),
    }
}

pub fn press(user: UserHandle, action: Action) -> UserEvent {
    UserEvent::ButtonPressed {
        action_id: action.to_wire(),
        user,
        message: None,
    }
}

pub fn press_on(user: UserHandle, action: Action, message: MessageRef) -> UserEvent {
    UserEvent::ButtonPressed {
        action_id: action.to_wire(),
        user,
        message: Some(message),
    }
}

pub fn text(user: UserHandle, text: &str) -> UserEvent {
    UserEvent::TextReceived {
        text: text.to_string(),
        user,
    }
}
