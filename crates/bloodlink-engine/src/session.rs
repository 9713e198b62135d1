use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use bloodlink_types::events::MessageRef;
use bloodlink_types::models::{DonorId, RequestId, UserHandle};

/// Where a donor is inside an acceptance they started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    TermsPending,
    AwaitingName,
    AwaitingPhone { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptSession {
    pub request_id: RequestId,
    pub donor_id: DonorId,
    pub stage: Stage,
    /// The offer message, edited as the flow advances.
    pub message: Option<MessageRef>,
}

/// In-progress acceptances, one per chat user. Entered on Accept, left on
/// commit, decline or cancel. Starting a new acceptance replaces the old one.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserHandle, AcceptSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, user: UserHandle, session: AcceptSession) {
        self.lock().insert(user, session);
    }

    pub fn get(&self, user: UserHandle) -> Option<AcceptSession> {
        self.lock().get(&user).cloned()
    }

    /// Returns false when the user has no session to advance.
    pub fn advance(&self, user: UserHandle, stage: Stage) -> bool {
        match self.lock().get_mut(&user) {
            Some(session) => {
                session.stage = stage;
                true
            }
            None => false,
        }
    }

    pub fn take(&self, user: UserHandle) -> Option<AcceptSession> {
        self.lock().remove(&user)
    }

    /// Drop the user's session only if it is for the given pair.
    pub fn clear_pair(&self, user: UserHandle, request_id: RequestId, donor_id: DonorId) {
        let mut sessions = self.lock();
        if sessions
            .get(&user)
            .is_some_and(|s| s.request_id == request_id && s.donor_id == donor_id)
        {
            sessions.remove(&user);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserHandle, AcceptSession>> {
        // A panic mid-update leaves at worst one stale session.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
