//! Credentials held by the client. Shared between clones of one `ApiClient`.

use crate::models::User;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, Default)]
pub struct SessionSlot(Arc<RwLock<Option<Session>>>);

impl SessionSlot {
    pub fn get(&self) -> Option<Session> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn token(&self) -> Option<String> {
        self.get().map(|s| s.token)
    }

    pub fn set(&self, session: Session) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
