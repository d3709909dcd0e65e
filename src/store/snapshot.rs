use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    ledger::SettlementArchive,
    models::{ServiceRecord, User, WorkshopProfile},
    timer::SessionBook,
};

/// Whole state of one workshop, as pushed to and pulled from the document store.
///
/// Every collection sits behind its own `Arc`. A mutation swaps in a new `Arc`
/// for the collection it touched and shares the rest with the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkshopSnapshot {
    pub workshop: Arc<WorkshopProfile>,
    pub users: Arc<Vec<User>>,
    pub sessions: Arc<SessionBook>,
    pub services: Arc<Vec<ServiceRecord>>,
    pub settlements: Arc<SettlementArchive>,
}

impl WorkshopSnapshot {
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn with_workshop(&self, workshop: WorkshopProfile) -> Self {
        Self {
            workshop: Arc::new(workshop),
            ..self.clone()
        }
    }

    pub fn with_users(&self, users: Vec<User>) -> Self {
        Self {
            users: Arc::new(users),
            ..self.clone()
        }
    }

    pub fn with_sessions(&self, sessions: SessionBook) -> Self {
        Self {
            sessions: Arc::new(sessions),
            ..self.clone()
        }
    }

    pub fn with_services(&self, services: Vec<ServiceRecord>) -> Self {
        Self {
            services: Arc::new(services),
            ..self.clone()
        }
    }

    pub fn with_settlements(&self, settlements: SettlementArchive) -> Self {
        Self {
            settlements: Arc::new(settlements),
            ..self.clone()
        }
    }
}
