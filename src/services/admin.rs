//! Destructive maintenance over every kind the game stores.

use std::sync::Arc;

use serde::Serialize;

use super::{
    locations::PlayerLocation,
    messages::{DirectMessage, PlayerMessage},
    targets::TargetLocation,
    test_results::TestResult,
    ServiceResult,
};
use crate::store::{Datastore, Entity, MAX_BATCH};

/// Every kind written by the services.
pub const KINDS: [&str; 5] = [
    PlayerLocation::KIND,
    PlayerMessage::KIND,
    DirectMessage::KIND,
    TargetLocation::KIND,
    TestResult::KIND,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WipeReport {
    pub deleted: usize,
    pub kinds: usize,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Datastore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Delete every entity of every kind. Irreversible.
    pub fn wipe_all(&self) -> ServiceResult<WipeReport> {
        let mut deleted = 0;
        for kind in KINDS {
            let keys = self.store.keys(kind)?;
            if keys.is_empty() {
                continue;
            }
            for batch in keys.chunks(MAX_BATCH) {
                self.store.delete_multi(kind, batch)?;
            }
            tracing::info!(kind, count = keys.len(), "deleted entities");
            deleted += keys.len();
        }
        Ok(WipeReport { deleted, kinds: KINDS.len() })
    }
}
