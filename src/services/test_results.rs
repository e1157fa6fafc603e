//! Pre-game connectivity self-check results, one per player name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{now, ServiceError, ServiceResult};
use crate::store::{Datastore, Direction, Entity, EntityExt, Key, Query};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub player_name: String,
    pub location_status: String,
    pub notification_status: String,
    pub server_status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Entity for TestResult {
    const KIND: &'static str = "TestResult";
}

/// What the test page posts. Missing statuses are stored as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestSubmission {
    pub player_name: String,
    pub location_status: String,
    pub notification_status: String,
    pub server_status: String,
}

#[derive(Clone)]
pub struct TestResultService {
    store: Arc<dyn Datastore>,
}

impl TestResultService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Store the player's latest result, replacing any earlier run.
    pub fn submit(&self, submission: TestSubmission) -> ServiceResult<TestResult> {
        if submission.player_name.is_empty() {
            return Err(ServiceError::Invalid("PlayerName is required".into()));
        }
        let result = TestResult {
            player_name: submission.player_name,
            location_status: submission.location_status,
            notification_status: submission.notification_status,
            server_status: submission.server_status,
            timestamp: now(),
        };
        self.store.put_entity(Key::name(result.player_name.as_str()), &result)?;
        Ok(result)
    }

    /// All results, most recent first.
    pub fn list(&self) -> ServiceResult<Vec<TestResult>> {
        let query = Query::of::<TestResult>().order_by("timestamp", Direction::Descending);
        Ok(self.store.query_entities(&query)?)
    }
}
