//! Player positions and device status.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{is_zero, now, ServiceResult};
use crate::store::{Datastore, Entity, EntityExt, Key, Query};

/// Status reported with a usable GPS fix.
pub const STATUS_OK: &str = "OK";

/// Where a player with no known fix is placed on the map.
pub const DEFAULT_POSITION: (f64, f64) = (51.03528074190589, 3.9737665526527852);

/// Last report received from a player. Zero coordinates are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLocation {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub lat: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub lng: f64,
    /// Server receipt time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<OffsetDateTime>,
    /// "OK", "UNAVAILABLE", "PERMISSION DENIED", "NOT SUPPORTED", ...
    pub status: String,
}

impl Entity for PlayerLocation {
    const KIND: &'static str = "PlayerLocation";
}

/// Body of a location report. Coordinates are only read when `status` is "OK".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub client_timestamp: Option<OffsetDateTime>,
    pub status: String,
}

#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn Datastore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Upsert the player's location.
    ///
    /// A status-only report keeps the last known fix; a player without one is
    /// placed at [`DEFAULT_POSITION`].
    pub fn report(&self, player_id: &str, report: LocationReport) -> ServiceResult<PlayerLocation> {
        let key = Key::name(player_id);
        let (lat, lng) = if report.status == STATUS_OK {
            match (report.lat, report.lng) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => (0.0, 0.0),
            }
        } else {
            self.last_known_fix(player_id, &key).unwrap_or(DEFAULT_POSITION)
        };

        let location = PlayerLocation {
            lat,
            lng,
            timestamp: now(),
            client_timestamp: report.client_timestamp,
            status: report.status,
        };
        self.store.put_entity(key, &location)?;
        Ok(location)
    }

    /// A stored latitude of exactly 0.0 counts as "no fix".
    fn last_known_fix(&self, player_id: &str, key: &Key) -> Option<(f64, f64)> {
        match self.store.get_entity::<PlayerLocation>(key) {
            Ok(Some(prev)) if prev.lat != 0.0 => Some((prev.lat, prev.lng)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%player_id, error = %err, "reading previous location failed");
                None
            }
        }
    }

    pub fn get(&self, player_id: &str) -> ServiceResult<Option<PlayerLocation>> {
        Ok(self.store.get_entity::<PlayerLocation>(&Key::name(player_id))?)
    }

    /// Every player's latest location keyed by player id.
    pub fn list(&self) -> ServiceResult<BTreeMap<String, PlayerLocation>> {
        let rows = self.store.query_keyed::<PlayerLocation>(&Query::of::<PlayerLocation>())?;
        Ok(rows.into_iter().map(|(key, loc)| (key.to_string(), loc)).collect())
    }
}
