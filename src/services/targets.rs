//! Target locations assigned to players by the leads.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use hmac::{digest::InvalidLength, Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use tokio::fs;

use super::{now, ServiceError, ServiceResult};
use crate::store::{Datastore, Entity, EntityExt, Key, Query};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Display code shown to the player. Cosmetic only.
    pub fake_hash: String,
    pub is_released: bool,
}

impl Entity for TargetLocation {
    const KIND: &'static str = "TargetLocation";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One entry of the initial targets seed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTarget {
    pub player_name: String,
    pub target: Coordinates,
}

/// Derives the 8-character target code from coordinates and assignment time.
#[derive(Clone)]
pub struct TargetHasher {
    mac: HmacSha256,
}

impl TargetHasher {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self { mac: HmacSha256::new_from_slice(secret)? })
    }

    /// First 8 hex digits, uppercased, of HMAC-SHA256("{lat:.6},{lng:.6},{unix_nanos}").
    pub fn code(&self, lat: f64, lng: f64, at: OffsetDateTime) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{lat:.6},{lng:.6},{}", at.unix_timestamp_nanos()).as_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode_upper(&digest[..4])
    }
}

#[derive(Clone)]
pub struct TargetService {
    store: Arc<dyn Datastore>,
    hasher: TargetHasher,
}

impl TargetService {
    pub fn new(store: Arc<dyn Datastore>, hasher: TargetHasher) -> Self {
        Self { store, hasher }
    }

    fn assign(&self, lat: f64, lng: f64) -> TargetLocation {
        let at = now();
        TargetLocation {
            lat,
            lng,
            timestamp: at,
            fake_hash: self.hasher.code(lat, lng, at),
            is_released: true,
        }
    }

    /// Replace the player's target with a freshly coded one.
    pub fn set(&self, player_id: &str, lat: f64, lng: f64) -> ServiceResult<TargetLocation> {
        let target = self.assign(lat, lng);
        self.store.put_entity(Key::name(player_id), &target)?;
        Ok(target)
    }

    /// `None` when the player has no target yet.
    pub fn get(&self, player_id: &str) -> ServiceResult<Option<TargetLocation>> {
        Ok(self.store.get_entity::<TargetLocation>(&Key::name(player_id))?)
    }

    pub fn list(&self) -> ServiceResult<BTreeMap<String, TargetLocation>> {
        let rows = self.store.query_keyed::<TargetLocation>(&Query::of::<TargetLocation>())?;
        Ok(rows.into_iter().map(|(key, target)| (key.to_string(), target)).collect())
    }

    /// Write all targets in one batch; either every entry lands or none does.
    pub fn bulk_load(&self, entries: &[SeedTarget]) -> ServiceResult<usize> {
        let batch: Vec<(Key, TargetLocation)> = entries
            .iter()
            .map(|e| (Key::name(e.player_name.as_str()), self.assign(e.target.lat, e.target.lng)))
            .collect();
        let count = batch.len();
        self.store.put_entities(batch)?;
        Ok(count)
    }

    /// Parse the seed file: a JSON array of `{ playerName, target: { lat, lng } }`.
    pub async fn load_seed_file(path: &Path) -> ServiceResult<Vec<SeedTarget>> {
        let seed_error = |reason: String| ServiceError::Seed { path: path.to_path_buf(), reason };
        let bytes = fs::read(path).await.map_err(|err| seed_error(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| seed_error(err.to_string()))
    }
}
