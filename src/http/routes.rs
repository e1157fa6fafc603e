//! JSON API handlers.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{
    error::ApiError,
    extract::{JsonBody, PlayerId},
};
use crate::{
    config::AppConfig,
    identity::{self, IdCodec},
    services::{
        admin::AdminService,
        locations::{LocationReport, LocationService, PlayerLocation},
        messages::{ChatMessage, DirectMessage, MessageService, PlayerMessage},
        targets::{TargetHasher, TargetLocation, TargetService},
        test_results::{TestResult, TestResultService, TestSubmission},
    },
    store::Datastore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<IdCodec>,
    pub locations: LocationService,
    pub messages: MessageService,
    pub targets: TargetService,
    pub test_results: TestResultService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Datastore>) -> anyhow::Result<Self> {
        let codec = IdCodec::new(config.id_key.as_bytes())?;
        let hasher = TargetHasher::new(config.target_secret.as_bytes())
            .map_err(|err| anyhow::anyhow!("target secret: {err}"))?;
        Ok(Self {
            codec: Arc::new(codec),
            locations: LocationService::new(store.clone()),
            messages: MessageService::new(store.clone()),
            targets: TargetService::new(store.clone(), hasher),
            test_results: TestResultService::new(store.clone()),
            admin: AdminService::new(store),
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    status: &'static str,
}

const OK: StatusBody = StatusBody { status: "ok" };

pub async fn health() -> &'static str {
    "ok"
}

// ========== Locations ==========

pub async fn report_location(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
    JsonBody(report): JsonBody<LocationReport>,
) -> Result<Json<StatusBody>, ApiError> {
    state
        .locations
        .report(&player_id, report)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "saving location failed"))?;
    Ok(Json(OK))
}

pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, PlayerLocation>>, ApiError> {
    let locations = state
        .locations
        .list()
        .inspect_err(|err| tracing::error!(error = %err, "listing locations failed"))?;
    Ok(Json(locations))
}

// ========== Messages ==========

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageCreated {
    status: &'static str,
    id: i64,
}

pub async fn send_player_message(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
    JsonBody(req): JsonBody<MessageRequest>,
) -> Result<(StatusCode, Json<MessageCreated>), ApiError> {
    let id = state
        .messages
        .send_player_message(&player_id, &req.message)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "saving message failed"))?;
    Ok((StatusCode::CREATED, Json(MessageCreated { status: "ok", id })))
}

/// Everything the player page polls for: last own message, last DM, target.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInbox {
    #[serde(skip_serializing_if = "Option::is_none")]
    player_message: Option<PlayerMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dm: Option<DirectMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<TargetLocation>,
}

pub async fn player_inbox(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
) -> Result<Json<PlayerInbox>, ApiError> {
    let player_message = state
        .messages
        .latest_player_message(&player_id)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "reading last message failed"))?;
    let dm = state
        .messages
        .latest_direct_message(&player_id)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "reading last direct message failed"))?;
    // A failed target read degrades to "no target" rather than failing the poll.
    let target = state.targets.get(&player_id).unwrap_or_else(|err| {
        tracing::warn!(%player_id, error = %err, "reading target failed");
        None
    });
    Ok(Json(PlayerInbox { player_message, dm, target }))
}

pub async fn list_player_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlayerMessage>>, ApiError> {
    let messages = state
        .messages
        .all_player_messages()
        .inspect_err(|err| tracing::error!(error = %err, "listing messages failed"))?;
    Ok(Json(messages))
}

pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let message_id: i64 = message_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid message ID".into()))?;
    state
        .messages
        .mark_read(message_id)
        .inspect_err(|err| tracing::error!(message_id, error = %err, "marking message read failed"))?;
    Ok(StatusCode::OK)
}

pub async fn send_direct_message(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
    JsonBody(req): JsonBody<MessageRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .messages
        .send_direct_message(&player_id, &req.message)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "saving direct message failed"))?;
    Ok(StatusCode::CREATED)
}

pub async fn chat_history(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let chat = state
        .messages
        .chat_history(&player_id)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "reading chat history failed"))?;
    Ok(Json(chat))
}

// ========== Targets ==========

#[derive(Debug, Deserialize)]
pub struct SetTargetRequest {
    lat: f64,
    lng: f64,
}

pub async fn set_target(
    State(state): State<AppState>,
    PlayerId(player_id): PlayerId,
    JsonBody(req): JsonBody<SetTargetRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .targets
        .set(&player_id, req.lat, req.lng)
        .inspect_err(|err| tracing::error!(%player_id, error = %err, "saving target failed"))?;
    Ok(StatusCode::CREATED)
}

pub async fn list_targets(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, TargetLocation>>, ApiError> {
    let targets = state
        .targets
        .list()
        .inspect_err(|err| tracing::error!(error = %err, "listing targets failed"))?;
    Ok(Json(targets))
}

// ========== Player links ==========

#[derive(Debug, Deserialize)]
pub struct ObfuscateRequest {
    #[serde(rename = "playerID")]
    player_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObfuscatedUrl {
    #[serde(rename = "playerID")]
    pub player_id: String,
    #[serde(rename = "obfuscatedID")]
    pub obfuscated_id: String,
    #[serde(rename = "obfuscatedURL")]
    pub obfuscated_url: String,
}

pub async fn obfuscate_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<ObfuscateRequest>,
) -> Result<Json<ObfuscatedUrl>, ApiError> {
    if req.player_id.is_empty() {
        return Err(ApiError::BadRequest("playerID is required".into()));
    }
    let obfuscated_id = state.codec.obfuscate(&req.player_id);
    let base = match &state.config.public_base_url {
        Some(base) => base.clone(),
        None => base_url_from_host(headers.get(header::HOST).and_then(|v| v.to_str().ok())),
    };
    Ok(Json(ObfuscatedUrl {
        obfuscated_url: identity::player_url(&base, &obfuscated_id),
        player_id: req.player_id,
        obfuscated_id,
    }))
}

/// Local hosts are served over plain http, everything else over https.
fn base_url_from_host(host: Option<&str>) -> String {
    let host = host.unwrap_or_default();
    if host.is_empty() || host.starts_with("localhost") {
        format!("http://{host}")
    } else {
        format!("https://{host}")
    }
}

// ========== Test results ==========

pub async fn submit_test_result(
    State(state): State<AppState>,
    JsonBody(submission): JsonBody<TestSubmission>,
) -> Result<(StatusCode, Json<StatusBody>), ApiError> {
    let player_name = submission.player_name.clone();
    state
        .test_results
        .submit(submission)
        .inspect_err(|err| tracing::error!(%player_name, error = %err, "saving test result failed"))?;
    Ok((StatusCode::CREATED, Json(OK)))
}

pub async fn list_test_results(
    State(state): State<AppState>,
) -> Result<Json<Vec<TestResult>>, ApiError> {
    let results = state
        .test_results
        .list()
        .inspect_err(|err| tracing::error!(error = %err, "listing test results failed"))?;
    Ok(Json(results))
}

// ========== Admin ==========

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadedTargets {
    pub message: String,
}

pub async fn load_initial_targets(
    State(state): State<AppState>,
) -> Result<Json<LoadedTargets>, ApiError> {
    let path = &state.config.initial_targets_path;
    let entries = TargetService::load_seed_file(path)
        .await
        .inspect_err(|err| tracing::error!(error = %err, "reading initial targets failed"))?;
    let count = state
        .targets
        .bulk_load(&entries)
        .inspect_err(|err| tracing::error!(error = %err, "saving initial targets failed"))?;
    tracing::info!(count, path = %path.display(), "initial targets loaded");
    Ok(Json(LoadedTargets {
        message: format!("Successfully loaded and set {count} initial targets."),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClearParams {
    confirm: Option<String>,
}

pub async fn clear_datastore(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<String, ApiError> {
    if params.confirm.as_deref() != Some("true") {
        return Err(ApiError::Forbidden(
            "This is a destructive operation. Add `?confirm=true` to the URL to proceed.".into(),
        ));
    }
    let report = state
        .admin
        .wipe_all()
        .inspect_err(|err| tracing::error!(error = %err, "clearing datastore failed"))?;
    tracing::warn!(deleted = report.deleted, "datastore cleared");
    Ok(format!(
        "Successfully deleted {} entities across {} kinds.",
        report.deleted, report.kinds
    ))
}
