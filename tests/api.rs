use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use waypoint::{
    config::AppConfig,
    http::{router, AppState},
    identity::IdCodec,
    store::MemoryStore,
};

fn config() -> AppConfig {
    AppConfig {
        app_version: "test-version".into(),
        ..AppConfig::default()
    }
}

fn app_with(config: AppConfig) -> Router {
    let state = AppState::new(config, Arc::new(MemoryStore::new())).unwrap();
    router(state)
}

fn app() -> Router {
    app_with(config())
}

fn token(name: &str) -> String {
    IdCodec::new(config().id_key.as_bytes()).unwrap().obfuscate(name)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost:8080");
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn json_of(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn healthz_is_ok() {
    let (status, body) = send(&app(), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn empty_collections_are_empty_objects() {
    let app = app();
    for uri in ["/api/locations", "/api/targets"] {
        let (status, body) = json_of(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }
    let (_, body) = json_of(&app, "GET", "/api/messages", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn location_report_shows_up_under_player_name() {
    let app = app();
    let uri = format!("/api/locations/{}", token("alice"));
    let (status, body) = json_of(
        &app,
        "POST",
        &uri,
        Some(json!({ "lat": 51.05, "lng": 3.72, "status": "OK", "clientTimestamp": "2024-05-01T10:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (_, body) = json_of(&app, "GET", "/api/locations", None).await;
    let alice = &body["alice"];
    assert_eq!(alice["lat"], json!(51.05));
    assert_eq!(alice["lng"], json!(3.72));
    assert_eq!(alice["status"], json!("OK"));
    assert_eq!(alice["clientTimestamp"], json!("2024-05-01T10:00:00Z"));
}

#[tokio::test]
async fn failed_fix_keeps_last_known_position() {
    let app = app();
    let uri = format!("/api/locations/{}", token("bob"));
    send(&app, "POST", &uri, Some(json!({ "lat": 50.0, "lng": 4.0, "status": "OK" }))).await;
    send(&app, "POST", &uri, Some(json!({ "status": "UNAVAILABLE" }))).await;

    let (_, body) = json_of(&app, "GET", "/api/locations", None).await;
    assert_eq!(body["bob"]["lat"], json!(50.0));
    assert_eq!(body["bob"]["lng"], json!(4.0));
    assert_eq!(body["bob"]["status"], json!("UNAVAILABLE"));
}

#[tokio::test]
async fn bad_token_is_rejected() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/locations/%21%21not-base64%21%21",
        Some(json!({ "status": "OK" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Player ID is missing");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app();
    let uri = format!("/api/locations/{}", token("alice"));
    let req = Request::builder()
        .method("POST")
        .uri(&uri)
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (_, body) = json_of(&app, "GET", "/api/locations", None).await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn wrong_method_is_405() {
    let (status, _) = send(&app(), "GET", "/api/obfuscate-url", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&app(), "POST", "/api/targets", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn message_round_trip_and_mark_read() {
    let app = app();
    let uri = format!("/api/messages/{}", token("carol"));
    let (status, created) = json_of(&app, "POST", &uri, Some(json!({ "message": "found it" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], json!("ok"));
    let id = created["id"].as_i64().unwrap();

    let (_, all) = json_of(&app, "GET", "/api/messages", None).await;
    assert_eq!(all[0]["id"], json!(id));
    assert_eq!(all[0]["playerID"], json!("carol"));
    assert_eq!(all[0]["isRead"], json!(false));

    let (status, _) = send(&app, "POST", &format!("/api/messages/read/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, all) = json_of(&app, "GET", "/api/messages", None).await;
    assert_eq!(all[0]["isRead"], json!(true));
}

#[tokio::test]
async fn mark_read_rejects_bad_and_unknown_ids() {
    let app = app();
    let (status, body) = send(&app, "POST", "/api/messages/read/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid message ID");

    let (status, _) = send(&app, "POST", "/api/messages/read/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inbox_holds_latest_message_dm_and_target() {
    let app = app();
    let dave = token("dave");
    let inbox = format!("/api/messages/{dave}");

    let (status, body) = json_of(&app, "GET", &inbox, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    send(&app, "POST", &inbox, Some(json!({ "message": "first" }))).await;
    send(&app, "POST", &inbox, Some(json!({ "message": "second" }))).await;
    let (status, _) = send(&app, "POST", &format!("/api/dm/{dave}"), Some(json!({ "message": "go north" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, "POST", &format!("/api/target/{dave}"), Some(json!({ "lat": 51.1, "lng": 3.9 }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = json_of(&app, "GET", &inbox, None).await;
    assert_eq!(body["playerMessage"]["content"], json!("second"));
    assert_eq!(body["dm"]["content"], json!("go north"));
    assert_eq!(body["target"]["lat"], json!(51.1));
    assert_eq!(body["target"]["isReleased"], json!(true));
    assert_eq!(body["target"]["fakeHash"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn chat_interleaves_both_directions_oldest_first() {
    let app = app();
    let erin = token("erin");
    send(&app, "POST", &format!("/api/messages/{erin}"), Some(json!({ "message": "hello" }))).await;
    send(&app, "POST", &format!("/api/dm/{erin}"), Some(json!({ "message": "hi erin" }))).await;
    send(&app, "POST", &format!("/api/messages/{erin}"), Some(json!({ "message": "where to?" }))).await;
    send(&app, "POST", &format!("/api/messages/{}", token("frank")), Some(json!({ "message": "not mine" }))).await;

    let (status, chat) = json_of(&app, "GET", &format!("/api/chat/{erin}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<(&str, &str)> = chat
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["from"].as_str().unwrap(), m["content"].as_str().unwrap()))
        .collect();
    assert_eq!(
        lines,
        [("player", "hello"), ("lead", "hi erin"), ("player", "where to?")]
    );
}

#[tokio::test]
async fn set_target_requires_coordinates() {
    let (status, _) = send(
        &app(),
        "POST",
        &format!("/api/target/{}", token("gina")),
        Some(json!({ "lat": 51.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn obfuscated_url_decodes_back_to_player() {
    let app = app();
    let (status, body) = json_of(&app, "POST", "/api/obfuscate-url", Some(json!({ "playerID": "hank" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playerID"], json!("hank"));
    let id = body["obfuscatedID"].as_str().unwrap();
    assert_eq!(id, token("hank"));
    assert_eq!(
        body["obfuscatedURL"],
        json!(format!("http://localhost:8080/player/{id}"))
    );

    send(&app, "POST", &format!("/api/locations/{id}"), Some(json!({ "lat": 1.5, "lng": 2.5, "status": "OK" }))).await;
    let (_, locations) = json_of(&app, "GET", "/api/locations", None).await;
    assert!(locations.get("hank").is_some());
}

#[tokio::test]
async fn obfuscate_url_prefers_public_base() {
    let app = app_with(AppConfig {
        public_base_url: Some("https://play.example.org/".into()),
        ..config()
    });
    let (_, body) = json_of(&app, "POST", "/api/obfuscate-url", Some(json!({ "playerID": "ivy" }))).await;
    assert_eq!(
        body["obfuscatedURL"],
        json!(format!("https://play.example.org/player/{}", token("ivy")))
    );

    let (status, _) = send(&app, "POST", "/api/obfuscate-url", Some(json!({ "playerID": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_replace_per_player() {
    let app = app();
    let first = json!({ "playerName": "jo", "locationStatus": "denied", "notificationStatus": "ok", "serverStatus": "ok" });
    let second = json!({ "playerName": "jo", "locationStatus": "ok", "notificationStatus": "ok", "serverStatus": "ok" });
    let (status, _) = send(&app, "POST", "/api/test-result", Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);
    send(&app, "POST", "/api/test-result", Some(second)).await;

    let (_, results) = json_of(&app, "GET", "/api/test-results", None).await;
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["locationStatus"], json!("ok"));

    let (status, body) = send(&app, "POST", "/api/test-result", Some(json!({ "locationStatus": "ok" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"PlayerName is required");
}

#[tokio::test]
async fn initial_targets_load_from_seed_file() {
    let path = std::env::temp_dir().join(format!("waypoint-seed-{}.json", uuid::Uuid::new_v4()));
    let seed = json!([
        { "playerName": "kim", "target": { "lat": 51.0, "lng": 3.7 } },
        { "playerName": "lee", "target": { "lat": 51.2, "lng": 3.8 } }
    ]);
    tokio::fs::write(&path, seed.to_string()).await.unwrap();

    let app = app_with(AppConfig {
        initial_targets_path: path.clone(),
        ..config()
    });
    let (status, body) = json_of(&app, "POST", "/api/admin/load-initial-targets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Successfully loaded and set 2 initial targets."));

    let (_, targets) = json_of(&app, "GET", "/api/targets", None).await;
    assert_eq!(targets["kim"]["lat"], json!(51.0));
    assert_eq!(targets["lee"]["lng"], json!(3.8));

    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn missing_seed_file_is_server_error() {
    let app = app_with(AppConfig {
        initial_targets_path: std::env::temp_dir().join(format!("missing-{}.json", uuid::Uuid::new_v4())),
        ..config()
    });
    let (status, _) = send(&app, "POST", "/api/admin/load-initial-targets", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn clear_datastore_needs_confirmation() {
    let app = app();
    let uri = format!("/api/locations/{}", token("max"));
    send(&app, "POST", &uri, Some(json!({ "lat": 1.0, "lng": 1.0, "status": "OK" }))).await;

    let (status, _) = send(&app, "POST", "/api/admin/clear-datastore", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, locations) = json_of(&app, "GET", "/api/locations", None).await;
    assert!(locations.get("max").is_some());

    let (status, body) = send(&app, "POST", "/api/admin/clear-datastore?confirm=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Successfully deleted 1 entities across 5 kinds."
    );
    let (_, locations) = json_of(&app, "GET", "/api/locations", None).await;
    assert_eq!(locations, json!({}));
}

#[tokio::test]
async fn pages_embed_app_version() {
    let app = app();
    let player = format!("/player/{}", token("nia"));
    for uri in ["/gamelead", "/test", "/generator", "/testresults", player.as_str()] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(String::from_utf8(body).unwrap().contains("test-version"), "{uri}");
    }
}
