//! HTTP surface: JSON API under `/api`, HTML shells and static assets.

pub mod error;
pub mod extract;
pub mod pages;
pub mod routes;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use routes::AppState;

fn api() -> Router<AppState> {
    Router::new()
        .route("/locations", get(routes::list_locations))
        .route("/locations/:player", post(routes::report_location))
        .route("/messages", get(routes::list_player_messages))
        .route("/messages/read/:message_id", post(routes::mark_message_read))
        .route(
            "/messages/:player",
            get(routes::player_inbox).post(routes::send_player_message),
        )
        .route("/dm/:player", post(routes::send_direct_message))
        .route("/chat/:player", get(routes::chat_history))
        .route("/target/:player", post(routes::set_target))
        .route("/targets", get(routes::list_targets))
        .route("/obfuscate-url", post(routes::obfuscate_url))
        .route("/test-result", post(routes::submit_test_result))
        .route("/test-results", get(routes::list_test_results))
        .route("/admin/load-initial-targets", post(routes::load_initial_targets))
        .route("/admin/clear-datastore", post(routes::clear_datastore))
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .route("/healthz", get(routes::health))
        .route("/gamelead", get(pages::game_lead))
        .route("/player/:token", get(pages::player))
        .route("/test", get(pages::test))
        .route("/generator", get(pages::generator))
        .route("/testresults", get(pages::test_results))
        .nest("/api", api())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
