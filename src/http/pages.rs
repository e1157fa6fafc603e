//! HTML shells for the lead map, player view and test pages.
//!
//! Each page only needs the deployed version, appended to asset URLs so browsers
//! refetch scripts after a deploy.

use askama::Template;
use axum::{extract::State, response::Html};

use super::{error::ApiError, AppState};

#[derive(Template)]
#[template(path = "gamelead.html")]
struct GameLeadPage<'a> {
    app_version: &'a str,
}

#[derive(Template)]
#[template(path = "player.html")]
struct PlayerPage<'a> {
    app_version: &'a str,
}

#[derive(Template)]
#[template(path = "test.html")]
struct TestPage<'a> {
    app_version: &'a str,
}

#[derive(Template)]
#[template(path = "generator.html")]
struct GeneratorPage<'a> {
    app_version: &'a str,
}

#[derive(Template)]
#[template(path = "testresults.html")]
struct TestResultsPage<'a> {
    app_version: &'a str,
}

fn render(page: &impl Template, name: &str) -> Result<Html<String>, ApiError> {
    page.render().map(Html).map_err(|err| {
        tracing::error!(page = name, error = %err, "template render failed");
        ApiError::Internal("Internal Server Error".into())
    })
}

pub async fn game_lead(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&GameLeadPage { app_version: &state.config.app_version }, "gamelead")
}

/// The token in the path is read client-side.
pub async fn player(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&PlayerPage { app_version: &state.config.app_version }, "player")
}

pub async fn test(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&TestPage { app_version: &state.config.app_version }, "test")
}

pub async fn generator(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&GeneratorPage { app_version: &state.config.app_version }, "generator")
}

pub async fn test_results(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&TestResultsPage { app_version: &state.config.app_version }, "testresults")
}
