//! Boundary extractors: obfuscated player ids from the path and JSON bodies.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use super::{error::ApiError, AppState};

/// Real player id decoded from the single `:player` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerId(pub String);

#[async_trait]
impl FromRequestParts<AppState> for PlayerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let missing = || ApiError::BadRequest("Player ID is missing".into());
        let Path(token) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| missing())?;
        let name = state.codec.deobfuscate(&token).map_err(|err| {
            tracing::debug!(%token, error = %err, "rejected player token");
            missing()
        })?;
        if name.is_empty() {
            return Err(missing());
        }
        Ok(Self(name))
    }
}

/// JSON body parsed into `T` regardless of the request's content type.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|err| ApiError::BadRequest(format!("Invalid JSON body: {err}")))
    }
}
