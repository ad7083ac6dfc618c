//! HTTP surface of the store.
//!
//! Two POST routes mirror the device protocol; a GET health probe rounds it
//! out. Malformed bodies map to 400, storage failures to 500.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use convoy_core::error::Error;
use convoy_core::protocol::{FetchAppsRequest, FetchAppsResponse, StateUpdate};
use serde_json::json;

use crate::catalog::CatalogService;
use crate::state::StateService;

#[derive(Clone)]
pub struct ApiState {
    pub catalog: CatalogService,
    pub state: StateService,
}

pub fn router(catalog: CatalogService, state: StateService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/apps", post(fetch_apps))
        .route("/api/state-update", post(state_update))
        .with_state(ApiState { catalog, state })
}

async fn health() -> &'static str {
    "ok"
}

async fn fetch_apps(
    State(api): State<ApiState>,
    ApiJson(request): ApiJson<FetchAppsRequest>,
) -> Result<Json<FetchAppsResponse>, ApiError> {
    if request.robot_id.trim().is_empty() {
        return Err(Error::Validation("robotId must not be empty".to_string()).into());
    }

    let applications = api
        .catalog
        .apps_for_robot(&request.robot_id, &request.installed_apps)?;
    Ok(Json(FetchAppsResponse {
        robot_id: request.robot_id,
        applications,
    }))
}

async fn state_update(
    State(api): State<ApiState>,
    ApiJson(update): ApiJson<StateUpdate>,
) -> Result<&'static str, ApiError> {
    if update.robot_id.trim().is_empty() || update.app_id.trim().is_empty() {
        return Err(Error::Validation("robotId and appId must not be empty".to_string()).into());
    }

    api.state.report(&update)?;
    Ok("State and logs updated successfully")
}

/// Json extractor whose rejection is a 400, whatever shape the malformed
/// body takes (axum's stock extractor answers 422 for schema mismatches).
struct ApiJson<T>(T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(Error::Validation(rejection.body_text()))),
        }
    }
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
