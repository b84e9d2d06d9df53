use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{auth::verify_bearer, errors::ValidationError, validate, AppState};

const MIN_SEARCH_TERM_CHARS: usize = 2;
const MAX_SEARCH_TERM_CHARS: usize = 32;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true, "timestamp": Utc::now() }))
}

pub async fn search_locations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    if let Err(err) = verify_bearer(&headers, &state.config.api_key) {
        return err.into_response();
    }

    let terms: Vec<&String> = params
        .iter()
        .filter(|(key, _)| key == "query")
        .map(|(_, value)| value)
        .collect();
    if terms.len() != 1 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": "INVALID_SEARCH_TERM",
                    "message": "Exactly one query parameter must be provided."
                }
            })),
        )
            .into_response();
    }

    let term = terms[0];
    let length = term.chars().count();
    if length < MIN_SEARCH_TERM_CHARS || length > MAX_SEARCH_TERM_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": "INVALID_SEARCH_TERM",
                    "message": "Search term length must be between 2 and 32 characters."
                }
            })),
        )
            .into_response();
    }

    let store = state.store.lock().await;
    match store.prefix_search(term) {
        Ok(result) if result.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "code": "NO_MATCHING_LOCATIONS",
                    "message": "No matching locations found."
                }
            })),
        )
            .into_response(),
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            error!("Location search failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "code": "SEARCH_FAILED",
                        "message": "Location search failed."
                    }
                })),
            )
                .into_response()
        }
    }
}

pub async fn whole_country(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(err) = verify_bearer(&headers, &state.config.api_key) {
        return err.into_response();
    }

    let store = state.store.lock().await;
    match store.whole_country() {
        Ok(record) => (StatusCode::OK, Json(record.to_response())).into_response(),
        Err(err) => {
            error!("Whole-country lookup failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "code": "WHOLE_COUNTRY_UNAVAILABLE",
                        "message": "Whole-country record is unavailable."
                    }
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePreferencesRequest {
    pub locations: Vec<String>,
}

pub async fn validate_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ValidatePreferencesRequest>,
) -> impl IntoResponse {
    if let Err(err) = verify_bearer(&headers, &state.config.api_key) {
        return err.into_response();
    }

    let store = state.store.lock().await;
    match validate::validate_preferred_locations(&store, &payload.locations) {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(ValidationError::Storage(err)) => {
            error!("Preferred-location validation failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "code": "VALIDATION_UNAVAILABLE",
                        "message": "Location validation failed."
                    }
                })),
            )
                .into_response()
        }
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": {
                    "code": err.code(),
                    "message": err.to_string()
                }
            })),
        )
            .into_response(),
    }
}
