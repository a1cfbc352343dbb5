use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::dispatch;
use crate::events::DASHBOARD_TARGET;
use crate::http::auth;
use crate::state::AppState;

/// POST /widgets/{id} — Producer submission for a widget key.
/// The `auth_token` field is stripped from the body before the event is
/// formatted; the rest of the body is the event payload.
pub async fn submit_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let token = take_auth_token(&mut body)?;
    if !auth::authenticated(state.auth_token.as_deref(), token.as_deref()) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid API key\n"));
    }

    dispatch::submit(&state, &id, body, None);
    // Response without entity body
    Ok(StatusCode::NO_CONTENT)
}

/// POST /dashboards/{id} — Dashboard navigation event. Broadcast on the
/// `dashboards` event name, never written into history.
pub async fn submit_dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let token = take_auth_token(&mut body)?;
    if !auth::authenticated(state.auth_token.as_deref(), token.as_deref()) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid API key\n"));
    }

    if let Some(obj) = body.as_object_mut() {
        obj.entry("dashboard")
            .or_insert_with(|| Value::from(id.clone()));
    }

    dispatch::submit(&state, &id, body, Some(DASHBOARD_TARGET));
    Ok(StatusCode::NO_CONTENT)
}

/// Remove and return the `auth_token` field from a submission body.
/// Rejects non-object bodies up front — the core assumes well-formed input.
fn take_auth_token(body: &mut Value) -> Result<Option<String>, (StatusCode, &'static str)> {
    let obj = body
        .as_object_mut()
        .ok_or((StatusCode::BAD_REQUEST, "Expected a JSON object\n"))?;
    Ok(obj
        .remove("auth_token")
        .and_then(|v| v.as_str().map(str::to_string)))
}
