//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::logic::{apply_command, close_session, export_result, SessionError};
use crate::presenter::ExportError;
use crate::protocol::*;
use crate::state::AppState;
use crate::wizard::WizardCommand;

impl IntoResponse for SessionError {
  fn into_response(self) -> Response {
    let status = match &self {
      SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
      SessionError::Export(ExportError::NotPresentable) => StatusCode::CONFLICT,
      SessionError::Export(ExportError::Unsupported(_)) => StatusCode::NOT_IMPLEMENTED,
      SessionError::Export(ExportError::HandOff(_)) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorOut { message: self.to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: state.invoker.collaborator() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_templates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.catalog.all().to_vec())
}

#[instrument(level = "info", skip(state))]
pub async fn http_open_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (session_id, view) = state.open_session().await;
  (StatusCode::CREATED, Json(SessionOut { session_id, view }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionOut>, SessionError> {
  let view = state.view(&id).await.ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
  Ok(Json(SessionOut { session_id: id, view }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_close_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, SessionError> {
  close_session(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, cmd), fields(%id))]
pub async fn http_post_command(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(cmd): Json<WizardCommand>,
) -> Result<Json<SessionOut>, SessionError> {
  let view = apply_command(&state, &id, cmd).await?;
  info!(target: "wizard", session = %id, step = view.step, loading = view.loading, has_error = view.error.is_some(), "HTTP command applied");
  Ok(Json(SessionOut { session_id: id, view }))
}

#[instrument(level = "info", skip(state, body), fields(%id, format = ?body.format))]
pub async fn http_post_export(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ExportIn>,
) -> Result<Json<ExportOut>, SessionError> {
  export_result(&state, &id, body.format).await?;
  Ok(Json(ExportOut { ok: true, format: body.format }))
}
