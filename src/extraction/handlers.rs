use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::parse::merge_reply;
use super::{is_supported_image, ExtractionError, PlanImage};
use crate::{
    auth::AuthUser,
    plans::{
        dto::SavePlanRequest,
        handlers::{parse_date_param, sync_error},
        model::DailyPlan,
        services::{load_plan, SyncError},
    },
    state::AppState,
};

type ApiError = (StatusCode, String);

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn extract_routes() -> Router<AppState> {
    Router::new()
        .route("/plans/:date/extract", post(extract_plan))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    /// Draft with the recognised fields merged in. Not saved.
    pub plan: DailyPlan,
    pub error: Option<String>,
}

fn extraction_status(e: &ExtractionError) -> StatusCode {
    match e {
        ExtractionError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ExtractionError::UnsupportedImage(_) => StatusCode::BAD_REQUEST,
        ExtractionError::Transport(_)
        | ExtractionError::Api { .. }
        | ExtractionError::EmptyResponse => StatusCode::BAD_GATEWAY,
        ExtractionError::Unparseable(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

/// POST /plans/:date/extract (multipart)
///
/// Fields: `image` (the planner photo) and optionally `draft`, the unsaved
/// plan as JSON. Without a draft the stored plan for the day is the base.
#[instrument(skip(state, session, mp))]
pub async fn extract_plan(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path(date): Path<String>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ExtractionResponse>), ApiError> {
    let date = parse_date_param(&date)?;
    let user_id = session
        .map(|AuthUser(id)| id)
        .ok_or_else(|| sync_error(SyncError::NotAuthenticated))?;

    let Some(extractor) = state.extractor.clone() else {
        let e = ExtractionError::NotConfigured;
        return Err((extraction_status(&e), e.to_string()));
    };

    let mut image: Option<PlanImage> = None;
    let mut draft: Option<SavePlanRequest> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let mime_type = field
                    .content_type()
                    .map(|s| s.to_ascii_lowercase())
                    .unwrap_or_else(|| "application/octet-stream".into());
                if !is_supported_image(&mime_type) {
                    let e = ExtractionError::UnsupportedImage(mime_type);
                    return Err((extraction_status(&e), e.to_string()));
                }
                let bytes = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
                image = Some(PlanImage { bytes, mime_type });
            }
            Some("draft") => {
                let raw = field.text().await.map_err(|e| bad_request(e.body_text()))?;
                let parsed = serde_json::from_str::<SavePlanRequest>(&raw)
                    .map_err(|e| bad_request(format!("invalid draft: {e}")))?;
                draft = Some(parsed);
            }
            _ => {}
        }
    }
    let image = image
        .filter(|i| !i.bytes.is_empty())
        .ok_or_else(|| bad_request("image is required"))?;

    let base = match draft {
        Some(d) => d.into_plan(user_id, date),
        None => load_plan(state.plans.as_ref(), Some(user_id), date)
            .await
            .map_err(sync_error)?,
    };

    let reply = extractor.extract_text(&image).await.map_err(|e| {
        error!(error = %e, %user_id, %date, "extraction call failed");
        (extraction_status(&e), e.to_string())
    })?;

    let (plan, failure) = merge_reply(base, &reply);
    match failure {
        None => {
            info!(%user_id, %date, "planner photo merged into draft");
            Ok((StatusCode::OK, Json(ExtractionResponse { plan, error: None })))
        }
        Some(e) => {
            warn!(%user_id, %date, "planner photo could not be parsed; raw text kept in notes");
            Ok((
                extraction_status(&e),
                Json(ExtractionResponse {
                    plan,
                    error: Some(e.to_string()),
                }),
            ))
        }
    }
}
