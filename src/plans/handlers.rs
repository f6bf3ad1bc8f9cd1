use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use time::{Date, Duration, OffsetDateTime};
use tracing::{error, instrument, warn};

use super::dto::{AddScheduleItemRequest, AddTodoRequest, HistoryQuery, PlanSummary, SavePlanRequest};
use super::lists;
use super::model::{parse_plan_date, DailyPlan};
use super::services::{edit_plan, load_plan, save_plan, SyncError};
use crate::{auth::AuthUser, state::AppState};

type ApiError = (StatusCode, String);

/// Longest range the history listing serves in one call.
const MAX_HISTORY_DAYS: i64 = 366;
const DEFAULT_HISTORY_DAYS: i64 = 31;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/plans/:date", get(get_plan))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/plans/:date", put(put_plan))
        .route("/plans/:date/todos", post(add_todo))
        .route("/plans/:date/todos/:id/toggle", post(toggle_todo))
        .route("/plans/:date/todos/:id", delete(delete_todo))
        .route("/plans/:date/schedule", post(add_schedule_item))
        .route("/plans/:date/schedule/:id", delete(delete_schedule_item))
}

pub fn sync_error(e: SyncError) -> ApiError {
    let status = match &e {
        SyncError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        SyncError::Invalid(_) => StatusCode::BAD_REQUEST,
        SyncError::Load(_) | SyncError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub fn parse_date_param(raw: &str) -> Result<Date, ApiError> {
    parse_plan_date(raw).map_err(|e| {
        warn!(date = raw, error = %e, "bad plan date");
        (
            StatusCode::BAD_REQUEST,
            format!("invalid date '{raw}', expected YYYY-MM-DD"),
        )
    })
}

fn session_user(session: Option<AuthUser>) -> Option<uuid::Uuid> {
    session.map(|AuthUser(id)| id)
}

#[instrument(skip(state, session))]
pub async fn get_plan(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path(date): Path<String>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = load_plan(state.plans.as_ref(), session_user(session), date)
        .await
        .map_err(sync_error)?;
    Ok(Json(plan))
}

#[instrument(skip(state, session, body))]
pub async fn put_plan(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path(date): Path<String>,
    Json(body): Json<SavePlanRequest>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let user = session_user(session);
    // Overwritten with the session user by save_plan.
    let draft = body.into_plan(user.unwrap_or_default(), date);
    let saved = save_plan(state.plans.as_ref(), user, date, draft)
        .await
        .map_err(sync_error)?;
    Ok(Json(saved))
}

#[instrument(skip(state, session))]
pub async fn list_plans(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<PlanSummary>>, ApiError> {
    let user_id = session_user(session).ok_or_else(|| sync_error(SyncError::NotAuthenticated))?;

    let to = match q.to.as_deref() {
        Some(raw) => parse_date_param(raw)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let from = match q.from.as_deref() {
        Some(raw) => parse_date_param(raw)?,
        None => to
            .checked_sub(Duration::days(DEFAULT_HISTORY_DAYS - 1))
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("no history before {to}")))?,
    };
    if from > to {
        return Err((StatusCode::BAD_REQUEST, "'from' is after 'to'".into()));
    }
    if (to - from).whole_days() >= MAX_HISTORY_DAYS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("range is limited to {MAX_HISTORY_DAYS} days"),
        ));
    }

    let rows = state
        .plans
        .list_range(user_id, from, to)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, %from, %to, "list plans failed");
            sync_error(SyncError::Load(e))
        })?;
    Ok(Json(rows.into_iter().map(PlanSummary::from).collect()))
}

#[instrument(skip(state, session, body))]
pub async fn add_todo(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path(date): Path<String>,
    Json(body): Json<AddTodoRequest>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = edit_plan(state.plans.as_ref(), session_user(session), date, |p| {
        lists::add_todo(&mut p.todos, &body.text).is_some()
    })
    .await
    .map_err(sync_error)?;
    Ok(Json(plan))
}

#[instrument(skip(state, session))]
pub async fn toggle_todo(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path((date, id)): Path<(String, String)>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = edit_plan(state.plans.as_ref(), session_user(session), date, |p| {
        lists::toggle_todo(&mut p.todos, &id)
    })
    .await
    .map_err(sync_error)?;
    Ok(Json(plan))
}

#[instrument(skip(state, session))]
pub async fn delete_todo(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path((date, id)): Path<(String, String)>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = edit_plan(state.plans.as_ref(), session_user(session), date, |p| {
        lists::delete_item(&mut p.todos, &id)
    })
    .await
    .map_err(sync_error)?;
    Ok(Json(plan))
}

#[instrument(skip(state, session, body))]
pub async fn add_schedule_item(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path(date): Path<String>,
    Json(body): Json<AddScheduleItemRequest>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = edit_plan(state.plans.as_ref(), session_user(session), date, |p| {
        lists::add_schedule_item(&mut p.schedule, &body.time, &body.description).is_some()
    })
    .await
    .map_err(sync_error)?;
    Ok(Json(plan))
}

#[instrument(skip(state, session))]
pub async fn delete_schedule_item(
    State(state): State<AppState>,
    session: Option<AuthUser>,
    Path((date, id)): Path<(String, String)>,
) -> Result<Json<DailyPlan>, ApiError> {
    let date = parse_date_param(&date)?;
    let plan = edit_plan(state.plans.as_ref(), session_user(session), date, |p| {
        lists::delete_item(&mut p.schedule, &id)
    })
    .await
    .map_err(sync_error)?;
    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::app::build_app;
    use crate::auth::services::JwtKeys;
    use crate::plans::model::format_plan_date;
    use crate::plans::repo::memory::MemoryPlanStore;

    struct Harness {
        state: AppState,
        store: Arc<MemoryPlanStore>,
        token: String,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryPlanStore::default());
            let state = AppState::fake_with(store.clone(), None);
            let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
            Self { state, store, token }
        }

        async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {}", self.token));
            let body = match body {
                Some(v) => {
                    req = req.header("content-type", "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            build_app(self.state.clone())
                .oneshot(req.body(body).unwrap())
                .await
                .unwrap()
        }

        async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> Value {
            let res = self.call(method, uri, body).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            serde_json::from_slice(&bytes).unwrap()
        }
    }

    #[tokio::test]
    async fn unknown_day_loads_empty_default_without_writing() {
        let h = Harness::new();
        let plan = h.json(Method::GET, "/api/v1/plans/2031-12-31", None).await;
        assert!(plan["id"].is_null());
        assert_eq!(plan["plan_date"], "2031-12-31");
        assert_eq!(plan["todos"], json!([]));
        assert_eq!(plan["water_intake_glasses"], 0);
        assert_eq!(h.store.row_count(), 0);
    }

    #[tokio::test]
    async fn add_todo_then_reload_returns_it() {
        let h = Harness::new();
        h.json(
            Method::POST,
            "/api/v1/plans/2024-05-14/todos",
            Some(json!({"text": "Buy milk"})),
        )
        .await;

        let plan = h.json(Method::GET, "/api/v1/plans/2024-05-14", None).await;
        let todos = plan["todos"].as_array().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["text"], "Buy milk");
        assert_eq!(todos[0]["completed"], false);
        assert!(plan["updated_at"].is_string());
    }

    #[tokio::test]
    async fn put_replaces_whole_record() {
        let h = Harness::new();
        let uri = "/api/v1/plans/2024-05-14";
        h.json(
            Method::PUT,
            uri,
            Some(json!({"breakfast": "eggs", "mood": "fine", "water_intake_glasses": 4})),
        )
        .await;
        let saved = h.json(Method::PUT, uri, Some(json!({"mood": "great"}))).await;

        assert_eq!(saved["mood"], "great");
        assert_eq!(saved["breakfast"], "");
        assert_eq!(saved["water_intake_glasses"], 0);
        assert_eq!(h.store.row_count(), 1);
    }

    #[tokio::test]
    async fn put_with_blank_todo_is_rejected() {
        let h = Harness::new();
        let res = h
            .call(
                Method::PUT,
                "/api/v1/plans/2024-05-14",
                Some(json!({"todos": [{"id": "1", "text": " "}]})),
            )
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.store.row_count(), 0);
    }

    #[tokio::test]
    async fn save_without_session_is_rejected_before_store() {
        let h = Harness::new();
        let res = build_app(h.state.clone())
            .oneshot(
                Request::put("/api/v1/plans/2024-05-14")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"mood":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn bad_date_is_bad_request() {
        let h = Harness::new();
        let res = h.call(Method::GET, "/api/v1/plans/tomorrow", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_outage_is_reported() {
        let h = Harness::new();
        h.store.set_failing(true);
        let res = h.call(Method::GET, "/api/v1/plans/2024-05-14", None).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn schedule_endpoint_keeps_time_order() {
        let h = Harness::new();
        let uri = "/api/v1/plans/2024-05-14";
        h.json(
            Method::PUT,
            uri,
            Some(json!({"schedule": [{"id": "1", "time": "14:00", "description": "Call"}]})),
        )
        .await;
        let plan = h
            .json(
                Method::POST,
                &format!("{uri}/schedule"),
                Some(json!({"time": "09:00", "description": "Standup"})),
            )
            .await;
        assert_eq!(plan["schedule"][0]["description"], "Standup");
        assert_eq!(plan["schedule"][1]["description"], "Call");

        let plan = h.json(Method::DELETE, &format!("{uri}/schedule/1"), None).await;
        assert_eq!(plan["schedule"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn toggle_and_delete_todo() {
        let h = Harness::new();
        let uri = "/api/v1/plans/2024-05-14";
        h.json(
            Method::PUT,
            uri,
            Some(json!({"todos": [{"id": "a", "text": "Read"}, {"id": "b", "text": "Walk"}]})),
        )
        .await;

        let plan = h.json(Method::POST, &format!("{uri}/todos/a/toggle"), None).await;
        assert_eq!(plan["todos"][0]["completed"], true);

        let unchanged = h.json(Method::POST, &format!("{uri}/todos/nope/toggle"), None).await;
        assert_eq!(unchanged["todos"], plan["todos"]);

        let plan = h.json(Method::DELETE, &format!("{uri}/todos/a"), None).await;
        assert_eq!(plan["todos"].as_array().unwrap().len(), 1);
        assert_eq!(plan["todos"][0]["id"], "b");
    }

    #[tokio::test]
    async fn blank_todo_on_empty_day_creates_nothing() {
        let h = Harness::new();
        let plan = h
            .json(
                Method::POST,
                "/api/v1/plans/2024-05-14/todos",
                Some(json!({"text": "   "})),
            )
            .await;
        assert!(plan["id"].is_null());
        assert_eq!(h.store.row_count(), 0);
    }

    #[tokio::test]
    async fn history_lists_saved_days_in_range() {
        let h = Harness::new();
        for (day, mood) in [("2024-05-01", "ok"), ("2024-05-20", "good"), ("2024-06-02", "meh")] {
            h.json(
                Method::PUT,
                &format!("/api/v1/plans/{day}"),
                Some(json!({"mood": mood, "todos": [{"id": "1", "text": "x", "completed": true}]})),
            )
            .await;
        }

        let list = h
            .json(Method::GET, "/api/v1/plans?from=2024-05-01&to=2024-05-31", None)
            .await;
        let days: Vec<_> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["plan_date"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(days, ["2024-05-01", "2024-05-20"]);
        assert_eq!(list[0]["completed_count"], 1);
    }

    #[tokio::test]
    async fn history_rejects_inverted_or_huge_ranges() {
        let h = Harness::new();
        let res = h
            .call(Method::GET, "/api/v1/plans?from=2024-06-01&to=2024-05-01", None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = h
            .call(Method::GET, "/api/v1/plans?from=2020-01-01&to=2024-05-01", None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_span_limit_is_exclusive() {
        let h = Harness::new();
        // 2024 is a leap year: 365 days between the two ends is fine.
        h.json(Method::GET, "/api/v1/plans?from=2024-01-01&to=2024-12-31", None)
            .await;
        let res = h
            .call(Method::GET, "/api/v1/plans?from=2023-12-31&to=2024-12-31", None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_defaults_to_the_last_month() {
        let h = Harness::new();
        let today = OffsetDateTime::now_utc().date();
        let days: Vec<String> = [31, 30, 0]
            .into_iter()
            .map(|back| format_plan_date(today - Duration::days(back)))
            .collect();
        for day in &days {
            h.json(
                Method::PUT,
                &format!("/api/v1/plans/{day}"),
                Some(json!({"mood": "ok"})),
            )
            .await;
        }

        let list = h.json(Method::GET, "/api/v1/plans", None).await;
        let listed: Vec<_> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["plan_date"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(listed, &days[1..]);
    }

    #[tokio::test]
    async fn history_before_earliest_date_is_bad_request() {
        let h = Harness::new();
        let res = h.call(Method::GET, "/api/v1/plans?to=-9999-01-01", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.store.calls(), 0);
    }
}
