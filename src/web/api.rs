use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use flowboard_common::{StoreError, TaskStatus, Version, VersionStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::ws;
use crate::board::controller::BoardState;
use crate::board::dashboard::BoardStats;
use crate::board::filter::BoardColumn;
use crate::board::roadmap::{RoadmapState, VersionColumn};
use crate::board::{
    BoardController, PriorityFilter, RoadmapController, TaskDraft, VersionDraft, VersionFilter,
    ViewMode,
};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub board: BoardController,
    pub roadmap: RoadmapController,
    /// Serialized controller events for WebSocket clients.
    pub ws_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRequest {
    pub task_id: String,
    /// Target column; absent when dropped outside any column.
    pub status: Option<TaskStatus>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

#[derive(Deserialize)]
pub struct VersionStatusRequest {
    pub status: VersionStatus,
}

#[derive(Deserialize)]
pub struct FilterRequest {
    pub search: Option<String>,
    pub priority: Option<PriorityFilter>,
    pub version: Option<VersionFilter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScopeRequest {
    pub project_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ViewModeRequest {
    pub mode: ViewMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapQuery {
    pub project_id: Option<String>,
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    #[serde(flatten)]
    pub state: BoardState,
    pub columns: Vec<BoardColumn>,
    pub version_options: Vec<Version>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapView {
    #[serde(flatten)]
    pub state: RoadmapState,
    pub visible_versions: Vec<Version>,
    pub columns: Vec<VersionColumn>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let msg = err.to_string();
        match err {
            BoardError::Validation(_) | BoardError::NoOrganization => ApiError::BadRequest(msg),
            BoardError::TaskNotFound { .. }
            | BoardError::VersionNotFound { .. }
            | BoardError::Store(StoreError::NotFound { .. }) => ApiError::NotFound(msg),
            BoardError::NoPendingDelete => ApiError::Conflict(msg),
            BoardError::Load(_)
            | BoardError::Confirmation(_)
            | BoardError::Preferences(_)
            | BoardError::Store(_) => ApiError::Internal(msg),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/board", get(get_board))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/board/reload", post(reload_board))
        .route("/api/board/drag", post(begin_drag))
        .route("/api/board/drop", post(end_drag))
        .route("/api/board/bulk-status", post(bulk_set_status))
        .route("/api/board/select", post(toggle_select))
        .route("/api/board/selection", delete(clear_selection))
        .route("/api/board/columns", post(toggle_column))
        .route("/api/board/filter", put(update_filter))
        .route("/api/board/project", put(set_current_project))
        .route(
            "/api/board/delete",
            post(request_delete).delete(cancel_delete),
        )
        .route("/api/board/delete/confirm", post(confirm_delete))
        .route("/api/tasks", post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/roadmap", get(get_roadmap))
        .route("/api/roadmap/reload", post(reload_roadmap))
        .route("/api/roadmap/view", put(set_view_mode))
        .route("/api/versions", post(create_version))
        .route(
            "/api/versions/{id}",
            put(update_version).delete(delete_version),
        )
        .route("/api/versions/{id}/status", patch(set_version_status))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_check))
}

fn board_view(board: &BoardController) -> BoardView {
    BoardView {
        state: board.snapshot(),
        columns: board.columns(),
        version_options: board.version_options(),
    }
}

// ── Handlers: board ───────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn get_board(State(state): State<SharedState>) -> Json<BoardView> {
    Json(board_view(&state.board))
}

async fn get_dashboard(State(state): State<SharedState>) -> Json<BoardStats> {
    Json(state.board.stats())
}

async fn reload_board(State(state): State<SharedState>) -> Result<Json<BoardView>, ApiError> {
    state.board.load_all().await?;
    Ok(Json(board_view(&state.board)))
}

async fn begin_drag(
    State(state): State<SharedState>,
    Json(req): Json<TaskRef>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.resolve_task(&req.task_id)?;
    state.board.begin_drag(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn end_drag(
    State(state): State<SharedState>,
    Json(req): Json<DropRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.board.end_drag(&req.task_id, req.status).await;
    Ok(Json(outcome))
}

async fn bulk_set_status(
    State(state): State<SharedState>,
    Json(req): Json<StatusRequest>,
) -> impl IntoResponse {
    Json(state.board.bulk_set_status(req.status).await)
}

async fn toggle_select(
    State(state): State<SharedState>,
    Json(req): Json<TaskRef>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.resolve_task(&req.task_id)?;
    let selected = state.board.toggle_select(&id);
    Ok(Json(serde_json::json!({
        "selected": selected,
        "selectedTaskIds": state.board.selected(),
    })))
}

async fn clear_selection(State(state): State<SharedState>) -> StatusCode {
    state.board.clear_selection();
    StatusCode::NO_CONTENT
}

async fn toggle_column(
    State(state): State<SharedState>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let columns = state.board.toggle_column(req.status)?;
    Ok(Json(columns))
}

async fn update_filter(
    State(state): State<SharedState>,
    Json(req): Json<FilterRequest>,
) -> Json<BoardView> {
    if let Some(search) = req.search {
        state.board.set_search(search);
    }
    if let Some(priority) = req.priority {
        state.board.set_priority_filter(priority);
    }
    if let Some(version) = req.version {
        state.board.set_version_filter(version);
    }
    Json(board_view(&state.board))
}

async fn set_current_project(
    State(state): State<SharedState>,
    Json(req): Json<ProjectScopeRequest>,
) -> Result<Json<BoardView>, ApiError> {
    state.board.set_current_project(req.project_id.as_deref())?;
    Ok(Json(board_view(&state.board)))
}

async fn request_delete(
    State(state): State<SharedState>,
    Json(req): Json<TaskRef>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.resolve_task(&req.task_id)?;
    state.board.request_delete(&id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"pendingDelete": id})),
    ))
}

async fn cancel_delete(State(state): State<SharedState>) -> StatusCode {
    state.board.cancel_delete();
    StatusCode::NO_CONTENT
}

async fn confirm_delete(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.confirm_delete().await?;
    Ok(Json(serde_json::json!({"deleted": id})))
}

// ── Handlers: tasks ───────────────────────────────────────────────────

async fn create_task(
    State(state): State<SharedState>,
    Json(draft): Json<TaskDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = state.board.save_task(draft, None).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"ids": ids}))))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .board
        .find_task(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(draft): Json<TaskDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.resolve_task(&id)?;
    let ids = state.board.save_task(draft, Some(id.as_str())).await?;
    Ok(Json(serde_json::json!({"ids": ids})))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.board.resolve_task(&id)?;
    let deleted = state.board.delete_task(&id).await?;
    Ok(Json(serde_json::json!({"deleted": deleted})))
}

// ── Handlers: roadmap ─────────────────────────────────────────────────

fn roadmap_view(roadmap: &RoadmapController, project_id: Option<&str>) -> RoadmapView {
    RoadmapView {
        state: roadmap.snapshot(),
        visible_versions: roadmap.filtered_versions(project_id),
        columns: roadmap.versions_by_status(project_id),
    }
}

async fn get_roadmap(
    State(state): State<SharedState>,
    Query(query): Query<RoadmapQuery>,
) -> Json<RoadmapView> {
    Json(roadmap_view(&state.roadmap, query.project_id.as_deref()))
}

async fn reload_roadmap(State(state): State<SharedState>) -> Result<Json<RoadmapView>, ApiError> {
    state.roadmap.load_all().await?;
    Ok(Json(roadmap_view(&state.roadmap, None)))
}

async fn set_view_mode(
    State(state): State<SharedState>,
    Json(req): Json<ViewModeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.roadmap.set_view_mode(req.mode)?;
    Ok(Json(serde_json::json!({"viewMode": req.mode})))
}

async fn create_version(
    State(state): State<SharedState>,
    Json(draft): Json<VersionDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.roadmap.save_version(draft, None).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

async fn update_version(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(draft): Json<VersionDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .roadmap
        .find_version(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Version {} not found", id)))?;
    let id = state.roadmap.save_version(draft, Some(version.id.as_str())).await?;
    Ok(Json(serde_json::json!({"id": id})))
}

async fn set_version_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<VersionStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.roadmap.set_version_status(&id, req.status).await?;
    Ok(Json(outcome))
}

async fn delete_version(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.roadmap.request_delete(&id)?;
    let deleted = state.roadmap.confirm_delete().await?;
    Ok(Json(serde_json::json!({"deleted": deleted})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ViewPreferences;
    use crate::board::testing::seed;
    use crate::store::sqlite::SqliteStore;
    use axum::body::Body;
    use axum::http::Request;
    use flowboard_common::{Priority, Repository};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: SharedState,
        task_ids: Vec<String>,
        project_id: String,
    }

    async fn test_app() -> TestApp {
        let store = SqliteStore::open_in_memory().unwrap();
        let (org, project_id, task_ids) = seed(
            &store,
            &[
                ("Login screen", TaskStatus::Backlog, Priority::High),
                ("Push alerts", TaskStatus::Backlog, Priority::Low),
                ("Crash on start", TaskStatus::InProgress, Priority::Critical),
            ],
        )
        .await;
        let repo: Arc<dyn Repository> = Arc::new(store);
        let prefs = ViewPreferences::in_memory();
        let board = BoardController::new(repo.clone(), prefs.clone(), Some(org.clone()));
        let roadmap = RoadmapController::new(repo, prefs, Some(org));
        board.load_all().await.unwrap();
        roadmap.load_all().await.unwrap();
        let (ws_tx, _) = broadcast::channel(16);
        let state = Arc::new(AppState {
            board,
            roadmap,
            ws_tx,
        });
        TestApp {
            router: api_router().with_state(state.clone()),
            state,
            task_ids,
            project_id,
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app().await;
        let response = app.router.oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_get_board_returns_columns_and_state() {
        let app = test_app().await;
        let response = app.router.oneshot(empty_request("GET", "/api/board")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let board = body_json(response).await;
        assert_eq!(board["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(board["columns"].as_array().unwrap().len(), 6);
        assert_eq!(board["columns"][1]["status"], "backlog");
        assert_eq!(board["columns"][1]["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(board["loading"], false);
    }

    #[tokio::test]
    async fn test_dashboard_summarizes_organization() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(empty_request("GET", "/api/dashboard"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stats = body_json(response).await;
        assert_eq!(stats["totalTasks"], 3);
        assert_eq!(stats["completedTasks"], 0);
        assert_eq!(stats["activeVersions"], 0);
        assert_eq!(stats["recentTasks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_drop_moves_task() {
        let app = test_app().await;
        let id = app.task_ids[0].clone();
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/board/drop",
                serde_json::json!({"taskId": id, "status": "done"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome = body_json(response).await;
        assert_eq!(outcome["outcome"], "moved");
        assert_eq!(outcome["status"], "done");
        let task = app.state.board.find_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_drop_outside_columns_is_no_target() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/board/drop",
                serde_json::json!({"taskId": app.task_ids[0]}),
            ))
            .await
            .unwrap();
        let outcome = body_json(response).await;
        assert_eq!(outcome["outcome"], "no_target");
    }

    #[tokio::test]
    async fn test_select_then_bulk_status() {
        let app = test_app().await;
        for id in &app.task_ids[..2] {
            let response = app
                .router
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/api/board/select",
                    serde_json::json!({"taskId": id}),
                ))
                .await
                .unwrap();
            assert_eq!(body_json(response).await["selected"], true);
        }

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/board/bulk-status",
                serde_json::json!({"status": "code_review"}),
            ))
            .await
            .unwrap();
        let outcome = body_json(response).await;
        assert_eq!(outcome["outcome"], "moved");
        assert_eq!(outcome["task_ids"].as_array().unwrap().len(), 2);
        assert!(app.state.board.selected().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_priority() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "PUT",
                "/api/board/filter",
                serde_json::json!({"priority": "high"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let board = body_json(response).await;
        assert_eq!(board["filter"]["priority"], "high");
        let visible: usize = board["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["tasks"].as_array().unwrap().len())
            .sum();
        assert_eq!(visible, 1);
    }

    #[tokio::test]
    async fn test_invalid_priority_is_rejected() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "PUT",
                "/api/board/filter",
                serde_json::json!({"priority": "urgent"}),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(empty_request("POST", "/api/board/delete/confirm"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/board/delete",
                serde_json::json!({"taskId": "FIT-102"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .router
            .oneshot(empty_request("POST", "/api/board/delete/confirm"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["deleted"], app.task_ids[1]);
        assert_eq!(app.state.board.snapshot().tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_create_task_and_validation() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                serde_json::json!({"title": "  ", "projectIds": [app.project_id]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Title is required");

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                serde_json::json!({
                    "title": "Dark mode",
                    "projectIds": [app.project_id],
                    "priority": "medium",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["ids"].as_array().unwrap().len(), 1);
        assert!(
            app.state
                .board
                .snapshot()
                .tasks
                .iter()
                .any(|t| t.title == "Dark mode")
        );
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_not_found() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(empty_request("GET", "/api/tasks/FIT-999"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_version_lifecycle() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/versions",
                serde_json::json!({"name": "1.0.0", "projectId": app.project_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/versions/{}/status", id),
                serde_json::json!({"status": "in_stores"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["outcome"], "updated");

        let response = app
            .router
            .clone()
            .oneshot(empty_request("GET", "/api/roadmap"))
            .await
            .unwrap();
        let roadmap = body_json(response).await;
        assert_eq!(roadmap["visibleVersions"][0]["status"], "in_stores");

        let response = app
            .router
            .oneshot(empty_request("DELETE", &format!("/api/versions/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.state.roadmap.snapshot().versions.is_empty());
    }

    #[tokio::test]
    async fn test_set_view_mode() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "PUT",
                "/api/roadmap/view",
                serde_json::json!({"mode": "board"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.state.roadmap.view_mode(), ViewMode::Board);
    }

    #[test]
    fn test_board_error_status_mapping() {
        let resp = ApiError::from(BoardError::NoPendingDelete).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = ApiError::from(BoardError::TaskNotFound {
            reference: "x".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ApiError::from(BoardError::Load(StoreError::Transport("down".into())))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
