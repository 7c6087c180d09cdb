// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface of the release tracker.
//!
//! Plain CRUD endpoints are pass-through persistence; the only business logic
//! behind a route is the milestone PUT (archival workflow) and the
//! single-current check on version create. Uploaded change images are written
//! through [`ImageStore`] and served back from the `/static` mount.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::catalog::{CatalogError, VersionService};
use crate::application::milestone::MilestoneService;
use crate::domain::repository::{
    AppRepository, ChangeFilter, ChangeRepository, DeploymentRepository, MilestoneRepository,
    RepositoryError, VersionRepository,
};
use crate::domain::{NewApp, NewChange, NewDeployment, NewMilestone, NewVersion};
use crate::infrastructure::uploads::{ImageStore, UploadError};

pub struct AppState {
    pub apps: Arc<dyn AppRepository>,
    pub versions: Arc<dyn VersionRepository>,
    pub deployments: Arc<dyn DeploymentRepository>,
    pub changes: Arc<dyn ChangeRepository>,
    pub milestones: Arc<dyn MilestoneRepository>,
    pub version_service: VersionService,
    pub milestone_service: MilestoneService,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(
        apps: Arc<dyn AppRepository>,
        versions: Arc<dyn VersionRepository>,
        deployments: Arc<dyn DeploymentRepository>,
        changes: Arc<dyn ChangeRepository>,
        milestones: Arc<dyn MilestoneRepository>,
        images: ImageStore,
    ) -> Self {
        let version_service = VersionService::new(versions.clone());
        let milestone_service = MilestoneService::new(
            milestones.clone(),
            deployments.clone(),
            changes.clone(),
            versions.clone(),
        );
        Self {
            apps,
            versions,
            deployments,
            changes,
            milestones,
            version_service,
            milestone_service,
            images,
        }
    }
}

/// Build the full router. `static_root` is served under `/static` and is also
/// where uploaded images land.
pub fn app(state: Arc<AppState>, static_root: &FsPath) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/apps/", get(list_apps).post(create_app))
        .route("/apps/{id}", axum::routing::put(update_app).delete(delete_app))
        .route("/versions/", get(list_versions).post(create_version))
        .route(
            "/versions/{id}",
            axum::routing::put(update_version).delete(delete_version),
        )
        .route("/deployments/", get(list_deployments).post(create_deployment))
        .route(
            "/deployments/{id}",
            axum::routing::put(update_deployment).delete(delete_deployment),
        )
        .route("/changes/", get(list_changes).post(create_change))
        .route(
            "/changes/{id}",
            axum::routing::put(update_change).delete(delete_change),
        )
        .route("/changes/upload-image/", post(upload_change_image))
        .route("/milestones/", get(list_milestones).post(create_milestone))
        .route(
            "/milestones/{id}",
            get(get_milestone)
                .put(update_milestone)
                .delete(delete_milestone),
        )
        .nest_service("/static", ServeDir::new(static_root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Errors ---

pub enum ApiError {
    NotFound(&'static str),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ApiError::NotFound("Entity"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CurrentVersionExists { .. } => ApiError::Conflict(err.to_string()),
            CatalogError::Repository(inner) => inner.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidFileName(_) => ApiError::BadRequest(err.to_string()),
            UploadError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

// --- Query parameters ---

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub app: Option<String>,
    pub version: Option<String>,
    pub archived: Option<bool>,
}

// --- Handlers ---

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_apps(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.apps.list(page.skip, page.limit).await?))
}

async fn create_app(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewApp>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.apps.create(&draft).await?))
}

async fn update_app(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<NewApp>,
) -> Result<impl IntoResponse, ApiError> {
    match state.apps.update(id, &draft).await? {
        Some(app) => Ok(Json(app)),
        None => Err(ApiError::NotFound("App")),
    }
}

async fn delete_app(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.apps.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("App"))
    }
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.list(page.skip, page.limit).await?))
}

async fn create_version(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewVersion>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.version_service.create(&draft).await?))
}

async fn update_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<NewVersion>,
) -> Result<impl IntoResponse, ApiError> {
    match state.versions.update(id, &draft).await? {
        Some(version) => Ok(Json(version)),
        None => Err(ApiError::NotFound("Version")),
    }
}

async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.versions.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Version"))
    }
}

async fn list_deployments(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.deployments.list(page.skip, page.limit).await?))
}

async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewDeployment>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.deployments.create(&draft).await?))
}

async fn update_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<NewDeployment>,
) -> Result<impl IntoResponse, ApiError> {
    match state.deployments.update(id, &draft).await? {
        Some(deployment) => Ok(Json(deployment)),
        None => Err(ApiError::NotFound("Deployment")),
    }
}

async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.deployments.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Deployment"))
    }
}

async fn list_changes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChangeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ChangeFilter {
        app: query.app,
        version: query.version,
        archived: query.archived,
    };
    Ok(Json(
        state.changes.list(&filter, query.skip, query.limit).await?,
    ))
}

async fn create_change(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewChange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.changes.create(&draft).await?))
}

async fn update_change(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<NewChange>,
) -> Result<impl IntoResponse, ApiError> {
    match state.changes.update(id, &draft).await? {
        Some(change) => Ok(Json(change)),
        None => Err(ApiError::NotFound("Change")),
    }
}

async fn delete_change(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.changes.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Change"))
    }
}

/// Multipart upload of one `file` field; responds with the filename and the
/// `/static` URL to store in `Change.image_url`.
async fn upload_change_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;
        let stored = state.images.save(&filename, &data).await?;
        return Ok(Json(json!({
            "filename": stored.filename,
            "url": stored.url,
        })));
    }
    Err(ApiError::BadRequest("missing 'file' field".to_string()))
}

async fn list_milestones(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.milestones.list(page.skip, page.limit).await?))
}

async fn create_milestone(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewMilestone>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.milestones.create(&draft).await?))
}

async fn get_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state.milestones.find_by_id(id).await? {
        Some(milestone) => Ok(Json(milestone)),
        None => Err(ApiError::NotFound("Milestone")),
    }
}

/// PUT routes through the archival workflow rather than the repository: a
/// false→true edge on `complete` archives the milestone's changes first.
async fn update_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<NewMilestone>,
) -> Result<impl IntoResponse, ApiError> {
    match state.milestone_service.update_milestone(id, &draft).await? {
        Some(milestone) => Ok(Json(milestone)),
        None => Err(ApiError::NotFound("Milestone")),
    }
}

async fn delete_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.milestones.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Milestone"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::{
        InMemoryAppRepository, InMemoryChangeRepository, InMemoryDeploymentRepository,
        InMemoryMilestoneRepository, InMemoryVersionRepository,
    };
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    struct TestApi {
        router: Router,
        _static_dir: tempfile::TempDir,
    }

    fn test_api() -> TestApi {
        let static_dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(
            Arc::new(InMemoryAppRepository::new()),
            Arc::new(InMemoryVersionRepository::new()),
            Arc::new(InMemoryDeploymentRepository::new()),
            Arc::new(InMemoryChangeRepository::new()),
            Arc::new(InMemoryMilestoneRepository::new()),
            ImageStore::new(static_dir.path()),
        ));
        TestApi {
            router: app(state, static_dir.path()),
            _static_dir: static_dir,
        }
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let api = test_api();
        let (status, body) = send(&api.router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn updating_missing_milestone_returns_404() {
        let api = test_api();
        let (status, body) = send(
            &api.router,
            "PUT",
            "/milestones/42",
            Some(json!({ "milestone": "M1", "complete": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Milestone not found");
    }

    #[tokio::test]
    async fn completing_a_milestone_over_http_archives_its_changes() {
        let api = test_api();

        let (status, milestone) = send(
            &api.router,
            "POST",
            "/milestones/",
            Some(json!({ "milestone": "sprint-9", "goal": "polish" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(milestone["complete"], false);

        send(
            &api.router,
            "POST",
            "/deployments/",
            Some(json!({
                "app": "checkout",
                "version": "2.1",
                "milestone": "sprint-9",
                "dtt_deploy": "2026-08-01T10:00:00Z"
            })),
        )
        .await;
        for title in ["one", "two"] {
            let (status, _) = send(
                &api.router,
                "POST",
                "/changes/",
                Some(json!({
                    "app": "checkout",
                    "version": "2.1",
                    "dtt_change": "2026-08-01T09:00:00Z",
                    "change_title": title,
                    "change_desc": "d",
                    "category": "bug"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let id = milestone["id"].as_i64().unwrap();
        let (status, updated) = send(
            &api.router,
            "PUT",
            &format!("/milestones/{}", id),
            Some(json!({ "milestone": "sprint-9", "goal": "polish", "complete": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["complete"], true);

        let (status, archived) =
            send(&api.router, "GET", "/changes/?archived=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(archived.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_current_version_is_rejected_with_409() {
        let api = test_api();
        let payload = |v: &str| {
            json!({
                "app": "checkout",
                "version": v,
                "current": true,
                "major": 1, "minor": 0, "patch": 0
            })
        };

        let (status, _) = send(&api.router, "POST", "/versions/", Some(payload("1.0"))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&api.router, "POST", "/versions/", Some(payload("1.1"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("current version"));
    }

    #[tokio::test]
    async fn delete_returns_204_then_404() {
        let api = test_api();
        let (_, created) = send(
            &api.router,
            "POST",
            "/apps/",
            Some(json!({ "app": "checkout" })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let uri = format!("/apps/{}", id);
        let (status, _) = send(&api.router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&api.router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
