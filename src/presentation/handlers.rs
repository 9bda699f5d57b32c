// HTTP request handlers
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::application::dashboard_builder::{fit_cell_size, BuilderView, DashboardBuilder};
use crate::application::dashboard_service::DashboardPreview;
use crate::application::drag_resize::PointerEvent;
use crate::application::preview::display_rows;
use crate::application::reconciler::{DisplaySnapshot, NavKey};
use crate::application::translation_service::TranslationTable;
use crate::domain::dashboard::{Dashboard, Rotation, RotationEntry};
use crate::domain::error::PanelError;
use crate::domain::geometry::Size;
use crate::domain::routine::Parameter;
use crate::infrastructure::websocket::ConnectionState;
use crate::presentation::app_state::AppState;

type AppResult<T> = Result<Json<T>, ApiError>;

pub struct ApiError(PanelError);

impl From<PanelError> for ApiError {
    fn from(e: PanelError) -> Self {
        Self(e)
    }
}

fn status_for(error: &PanelError) -> StatusCode {
    match error {
        PanelError::Validation(_) => StatusCode::BAD_REQUEST,
        PanelError::NotFound(_) => StatusCode::NOT_FOUND,
        PanelError::Conflict(_) => StatusCode::CONFLICT,
        PanelError::Network(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::BAD_GATEWAY {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

// ---- live display ----

#[derive(Serialize)]
pub struct DisplayView {
    pub connection: ConnectionState,
    pub rows: Vec<String>,
    #[serde(flatten)]
    pub snapshot: DisplaySnapshot,
}

fn display_view(state: &AppState, snapshot: DisplaySnapshot) -> Json<DisplayView> {
    Json(DisplayView {
        connection: state.connection.state(),
        rows: display_rows(state.context.grid, &snapshot.cells),
        snapshot,
    })
}

pub async fn get_display(State(state): State<Arc<AppState>>) -> AppResult<DisplayView> {
    let snapshot = state.session.snapshot().await?;
    Ok(display_view(&state, snapshot))
}

#[derive(Deserialize)]
pub struct CellInput {
    pub text: String,
}

pub async fn put_cell(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CellInput>,
) -> AppResult<DisplayView> {
    let snapshot = state.session.input(index, body.text).await?;
    Ok(display_view(&state, snapshot))
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    pub index: usize,
    pub key: NavKey,
}

pub async fn navigate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NavigateRequest>,
) -> AppResult<DisplayView> {
    let snapshot = state.session.navigate(body.index, body.key).await?;
    Ok(display_view(&state, snapshot))
}

pub async fn commit(State(state): State<Arc<AppState>>) -> AppResult<DisplayView> {
    let snapshot = state.session.commit().await?;
    Ok(display_view(&state, snapshot))
}

pub async fn discard(State(state): State<Arc<AppState>>) -> AppResult<DisplayView> {
    let snapshot = state.session.discard().await?;
    Ok(display_view(&state, snapshot))
}

pub async fn clear_display(State(state): State<Arc<AppState>>) -> AppResult<Value> {
    state.session.clear().await?;
    Ok(ok())
}

pub async fn refresh_display(State(state): State<Arc<AppState>>) -> Json<Value> {
    let requested = state.connection.request_state();
    Json(json!({ "requested": requested, "connection": state.connection.state() }))
}

// ---- translations ----

pub async fn get_translations(State(state): State<Arc<AppState>>) -> AppResult<TranslationTable> {
    Ok(Json(state.translation_service.table().await?))
}

#[derive(Deserialize)]
pub struct TranslationTarget {
    pub target: String,
}

pub async fn put_translation(
    Path(source): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<TranslationTarget>,
) -> AppResult<TranslationTable> {
    Ok(Json(state.translation_service.set(&source, &body.target).await?))
}

pub async fn delete_translation(
    Path(source): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<TranslationTable> {
    let mut chars = source.chars();
    let source = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(PanelError::validation("source must be a single character").into()),
    };
    Ok(Json(state.translation_service.remove(source).await?))
}

// ---- routine catalog ----

#[derive(Serialize)]
pub struct RoutineTypeView {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Vec<Parameter>,
    pub min_size: Size,
    pub max_size: Option<Size>,
}

pub async fn list_routine_types(State(state): State<Arc<AppState>>) -> Json<Vec<RoutineTypeView>> {
    let catalog = &state.context.catalog;
    let types = catalog
        .type_names()
        .filter_map(|name| catalog.get(name).map(|info| (name, info)))
        .map(|(name, info)| RoutineTypeView {
            kind: name.to_string(),
            parameters: info.parameters.clone(),
            min_size: info.size_range.min,
            max_size: (info.size_range.max.width != u32::MAX || info.size_range.max.height != u32::MAX)
                .then_some(info.size_range.max),
        })
        .collect();
    Json(types)
}

// ---- dashboards ----

pub async fn list_dashboards(State(state): State<Arc<AppState>>) -> AppResult<Vec<Dashboard>> {
    Ok(Json(state.dashboard_service.list().await?))
}

pub async fn preview_dashboard(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<DashboardPreview> {
    Ok(Json(state.dashboard_service.preview(&name).await?))
}

pub async fn activate_dashboard(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Value> {
    state.dashboard_service.activate(&name).await?;
    Ok(ok())
}

pub async fn delete_dashboard(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Value> {
    state.dashboard_service.delete(&name).await?;
    Ok(ok())
}

// ---- rotations ----

pub async fn list_rotations(State(state): State<Arc<AppState>>) -> AppResult<Vec<Rotation>> {
    Ok(Json(state.rotation_service.list().await?))
}

#[derive(Deserialize)]
pub struct RotationEntryBody {
    pub dashboard: String,
    pub duration_secs: u64,
}

#[derive(Deserialize)]
pub struct RotationBody {
    #[serde(default)]
    pub entries: Vec<RotationEntryBody>,
}

pub async fn save_rotation(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RotationBody>,
) -> AppResult<Value> {
    let entries = body
        .entries
        .into_iter()
        .map(|e| RotationEntry {
            dashboard: e.dashboard,
            duration_secs: e.duration_secs,
        })
        .collect();
    state.rotation_service.save(&Rotation::new(name, entries)).await?;
    Ok(ok())
}

pub async fn activate_rotation(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Value> {
    state.rotation_service.activate(&name).await?;
    Ok(ok())
}

pub async fn delete_rotation(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Value> {
    state.rotation_service.delete(&name).await?;
    Ok(ok())
}

pub async fn deactivate_rotations(State(state): State<Arc<AppState>>) -> AppResult<Value> {
    state.rotation_service.deactivate_all().await?;
    Ok(ok())
}

// ---- dashboard builder ----

#[derive(Deserialize, Default)]
pub struct ContainerSize {
    pub container_width: Option<f64>,
    pub container_height: Option<f64>,
}

impl ContainerSize {
    fn cell_size(&self, state: &AppState) -> f64 {
        match (self.container_width, self.container_height) {
            (Some(w), Some(h)) => fit_cell_size(w, h, state.context.grid, state.min_cell_px),
            _ => state.default_cell_px,
        }
    }
}

#[derive(Deserialize)]
pub struct OpenBuilder {
    /// Existing dashboard to edit; a fresh one when absent
    pub name: Option<String>,
    #[serde(flatten)]
    pub container: ContainerSize,
}

fn no_builder() -> ApiError {
    PanelError::not_found("no dashboard is open in the builder").into()
}

pub async fn open_builder(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OpenBuilder>,
) -> AppResult<BuilderView> {
    let cell_size = body.container.cell_size(&state);
    let grid = state.context.grid;
    let catalog = state.context.catalog.clone();
    let builder = match &body.name {
        Some(name) => {
            let dashboard = state.dashboard_service.get(name).await?;
            DashboardBuilder::from_dashboard(dashboard, grid, catalog, cell_size)
        }
        None => DashboardBuilder::new(grid, catalog, cell_size),
    };
    let view = builder.view();
    *state.builder.lock().await = Some(builder);
    Ok(Json(view))
}

pub async fn get_builder(State(state): State<Arc<AppState>>) -> AppResult<BuilderView> {
    let guard = state.builder.lock().await;
    let builder = guard.as_ref().ok_or_else(no_builder)?;
    Ok(Json(builder.view()))
}

pub async fn resize_builder_container(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContainerSize>,
) -> AppResult<BuilderView> {
    let cell_size = body.cell_size(&state);
    let mut guard = state.builder.lock().await;
    let builder = guard.as_mut().ok_or_else(no_builder)?;
    builder.set_cell_size(cell_size);
    Ok(Json(builder.view()))
}

#[derive(Deserialize)]
pub struct AddRoutine {
    #[serde(rename = "type")]
    pub kind: String,
}

pub async fn add_builder_routine(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddRoutine>,
) -> AppResult<BuilderView> {
    let mut guard = state.builder.lock().await;
    let builder = guard.as_mut().ok_or_else(no_builder)?;
    builder.add_routine(&body.kind)?;
    Ok(Json(builder.view()))
}

#[derive(Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

#[derive(Deserialize)]
pub struct Dimensions {
    pub width: i64,
    pub height: i64,
}

/// Field edits from the routine editor panel; applied in declaration order
#[derive(Deserialize)]
pub struct RoutineEdit {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub location: Option<Coordinates>,
    pub size: Option<Dimensions>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

pub async fn edit_builder_routine(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(edit): Json<RoutineEdit>,
) -> AppResult<BuilderView> {
    let mut guard = state.builder.lock().await;
    let builder = guard.as_mut().ok_or_else(no_builder)?;
    if !builder.select(&id) {
        return Err(PanelError::not_found(format!("routine {}", id)).into());
    }
    if let Some(kind) = &edit.kind {
        builder.change_type(&id, kind)?;
    }
    if let Some(location) = edit.location {
        builder.set_location(&id, location.x, location.y);
    }
    if let Some(size) = edit.size {
        builder.set_size(&id, size.width, size.height);
    }
    for (field, value) in edit.config {
        builder.set_config_field(&id, &field, value);
    }
    Ok(Json(builder.view()))
}

pub async fn remove_builder_routine(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<BuilderView> {
    let mut guard = state.builder.lock().await;
    let builder = guard.as_mut().ok_or_else(no_builder)?;
    if !builder.remove_routine(&id) {
        return Err(PanelError::not_found(format!("routine {}", id)).into());
    }
    Ok(Json(builder.view()))
}

pub async fn builder_pointer(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> AppResult<BuilderView> {
    let mut guard = state.builder.lock().await;
    let builder = guard.as_mut().ok_or_else(no_builder)?;
    let outcome = builder.pointer(event);
    tracing::debug!("Pointer event: {:?}", outcome);
    Ok(Json(builder.view()))
}

#[derive(Deserialize, Default)]
pub struct SaveBuilder {
    pub name: Option<String>,
}

pub async fn save_builder(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveBuilder>,
) -> AppResult<Value> {
    let dashboard = {
        let mut guard = state.builder.lock().await;
        let builder = guard.as_mut().ok_or_else(no_builder)?;
        if let Some(name) = body.name {
            builder.set_name(name);
        }
        builder.to_dashboard()?
    };
    state.dashboard_service.save(&dashboard).await?;
    Ok(Json(json!({ "status": "ok", "name": dashboard.name })))
}
