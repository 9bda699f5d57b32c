// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::display_session::DisplaySession;
use crate::application::panel_context::PanelContext;
use crate::application::reconciler::DisplayReconciler;
use crate::application::rotation_service::RotationService;
use crate::application::splitflap_api::SplitflapApi;
use crate::application::translation_service::TranslationService;
use crate::infrastructure::config::load_panel_config;
use crate::infrastructure::http_api::HttpSplitflapApi;
use crate::infrastructure::websocket::ConnectionManager;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_panel_config().context("Failed to load config/panel")?;

    // Server client (infrastructure layer)
    let api: Arc<dyn SplitflapApi> = Arc::new(HttpSplitflapApi::new(
        config.server.base_url(),
        Duration::from_millis(config.server.request_timeout_ms),
    )?);
    let context = PanelContext::load(api.as_ref())
        .await
        .context("Failed to load display details from the splitflap server")?;

    // Display session fed by the push connection
    let reconciler = DisplayReconciler::new(
        context.grid,
        context.alphabet.clone(),
        context.translations.clone(),
    );
    let session = DisplaySession::spawn(reconciler, api.clone());
    let connection = ConnectionManager::start(
        config.server.ws_url(),
        Duration::from_millis(config.websocket.reconnect_delay_ms),
    );
    tokio::spawn(session.clone().forward_pushes(connection.subscribe()));

    // Create services (application layer)
    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(api.clone(), context.grid),
        rotation_service: RotationService::new(api.clone()),
        translation_service: TranslationService::new(api.clone(), session.clone()),
        context,
        session,
        connection: connection.clone(),
        builder: Mutex::new(None),
        min_cell_px: config.builder.min_cell_px,
        default_cell_px: config.builder.default_cell_px,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/display", get(get_display))
        .route("/display/cells/:index", put(put_cell))
        .route("/display/navigate", post(navigate))
        .route("/display/commit", post(commit))
        .route("/display/discard", post(discard))
        .route("/display/clear", post(clear_display))
        .route("/display/refresh", post(refresh_display))
        .route("/translations", get(get_translations))
        .route(
            "/translations/:source",
            put(put_translation).delete(delete_translation),
        )
        .route("/routines", get(list_routine_types))
        .route("/dashboards", get(list_dashboards))
        .route("/dashboards/:name", axum::routing::delete(delete_dashboard))
        .route("/dashboards/:name/preview", get(preview_dashboard))
        .route("/dashboards/:name/activate", post(activate_dashboard))
        .route("/rotations", get(list_rotations))
        .route("/rotations/deactivate", post(deactivate_rotations))
        .route("/rotations/:name", post(save_rotation).delete(delete_rotation))
        .route("/rotations/:name/activate", post(activate_rotation))
        .route("/builder", get(get_builder))
        .route("/builder/open", post(open_builder))
        .route("/builder/container", post(resize_builder_container))
        .route("/builder/routines", post(add_builder_routine))
        .route(
            "/builder/routines/:id",
            axum::routing::patch(edit_builder_routine).delete(remove_builder_routine),
        )
        .route("/builder/pointer", post(builder_pointer))
        .route("/builder/save", post(save_builder))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .listen
        .addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen.addr))?;
    tracing::info!("Starting splitflap-panel on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    connection.close();
    Ok(())
}
