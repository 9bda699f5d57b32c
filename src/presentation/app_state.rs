// Application state for HTTP handlers
use tokio::sync::Mutex;

use crate::application::dashboard_builder::DashboardBuilder;
use crate::application::dashboard_service::DashboardService;
use crate::application::display_session::DisplaySessionHandle;
use crate::application::panel_context::PanelContext;
use crate::application::rotation_service::RotationService;
use crate::application::translation_service::TranslationService;
use crate::infrastructure::websocket::ConnectionHandle;

pub struct AppState {
    pub context: PanelContext,
    pub session: DisplaySessionHandle,
    pub connection: ConnectionHandle,
    pub dashboard_service: DashboardService,
    pub rotation_service: RotationService,
    pub translation_service: TranslationService,
    /// At most one open builder; handlers take the lock for a whole edit
    pub builder: Mutex<Option<DashboardBuilder>>,
    pub min_cell_px: f64,
    pub default_cell_px: f64,
}
