// Port to the splitflap server - request/response calls the engines depend on
use async_trait::async_trait;

use crate::domain::alphabet::Alphabet;
use crate::domain::dashboard::{Dashboard, Rotation};
use crate::domain::error::PanelError;
use crate::domain::geometry::Grid;
use crate::domain::routine::RoutineCatalog;
use crate::domain::translation::TranslationMap;

pub type ApiResult<T> = Result<T, PanelError>;

#[async_trait]
pub trait SplitflapApi: Send + Sync {
    /// Fixed dimensions of the physical display
    async fn grid_size(&self) -> ApiResult<Grid>;

    /// Renderable characters (space is added by the alphabet itself)
    async fn alphabet(&self) -> ApiResult<Alphabet>;

    async fn translations(&self) -> ApiResult<TranslationMap>;

    async fn save_translations(&self, translations: &TranslationMap) -> ApiResult<()>;

    /// All dashboards, sorted by name
    async fn dashboards(&self) -> ApiResult<Vec<Dashboard>>;

    async fn save_dashboard(&self, dashboard: &Dashboard) -> ApiResult<()>;

    async fn delete_dashboard(&self, name: &str) -> ApiResult<()>;

    async fn activate_dashboard(&self, name: &str) -> ApiResult<()>;

    /// All rotations, sorted by name
    async fn rotations(&self) -> ApiResult<Vec<Rotation>>;

    async fn save_rotation(&self, rotation: &Rotation) -> ApiResult<()>;

    async fn delete_rotation(&self, name: &str) -> ApiResult<()>;

    async fn activate_rotation(&self, name: &str) -> ApiResult<()>;

    async fn deactivate_rotations(&self) -> ApiResult<()>;

    /// Routine types with their parameters and size limits
    async fn routine_catalog(&self) -> ApiResult<RoutineCatalog>;

    /// Replace the display content; `text` is at most `width*height` characters
    async fn update_display(&self, text: &str) -> ApiResult<()>;

    async fn clear_display(&self) -> ApiResult<()>;
}
