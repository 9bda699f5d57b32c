// Dashboard service - Use cases for listing, previewing and activating dashboards
use serde::Serialize;
use std::sync::Arc;

use crate::application::preview::{PreviewGrid, render_routines};
use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::dashboard::Dashboard;
use crate::domain::error::PanelError;
use crate::domain::geometry::Grid;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPreview {
    pub name: String,
    pub rows: Vec<String>,
    pub grid: PreviewGrid,
}

#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn SplitflapApi>,
    grid: Grid,
}

impl DashboardService {
    pub fn new(api: Arc<dyn SplitflapApi>, grid: Grid) -> Self {
        Self { api, grid }
    }

    /// Dashboards sorted by name
    pub async fn list(&self) -> ApiResult<Vec<Dashboard>> {
        let mut dashboards = self.api.dashboards().await?;
        dashboards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dashboards)
    }

    pub async fn get(&self, name: &str) -> ApiResult<Dashboard> {
        self.api
            .dashboards()
            .await?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| PanelError::not_found(format!("dashboard {}", name)))
    }

    pub async fn preview(&self, name: &str) -> ApiResult<DashboardPreview> {
        let dashboard = self.get(name).await?;
        let grid = render_routines(self.grid, &dashboard.routines);
        Ok(DashboardPreview {
            name: dashboard.name,
            rows: grid.rows(),
            grid,
        })
    }

    pub async fn save(&self, dashboard: &Dashboard) -> ApiResult<()> {
        if dashboard.name.trim().is_empty() {
            return Err(PanelError::validation("dashboard name is required"));
        }
        self.api.save_dashboard(dashboard).await?;
        tracing::info!("Saved dashboard {} ({} routines)", dashboard.name, dashboard.routines.len());
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> ApiResult<()> {
        self.api.delete_dashboard(name).await?;
        tracing::info!("Deleted dashboard {}", name);
        Ok(())
    }

    pub async fn activate(&self, name: &str) -> ApiResult<()> {
        self.api.activate_dashboard(name).await?;
        tracing::info!("Activated dashboard {}", name);
        Ok(())
    }
}
