// Splitflap server client - reqwest implementation of the SplitflapApi port
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::alphabet::Alphabet;
use crate::domain::dashboard::{Dashboard, Rotation};
use crate::domain::error::PanelError;
use crate::domain::geometry::Grid;
use crate::domain::routine::RoutineCatalog;
use crate::domain::translation::TranslationMap;
use crate::infrastructure::wire::{
    self, UpdateDisplayRequest, WireDashboard, WireRotation, WireRoutineInfo, WireSize,
};

#[derive(Debug, Clone)]
pub struct HttpSplitflapApi {
    base_url: String,
    client: reqwest::Client,
}

fn network(e: anyhow::Error) -> PanelError {
    PanelError::Network(format!("{:#}", e))
}

fn status_error(status: StatusCode, what: &str, body: &str) -> PanelError {
    let message = if body.trim().is_empty() {
        format!("{} failed with status {}", what, status)
    } else {
        format!("{} failed with status {}: {}", what, status, body.trim())
    };
    match status {
        StatusCode::NOT_FOUND => PanelError::NotFound(message),
        StatusCode::CONFLICT => PanelError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => PanelError::Validation(message),
        _ => PanelError::Network(message),
    }
}

impl HttpSplitflapApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn named(&self, collection: &str, name: &str, suffix: &str) -> String {
        self.url(&format!("/{}/{}{}", collection, urlencoding::encode(name), suffix))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach splitflap server for {}", what))
            .map_err(network)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("{} returned {}", what, status);
        Err(status_error(status, what, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> ApiResult<T> {
        let response = self.send(self.client.get(self.url(path)), what).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
            .map_err(network)
    }

    async fn post_empty(&self, url: String, what: &str) -> ApiResult<()> {
        self.send(self.client.post(url).json(&Value::Object(Map::new())), what)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SplitflapApi for HttpSplitflapApi {
    async fn grid_size(&self) -> ApiResult<Grid> {
        let size: WireSize = self.get_json("/display/size", "display size").await?;
        let width = u32::try_from(size.width).unwrap_or(0);
        let height = u32::try_from(size.height).unwrap_or(0);
        Grid::new(width, height)
    }

    async fn alphabet(&self) -> ApiResult<Alphabet> {
        let codes: Vec<i64> = self.get_json("/display/alphabet", "alphabet").await?;
        Ok(wire::alphabet_from_wire(&codes))
    }

    async fn translations(&self) -> ApiResult<TranslationMap> {
        let raw: Option<Map<String, Value>> = self.get_json("/display/translations", "translations").await?;
        Ok(wire::translations_from_wire(&raw.unwrap_or_default()))
    }

    async fn save_translations(&self, translations: &TranslationMap) -> ApiResult<()> {
        let body = wire::translations_to_wire(translations);
        self.send(
            self.client.post(self.url("/display/translations")).json(&body),
            "save translations",
        )
        .await?;
        Ok(())
    }

    async fn dashboards(&self) -> ApiResult<Vec<Dashboard>> {
        let raw: Option<HashMap<String, WireDashboard>> = self.get_json("/dashboards", "dashboards").await?;
        Ok(wire::dashboards_from_wire(raw.unwrap_or_default()))
    }

    async fn save_dashboard(&self, dashboard: &Dashboard) -> ApiResult<()> {
        let body = wire::dashboard_to_wire(dashboard);
        let url = self.named("dashboards", &dashboard.name, "");
        self.send(self.client.post(url).json(&body), "save dashboard").await?;
        Ok(())
    }

    async fn delete_dashboard(&self, name: &str) -> ApiResult<()> {
        let url = self.named("dashboards", name, "");
        self.send(self.client.delete(url), "delete dashboard").await?;
        Ok(())
    }

    async fn activate_dashboard(&self, name: &str) -> ApiResult<()> {
        self.post_empty(self.named("dashboards", name, "/activate"), "activate dashboard")
            .await
    }

    async fn rotations(&self) -> ApiResult<Vec<Rotation>> {
        let raw: Option<HashMap<String, WireRotation>> = self.get_json("/rotations", "rotations").await?;
        Ok(wire::rotations_from_wire(raw.unwrap_or_default()))
    }

    async fn save_rotation(&self, rotation: &Rotation) -> ApiResult<()> {
        let body = wire::rotation_to_wire(rotation);
        let url = self.named("rotations", &rotation.name, "");
        self.send(self.client.post(url).json(&body), "save rotation").await?;
        Ok(())
    }

    async fn delete_rotation(&self, name: &str) -> ApiResult<()> {
        let url = self.named("rotations", name, "");
        self.send(self.client.delete(url), "delete rotation").await?;
        Ok(())
    }

    async fn activate_rotation(&self, name: &str) -> ApiResult<()> {
        self.post_empty(self.named("rotations", name, "/activate"), "activate rotation")
            .await
    }

    async fn deactivate_rotations(&self) -> ApiResult<()> {
        self.post_empty(self.url("/rotations/deactivate"), "deactivate rotations")
            .await
    }

    async fn routine_catalog(&self) -> ApiResult<RoutineCatalog> {
        let raw: HashMap<String, WireRoutineInfo> = self.get_json("/routines", "routine catalog").await?;
        Ok(wire::catalog_from_wire(raw))
    }

    async fn update_display(&self, text: &str) -> ApiResult<()> {
        self.send(
            self.client
                .post(self.url("/display/update"))
                .json(&UpdateDisplayRequest { text }),
            "display update",
        )
        .await?;
        Ok(())
    }

    async fn clear_display(&self) -> ApiResult<()> {
        self.post_empty(self.url("/display/clear"), "clear display").await
    }
}
