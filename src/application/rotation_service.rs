// Rotation service - Use cases for timed dashboard rotations
use std::sync::Arc;

use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::dashboard::Rotation;

#[derive(Clone)]
pub struct RotationService {
    api: Arc<dyn SplitflapApi>,
}

impl RotationService {
    pub fn new(api: Arc<dyn SplitflapApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ApiResult<Vec<Rotation>> {
        let mut rotations = self.api.rotations().await?;
        rotations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rotations)
    }

    /// Rejected rotations are never sent
    pub async fn save(&self, rotation: &Rotation) -> ApiResult<()> {
        rotation.validate()?;
        self.api.save_rotation(rotation).await?;
        tracing::info!(
            "Saved rotation {} ({} dashboards, {}s cycle)",
            rotation.name,
            rotation.entries.len(),
            rotation.total_duration_secs()
        );
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> ApiResult<()> {
        self.api.delete_rotation(name).await?;
        tracing::info!("Deleted rotation {}", name);
        Ok(())
    }

    pub async fn activate(&self, name: &str) -> ApiResult<()> {
        self.api.activate_rotation(name).await?;
        tracing::info!("Activated rotation {}", name);
        Ok(())
    }

    pub async fn deactivate_all(&self) -> ApiResult<()> {
        self.api.deactivate_rotations().await?;
        tracing::info!("Deactivated rotations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::splitflap_api::testing::FakeApi;
    use crate::domain::alphabet::Alphabet;
    use crate::domain::dashboard::RotationEntry;
    use crate::domain::error::PanelError;
    use crate::domain::geometry::Grid;
    use crate::domain::translation::TranslationMap;

    fn service() -> (Arc<FakeApi>, RotationService) {
        let api = Arc::new(FakeApi::new(
            Grid::new(4, 1).unwrap(),
            Alphabet::default(),
            TranslationMap::default(),
        ));
        (api.clone(), RotationService::new(api))
    }

    fn rotation(name: &str, durations: &[u64]) -> Rotation {
        Rotation::new(
            name.to_string(),
            durations
                .iter()
                .enumerate()
                .map(|(i, d)| RotationEntry {
                    dashboard: format!("dash{}", i),
                    duration_secs: *d,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_invalid_rotation_is_not_sent() {
        let (api, service) = service();
        let err = service.save(&rotation("morning", &[30, 0])).await.unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
        assert!(api.rotations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_list_sorted() {
        let (_, service) = service();
        service.save(&rotation("night", &[60])).await.unwrap();
        service.save(&rotation("day", &[30, 30])).await.unwrap();
        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["day".to_string(), "night".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_and_deactivate() {
        let (api, service) = service();
        service.activate("day").await.unwrap();
        service.deactivate_all().await.unwrap();
        assert_eq!(
            api.activated.lock().unwrap().as_slice(),
            ["rotation:day".to_string(), "deactivate".to_string()]
        );
        assert!(matches!(service.delete("day").await, Err(PanelError::NotFound(_))));
    }
}
