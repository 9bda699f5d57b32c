// Translation service - edits the server's translation map and keeps the live display in step
use serde::Serialize;
use std::sync::Arc;

use crate::application::display_session::DisplaySessionHandle;
use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::error::PanelError;
use crate::domain::translation::TranslationMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationEntry {
    pub source: char,
    pub target: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationCollision {
    pub target: char,
    pub sources: Vec<char>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationTable {
    pub entries: Vec<TranslationEntry>,
    /// Targets with more than one source; reverse lookup is ambiguous for these
    pub collisions: Vec<TranslationCollision>,
}

impl From<&TranslationMap> for TranslationTable {
    fn from(map: &TranslationMap) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(source, target)| TranslationEntry { source, target })
                .collect(),
            collisions: map
                .collisions()
                .into_iter()
                .map(|(target, sources)| TranslationCollision { target, sources })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct TranslationService {
    api: Arc<dyn SplitflapApi>,
    session: DisplaySessionHandle,
}

impl TranslationService {
    pub fn new(api: Arc<dyn SplitflapApi>, session: DisplaySessionHandle) -> Self {
        Self { api, session }
    }

    pub async fn table(&self) -> ApiResult<TranslationTable> {
        let map = self.api.translations().await?;
        Ok(TranslationTable::from(&map))
    }

    /// Add or replace `source -> target`. Validation happens before anything is sent.
    pub async fn set(&self, source: &str, target: &str) -> ApiResult<TranslationTable> {
        let mut map = self.api.translations().await?;
        map.insert(source, target)?;
        self.store(map).await
    }

    pub async fn remove(&self, source: char) -> ApiResult<TranslationTable> {
        let mut map = self.api.translations().await?;
        map.remove(source)
            .ok_or_else(|| PanelError::not_found(format!("translation for {:?}", source)))?;
        self.store(map).await
    }

    async fn store(&self, map: TranslationMap) -> ApiResult<TranslationTable> {
        self.api.save_translations(&map).await?;
        let table = TranslationTable::from(&map);
        tracing::info!("Saved {} translations", table.entries.len());
        self.session.replace_translations(map).await?;
        Ok(table)
    }
}
