// Panel context - read-mostly server data fetched once per session
use std::sync::Arc;

use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::alphabet::Alphabet;
use crate::domain::geometry::Grid;
use crate::domain::routine::RoutineCatalog;
use crate::domain::translation::TranslationMap;

#[derive(Debug, Clone)]
pub struct PanelContext {
    pub grid: Grid,
    pub alphabet: Alphabet,
    pub translations: TranslationMap,
    pub catalog: Arc<RoutineCatalog>,
}

impl PanelContext {
    pub async fn load(api: &dyn SplitflapApi) -> ApiResult<Self> {
        let (grid, alphabet, translations, catalog) = futures::try_join!(
            api.grid_size(),
            api.alphabet(),
            api.translations(),
            api.routine_catalog(),
        )?;

        for (target, sources) in translations.collisions() {
            tracing::warn!(
                "Translation target {:?} is shared by {:?}; reverse lookup uses the last entry",
                target,
                sources
            );
        }
        tracing::info!(
            "Loaded {}x{} display, {} characters, {} translations, {} routine types",
            grid.width(),
            grid.height(),
            alphabet.len(),
            translations.len(),
            catalog.type_names().count()
        );

        Ok(Self {
            grid,
            alphabet,
            translations,
            catalog: Arc::new(catalog),
        })
    }
}
