// Dashboard builder - editing session for one dashboard's routine layout
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::application::constraint_solver::ConstraintSolver;
use crate::application::drag_resize::{DragResizeController, GestureOutcome, PointerEvent};
use crate::application::preview::{PreviewGrid, render_routines};
use crate::domain::dashboard::Dashboard;
use crate::domain::error::PanelError;
use crate::domain::geometry::{Grid, Location, Rect, Size};
use crate::domain::routine::{Routine, RoutineCatalog};

// Space reserved around the grid inside its container, in pixels
const CONTAINER_PADDING_PX: f64 = 32.0;

/// Largest whole-pixel cell that fits the container, never below `min_cell_px`
pub fn fit_cell_size(container_width: f64, container_height: f64, grid: Grid, min_cell_px: f64) -> f64 {
    let cell_w = ((container_width - CONTAINER_PADDING_PX) / grid.width() as f64).floor();
    let cell_h = ((container_height - CONTAINER_PADDING_PX) / grid.height() as f64).floor();
    cell_w.min(cell_h).max(min_cell_px)
}

#[derive(Debug, Clone, Serialize)]
pub struct BuilderView {
    pub name: String,
    pub cell_size: f64,
    pub selected: Option<String>,
    pub active_gesture: Option<String>,
    pub routines: Vec<Routine>,
    pub preview: PreviewGrid,
}

pub struct DashboardBuilder {
    name: String,
    grid: Grid,
    catalog: Arc<RoutineCatalog>,
    routines: Vec<Routine>,
    selected: Option<String>,
    controller: DragResizeController,
    next_id: u64,
}

impl DashboardBuilder {
    pub fn new(grid: Grid, catalog: Arc<RoutineCatalog>, cell_size: f64) -> Self {
        Self {
            name: String::new(),
            grid,
            catalog,
            routines: Vec::new(),
            selected: None,
            controller: DragResizeController::new(cell_size),
            next_id: 1,
        }
    }

    /// Open an existing dashboard. Routines keep their ids; geometry outside the
    /// grid or its type's size limits is fitted on the way in.
    pub fn from_dashboard(dashboard: Dashboard, grid: Grid, catalog: Arc<RoutineCatalog>, cell_size: f64) -> Self {
        let mut builder = Self::new(grid, catalog, cell_size);
        builder.name = dashboard.name;
        for mut routine in dashboard.routines {
            let rect = builder.solver(&routine.kind).fit(routine.rect());
            routine.location = rect.location;
            routine.size = rect.size;
            builder.routines.push(routine);
        }
        builder.next_id = builder.routines.len() as u64 + 1;
        builder
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn routine(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_cell_size(&mut self, cell_size: f64) {
        self.controller.set_cell_size(cell_size);
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.routine(id).is_some() {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// New routine at the top-left, at its type's minimum size, with default config
    pub fn add_routine(&mut self, kind: &str) -> Result<&Routine, PanelError> {
        let (min_size, config) = match self.catalog.get(kind) {
            Some(info) => (info.size_range.min, info.initial_config()),
            None => return Err(PanelError::not_found(format!("routine type {}", kind))),
        };

        let rect = self.solver(kind).fit(Rect::new(Location::default(), min_size));
        let id = self.allocate_id();
        self.routines.push(Routine {
            id: id.clone(),
            kind: kind.to_string(),
            location: rect.location,
            size: rect.size,
            config,
        });
        self.selected = Some(id);
        tracing::debug!("Added {} routine at {:?}", kind, rect);
        Ok(&self.routines[self.routines.len() - 1])
    }

    /// Removing an unknown id is a no-op
    pub fn remove_routine(&mut self, id: &str) -> bool {
        let before = self.routines.len();
        self.routines.retain(|r| r.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        before != self.routines.len()
    }

    /// Switch type: size grows to the new minimum, geometry is re-fitted and the
    /// config is reseeded from the new type's defaults.
    pub fn change_type(&mut self, id: &str, kind: &str) -> Result<(), PanelError> {
        let info = self
            .catalog
            .get(kind)
            .ok_or_else(|| PanelError::not_found(format!("routine type {}", kind)))?;
        let config = info.initial_config();
        let solver = self.solver(kind);

        let Some(routine) = self.routines.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        if routine.kind == kind {
            return Ok(());
        }
        let rect = solver.fit(routine.rect());
        routine.kind = kind.to_string();
        routine.location = rect.location;
        routine.size = rect.size;
        routine.config = config;
        Ok(())
    }

    pub fn set_config_field(&mut self, id: &str, field: &str, value: Value) {
        if let Some(routine) = self.routines.iter_mut().find(|r| r.id == id) {
            routine.config.insert(field.to_string(), value);
        }
    }

    /// Numeric position edit, clamped like a drag
    pub fn set_location(&mut self, id: &str, x: i64, y: i64) {
        let Some(index) = self.position(id) else {
            return;
        };
        let solver = self.solver(&self.routines[index].kind);
        let routine = &mut self.routines[index];
        routine.location = solver.move_to(x, y, routine.size);
    }

    /// Numeric size edit, clamped like a resize
    pub fn set_size(&mut self, id: &str, width: i64, height: i64) {
        let Some(index) = self.position(id) else {
            return;
        };
        let solver = self.solver(&self.routines[index].kind);
        let routine = &mut self.routines[index];
        routine.size = solver.resize(width, height, routine.location);
    }

    pub fn pointer(&mut self, event: PointerEvent) -> GestureOutcome {
        let outcome = self
            .controller
            .handle(event, &mut self.routines, &self.catalog, self.grid);
        if let GestureOutcome::Started(id) = &outcome {
            self.selected = Some(id.clone());
        }
        outcome
    }

    pub fn preview(&self) -> PreviewGrid {
        render_routines(self.grid, &self.routines)
    }

    pub fn view(&self) -> BuilderView {
        BuilderView {
            name: self.name.clone(),
            cell_size: self.controller.cell_size(),
            selected: self.selected.clone(),
            active_gesture: self.controller.active_routine().map(str::to_string),
            routines: self.routines.clone(),
            preview: self.preview(),
        }
    }

    /// Snapshot for saving; a blank name is rejected
    pub fn to_dashboard(&self) -> Result<Dashboard, PanelError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PanelError::validation("dashboard name is required"));
        }
        Ok(Dashboard::new(name.to_string(), self.routines.clone()))
    }

    fn solver(&self, kind: &str) -> ConstraintSolver {
        ConstraintSolver::new(self.grid, self.catalog.size_range(kind))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.routines.iter().position(|r| r.id == id)
    }

    fn allocate_id(&mut self) -> String {
        loop {
            let id = format!("routine-{}", self.next_id);
            self.next_id += 1;
            if self.routine(&id).is_none() {
                return id;
            }
        }
    }
}
