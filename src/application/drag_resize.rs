// Drag/resize controller - turns pointer gestures into clamped routine geometry
use serde::Deserialize;

use crate::application::constraint_solver::ConstraintSolver;
use crate::domain::geometry::{Grid, Location, Size};
use crate::domain::routine::{Routine, RoutineCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Drag,
    Resize,
}

/// Pointer positions are in pixels, relative to any fixed origin
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PointerEvent {
    Down {
        routine_id: String,
        kind: GestureKind,
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    Started(String),
    Updated(String),
    Ended(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    routine_id: String,
    origin: (f64, f64),
    initial_location: Location,
    initial_size: Size,
    last_delta: (i64, i64),
}

#[derive(Debug, Clone, PartialEq)]
enum GestureState {
    Idle,
    Dragging(Gesture),
    Resizing(Gesture),
}

/// One gesture at a time: `Idle -> Dragging -> Idle` or `Idle -> Resizing -> Idle`.
#[derive(Debug, Clone)]
pub struct DragResizeController {
    state: GestureState,
    cell_size: f64,
}

impl DragResizeController {
    pub fn new(cell_size: f64) -> Self {
        Self {
            state: GestureState::Idle,
            cell_size,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn set_cell_size(&mut self, cell_size: f64) {
        self.cell_size = cell_size;
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Routine currently being dragged or resized
    pub fn active_routine(&self) -> Option<&str> {
        match &self.state {
            GestureState::Idle => None,
            GestureState::Dragging(g) | GestureState::Resizing(g) => Some(&g.routine_id),
        }
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        routines: &mut [Routine],
        catalog: &RoutineCatalog,
        grid: Grid,
    ) -> GestureOutcome {
        match event {
            PointerEvent::Down { routine_id, kind, x, y } => self.start(routine_id, kind, (x, y), routines),
            PointerEvent::Move { x, y } => self.update((x, y), routines, catalog, grid),
            PointerEvent::Up => self.finish(),
        }
    }

    fn start(
        &mut self,
        routine_id: String,
        kind: GestureKind,
        origin: (f64, f64),
        routines: &[Routine],
    ) -> GestureOutcome {
        if !self.is_idle() {
            tracing::debug!("Ignoring gesture on {} while another is active", routine_id);
            return GestureOutcome::Ignored;
        }
        let Some(routine) = routines.iter().find(|r| r.id == routine_id) else {
            return GestureOutcome::Ignored;
        };

        let gesture = Gesture {
            routine_id: routine_id.clone(),
            origin,
            initial_location: routine.location,
            initial_size: routine.size,
            last_delta: (0, 0),
        };
        self.state = match kind {
            GestureKind::Drag => GestureState::Dragging(gesture),
            GestureKind::Resize => GestureState::Resizing(gesture),
        };
        GestureOutcome::Started(routine_id)
    }

    fn update(
        &mut self,
        pointer: (f64, f64),
        routines: &mut [Routine],
        catalog: &RoutineCatalog,
        grid: Grid,
    ) -> GestureOutcome {
        let cell_size = self.cell_size;
        let (gesture, dragging) = match &mut self.state {
            GestureState::Idle => return GestureOutcome::Ignored,
            GestureState::Dragging(g) => (g, true),
            GestureState::Resizing(g) => (g, false),
        };

        let delta = (
            cell_delta(pointer.0 - gesture.origin.0, cell_size),
            cell_delta(pointer.1 - gesture.origin.1, cell_size),
        );
        if delta == gesture.last_delta {
            return GestureOutcome::Ignored;
        }

        // routine may have been deleted mid-gesture
        let Some(routine) = routines.iter_mut().find(|r| r.id == gesture.routine_id) else {
            return GestureOutcome::Ignored;
        };
        gesture.last_delta = delta;

        let solver = ConstraintSolver::new(grid, catalog.size_range(&routine.kind));
        if dragging {
            routine.location = solver.move_to(
                (gesture.initial_location.x as i64).saturating_add(delta.0),
                (gesture.initial_location.y as i64).saturating_add(delta.1),
                routine.size,
            );
        } else {
            routine.size = solver.resize(
                (gesture.initial_size.width as i64).saturating_add(delta.0),
                (gesture.initial_size.height as i64).saturating_add(delta.1),
                routine.location,
            );
        }
        tracing::debug!(
            "Routine {} now at ({}, {}) size {}x{}",
            routine.id,
            routine.location.x,
            routine.location.y,
            routine.size.width,
            routine.size.height
        );
        GestureOutcome::Updated(routine.id.clone())
    }

    fn finish(&mut self) -> GestureOutcome {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Idle => GestureOutcome::Ignored,
            GestureState::Dragging(g) | GestureState::Resizing(g) => GestureOutcome::Ended(g.routine_id),
        }
    }
}

/// Pixel delta to whole cells, rounded to nearest with exact halves going toward
/// zero (35px at 10px/cell is 3 cells, -35px is -3). A non-positive cell size moves nothing.
fn cell_delta(pixels: f64, cell_size: f64) -> i64 {
    if cell_size.is_nan() || cell_size <= 0.0 || !pixels.is_finite() {
        return 0;
    }
    let cells = pixels / cell_size;
    if (cells - cells.trunc()).abs() == 0.5 {
        cells.trunc() as i64
    } else {
        cells.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::SizeRange;
    use crate::domain::routine::RoutineInfo;
    use serde_json::Map;
    use std::collections::BTreeMap;

    fn catalog() -> RoutineCatalog {
        let mut types = BTreeMap::new();
        types.insert(
            "TEXT".to_string(),
            RoutineInfo {
                size_range: SizeRange::from_bounds(Some(Size::new(1, 1)), Some(Size::new(5, 2))),
                ..Default::default()
            },
        );
        RoutineCatalog::new(types)
    }

    fn routine(id: &str, x: u32, y: u32, width: u32, height: u32) -> Routine {
        Routine {
            id: id.to_string(),
            kind: "TEXT".to_string(),
            location: Location::new(x, y),
            size: Size::new(width, height),
            config: Map::new(),
        }
    }

    fn down(id: &str, kind: GestureKind) -> PointerEvent {
        PointerEvent::Down {
            routine_id: id.to_string(),
            kind,
            x: 100.0,
            y: 100.0,
        }
    }

    fn move_by(dx: f64, dy: f64) -> PointerEvent {
        PointerEvent::Move {
            x: 100.0 + dx,
            y: 100.0 + dy,
        }
    }

    #[test]
    fn test_drag_rounds_to_nearest_cell() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 0, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        assert_eq!(
            controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid),
            GestureOutcome::Started("a".to_string())
        );
        controller.handle(move_by(35.0, 0.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(3, 0));

        controller.handle(PointerEvent::Up, &mut routines, &catalog, grid);
        assert!(controller.is_idle());
        assert_eq!(routines[0].location, Location::new(3, 0));
    }

    #[test]
    fn test_drag_is_clamped_to_grid() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 0, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        controller.handle(move_by(500.0, -80.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(8, 0));
    }

    #[test]
    fn test_huge_pointer_deltas_saturate_at_grid_edges() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 3, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        controller.handle(PointerEvent::Move { x: 1e300, y: 1e300 }, &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(8, 3));
        controller.handle(PointerEvent::Move { x: -1e300, y: -1e300 }, &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(0, 0));
        controller.handle(PointerEvent::Up, &mut routines, &catalog, grid);

        let mut tiny = DragResizeController::new(1e-300);
        tiny.handle(down("a", GestureKind::Resize), &mut routines, &catalog, grid);
        tiny.handle(move_by(10.0, 10.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].size, Size::new(5, 2));
        tiny.handle(move_by(-10.0, -10.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].size, Size::new(1, 1));
    }

    #[test]
    fn test_resize_limited_by_room_and_type_max() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 6, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Resize), &mut routines, &catalog, grid);
        controller.handle(move_by(60.0, 40.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].size, Size::new(4, 2));
        assert_eq!(routines[0].location, Location::new(6, 0));
    }

    #[test]
    fn test_returning_to_origin_restores_geometry() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 2, 1, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        controller.handle(move_by(20.0, 10.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(4, 2));
        controller.handle(move_by(1.0, -2.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(2, 1));
    }

    #[test]
    fn test_unchanged_delta_and_tiny_moves_are_ignored() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 0, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        assert_eq!(
            controller.handle(move_by(4.0, 4.0), &mut routines, &catalog, grid),
            GestureOutcome::Ignored
        );
        assert_eq!(
            controller.handle(move_by(12.0, 0.0), &mut routines, &catalog, grid),
            GestureOutcome::Updated("a".to_string())
        );
        assert_eq!(
            controller.handle(move_by(13.0, 2.0), &mut routines, &catalog, grid),
            GestureOutcome::Ignored
        );
    }

    #[test]
    fn test_cell_delta_rounding() {
        assert_eq!(cell_delta(35.0, 10.0), 3);
        assert_eq!(cell_delta(-35.0, 10.0), -3);
        assert_eq!(cell_delta(36.0, 10.0), 4);
        assert_eq!(cell_delta(-14.0, 10.0), -1);
        assert_eq!(cell_delta(4.9, 10.0), 0);
        assert_eq!(cell_delta(50.0, 0.0), 0);
    }

    #[test]
    fn test_zero_cell_size_never_moves() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 1, 1, 2, 1)];
        let mut controller = DragResizeController::new(0.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        controller.handle(move_by(300.0, 300.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(1, 1));
    }

    #[test]
    fn test_only_one_gesture_at_a_time() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 0, 0, 2, 1), routine("b", 0, 2, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        assert_eq!(
            controller.handle(down("b", GestureKind::Resize), &mut routines, &catalog, grid),
            GestureOutcome::Ignored
        );
        controller.handle(move_by(30.0, 0.0), &mut routines, &catalog, grid);
        assert_eq!(routines[0].location, Location::new(3, 0));
        assert_eq!(routines[1].location, Location::new(0, 2));
        assert_eq!(routines[1].size, Size::new(2, 1));
    }

    #[test]
    fn test_missing_routine_is_a_no_op() {
        let grid = Grid::new(10, 4).unwrap();
        let catalog = catalog();
        let mut routines = vec![routine("a", 0, 0, 2, 1)];
        let mut controller = DragResizeController::new(10.0);

        assert_eq!(
            controller.handle(down("ghost", GestureKind::Drag), &mut routines, &catalog, grid),
            GestureOutcome::Ignored
        );
        assert!(controller.is_idle());

        controller.handle(down("a", GestureKind::Drag), &mut routines, &catalog, grid);
        routines.clear();
        assert_eq!(
            controller.handle(move_by(30.0, 0.0), &mut routines, &catalog, grid),
            GestureOutcome::Ignored
        );
        assert_eq!(
            controller.handle(PointerEvent::Up, &mut routines, &catalog, grid),
            GestureOutcome::Ended("a".to_string())
        );
    }
}
