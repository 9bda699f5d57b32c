// Constraint solver - legal position and size ranges for one routine
use crate::domain::geometry::{Grid, Location, Rect, Size, SizeRange};

/// Clamps proposed geometry for a routine of a given type onto the grid.
///
/// Every result satisfies `location + size <= grid` on both axes. The type's
/// min/max is honoured whenever the grid leaves room for it; when the room
/// left from `location` is smaller than the type's minimum, the grid bound wins.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintSolver {
    grid: Grid,
    range: SizeRange,
}

impl ConstraintSolver {
    pub fn new(grid: Grid, range: SizeRange) -> Self {
        Self { grid, range }
    }

    /// `[min, min(max, grid - location)]` per axis
    pub fn allowed_size_range(&self, location: Location) -> (Size, Size) {
        let room_w = self.grid.width().saturating_sub(location.x).max(1);
        let room_h = self.grid.height().saturating_sub(location.y).max(1);
        let max = Size::new(self.range.max.width.min(room_w), self.range.max.height.min(room_h));
        let min = Size::new(self.range.min.width.min(max.width), self.range.min.height.min(max.height));
        (min, max)
    }

    /// `[(0,0), grid - size]` per axis, floored at zero
    pub fn allowed_location_range(&self, size: Size) -> (Location, Location) {
        let max = Location::new(
            self.grid.width().saturating_sub(size.width),
            self.grid.height().saturating_sub(size.height),
        );
        (Location::default(), max)
    }

    /// Clamp a proposed (possibly negative) size for a routine anchored at `location`
    pub fn resize(&self, width: i64, height: i64, location: Location) -> Size {
        let location = self.anchor(location);
        let (min, max) = self.allowed_size_range(location);
        Size::new(
            clamp_axis(width, min.width, max.width),
            clamp_axis(height, min.height, max.height),
        )
    }

    /// Clamp a proposed (possibly negative) location for a routine of `size`
    pub fn move_to(&self, x: i64, y: i64, size: Size) -> Location {
        let size = Size::new(
            size.width.clamp(1, self.grid.width()),
            size.height.clamp(1, self.grid.height()),
        );
        let (min, max) = self.allowed_location_range(size);
        Location::new(clamp_axis(x, min.x, max.x), clamp_axis(y, min.y, max.y))
    }

    /// Bring a whole rect into a legal state: size first, then position
    pub fn fit(&self, rect: Rect) -> Rect {
        let min = self.range.min;
        let max = self.range.max;
        let width = rect.size.width.clamp(min.width, max.width).min(self.grid.width());
        let height = rect.size.height.clamp(min.height, max.height).min(self.grid.height());
        let size = Size::new(width.max(1), height.max(1));
        let location = self.move_to(rect.location.x as i64, rect.location.y as i64, size);
        Rect::new(location, self.resize(size.width as i64, size.height as i64, location))
    }

    // A location already off the grid is pulled back to the last cell
    fn anchor(&self, location: Location) -> Location {
        Location::new(
            location.x.min(self.grid.width() - 1),
            location.y.min(self.grid.height() - 1),
        )
    }
}

fn clamp_axis(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(min as i64, max.max(min) as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver(width: u32, height: u32, min: (u32, u32), max: (u32, u32)) -> ConstraintSolver {
        ConstraintSolver::new(
            Grid::new(width, height).unwrap(),
            SizeRange::from_bounds(Some(Size::new(min.0, min.1)), Some(Size::new(max.0, max.1))),
        )
    }

    fn satisfies_invariant(s: &ConstraintSolver, grid: Grid, location: Location, size: Size) -> bool {
        let in_grid = Rect::new(location, size).contains(&grid);
        let (min, max) = s.allowed_size_range(location);
        in_grid && size.width >= min.width && size.height >= min.height && size.width <= max.width && size.height <= max.height
    }

    #[test]
    fn test_allowed_ranges() {
        let s = solver(10, 4, (1, 1), (5, 2));
        assert_eq!(s.allowed_size_range(Location::new(7, 3)), (Size::new(1, 1), Size::new(3, 1)));
        assert_eq!(
            s.allowed_location_range(Size::new(2, 1)),
            (Location::new(0, 0), Location::new(8, 3))
        );
        assert_eq!(
            s.allowed_location_range(Size::new(12, 1)).1,
            Location::new(0, 3)
        );
    }

    #[test]
    fn test_resize_clamps_to_room_left() {
        // only 4 columns remain right of x=6
        let s = solver(10, 4, (1, 1), (10, 4));
        assert_eq!(s.resize(8, 1, Location::new(6, 0)), Size::new(4, 1));
    }

    #[test]
    fn test_resize_respects_type_bounds() {
        let s = solver(10, 4, (2, 1), (5, 2));
        assert_eq!(s.resize(9, 3, Location::new(0, 0)), Size::new(5, 2));
        assert_eq!(s.resize(-4, 0, Location::new(0, 0)), Size::new(2, 1));
    }

    #[test]
    fn test_move_clamps_both_axes() {
        let s = solver(10, 4, (1, 1), (5, 2));
        assert_eq!(s.move_to(-3, 9, Size::new(2, 1)), Location::new(0, 3));
        assert_eq!(s.move_to(42, 1, Size::new(2, 2)), Location::new(8, 1));
    }

    #[test]
    fn test_outputs_always_satisfy_invariant() {
        let grid = Grid::new(7, 3).unwrap();
        let s = ConstraintSolver::new(
            grid,
            SizeRange::from_bounds(Some(Size::new(2, 1)), Some(Size::new(4, 3))),
        );
        for x in -3..10i64 {
            for y in -2..5i64 {
                for w in [-5i64, 0, 1, 3, 6, 40] {
                    let location = s.move_to(x, y, Size::new(2, 1));
                    let size = s.resize(w, w / 2, location);
                    assert!(satisfies_invariant(&s, grid, location, size), "{:?} {:?}", location, size);
                }
            }
        }
    }

    #[test]
    fn test_fit_grows_to_min_and_shifts_back() {
        let s = solver(10, 4, (4, 2), (8, 4));
        let rect = s.fit(Rect::new(Location::new(8, 3), Size::new(1, 1)));
        assert_eq!(rect, Rect::new(Location::new(6, 2), Size::new(4, 2)));
        assert_eq!(s.fit(rect), rect);
    }
}
