// Geometry domain model - rectangles on the fixed display grid
use serde::{Deserialize, Serialize};

use super::error::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

impl Location {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn unit() -> Self {
        Self::new(1, 1)
    }
}

/// Dimensions of the physical display. Both axes are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    width: u32,
    height: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Result<Self, PanelError> {
        if width == 0 || height == 0 {
            return Err(PanelError::Validation(format!(
                "grid must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of a cell, or None when the cell is off the grid
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn coords_of(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cell_count() {
            return None;
        }
        let width = self.width as usize;
        Some(((index % width) as u32, (index / width) as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub location: Location,
    pub size: Size,
}

impl Rect {
    pub fn new(location: Location, size: Size) -> Self {
        Self { location, size }
    }

    /// Whether the rectangle lies fully inside `[0,width) x [0,height)`
    pub fn contains(&self, grid: &Grid) -> bool {
        self.size.width >= 1
            && self.size.height >= 1
            && self.location.x as u64 + self.size.width as u64 <= grid.width as u64
            && self.location.y as u64 + self.size.height as u64 <= grid.height as u64
    }

    /// Nearest in-bounds rectangle: size is kept where it fits, otherwise shrunk
    /// to the grid, and the location is pulled back so the whole rect fits.
    pub fn clamp(&self, grid: &Grid) -> Rect {
        let width = self.size.width.clamp(1, grid.width);
        let height = self.size.height.clamp(1, grid.height);
        let x = self.location.x.min(grid.width - width);
        let y = self.location.y.min(grid.height - height);
        Rect::new(Location::new(x, y), Size::new(width, height))
    }

    /// Cells covered by the rectangle in row-major order, clipped to the grid
    pub fn cells<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = (u32, u32)> + 'a {
        let Location { x, y } = self.location;
        (0..self.size.height).flat_map(move |dy| {
            (0..self.size.width).filter_map(move |dx| {
                let cx = x.checked_add(dx)?;
                let cy = y.checked_add(dy)?;
                grid.index_of(cx, cy).map(|_| (cx, cy))
            })
        })
    }
}

/// Per-type size limits as published by the routine catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub min: Size,
    pub max: Size,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self {
            min: Size::unit(),
            max: Size::new(u32::MAX, u32::MAX),
        }
    }
}

impl SizeRange {
    /// Missing bounds fall back to 1x1 / unbounded. Zero components are read as
    /// missing, and a max below min is raised to min.
    pub fn from_bounds(min: Option<Size>, max: Option<Size>) -> Self {
        let min = min.unwrap_or(Size::unit());
        let min = Size::new(min.width.max(1), min.height.max(1));
        let max = max.unwrap_or(Size::new(u32::MAX, u32::MAX));
        let max = Size::new(
            if max.width == 0 { u32::MAX } else { max.width.max(min.width) },
            if max.height == 0 { u32::MAX } else { max.height.max(min.height) },
        );
        Self { min, max }
    }

    pub fn admits(&self, size: Size) -> bool {
        size.width >= self.min.width
            && size.width <= self.max.width
            && size.height >= self.min.height
            && size.height <= self.max.height
    }
}
