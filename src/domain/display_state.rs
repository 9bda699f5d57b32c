// Display state domain model - full device content as pushed by the server
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::geometry::Grid;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DisplayState {
    pub active_dashboard: String,
    pub active_rotation: String,
    pub current_time: Option<DateTime<FixedOffset>>,
    /// Device characters, row-major; may be shorter than the grid
    pub text: String,
}

impl DisplayState {
    /// Exactly `width*height` characters: truncated, or padded with spaces
    pub fn cells(&self, grid: &Grid) -> Vec<char> {
        pad_cells(&self.text, grid)
    }
}

pub fn pad_cells(text: &str, grid: &Grid) -> Vec<char> {
    let count = grid.cell_count();
    let mut cells: Vec<char> = text.chars().take(count).collect();
    cells.resize(count, ' ');
    cells
}
