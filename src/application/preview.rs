// Layout preview - maps positioned routines (or a raw display string) onto grid cells
use serde::Serialize;

use crate::domain::display_state::pad_cells;
use crate::domain::geometry::{Grid, Rect};
use crate::domain::routine::Routine;

/// One routine as seen by the renderer
#[derive(Debug, Clone)]
pub struct PreviewItem<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub rect: Rect,
    /// Runtime or static text; when present it is laid out inside the rect
    pub content: Option<&'a str>,
}

impl<'a> From<&'a Routine> for PreviewItem<'a> {
    fn from(routine: &'a Routine) -> Self {
        Self {
            id: &routine.id,
            kind: &routine.kind,
            rect: routine.rect(),
            content: routine.text_content(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub routine_id: String,
    pub kind: String,
    pub glyph: char,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<Option<Occupant>>,
}

impl PreviewGrid {
    pub fn occupant(&self, x: u32, y: u32) -> Option<&Occupant> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[(y * self.width + x) as usize].as_ref()
    }

    /// One string per row; empty cells render as '.'
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(|o| o.glyph).unwrap_or('.'))
                    .collect()
            })
            .collect()
    }
}

/// Later items win on shared cells; parts of a rect outside the grid are dropped.
pub fn render<'a>(grid: Grid, items: impl IntoIterator<Item = PreviewItem<'a>>) -> PreviewGrid {
    let mut cells: Vec<Option<Occupant>> = vec![None; grid.cell_count()];

    for item in items {
        let text = item.content.map(flatten_text);
        let initial = item
            .kind
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');

        for (x, y) in item.rect.cells(&grid) {
            let Some(index) = grid.index_of(x, y) else {
                continue;
            };
            let offset = ((y - item.rect.location.y) * item.rect.size.width
                + (x - item.rect.location.x)) as usize;
            let glyph = match &text {
                Some(chars) => chars.get(offset).copied().unwrap_or(' '),
                None => initial,
            };
            cells[index] = Some(Occupant {
                routine_id: item.id.to_string(),
                kind: item.kind.to_string(),
                glyph,
            });
        }
    }

    PreviewGrid {
        width: grid.width(),
        height: grid.height(),
        cells,
    }
}

pub fn render_routines(grid: Grid, routines: &[Routine]) -> PreviewGrid {
    render(grid, routines.iter().map(PreviewItem::from))
}

/// Split a flat display string into `height` rows of `width` characters
pub fn display_rows(grid: Grid, text: &str) -> Vec<String> {
    pad_cells(text, &grid)
        .chunks(grid.width() as usize)
        .map(|row| row.iter().collect())
        .collect()
}

// Line breaks collapse to a single space; no multi-line layout
fn flatten_text(text: &str) -> Vec<char> {
    text.replace("\r\n", " ")
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
