// Display state reconciler - merges server pushes with unsaved local edits
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::alphabet::Alphabet;
use crate::domain::display_state::DisplayState;
use crate::domain::error::PanelError;
use crate::domain::geometry::Grid;
use crate::domain::translation::TranslationMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Tab,
    ShiftTab,
    Backspace,
}

/// Pure index arithmetic over the grid. Arrows stop at row/column edges; tab
/// walks linearly and stops at the first/last cell.
pub fn next_index(grid: &Grid, index: usize, key: NavKey) -> Option<usize> {
    let (col, row) = grid.coords_of(index)?;
    let width = grid.width() as usize;
    let last = grid.cell_count() - 1;
    match key {
        NavKey::ArrowRight if col + 1 < grid.width() => Some(index + 1),
        NavKey::ArrowLeft if col > 0 => Some(index - 1),
        NavKey::ArrowDown if row + 1 < grid.height() => Some(index + width),
        NavKey::ArrowUp if row > 0 => Some(index - width),
        NavKey::Tab if index < last => Some(index + 1),
        NavKey::ShiftTab | NavKey::Backspace if index > 0 => Some(index - 1),
        _ => None,
    }
}

/// Text handed out by [`DisplayReconciler::begin_commit`]; completes exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTicket {
    pub token: u64,
    pub text: String,
    /// Local characters as they were when the text was built
    pub cells: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub width: u32,
    pub height: u32,
    /// Display-ready characters, row-major
    pub cells: String,
    pub edited: Vec<usize>,
    pub changed: Vec<usize>,
    pub focus: Option<usize>,
    pub commit_in_flight: bool,
    pub active_dashboard: String,
    pub active_rotation: String,
    pub current_time: Option<String>,
}

/// Owns the editable character grid shown to the user.
///
/// Server pushes overwrite every cell outside the edit set with the
/// reverse-translated device character; cells in the edit set are never
/// touched by a push. Only `commit` and `discard` clear the edit set.
#[derive(Debug, Clone)]
pub struct DisplayReconciler {
    grid: Grid,
    alphabet: Alphabet,
    translations: TranslationMap,
    cells: Vec<char>,
    edits: BTreeSet<usize>,
    // last pushed device characters
    server: Vec<char>,
    // what `is_changed` compares against: last push, or the last committed text
    baseline: Vec<char>,
    last_state: Option<DisplayState>,
    focus: Option<usize>,
    next_token: u64,
    in_flight: Option<u64>,
}

impl DisplayReconciler {
    pub fn new(grid: Grid, alphabet: Alphabet, translations: TranslationMap) -> Self {
        let blank = vec![' '; grid.cell_count()];
        Self {
            grid,
            alphabet,
            translations,
            cells: blank.clone(),
            edits: BTreeSet::new(),
            server: blank.clone(),
            baseline: blank,
            last_state: None,
            focus: None,
            next_token: 1,
            in_flight: None,
        }
    }

    pub fn cell(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied()
    }

    pub fn cells(&self) -> &[char] {
        &self.cells
    }

    pub fn edits(&self) -> &BTreeSet<usize> {
        &self.edits
    }

    /// Full-state replacement from the server
    pub fn apply_push(&mut self, state: DisplayState) {
        self.server = state.cells(&self.grid);
        self.baseline = self.server.clone();
        for (index, device) in self.server.iter().enumerate() {
            if !self.edits.contains(&index) {
                self.cells[index] = self.translations.reverse(*device);
            }
        }
        tracing::debug!(
            "Applied display push (dashboard={:?}, {} cells held by local edits)",
            state.active_dashboard,
            self.edits.len()
        );
        self.last_state = Some(state);
    }

    /// A keystroke at `index`. Empty input clears the cell to a space. Accepted
    /// characters are renderable directly or after forward translation.
    /// Returns the index that should hold focus afterwards.
    pub fn input(&mut self, index: usize, raw: &str) -> Result<usize, PanelError> {
        if index >= self.cells.len() {
            return Err(PanelError::Validation(format!(
                "cell {} is outside the {}x{} display",
                index,
                self.grid.width(),
                self.grid.height()
            )));
        }

        let mut chars = raw.chars();
        let (value, typed) = match (chars.next(), chars.next()) {
            (None, _) => (' ', false),
            (Some(c), None) => (c, true),
            _ => {
                return Err(PanelError::Validation(format!(
                    "expected a single character, got {:?}",
                    raw
                )));
            }
        };
        if typed && !self.accepts(value) {
            return Err(PanelError::Validation(format!(
                "'{}' cannot be shown on the display",
                value
            )));
        }

        self.cells[index] = value;
        self.edits.insert(index);

        let last = self.cells.len() - 1;
        let focus = if typed && index < last { index + 1 } else { index };
        self.focus = Some(focus);
        Ok(focus)
    }

    /// Move focus with a navigation key. Backspace on an empty cell steps back
    /// and clears the previous cell; on a filled cell it clears that cell.
    pub fn navigate(&mut self, index: usize, key: NavKey) -> Result<usize, PanelError> {
        if index >= self.cells.len() {
            return Err(PanelError::Validation(format!("cell {} is outside the display", index)));
        }

        let focus = match key {
            NavKey::Backspace if self.cells[index] != ' ' => {
                self.input(index, "")?;
                index
            }
            NavKey::Backspace => match next_index(&self.grid, index, key) {
                Some(previous) => {
                    self.input(previous, "")?;
                    previous
                }
                None => index,
            },
            _ => next_index(&self.grid, index, key).unwrap_or(index),
        };
        self.focus = Some(focus);
        Ok(focus)
    }

    fn accepts(&self, c: char) -> bool {
        self.alphabet.contains(c)
            || (self.translations.has_forward(c) && self.alphabet.contains(self.translations.forward(c)))
    }

    /// False when the local character matches the baseline directly or through
    /// either translation direction.
    pub fn is_changed(&self, index: usize) -> bool {
        let (Some(local), Some(original)) = (self.cells.get(index), self.baseline.get(index)) else {
            return false;
        };
        if local == original {
            return false;
        }
        if self.translations.has_forward(*local) && self.translations.forward(*local) == *original {
            return false;
        }
        if self.translations.has_reverse(*original) && self.translations.reverse(*original) == *local {
            return false;
        }
        true
    }

    /// Forward-translate every cell into the outbound display text. Only one
    /// commit may be outstanding at a time.
    pub fn begin_commit(&mut self) -> Result<CommitTicket, PanelError> {
        if let Some(token) = self.in_flight {
            return Err(PanelError::Conflict(format!(
                "commit {} is still in flight",
                token
            )));
        }
        let token = self.next_token;
        self.next_token += 1;
        self.in_flight = Some(token);

        let text = self
            .cells
            .iter()
            .map(|c| self.translations.forward(*c))
            .map(|c| if c == '\u{00A0}' { ' ' } else { c })
            .collect();
        Ok(CommitTicket {
            token,
            text,
            cells: self.cells.clone(),
        })
    }

    /// Resolve an outstanding commit. Success makes the sent text the new
    /// baseline and drops edits that went out with it; cells typed while the
    /// request was in flight stay edited. Failure leaves edits and cells
    /// untouched. Stale tickets are ignored.
    pub fn complete_commit(
        &mut self,
        ticket: &CommitTicket,
        result: Result<(), PanelError>,
    ) -> Result<(), PanelError> {
        if self.in_flight != Some(ticket.token) {
            tracing::warn!("Ignoring completion for stale commit {}", ticket.token);
            return Ok(());
        }
        self.in_flight = None;

        match result {
            Ok(()) => {
                let cells = &self.cells;
                self.edits
                    .retain(|i| cells.get(*i) != ticket.cells.get(*i));
                self.baseline = ticket.text.chars().collect();
                self.baseline.resize(self.cells.len(), ' ');
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Commit {} failed, keeping {} edits: {}", ticket.token, self.edits.len(), e);
                Err(e)
            }
        }
    }

    pub fn commit_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Throw away local edits and show the last pushed state again
    pub fn discard(&mut self) {
        for (index, device) in self.server.iter().enumerate() {
            self.cells[index] = self.translations.reverse(*device);
        }
        self.baseline = self.server.clone();
        self.edits.clear();
    }

    /// Swap in a refetched translation map and re-derive every unedited cell
    pub fn replace_translations(&mut self, translations: TranslationMap) {
        self.translations = translations;
        for (index, device) in self.server.iter().enumerate() {
            if !self.edits.contains(&index) {
                self.cells[index] = self.translations.reverse(*device);
            }
        }
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        let state = self.last_state.as_ref();
        DisplaySnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.cells.iter().collect(),
            edited: self.edits.iter().copied().collect(),
            changed: (0..self.cells.len()).filter(|i| self.is_changed(*i)).collect(),
            focus: self.focus,
            commit_in_flight: self.commit_in_flight(),
            active_dashboard: state.map(|s| s.active_dashboard.clone()).unwrap_or_default(),
            active_rotation: state.map(|s| s.active_rotation.clone()).unwrap_or_default(),
            current_time: state.and_then(|s| s.current_time).map(|t| t.to_rfc3339()),
        }
    }
}
