// Dashboard and rotation domain models
use serde::Serialize;

use super::error::PanelError;
use super::routine::Routine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub name: String,
    pub routines: Vec<Routine>,
}

impl Dashboard {
    pub fn new(name: String, routines: Vec<Routine>) -> Self {
        Self { name, routines }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationEntry {
    pub dashboard: String,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rotation {
    pub name: String,
    pub entries: Vec<RotationEntry>,
}

impl Rotation {
    pub fn new(name: String, entries: Vec<RotationEntry>) -> Self {
        Self { name, entries }
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.name.trim().is_empty() {
            return Err(PanelError::validation("rotation name is required"));
        }
        if self.entries.is_empty() {
            return Err(PanelError::validation(format!(
                "rotation {} has no dashboards",
                self.name
            )));
        }
        if let Some(entry) = self.entries.iter().find(|e| e.duration_secs == 0) {
            return Err(PanelError::validation(format!(
                "dashboard {} in rotation {} needs a positive duration",
                entry.dashboard, self.name
            )));
        }
        Ok(())
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dashboard: &str, duration_secs: u64) -> RotationEntry {
        RotationEntry {
            dashboard: dashboard.to_string(),
            duration_secs,
        }
    }

    #[test]
    fn test_rotation_validation() {
        let ok = Rotation::new("morning".to_string(), vec![entry("clock", 30), entry("weather", 60)]);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.total_duration_secs(), 90);

        let blank = Rotation::new("  ".to_string(), vec![entry("clock", 30)]);
        assert!(matches!(blank.validate(), Err(PanelError::Validation(_))));

        let empty = Rotation::new("empty".to_string(), Vec::new());
        assert!(matches!(empty.validate(), Err(PanelError::Validation(_))));

        let zero = Rotation::new("zero".to_string(), vec![entry("clock", 0)]);
        assert!(matches!(zero.validate(), Err(PanelError::Validation(_))));
    }
}
