// Routine domain model - positioned content generators and the type catalog
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::geometry::{Location, Rect, Size, SizeRange};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routine {
    /// Session-local identifier; the server shape carries none
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Location,
    pub size: Size,
    pub config: Map<String, Value>,
}

impl Routine {
    pub fn rect(&self) -> Rect {
        Rect::new(self.location, self.size)
    }

    /// Static text carried by text-bearing routines (TEXT, SLOWTEXT)
    pub fn text_content(&self) -> Option<&str> {
        self.config.get("text").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub field: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Parameter {
    /// Initial value for a freshly added routine, keyed on the declared type
    pub fn default_value(&self) -> Value {
        match self.kind.to_lowercase().as_str() {
            "bool" => Value::Bool(false),
            "int" | "int64" | "float" | "float64" => Value::from(0),
            "string[]" => Value::Array(Vec::new()),
            "string" => Value::String(self.first_option().unwrap_or_default()),
            _ => Value::String(String::new()),
        }
    }

    // "Clock format, options: 12h, 24h." -> "12h"
    fn first_option(&self) -> Option<String> {
        let lower = self.description.to_ascii_lowercase();
        let start = lower.find("options:")? + "options:".len();
        let rest = &self.description[start..];
        let list = rest.split('.').next()?;
        let first = list.split(',').next()?.trim();
        if first.is_empty() {
            None
        } else {
            Some(first.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutineInfo {
    pub parameters: Vec<Parameter>,
    pub defaults: Map<String, Value>,
    pub size_range: SizeRange,
}

impl RoutineInfo {
    /// Catalog defaults overlaid with a typed default for every declared parameter
    pub fn initial_config(&self) -> Map<String, Value> {
        let mut config = self.defaults.clone();
        for parameter in &self.parameters {
            config.insert(parameter.field.clone(), parameter.default_value());
        }
        config
    }
}

/// Server-defined set of routine types, keyed by type name
#[derive(Debug, Clone, Default)]
pub struct RoutineCatalog {
    types: BTreeMap<String, RoutineInfo>,
}

impl RoutineCatalog {
    pub fn new(types: BTreeMap<String, RoutineInfo>) -> Self {
        Self { types }
    }

    pub fn get(&self, kind: &str) -> Option<&RoutineInfo> {
        self.types.get(kind)
    }

    /// Size limits for a type; unknown types are unconstrained
    pub fn size_range(&self, kind: &str) -> SizeRange {
        self.types
            .get(kind)
            .map(|info| info.size_range)
            .unwrap_or_default()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
