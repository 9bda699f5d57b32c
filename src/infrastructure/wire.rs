// JSON shapes spoken by the splitflap server and their mapping onto domain types
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::domain::alphabet::Alphabet;
use crate::domain::dashboard::{Dashboard, Rotation, RotationEntry};
use crate::domain::display_state::DisplayState;
use crate::domain::geometry::{Location, Size, SizeRange};
use crate::domain::routine::{Parameter, Routine, RoutineCatalog, RoutineInfo};
use crate::domain::translation::TranslationMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireSize {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireLocation {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRoutine {
    #[serde(rename = "type")]
    pub kind: String,
    pub location: WireLocation,
    pub size: WireSize,
    #[serde(default)]
    pub routine: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireDashboard {
    #[serde(default)]
    pub routines: Vec<WireRoutine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRotationEntry {
    pub name: String,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRotation {
    #[serde(default)]
    pub rotation: Vec<WireRotationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRoutineInfo {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub config: Value,
    pub min_size: Option<WireSize>,
    pub max_size: Option<WireSize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDisplayState {
    #[serde(default)]
    pub active_dashboard: String,
    #[serde(default)]
    pub active_rotation: String,
    pub display_state: Option<String>,
    pub state: Option<String>,
    pub current_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDisplayRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StateRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl StateRequest {
    pub fn get_state() -> Self {
        Self { kind: "getState" }
    }
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

impl From<&WireSize> for Size {
    fn from(size: &WireSize) -> Self {
        Size::new(to_u32(size.width), to_u32(size.height))
    }
}

impl From<Size> for WireSize {
    fn from(size: Size) -> Self {
        Self {
            width: size.width as i64,
            height: size.height as i64,
        }
    }
}

impl From<Location> for WireLocation {
    fn from(location: Location) -> Self {
        Self {
            x: location.x as i64,
            y: location.y as i64,
        }
    }
}

/// Integer code points; anything that isn't a valid scalar value is skipped
pub fn alphabet_from_wire(codes: &[i64]) -> Alphabet {
    let chars = codes.iter().filter_map(|code| {
        let c = u32::try_from(*code).ok().and_then(char::from_u32);
        if c.is_none() {
            tracing::warn!("Skipping invalid alphabet code point {}", code);
        }
        c
    });
    Alphabet::from_chars(chars)
}

// A translation side is either a single character or a decimal code point
fn translation_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        (Some(_), Some(_)) => value.parse::<u32>().ok().and_then(char::from_u32),
        _ => None,
    }
}

fn translation_value(value: &Value) -> Option<char> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .and_then(char::from_u32),
        Value::String(s) => translation_char(s),
        _ => None,
    }
}

/// Keys are sorted so collisions resolve the same way on every load
pub fn translations_from_wire(raw: &Map<String, Value>) -> TranslationMap {
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();
    let pairs = keys.into_iter().filter_map(|key| {
        let source = translation_char(key);
        let target = raw.get(key).and_then(translation_value);
        match (source, target) {
            (Some(source), Some(target)) => Some((source, target)),
            _ => {
                tracing::warn!("Skipping unreadable translation {:?} -> {:?}", key, raw.get(key));
                None
            }
        }
    });
    TranslationMap::from_pairs(pairs)
}

/// Code point keys and values, the form the device server reads back
pub fn translations_to_wire(map: &TranslationMap) -> BTreeMap<String, u32> {
    map.iter()
        .map(|(source, target)| ((source as u32).to_string(), target as u32))
        .collect()
}

fn config_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            tracing::warn!("Ignoring non-object routine config {}", other);
            Map::new()
        }
    }
}

/// Routines get session ids `routine-1..n` in server order
pub fn dashboard_from_wire(name: String, wire: WireDashboard) -> Dashboard {
    let routines = wire
        .routines
        .into_iter()
        .enumerate()
        .map(|(i, r)| Routine {
            id: format!("routine-{}", i + 1),
            kind: r.kind,
            location: Location::new(to_u32(r.location.x), to_u32(r.location.y)),
            size: Size::from(&r.size),
            config: config_object(r.routine),
        })
        .collect();
    Dashboard::new(name, routines)
}

/// Body for saving a dashboard. Config keys starting with `_` and a stray
/// `type` key are local bookkeeping and stay behind.
pub fn dashboard_to_wire(dashboard: &Dashboard) -> Vec<WireRoutine> {
    dashboard
        .routines
        .iter()
        .map(|r| {
            let config: Map<String, Value> = r
                .config
                .iter()
                .filter(|(key, _)| !key.starts_with('_') && key.as_str() != "type")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            WireRoutine {
                kind: r.kind.clone(),
                location: r.location.into(),
                size: r.size.into(),
                routine: Value::Object(config),
            }
        })
        .collect()
}

pub fn dashboards_from_wire(raw: HashMap<String, WireDashboard>) -> Vec<Dashboard> {
    let mut dashboards: Vec<Dashboard> = raw
        .into_iter()
        .map(|(name, wire)| dashboard_from_wire(name, wire))
        .collect();
    dashboards.sort_by(|a, b| a.name.cmp(&b.name));
    dashboards
}

pub fn rotations_from_wire(raw: HashMap<String, WireRotation>) -> Vec<Rotation> {
    let mut rotations: Vec<Rotation> = raw
        .into_iter()
        .map(|(name, wire)| {
            let entries = wire
                .rotation
                .into_iter()
                .map(|e| RotationEntry {
                    dashboard: e.name,
                    duration_secs: e.duration_secs,
                })
                .collect();
            Rotation::new(name, entries)
        })
        .collect();
    rotations.sort_by(|a, b| a.name.cmp(&b.name));
    rotations
}

pub fn rotation_to_wire(rotation: &Rotation) -> WireRotation {
    WireRotation {
        rotation: rotation
            .entries
            .iter()
            .map(|e| WireRotationEntry {
                name: e.dashboard.clone(),
                duration_secs: e.duration_secs,
            })
            .collect(),
    }
}

pub fn catalog_from_wire(raw: HashMap<String, WireRoutineInfo>) -> RoutineCatalog {
    let types = raw
        .into_iter()
        .map(|(name, info)| {
            let size_range = SizeRange::from_bounds(
                info.min_size.as_ref().map(Size::from),
                info.max_size.as_ref().map(Size::from),
            );
            let info = RoutineInfo {
                parameters: info.parameters,
                defaults: config_object(info.config),
                size_range,
            };
            (name, info)
        })
        .collect();
    RoutineCatalog::new(types)
}

/// `displayState` wins over `state`; an unreadable timestamp is dropped, not fatal
pub fn display_state_from_wire(wire: WireDisplayState) -> DisplayState {
    let current_time = wire.current_time.as_deref().and_then(|raw| {
        match DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!("Ignoring unparseable currentTime {:?}: {}", raw, e);
                None
            }
        }
    });
    DisplayState {
        active_dashboard: wire.active_dashboard,
        active_rotation: wire.active_rotation,
        current_time,
        text: wire.display_state.or(wire.state).unwrap_or_default(),
    }
}

pub fn parse_display_message(text: &str) -> serde_json::Result<DisplayState> {
    let wire: WireDisplayState = serde_json::from_str(text)?;
    Ok(display_state_from_wire(wire))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alphabet_skips_invalid_codes() {
        let alphabet = alphabet_from_wire(&[65, 66, -1, 0xD800, 0x110000]);
        assert!(alphabet.contains('A'));
        assert!(alphabet.contains('B'));
        assert!(alphabet.contains(' '));
        assert_eq!(alphabet.len(), 3);
    }

    #[test]
    fn test_translations_accept_code_points_and_chars() {
        let raw = json!({ "64": 126, "°": "d", "x": "", "7": "8" });
        let map = translations_from_wire(raw.as_object().unwrap());
        assert_eq!(map.forward('@'), '~');
        assert_eq!(map.forward('°'), 'd');
        // single-character keys are characters, not code points
        assert_eq!(map.forward('7'), '8');
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_translations_to_wire_uses_code_points() {
        let map = TranslationMap::from_pairs([('@', '~')]);
        let wire = translations_to_wire(&map);
        assert_eq!(wire.get("64"), Some(&126));
    }

    #[test]
    fn test_dashboard_gets_session_ids() {
        let raw: HashMap<String, WireDashboard> = serde_json::from_value(json!({
            "home": { "routines": [
                { "type": "CLOCK", "location": {"x": 0, "y": 0}, "size": {"width": 5, "height": 1},
                  "routine": { "military": true } },
                { "type": "TEXT", "location": {"x": 1, "y": -2}, "size": {"width": 3, "height": 1},
                  "routine": null }
            ]},
            "away": { "routines": [] }
        }))
        .unwrap();
        let dashboards = dashboards_from_wire(raw);
        assert_eq!(dashboards[0].name, "away");
        let home = &dashboards[1];
        assert_eq!(home.routines[0].id, "routine-1");
        assert_eq!(home.routines[1].id, "routine-2");
        assert_eq!(home.routines[1].location, Location::new(1, 0));
        assert_eq!(home.routines[0].config.get("military"), Some(&json!(true)));
        assert!(home.routines[1].config.is_empty());
    }

    #[test]
    fn test_dashboard_body_strips_local_keys() {
        let mut config = Map::new();
        config.insert("text".to_string(), json!("HI"));
        config.insert("_draft".to_string(), json!(1));
        config.insert("type".to_string(), json!("TEXT"));
        let dashboard = Dashboard::new(
            "home".to_string(),
            vec![Routine {
                id: "routine-1".to_string(),
                kind: "TEXT".to_string(),
                location: Location::new(2, 1),
                size: Size::new(2, 1),
                config,
            }],
        );
        let body = serde_json::to_value(dashboard_to_wire(&dashboard)).unwrap();
        assert_eq!(
            body,
            json!([{ "type": "TEXT", "location": {"x": 2, "y": 1}, "size": {"width": 2, "height": 1},
                     "routine": { "text": "HI" } }])
        );
    }

    #[test]
    fn test_catalog_size_bounds() {
        let raw: HashMap<String, WireRoutineInfo> = serde_json::from_value(json!({
            "CLOCK": {
                "parameters": [{ "name": "Military", "description": "24h", "field": "military", "type": "bool" }],
                "config": { "military": false },
                "min_size": { "width": 5, "height": 1 },
                "max_size": { "width": 0, "height": 0 }
            },
            "TEXT": { "parameters": [], "config": {} }
        }))
        .unwrap();
        let catalog = catalog_from_wire(raw);
        let clock = catalog.size_range("CLOCK");
        assert_eq!(clock.min, Size::new(5, 1));
        assert!(clock.admits(Size::new(20, 4)));
        assert_eq!(catalog.get("CLOCK").unwrap().parameters[0].field, "military");
        assert_eq!(catalog.size_range("TEXT").min, Size::new(1, 1));
    }

    #[test]
    fn test_rotation_round_trip_shape() {
        let raw: HashMap<String, WireRotation> = serde_json::from_value(json!({
            "day": { "rotation": [{ "name": "home", "duration_secs": 30 }] }
        }))
        .unwrap();
        let rotations = rotations_from_wire(raw);
        assert_eq!(rotations[0].entries[0].dashboard, "home");
        let body = serde_json::to_value(rotation_to_wire(&rotations[0])).unwrap();
        assert_eq!(body, json!({ "rotation": [{ "name": "home", "duration_secs": 30 }] }));
    }

    #[test]
    fn test_display_message_prefers_display_state() {
        let state = parse_display_message(
            r#"{"activeDashboard":"home","state":"OLD","displayState":"NEW","currentTime":"2024-05-01T10:00:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(state.text, "NEW");
        assert_eq!(state.active_dashboard, "home");
        assert!(state.current_time.is_some());

        let state = parse_display_message(r#"{"state":"ABC","currentTime":"yesterday"}"#).unwrap();
        assert_eq!(state.text, "ABC");
        assert!(state.current_time.is_none());

        assert!(parse_display_message("not json").is_err());
    }
}
