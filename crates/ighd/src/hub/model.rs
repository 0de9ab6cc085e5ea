use serde::Deserialize;
use serde::Serialize;

/// Inventory payload returned by the hub's `/home` endpoint.
///
/// The hub nests units inside rooms; `rooms` is absent on some firmware
/// revisions when no rooms have been configured yet.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeData {
    pub rooms: Option<Vec<Room>>,
}

/// A room as it appears in the inventory payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub name: String,

    #[serde(default)]
    pub units: Vec<RoomUnit>,
}

/// A unit as it appears nested inside a room.
///
/// The hub uses camelCase for the unit id on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomUnit {
    pub name: String,

    #[serde(rename = "fullId")]
    pub full_id: String,
}

/// A unit flattened out of the inventory and tagged with its room name.
///
/// `full_id` is the hub's stable identifier and the primary key everywhere
/// in this crate. A `Unit` is created once on the first inventory fetch and
/// never mutated afterwards; only its associated status is refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub full_id: String,
    pub name: String,
    pub room_name: String,
}

/// Latest status of a single unit, from `/unit/{fullId}`.
///
/// Replaced wholesale on every poll tick; no history is kept.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UnitStatus {
    /// 0 = off, 1 = on.
    pub status: i64,

    /// Hub-internal operating mode.
    pub mode: i64,

    /// Temperature in Celsius, present on sensor units only.
    #[serde(default)]
    pub temp: Option<f64>,

    /// Seconds since the last motion pulse, present on motion detectors only.
    #[serde(default)]
    pub span_second: Option<i64>,
}

/// Scenario listing payload from `/scenario`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioList {
    pub scenarios: Option<Vec<Scenario>>,
}

/// A named automation configured on the hub.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
}

impl HomeData {
    /// Flatten `rooms[*].units[*]` into a single list, tagging each unit
    /// with the name of the room it belongs to.
    pub fn flatten_units(&self) -> Vec<Unit> {
        let Some(rooms) = &self.rooms else {
            return Vec::new();
        };

        let mut units = Vec::new();
        for room in rooms {
            for unit in &room.units {
                units.push(Unit {
                    full_id: unit.full_id.clone(),
                    name: unit.name.clone(),
                    room_name: room.name.clone(),
                });
            }
        }
        units
    }
}

impl ScenarioList {
    /// Names of all configured scenarios.
    pub fn names(&self) -> Vec<String> {
        self.scenarios
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }
}

/// What kind of entity a unit surfaces as.
///
/// The hub API carries no explicit type field. The kind is inferred from
/// which status fields the unit reports and, failing that, from a substring
/// match on its name. Known to be fragile against renamed units, kept for
/// compatibility with the hub's conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Switch,
    Light,
    TemperatureSensor,
    MotionSensor,
}

impl UnitKind {
    /// Infer the kind of a unit from its first observed status and its name.
    ///
    /// Status-field presence wins over the name heuristic: a unit reporting
    /// `temp` is a temperature sensor and one reporting `span_second` is a
    /// motion detector, regardless of what it is called.
    pub fn infer(name: &str, status: Option<&UnitStatus>) -> Self {
        if let Some(status) = status {
            if status.temp.is_some() {
                return Self::TemperatureSensor;
            }
            if status.span_second.is_some() {
                return Self::MotionSensor;
            }
        }

        let lower = name.to_lowercase();
        if lower.contains("light") || lower.contains("lamp") {
            Self::Light
        } else {
            Self::Switch
        }
    }
}
