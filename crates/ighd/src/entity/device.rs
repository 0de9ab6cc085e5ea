use serde::Serialize;

use crate::hub::model::Unit;

/// Descriptor published for the device backing an entity.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Pure data holder pairing a unit id with its static descriptor.
///
/// Created once from the inventory; never updated afterwards. The live
/// state lives in the coordinator snapshot, keyed by `unit_id`.
#[derive(Debug, Clone)]
pub struct Device {
    pub unit_id: String,

    /// The unit's own name as configured on the hub. Scenario names are
    /// derived from this, so it must stay exactly as the hub reports it.
    pub name: String,

    pub room_name: String,
}

impl Device {
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            unit_id: unit.full_id.clone(),
            name: unit.name.clone(),
            room_name: unit.room_name.clone(),
        }
    }

    /// Display name: room followed by unit name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.room_name, self.name)
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![self.unit_id.clone()],
            name: self.display_name(),
            manufacturer: "Greenpoint",
            model: "IGH Compact",
        }
    }
}
