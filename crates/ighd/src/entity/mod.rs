mod binary_sensor;
mod device;
mod light;
mod sensor;
mod switch;

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

pub use binary_sensor::MotionSensor;
pub use device::Device;
pub use device::DeviceInfo;
pub use light::Light;
pub use sensor::TemperatureSensor;
pub use switch::Switch;

use crate::coordinator::UpdateCoordinator;
use crate::hub::model::Unit;
use crate::hub::model::UnitKind;
use crate::hub::model::UnitStatus;

/// Base capability every entity adapter exposes.
///
/// Entities are read-only projections of the coordinator snapshot; the only
/// write paths are `turn_on`/`turn_off`, which run hub scenarios and are
/// unsupported on sensor platforms.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Stable identifier, unique across all platforms.
    fn unique_id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Platform discriminator: "switch", "light", "sensor", "binary_sensor".
    fn platform(&self) -> &'static str;

    /// Static descriptor of the unit backing this entity.
    fn device(&self) -> &Device;

    /// Whether the entity currently has a usable state.
    fn available(&self) -> bool;

    /// Serialize the current state to JSON.
    fn state_json(&self) -> serde_json::Value;

    /// Turn the unit on. Default: not controllable.
    async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>> {
        Err(not_controllable(self.platform()))
    }

    /// Turn the unit off. Default: not controllable.
    async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>> {
        Err(not_controllable(self.platform()))
    }
}

fn not_controllable(platform: &str) -> Box<dyn Error + Send> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{} entities cannot be controlled", platform),
    ))
}

/// Shared plumbing for all entity adapters: the device descriptor and a
/// handle to the coordinator snapshot.
pub(crate) struct HubEntity {
    coordinator: Arc<UpdateCoordinator>,
    device: Device,
    unique_id: String,
    name: String,
}

impl HubEntity {
    pub(crate) fn new(
        coordinator: Arc<UpdateCoordinator>,
        unit: &Unit,
        platform: &'static str,
    ) -> Self {
        let device = Device::from_unit(unit);
        Self {
            unique_id: format!("{}_{}", unit.full_id, platform),
            name: device.display_name(),
            device,
            coordinator,
        }
    }

    pub(crate) fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    /// Available iff the last refresh succeeded and this unit has a status
    /// entry in the snapshot.
    pub(crate) fn available(&self) -> bool {
        let snapshot = self.coordinator.snapshot();
        snapshot.last_update_success && snapshot.status.contains_key(&self.device.unit_id)
    }

    /// Status for this unit, `None` while unavailable.
    pub(crate) fn status(&self) -> Option<UnitStatus> {
        let snapshot = self.coordinator.snapshot();
        if !snapshot.last_update_success {
            return None;
        }
        snapshot.status.get(&self.device.unit_id).cloned()
    }

    /// Run the `"<unit name> <suffix>"` scenario and request a re-poll.
    ///
    /// The hub does not confirm what the scenario did (or whether it even
    /// exists); the re-poll reconciles the entity with hub truth.
    pub(crate) async fn run_scenario(&self, suffix: &str) -> Result<(), Box<dyn Error + Send>> {
        let scenario = format!("{} {}", self.device.name, suffix);
        debug!("running scenario '{}' for {}", scenario, self.unique_id);

        self.coordinator
            .api()
            .run_scenario(&scenario)
            .await
            .map_err(|e| -> Box<dyn Error + Send> { Box::new(e) })?;

        self.coordinator.request_refresh();
        Ok(())
    }
}

/// Build one entity per discovered unit, the variant chosen by
/// [`UnitKind::infer`] against the current snapshot.
///
/// Call after the first successful refresh; units without a status entry at
/// that point fall back to the name heuristic.
pub fn build_entities(coordinator: &Arc<UpdateCoordinator>) -> Vec<Arc<dyn Entity>> {
    let snapshot = coordinator.snapshot();
    let mut entities: Vec<Arc<dyn Entity>> = Vec::with_capacity(snapshot.units.len());

    for (full_id, unit) in &snapshot.units {
        let kind = UnitKind::infer(&unit.name, snapshot.status.get(full_id));
        let entity: Arc<dyn Entity> = match kind {
            UnitKind::Switch => Arc::new(Switch::new(coordinator.clone(), unit)),
            UnitKind::Light => Arc::new(Light::new(coordinator.clone(), unit)),
            UnitKind::TemperatureSensor => {
                Arc::new(TemperatureSensor::new(coordinator.clone(), unit))
            }
            UnitKind::MotionSensor => Arc::new(MotionSensor::new(coordinator.clone(), unit)),
        };

        info!(
            "adding {} entity: {} ({})",
            entity.platform(),
            entity.name(),
            entity.unique_id()
        );
        entities.push(entity);
    }

    // Stable listing order for the API and logs.
    entities.sort_by(|a, b| a.unique_id().cmp(b.unique_id()));
    entities
}
