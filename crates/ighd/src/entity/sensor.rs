use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::Device;
use super::Entity;
use super::HubEntity;
use crate::coordinator::UpdateCoordinator;
use crate::hub::model::Unit;

/// Temperature sensor backed by a hub unit.
///
/// The hub already reports Celsius; the value is passed through unchanged.
pub struct TemperatureSensor {
    base: HubEntity,
}

impl TemperatureSensor {
    pub fn new(coordinator: Arc<UpdateCoordinator>, unit: &Unit) -> Self {
        Self {
            base: HubEntity::new(coordinator, unit, "sensor"),
        }
    }

    /// Current temperature in Celsius; `None` while unavailable or when the
    /// unit stops reporting one.
    pub fn native_value(&self) -> Option<f64> {
        self.base.status().and_then(|s| s.temp)
    }
}

#[async_trait]
impl Entity for TemperatureSensor {
    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn platform(&self) -> &'static str {
        "sensor"
    }

    fn device(&self) -> &Device {
        self.base.device()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn state_json(&self) -> serde_json::Value {
        json!({ "temperature": self.native_value() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::refreshed_coordinator;
    use super::super::test_support::unit;
    use super::*;
    use crate::hub::client::MockHubApi;
    use crate::hub::model::UnitStatus;

    fn temp_status(temp: f64) -> UnitStatus {
        UnitStatus {
            status: 0,
            mode: 0,
            temp: Some(temp),
            span_second: None,
        }
    }

    #[tokio::test]
    async fn test_temperature_passthrough() {
        let api = Arc::new(MockHubApi::new(vec![unit(
            "sensor-3",
            "Thermometer",
            "Bedroom",
        )]));
        api.set_status("sensor-3", temp_status(21.5));

        let coordinator = refreshed_coordinator(api).await;
        let sensor =
            TemperatureSensor::new(coordinator.clone(), &coordinator.snapshot().units["sensor-3"]);

        assert_eq!(sensor.native_value(), Some(21.5));
        assert_eq!(
            sensor.state_json(),
            serde_json::json!({ "temperature": 21.5 })
        );
    }

    #[tokio::test]
    async fn test_unavailable_sensor_has_no_value() {
        let api = Arc::new(MockHubApi::new(vec![unit(
            "sensor-3",
            "Thermometer",
            "Bedroom",
        )]));
        // No status scripted.

        let coordinator = refreshed_coordinator(api).await;
        let sensor =
            TemperatureSensor::new(coordinator.clone(), &coordinator.snapshot().units["sensor-3"]);

        assert!(!sensor.available());
        assert_eq!(sensor.native_value(), None);
    }

    #[tokio::test]
    async fn test_turn_on_is_unsupported() {
        let api = Arc::new(MockHubApi::new(vec![unit(
            "sensor-3",
            "Thermometer",
            "Bedroom",
        )]));
        api.set_status("sensor-3", temp_status(20.0));

        let coordinator = refreshed_coordinator(api.clone()).await;
        let sensor =
            TemperatureSensor::new(coordinator.clone(), &coordinator.snapshot().units["sensor-3"]);

        assert!(sensor.turn_on().await.is_err());
        assert!(api.scenarios_run().is_empty());
    }
}
