use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::Device;
use super::Entity;
use super::HubEntity;
use crate::coordinator::UpdateCoordinator;
use crate::hub::model::Unit;

/// Seconds since the last motion pulse below which motion counts as active.
///
/// The hub reports recency rather than an active flag, so "motion" is
/// really "a pulse happened within this window". The boundary is exclusive:
/// exactly 30 seconds is off.
const MOTION_WINDOW_SECONDS: i64 = 30;

/// Motion detector backed by a hub unit.
pub struct MotionSensor {
    base: HubEntity,
}

impl MotionSensor {
    pub fn new(coordinator: Arc<UpdateCoordinator>, unit: &Unit) -> Self {
        Self {
            base: HubEntity::new(coordinator, unit, "binary_sensor"),
        }
    }

    /// Whether motion was detected recently; `None` while unavailable.
    ///
    /// A status without `span_second` counts as motion: the field appears
    /// on the very pulse that identifies the unit as a motion detector, and
    /// its absence afterwards means a pulse just happened.
    pub fn is_on(&self) -> Option<bool> {
        let status = self.base.status()?;
        Some(status.span_second.unwrap_or(0) < MOTION_WINDOW_SECONDS)
    }
}

#[async_trait]
impl Entity for MotionSensor {
    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn platform(&self) -> &'static str {
        "binary_sensor"
    }

    fn device(&self) -> &Device {
        self.base.device()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn state_json(&self) -> serde_json::Value {
        json!({ "motion": self.is_on() })
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

    fn span_status(span_second: i64) -> UnitStatus {
        UnitStatus {
            status: 0,
            mode: 0,
            temp: None,
            span_second: Some(span_second),
        }
    }

    async fn sensor_with_span(span_second: i64) -> (Arc<MockHubApi>, MotionSensor) {
        let api = Arc::new(MockHubApi::new(vec![unit("motion-2", "Motion", "Hall")]));
        api.set_status("motion-2", span_status(span_second));

        let coordinator = refreshed_coordinator(api.clone()).await;
        let sensor =
            MotionSensor::new(coordinator.clone(), &coordinator.snapshot().units["motion-2"]);
        (api, sensor)
    }

    #[tokio::test]
    async fn test_recent_pulse_is_motion() {
        let (_api, sensor) = sensor_with_span(10).await;
        assert_eq!(sensor.is_on(), Some(true));
    }

    #[tokio::test]
    async fn test_old_pulse_is_no_motion() {
        let (_api, sensor) = sensor_with_span(45).await;
        assert_eq!(sensor.is_on(), Some(false));
    }

    #[tokio::test]
    async fn test_boundary_is_exclusive() {
        // Exactly at the window: off, the comparison is strict less-than.
        let (_api, sensor) = sensor_with_span(30).await;
        assert_eq!(sensor.is_on(), Some(false));
    }

    #[tokio::test]
    async fn test_missing_span_counts_as_motion() {
        let api = Arc::new(MockHubApi::new(vec![unit("motion-2", "Motion", "Hall")]));
        api.set_status(
            "motion-2",
            UnitStatus {
                status: 0,
                mode: 0,
                temp: None,
                span_second: None,
            },
        );

        let coordinator = refreshed_coordinator(api).await;
        let sensor =
            MotionSensor::new(coordinator.clone(), &coordinator.snapshot().units["motion-2"]);
        assert_eq!(sensor.is_on(), Some(true));
    }

    #[tokio::test]
    async fn test_unavailable_reports_none() {
        let api = Arc::new(MockHubApi::new(vec![unit("motion-2", "Motion", "Hall")]));
        // No status scripted.

        let coordinator = refreshed_coordinator(api).await;
        let sensor =
            MotionSensor::new(coordinator.clone(), &coordinator.snapshot().units["motion-2"]);

        assert!(!sensor.available());
        assert_eq!(sensor.is_on(), None);
    }
}
