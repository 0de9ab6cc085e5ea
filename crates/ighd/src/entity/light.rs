use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::Device;
use super::Entity;
use super::HubEntity;
use crate::coordinator::UpdateCoordinator;
use crate::hub::model::Unit;

/// Light backed by a hub unit.
///
/// The hub exposes lights as plain on/off endpoints; brightness and color
/// are not part of its API. Writes run the `"<unit name> On"`/
/// `"<unit name> Off"` scenarios, same as switches.
pub struct Light {
    base: HubEntity,
}

impl Light {
    pub fn new(coordinator: Arc<UpdateCoordinator>, unit: &Unit) -> Self {
        Self {
            base: HubEntity::new(coordinator, unit, "light"),
        }
    }

    /// On/off state; `None` while unavailable. Any non-zero status counts
    /// as on.
    pub fn is_on(&self) -> Option<bool> {
        self.base.status().map(|s| s.status > 0)
    }
}

#[async_trait]
impl Entity for Light {
    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn platform(&self) -> &'static str {
        "light"
    }

    fn device(&self) -> &Device {
        self.base.device()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn state_json(&self) -> serde_json::Value {
        json!({ "is_on": self.is_on() })
    }

    async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>> {
        self.base.run_scenario("On").await
    }

    async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>> {
        self.base.run_scenario("Off").await
    }
}
