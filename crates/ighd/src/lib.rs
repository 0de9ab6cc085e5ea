pub mod api;
pub mod config;
mod coordinator;
mod entity;
mod hub;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use coordinator::Snapshot;
pub use coordinator::UpdateCoordinator;
pub use coordinator::UpdateError;
pub use entity::build_entities;
pub use entity::Device;
pub use entity::DeviceInfo;
pub use entity::Entity;
pub use hub::client::ApiError;
pub use hub::client::HubApi;
pub use hub::client::HubClient;
pub use hub::model::HomeData;
pub use hub::model::Unit;
pub use hub::model::UnitKind;
pub use hub::model::UnitStatus;
