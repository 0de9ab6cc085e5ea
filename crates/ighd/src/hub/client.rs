use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::model::HomeData;
use super::model::ScenarioList;
use super::model::Unit;
use super::model::UnitStatus;

/// Per-request timeout for all hub calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by the hub API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The hub rejected the access token (HTTP 401).
    #[error("hub rejected the access token")]
    Auth,

    /// The hub could not be reached at the transport level.
    #[error("cannot connect to hub: {0}")]
    Connect(#[source] reqwest::Error),

    /// The hub answered with an unexpected HTTP status.
    #[error("hub returned HTTP {0}")]
    Status(StatusCode),

    /// The hub answered successfully but the body did not parse.
    #[error("malformed hub response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client-side view of the hub HTTP API.
///
/// All endpoints are GETs with the token in the query string; the hub has no
/// header-based auth. The only mutation primitive is `run_scenario` — there
/// is no direct set-value verb.
///
/// This trait exists so the coordinator and entities can be tested against a
/// scripted mock instead of a live hub.
#[async_trait]
pub trait HubApi: Send + Sync {
    /// Fetch the full home inventory (rooms and the units inside them).
    async fn get_home_data(&self) -> Result<HomeData, ApiError>;

    /// Fetch the latest status of a single unit.
    async fn get_unit_status(&self, full_id: &str) -> Result<UnitStatus, ApiError>;

    /// Fire a named scenario on the hub. Returns the raw response body.
    ///
    /// The hub gives no indication whether a scenario with that name exists
    /// or what it did; callers reconcile by re-polling.
    async fn run_scenario(&self, name: &str) -> Result<String, ApiError>;

    /// List the names of all scenarios configured on the hub.
    async fn get_scenarios(&self) -> Result<Vec<String>, ApiError>;

    /// Fetch the inventory and flatten it into room-tagged units.
    async fn get_all_units(&self) -> Result<Vec<Unit>, ApiError> {
        let home = self.get_home_data().await?;
        if home.rooms.is_none() {
            warn!("hub inventory contains no rooms");
        }
        Ok(home.flatten_units())
    }

    /// Best-effort connectivity probe. Swallows and logs all errors.
    async fn test_connection(&self) -> bool {
        match self.get_home_data().await {
            Ok(_) => true,
            Err(e) => {
                error!("hub connection test failed: {}", e);
                false
            }
        }
    }
}

/// HTTP client for the hub API, backed by a single shared reqwest client.
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HubClient {
    /// Create a new client for the hub at `host:port`.
    pub fn new(host: &str, port: u16, token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
            token: token.into(),
        })
    }

    /// Map the HTTP status line into the error taxonomy.
    ///
    /// 401 is an auth failure regardless of endpoint; any other non-success
    /// status surfaces as-is.
    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::Auth),
            status if !status.is_success() => Err(ApiError::Status(status)),
            _ => Ok(response),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .query(extra_query)
            .send()
            .await
            .map_err(ApiError::Connect)?;

        Self::check_status(response)?
            .json()
            .await
            .map_err(ApiError::Decode)
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn get_home_data(&self) -> Result<HomeData, ApiError> {
        self.get_json("/home", &[]).await
    }

    async fn get_unit_status(&self, full_id: &str) -> Result<UnitStatus, ApiError> {
        self.get_json(&format!("/unit/{}", full_id), &[]).await
    }

    async fn run_scenario(&self, name: &str) -> Result<String, ApiError> {
        let url = format!("{}/scenario", self.base_url);
        debug!("GET {} (scenario '{}')", url, name);

        let response = self
            .http
            .get(&url)
            .query(&[("name", name), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(ApiError::Connect)?;

        Self::check_status(response)?
            .text()
            .await
            .map_err(ApiError::Decode)
    }

    async fn get_scenarios(&self) -> Result<Vec<String>, ApiError> {
        let list: ScenarioList = self.get_json("/scenario", &[]).await?;
        if list.scenarios.is_none() {
            warn!("hub returned no scenario list");
        }
        Ok(list.names())
    }
}

/// Scripted hub for testing the coordinator and entities.
#[cfg(test)]
#[derive(Default)]
pub struct MockHubApi {
    /// Units returned by `get_all_units`, grouped into one room each.
    pub units: Vec<Unit>,

    /// Scripted status per unit id. Units without an entry fail with an
    /// HTTP 503 status error.
    pub status: std::sync::Mutex<std::collections::HashMap<String, UnitStatus>>,

    /// When set, inventory fetches fail with an HTTP 503 status error.
    pub fail_inventory: std::sync::atomic::AtomicBool,

    pub inventory_calls: std::sync::atomic::AtomicUsize,
    pub status_calls: std::sync::atomic::AtomicUsize,

    /// Every scenario name passed to `run_scenario`, in order.
    pub scenarios_run: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockHubApi {
    pub fn new(units: Vec<Unit>) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn set_status(&self, full_id: &str, status: UnitStatus) {
        self.status
            .lock()
            .unwrap()
            .insert(full_id.to_string(), status);
    }

    pub fn clear_status(&self, full_id: &str) {
        self.status.lock().unwrap().remove(full_id);
    }

    pub fn inventory_calls(&self) -> usize {
        self.inventory_calls
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn scenarios_run(&self) -> Vec<String> {
        self.scenarios_run.lock().unwrap().clone()
    }

    fn unavailable() -> ApiError {
        ApiError::Status(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[cfg(test)]
#[async_trait]
impl HubApi for MockHubApi {
    async fn get_home_data(&self) -> Result<HomeData, ApiError> {
        self.inventory_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.fail_inventory.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let rooms = self
            .units
            .iter()
            .map(|unit| {
                serde_json::json!({
                    "name": unit.room_name,
                    "units": [{"name": unit.name, "fullId": unit.full_id}],
                })
            })
            .collect::<Vec<_>>();

        Ok(serde_json::from_value(serde_json::json!({ "rooms": rooms })).unwrap())
    }

    async fn get_unit_status(&self, full_id: &str) -> Result<UnitStatus, ApiError> {
        self.status_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        self.status
            .lock()
            .unwrap()
            .get(full_id)
            .cloned()
            .ok_or_else(Self::unavailable)
    }

    async fn run_scenario(&self, name: &str) -> Result<String, ApiError> {
        self.scenarios_run.lock().unwrap().push(name.to_string());
        Ok("OK".to_string())
    }

    async fn get_scenarios(&self) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }
}
