use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::hub::client::ApiError;
use crate::hub::client::HubApi;
use crate::hub::model::Unit;
use crate::hub::model::UnitStatus;

/// Capacity for queued out-of-band refresh requests.
///
/// A full queue means a refresh is already pending, so further requests can
/// be dropped without losing anything.
const REFRESH_QUEUE_SIZE: usize = 8;

/// Combined view of the hub, republished after every poll tick.
///
/// Only the coordinator writes snapshots; entities and API handlers read
/// them through [`UpdateCoordinator::snapshot`] and never mutate them.
///
/// Every key in `status` has a corresponding key in `units`. The reverse
/// does not hold: a unit whose status fetch has never succeeded is absent
/// from `status` and reports unavailable.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub units: HashMap<String, Unit>,
    pub status: HashMap<String, UnitStatus>,

    /// Whether the last refresh completed. False until the first successful
    /// refresh and after a failed inventory fetch; entities treat a failed
    /// snapshot as globally unavailable.
    pub last_update_success: bool,
}

/// A poll tick failed before any per-unit work could happen.
#[derive(Debug, thiserror::Error)]
#[error("hub update failed: {0}")]
pub struct UpdateError(#[from] pub ApiError);

/// Polls the hub and publishes [`Snapshot`]s.
///
/// The inventory is fetched once and cached for the lifetime of the
/// coordinator; unit status is fetched on every tick, sequentially per unit.
/// A per-unit status failure is logged and that unit's previous status
/// carried over stale — it never aborts the tick.
pub struct UpdateCoordinator {
    api: Arc<dyn HubApi>,
    scan_interval: Duration,
    snapshot: ArcSwap<Snapshot>,
    inventory: Mutex<Option<HashMap<String, Unit>>>,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<mpsc::Receiver<()>>,
}

impl UpdateCoordinator {
    pub fn new(api: Arc<dyn HubApi>, scan_interval: Duration) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_QUEUE_SIZE);
        Self {
            api,
            scan_interval,
            snapshot: ArcSwap::new(Arc::default()),
            inventory: Mutex::new(None),
            refresh_tx,
            refresh_rx: Mutex::new(refresh_rx),
        }
    }

    /// The hub client this coordinator polls through.
    pub fn api(&self) -> &dyn HubApi {
        self.api.as_ref()
    }

    /// Get the latest published snapshot.
    ///
    /// Clones the `Arc` (atomic refcount bump), essentially free.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Request an immediate out-of-band refresh.
    ///
    /// Used by entity write paths to reconcile optimistic state with hub
    /// truth. Never blocks; a refresh that is already queued absorbs the
    /// request.
    pub fn request_refresh(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            debug!("refresh request dropped: refresh already pending");
        }
    }

    /// Run one poll tick: ensure the inventory cache is populated, fetch
    /// status for every cached unit, publish the combined snapshot.
    pub async fn refresh(&self) -> Result<(), UpdateError> {
        let units = match self.cached_or_fetched_inventory().await {
            Ok(units) => units,
            Err(e) => {
                // Inventory failure aborts the tick; entities go unavailable
                // until a later tick succeeds.
                let previous = self.snapshot.load_full();
                self.snapshot.store(Arc::new(Snapshot {
                    units: previous.units.clone(),
                    status: previous.status.clone(),
                    last_update_success: false,
                }));
                return Err(UpdateError(e));
            }
        };

        let previous = self.snapshot.load_full();
        let mut status = HashMap::with_capacity(units.len());

        // Sequential on purpose: poll latency scales with unit count, but a
        // home has a handful of rooms and the hub is a small embedded box.
        for (full_id, unit) in &units {
            match self.api.get_unit_status(full_id).await {
                Ok(unit_status) => {
                    status.insert(full_id.clone(), unit_status);
                }
                Err(e) => {
                    warn!("status update for '{}' ({}) failed: {}", unit.name, full_id, e);
                    if let Some(stale) = previous.status.get(full_id) {
                        status.insert(full_id.clone(), stale.clone());
                    }
                }
            }
        }

        debug!(
            "publishing snapshot: {} units, {} with status",
            units.len(),
            status.len()
        );
        self.snapshot.store(Arc::new(Snapshot {
            units,
            status,
            last_update_success: true,
        }));

        Ok(())
    }

    /// Run the poll loop until the task is cancelled.
    ///
    /// Ticks on `scan_interval` and additionally whenever an out-of-band
    /// refresh is requested. A failed tick is logged and the cadence kept.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The first interval tick completes immediately; the caller already
        // performed the initial refresh, so consume it.
        interval.tick().await;

        let mut refresh_rx = self.refresh_rx.lock().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                Some(()) = refresh_rx.recv() => {
                    debug!("out-of-band refresh requested");
                }
            }

            if let Err(e) = self.refresh().await {
                warn!("{}", e);
            }
        }
    }

    async fn cached_or_fetched_inventory(&self) -> Result<HashMap<String, Unit>, ApiError> {
        let mut cache = self.inventory.lock().await;
        if let Some(units) = cache.as_ref() {
            return Ok(units.clone());
        }

        let fetched = self.api.get_all_units().await?;
        info!("discovered {} units in hub inventory", fetched.len());

        let units: HashMap<String, Unit> = fetched
            .into_iter()
            .map(|unit| (unit.full_id.clone(), unit))
            .collect();
        *cache = Some(units.clone());
        Ok(units)
    }

    /// Drain and count queued refresh requests.
    #[cfg(test)]
    pub(crate) fn pending_refresh_requests(&self) -> usize {
        let mut rx = self
            .refresh_rx
            .try_lock()
            .expect("refresh receiver is held by a running poll loop");
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::hub::client::MockHubApi;

    fn unit(full_id: &str, name: &str, room: &str) -> Unit {
        Unit {
            full_id: full_id.to_string(),
            name: name.to_string(),
            room_name: room.to_string(),
        }
    }

    fn on_status() -> UnitStatus {
        UnitStatus {
            status: 1,
            mode: 0,
            temp: None,
            span_second: None,
        }
    }

    fn coordinator_with(api: Arc<MockHubApi>) -> UpdateCoordinator {
        UpdateCoordinator::new(api, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_inventory_fetched_once_status_every_tick() {
        let api = Arc::new(MockHubApi::new(vec![
            unit("light-1", "Ceiling Light", "Living Room"),
            unit("switch-7", "Kettle", "Kitchen"),
        ]));
        api.set_status("light-1", on_status());
        api.set_status("switch-7", on_status());

        let coordinator = coordinator_with(api.clone());
        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        assert_eq!(api.inventory_calls(), 1);
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_snapshot_contains_units_and_status() {
        let api = Arc::new(MockHubApi::new(vec![unit(
            "light-1",
            "Ceiling Light",
            "Living Room",
        )]));
        api.set_status("light-1", on_status());

        let coordinator = coordinator_with(api);
        coordinator.refresh().await.unwrap();

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert_eq!(snapshot.units.len(), 1);
        assert_eq!(snapshot.units["light-1"].room_name, "Living Room");
        assert_eq!(snapshot.status["light-1"].status, 1);
    }

    #[tokio::test]
    async fn test_per_unit_failure_does_not_abort_tick() {
        let api = Arc::new(MockHubApi::new(vec![
            unit("light-1", "Ceiling Light", "Living Room"),
            unit("switch-7", "Kettle", "Kitchen"),
        ]));
        api.set_status("light-1", on_status());
        // switch-7 has no scripted status and fails.

        let coordinator = coordinator_with(api);
        coordinator.refresh().await.unwrap();

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert!(snapshot.status.contains_key("light-1"));
        assert!(!snapshot.status.contains_key("switch-7"));
    }

    #[tokio::test]
    async fn test_failed_unit_keeps_stale_status() {
        let api = Arc::new(MockHubApi::new(vec![unit("switch-7", "Kettle", "Kitchen")]));
        api.set_status("switch-7", on_status());

        let coordinator = coordinator_with(api.clone());
        coordinator.refresh().await.unwrap();

        // The unit starts failing; its previous status must survive.
        api.clear_status("switch-7");
        coordinator.refresh().await.unwrap();

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert_eq!(snapshot.status["switch-7"].status, 1);
    }

    #[tokio::test]
    async fn test_inventory_failure_marks_update_failed() {
        let api = Arc::new(MockHubApi::new(vec![unit("light-1", "Light", "Hall")]));
        api.fail_inventory.store(true, Ordering::SeqCst);

        let coordinator = coordinator_with(api);
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err.0, ApiError::Status(_)));

        let snapshot = coordinator.snapshot();
        assert!(!snapshot.last_update_success);
        assert!(snapshot.units.is_empty());
    }

    #[tokio::test]
    async fn test_recovery_after_failed_inventory() {
        let api = Arc::new(MockHubApi::new(vec![unit("light-1", "Light", "Hall")]));
        api.set_status("light-1", on_status());
        api.fail_inventory.store(true, Ordering::SeqCst);

        let coordinator = coordinator_with(api.clone());
        assert!(coordinator.refresh().await.is_err());

        api.fail_inventory.store(false, Ordering::SeqCst);
        coordinator.refresh().await.unwrap();

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert_eq!(snapshot.units.len(), 1);
    }

    #[tokio::test]
    async fn test_status_keys_are_subset_of_unit_keys() {
        let api = Arc::new(MockHubApi::new(vec![
            unit("light-1", "Light", "Hall"),
            unit("switch-7", "Kettle", "Kitchen"),
        ]));
        api.set_status("light-1", on_status());
        // A status entry for a unit the inventory does not know about must
        // never appear in a snapshot.
        api.set_status("ghost-9", on_status());

        let coordinator = coordinator_with(api);
        coordinator.refresh().await.unwrap();

        let snapshot = coordinator.snapshot();
        for full_id in snapshot.status.keys() {
            assert!(snapshot.units.contains_key(full_id));
        }
    }

    #[tokio::test]
    async fn test_request_refresh_queues_exactly_one() {
        let api = Arc::new(MockHubApi::new(Vec::new()));
        let coordinator = coordinator_with(api);

        coordinator.request_refresh();
        assert_eq!(coordinator.pending_refresh_requests(), 1);
        assert_eq!(coordinator.pending_refresh_requests(), 0);
    }
}
