//! In-memory vessel store using DashMap.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use seaway_core::spatial::is_valid_lat_lon;
use seaway_core::{LandMask, RoutePlanner, VesselSnapshot, VesselStore};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::persistence::{vessels as vessels_db, Database};

/// Updates held back while the persist channel is full.
const MAX_PERSIST_OVERFLOW: usize = 10_000;

/// One position report, from the AIS feed or `POST /v1/positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub vessel_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub course_deg: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub speed_knots: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PositionUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.vessel_id.trim().is_empty() {
            return Err("vessel_id is required".to_string());
        }
        if !is_valid_lat_lon(self.latitude, self.longitude) {
            return Err(format!(
                "position [{}, {}] is out of range",
                self.latitude, self.longitude
            ));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> VesselSnapshot {
        VesselSnapshot {
            id: self.vessel_id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            course_deg: self.course_deg,
            heading_deg: self.heading_deg,
            speed_knots: self.speed_knots,
        }
    }
}

/// Latest known state of a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    #[serde(flatten)]
    pub snapshot: VesselSnapshot,
    pub name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Application state: latest positions, land geometry and planner settings.
pub struct AppState {
    vessels: DashMap<String, VesselRecord>,
    config: Config,
    planner: RoutePlanner,
    land: Option<Arc<dyn LandMask>>,
    database: Option<Database>,
    persist_tx: Mutex<Option<mpsc::Sender<PositionUpdate>>>,
    persist_overflow: Mutex<VecDeque<PositionUpdate>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            vessels: DashMap::new(),
            planner: config.planner(),
            config,
            land: None,
            database: None,
            persist_tx: Mutex::new(None),
            persist_overflow: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_database(database: Database, config: Config) -> Self {
        Self {
            database: Some(database),
            ..Self::new(config)
        }
    }

    pub fn with_land(mut self, land: Option<Arc<dyn LandMask>>) -> Self {
        self.land = land;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    pub fn land(&self) -> Option<Arc<dyn LandMask>> {
        self.land.clone()
    }

    pub fn set_persist_sender(&self, tx: mpsc::Sender<PositionUpdate>) {
        if let Ok(mut slot) = self.persist_tx.lock() {
            *slot = Some(tx);
        }
    }

    /// Load the latest position of every vessel from the database.
    pub async fn load_from_database(&self) -> anyhow::Result<usize> {
        let Some(database) = &self.database else {
            return Ok(0);
        };
        let records = vessels_db::load_latest_positions(database.pool()).await?;
        let count = records.len();
        for record in records {
            self.vessels.insert(record.snapshot.id.clone(), record);
        }
        tracing::info!(vessels = count, "Loaded vessel positions from database");
        Ok(count)
    }

    /// Apply a validated position update and queue it for persistence.
    ///
    /// Out-of-order updates are persisted but never replace a newer latest
    /// position.
    pub fn apply_position(&self, mut update: PositionUpdate) -> Result<(), String> {
        update.validate()?;
        let timestamp = *update.timestamp.get_or_insert_with(Utc::now);

        self.vessels
            .entry(update.vessel_id.clone())
            .and_modify(|record| {
                if timestamp >= record.updated_at {
                    record.snapshot = update.snapshot();
                    record.updated_at = timestamp;
                }
                if update.name.is_some() {
                    record.name = update.name.clone();
                }
            })
            .or_insert_with(|| VesselRecord {
                snapshot: update.snapshot(),
                name: update.name.clone(),
                updated_at: timestamp,
            });

        self.queue_persist(update);
        Ok(())
    }

    fn queue_persist(&self, update: PositionUpdate) {
        let sender = match self.persist_tx.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        let Some(tx) = sender else {
            return;
        };
        if let Err(err) = tx.try_send(update) {
            let update = match err {
                mpsc::error::TrySendError::Full(update) => update,
                mpsc::error::TrySendError::Closed(_) => return,
            };
            if let Ok(mut overflow) = self.persist_overflow.lock() {
                if overflow.len() >= MAX_PERSIST_OVERFLOW {
                    overflow.pop_front();
                    tracing::warn!("Persist overflow full; dropping oldest position update");
                }
                overflow.push_back(update);
            }
        }
    }

    /// Updates that did not fit in the persist channel.
    pub fn take_persist_overflow(&self) -> Vec<PositionUpdate> {
        match self.persist_overflow.lock() {
            Ok(mut overflow) => overflow.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn get_vessel(&self, id: &str) -> Option<VesselRecord> {
        self.vessels.get(id).map(|r| r.value().clone())
    }

    /// All vessels, sorted by id.
    pub fn get_all_vessels(&self) -> Vec<VesselRecord> {
        let mut vessels: Vec<VesselRecord> = self.vessels.iter().map(|r| r.value().clone()).collect();
        vessels.sort_by(|a, b| a.snapshot.id.cmp(&b.snapshot.id));
        vessels
    }

    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }
}

impl VesselStore for AppState {
    fn vessel_ids(&self) -> Vec<String> {
        self.vessels.iter().map(|r| r.key().clone()).collect()
    }

    fn latest_position(&self, id: &str) -> Option<VesselSnapshot> {
        self.vessels.get(id).map(|r| r.value().snapshot.clone())
    }

    fn fleet(&self) -> Vec<VesselSnapshot> {
        self.get_all_vessels().into_iter().map(|record| record.snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn update(id: &str, lat: f64, lon: f64) -> PositionUpdate {
        PositionUpdate {
            vessel_id: id.to_string(),
            name: None,
            latitude: lat,
            longitude: lon,
            course_deg: Some(90.0),
            heading_deg: None,
            speed_knots: Some(5.0),
            timestamp: None,
        }
    }

    #[test]
    fn latest_position_wins() {
        let state = AppState::new(Config::from_env());
        let now = Utc::now();

        let mut first = update("273", 43.0, 131.9);
        first.timestamp = Some(now);
        let mut stale = update("273", 42.0, 131.0);
        stale.timestamp = Some(now - Duration::seconds(30));
        stale.name = Some("VOSTOK".to_string());

        state.apply_position(first).unwrap();
        state.apply_position(stale).unwrap();

        let record = state.get_vessel("273").unwrap();
        assert_eq!(record.snapshot.latitude, 43.0);
        assert_eq!(record.name.as_deref(), Some("VOSTOK"));
        assert_eq!(state.fleet().len(), 1);
    }

    #[test]
    fn invalid_positions_are_rejected() {
        let state = AppState::new(Config::from_env());
        assert!(state.apply_position(update("", 43.0, 131.9)).is_err());
        assert!(state.apply_position(update("1", 91.0, 131.9)).is_err());
        assert!(state.apply_position(update("1", f64::NAN, 131.9)).is_err());
        assert_eq!(state.vessel_count(), 0);
    }

    #[test]
    fn full_channel_spills_into_overflow() {
        let state = AppState::new(Config::from_env());
        let (tx, _rx) = mpsc::channel(1);
        state.set_persist_sender(tx);

        state.apply_position(update("1", 43.0, 131.9)).unwrap();
        state.apply_position(update("2", 43.1, 131.9)).unwrap();

        let overflow = state.take_persist_overflow();
        assert_eq!(overflow.len(), 1);
        assert_eq!(overflow[0].vessel_id, "2");
        assert!(state.take_persist_overflow().is_empty());
    }

    #[test]
    fn overflow_drops_oldest_updates_past_its_cap() {
        let state = AppState::new(Config::from_env());
        let (tx, _rx) = mpsc::channel(1);
        state.set_persist_sender(tx);

        // the first update fills the channel, the rest spill
        for i in 0..MAX_PERSIST_OVERFLOW + 3 {
            state.apply_position(update(&i.to_string(), 43.0, 131.9)).unwrap();
        }

        let overflow = state.take_persist_overflow();
        assert_eq!(overflow.len(), MAX_PERSIST_OVERFLOW);
        assert_eq!(overflow[0].vessel_id, "3");
        assert_eq!(
            overflow.last().map(|u| u.vessel_id.clone()),
            Some((MAX_PERSIST_OVERFLOW + 2).to_string())
        );
    }
}
