//! Read-only access to the latest vessel positions.

use crate::models::VesselSnapshot;

/// Source of the most recent snapshot per vessel.
pub trait VesselStore {
    fn vessel_ids(&self) -> Vec<String>;

    fn latest_position(&self, id: &str) -> Option<VesselSnapshot>;

    /// Every vessel with a known position.
    fn fleet(&self) -> Vec<VesselSnapshot> {
        self.vessel_ids()
            .iter()
            .filter_map(|id| self.latest_position(id))
            .collect()
    }
}

impl VesselStore for [VesselSnapshot] {
    fn vessel_ids(&self) -> Vec<String> {
        self.iter().map(|vessel| vessel.id.clone()).collect()
    }

    fn latest_position(&self, id: &str) -> Option<VesselSnapshot> {
        self.iter().rev().find(|vessel| vessel.id == id).cloned()
    }

    fn fleet(&self) -> Vec<VesselSnapshot> {
        self.to_vec()
    }
}
