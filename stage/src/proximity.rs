//! Push-based distance bookkeeping between a node and nearby vehicles.
//!
//! The motion engine notifies the endpoint nodes of a vehicle's current link
//! every tick, so targeting never scans the full vehicle population: a node
//! only ever holds entries for vehicles on its incident links.

use circuit_defence_core::{Passage, VehicleId};

/// One tracked vehicle: distance to the node plus its approach direction.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ProximityEntry {
    vehicle: VehicleId,
    distance: f32,
    passage: Passage,
}

/// Insertion-ordered table of vehicles a node currently knows about.
///
/// Insertion order doubles as the targeting order, which makes the
/// "first vehicle in range" selection deterministic across runs.
#[derive(Clone, Debug, Default)]
pub(crate) struct ProximityTable {
    entries: Vec<ProximityEntry>,
}

impl ProximityTable {
    /// Records or updates a vehicle's distance and direction.
    pub(crate) fn notify(&mut self, vehicle: VehicleId, distance: f32, passage: Passage) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.vehicle == vehicle)
        {
            entry.distance = distance;
            entry.passage = passage;
        } else {
            self.entries.push(ProximityEntry {
                vehicle,
                distance,
                passage,
            });
        }
    }

    /// Distance to the vehicle, or `None` for unknown or departed vehicles.
    pub(crate) fn distance_to(&self, vehicle: VehicleId) -> Option<f32> {
        self.entries
            .iter()
            .find(|entry| entry.vehicle == vehicle)
            .and_then(|entry| match entry.passage {
                Passage::Gone => None,
                Passage::Approaching | Passage::Leaving => Some(entry.distance),
            })
    }

    /// Vehicles within `range`, in insertion order.
    ///
    /// Entries marked [`Passage::Gone`] never appear here; their storage is
    /// reclaimed by the per-tick [`ProximityTable::sweep`].
    pub(crate) fn vehicles_in_range(&self, range: f32) -> impl Iterator<Item = VehicleId> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.passage != Passage::Gone && entry.distance <= range)
            .map(|entry| entry.vehicle)
    }

    /// First tracked vehicle within `range`, if any.
    pub(crate) fn first_in_range(&self, range: f32) -> Option<VehicleId> {
        self.vehicles_in_range(range).next()
    }

    /// Drops entries marked [`Passage::Gone`].
    pub(crate) fn sweep(&mut self) {
        self.entries.retain(|entry| entry.passage != Passage::Gone);
    }

    /// Removes every trace of the vehicle, regardless of direction flag.
    pub(crate) fn forget(&mut self, vehicle: VehicleId) {
        self.entries.retain(|entry| entry.vehicle != vehicle);
    }

    /// Number of vehicles currently tracked, departed entries included.
    pub(crate) fn tracked(&self) -> usize {
        self.entries.len()
    }
}
