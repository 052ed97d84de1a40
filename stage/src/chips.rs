//! Chip registry and per-chip combat state.

use std::collections::BTreeMap;

use circuit_defence_core::{ChipId, ChipKind, ChipRecord, NodeId};

/// Mutable state of one chip socketed at a node.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChipState {
    /// Identifier allocated by the registry.
    pub(crate) id: ChipId,
    /// Node the chip is socketed at.
    pub(crate) node: NodeId,
    /// Kind assigned to the chip.
    pub(crate) kind: ChipKind,
    /// Power level assigned to the chip.
    pub(crate) power: u32,
    /// Ticks remaining before the chip may fire again.
    pub(crate) cooldown: u32,
    /// Cooldown period re-armed after every shot.
    pub(crate) period: u32,
}

impl ChipState {
    fn empty(id: ChipId, node: NodeId) -> Self {
        Self {
            id,
            node,
            kind: ChipKind::Empty,
            power: 0,
            cooldown: 0,
            period: 0,
        }
    }

    /// Assigns a new kind and power, resetting the cooldown machinery.
    pub(crate) fn configure(&mut self, kind: ChipKind, power: u32, period: u32) {
        self.kind = kind;
        self.power = power;
        self.period = period;
        self.cooldown = 0;
    }

    /// Advances the cooldown counter one tick toward readiness.
    pub(crate) fn cool_down(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    /// Reports whether the chip may fire this tick.
    pub(crate) fn ready(&self) -> bool {
        self.kind.is_armed() && self.cooldown == 0
    }

    /// Starts a fresh cooldown after a shot.
    pub(crate) fn arm_cooldown(&mut self) {
        self.cooldown = self.period;
    }
}

/// Registry that stores chips and manages identifier allocation.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChipRegistry {
    entries: BTreeMap<ChipId, ChipState>,
}

impl ChipRegistry {
    /// Creates one empty chip per socket node, in node identifier order.
    pub(crate) fn from_sockets<I>(sockets: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut entries = BTreeMap::new();
        for (index, node) in sockets.into_iter().enumerate() {
            let id = ChipId::new(index as u32);
            let _ = entries.insert(id, ChipState::empty(id, node));
        }
        Self { entries }
    }

    /// Chip with the provided identifier.
    pub(crate) fn chip(&self, id: ChipId) -> Option<&ChipState> {
        self.entries.get(&id)
    }

    /// Mutable chip access for configuration and firing.
    pub(crate) fn chip_mut(&mut self, id: ChipId) -> Option<&mut ChipState> {
        self.entries.get_mut(&id)
    }

    /// Iterator over all chips in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ChipState> {
        self.entries.values()
    }

    /// Mutable iterator over all chips in identifier order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChipState> {
        self.entries.values_mut()
    }

    /// Restores chip state from snapshot records, keeping only known chips.
    pub(crate) fn restore(&mut self, records: &[ChipRecord]) {
        for record in records {
            if let Some(chip) = self.entries.get_mut(&record.id) {
                chip.kind = record.kind;
                chip.power = record.power;
                chip.cooldown = record.cooldown;
                chip.period = record.period;
            }
        }
    }
}
