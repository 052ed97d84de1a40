#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns chip readiness and proximity data into fire commands.

use circuit_defence_core::{ChipView, Command, NodeId, Phase, VehicleId};

/// Combat resolver that queues firing commands for ready chips.
///
/// The resolver owns no targeting tables of its own: each chip asks its
/// owning node for the first vehicle within the chip's attack range, so the
/// per-tick cost tracks local vehicle density rather than the stage-wide
/// vehicle count.
#[derive(Debug, Default)]
pub struct CombatResolver {
    scratch: Vec<Command>,
}

impl CombatResolver {
    /// Creates a new combat resolver with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireChip` entries for chips ready to fire.
    ///
    /// `first_in_range` answers the first vehicle a node tracks within the
    /// provided range, in targeting order; the stage validates every shot
    /// again on application, so a stale answer costs nothing but a wasted
    /// command.
    pub fn handle<F>(&mut self, phase: Phase, chips: &ChipView, first_in_range: F, out: &mut Vec<Command>)
    where
        F: Fn(NodeId, f32) -> Option<VehicleId>,
    {
        if phase != Phase::Running {
            return;
        }

        if chips.iter().next().is_none() {
            return;
        }

        self.scratch.clear();

        for chip in chips.iter() {
            if !chip.kind.is_armed() || chip.cooldown != 0 {
                continue;
            }

            if let Some(target) = first_in_range(chip.node, chip.range) {
                self.scratch.push(Command::FireChip {
                    chip: chip.id,
                    target,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_defence_core::{ChipId, ChipKind, ChipSnapshot};

    fn chip(id: u32, node: u32, kind: ChipKind, cooldown: u32) -> ChipSnapshot {
        ChipSnapshot {
            id: ChipId::new(id),
            node: NodeId::new(node),
            kind,
            power: 1,
            cooldown,
            range: kind.attack_range(),
        }
    }

    #[test]
    fn ready_chips_fire_at_the_first_tracked_vehicle() {
        let mut system = CombatResolver::new();
        let chips = ChipView::from_snapshots(vec![
            chip(0, 1, ChipKind::Subtract, 0),
            chip(1, 2, ChipKind::Mem, 0),
        ]);

        let mut out = Vec::new();
        system.handle(
            Phase::Running,
            &chips,
            |node, _| Some(VehicleId::new(node.get() * 10)),
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                Command::FireChip {
                    chip: ChipId::new(0),
                    target: VehicleId::new(10),
                },
                Command::FireChip {
                    chip: ChipId::new(1),
                    target: VehicleId::new(20),
                },
            ],
        );
    }

    #[test]
    fn empty_and_cooling_chips_stay_silent() {
        let mut system = CombatResolver::new();
        let chips = ChipView::from_snapshots(vec![
            chip(0, 1, ChipKind::Empty, 0),
            chip(1, 2, ChipKind::Subtract, 3),
        ]);

        let mut out = Vec::new();
        system.handle(
            Phase::Running,
            &chips,
            |_, _| Some(VehicleId::new(7)),
            &mut out,
        );

        assert!(out.is_empty());
    }

    #[test]
    fn chips_pass_their_own_range_to_the_node() {
        let mut system = CombatResolver::new();
        let chips = ChipView::from_snapshots(vec![chip(0, 4, ChipKind::Mem, 0)]);

        let mut out = Vec::new();
        system.handle(
            Phase::Running,
            &chips,
            |node, range| {
                assert_eq!(node, NodeId::new(4));
                assert_eq!(range, ChipKind::Mem.attack_range());
                None
            },
            &mut out,
        );

        assert!(out.is_empty());
    }

    #[test]
    fn non_running_phases_are_silent() {
        let mut system = CombatResolver::new();
        let chips = ChipView::from_snapshots(vec![chip(0, 1, ChipKind::Subtract, 0)]);

        for phase in [Phase::Start, Phase::Paused, Phase::Intermezzo, Phase::Lost] {
            let mut out = Vec::new();
            system.handle(phase, &chips, |_, _| Some(VehicleId::new(1)), &mut out);
            assert!(out.is_empty(), "phase {phase:?} must not fire");
        }
    }
}
