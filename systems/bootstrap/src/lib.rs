#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares a Circuit Defence stage.
//!
//! Bootstrap is the only place external modifiers meet level data: it
//! resolves the hero/upgrade effects into a concrete [`StageConfig`] and
//! forwards the descriptor to the stage for topology validation.

use circuit_defence_core::{
    LevelDescriptor, ModifierKind, ModifierProvider, StageConfig, TopologyError,
    DEFAULT_SPEED_FACTOR,
};
use circuit_defence_stage::Stage;

/// Produces validated stages from level descriptors and active modifiers.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Resolves external modifiers into a per-stage configuration.
    ///
    /// Missing modifiers resolve to their neutral values, so a bare
    /// [`circuit_defence_core::NeutralModifiers`] reproduces the descriptor
    /// exactly.
    #[must_use]
    pub fn resolve_config(
        &self,
        descriptor: &LevelDescriptor,
        modifiers: &dyn ModifierProvider,
        seed: u64,
    ) -> StageConfig {
        let cash_bonus = modifiers.value(ModifierKind::StartingCash).max(0.0) as u32;
        let dissipation = modifiers.value(ModifierKind::HeatDissipation).max(1.0);
        let cooling = (descriptor.thermals.cooling_factor / dissipation).clamp(0.0, 1.0);

        StageConfig {
            starting_cash: descriptor.starting_cash.saturating_add(cash_bonus),
            starting_lives: descriptor.starting_lives,
            global_speed_factor: DEFAULT_SPEED_FACTOR,
            cooldown_modifier: modifiers.value(ModifierKind::ChipCooldown).max(1.0),
            cooling_factor: cooling,
            heat_rng_seed: seed,
        }
    }

    /// Validates the descriptor and constructs the authoritative stage.
    pub fn build_stage(
        &self,
        descriptor: &LevelDescriptor,
        modifiers: &dyn ModifierProvider,
        seed: u64,
    ) -> Result<Stage, TopologyError> {
        let config = self.resolve_config(descriptor, modifiers, seed);
        Stage::new(descriptor, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_defence_core::{
        BendStyle, BitWidth, ChipKind, GridPoint, LinkId, LinkSpec, NeutralModifiers, NodeId,
        NodeKind, NodeSpec, ThermalSpec, TrackId, TrackSpec, WaveDescriptor,
    };

    struct UpgradedModifiers;

    impl ModifierProvider for UpgradedModifiers {
        fn value(&self, kind: ModifierKind) -> f32 {
            match kind {
                ModifierKind::StartingCash => 25.0,
                ModifierKind::ChipCooldown => 2.0,
                ModifierKind::HeatDissipation => 2.0,
                ModifierKind::SpawnFrequency => 1.0,
            }
        }
    }

    fn descriptor() -> LevelDescriptor {
        LevelDescriptor {
            nodes: vec![
                NodeSpec {
                    id: NodeId::new(0),
                    position: GridPoint::new(0.0, 0.0),
                    notify_range: 3.0,
                    kind: NodeKind::Entry,
                },
                NodeSpec {
                    id: NodeId::new(1),
                    position: GridPoint::new(8.0, 0.0),
                    notify_range: 3.0,
                    kind: NodeKind::Sink,
                },
            ],
            links: vec![LinkSpec {
                id: LinkId::new(0),
                a: NodeId::new(0),
                b: NodeId::new(1),
                style: BendStyle::Convex,
            }],
            tracks: vec![TrackSpec {
                id: TrackId::new(0),
                entry: NodeId::new(0),
                links: vec![LinkId::new(0)],
                circular: false,
            }],
            waves: vec![WaveDescriptor {
                count: 1,
                strength: 3,
                frequency: 1.0,
                speed: 2.0,
                coins: 0,
                width: BitWidth::Four,
            }],
            allowed_chips: vec![ChipKind::Subtract],
            thermals: ThermalSpec {
                base_temperature: 20.0,
                temperature_limit: 80.0,
                heat_per_degree: 1.5,
                cooling_factor: 0.9,
            },
            starting_lives: 3,
            starting_cash: 40,
        }
    }

    #[test]
    fn neutral_modifiers_reproduce_the_descriptor() {
        let bootstrap = Bootstrap;
        let config = bootstrap.resolve_config(&descriptor(), &NeutralModifiers, 7);

        assert_eq!(config.starting_cash, 40);
        assert_eq!(config.starting_lives, 3);
        assert_eq!(config.cooldown_modifier, 1.0);
        assert!((config.cooling_factor - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.heat_rng_seed, 7);
    }

    #[test]
    fn upgrades_feed_cash_cooldown_and_cooling() {
        let bootstrap = Bootstrap;
        let config = bootstrap.resolve_config(&descriptor(), &UpgradedModifiers, 7);

        assert_eq!(config.starting_cash, 65);
        assert_eq!(config.cooldown_modifier, 2.0);
        assert!((config.cooling_factor - 0.45).abs() < f32::EPSILON);
    }

    #[test]
    fn build_stage_propagates_topology_failures() {
        let bootstrap = Bootstrap;
        let mut broken = descriptor();
        broken.links[0].b = NodeId::new(42);

        let error = bootstrap
            .build_stage(&broken, &NeutralModifiers, 7)
            .expect_err("dangling node must fail");
        assert!(matches!(error, TopologyError::UnknownNode { .. }));
    }

    #[test]
    fn build_stage_accepts_a_valid_descriptor() {
        let bootstrap = Bootstrap;
        let stage = bootstrap
            .build_stage(&descriptor(), &NeutralModifiers, 7)
            .expect("valid level");
        assert_eq!(circuit_defence_stage::query::lives(&stage), 3);
    }
}
