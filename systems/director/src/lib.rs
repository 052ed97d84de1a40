#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick orchestration of the Circuit Defence simulation.
//!
//! One director tick runs the fixed update order the engine guarantees:
//! motion and proximity first, then combat, then wave spawning, then the
//! settling pass that decays heat and evaluates the stage phase. Ticks are
//! atomic and synchronous; external input is applied between them.

use circuit_defence_core::{
    Command, Event, LevelDescriptor, ModifierProvider, Phase, SimulationSnapshot, TopologyError,
};
use circuit_defence_stage::{self as stage, query, Stage};
use circuit_defence_system_bootstrap::Bootstrap;
use circuit_defence_system_combat::CombatResolver;
use circuit_defence_system_waves::{Config as WaveConfig, WaveScheduler};

/// Owns the stage and the pure systems, and pumps them in order.
#[derive(Debug)]
pub struct Director<M: ModifierProvider> {
    stage: Stage,
    scheduler: WaveScheduler,
    combat: CombatResolver,
    modifiers: M,
}

impl<M: ModifierProvider> Director<M> {
    /// Builds a fresh simulation for the provided level descriptor.
    pub fn new(
        descriptor: &LevelDescriptor,
        modifiers: M,
        seed: u64,
    ) -> Result<Self, TopologyError> {
        let stage = Bootstrap.build_stage(descriptor, &modifiers, seed)?;
        let scheduler = WaveScheduler::new(WaveConfig::new(descriptor.waves.clone(), seed));
        Ok(Self {
            stage,
            scheduler,
            combat: CombatResolver::new(),
            modifiers,
        })
    }

    /// Rebuilds a simulation from a persistence snapshot.
    pub fn restore(
        descriptor: &LevelDescriptor,
        modifiers: M,
        seed: u64,
        snapshot: &SimulationSnapshot,
    ) -> Result<Self, TopologyError> {
        let config = Bootstrap.resolve_config(descriptor, &modifiers, seed);
        let stage = Stage::restore(descriptor, config, &snapshot.stage)?;
        let scheduler = WaveScheduler::restore(
            WaveConfig::new(descriptor.waves.clone(), seed),
            &snapshot.waves,
        );
        Ok(Self {
            stage,
            scheduler,
            combat: CombatResolver::new(),
            modifiers,
        })
    }

    /// Transitions the stage from `Start` to `Running`.
    pub fn begin(&mut self) -> Vec<Event> {
        self.apply(Command::Begin)
    }

    /// Applies one external command between ticks.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        stage::apply(&mut self.stage, command, &mut events);
        events
    }

    /// Runs one authoritative simulation step to completion.
    ///
    /// The returned events describe everything that happened this tick, in
    /// the order it happened.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        stage::apply(&mut self.stage, Command::Tick, &mut events);

        let mut commands = Vec::new();

        let chips = query::chip_view(&self.stage);
        let stage_ref = &self.stage;
        self.combat.handle(
            query::phase(stage_ref),
            &chips,
            |node, range| query::first_vehicle_in_range(stage_ref, node, range),
            &mut commands,
        );
        for command in commands.drain(..) {
            stage::apply(&mut self.stage, command, &mut events);
        }

        let tracks = query::track_ids(&self.stage);
        self.scheduler.handle(
            &events,
            &tracks,
            query::global_speed_factor(&self.stage),
            &self.modifiers,
            &mut commands,
        );
        for command in commands.drain(..) {
            stage::apply(&mut self.stage, command, &mut events);
        }

        stage::apply(&mut self.stage, Command::CloseTick, &mut events);
        events
    }

    /// Whether further ticks can still change the simulation.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(query::phase(&self.stage), Phase::Intermezzo | Phase::Lost)
    }

    /// Read-only access to the authoritative stage for queries.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Wave scheduler progress for presentation purposes.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Captures the persistence-boundary snapshot of the whole simulation.
    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            stage: query::snapshot(&self.stage),
            waves: self.scheduler.progress(),
        }
    }
}
