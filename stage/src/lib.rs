#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative stage state management for Circuit Defence.
//!
//! The stage owns every mutable simulation value: the graph topology with its
//! proximity tables, the active vehicles, the chip registry, and the scalar
//! stage state (heat, lives, cash, coins, phase). All mutation flows through
//! [`apply`]; everything else is read-only via [`query`].

mod chips;
mod graph;
mod proximity;

use circuit_defence_core::{
    ChipConfigError, ChipId, ChipKind, Command, Event, LevelDescriptor, LifeLossCause, LinkId,
    NodeId, NodeKind, Passage, Payload, Phase, StageConfig, StageSnapshot, ThermalSpec,
    TopologyError, TrackId, VehicleId, VehicleRecord, VehicleVariant,
};

use crate::{
    chips::ChipRegistry,
    graph::{Graph, Leg},
};

/// Grid units travelled per tick per unit of nominal speed.
///
/// Existing level data is balanced against this exact scalar; changing it
/// changes every stage's difficulty.
const SPEED_GRID_SCALE: f32 = 0.16;

/// Probability of overheat damage per unit of overheat.
const OVERHEAT_CHANCE_PER_UNIT: f32 = 0.002;

/// Fraction of heat retained after an overheat-damage event.
const OVERHEAT_DISCHARGE: f32 = 0.5;

/// Heat fed into the accumulator by every accepted chip configuration.
const HEAT_PER_CONFIGURE: f32 = 6.0;

const HEAT_RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const HEAT_RNG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Moving numeric token traversing a track.
#[derive(Clone, Copy, Debug)]
struct Vehicle {
    id: VehicleId,
    track: TrackId,
    leg: usize,
    distance: f32,
    speed: f32,
    payload: Payload,
    variant: VehicleVariant,
}

/// Represents the authoritative Circuit Defence stage state.
#[derive(Debug)]
pub struct Stage {
    graph: Graph,
    config: StageConfig,
    thermals: ThermalSpec,
    allowed_chips: Vec<ChipKind>,
    phase: Phase,
    heat: f32,
    lives: u32,
    cash: u32,
    coins: u32,
    heat_rng: u64,
    waves_exhausted: bool,
    vehicles: Vec<Vehicle>,
    chips: ChipRegistry,
    next_vehicle_id: u32,
}

impl Stage {
    /// Builds a stage from a validated level descriptor.
    ///
    /// Topology failures are fatal: the stage refuses to load rather than
    /// silently skipping dangling references.
    pub fn new(descriptor: &LevelDescriptor, config: StageConfig) -> Result<Self, TopologyError> {
        let graph = Graph::from_descriptor(descriptor)?;
        if descriptor.waves.is_empty() {
            return Err(TopologyError::NoWaves);
        }

        let sockets: Vec<_> = graph
            .nodes()
            .filter(|(_, node)| node.kind() == NodeKind::Socket)
            .map(|(id, _)| id)
            .collect();

        Ok(Self {
            graph,
            thermals: descriptor.thermals,
            allowed_chips: descriptor.allowed_chips.clone(),
            phase: Phase::Start,
            heat: 0.0,
            lives: config.starting_lives,
            cash: config.starting_cash,
            coins: 0,
            heat_rng: config.heat_rng_seed,
            waves_exhausted: false,
            vehicles: Vec::new(),
            chips: ChipRegistry::from_sockets(sockets),
            next_vehicle_id: 0,
            config,
        })
    }

    /// Rebuilds a stage from a descriptor plus a persistence snapshot.
    ///
    /// Scalar fields are restored verbatim; malformed vehicle records are
    /// clamped or dropped defensively because snapshots are recoverable game
    /// state, not programming errors.
    pub fn restore(
        descriptor: &LevelDescriptor,
        config: StageConfig,
        snapshot: &StageSnapshot,
    ) -> Result<Self, TopologyError> {
        let mut stage = Self::new(descriptor, config)?;
        stage.phase = snapshot.phase;
        stage.heat = snapshot.heat.max(0.0);
        stage.lives = snapshot.lives;
        stage.cash = snapshot.cash;
        stage.coins = snapshot.coins;
        stage.heat_rng = snapshot.heat_rng_state;
        stage.waves_exhausted = snapshot.waves_exhausted;
        stage.chips.restore(&snapshot.chips);

        let mut highest_id = snapshot.next_vehicle_id;
        for record in &snapshot.vehicles {
            if stage.restore_vehicle(record) {
                highest_id = highest_id.max(record.id.get().saturating_add(1));
            }
        }
        stage.next_vehicle_id = highest_id;

        Ok(stage)
    }

    fn restore_vehicle(&mut self, record: &VehicleRecord) -> bool {
        let Some((leg_index, leg, length)) = ({
            self.graph.track(record.track).and_then(|track| {
                let last = track.legs().len().checked_sub(1)?;
                let leg_index = (record.leg as usize).min(last);
                let leg = track.leg(leg_index)?;
                let length = self.link_length(leg.link);
                Some((leg_index, leg, length))
            })
        }) else {
            return false;
        };

        let distance = record.distance.clamp(0.0, length);
        self.vehicles.push(Vehicle {
            id: record.id,
            track: record.track,
            leg: leg_index,
            distance,
            speed: record.speed,
            payload: record.payload,
            variant: record.variant,
        });
        self.notify_progress(record.id, leg, distance, length);
        true
    }

    fn set_phase(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        self.phase = phase;
        out_events.push(Event::PhaseChanged { phase });
    }

    /// Single life-removal path shared by breaches and overheat damage.
    fn remove_life(&mut self, cause: LifeLossCause, out_events: &mut Vec<Event>) {
        if self.lives == 0 {
            return;
        }
        self.lives -= 1;
        out_events.push(Event::LifeLost {
            cause,
            remaining: self.lives,
        });
        if self.lives == 0 {
            self.set_phase(Phase::Lost, out_events);
        }
    }

    fn link_length(&self, link: LinkId) -> f32 {
        self.graph
            .link(link)
            .expect("track legs reference validated links")
            .length_on_grid()
    }

    fn notify_progress(&mut self, vehicle: VehicleId, leg: Leg, distance: f32, length: f32) {
        if let Some(node) = self.graph.node_mut(leg.start) {
            node.proximity.notify(vehicle, distance, Passage::Leaving);
        }
        if let Some(node) = self.graph.node_mut(leg.end) {
            node.proximity
                .notify(vehicle, length - distance, Passage::Approaching);
        }
    }

    fn notify_gone(&mut self, node: NodeId, vehicle: VehicleId) {
        if let Some(node) = self.graph.node_mut(node) {
            node.proximity.notify(vehicle, 0.0, Passage::Gone);
        }
    }

    /// Advances every vehicle along its track, carrying overshoot across
    /// link boundaries so total travel time matches total track length.
    fn advance_vehicles(&mut self, out_events: &mut Vec<Event>) {
        let mut breached: Vec<VehicleId> = Vec::new();

        for index in 0..self.vehicles.len() {
            let mut vehicle = self.vehicles[index];
            vehicle.distance += SPEED_GRID_SCALE * vehicle.speed * self.config.global_speed_factor;

            loop {
                let leg = self
                    .graph
                    .track(vehicle.track)
                    .and_then(|track| track.leg(vehicle.leg))
                    .expect("vehicle must sit on a valid track leg");
                let length = self.link_length(leg.link);

                if vehicle.distance < length {
                    self.notify_progress(vehicle.id, leg, vehicle.distance, length);
                    break;
                }

                // The far endpoint is reached: the departed node forgets us.
                self.notify_gone(leg.start, vehicle.id);

                let next = {
                    let track = self
                        .graph
                        .track(vehicle.track)
                        .expect("vehicle track must exist");
                    track
                        .next_leg_index(vehicle.leg)
                        .and_then(|next| track.leg(next).map(|leg| (next, leg)))
                };

                match next {
                    Some((next_index, next_leg)) => {
                        vehicle.distance -= length;
                        vehicle.leg = next_index;
                        out_events.push(Event::VehicleEnteredLink {
                            vehicle: vehicle.id,
                            link: next_leg.link,
                        });
                    }
                    None => {
                        self.notify_gone(leg.end, vehicle.id);
                        out_events.push(Event::VehicleBreached {
                            vehicle: vehicle.id,
                        });
                        breached.push(vehicle.id);
                        break;
                    }
                }
            }

            self.vehicles[index] = vehicle;
        }

        for vehicle in breached {
            self.vehicles.retain(|active| active.id != vehicle);
            self.remove_life(LifeLossCause::Breach, out_events);
        }
    }

    /// Removes a vehicle killed by chip fire and pays out its rewards.
    fn destroy_vehicle(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let vehicle = self.vehicles.remove(index);
        let leg = self
            .graph
            .track(vehicle.track)
            .and_then(|track| track.leg(vehicle.leg))
            .expect("vehicle must sit on a valid track leg");

        for node in [leg.start, leg.end] {
            if let Some(node) = self.graph.node_mut(node) {
                node.proximity.forget(vehicle.id);
            }
        }

        let cash_award = vehicle.payload.width().cash_award();
        self.cash = self.cash.saturating_add(cash_award);
        let coin = vehicle.variant == VehicleVariant::Coin;
        if coin {
            self.coins = self.coins.saturating_add(1);
        }

        out_events.push(Event::VehicleDestroyed {
            vehicle: vehicle.id,
            cash_award,
            coin,
        });
    }

    fn fire_chip(&mut self, chip_id: ChipId, target: VehicleId, out_events: &mut Vec<Event>) {
        let Some(chip) = self.chips.chip(chip_id).copied() else {
            return;
        };
        if !chip.ready() {
            return;
        }

        // Re-check the maintained distance: the chip's own range may be
        // tighter than the node's notify range.
        let in_range = self
            .graph
            .node(chip.node)
            .and_then(|node| node.proximity.distance_to(target))
            .is_some_and(|distance| distance <= chip.kind.attack_range());
        if !in_range {
            return;
        }

        let Some(index) = self
            .vehicles
            .iter()
            .position(|vehicle| vehicle.id == target)
        else {
            return;
        };

        if let Some(state) = self.chips.chip_mut(chip_id) {
            state.arm_cooldown();
        }
        out_events.push(Event::ChipFired {
            chip: chip_id,
            target,
            kind: chip.kind,
        });

        match chip.kind {
            ChipKind::Subtract => {
                if self.vehicles[index].payload.subtract(chip.power) {
                    self.destroy_vehicle(index, out_events);
                }
            }
            ChipKind::ShiftRight => {
                self.vehicles[index].payload.shift_right(chip.power);
            }
            ChipKind::Mem => {
                self.destroy_vehicle(index, out_events);
            }
            ChipKind::Empty => {}
        }
    }

    fn configure_chip(
        &mut self,
        chip_id: ChipId,
        kind: ChipKind,
        power: u32,
        out_events: &mut Vec<Event>,
    ) {
        let reject = |reason: ChipConfigError, out_events: &mut Vec<Event>| {
            out_events.push(Event::ChipConfigurationRejected {
                chip: chip_id,
                kind,
                reason,
            });
        };

        if !matches!(self.phase, Phase::Start | Phase::Running | Phase::Paused) {
            reject(ChipConfigError::InvalidPhase, out_events);
            return;
        }
        if self.chips.chip(chip_id).is_none() {
            reject(ChipConfigError::UnknownChip, out_events);
            return;
        }
        if !self.allowed_chips.contains(&kind) {
            reject(ChipConfigError::KindNotAllowed, out_events);
            return;
        }
        if power == 0 {
            reject(ChipConfigError::ZeroPower, out_events);
            return;
        }
        let cost = kind.base_cost().saturating_mul(power);
        if self.cash < cost {
            reject(ChipConfigError::InsufficientCash, out_events);
            return;
        }

        self.cash -= cost;
        let period = if self.config.cooldown_modifier > 0.0 {
            (kind.base_cooldown() as f32 / self.config.cooldown_modifier).ceil() as u32
        } else {
            kind.base_cooldown()
        };
        if let Some(chip) = self.chips.chip_mut(chip_id) {
            chip.configure(kind, power, period);
        }
        self.heat += HEAT_PER_CONFIGURE;
        out_events.push(Event::ChipConfigured {
            chip: chip_id,
            kind,
            power,
        });
    }

    fn heat_draw(&mut self) -> f32 {
        self.heat_rng = self
            .heat_rng
            .wrapping_mul(HEAT_RNG_MULTIPLIER)
            .wrapping_add(HEAT_RNG_INCREMENT);
        ((self.heat_rng >> 40) as f32) / ((1_u64 << 24) as f32)
    }

    /// Heat the stage tolerates before overheat damage becomes possible.
    fn overheat_headroom(&self) -> f32 {
        (self.thermals.temperature_limit - self.thermals.base_temperature)
            * self.thermals.heat_per_degree
    }
}

/// Applies the provided command to the stage, mutating state deterministically.
pub fn apply(stage: &mut Stage, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Begin => {
            if stage.phase == Phase::Start {
                stage.set_phase(Phase::Running, out_events);
            }
        }
        Command::SetPaused { paused } => match (stage.phase, paused) {
            (Phase::Running, true) => stage.set_phase(Phase::Paused, out_events),
            (Phase::Paused, false) => stage.set_phase(Phase::Running, out_events),
            _ => {}
        },
        Command::Tick => {
            if stage.phase != Phase::Running {
                return;
            }
            out_events.push(Event::TickAdvanced);
            stage.advance_vehicles(out_events);
            for table in stage.graph.proximity_tables_mut() {
                table.sweep();
            }
            for chip in stage.chips.iter_mut() {
                chip.cool_down();
            }
        }
        Command::CloseTick => {
            if stage.phase != Phase::Running {
                return;
            }
            stage.heat *= stage.config.cooling_factor;
            let overheat = stage.heat - stage.overheat_headroom();
            if overheat > 0.0 {
                let chance = (overheat * OVERHEAT_CHANCE_PER_UNIT).min(1.0);
                if stage.heat_draw() < chance {
                    stage.heat *= OVERHEAT_DISCHARGE;
                    stage.remove_life(LifeLossCause::Overheat, out_events);
                }
            }
            if stage.phase == Phase::Running
                && stage.waves_exhausted
                && stage.vehicles.is_empty()
            {
                stage.set_phase(Phase::Intermezzo, out_events);
            }
        }
        Command::SpawnVehicle {
            track,
            payload,
            speed,
            variant,
        } => {
            if stage.phase != Phase::Running {
                return;
            }
            let Some(leg) = stage.graph.track(track).and_then(|found| found.leg(0)) else {
                return;
            };
            let id = VehicleId::new(stage.next_vehicle_id);
            stage.next_vehicle_id = stage.next_vehicle_id.saturating_add(1);
            stage.vehicles.push(Vehicle {
                id,
                track,
                leg: 0,
                distance: 0.0,
                speed,
                payload,
                variant,
            });
            let length = stage.link_length(leg.link);
            stage.notify_progress(id, leg, 0.0, length);
            out_events.push(Event::VehicleSpawned {
                vehicle: id,
                track,
                payload,
                variant,
            });
        }
        Command::FireChip { chip, target } => {
            if stage.phase != Phase::Running {
                return;
            }
            stage.fire_chip(chip, target, out_events);
        }
        Command::ConfigureChip { chip, kind, power } => {
            stage.configure_chip(chip, kind, power, out_events);
        }
        Command::AddHeat { amount } => {
            if amount > 0.0 {
                stage.heat += amount;
            }
        }
        Command::DeclareWavesExhausted => {
            if !stage.waves_exhausted {
                stage.waves_exhausted = true;
                out_events.push(Event::WaveSpawningExhausted);
            }
        }
    }
}

/// Query functions that provide read-only access to the stage state.
pub mod query {
    use circuit_defence_core::{
        ChipRecord, ChipSnapshot, ChipView, GridPoint, LinkId, NodeId, NodeKind, Phase,
        StageSnapshot, TrackId, VehicleId, VehicleRecord, VehicleSnapshot, VehicleView,
    };

    use super::Stage;

    /// Current phase of the stage state machine.
    #[must_use]
    pub fn phase(stage: &Stage) -> Phase {
        stage.phase
    }

    /// Current heat accumulator value.
    #[must_use]
    pub fn heat(stage: &Stage) -> f32 {
        stage.heat
    }

    /// Lives remaining.
    #[must_use]
    pub fn lives(stage: &Stage) -> u32 {
        stage.lives
    }

    /// Cash on hand.
    #[must_use]
    pub fn cash(stage: &Stage) -> u32 {
        stage.cash
    }

    /// Coins collected this stage.
    #[must_use]
    pub fn coins(stage: &Stage) -> u32 {
        stage.coins
    }

    /// Whether the wave queue already declared exhaustion.
    #[must_use]
    pub fn waves_exhausted(stage: &Stage) -> bool {
        stage.waves_exhausted
    }

    /// Scalar applied to every vehicle's per-tick travel distance.
    #[must_use]
    pub fn global_speed_factor(stage: &Stage) -> f32 {
        stage.config.global_speed_factor
    }

    /// Identifiers of every declared track, in identifier order.
    #[must_use]
    pub fn track_ids(stage: &Stage) -> Vec<TrackId> {
        stage.graph.tracks().map(|(id, _)| id).collect()
    }

    /// Captures a read-only view of the vehicles on the stage.
    #[must_use]
    pub fn vehicle_view(stage: &Stage) -> VehicleView {
        let snapshots = stage
            .vehicles
            .iter()
            .map(|vehicle| {
                let leg = stage
                    .graph
                    .track(vehicle.track)
                    .and_then(|track| track.leg(vehicle.leg))
                    .expect("vehicle must sit on a valid track leg");
                let link = stage
                    .graph
                    .link(leg.link)
                    .expect("track legs reference validated links");
                VehicleSnapshot {
                    id: vehicle.id,
                    track: vehicle.track,
                    link: leg.link,
                    position: link.position_on_grid(vehicle.distance, leg.start),
                    distance_on_link: vehicle.distance,
                    payload: vehicle.payload,
                    variant: vehicle.variant,
                    speed: vehicle.speed,
                }
            })
            .collect();
        VehicleView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of the chips socketed on the stage.
    #[must_use]
    pub fn chip_view(stage: &Stage) -> ChipView {
        let snapshots = stage
            .chips
            .iter()
            .map(|chip| ChipSnapshot {
                id: chip.id,
                node: chip.node,
                kind: chip.kind,
                power: chip.power,
                cooldown: chip.cooldown,
                range: chip.kind.attack_range(),
            })
            .collect();
        ChipView::from_snapshots(snapshots)
    }

    /// Vehicles the node currently tracks within `range`, in targeting order.
    #[must_use]
    pub fn vehicles_in_range(stage: &Stage, node: NodeId, range: f32) -> Vec<VehicleId> {
        stage
            .graph
            .node(node)
            .map(|node| node.proximity.vehicles_in_range(range).collect())
            .unwrap_or_default()
    }

    /// First vehicle the node tracks within `range`, if any.
    #[must_use]
    pub fn first_vehicle_in_range(stage: &Stage, node: NodeId, range: f32) -> Option<VehicleId> {
        stage
            .graph
            .node(node)
            .and_then(|node| node.proximity.first_in_range(range))
    }

    /// Maintained distance between a node and a vehicle, if tracked.
    #[must_use]
    pub fn distance_to_vehicle(stage: &Stage, node: NodeId, vehicle: VehicleId) -> Option<f32> {
        stage
            .graph
            .node(node)
            .and_then(|node| node.proximity.distance_to(vehicle))
    }

    /// Presentation-level description of one node.
    #[derive(Clone, Debug)]
    pub struct NodeOverview {
        /// Identifier of the node.
        pub id: NodeId,
        /// Grid position of the node.
        pub position: GridPoint,
        /// Role the node plays in the graph.
        pub kind: NodeKind,
        /// Radius within which the node tracks vehicles.
        pub notify_range: f32,
        /// Links incident to the node.
        pub links: Vec<LinkId>,
        /// Vehicles currently tracked, departed entries included.
        pub tracked_vehicles: usize,
    }

    /// Presentation-level description of one link.
    #[derive(Clone, Copy, Debug)]
    pub struct LinkOverview {
        /// Identifier of the link.
        pub id: LinkId,
        /// First endpoint node.
        pub a: NodeId,
        /// Second endpoint node.
        pub b: NodeId,
        /// Intermediate bend point, if any.
        pub bend: Option<GridPoint>,
        /// Total path length on the grid.
        pub length: f32,
        /// Number of track legs traversing the link.
        pub uses: u32,
    }

    /// Describes every node for the presentation layer.
    #[must_use]
    pub fn nodes(stage: &Stage) -> Vec<NodeOverview> {
        stage
            .graph
            .nodes()
            .map(|(id, node)| NodeOverview {
                id,
                position: node.position(),
                kind: node.kind(),
                notify_range: node.notify_range(),
                links: node.links().to_vec(),
                tracked_vehicles: node.proximity.tracked(),
            })
            .collect()
    }

    /// Presentation-level description of one track.
    #[derive(Clone, Debug)]
    pub struct TrackOverview {
        /// Identifier of the track.
        pub id: TrackId,
        /// Entry node where vehicles are placed.
        pub entry: NodeId,
        /// Links travelled, in order.
        pub links: Vec<LinkId>,
        /// Destination node; `None` for circular tracks.
        pub terminal: Option<NodeId>,
    }

    /// Describes every track for the presentation layer.
    #[must_use]
    pub fn tracks(stage: &Stage) -> Vec<TrackOverview> {
        stage
            .graph
            .tracks()
            .map(|(id, track)| TrackOverview {
                id,
                entry: track.entry(),
                links: track.legs().iter().map(|leg| leg.link).collect(),
                terminal: track.terminal_node(),
            })
            .collect()
    }

    /// Describes every link for the presentation layer.
    #[must_use]
    pub fn links(stage: &Stage) -> Vec<LinkOverview> {
        stage
            .graph
            .links()
            .map(|(id, link)| LinkOverview {
                id,
                a: link.a(),
                b: link.b(),
                bend: link.bend(),
                length: link.length_on_grid(),
                uses: link.uses(),
            })
            .collect()
    }

    /// Captures the serializable persistence snapshot of the stage.
    #[must_use]
    pub fn snapshot(stage: &Stage) -> StageSnapshot {
        StageSnapshot {
            phase: stage.phase,
            heat: stage.heat,
            lives: stage.lives,
            cash: stage.cash,
            coins: stage.coins,
            heat_rng_state: stage.heat_rng,
            waves_exhausted: stage.waves_exhausted,
            next_vehicle_id: stage.next_vehicle_id,
            vehicles: stage
                .vehicles
                .iter()
                .map(|vehicle| VehicleRecord {
                    id: vehicle.id,
                    track: vehicle.track,
                    leg: vehicle.leg as u32,
                    distance: vehicle.distance,
                    speed: vehicle.speed,
                    payload: vehicle.payload,
                    variant: vehicle.variant,
                })
                .collect(),
            chips: stage
                .chips
                .iter()
                .map(|chip| ChipRecord {
                    id: chip.id,
                    node: chip.node,
                    kind: chip.kind,
                    power: chip.power,
                    cooldown: chip.cooldown,
                    period: chip.period,
                })
                .collect(),
        }
    }
}
