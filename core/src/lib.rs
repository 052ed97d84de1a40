#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Circuit Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative stage, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the stage executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speed factor treated as "normal speed" by spawn-timer arithmetic.
pub const DEFAULT_SPEED_FACTOR: f32 = 1.0;

/// Unique identifier assigned to a node in the stage graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a link between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(u32);

impl LinkId {
    /// Creates a new link identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a track through the stage graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(u32);

impl TrackId {
    /// Creates a new track identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a chip socketed at a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChipId(u32);

impl ChipId {
    /// Creates a new chip identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a vehicle travelling the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(u32);

impl VehicleId {
    /// Creates a new vehicle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Position on the stage grid expressed in grid units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    x: f32,
    y: f32,
}

impl GridPoint {
    /// Creates a new grid point at the provided coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate in grid units.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate in grid units.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance to another grid point.
    #[must_use]
    pub fn distance_to(self, other: GridPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Exact linear interpolation toward `other` by the provided ratio.
    ///
    /// A ratio of `0.0` yields `self`, a ratio of `1.0` yields `other`. The
    /// ratio is not clamped; callers own the clamping policy.
    #[must_use]
    pub fn lerp(self, other: GridPoint, ratio: f32) -> GridPoint {
        GridPoint {
            x: self.x + (other.x - self.x) * ratio,
            y: self.y + (other.y - self.y) * ratio,
        }
    }
}

/// Supported payload widths, measured in binary digits.
///
/// A vehicle's payload is always masked to its declared width after any
/// mutation; the cash awarded for destroying a vehicle equals the width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    /// Four binary digits (one hexadecimal digit).
    Four,
    /// Eight binary digits (two hexadecimal digits).
    Eight,
    /// Twelve binary digits (three hexadecimal digits).
    Twelve,
    /// Sixteen binary digits (four hexadecimal digits).
    Sixteen,
}

impl BitWidth {
    /// Number of binary digits covered by the width.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
            Self::Twelve => 12,
            Self::Sixteen => 16,
        }
    }

    /// Mask that clamps a payload value to the width.
    #[must_use]
    pub const fn mask(self) -> i64 {
        (1_i64 << self.bits()) - 1
    }

    /// Cash awarded when a vehicle of this width is destroyed.
    #[must_use]
    pub const fn cash_award(self) -> u32 {
        self.bits()
    }
}

/// Numeric payload carried by a vehicle, clamped to a declared bit width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload {
    value: i64,
    width: BitWidth,
}

impl Payload {
    /// Creates a payload, masking the value to the declared width.
    #[must_use]
    pub const fn new(value: i64, width: BitWidth) -> Self {
        Self {
            value: value & width.mask(),
            width,
        }
    }

    /// Current payload value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Declared width of the payload.
    #[must_use]
    pub const fn width(&self) -> BitWidth {
        self.width
    }

    /// Subtracts `power` from the value.
    ///
    /// Returns `true` when the raw result drops below zero, which destroys
    /// the vehicle; the stored value is left untouched in that case. A
    /// non-negative result is masked back to the declared width.
    #[must_use]
    pub fn subtract(&mut self, power: u32) -> bool {
        let raw = self.value - i64::from(power);
        if raw < 0 {
            return true;
        }
        self.value = raw & self.width.mask();
        false
    }

    /// Shifts the value right by `power` single-bit steps.
    ///
    /// Shifting never destroys a vehicle; the value is masked after every
    /// step so the result always fits the declared width.
    pub fn shift_right(&mut self, power: u32) {
        for _ in 0..power {
            self.value = (self.value >> 1) & self.width.mask();
        }
    }
}

/// Direction flag attached to a proximity notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Passage {
    /// The vehicle is moving toward the node.
    Approaching,
    /// The vehicle is moving away from the node.
    Leaving,
    /// The vehicle left the node's links entirely and may be forgotten.
    Gone,
}

/// Behavioural variant of a spawned vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleVariant {
    /// Ordinary attacker.
    Normal,
    /// Bonus attacker that yields a coin when destroyed.
    Coin,
}

/// Kinds of chips that can be socketed at a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipKind {
    /// Unconfigured socket; never fires.
    Empty,
    /// Subtracts its power from the target payload, destroying on underflow.
    Subtract,
    /// Shifts the target payload right by its power, one bit at a time.
    ShiftRight,
    /// Destroys the target outright regardless of payload value.
    Mem,
}

impl ChipKind {
    /// Base cooldown period in ticks before modifiers are applied.
    #[must_use]
    pub const fn base_cooldown(self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Subtract => 12,
            Self::ShiftRight => 24,
            Self::Mem => 40,
        }
    }

    /// Attack range measured in grid units.
    ///
    /// Stage topology guarantees every socket node's notify range covers the
    /// largest value returned here; the guarantee is enforced when a level
    /// descriptor is validated, not on the combat path.
    #[must_use]
    pub const fn attack_range(self) -> f32 {
        match self {
            Self::Empty => 0.0,
            Self::Subtract => 2.5,
            Self::ShiftRight => 2.5,
            Self::Mem => 1.5,
        }
    }

    /// Cash cost per power level when configuring a chip of this kind.
    #[must_use]
    pub const fn base_cost(self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Subtract => 10,
            Self::ShiftRight => 25,
            Self::Mem => 50,
        }
    }

    /// Reports whether a chip of this kind participates in combat.
    #[must_use]
    pub const fn is_armed(self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Largest attack range among the provided kinds.
    #[must_use]
    pub fn max_attack_range(kinds: &[ChipKind]) -> f32 {
        let mut best = 0.0_f32;
        for kind in kinds {
            let range = kind.attack_range();
            if range > best {
                best = range;
            }
        }
        best
    }
}

/// Role a node plays within the stage graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Spawn point where tracks begin.
    Entry,
    /// Buildable slot that hosts a chip.
    Socket,
    /// Destination node; reaching it breaches the stage.
    Sink,
}

/// Phase of the stage-level state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Stage constructed, simulation not yet started.
    Start,
    /// Simulation ticks advance state.
    Running,
    /// Externally suspended; ticks are ignored without mutating state.
    Paused,
    /// Stage cleared; awaiting the external advance-to-next-stage action.
    Intermezzo,
    /// All lives exhausted; terminal for the stage.
    Lost,
}

/// Reason a life was removed from the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeLossCause {
    /// A vehicle reached the terminal node of its track.
    Breach,
    /// Accumulated heat triggered an overheat-damage event.
    Overheat,
}

/// Bend variant chosen for a link whose endpoints are diagonal to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BendStyle {
    /// Diagonal segment first, axis-aligned remainder second.
    Convex,
    /// Axis-aligned segment first, diagonal remainder second.
    Concave,
}

/// Commands that express all permissible stage mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Transitions the stage from `Start` to `Running`.
    Begin,
    /// Advances motion, proximity bookkeeping, and chip cooldowns one step.
    Tick,
    /// Settles the tick: heat decay, overheat draw, and phase evaluation.
    CloseTick,
    /// Places a new vehicle at the entry of the provided track.
    SpawnVehicle {
        /// Track the vehicle will follow.
        track: TrackId,
        /// Initial payload carried by the vehicle.
        payload: Payload,
        /// Nominal speed declared by the spawning wave.
        speed: f32,
        /// Behavioural variant of the vehicle.
        variant: VehicleVariant,
    },
    /// Requests that a ready chip fire at the provided vehicle.
    FireChip {
        /// Chip attempting the shot.
        chip: ChipId,
        /// Vehicle selected by the combat system.
        target: VehicleId,
    },
    /// Configures the kind and power of an existing chip.
    ConfigureChip {
        /// Chip targeted by the configuration request.
        chip: ChipId,
        /// Kind to assign to the chip.
        kind: ChipKind,
        /// Power level to assign to the chip.
        power: u32,
    },
    /// Suspends or resumes a running stage without advancing state.
    SetPaused {
        /// `true` to suspend, `false` to resume.
        paused: bool,
    },
    /// Feeds external heat into the stage accumulator.
    AddHeat {
        /// Amount of heat to add.
        amount: f32,
    },
    /// Announces that the wave queue has no further vehicles to spawn.
    DeclareWavesExhausted,
}

/// Events broadcast by the stage after processing commands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// A simulation step completed its motion phase.
    TickAdvanced,
    /// The stage entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// A vehicle was placed at a track entry.
    VehicleSpawned {
        /// Identifier allocated to the vehicle.
        vehicle: VehicleId,
        /// Track the vehicle follows.
        track: TrackId,
        /// Payload the vehicle carries.
        payload: Payload,
        /// Behavioural variant of the vehicle.
        variant: VehicleVariant,
    },
    /// A vehicle crossed onto the next link of its track.
    VehicleEnteredLink {
        /// Vehicle that advanced.
        vehicle: VehicleId,
        /// Link the vehicle now travels.
        link: LinkId,
    },
    /// A vehicle reached the terminal node of its track.
    VehicleBreached {
        /// Vehicle that breached.
        vehicle: VehicleId,
    },
    /// A vehicle was destroyed by chip fire.
    VehicleDestroyed {
        /// Vehicle that was destroyed.
        vehicle: VehicleId,
        /// Cash awarded for the kill.
        cash_award: u32,
        /// Whether a coin was collected in addition to cash.
        coin: bool,
    },
    /// A chip fired at a vehicle.
    ChipFired {
        /// Chip that fired.
        chip: ChipId,
        /// Vehicle that was hit.
        target: VehicleId,
        /// Kind of the firing chip.
        kind: ChipKind,
    },
    /// A chip accepted a configuration request.
    ChipConfigured {
        /// Chip that was configured.
        chip: ChipId,
        /// Kind assigned to the chip.
        kind: ChipKind,
        /// Power level assigned to the chip.
        power: u32,
    },
    /// A chip configuration request was rejected.
    ChipConfigurationRejected {
        /// Chip targeted by the request.
        chip: ChipId,
        /// Kind that was requested.
        kind: ChipKind,
        /// Specific reason the request failed.
        reason: ChipConfigError,
    },
    /// A life was removed from the stage.
    LifeLost {
        /// Why the life was removed.
        cause: LifeLossCause,
        /// Lives remaining after the removal.
        remaining: u32,
    },
    /// The wave queue finished spawning every declared vehicle.
    WaveSpawningExhausted,
}

/// Reasons a chip configuration request may be rejected by the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipConfigError {
    /// The stage phase does not permit configuration.
    InvalidPhase,
    /// No chip with the provided identifier exists.
    UnknownChip,
    /// The requested kind is not allowed by the level descriptor.
    KindNotAllowed,
    /// The requested power level is zero.
    ZeroPower,
    /// The stage does not hold enough cash for the configuration.
    InsufficientCash,
}

/// Named multiplicative or additive effects supplied by external upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    /// Multiplier applied to wave spawn frequency.
    SpawnFrequency,
    /// Divisor applied to chip cooldown periods.
    ChipCooldown,
    /// Divisor applied to the stage cooling factor.
    HeatDissipation,
    /// Additive bonus applied to starting cash.
    StartingCash,
}

impl ModifierKind {
    /// Neutral value returned when no modifier is active for the effect.
    #[must_use]
    pub const fn neutral(self) -> f32 {
        match self {
            Self::SpawnFrequency | Self::ChipCooldown | Self::HeatDissipation => 1.0,
            Self::StartingCash => 0.0,
        }
    }
}

/// External collaborator queried by named effect.
///
/// Implementations must return the effect's neutral value when the modifier
/// is absent so the engine never special-cases missing upgrades.
pub trait ModifierProvider {
    /// Current value of the provided effect.
    fn value(&self, kind: ModifierKind) -> f32;
}

/// Provider that answers every query with the effect's neutral value.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeutralModifiers;

impl ModifierProvider for NeutralModifiers {
    fn value(&self, kind: ModifierKind) -> f32 {
        kind.neutral()
    }
}

/// Static description of a node supplied by the level catalog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Identifier unique within the stage.
    pub id: NodeId,
    /// Grid position of the node.
    pub position: GridPoint,
    /// Radius within which the node tracks vehicles.
    pub notify_range: f32,
    /// Role the node plays in the graph.
    pub kind: NodeKind,
}

/// Static description of a link supplied by the level catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Identifier unique within the stage.
    pub id: LinkId,
    /// First endpoint node.
    pub a: NodeId,
    /// Second endpoint node.
    pub b: NodeId,
    /// Bend variant used when the endpoints are diagonal to each other.
    pub style: BendStyle,
}

/// Static description of a track supplied by the level catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSpec {
    /// Identifier unique within the stage.
    pub id: TrackId,
    /// Entry node where vehicles are placed.
    pub entry: NodeId,
    /// Ordered links forming the path.
    pub links: Vec<LinkId>,
    /// Whether the track wraps back to its first link.
    pub circular: bool,
}

/// Thermal constants governing the heat accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermalSpec {
    /// Ambient temperature of the stage.
    pub base_temperature: f32,
    /// Temperature above which overheat damage becomes possible.
    pub temperature_limit: f32,
    /// Heat units per degree of headroom.
    pub heat_per_degree: f32,
    /// Multiplicative decay applied to heat every tick.
    pub cooling_factor: f32,
}

/// Batch of attacker spawns consumed by the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDescriptor {
    /// Number of vehicles the wave spawns.
    pub count: u32,
    /// Ceiling for randomized payload values.
    pub strength: i64,
    /// Spawn frequency; higher values spawn vehicles sooner.
    pub frequency: f32,
    /// Nominal speed assigned to spawned vehicles.
    pub speed: f32,
    /// Number of coin-variant vehicles mixed into the wave.
    pub coins: u32,
    /// Payload width assigned to spawned vehicles.
    pub width: BitWidth,
}

/// Opaque stage layout produced by the external level catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Nodes of the stage graph.
    pub nodes: Vec<NodeSpec>,
    /// Links of the stage graph.
    pub links: Vec<LinkSpec>,
    /// Tracks vehicles may follow.
    pub tracks: Vec<TrackSpec>,
    /// Ordered wave queue.
    pub waves: Vec<WaveDescriptor>,
    /// Chip kinds the player may configure on this stage.
    pub allowed_chips: Vec<ChipKind>,
    /// Thermal constants for the heat accumulator.
    pub thermals: ThermalSpec,
    /// Lives granted at stage start.
    pub starting_lives: u32,
    /// Cash granted at stage start before modifiers.
    pub starting_cash: u32,
}

/// Resolved per-stage configuration derived from modifiers at bootstrap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageConfig {
    /// Cash available at stage start, modifiers included.
    pub starting_cash: u32,
    /// Lives available at stage start.
    pub starting_lives: u32,
    /// Scalar applied to every vehicle's per-tick travel distance.
    pub global_speed_factor: f32,
    /// Divisor applied to chip base cooldowns.
    pub cooldown_modifier: f32,
    /// Effective multiplicative heat decay per tick.
    pub cooling_factor: f32,
    /// Seed for the stage's overheat draw sequence.
    pub heat_rng_seed: u64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            starting_cash: 40,
            starting_lives: 3,
            global_speed_factor: DEFAULT_SPEED_FACTOR,
            cooldown_modifier: 1.0,
            cooling_factor: 0.95,
            heat_rng_seed: 0x51a9_e0f3_77c4_12bd,
        }
    }
}

/// Fatal topology failures detected while constructing a stage.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TopologyError {
    /// A link references a node absent from the descriptor.
    #[error("link {link:?} references unknown node {node:?}")]
    UnknownNode {
        /// Link carrying the dangling reference.
        link: LinkId,
        /// Node identifier that could not be resolved.
        node: NodeId,
    },
    /// A track references a link absent from the descriptor.
    #[error("track {track:?} references unknown link {link:?}")]
    UnknownLink {
        /// Track carrying the dangling reference.
        track: TrackId,
        /// Link identifier that could not be resolved.
        link: LinkId,
    },
    /// A track declares no links.
    #[error("track {track:?} contains no links")]
    EmptyTrack {
        /// Offending track.
        track: TrackId,
    },
    /// Two consecutive track links share no endpoint node.
    #[error("track {track:?} breaks between links {previous:?} and {next:?}")]
    DisconnectedTrack {
        /// Offending track.
        track: TrackId,
        /// Link before the break.
        previous: LinkId,
        /// Link after the break.
        next: LinkId,
    },
    /// A track's first link does not touch its declared entry node.
    #[error("track {track:?} does not start at its entry node {entry:?}")]
    EntryMismatch {
        /// Offending track.
        track: TrackId,
        /// Entry node declared by the track.
        entry: NodeId,
    },
    /// A duplicate node identifier appears in the descriptor.
    #[error("duplicate node identifier {node:?}")]
    DuplicateNode {
        /// Repeated identifier.
        node: NodeId,
    },
    /// A duplicate link identifier appears in the descriptor.
    #[error("duplicate link identifier {link:?}")]
    DuplicateLink {
        /// Repeated identifier.
        link: LinkId,
    },
    /// A socket node's notify range cannot cover the allowed chip kinds.
    #[error("node {node:?} notify range {notify_range} is below chip range {chip_range}")]
    NotifyRangeTooSmall {
        /// Offending node.
        node: NodeId,
        /// Notify range declared by the node.
        notify_range: f32,
        /// Largest attack range among the allowed chip kinds.
        chip_range: f32,
    },
    /// The descriptor declares no tracks.
    #[error("stage declares no tracks")]
    NoTracks,
    /// The descriptor declares no waves.
    #[error("stage declares no waves")]
    NoWaves,
}

/// Immutable representation of a single vehicle's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleSnapshot {
    /// Unique identifier assigned to the vehicle.
    pub id: VehicleId,
    /// Track the vehicle follows.
    pub track: TrackId,
    /// Link the vehicle currently travels.
    pub link: LinkId,
    /// Interpolated grid position for presentation.
    pub position: GridPoint,
    /// Distance travelled on the current link.
    pub distance_on_link: f32,
    /// Payload the vehicle carries.
    pub payload: Payload,
    /// Behavioural variant of the vehicle.
    pub variant: VehicleVariant,
    /// Nominal speed declared at spawn time.
    pub speed: f32,
}

/// Read-only snapshot describing all vehicles on the stage.
#[derive(Clone, Debug, Default)]
pub struct VehicleView {
    snapshots: Vec<VehicleSnapshot>,
}

impl VehicleView {
    /// Creates a new vehicle view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<VehicleSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured vehicle snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &VehicleSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<VehicleSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single chip's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChipSnapshot {
    /// Unique identifier assigned to the chip.
    pub id: ChipId,
    /// Node the chip is socketed at.
    pub node: NodeId,
    /// Kind assigned to the chip.
    pub kind: ChipKind,
    /// Power level assigned to the chip.
    pub power: u32,
    /// Ticks remaining before the chip may fire again.
    pub cooldown: u32,
    /// Attack range of the chip's kind.
    pub range: f32,
}

/// Read-only snapshot describing all chips socketed on the stage.
#[derive(Clone, Debug, Default)]
pub struct ChipView {
    snapshots: Vec<ChipSnapshot>,
}

impl ChipView {
    /// Creates a new chip view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ChipSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured chip snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ChipSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ChipSnapshot> {
        self.snapshots
    }
}

/// Serializable record of one vehicle inside a stage snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Identifier the vehicle held when the snapshot was taken.
    pub id: VehicleId,
    /// Track the vehicle follows.
    pub track: TrackId,
    /// Zero-based index of the track leg the vehicle travels.
    pub leg: u32,
    /// Distance travelled on the current link.
    pub distance: f32,
    /// Nominal speed declared at spawn time.
    pub speed: f32,
    /// Payload the vehicle carries.
    pub payload: Payload,
    /// Behavioural variant of the vehicle.
    pub variant: VehicleVariant,
}

/// Serializable record of one chip inside a stage snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChipRecord {
    /// Identifier allocated to the chip.
    pub id: ChipId,
    /// Node the chip is socketed at.
    pub node: NodeId,
    /// Kind assigned to the chip.
    pub kind: ChipKind,
    /// Power level assigned to the chip.
    pub power: u32,
    /// Ticks remaining before the chip may fire again.
    pub cooldown: u32,
    /// Cooldown period in effect when the snapshot was taken.
    pub period: u32,
}

/// Serializable snapshot of the authoritative stage state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Phase the stage was in.
    pub phase: Phase,
    /// Heat accumulator value.
    pub heat: f32,
    /// Lives remaining.
    pub lives: u32,
    /// Cash on hand.
    pub cash: u32,
    /// Coins collected this stage.
    pub coins: u32,
    /// State of the overheat draw sequence.
    pub heat_rng_state: u64,
    /// Whether the wave queue already declared exhaustion.
    pub waves_exhausted: bool,
    /// Identifier the next spawned vehicle will receive.
    pub next_vehicle_id: u32,
    /// Vehicles active when the snapshot was taken.
    pub vehicles: Vec<VehicleRecord>,
    /// Chips socketed when the snapshot was taken.
    pub chips: Vec<ChipRecord>,
}

/// Serializable progress of the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveProgress {
    /// Index of the active wave within the descriptor queue.
    pub active_wave: u32,
    /// Vehicles left to spawn in the active wave.
    ///
    /// Stored signed so corrupted snapshots can be clamped on restore
    /// instead of propagating.
    pub remaining: i64,
    /// Coin-variant vehicles left in the active wave.
    pub coins_remaining: i64,
    /// Ticks until the next spawn attempt.
    pub wait: f32,
    /// Stream position of the scheduler's random source.
    pub rng_word_pos: u128,
}

/// Complete persistence-boundary snapshot of a running simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Authoritative stage state.
    pub stage: StageSnapshot,
    /// Wave scheduler progress.
    pub waves: WaveProgress,
}
