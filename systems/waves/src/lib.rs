#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler responsible for emitting spawn commands.
//!
//! The scheduler owns the ordered wave queue and a seedable random source.
//! Every wave draws from its own stream derived from the global seed, so
//! wave N spawns identically no matter how many draws earlier waves consumed.

use circuit_defence_core::{
    Command, Event, ModifierKind, ModifierProvider, Payload, TrackId, VehicleVariant,
    WaveDescriptor, WaveProgress, DEFAULT_SPEED_FACTOR,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Probability that a spawn becomes a coin variant while coins remain.
const COIN_SPAWN_CHANCE: f32 = 0.2;

/// Numerator of the spawn-timer formula `6.0 / (frequency * modifier)`.
const SPAWN_WAIT_NUMERATOR: f32 = 6.0;

/// Configuration parameters required to construct the wave scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    waves: Vec<WaveDescriptor>,
    global_seed: u64,
}

impl Config {
    /// Creates a new configuration from the stage's wave queue and seed.
    #[must_use]
    pub fn new(waves: Vec<WaveDescriptor>, global_seed: u64) -> Self {
        Self { waves, global_seed }
    }
}

/// Pure system that deterministically emits spawn commands while running.
#[derive(Debug)]
pub struct WaveScheduler {
    waves: Vec<WaveDescriptor>,
    global_seed: u64,
    active: usize,
    remaining: u32,
    coins_remaining: u32,
    wait: f32,
    rng: ChaCha8Rng,
    exhaustion_declared: bool,
}

impl WaveScheduler {
    /// Creates a new scheduler positioned at the first wave.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(config.global_seed, 0));
        let (remaining, coins_remaining) = match config.waves.first() {
            Some(wave) => (wave.count, wave.coins),
            None => (0, 0),
        };
        Self {
            waves: config.waves,
            global_seed: config.global_seed,
            active: 0,
            remaining,
            coins_remaining,
            wait: 0.0,
            rng,
            exhaustion_declared: false,
        }
    }

    /// Rebuilds a scheduler from persisted progress.
    ///
    /// Counts are clamped defensively: a corrupted snapshot yields an
    /// exhausted wave rather than a panic or an endless one.
    #[must_use]
    pub fn restore(config: Config, progress: &WaveProgress) -> Self {
        let mut scheduler = Self::new(config);
        scheduler.active = (progress.active_wave as usize).min(scheduler.waves.len());
        if let Some(wave) = scheduler.waves.get(scheduler.active) {
            scheduler.remaining = clamp_count(progress.remaining, wave.count);
            scheduler.coins_remaining = clamp_count(progress.coins_remaining, wave.coins);
        } else {
            scheduler.remaining = 0;
            scheduler.coins_remaining = 0;
        }
        scheduler.wait = progress.wait.max(0.0);
        scheduler.rng =
            ChaCha8Rng::seed_from_u64(derive_wave_seed(scheduler.global_seed, scheduler.active));
        scheduler.rng.set_word_pos(progress.rng_word_pos);
        scheduler
    }

    /// Captures the serializable progress of the scheduler.
    #[must_use]
    pub fn progress(&self) -> WaveProgress {
        WaveProgress {
            active_wave: self.active as u32,
            remaining: i64::from(self.remaining),
            coins_remaining: i64::from(self.coins_remaining),
            wait: self.wait,
            rng_word_pos: self.rng.get_word_pos(),
        }
    }

    /// Zero-based index of the active wave, or `None` once the queue ended.
    #[must_use]
    pub fn active_wave(&self) -> Option<usize> {
        if self.active < self.waves.len() {
            Some(self.active)
        } else {
            None
        }
    }

    /// Vehicles left to spawn in the active wave.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consumes stage events and emits spawn commands for elapsed ticks.
    ///
    /// `tracks` lists the stage's declared tracks; a spawned vehicle picks
    /// one uniformly at random. `speed_factor` is the stage's global speed
    /// factor, which stretches or compresses the spawn timer the same way it
    /// stretches vehicle motion.
    pub fn handle(
        &mut self,
        events: &[Event],
        tracks: &[TrackId],
        speed_factor: f32,
        modifiers: &dyn ModifierProvider,
        out: &mut Vec<Command>,
    ) {
        let ticks = events
            .iter()
            .filter(|event| matches!(event, Event::TickAdvanced))
            .count();

        for _ in 0..ticks {
            self.step(tracks, speed_factor, modifiers, out);
        }
    }

    fn step(
        &mut self,
        tracks: &[TrackId],
        speed_factor: f32,
        modifiers: &dyn ModifierProvider,
        out: &mut Vec<Command>,
    ) {
        if self.exhaustion_declared || tracks.is_empty() {
            return;
        }

        // A drained wave hands over to the next one; a drained queue is
        // announced exactly once.
        while self.remaining == 0 {
            if self.active >= self.waves.len() {
                self.exhaustion_declared = true;
                out.push(Command::DeclareWavesExhausted);
                return;
            }
            self.advance_wave();
        }

        if self.wait > 0.0 {
            self.wait -= speed_factor / DEFAULT_SPEED_FACTOR;
            return;
        }

        let wave = self.waves[self.active];
        let frequency = wave.frequency * modifiers.value(ModifierKind::SpawnFrequency);
        self.wait = if frequency > 0.0 {
            SPAWN_WAIT_NUMERATOR / frequency
        } else {
            SPAWN_WAIT_NUMERATOR
        };

        let variant = if self.coins_remaining > 0 && self.rng.gen::<f32>() < COIN_SPAWN_CHANCE {
            self.coins_remaining -= 1;
            VehicleVariant::Coin
        } else {
            VehicleVariant::Normal
        };

        let ceiling = wave.strength.max(0);
        let value = self.rng.gen_range(0..=ceiling);
        let track = tracks[self.rng.gen_range(0..tracks.len())];

        out.push(Command::SpawnVehicle {
            track,
            payload: Payload::new(value, wave.width),
            speed: wave.speed,
            variant,
        });
        self.remaining -= 1;
    }

    fn advance_wave(&mut self) {
        self.active += 1;
        if let Some(wave) = self.waves.get(self.active) {
            self.remaining = wave.count;
            self.coins_remaining = wave.coins;
            self.wait = 0.0;
            self.rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(self.global_seed, self.active));
        }
    }
}

fn clamp_count(value: i64, ceiling: u32) -> u32 {
    value.clamp(0, i64::from(ceiling)) as u32
}

/// Derives the independent random stream seed for one wave.
fn derive_wave_seed(global_seed: u64, wave_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update((wave_index as u64).to_le_bytes());
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}
