#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Circuit Defence simulation.

mod catalog;

use anyhow::{bail, Context, Result};
use circuit_defence_core::{ChipKind, Command, Event, NeutralModifiers, Phase};
use circuit_defence_stage::query;
use circuit_defence_system_director::Director;
use clap::Parser;

/// Headless runner for the Circuit Defence simulation engine.
#[derive(Debug, Parser)]
#[command(name = "circuit-defence")]
struct Args {
    /// Demo level to simulate.
    #[arg(long, default_value_t = 0)]
    level: u32,

    /// Seed for every random draw the simulation makes.
    #[arg(long, default_value_t = 0x5eed_cafe)]
    seed: u64,

    /// Hard tick ceiling in case the stage never settles.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u32,

    /// Power assigned to a Subtract chip on every socket; zero leaves the
    /// sockets empty so every attacker walks through.
    #[arg(long, default_value_t = 2)]
    arm_power: u32,
}

/// Entry point for the Circuit Defence command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();

    let Some(descriptor) = catalog::level(args.level) else {
        bail!(
            "unknown level {} (the demo catalog has {} levels)",
            args.level,
            catalog::LEVEL_COUNT
        );
    };

    let mut director = Director::new(&descriptor, NeutralModifiers, args.seed)
        .context("stage failed to load")?;

    if args.arm_power > 0 {
        let chips = query::chip_view(director.stage());
        for chip in chips.iter() {
            let events = director.apply(Command::ConfigureChip {
                chip: chip.id,
                kind: ChipKind::Subtract,
                power: args.arm_power,
            });
            for event in events {
                if let Event::ChipConfigurationRejected { chip, reason, .. } = event {
                    println!("chip {:>2}: not armed ({reason:?})", chip.get());
                }
            }
        }
    }

    let _ = director.begin();
    println!(
        "level {} | seed {:#x} | lives {} | cash {}",
        args.level,
        args.seed,
        query::lives(director.stage()),
        query::cash(director.stage()),
    );

    let mut ticks = 0_u32;
    let mut kills = 0_u32;
    let mut breaches = 0_u32;

    while ticks < args.max_ticks && !director.is_settled() {
        let events = director.tick();
        ticks += 1;

        for event in events {
            match event {
                Event::VehicleDestroyed { coin, .. } => {
                    kills += 1;
                    if coin {
                        println!("tick {ticks:>5}: coin collected");
                    }
                }
                Event::VehicleBreached { .. } => breaches += 1,
                Event::LifeLost { cause, remaining } => {
                    println!("tick {ticks:>5}: life lost ({cause:?}), {remaining} left");
                }
                Event::WaveSpawningExhausted => {
                    println!("tick {ticks:>5}: all waves spawned");
                }
                _ => {}
            }
        }
    }

    let stage = director.stage();
    let outcome = match query::phase(stage) {
        Phase::Intermezzo => "stage cleared",
        Phase::Lost => "stage lost",
        _ => "tick ceiling reached",
    };

    println!(
        "{outcome} after {ticks} ticks | kills {kills} | breaches {breaches} | \
         lives {} | cash {} | coins {}",
        query::lives(stage),
        query::cash(stage),
        query::coins(stage),
    );

    Ok(())
}
