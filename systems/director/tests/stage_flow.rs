use circuit_defence_core::{
    BendStyle, BitWidth, ChipId, ChipKind, Command, Event, GridPoint, LevelDescriptor,
    LifeLossCause, LinkId, LinkSpec, NeutralModifiers, NodeId, NodeKind, NodeSpec, Phase,
    ThermalSpec, TrackId, TrackSpec, WaveDescriptor,
};
use circuit_defence_stage::query;
use circuit_defence_system_director::Director;

const ATTACKER_SPEED: f32 = 2.0;

/// One straight track of two ten-unit links: entry, socket, sink.
fn two_link_level(lives: u32, waves: Vec<WaveDescriptor>) -> LevelDescriptor {
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
                position: GridPoint::new(10.0, 0.0),
                notify_range: 3.0,
                kind: NodeKind::Socket,
            },
            NodeSpec {
                id: NodeId::new(2),
                position: GridPoint::new(20.0, 0.0),
                notify_range: 3.0,
                kind: NodeKind::Sink,
            },
        ],
        links: vec![
            LinkSpec {
                id: LinkId::new(0),
                a: NodeId::new(0),
                b: NodeId::new(1),
                style: BendStyle::Convex,
            },
            LinkSpec {
                id: LinkId::new(1),
                a: NodeId::new(1),
                b: NodeId::new(2),
                style: BendStyle::Convex,
            },
        ],
        tracks: vec![TrackSpec {
            id: TrackId::new(0),
            entry: NodeId::new(0),
            links: vec![LinkId::new(0), LinkId::new(1)],
            circular: false,
        }],
        waves,
        allowed_chips: vec![ChipKind::Subtract, ChipKind::ShiftRight, ChipKind::Mem],
        thermals: ThermalSpec {
            base_temperature: 20.0,
            temperature_limit: 80.0,
            heat_per_degree: 1.5,
            cooling_factor: 0.95,
        },
        starting_lives: lives,
        starting_cash: 40,
    }
}

fn single_attacker_wave() -> WaveDescriptor {
    WaveDescriptor {
        count: 1,
        strength: 0,
        frequency: 1.0,
        speed: ATTACKER_SPEED,
        coins: 0,
        width: BitWidth::Four,
    }
}

#[test]
fn armed_chip_clears_the_stage_without_losing_a_life() {
    let level = two_link_level(3, vec![single_attacker_wave()]);
    let mut director = Director::new(&level, NeutralModifiers, 0xc0de).expect("valid level");

    let configured = director.apply(Command::ConfigureChip {
        chip: ChipId::new(0),
        kind: ChipKind::Subtract,
        power: 1,
    });
    assert!(configured
        .iter()
        .any(|event| matches!(event, Event::ChipConfigured { .. })));
    let _ = director.begin();

    let step = 0.16_f32 * ATTACKER_SPEED;
    let range = ChipKind::Subtract.attack_range();
    // Spawn happens on tick one; the attacker then needs enough motion ticks
    // to close within the chip's range of the mid-track socket.
    let expected_kill_tick = 1 + ((10.0_f32 - range) / step).ceil() as u32;

    let cash_after_configure = query::cash(director.stage());
    let mut kill_tick = None;
    let mut exhausted_seen = false;

    for tick in 1..=expected_kill_tick + 8 {
        let events = director.tick();
        exhausted_seen |= events
            .iter()
            .any(|event| matches!(event, Event::WaveSpawningExhausted));
        assert!(
            events
                .iter()
                .all(|event| !matches!(event, Event::LifeLost { .. })),
            "no life may be lost in the armed scenario"
        );
        if events.iter().any(|event| {
            matches!(
                event,
                Event::VehicleDestroyed {
                    cash_award: 4,
                    coin: false,
                    ..
                }
            )
        }) {
            kill_tick = Some(tick);
            break;
        }
    }

    assert_eq!(
        kill_tick,
        Some(expected_kill_tick),
        "the attacker dies in the first combat tick it is in range"
    );
    assert!(exhausted_seen, "end-of-wave precedes the kill");
    assert_eq!(query::cash(director.stage()), cash_after_configure + 4);

    // The settling pass of the kill tick (or the next one) clears the stage.
    for _ in 0..2 {
        if query::phase(director.stage()) == Phase::Intermezzo {
            break;
        }
        let _ = director.tick();
    }
    assert_eq!(query::phase(director.stage()), Phase::Intermezzo);
    assert_eq!(query::lives(director.stage()), 3);
    assert!(director.is_settled());
}

#[test]
fn empty_chip_concedes_a_breach_after_the_exact_travel_time() {
    let level = two_link_level(3, vec![single_attacker_wave()]);
    let mut director = Director::new(&level, NeutralModifiers, 0xc0de).expect("valid level");
    let _ = director.begin();

    let step = 0.16_f32 * ATTACKER_SPEED;
    let travel_ticks = (20.0_f32 / step).ceil() as u32;

    let mut spawn_tick = None;
    let mut breach_tick = None;

    for tick in 1..=travel_ticks + 8 {
        let events = director.tick();
        if events
            .iter()
            .any(|event| matches!(event, Event::VehicleSpawned { .. }))
        {
            spawn_tick = Some(tick);
        }
        if events.iter().any(|event| {
            matches!(
                event,
                Event::LifeLost {
                    cause: LifeLossCause::Breach,
                    remaining: 2,
                }
            )
        }) {
            breach_tick = Some(tick);
            break;
        }
    }

    let spawn_tick = spawn_tick.expect("wave must spawn");
    let breach_tick = breach_tick.expect("attacker must breach");
    assert_eq!(
        breach_tick - spawn_tick,
        travel_ticks,
        "breach arrives after exactly ceil(track length / step) ticks"
    );
    assert_eq!(query::cash(director.stage()), 40, "no cash for a breach");
    assert_eq!(query::lives(director.stage()), 2);
}

#[test]
fn losing_the_last_life_settles_the_simulation() {
    let level = two_link_level(1, vec![single_attacker_wave()]);
    let mut director = Director::new(&level, NeutralModifiers, 1).expect("valid level");
    let _ = director.begin();

    for _ in 0..200 {
        let _ = director.tick();
        if director.is_settled() {
            break;
        }
    }

    assert_eq!(query::phase(director.stage()), Phase::Lost);
    assert_eq!(query::lives(director.stage()), 0);

    let events = director.tick();
    assert!(events.is_empty(), "lost stages must not advance further");
}

#[test]
fn pausing_freezes_positions_until_resumed() {
    let level = two_link_level(3, vec![single_attacker_wave()]);
    let mut director = Director::new(&level, NeutralModifiers, 2).expect("valid level");
    let _ = director.begin();

    for _ in 0..5 {
        let _ = director.tick();
    }
    let before = query::vehicle_view(director.stage()).into_vec();
    assert_eq!(before.len(), 1);

    let _ = director.apply(Command::SetPaused { paused: true });
    for _ in 0..10 {
        let events = director.tick();
        assert!(events.is_empty(), "paused ticks must be inert");
    }
    assert_eq!(query::vehicle_view(director.stage()).into_vec(), before);

    let _ = director.apply(Command::SetPaused { paused: false });
    let _ = director.tick();
    assert_ne!(query::vehicle_view(director.stage()).into_vec(), before);
}

#[test]
fn snapshots_resume_into_an_identical_future() {
    let waves = vec![
        WaveDescriptor {
            count: 4,
            strength: 9,
            frequency: 1.0,
            speed: ATTACKER_SPEED,
            coins: 1,
            width: BitWidth::Eight,
        },
        WaveDescriptor {
            count: 2,
            strength: 5,
            frequency: 2.0,
            speed: ATTACKER_SPEED,
            coins: 0,
            width: BitWidth::Four,
        },
    ];
    let level = two_link_level(5, waves);
    let seed = 0x5eed;

    let mut original = Director::new(&level, NeutralModifiers, seed).expect("valid level");
    let _ = original.apply(Command::ConfigureChip {
        chip: ChipId::new(0),
        kind: ChipKind::Subtract,
        power: 3,
    });
    let _ = original.begin();
    for _ in 0..30 {
        let _ = original.tick();
    }

    let snapshot = original.snapshot();
    let mut resumed =
        Director::restore(&level, NeutralModifiers, seed, &snapshot).expect("restore");

    for tick in 0..120 {
        let original_events = original.tick();
        let resumed_events = resumed.tick();
        assert_eq!(
            original_events, resumed_events,
            "tick {tick} diverged after restore"
        );
    }

    assert_eq!(
        query::snapshot(original.stage()),
        query::snapshot(resumed.stage())
    );
}
