//! Built-in demo levels standing in for the external level catalog.

use circuit_defence_core::{
    BendStyle, BitWidth, ChipKind, GridPoint, LevelDescriptor, LinkId, LinkSpec, NodeId, NodeKind,
    NodeSpec, ThermalSpec, TrackId, TrackSpec, WaveDescriptor,
};

/// Number of levels shipped with the demo catalog.
pub(crate) const LEVEL_COUNT: u32 = 2;

/// Retrieves a demo level by index.
pub(crate) fn level(index: u32) -> Option<LevelDescriptor> {
    match index {
        0 => Some(training_run()),
        1 => Some(backbone()),
        _ => None,
    }
}

fn node(id: u32, x: f32, y: f32, kind: NodeKind) -> NodeSpec {
    NodeSpec {
        id: NodeId::new(id),
        position: GridPoint::new(x, y),
        notify_range: 3.0,
        kind,
    }
}

fn link(id: u32, a: u32, b: u32, style: BendStyle) -> LinkSpec {
    LinkSpec {
        id: LinkId::new(id),
        a: NodeId::new(a),
        b: NodeId::new(b),
        style,
    }
}

/// A straight three-node run for smoke tests and tutorials.
fn training_run() -> LevelDescriptor {
    LevelDescriptor {
        nodes: vec![
            node(0, 0.0, 0.0, NodeKind::Entry),
            node(1, 10.0, 0.0, NodeKind::Socket),
            node(2, 20.0, 0.0, NodeKind::Sink),
        ],
        links: vec![
            link(0, 0, 1, BendStyle::Convex),
            link(1, 1, 2, BendStyle::Convex),
        ],
        tracks: vec![TrackSpec {
            id: TrackId::new(0),
            entry: NodeId::new(0),
            links: vec![LinkId::new(0), LinkId::new(1)],
            circular: false,
        }],
        waves: vec![
            WaveDescriptor {
                count: 4,
                strength: 7,
                frequency: 1.0,
                speed: 2.0,
                coins: 1,
                width: BitWidth::Four,
            },
            WaveDescriptor {
                count: 6,
                strength: 15,
                frequency: 1.5,
                speed: 3.0,
                coins: 1,
                width: BitWidth::Four,
            },
        ],
        allowed_chips: vec![ChipKind::Subtract, ChipKind::ShiftRight],
        thermals: ThermalSpec {
            base_temperature: 20.0,
            temperature_limit: 80.0,
            heat_per_degree: 1.5,
            cooling_factor: 0.95,
        },
        starting_lives: 3,
        starting_cash: 60,
    }
}

/// A forked backbone with diagonal runs, two tracks and richer waves.
fn backbone() -> LevelDescriptor {
    LevelDescriptor {
        nodes: vec![
            node(0, 0.0, 8.0, NodeKind::Entry),
            node(1, 8.0, 4.0, NodeKind::Socket),
            node(2, 8.0, 12.0, NodeKind::Socket),
            node(3, 16.0, 8.0, NodeKind::Socket),
            node(4, 24.0, 8.0, NodeKind::Sink),
        ],
        links: vec![
            link(0, 0, 1, BendStyle::Convex),
            link(1, 0, 2, BendStyle::Concave),
            link(2, 1, 3, BendStyle::Convex),
            link(3, 2, 3, BendStyle::Concave),
            link(4, 3, 4, BendStyle::Convex),
        ],
        tracks: vec![
            TrackSpec {
                id: TrackId::new(0),
                entry: NodeId::new(0),
                links: vec![LinkId::new(0), LinkId::new(2), LinkId::new(4)],
                circular: false,
            },
            TrackSpec {
                id: TrackId::new(1),
                entry: NodeId::new(0),
                links: vec![LinkId::new(1), LinkId::new(3), LinkId::new(4)],
                circular: false,
            },
        ],
        waves: vec![
            WaveDescriptor {
                count: 6,
                strength: 15,
                frequency: 1.0,
                speed: 2.0,
                coins: 2,
                width: BitWidth::Four,
            },
            WaveDescriptor {
                count: 8,
                strength: 63,
                frequency: 1.5,
                speed: 2.5,
                coins: 2,
                width: BitWidth::Eight,
            },
            WaveDescriptor {
                count: 10,
                strength: 255,
                frequency: 2.0,
                speed: 3.0,
                coins: 3,
                width: BitWidth::Eight,
            },
        ],
        allowed_chips: vec![ChipKind::Subtract, ChipKind::ShiftRight, ChipKind::Mem],
        thermals: ThermalSpec {
            base_temperature: 20.0,
            temperature_limit: 70.0,
            heat_per_degree: 1.2,
            cooling_factor: 0.93,
        },
        starting_lives: 5,
        starting_cash: 80,
    }
}
