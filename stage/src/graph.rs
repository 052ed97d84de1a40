//! Static graph topology: nodes, links, and the tracks vehicles follow.

use std::collections::BTreeMap;

use circuit_defence_core::{
    BendStyle, ChipKind, GridPoint, LevelDescriptor, LinkId, NodeId, NodeKind, TopologyError,
    TrackId,
};

use crate::proximity::ProximityTable;

/// Graph vertex: a buildable socket, an entry point, or the destination.
#[derive(Debug)]
pub(crate) struct Node {
    position: GridPoint,
    notify_range: f32,
    kind: NodeKind,
    links: Vec<LinkId>,
    /// Vehicles currently tracked by the node, fed by motion notifications.
    pub(crate) proximity: ProximityTable,
}

impl Node {
    fn new(position: GridPoint, notify_range: f32, kind: NodeKind) -> Self {
        Self {
            position,
            notify_range,
            kind,
            links: Vec::new(),
            proximity: ProximityTable::default(),
        }
    }

    /// Grid position of the node.
    pub(crate) fn position(&self) -> GridPoint {
        self.position
    }

    /// Radius within which the node tracks vehicles.
    pub(crate) fn notify_range(&self) -> f32 {
        self.notify_range
    }

    /// Role the node plays in the graph.
    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Links incident to the node.
    pub(crate) fn links(&self) -> &[LinkId] {
        &self.links
    }
}

/// Graph edge carrying a derived one- or two-segment geometric path.
#[derive(Debug)]
pub(crate) struct Link {
    a: NodeId,
    b: NodeId,
    a_position: GridPoint,
    b_position: GridPoint,
    bend: Option<GridPoint>,
    length: f32,
    uses: u32,
}

impl Link {
    /// Builds the link geometry between two placed nodes.
    ///
    /// The bend point is computed once from the relative quadrant of the
    /// endpoints; exactly horizontal or vertical pairs produce a single
    /// straight segment.
    pub(crate) fn between(
        a: NodeId,
        a_position: GridPoint,
        b: NodeId,
        b_position: GridPoint,
        style: BendStyle,
    ) -> Self {
        let bend = bend_point(a_position, b_position, style);
        let length = match bend {
            Some(point) => a_position.distance_to(point) + point.distance_to(b_position),
            None => a_position.distance_to(b_position),
        };
        Self {
            a,
            b,
            a_position,
            b_position,
            bend,
            length,
            uses: 0,
        }
    }

    /// First endpoint node.
    pub(crate) fn a(&self) -> NodeId {
        self.a
    }

    /// Second endpoint node.
    pub(crate) fn b(&self) -> NodeId {
        self.b
    }

    /// Intermediate bend point, if the endpoints are diagonal to each other.
    pub(crate) fn bend(&self) -> Option<GridPoint> {
        self.bend
    }

    /// Total path length across the one or two segments.
    pub(crate) fn length_on_grid(&self) -> f32 {
        self.length
    }

    /// Number of track legs that traverse the link.
    pub(crate) fn uses(&self) -> u32 {
        self.uses
    }

    /// Reports whether the provided node is one of the link's endpoints.
    pub(crate) fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }

    /// Endpoint opposite the provided node.
    pub(crate) fn far_node(&self, from: NodeId) -> NodeId {
        if from == self.a {
            self.b
        } else {
            self.a
        }
    }

    /// Grid position reached after travelling `distance` from `from`.
    ///
    /// Interpolation is exact on each segment; distances at or beyond the
    /// link length clamp to the far endpoint. Crossing the bend threshold
    /// re-bases interpolation onto the second segment so the bend point is
    /// reproduced without rounding drift.
    pub(crate) fn position_on_grid(&self, distance: f32, from: NodeId) -> GridPoint {
        let (start, end) = if from == self.a {
            (self.a_position, self.b_position)
        } else {
            (self.b_position, self.a_position)
        };

        if distance <= 0.0 {
            return start;
        }
        if distance >= self.length {
            return end;
        }

        let Some(bend) = self.bend else {
            return start.lerp(end, distance / self.length);
        };

        let first = start.distance_to(bend);
        if distance < first {
            return start.lerp(bend, distance / first);
        }

        let second = bend.distance_to(end);
        if second <= 0.0 {
            return end;
        }
        bend.lerp(end, (distance - first) / second)
    }
}

/// Deterministic bend placement from the endpoint quadrant.
///
/// The bend splits the path into one diagonal and one axis-aligned segment.
/// Convex links run the diagonal first; concave links save it for last.
fn bend_point(a: GridPoint, b: GridPoint, style: BendStyle) -> Option<GridPoint> {
    let dx = b.x() - a.x();
    let dy = b.y() - a.y();
    if dx == 0.0 || dy == 0.0 {
        return None;
    }

    let run = dx.abs().min(dy.abs());
    let (step_x, step_y) = match (dx > 0.0, dy > 0.0) {
        (true, true) => (run, run),
        (true, false) => (run, -run),
        (false, true) => (-run, run),
        (false, false) => (-run, -run),
    };

    Some(match style {
        BendStyle::Convex => GridPoint::new(a.x() + step_x, a.y() + step_y),
        BendStyle::Concave => GridPoint::new(b.x() - step_x, b.y() - step_y),
    })
}

/// One oriented step of a track: a link plus the endpoint roles in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Leg {
    /// Link travelled by the leg.
    pub(crate) link: LinkId,
    /// Node the leg departs from.
    pub(crate) start: NodeId,
    /// Node the leg arrives at.
    pub(crate) end: NodeId,
}

/// Ordered, connected sequence of links from an entry node.
#[derive(Debug)]
pub(crate) struct Track {
    entry: NodeId,
    legs: Vec<Leg>,
    circular: bool,
}

impl Track {
    fn from_spec(
        id: TrackId,
        entry: NodeId,
        link_ids: &[LinkId],
        circular: bool,
        links: &BTreeMap<LinkId, Link>,
    ) -> Result<Self, TopologyError> {
        if link_ids.is_empty() {
            return Err(TopologyError::EmptyTrack { track: id });
        }

        let mut legs = Vec::with_capacity(link_ids.len());
        let mut current = entry;
        let mut previous: Option<LinkId> = None;

        for &link_id in link_ids {
            let link = links
                .get(&link_id)
                .ok_or(TopologyError::UnknownLink { track: id, link: link_id })?;

            if !link.touches(current) {
                return Err(match previous {
                    None => TopologyError::EntryMismatch { track: id, entry },
                    Some(previous) => TopologyError::DisconnectedTrack {
                        track: id,
                        previous,
                        next: link_id,
                    },
                });
            }

            let end = link.far_node(current);
            legs.push(Leg {
                link: link_id,
                start: current,
                end,
            });
            current = end;
            previous = Some(link_id);
        }

        Ok(Self {
            entry,
            legs,
            circular,
        })
    }

    /// Entry node where vehicles are placed.
    pub(crate) fn entry(&self) -> NodeId {
        self.entry
    }

    /// Oriented legs of the track in travel order.
    pub(crate) fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Leg at the provided index, if it exists.
    pub(crate) fn leg(&self, index: usize) -> Option<Leg> {
        self.legs.get(index).copied()
    }

    /// Index of the leg after `current`: wraps when circular, `None` when
    /// the track terminates.
    pub(crate) fn next_leg_index(&self, current: usize) -> Option<usize> {
        if current + 1 < self.legs.len() {
            Some(current + 1)
        } else if self.circular {
            Some(0)
        } else {
            None
        }
    }

    /// Destination node of a terminal track; `None` when circular.
    pub(crate) fn terminal_node(&self) -> Option<NodeId> {
        if self.circular {
            return None;
        }
        self.legs.last().map(|leg| leg.end)
    }
}

/// Validated stage topology shared by motion, combat, and queries.
#[derive(Debug)]
pub(crate) struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    tracks: BTreeMap<TrackId, Track>,
}

impl Graph {
    /// Builds and validates the topology declared by a level descriptor.
    ///
    /// Every failure here is fatal: a stage with dangling references must
    /// not load.
    pub(crate) fn from_descriptor(descriptor: &LevelDescriptor) -> Result<Self, TopologyError> {
        let chip_range = ChipKind::max_attack_range(&descriptor.allowed_chips);

        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        for spec in &descriptor.nodes {
            if nodes.contains_key(&spec.id) {
                return Err(TopologyError::DuplicateNode { node: spec.id });
            }
            if spec.kind == NodeKind::Socket && spec.notify_range < chip_range {
                return Err(TopologyError::NotifyRangeTooSmall {
                    node: spec.id,
                    notify_range: spec.notify_range,
                    chip_range,
                });
            }
            let _ = nodes.insert(spec.id, Node::new(spec.position, spec.notify_range, spec.kind));
        }

        let mut links: BTreeMap<LinkId, Link> = BTreeMap::new();
        for spec in &descriptor.links {
            if links.contains_key(&spec.id) {
                return Err(TopologyError::DuplicateLink { link: spec.id });
            }
            let a_position = nodes
                .get(&spec.a)
                .ok_or(TopologyError::UnknownNode { link: spec.id, node: spec.a })?
                .position();
            let b_position = nodes
                .get(&spec.b)
                .ok_or(TopologyError::UnknownNode { link: spec.id, node: spec.b })?
                .position();

            let _ = links.insert(
                spec.id,
                Link::between(spec.a, a_position, spec.b, b_position, spec.style),
            );
            for node_id in [spec.a, spec.b] {
                if let Some(node) = nodes.get_mut(&node_id) {
                    node.links.push(spec.id);
                }
            }
        }

        if descriptor.tracks.is_empty() {
            return Err(TopologyError::NoTracks);
        }

        let mut tracks: BTreeMap<TrackId, Track> = BTreeMap::new();
        for spec in &descriptor.tracks {
            let track = Track::from_spec(spec.id, spec.entry, &spec.links, spec.circular, &links)?;
            for leg in track.legs() {
                if let Some(link) = links.get_mut(&leg.link) {
                    link.uses = link.uses.saturating_add(1);
                }
            }
            let _ = tracks.insert(spec.id, track);
        }

        Ok(Self {
            nodes,
            links,
            tracks,
        })
    }

    /// Node with the provided identifier.
    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable node access for proximity notifications.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Link with the provided identifier.
    pub(crate) fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Track with the provided identifier.
    pub(crate) fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Iterator over all nodes in identifier order.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Iterator over all links in identifier order.
    pub(crate) fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    /// Iterator over all tracks in identifier order.
    pub(crate) fn tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().map(|(id, track)| (*id, track))
    }

    /// Iterator over every node's proximity table for the per-tick sweep.
    pub(crate) fn proximity_tables_mut(&mut self) -> impl Iterator<Item = &mut ProximityTable> {
        self.nodes.values_mut().map(|node| &mut node.proximity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn straight_link() -> Link {
        Link::between(
            NodeId::new(0),
            GridPoint::new(1.0, 1.0),
            NodeId::new(1),
            GridPoint::new(5.0, 1.0),
            BendStyle::Convex,
        )
    }

    fn bent_link(style: BendStyle) -> Link {
        Link::between(
            NodeId::new(0),
            GridPoint::new(0.0, 0.0),
            NodeId::new(1),
            GridPoint::new(4.0, 2.0),
            style,
        )
    }

    #[test]
    fn aligned_endpoints_produce_no_bend() {
        let link = straight_link();
        assert!(link.bend().is_none());
        assert!((link.length_on_grid() - 4.0).abs() < EPSILON);
    }

    #[test]
    fn straight_link_interpolates_exactly() {
        let link = straight_link();
        let quarter = link.position_on_grid(1.0, NodeId::new(0));
        assert_eq!(quarter, GridPoint::new(2.0, 1.0));

        let reverse = link.position_on_grid(1.0, NodeId::new(1));
        assert_eq!(reverse, GridPoint::new(4.0, 1.0));
    }

    #[test]
    fn straight_link_clamps_to_far_endpoint() {
        let link = straight_link();
        assert_eq!(
            link.position_on_grid(4.0, NodeId::new(0)),
            GridPoint::new(5.0, 1.0)
        );
        assert_eq!(
            link.position_on_grid(100.0, NodeId::new(0)),
            GridPoint::new(5.0, 1.0)
        );
    }

    #[test]
    fn convex_bend_runs_diagonal_first() {
        let link = bent_link(BendStyle::Convex);
        assert_eq!(link.bend(), Some(GridPoint::new(2.0, 2.0)));
    }

    #[test]
    fn concave_bend_runs_diagonal_last() {
        let link = bent_link(BendStyle::Concave);
        assert_eq!(link.bend(), Some(GridPoint::new(2.0, 0.0)));
    }

    #[test]
    fn bend_segments_sum_to_link_length() {
        for style in [BendStyle::Convex, BendStyle::Concave] {
            let link = bent_link(style);
            let bend = link.bend().expect("diagonal endpoints must bend");
            let first = GridPoint::new(0.0, 0.0).distance_to(bend);
            let second = bend.distance_to(GridPoint::new(4.0, 2.0));
            assert!((first + second - link.length_on_grid()).abs() < EPSILON);
        }
    }

    #[test]
    fn position_at_first_segment_length_is_the_bend_point() {
        let link = bent_link(BendStyle::Convex);
        let bend = link.bend().expect("bend");
        let first = GridPoint::new(0.0, 0.0).distance_to(bend);
        assert_eq!(link.position_on_grid(first, NodeId::new(0)), bend);
    }

    #[test]
    fn bend_interpolation_is_exact_on_both_segments() {
        let link = bent_link(BendStyle::Convex);
        let bend = link.bend().expect("bend");
        let first = GridPoint::new(0.0, 0.0).distance_to(bend);

        let halfway_first = link.position_on_grid(first / 2.0, NodeId::new(0));
        assert!((halfway_first.x() - 1.0).abs() < EPSILON);
        assert!((halfway_first.y() - 1.0).abs() < EPSILON);

        let halfway_second = link.position_on_grid(first + 1.0, NodeId::new(0));
        assert!((halfway_second.x() - 3.0).abs() < EPSILON);
        assert!((halfway_second.y() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn quadrant_cases_mirror_bend_placement() {
        let cases = [
            (GridPoint::new(4.0, 2.0), GridPoint::new(2.0, 2.0)),
            (GridPoint::new(4.0, -2.0), GridPoint::new(2.0, -2.0)),
            (GridPoint::new(-4.0, 2.0), GridPoint::new(-2.0, 2.0)),
            (GridPoint::new(-4.0, -2.0), GridPoint::new(-2.0, -2.0)),
        ];
        for (far, expected) in cases {
            let link = Link::between(
                NodeId::new(0),
                GridPoint::new(0.0, 0.0),
                NodeId::new(1),
                far,
                BendStyle::Convex,
            );
            assert_eq!(link.bend(), Some(expected), "endpoint {far:?}");
        }
    }

    fn two_link_descriptor() -> LevelDescriptor {
        use circuit_defence_core::{
            BitWidth, LinkSpec, NodeSpec, ThermalSpec, TrackSpec, WaveDescriptor,
        };

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
            waves: vec![WaveDescriptor {
                count: 1,
                strength: 0,
                frequency: 1.0,
                speed: 5.0,
                coins: 0,
                width: BitWidth::Four,
            }],
            allowed_chips: vec![ChipKind::Subtract],
            thermals: ThermalSpec {
                base_temperature: 20.0,
                temperature_limit: 80.0,
                heat_per_degree: 1.5,
                cooling_factor: 0.95,
            },
            starting_lives: 3,
            starting_cash: 40,
        }
    }

    #[test]
    fn tracks_chain_legs_through_shared_nodes() {
        let graph = Graph::from_descriptor(&two_link_descriptor()).expect("valid topology");
        let track = graph.track(TrackId::new(0)).expect("track");

        assert_eq!(track.entry(), NodeId::new(0));
        assert_eq!(track.terminal_node(), Some(NodeId::new(2)));
        assert_eq!(
            track.legs(),
            &[
                Leg {
                    link: LinkId::new(0),
                    start: NodeId::new(0),
                    end: NodeId::new(1),
                },
                Leg {
                    link: LinkId::new(1),
                    start: NodeId::new(1),
                    end: NodeId::new(2),
                },
            ]
        );
        assert_eq!(track.next_leg_index(0), Some(1));
        assert_eq!(track.next_leg_index(1), None);
    }

    #[test]
    fn circular_tracks_wrap_and_have_no_terminal() {
        let mut descriptor = two_link_descriptor();
        // Close the loop back through the same links.
        descriptor.tracks[0].links = vec![
            LinkId::new(0),
            LinkId::new(1),
            LinkId::new(1),
            LinkId::new(0),
        ];
        descriptor.tracks[0].circular = true;

        let graph = Graph::from_descriptor(&descriptor).expect("valid topology");
        let track = graph.track(TrackId::new(0)).expect("track");
        assert_eq!(track.next_leg_index(3), Some(0));
        assert_eq!(track.terminal_node(), None);
    }

    #[test]
    fn link_usage_counts_track_legs() {
        let graph = Graph::from_descriptor(&two_link_descriptor()).expect("valid topology");
        assert_eq!(graph.link(LinkId::new(0)).expect("link").uses(), 1);
        assert_eq!(graph.link(LinkId::new(1)).expect("link").uses(), 1);
    }

    #[test]
    fn unknown_node_in_link_fails_construction() {
        let mut descriptor = two_link_descriptor();
        descriptor.links[1].b = NodeId::new(99);

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert_eq!(
            error,
            TopologyError::UnknownNode {
                link: LinkId::new(1),
                node: NodeId::new(99),
            }
        );
    }

    #[test]
    fn unknown_link_in_track_fails_construction() {
        let mut descriptor = two_link_descriptor();
        descriptor.tracks[0].links.push(LinkId::new(42));

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert_eq!(
            error,
            TopologyError::UnknownLink {
                track: TrackId::new(0),
                link: LinkId::new(42),
            }
        );
    }

    #[test]
    fn disconnected_consecutive_links_fail_construction() {
        let mut descriptor = two_link_descriptor();
        descriptor.nodes.push(circuit_defence_core::NodeSpec {
            id: NodeId::new(3),
            position: GridPoint::new(30.0, 5.0),
            notify_range: 3.0,
            kind: NodeKind::Socket,
        });
        descriptor.nodes.push(circuit_defence_core::NodeSpec {
            id: NodeId::new(4),
            position: GridPoint::new(40.0, 5.0),
            notify_range: 3.0,
            kind: NodeKind::Socket,
        });
        descriptor.links.push(circuit_defence_core::LinkSpec {
            id: LinkId::new(2),
            a: NodeId::new(3),
            b: NodeId::new(4),
            style: BendStyle::Convex,
        });
        descriptor.tracks[0].links = vec![LinkId::new(0), LinkId::new(2)];

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert_eq!(
            error,
            TopologyError::DisconnectedTrack {
                track: TrackId::new(0),
                previous: LinkId::new(0),
                next: LinkId::new(2),
            }
        );
    }

    #[test]
    fn entry_mismatch_fails_construction() {
        let mut descriptor = two_link_descriptor();
        descriptor.tracks[0].entry = NodeId::new(2);
        descriptor.tracks[0].links = vec![LinkId::new(0)];

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert!(matches!(error, TopologyError::EntryMismatch { .. }));
    }

    #[test]
    fn empty_track_fails_construction() {
        let mut descriptor = two_link_descriptor();
        descriptor.tracks[0].links.clear();

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert_eq!(
            error,
            TopologyError::EmptyTrack {
                track: TrackId::new(0),
            }
        );
    }

    #[test]
    fn socket_notify_range_must_cover_chip_range() {
        let mut descriptor = two_link_descriptor();
        descriptor.nodes[1].notify_range = 1.0;

        let error = Graph::from_descriptor(&descriptor).expect_err("must fail");
        assert!(matches!(error, TopologyError::NotifyRangeTooSmall { .. }));
    }
}
