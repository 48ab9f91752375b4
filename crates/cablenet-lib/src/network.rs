use crate::geometry::offset::DEFAULT_MITRE_LIMIT;
use crate::geometry::{Coord3, LineString3, MultiLineString3, wkt};
use crate::model::{
    Cable, CableAttributes, CableId, CableTube, CableTubeId, NetworkNode, NetworkNodeId, Node,
    NodeId, NodeKind, Offsets, Reach, ReachId, Section, SectionId, Station, StationId, Track,
    TrackId, Tube, TubeAttributes, TubeId, TubeSection, TubeSectionId,
};
use crate::ordering::{make_room, next_display_offset, next_order_index, reindex, remove_child};
use crate::profile::{SectionProfile, section_profile};
use crate::recompute::{Recompute, RecomputeReport};
use crate::store::{MemoryStore, Repository, Store, Transactional};
use crate::track::{self, SplitOutcome};
use crate::valuelist::{ValueListKind, ValueLists};
use crate::{NetworkError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for geometry derivation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Boundary edges longer than this keep an inset vertex, shorter ones lose their boundary
    /// vertex (local units)
    pub trim_threshold: f64,

    /// Distance from the boundary vertex of the inset vertex (local units)
    pub boundary_inset: f64,

    /// Lateral distance between cables sharing a tube (local units)
    pub cable_spacing: f64,

    /// Millimetres in one local unit, for tube offsets
    pub millimetres_per_unit: f64,

    /// Mitre joins longer than this multiple of the offset distance are bevelled
    pub mitre_limit: f64,

    /// Planar distance under which two vertices are the same junction (local units)
    pub vertex_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trim_threshold: 1.0,
            boundary_inset: 0.5,
            cable_spacing: 0.1,
            millimetres_per_unit: 1000.0,
            mitre_limit: DEFAULT_MITRE_LIMIT,
            vertex_tolerance: 1e-6,
        }
    }
}

/// Entity counts of a network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkInfo {
    pub network_nodes: usize,
    pub tracks: usize,
    pub sections: usize,
    pub tubes: usize,
    pub tube_sections: usize,
    pub cables: usize,
    pub cable_tubes: usize,
    pub stations: usize,
    pub nodes: usize,
    pub reaches: usize,
}

/// A cable network with its derived geometries kept up to date
///
/// Every mutation runs in one store transaction together with the recomputation of whatever
/// tubes and cables depend on what it changed. When any step fails the store is left untouched.
#[derive(Debug, Clone)]
pub struct Network<S: Transactional = MemoryStore> {
    store: S,
    config: Config,
    value_lists: ValueLists,
}

impl Network<MemoryStore> {
    /// Create an empty in-memory network
    pub fn new(config: Config) -> Self {
        Self::with_store(MemoryStore::default(), config)
    }
}

impl Default for Network<MemoryStore> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<S: Transactional> Network<S> {
    /// Wrap an existing store; derived geometries are trusted until [`Network::recompute_all`]
    pub fn with_store(store: S, config: Config) -> Self {
        Self {
            store,
            config,
            value_lists: ValueLists::default(),
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn value_lists(&self) -> &ValueLists {
        &self.value_lists
    }

    /// Value lists are not versioned with the store, edits apply to later mutations only
    #[inline]
    pub fn value_lists_mut(&mut self) -> &mut ValueLists {
        &mut self.value_lists
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run `f` and then the recomputation it asked for, all in one transaction
    fn mutate<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S, &ValueLists, &mut Recompute) -> Result<T>,
    {
        let Self {
            store,
            config,
            value_lists,
        } = self;
        store.transaction(|store| {
            let mut recompute = Recompute::new();
            let value = f(store, &*value_lists, &mut recompute)?;
            if !recompute.is_empty() {
                recompute.run(store, config)?;
            }
            Ok(value)
        })
    }

    // Tracks and sections

    pub fn create_network_node(&mut self, geom: Coord3) -> Result<NetworkNodeId> {
        self.mutate(|store, _, _| {
            let node = NetworkNode {
                id: NetworkNodeId::new(),
                geom,
            };
            let id = node.id;
            store.put(node);
            Ok(id)
        })
    }

    /// Create a track and one section per part of `geom`
    pub fn create_track(
        &mut self,
        original_id: Option<String>,
        geom: MultiLineString3,
    ) -> Result<TrackId> {
        self.mutate(|store, _, _| track::create_track(store, original_id, geom))
    }

    /// Same as [`Network::create_track`] with a `LINESTRING` or `MULTILINESTRING` text
    pub fn create_track_wkt(&mut self, original_id: Option<String>, text: &str) -> Result<TrackId> {
        let geom = wkt::parse_multi_line_string(text)?;
        self.create_track(original_id, geom)
    }

    /// Cut the sections of `track` crossed by `cutter` and refresh the tubes laid along them
    pub fn split_track(&mut self, track: TrackId, cutter: &LineString3) -> Result<SplitOutcome> {
        self.mutate(|store, _, recompute| {
            let outcome = track::split_track(store, track, cutter)?;
            for &section in &outcome.modified {
                recompute.section(&*store, section);
            }
            Ok(outcome)
        })
    }

    pub fn update_section_geometry(&mut self, section: SectionId, geom: LineString3) -> Result<()> {
        self.mutate(|store, _, recompute| {
            track::replace_section_geometry(store, section, geom)?;
            recompute.section(&*store, section);
            Ok(())
        })
    }

    /// Set or clear the junction nodes at both ends of a section
    pub fn set_section_nodes(
        &mut self,
        section: SectionId,
        start: Option<NetworkNodeId>,
        end: Option<NetworkNodeId>,
    ) -> Result<()> {
        self.mutate(|store, _, _| {
            for node in [start, end].into_iter().flatten() {
                Store::<NetworkNode>::require(&*store, node)?;
            }
            let mut record: Section = store.require(section)?;
            record.network_node_start = start;
            record.network_node_end = end;
            store.put(record);
            Ok(())
        })
    }

    // Tubes

    pub fn create_tube(&mut self, attributes: TubeAttributes) -> Result<TubeId> {
        self.mutate(|store, lists, _| {
            lists.check(ValueListKind::Status, attributes.status)?;
            lists.check(
                ValueListKind::TubeCableProtection,
                attributes.cable_protection_type,
            )?;
            let tube = Tube::new(attributes);
            let id = tube.id;
            store.put(tube);
            tracing::debug!("Created tube {}", id);
            Ok(id)
        })
    }

    /// Lay `tube` along one more section, after the current last one
    pub fn add_tube_section(
        &mut self,
        tube: TubeId,
        section: SectionId,
        offsets: Offsets,
    ) -> Result<TubeSectionId> {
        self.mutate(|store, _, recompute| {
            Store::<Tube>::require(&*store, tube)?;
            Store::<Section>::require(&*store, section)?;
            let order_index = next_order_index::<_, TubeSection>(&*store, tube)?;
            let id = put_tube_section(store, tube, section, order_index, offsets);
            recompute.tube(tube);
            Ok(id)
        })
    }

    /// Lay `tube` along a section at `position`, shifting the following memberships
    ///
    /// Positions past the end append.
    pub fn insert_tube_section(
        &mut self,
        tube: TubeId,
        section: SectionId,
        position: u32,
        offsets: Offsets,
    ) -> Result<TubeSectionId> {
        self.mutate(|store, _, recompute| {
            Store::<Tube>::require(&*store, tube)?;
            Store::<Section>::require(&*store, section)?;
            let order_index = make_room::<_, TubeSection>(store, tube, position)?;
            let id = put_tube_section(store, tube, section, order_index, offsets);
            recompute.tube(tube);
            Ok(id)
        })
    }

    pub fn update_tube_section_offsets(
        &mut self,
        membership: TubeSectionId,
        offsets: Offsets,
        interpolated: bool,
    ) -> Result<()> {
        self.mutate(|store, _, recompute| {
            let mut record: TubeSection = store.require(membership)?;
            record.offsets = offsets;
            record.interpolated = interpolated;
            recompute.tube(record.tube);
            store.put(record);
            Ok(())
        })
    }

    /// Take a section out of its tube, closing the gap in the tube's order
    pub fn remove_tube_section(&mut self, membership: TubeSectionId) -> Result<()> {
        self.mutate(|store, _, recompute| {
            let record = remove_child::<_, TubeSection>(store, membership)?;
            recompute.tube(record.tube);
            Ok(())
        })
    }

    /// Renumber the memberships of `tube` in the given order, which must list each one once
    pub fn reorder_tube_sections(&mut self, tube: TubeId, order: &[TubeSectionId]) -> Result<()> {
        self.mutate(|store, _, recompute| {
            Store::<Tube>::require(&*store, tube)?;
            reindex(store, tube, order)?;
            recompute.tube(tube);
            Ok(())
        })
    }

    /// Delete a tube with its memberships; cables that went through it are rerouted without it
    pub fn delete_tube(&mut self, tube: TubeId) -> Result<()> {
        self.mutate(|store, _, recompute| {
            Store::<Tube>::require(&*store, tube)?;
            for membership in store.tube_sections_of(tube) {
                Store::<TubeSection>::delete(store, membership.id);
            }
            for membership in store.cable_tubes_on(tube) {
                remove_child::<_, CableTube>(store, membership.id)?;
                recompute.cable(membership.cable);
            }
            Store::<Tube>::delete(store, tube);
            tracing::info!("Deleted tube {}", tube);
            Ok(())
        })
    }

    // Cables

    pub fn create_cable(&mut self, attributes: CableAttributes) -> Result<CableId> {
        self.mutate(|store, lists, _| {
            lists.check(ValueListKind::CableTension, attributes.tension)?;
            lists.check(ValueListKind::Status, attributes.status)?;
            let cable = Cable::new(attributes);
            let id = cable.id;
            store.put(cable);
            tracing::debug!("Created cable {}", id);
            Ok(id)
        })
    }

    /// Route `cable` through one more tube, in the next free slot of that tube
    pub fn add_cable_tube(&mut self, cable: CableId, tube: TubeId) -> Result<CableTubeId> {
        self.mutate(|store, _, recompute| {
            Store::<Cable>::require(&*store, cable)?;
            Store::<Tube>::require(&*store, tube)?;
            let membership = CableTube {
                id: CableTubeId::new(),
                tube,
                cable,
                order_index: next_order_index::<_, CableTube>(&*store, cable)?,
                display_offset: next_display_offset(&*store, tube),
            };
            let id = membership.id;
            store.put(membership);
            // The tube's count changes and with it the slots of every cable inside
            recompute.tube(tube).cable(cable);
            Ok(id)
        })
    }

    /// Take a cable out of a tube
    ///
    /// The freed display offset stays unused. The cable's remaining tubes close ranks.
    pub fn remove_cable_tube(&mut self, membership: CableTubeId) -> Result<()> {
        self.mutate(|store, _, recompute| {
            let record = remove_child::<_, CableTube>(store, membership)?;
            recompute.tube(record.tube).cable(record.cable);
            Ok(())
        })
    }

    pub fn reorder_cable_tubes(&mut self, cable: CableId, order: &[CableTubeId]) -> Result<()> {
        self.mutate(|store, _, recompute| {
            Store::<Cable>::require(&*store, cable)?;
            reindex(store, cable, order)?;
            recompute.cable(cable);
            Ok(())
        })
    }

    /// Delete a cable with its memberships and refresh the tubes it went through
    pub fn delete_cable(&mut self, cable: CableId) -> Result<()> {
        self.mutate(|store, _, recompute| {
            Store::<Cable>::require(&*store, cable)?;
            for membership in store.cable_tubes_of(cable) {
                Store::<CableTube>::delete(store, membership.id);
                recompute.tube(membership.tube);
            }
            Store::<Cable>::delete(store, cable);
            tracing::info!("Deleted cable {}", cable);
            Ok(())
        })
    }

    // Topology

    pub fn create_station(
        &mut self,
        original_id: Option<String>,
        label: Option<String>,
        geom: Coord3,
    ) -> Result<StationId> {
        self.mutate(|store, _, _| {
            let station = Station {
                id: StationId::new(),
                original_id,
                label,
                geom,
            };
            let id = station.id;
            store.put(station);
            Ok(id)
        })
    }

    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        self.mutate(|store, _, _| {
            let node = Node {
                id: NodeId::new(),
                kind,
            };
            if let Some(station) = node.station() {
                Store::<Station>::require(&*store, station)?;
            }
            let id = node.id;
            store.put(node);
            Ok(id)
        })
    }

    pub fn create_reach(&mut self, node_1: NodeId, node_2: Option<NodeId>) -> Result<ReachId> {
        self.mutate(|store, _, _| {
            for node in std::iter::once(node_1).chain(node_2) {
                Store::<Node>::require(&*store, node)?;
            }
            let reach = Reach {
                id: ReachId::new(),
                node_1,
                node_2,
            };
            let id = reach.id;
            store.put(reach);
            Ok(id)
        })
    }

    // Queries

    pub fn section_profile(&self, section: SectionId) -> Result<SectionProfile> {
        section_profile(&self.store, section)
    }

    /// Recompute every tube and then every cable, e.g. after loading a store from elsewhere
    pub fn recompute_all(&mut self) -> Result<RecomputeReport> {
        let Self { store, config, .. } = self;
        store.transaction(|store| {
            let report = Recompute::all(&*store).run(store, config)?;
            tracing::info!(
                "Recomputed {} tubes and {} cables",
                report.tubes.len(),
                report.cables.len()
            );
            Ok(report)
        })
    }

    pub fn info(&self) -> NetworkInfo {
        let store = &self.store;
        NetworkInfo {
            network_nodes: Store::<NetworkNode>::count(store),
            tracks: Store::<Track>::count(store),
            sections: Store::<Section>::count(store),
            tubes: Store::<Tube>::count(store),
            tube_sections: Store::<TubeSection>::count(store),
            cables: Store::<Cable>::count(store),
            cable_tubes: Store::<CableTube>::count(store),
            stations: Store::<Station>::count(store),
            nodes: Store::<Node>::count(store),
            reaches: Store::<Reach>::count(store),
        }
    }

    /// Shorthand for reading one entity of any type
    pub fn get<E>(&self, id: crate::Id<E>) -> Result<E>
    where
        E: crate::Entity,
        S: Store<E>,
    {
        self.store.get(id).ok_or_else(|| NetworkError::missing(id))
    }
}

fn put_tube_section<S: Store<TubeSection>>(
    store: &mut S,
    tube: TubeId,
    section: SectionId,
    order_index: u32,
    offsets: Offsets,
) -> TubeSectionId {
    let membership = TubeSection {
        id: TubeSectionId::new(),
        tube,
        section,
        order_index,
        interpolated: false,
        offsets,
    };
    let id = membership.id;
    store.put(membership);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineGeometry;
    use crate::valuelist::ValueListEntry;

    const X0: f64 = 2508500.0;
    const Y0: f64 = 1152000.0;

    /// Five vertices on a diagonal going up by one unit per vertex
    fn five_vertex_line() -> LineString3 {
        (0..5)
            .map(|i| {
                let i = f64::from(i);
                (X0 + 10.0 * i, Y0 + 10.0 * i, 400.0 + i)
            })
            .collect()
    }

    /// Vertical cutting line through the middle of the third segment
    fn middle_cutter() -> LineString3 {
        let (x, y) = (X0 + 25.0, Y0 + 25.0);
        vec![(x, y - 10.0, 0.0), (x, y + 10.0, 0.0)]
            .into_iter()
            .collect()
    }

    fn network_with_track() -> (Network, TrackId) {
        let mut network: Network = Network::default();
        let track = network
            .create_track(Some("T-1".to_string()), five_vertex_line().into())
            .unwrap();
        (network, track)
    }

    fn section_ids(network: &Network, track: TrackId) -> Vec<SectionId> {
        network
            .store()
            .sections_of(track)
            .iter()
            .map(|s| s.id)
            .collect()
    }

    fn tube_geom(network: &Network, tube: TubeId) -> Option<LineGeometry> {
        network.get::<Tube>(tube).unwrap().geom
    }

    fn display_offsets(network: &Network, tube: TubeId) -> Vec<u32> {
        network
            .store()
            .cable_tubes_on(tube)
            .iter()
            .map(|ct| ct.display_offset)
            .collect()
    }


    #[test]
    fn test_end_to_end_scenario() {
        let (mut network, track) = network_with_track();
        assert_eq!(network.info().sections, 1);

        let outcome = network.split_track(track, &middle_cutter()).unwrap();
        assert!(outcome.has_split());
        let sections = network.store().sections_of(track);
        assert_eq!(sections.len(), 2);
        let indices: Vec<u32> = sections.iter().map(|s| s.order_index).collect();
        assert_eq!(indices, vec![0, 1]);

        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        for section in &sections {
            network
                .add_tube_section(tube, section.id, Offsets::uniform(100, 0))
                .unwrap();
        }

        let geom = tube_geom(&network, tube).expect("tube has a geometry");
        let line = geom.as_line().expect("single connected line");
        let original = five_vertex_line();
        assert_eq!(line.first(), original.first());
        assert_eq!(line.last(), original.last());

        let interior = &line.coords()[1..line.len() - 1];
        assert!(!interior.is_empty());
        for c in interior {
            // Distance to the diagonal, positive on its left
            let distance = ((c.y - Y0) - (c.x - X0)) / 2f64.sqrt();
            assert!((distance - 0.1).abs() < 1e-6, "vertex {:?} at {}", c, distance);
        }
    }

    #[test]
    fn test_split_without_crossing_is_a_no_op() {
        let (mut network, track) = network_with_track();
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        let section = section_ids(&network, track)[0];
        network
            .add_tube_section(tube, section, Offsets::uniform(100, 0))
            .unwrap();
        let sections_before = network.store().sections_of(track);
        let track_before: Track = network.get(track).unwrap();
        let tube_before = tube_geom(&network, tube);

        let far_away: LineString3 = vec![(0.0, 0.0, 0.0), (1.0, 1.0, 0.0)].into_iter().collect();
        let outcome = network.split_track(track, &far_away).unwrap();

        assert!(!outcome.has_split());
        assert_eq!(network.store().sections_of(track), sections_before);
        assert_eq!(network.get::<Track>(track).unwrap(), track_before);
        assert_eq!(tube_geom(&network, tube), tube_before);
    }

    #[test]
    fn test_split_keeps_order_contiguous_and_union() {
        let (mut network, track) = network_with_track();
        network.split_track(track, &middle_cutter()).unwrap();

        // Second cut through the first vertex segment of the first section
        let (x, y) = (X0 + 5.0, Y0 + 5.0);
        let cutter: LineString3 = vec![(x - 10.0, y, 0.0), (x + 10.0, y, 0.0)]
            .into_iter()
            .collect();
        let outcome = network.split_track(track, &cutter).unwrap();
        assert_eq!(outcome.modified.len(), 1);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.renumbered.len(), 1);

        let sections = network.store().sections_of(track);
        let indices: Vec<u32> = sections.iter().map(|s| s.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let record: Track = network.get(track).unwrap();
        let expected = crate::geometry::union_lines(sections.iter().map(|s| &s.geom));
        assert_eq!(record.geom, expected);
    }

    #[test]
    fn test_split_refreshes_tube_on_cut_section() {
        let (mut network, track) = network_with_track();
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        let section = section_ids(&network, track)[0];
        network
            .add_tube_section(tube, section, Offsets::uniform(0, 0))
            .unwrap();

        network.split_track(track, &middle_cutter()).unwrap();

        // The tube stays on the first piece only
        let geom = tube_geom(&network, tube).unwrap();
        let end = geom.last().copied().unwrap();
        assert!((end.x - (X0 + 25.0)).abs() < 1e-6);
        assert!((end.y - (Y0 + 25.0)).abs() < 1e-6);
    }

    #[test]
    fn test_recompute_all_is_idempotent() {
        let (mut network, track) = network_with_track();
        network.split_track(track, &middle_cutter()).unwrap();
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        for (i, section) in section_ids(&network, track).into_iter().enumerate() {
            let offsets = Offsets {
                offset_x: 300,
                offset_x_2: Some(-200),
                offset_z: -800 - 100 * i as i32,
                offset_z_2: None,
            };
            network.add_tube_section(tube, section, offsets).unwrap();
        }
        let cable = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(cable, tube).unwrap();

        let first = network.recompute_all().unwrap();
        let tube_geom_1 = tube_geom(&network, tube);
        let cable_geom_1 = network.get::<Cable>(cable).unwrap().geom;

        let second = network.recompute_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(tube_geom(&network, tube), tube_geom_1);
        assert_eq!(network.get::<Cable>(cable).unwrap().geom, cable_geom_1);
        assert!(cable_geom_1.is_some());
    }

    #[test]
    fn test_display_offsets_are_assigned_in_sequence() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        let other = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(tube, section, Offsets::uniform(200, 0))
            .unwrap();

        for _ in 0..3 {
            let cable = network.create_cable(CableAttributes::default()).unwrap();
            network.add_cable_tube(cable, other).unwrap();
            network.add_cable_tube(cable, tube).unwrap();
        }

        assert_eq!(display_offsets(&network, tube), vec![0, 1, 2]);
        assert_eq!(display_offsets(&network, other), vec![0, 1, 2]);
        assert_eq!(network.get::<Tube>(tube).unwrap().cable_count, 3);
    }

    #[test]
    fn test_removed_cable_leaves_a_gap() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(tube, section, Offsets::uniform(200, 0))
            .unwrap();

        let mut memberships = Vec::new();
        let mut cables = Vec::new();
        for _ in 0..3 {
            let cable = network.create_cable(CableAttributes::default()).unwrap();
            memberships.push(network.add_cable_tube(cable, tube).unwrap());
            cables.push(cable);
        }
        let last_before = network.get::<Cable>(cables[2]).unwrap().geom;

        network.remove_cable_tube(memberships[1]).unwrap();
        assert_eq!(display_offsets(&network, tube), vec![0, 2]);
        assert_eq!(network.get::<Tube>(tube).unwrap().cable_count, 2);
        assert_eq!(network.get::<Cable>(cables[1]).unwrap().geom, None);
        // Two cables now centre differently, so the sibling moved
        assert_ne!(network.get::<Cable>(cables[2]).unwrap().geom, last_before);

        let cable = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(cable, tube).unwrap();
        assert_eq!(display_offsets(&network, tube), vec![0, 2, 3]);
    }

    #[test]
    fn test_failed_mutation_rolls_back() {
        let (mut network, track) = network_with_track();
        let sections = section_ids(&network, track);
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        let membership = network
            .add_tube_section(tube, sections[0], Offsets::uniform(100, 0))
            .unwrap();
        let info = network.info();
        let geom = tube_geom(&network, tube);

        let err = network
            .add_tube_section(tube, SectionId::new(), Offsets::default())
            .unwrap_err();
        assert!(matches!(err, NetworkError::Referential { kind: "Section", .. }));

        let err = network
            .reorder_tube_sections(tube, &[membership, membership])
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvariantViolation(_)));

        assert_eq!(network.info(), info);
        assert_eq!(tube_geom(&network, tube), geom);
    }

    #[test]
    fn test_removal_rejects_broken_order() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        let memberships: Vec<TubeSectionId> = (0..3)
            .map(|_| {
                network
                    .add_tube_section(tube, section, Offsets::default())
                    .unwrap()
            })
            .collect();
        let other = network.create_tube(TubeAttributes::default()).unwrap();
        let cable = network.create_cable(CableAttributes::default()).unwrap();
        let routed: Vec<CableTubeId> = [tube, other, tube]
            .iter()
            .map(|&t| network.add_cable_tube(cable, t).unwrap())
            .collect();

        // Seed orders 0, 2, 3 by shifting everything after the first entry
        let mut store = network.into_store();
        for &id in &memberships[1..] {
            let mut record: TubeSection = store.require(id).unwrap();
            record.order_index += 1;
            store.put(record);
        }
        for &id in &routed[1..] {
            let mut record: CableTube = store.require(id).unwrap();
            record.order_index += 1;
            store.put(record);
        }
        let mut network = Network::with_store(store, Config::default());
        let tube_orders = |network: &Network| -> Vec<u32> {
            network
                .store()
                .tube_sections_of(tube)
                .iter()
                .map(|ts| ts.order_index)
                .collect()
        };
        let cable_orders = |network: &Network| -> Vec<u32> {
            network
                .store()
                .cable_tubes_of(cable)
                .iter()
                .map(|ct| ct.order_index)
                .collect()
        };
        assert_eq!(tube_orders(&network), vec![0, 2, 3]);
        assert_eq!(cable_orders(&network), vec![0, 2, 3]);
        let info = network.info();

        let err = network.remove_tube_section(memberships[2]).unwrap_err();
        assert!(matches!(err, NetworkError::InvariantViolation(_)));
        let err = network.remove_cable_tube(routed[2]).unwrap_err();
        assert!(matches!(err, NetworkError::InvariantViolation(_)));
        let err = network.delete_tube(other).unwrap_err();
        assert!(matches!(err, NetworkError::InvariantViolation(_)));

        assert_eq!(tube_orders(&network), vec![0, 2, 3]);
        assert_eq!(cable_orders(&network), vec![0, 2, 3]);
        assert_eq!(network.info(), info);
    }

    #[test]
    fn test_tube_membership_edits() {
        let (mut network, track) = network_with_track();
        network.split_track(track, &middle_cutter()).unwrap();
        let sections = section_ids(&network, track);
        let tube = network.create_tube(TubeAttributes::default()).unwrap();

        let second = network
            .add_tube_section(tube, sections[1], Offsets::uniform(100, 0))
            .unwrap();
        let first = network
            .insert_tube_section(tube, sections[0], 0, Offsets::uniform(100, 0))
            .unwrap();
        let order: Vec<TubeSectionId> = network
            .store()
            .tube_sections_of(tube)
            .iter()
            .map(|ts| ts.id)
            .collect();
        assert_eq!(order, vec![first, second]);
        let joined = tube_geom(&network, tube).unwrap();
        assert!(joined.as_line().is_some());

        network
            .update_tube_section_offsets(second, Offsets::uniform(-100, 0), true)
            .unwrap();
        let record: TubeSection = network.get(second).unwrap();
        assert!(record.interpolated);
        assert_ne!(tube_geom(&network, tube), Some(joined));

        network.reorder_tube_sections(tube, &[second, first]).unwrap();
        assert_eq!(network.get::<TubeSection>(second).unwrap().order_index, 0);

        network.remove_tube_section(second).unwrap();
        let remaining = network.store().tube_sections_of(tube);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, first);
        assert_eq!(remaining[0].order_index, 0);

        network.remove_tube_section(first).unwrap();
        assert_eq!(tube_geom(&network, tube), None);
    }

    #[test]
    fn test_section_edit_reaches_cables() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(tube, section, Offsets::uniform(0, -1000))
            .unwrap();
        let cable = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(cable, tube).unwrap();

        let straight: LineString3 = vec![(0.0, 0.0, 10.0), (50.0, 0.0, 10.0)]
            .into_iter()
            .collect();
        network.update_section_geometry(section, straight).unwrap();

        let tube_line = tube_geom(&network, tube).unwrap();
        assert_eq!(tube_line.first(), Some(&Coord3::new(0.0, 0.0, 9.0)));
        assert_eq!(tube_line.last(), Some(&Coord3::new(50.0, 0.0, 9.0)));
        let cable_geom = network.get::<Cable>(cable).unwrap().geom.unwrap();
        assert_eq!(cable_geom.first(), Some(&Coord3::new(0.0, 0.0, 0.0)));
        assert_eq!(cable_geom.last(), Some(&Coord3::new(50.0, 0.0, 0.0)));
        let record: Track = network.get(track).unwrap();
        assert_eq!(record.geom.length_2d(), 50.0);
    }

    #[test]
    fn test_cables_are_planar_below_a_raised_track() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(tube, section, Offsets::uniform(0, -800))
            .unwrap();
        let cable = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(cable, tube).unwrap();

        let tube_line = tube_geom(&network, tube).unwrap();
        assert!(
            tube_line
                .parts()
                .iter()
                .flat_map(|p| p.coords())
                .all(|c| c.z > 399.0)
        );

        let cable_geom = network.get::<Cable>(cable).unwrap().geom.unwrap();
        let coords: Vec<Coord3> = cable_geom
            .parts()
            .iter()
            .flat_map(|p| p.coords())
            .copied()
            .collect();
        assert!(coords.len() >= 2);
        assert!(coords.iter().all(|c| c.z == 0.0), "{:?}", coords);
        let original = five_vertex_line();
        assert_eq!(cable_geom.first(), original.first().map(|c| c.with_z(0.0)).as_ref());
        assert_eq!(cable_geom.last(), original.last().map(|c| c.with_z(0.0)).as_ref());
    }

    #[test]
    fn test_deletes_cascade() {
        let (mut network, track) = network_with_track();
        network.split_track(track, &middle_cutter()).unwrap();
        let sections = section_ids(&network, track);
        let a = network.create_tube(TubeAttributes::default()).unwrap();
        let b = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(a, sections[0], Offsets::default())
            .unwrap();
        network
            .add_tube_section(b, sections[1], Offsets::default())
            .unwrap();
        let cable = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(cable, a).unwrap();
        network.add_cable_tube(cable, b).unwrap();
        let other = network.create_cable(CableAttributes::default()).unwrap();
        network.add_cable_tube(other, b).unwrap();

        network.delete_tube(a).unwrap();
        let remaining = network.store().cable_tubes_of(cable);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].tube, b);
        assert_eq!(remaining[0].order_index, 0);
        let end = network.get::<Cable>(cable).unwrap().geom.unwrap();
        let start = sections_first(&network, sections[1]).map(|c| c.with_z(0.0));
        assert_eq!(end.first(), start.as_ref());

        network.delete_cable(cable).unwrap();
        assert_eq!(network.get::<Tube>(b).unwrap().cable_count, 1);
        assert!(network.store().cable_tubes_on(b).iter().all(|ct| ct.cable == other));

        let info = network.info();
        assert_eq!(info.tubes, 1);
        assert_eq!(info.tube_sections, 1);
        assert_eq!(info.cables, 1);
        assert_eq!(info.cable_tubes, 1);
    }

    fn sections_first(network: &Network, section: SectionId) -> Option<Coord3> {
        network.get::<Section>(section).unwrap().geom.first().copied()
    }

    #[test]
    fn test_value_lists_guard_attributes() {
        let mut network: Network = Network::default();
        let err = network
            .create_tube(TubeAttributes {
                status: Some(7),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "StatusType 7 does not exist");

        network
            .value_lists_mut()
            .insert(ValueListKind::CableTension, ValueListEntry::new(16, "16 kV"));
        let cable = network.create_cable(CableAttributes {
            tension: Some(16),
            status: Some(crate::valuelist::UNKNOWN_CODE),
            ..Default::default()
        });
        assert!(cable.is_ok());
        assert_eq!(network.info().tubes, 0);
    }

    #[test]
    fn test_section_nodes_and_topology() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let start = network.create_network_node(five_vertex_line().0[0]).unwrap();

        network.set_section_nodes(section, Some(start), None).unwrap();
        assert_eq!(
            network.get::<Section>(section).unwrap().network_node_start,
            Some(start)
        );
        assert!(
            network
                .set_section_nodes(section, None, Some(NetworkNodeId::new()))
                .is_err()
        );

        let station = network
            .create_station(None, Some("North".to_string()), Coord3::new(X0, Y0, 400.0))
            .unwrap();
        let switch = network.create_node(NodeKind::Switch { station }).unwrap();
        let terminal = network.create_node(NodeKind::Terminal).unwrap();
        assert!(
            network
                .create_node(NodeKind::Virtual {
                    station: StationId::new()
                })
                .is_err()
        );

        let reach = network.create_reach(switch, Some(terminal)).unwrap();
        assert_eq!(network.get::<Reach>(reach).unwrap().node_2, Some(terminal));
        assert!(network.create_reach(switch, Some(NodeId::new())).is_err());
        assert_eq!(network.info().reaches, 1);
    }

    #[test]
    fn test_create_track_from_wkt() {
        let mut network: Network = Network::default();
        let track = network
            .create_track_wkt(
                None,
                "MULTILINESTRING Z ((0 0 1, 10 0 1), (10 0 1, 20 5 2))",
            )
            .unwrap();
        assert_eq!(network.store().sections_of(track).len(), 2);
        assert!(matches!(
            network.create_track_wkt(None, "POINT (1 2)"),
            Err(NetworkError::Wkt(_))
        ));
    }

    #[test]
    fn test_profile_through_network() {
        let (mut network, track) = network_with_track();
        let section = section_ids(&network, track)[0];
        let tube = network.create_tube(TubeAttributes::default()).unwrap();
        network
            .add_tube_section(tube, section, Offsets::uniform(150, -700))
            .unwrap();
        let profile = network.section_profile(section).unwrap();
        assert_eq!(profile.tubes.len(), 1);
        assert_eq!(profile.tubes[0].pos.x, 150.0);
    }
}
