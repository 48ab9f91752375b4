//! Dependency recomputation engine
//!
//! Derived geometries follow a static dependency graph:
//!
//! ```text
//! Section.geom ─┐
//! TubeSection ──┴─> Tube.geom, Tube.cable_count ─┐
//!                   CableTube ───────────────────┴─> Cable.geom
//! ```
//!
//! Mutations mark what they touched on a [`Recompute`] and run it inside their own transaction.
//! Dirty tubes are evaluated first, then every cable that is dirty itself or goes through a dirty
//! tube. Within a layer each geometry only reads committed inputs, so the layer is computed in
//! parallel and written back sequentially.

mod cable;
mod legs;
mod tube;

pub use cable::{cable_geometry, cable_lateral_offset};
pub use tube::tube_geometry;

use crate::geometry::LineGeometry;
use crate::model::{Cable, CableId, SectionId, Tube, TubeId};
use crate::store::{Repository, Store};
use crate::{Config, Result};
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Entities recomputed by one [`Recompute::run`]
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecomputeReport {
    pub tubes: Vec<TubeId>,
    pub cables: Vec<CableId>,
}

/// Set of dirty derived entities
#[derive(Debug, Clone, Default)]
pub struct Recompute {
    tubes: BTreeSet<TubeId>,
    cables: BTreeSet<CableId>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Recompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything in the store, for refreshes after external loads
    pub fn all<S: Repository>(store: &S) -> Self {
        Self {
            tubes: Store::<Tube>::ids(store).into_iter().collect(),
            cables: Store::<Cable>::ids(store).into_iter().collect(),
        }
    }

    /// A section geometry changed: every tube laid along it
    pub fn section<S: Repository>(&mut self, store: &S, section: SectionId) -> &mut Self {
        self.tubes
            .extend(store.tube_sections_on(section).iter().map(|ts| ts.tube));
        self
    }

    /// A tube's sections, offsets or cable memberships changed
    pub fn tube(&mut self, tube: TubeId) -> &mut Self {
        self.tubes.insert(tube);
        self
    }

    /// A cable's tubes or display offsets changed
    pub fn cable(&mut self, cable: CableId) -> &mut Self {
        self.cables.insert(cable);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty() && self.cables.is_empty()
    }

    /// Recompute every dirty tube, then every affected cable, writing results to `store`
    pub fn run<S: Repository>(&self, store: &mut S, config: &Config) -> Result<RecomputeReport> {
        #[cfg(feature = "profiling")]
        profiling::scope!("recompute::run");

        let tubes: Vec<TubeId> = self.tubes.iter().copied().collect();
        let computed: Vec<(TubeId, Option<LineGeometry>, u32)> = {
            let view: &S = store;
            tubes
                .par_iter()
                .map(|&id| {
                    let geom = tube_geometry(view, id, config)?;
                    let cable_count = view.cable_tubes_on(id).len() as u32;
                    Ok((id, geom, cable_count))
                })
                .collect::<Result<_>>()?
        };

        // Cables see the new tube geometries and counts
        let mut cables = self.cables.clone();
        for (id, geom, cable_count) in computed {
            let mut tube: Tube = store.require(id)?;
            tube.geom = geom;
            tube.cable_count = cable_count;
            store.put(tube);
            cables.extend(store.cable_tubes_on(id).iter().map(|ct| ct.cable));
            tracing::debug!("Recomputed tube {} ({} cables)", id, cable_count);
        }

        let cables: Vec<CableId> = cables.into_iter().collect();
        let computed: Vec<(CableId, Option<LineGeometry>)> = {
            let view: &S = store;
            cables
                .par_iter()
                .map(|&id| Ok((id, cable_geometry(view, id, config)?)))
                .collect::<Result<_>>()?
        };

        for (id, geom) in computed {
            let mut cable: Cable = store.require(id)?;
            cable.geom = geom;
            store.put(cable);
            tracing::debug!("Recomputed cable {}", id);
        }

        Ok(RecomputeReport { tubes, cables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CableAttributes, CableTube, CableTubeId, Offsets, Section, TrackId, TubeAttributes,
        TubeSection, TubeSectionId,
    };
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        section: SectionId,
        tube: TubeId,
        cables: Vec<CableId>,
    }

    /// One section, one tube along it and two cables in the tube
    fn fixture() -> Fixture {
        let mut store = MemoryStore::default();
        let section = Section {
            id: SectionId::new(),
            track: TrackId::new(),
            geom: vec![(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (20.0, 5.0, 0.0)]
                .into_iter()
                .collect(),
            order_index: 0,
            network_node_start: None,
            network_node_end: None,
        };
        let tube = Tube::new(TubeAttributes::default());
        store.put(TubeSection {
            id: TubeSectionId::new(),
            tube: tube.id,
            section: section.id,
            order_index: 0,
            interpolated: false,
            offsets: Offsets::uniform(200, 0),
        });
        let mut cables = Vec::new();
        for display_offset in 0..2 {
            let cable = Cable::new(CableAttributes::default());
            store.put(CableTube {
                id: CableTubeId::new(),
                tube: tube.id,
                cable: cable.id,
                order_index: 0,
                display_offset,
            });
            cables.push(cable.id);
            store.put(cable);
        }

        let (section_id, tube_id) = (section.id, tube.id);
        store.put(section);
        store.put(tube);
        Fixture {
            store,
            section: section_id,
            tube: tube_id,
            cables,
        }
    }

    #[test]
    fn test_section_change_reaches_cables() {
        let Fixture {
            mut store,
            section,
            tube,
            cables,
        } = fixture();

        let mut recompute = Recompute::new();
        recompute.section(&store, section);
        assert!(!recompute.is_empty());
        let report = recompute.run(&mut store, &Config::default()).unwrap();

        assert_eq!(report.tubes, vec![tube]);
        let mut expected = cables.clone();
        expected.sort();
        assert_eq!(report.cables, expected);

        let tube: Tube = store.require(tube).unwrap();
        assert_eq!(tube.cable_count, 2);
        assert!(tube.geom.is_some());
        for cable in cables {
            let cable: Cable = store.require(cable).unwrap();
            assert!(cable.geom.is_some());
        }
    }

    #[test]
    fn test_run_is_idempotent() {
        let Fixture { mut store, .. } = fixture();
        let config = Config::default();

        Recompute::all(&store).run(&mut store, &config).unwrap();
        let tubes: Vec<Tube> = store.all();
        let cables: Vec<Cable> = store.all();

        Recompute::all(&store).run(&mut store, &config).unwrap();
        assert_eq!(Store::<Tube>::all(&store), tubes);
        assert_eq!(Store::<Cable>::all(&store), cables);
    }

    #[test]
    fn test_unrelated_section_is_clean() {
        let Fixture { store, .. } = fixture();
        let mut recompute = Recompute::new();
        recompute.section(&store, SectionId::new());
        assert!(recompute.is_empty());
    }

    #[test]
    fn test_run_fails_on_missing_tube() {
        let Fixture { mut store, .. } = fixture();
        let mut recompute = Recompute::new();
        recompute.tube(TubeId::new());
        assert!(recompute.run(&mut store, &Config::default()).is_err());
    }
}
