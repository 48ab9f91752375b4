//! Entity store contract and an in-memory implementation
//!
//! The engine only talks to storage through [`Store`] (per-entity CRUD), [`Repository`] (ordered
//! child queries) and [`Transactional`] (all-or-nothing multi-entity writes). Whatever is written
//! inside a transaction is immediately visible to reads in the same transaction.

use crate::model::{
    Cable, CableId, CableTube, Entity, Id, NetworkNode, Node, Reach, Section, SectionId, Station,
    Track, TrackId, Tube, TubeId, TubeSection,
};
use crate::{NetworkError, Result};
use std::collections::BTreeMap;

/// CRUD access to the entities of type `E`
pub trait Store<E: Entity> {
    fn get(&self, id: Id<E>) -> Option<E>;

    /// Insert or replace
    fn put(&mut self, entity: E);

    fn delete(&mut self, id: Id<E>) -> Option<E>;

    fn ids(&self) -> Vec<Id<E>>;

    fn all(&self) -> Vec<E>;

    fn count(&self) -> usize;

    fn contains(&self, id: Id<E>) -> bool {
        self.get(id).is_some()
    }

    /// Like [`Store::get`] but a missing entity is a referential error
    fn require(&self, id: Id<E>) -> Result<E> {
        self.get(id).ok_or_else(|| NetworkError::missing(id))
    }
}

/// Storage for every network entity plus the ordered relationship queries the engine needs
pub trait Repository:
    Store<NetworkNode>
    + Store<Track>
    + Store<Section>
    + Store<Tube>
    + Store<TubeSection>
    + Store<Cable>
    + Store<CableTube>
    + Store<Station>
    + Store<Node>
    + Store<Reach>
    + Sync
{
    /// Sections of a track ordered by `order_index`
    fn sections_of(&self, track: TrackId) -> Vec<Section>;

    /// Memberships of a tube ordered by `order_index`
    fn tube_sections_of(&self, tube: TubeId) -> Vec<TubeSection>;

    /// Every tube membership referencing a section, in no particular order
    fn tube_sections_on(&self, section: SectionId) -> Vec<TubeSection>;

    /// Memberships of a cable ordered by `order_index`
    fn cable_tubes_of(&self, cable: CableId) -> Vec<CableTube>;

    /// Cables going through a tube ordered by `display_offset`
    fn cable_tubes_on(&self, tube: TubeId) -> Vec<CableTube>;
}

/// Atomic multi-entity writes
pub trait Transactional: Repository + Sized {
    /// Run `f` against the store; its writes are kept only when it returns `Ok`
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>;
}

/// In-memory store backed by ordered maps
///
/// Transactions run on a copy which replaces the store on success, so a failed transaction
/// leaves nothing behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    network_nodes: BTreeMap<Id<NetworkNode>, NetworkNode>,
    tracks: BTreeMap<Id<Track>, Track>,
    sections: BTreeMap<Id<Section>, Section>,
    tubes: BTreeMap<Id<Tube>, Tube>,
    tube_sections: BTreeMap<Id<TubeSection>, TubeSection>,
    cables: BTreeMap<Id<Cable>, Cable>,
    cable_tubes: BTreeMap<Id<CableTube>, CableTube>,
    stations: BTreeMap<Id<Station>, Station>,
    nodes: BTreeMap<Id<Node>, Node>,
    reaches: BTreeMap<Id<Reach>, Reach>,
}

macro_rules! table {
    ($ty:ty, $field:ident) => {
        impl Store<$ty> for MemoryStore {
            #[inline]
            fn get(&self, id: Id<$ty>) -> Option<$ty> {
                self.$field.get(&id).cloned()
            }

            fn put(&mut self, entity: $ty) {
                self.$field.insert(entity.id(), entity);
            }

            fn delete(&mut self, id: Id<$ty>) -> Option<$ty> {
                self.$field.remove(&id)
            }

            fn ids(&self) -> Vec<Id<$ty>> {
                self.$field.keys().copied().collect()
            }

            fn all(&self) -> Vec<$ty> {
                self.$field.values().cloned().collect()
            }

            #[inline]
            fn count(&self) -> usize {
                self.$field.len()
            }

            #[inline]
            fn contains(&self, id: Id<$ty>) -> bool {
                self.$field.contains_key(&id)
            }
        }
    };
}

table!(NetworkNode, network_nodes);
table!(Track, tracks);
table!(Section, sections);
table!(Tube, tubes);
table!(TubeSection, tube_sections);
table!(Cable, cables);
table!(CableTube, cable_tubes);
table!(Station, stations);
table!(Node, nodes);
table!(Reach, reaches);

impl Repository for MemoryStore {
    fn sections_of(&self, track: TrackId) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .sections
            .values()
            .filter(|s| s.track == track)
            .cloned()
            .collect();
        sections.sort_by_key(|s| s.order_index);
        sections
    }

    fn tube_sections_of(&self, tube: TubeId) -> Vec<TubeSection> {
        let mut memberships: Vec<TubeSection> = self
            .tube_sections
            .values()
            .filter(|ts| ts.tube == tube)
            .cloned()
            .collect();
        memberships.sort_by_key(|ts| ts.order_index);
        memberships
    }

    fn tube_sections_on(&self, section: SectionId) -> Vec<TubeSection> {
        self.tube_sections
            .values()
            .filter(|ts| ts.section == section)
            .cloned()
            .collect()
    }

    fn cable_tubes_of(&self, cable: CableId) -> Vec<CableTube> {
        let mut memberships: Vec<CableTube> = self
            .cable_tubes
            .values()
            .filter(|ct| ct.cable == cable)
            .cloned()
            .collect();
        memberships.sort_by_key(|ct| ct.order_index);
        memberships
    }

    fn cable_tubes_on(&self, tube: TubeId) -> Vec<CableTube> {
        let mut memberships: Vec<CableTube> = self
            .cable_tubes
            .values()
            .filter(|ct| ct.tube == tube)
            .cloned()
            .collect();
        memberships.sort_by_key(|ct| ct.display_offset);
        memberships
    }
}

impl Transactional for MemoryStore {
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("store::transaction");

        let mut working = self.clone();
        match f(&mut working) {
            Ok(value) => {
                *self = working;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("Transaction rolled back: {}", err);
                Err(err)
            }
        }
    }
}
