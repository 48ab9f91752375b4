//! Cablenet Library - Geometry Derivation for Underground Cable Networks
//!
//! This library models a cable network made of linear supports ([`Track`]s) split into ordered
//! [`Section`]s, containment conduits ([`Tube`]s) threaded along sections, and [`Cable`]s routed
//! through sequences of tubes. Tube and cable geometries are never edited directly: they are
//! derived from their ordered inputs with lateral/vertical offset curves and recomputed
//! synchronously, inside the transaction of whichever mutation changed an input.
//!
//! # Architecture
//!
//! - **[`geometry`]**: Pure kernel (intersection, split, offset curves, merge, azimuths, WKT)
//! - **[`ordering`]**: Contiguous `order_index` sequences and display-offset slots
//! - **[`track`]**: Track creation and the track split engine
//! - **[`recompute`]**: Dependency graph `Section → Tube → Cable` and the derivation algorithms
//! - **[`store`]**: Repository traits and the transactional [`MemoryStore`]
//! - **[`Network`]**: Transactional facade that runs every mutation and its recomputation
//!
//! # Consistency Model
//!
//! - **Single writer**: every mutation takes `&mut` and runs in one store transaction
//! - **All or nothing**: a failed mutation leaves the store exactly as it was
//! - **Deterministic**: derived geometries are pure functions of their current inputs

pub mod geometry;
mod model;
mod network;
pub mod ordering;
mod profile;
pub mod recompute;
pub mod store;
pub mod track;
pub mod utils;
mod valuelist;

// Public API exports
pub use geometry::{Coord3, JoinStyle, LineGeometry, LineString3, MultiLineString3};
pub use model::{
    Cable, CableAttributes, CableId, CableTube, CableTubeId, Entity, Id, NetworkNode,
    NetworkNodeId, Node, NodeId, NodeKind, Offsets, Reach, ReachId, Section, SectionId, Station,
    StationId, Track, TrackId, Tube, TubeAttributes, TubeId, TubeSection, TubeSectionId,
};
pub use network::{Config, Network, NetworkInfo};
pub use profile::{CableProfile, ProfilePosition, SectionProfile, TubeProfile, section_profile};
pub use recompute::{Recompute, RecomputeReport};
pub use store::{MemoryStore, Repository, Store, Transactional};
pub use track::SplitOutcome;
pub use valuelist::{ValueListEntry, ValueListKind, ValueLists};

/// Error types for the network engine
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Ordering invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{kind} {id} does not exist")]
    Referential { kind: &'static str, id: String },

    #[error("WKT error: {0}")]
    Wkt(#[from] geometry::wkt::WktError),
}

impl NetworkError {
    pub(crate) fn missing<E: Entity>(id: Id<E>) -> Self {
        NetworkError::Referential {
            kind: E::KIND,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
