//! Network entities and their typed identifiers

use crate::geometry::{Coord3, LineGeometry, LineString3, MultiLineString3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// Stable identifier of an entity of type `E`
///
/// Identifiers are random UUIDs: they never change and are never reused, and the entity type is
/// part of the identifier type so a tube id can't be used to look up a cable.
pub struct Id<E> {
    uuid: Uuid,
    marker: PhantomData<fn() -> E>,
}

impl<E> Id<E> {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

// Manual impls: derives would put bounds on `E`
impl<E> Clone for Id<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Id<E> {}

impl<E> PartialEq for Id<E> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<E> Eq for Id<E> {}

impl<E> PartialOrd for Id<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Id<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<E> Hash for Id<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<E> Default for Id<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.uuid)
    }
}

impl<E> fmt::Display for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uuid, f)
    }
}

#[cfg(feature = "serde")]
impl<E> Serialize for Id<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.uuid.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, E> Deserialize<'de> for Id<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

/// A stored record with a stable identifier
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human readable entity name used in error messages
    const KIND: &'static str;

    fn id(&self) -> Id<Self>;
}

pub type NetworkNodeId = Id<NetworkNode>;
pub type TrackId = Id<Track>;
pub type SectionId = Id<Section>;
pub type TubeId = Id<Tube>;
pub type TubeSectionId = Id<TubeSection>;
pub type CableId = Id<Cable>;
pub type CableTubeId = Id<CableTube>;
pub type StationId = Id<Station>;
pub type NodeId = Id<Node>;
pub type ReachId = Id<Reach>;

macro_rules! entity {
    ($ty:ty, $kind:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            #[inline]
            fn id(&self) -> Id<Self> {
                self.id
            }
        }
    };
}

/// A point where sections start or end
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkNode {
    pub id: NetworkNodeId,
    pub geom: Coord3,
}

/// A physical linear support (trench, duct bank, gallery)
///
/// Its geometry is the union of its sections' geometries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    pub id: TrackId,
    /// Identifier in the system the track was imported from
    pub original_id: Option<String>,
    pub geom: MultiLineString3,
}

/// A contiguous piece of a track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Section {
    pub id: SectionId,
    pub track: TrackId,
    pub geom: LineString3,
    /// Position along the track, `0..n` without gaps
    pub order_index: u32,
    pub network_node_start: Option<NetworkNodeId>,
    pub network_node_end: Option<NetworkNodeId>,
}

impl Section {
    /// Copy of this section under a new identity with a different geometry and position
    pub fn split_off(&self, geom: LineString3, order_index: u32) -> Section {
        Section {
            id: SectionId::new(),
            geom,
            order_index,
            ..self.clone()
        }
    }
}

/// A conduit laid along a sequence of sections
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tube {
    pub id: TubeId,
    pub original_id: Option<String>,
    /// Value list code, see [`crate::ValueListKind::Status`]
    pub status: Option<u32>,
    /// Nominal diameter in millimetres
    pub diameter: Option<u32>,
    /// Value list code, see [`crate::ValueListKind::TubeCableProtection`]
    pub cable_protection_type: Option<u32>,
    /// Derived, `None` until the tube has at least one section
    pub geom: Option<LineGeometry>,
    /// Derived, number of cables going through the tube
    pub cable_count: u32,
}

/// Editable tube attributes
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TubeAttributes {
    pub original_id: Option<String>,
    pub status: Option<u32>,
    pub diameter: Option<u32>,
    pub cable_protection_type: Option<u32>,
}

impl Tube {
    pub fn new(attributes: TubeAttributes) -> Self {
        Self {
            id: TubeId::new(),
            original_id: attributes.original_id,
            status: attributes.status,
            diameter: attributes.diameter,
            cable_protection_type: attributes.cable_protection_type,
            geom: None,
            cable_count: 0,
        }
    }
}

/// Offsets of a tube relative to a section, in millimetres
///
/// Positive `offset_x` is to the left of the section direction, positive `offset_z` is up. The
/// `*_2` values, when set, apply at the end of the section and the offset is tapered in between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Offsets {
    pub offset_x: i32,
    pub offset_x_2: Option<i32>,
    pub offset_z: i32,
    pub offset_z_2: Option<i32>,
}

impl Offsets {
    pub const fn uniform(offset_x: i32, offset_z: i32) -> Self {
        Self {
            offset_x,
            offset_x_2: None,
            offset_z,
            offset_z_2: None,
        }
    }

    #[inline]
    pub fn end_x(&self) -> i32 {
        self.offset_x_2.unwrap_or(self.offset_x)
    }

    #[inline]
    pub fn end_z(&self) -> i32 {
        self.offset_z_2.unwrap_or(self.offset_z)
    }
}

/// Membership of a tube in a section
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TubeSection {
    pub id: TubeSectionId,
    pub tube: TubeId,
    pub section: SectionId,
    /// Position along the tube, `0..n` without gaps
    pub order_index: u32,
    /// Whether the position was guessed rather than surveyed
    pub interpolated: bool,
    pub offsets: Offsets,
}

/// A cable routed through a sequence of tubes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cable {
    pub id: CableId,
    pub identifier: Option<String>,
    pub original_id: Option<String>,
    /// Value list code, see [`crate::ValueListKind::CableTension`]
    pub tension: Option<u32>,
    /// Value list code, see [`crate::ValueListKind::Status`]
    pub status: Option<u32>,
    /// Derived, `None` until the cable goes through a tube with a geometry
    pub geom: Option<LineGeometry>,
}

/// Editable cable attributes
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableAttributes {
    pub identifier: Option<String>,
    pub original_id: Option<String>,
    pub tension: Option<u32>,
    pub status: Option<u32>,
}

impl Cable {
    pub fn new(attributes: CableAttributes) -> Self {
        Self {
            id: CableId::new(),
            identifier: attributes.identifier,
            original_id: attributes.original_id,
            tension: attributes.tension,
            status: attributes.status,
            geom: None,
        }
    }
}

/// Membership of a cable in a tube
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableTube {
    pub id: CableTubeId,
    pub tube: TubeId,
    pub cable: CableId,
    /// Position along the cable, `0..n` without gaps
    pub order_index: u32,
    /// Lateral slot of the cable inside the tube, unique per tube
    pub display_offset: u32,
}

/// A substation, cabinet or any other site where cables end or meet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Station {
    pub id: StationId,
    pub original_id: Option<String>,
    pub label: Option<String>,
    pub geom: Coord3,
}

/// What a topological node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// Connection point inside a station without physical equipment
    Virtual { station: StationId },
    /// Switching equipment inside a station
    Switch { station: StationId },
    /// Open end of the network
    Terminal,
}

/// Vertex of the electrical topology
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn station(&self) -> Option<StationId> {
        match self.kind {
            NodeKind::Virtual { station } | NodeKind::Switch { station } => Some(station),
            NodeKind::Terminal => None,
        }
    }
}

/// Edge of the electrical topology, dangling when `node_2` is unset
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reach {
    pub id: ReachId,
    pub node_1: NodeId,
    pub node_2: Option<NodeId>,
}

entity!(NetworkNode, "NetworkNode");
entity!(Track, "Track");
entity!(Section, "Section");
entity!(Tube, "Tube");
entity!(TubeSection, "TubeSection");
entity!(Cable, "Cable");
entity!(CableTube, "CableTube");
entity!(Station, "Station");
entity!(Node, "Node");
entity!(Reach, "Reach");
