//! Geometry types and the pure geometry kernel
//!
//! All geometry lives in one planar coordinate reference with an explicit height. Planar
//! operations (intersection, offsetting, merging) are delegated to `geo` on the 2D projection,
//! while heights are carried alongside and re-attached by the callers that need them.

pub mod kernel;
pub mod offset;
pub mod wkt;

use geo::{Coord, LineString};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use kernel::{
    azimuths_along_line, interpolate, interpolate_at_distance, intersects, merge_lines, split,
    substring, union_lines, whole_degree_azimuths,
};
pub use offset::{JoinStyle, OffsetCurve, offset_curve, offset_curve_varying};

/// A vertex with planar coordinates and height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar projection
    #[inline]
    pub fn xy(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Planar distance, height is ignored
    #[inline]
    pub fn distance_2d(&self, other: &Coord3) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation of all three components
    #[inline]
    pub fn lerp(&self, other: &Coord3, t: f64) -> Coord3 {
        Coord3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Same vertex in plan within `tolerance`
    #[inline]
    pub fn coincides(&self, other: &Coord3, tolerance: f64) -> bool {
        self.distance_2d(other) <= tolerance
    }

    #[inline]
    pub fn with_z(self, z: f64) -> Coord3 {
        Coord3 { z, ..self }
    }
}

impl From<(f64, f64, f64)> for Coord3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Coord3::new(x, y, z)
    }
}

impl From<(f64, f64)> for Coord3 {
    fn from((x, y): (f64, f64)) -> Self {
        Coord3::new(x, y, 0.0)
    }
}

/// An ordered list of 3D vertices
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineString3(pub Vec<Coord3>);

impl LineString3 {
    pub fn new(coords: Vec<Coord3>) -> Self {
        Self(coords)
    }

    #[inline]
    pub fn coords(&self) -> &[Coord3] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A line needs at least two vertices that are not all at the same planar location
    pub fn is_valid(&self) -> bool {
        self.0.len() >= 2 && self.length_2d() > 0.0
    }

    #[inline]
    pub fn first(&self) -> Option<&Coord3> {
        self.0.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Coord3> {
        self.0.last()
    }

    /// Planar length
    pub fn length_2d(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance_2d(&w[1])).sum()
    }

    /// Planar projection as a `geo` line string
    pub fn to_2d(&self) -> LineString<f64> {
        LineString::new(self.0.iter().map(Coord3::xy).collect())
    }

    pub fn reversed(&self) -> LineString3 {
        LineString3(self.0.iter().rev().copied().collect())
    }

    /// Same vertices with every height set to zero
    pub fn flattened(&self) -> LineString3 {
        LineString3(self.0.iter().map(|c| c.with_z(0.0)).collect())
    }
}

impl From<Vec<Coord3>> for LineString3 {
    fn from(coords: Vec<Coord3>) -> Self {
        Self(coords)
    }
}

impl<T: Into<Coord3>> FromIterator<T> for LineString3 {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A collection of 3D lines
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultiLineString3(pub Vec<LineString3>);

impl MultiLineString3 {
    pub fn new(parts: Vec<LineString3>) -> Self {
        Self(parts)
    }

    #[inline]
    pub fn parts(&self) -> &[LineString3] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn length_2d(&self) -> f64 {
        self.0.iter().map(LineString3::length_2d).sum()
    }
}

impl From<LineString3> for MultiLineString3 {
    fn from(line: LineString3) -> Self {
        Self(vec![line])
    }
}

/// Result of a line merge: a single line when every part could be joined, otherwise the
/// maximal runs that were found
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineGeometry {
    Line(LineString3),
    MultiLine(MultiLineString3),
}

impl LineGeometry {
    /// Borrow every part, one for a single line
    pub fn parts(&self) -> &[LineString3] {
        match self {
            LineGeometry::Line(line) => std::slice::from_ref(line),
            LineGeometry::MultiLine(multi) => multi.parts(),
        }
    }

    pub fn as_line(&self) -> Option<&LineString3> {
        match self {
            LineGeometry::Line(line) => Some(line),
            LineGeometry::MultiLine(_) => None,
        }
    }

    pub fn first(&self) -> Option<&Coord3> {
        self.parts().first().and_then(LineString3::first)
    }

    pub fn last(&self) -> Option<&Coord3> {
        self.parts().last().and_then(LineString3::last)
    }

    pub fn length_2d(&self) -> f64 {
        self.parts().iter().map(LineString3::length_2d).sum()
    }
}
