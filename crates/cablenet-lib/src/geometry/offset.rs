//! Offset curves for open polylines
//!
//! Each segment is moved along its left normal by the (signed) distance of its end vertices,
//! and consecutive offset segments are joined at every interior vertex:
//!
//! - **Inner corners**: the intersection of the two offset lines, for every join style
//! - **Outer corners**: the mitre point, or the two offset segment ends for bevel joins and for
//!   mitres longer than `mitre_limit × |distance|`
//! - **Hairpins**: near-antiparallel segments always get the two offset segment ends
//!
//! The result is planar. Every output vertex records the index of the input vertex it was
//! derived from so callers can carry heights (or anything else) across the offset.

use super::LineString3;
use geo::{Coord, LineString};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Below this cosine between consecutive normals the corner is treated as a hairpin
const HAIRPIN_COS: f64 = -0.98;

/// Sine between consecutive normals under which the corner is considered straight
const COLLINEAR_SIN: f64 = 1e-12;

/// Default maximum mitre length, as a multiple of the offset distance
pub const DEFAULT_MITRE_LIMIT: f64 = 5.0;

/// Corner joining policy used when building offset curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum JoinStyle {
    /// Extend both offset segments to their intersection
    #[default]
    Mitre,
    /// Cut the corner with a straight segment between both offset segment ends
    Bevel,
}

/// A planar offset curve with, for every vertex, the index of its source vertex
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCurve {
    pub line: LineString<f64>,
    pub sources: Vec<usize>,
}

impl OffsetCurve {
    /// Offset vertices paired with their source vertex index
    pub fn vertices(&self) -> impl Iterator<Item = (Coord<f64>, usize)> + '_ {
        self.line.coords().copied().zip(self.sources.iter().copied())
    }
}

/// Parallel line at a constant signed planar `distance` (positive is left of travel)
pub fn offset_curve(
    line: &LineString3,
    distance: f64,
    join: JoinStyle,
    mitre_limit: f64,
) -> Option<OffsetCurve> {
    offset_curve_varying(line, &vec![distance; line.len()], join, mitre_limit)
}

/// Offset curve whose signed distance is given per input vertex
///
/// Along a segment the distance varies linearly between its two vertices, which makes tapered
/// offsets possible. Consecutive duplicate vertices are collapsed onto the first one. Returns
/// `None` when `distances` does not match the line or fewer than two distinct vertices remain.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn offset_curve_varying(
    line: &LineString3,
    distances: &[f64],
    join: JoinStyle,
    mitre_limit: f64,
) -> Option<OffsetCurve> {
    if line.len() < 2 || distances.len() != line.len() {
        return None;
    }

    let mut vertices: Vec<(Coord<f64>, f64, usize)> = Vec::with_capacity(line.len());
    for (index, (coord, distance)) in line.coords().iter().zip(distances).enumerate() {
        let coord = coord.xy();
        if vertices.last().is_some_and(|(last, _, _)| *last == coord) {
            continue;
        }
        vertices.push((coord, *distance, index));
    }
    if vertices.len() < 2 {
        return None;
    }

    let normals: Vec<Coord<f64>> = vertices
        .windows(2)
        .map(|w| left_normal(w[0].0, w[1].0))
        .collect();

    let mut coords = Vec::with_capacity(vertices.len() + 4);
    let mut sources = Vec::with_capacity(vertices.len() + 4);

    let (start, start_distance, start_source) = vertices[0];
    coords.push(start + normals[0] * start_distance);
    sources.push(start_source);

    for k in 1..vertices.len() - 1 {
        let (corner, distance, source) = vertices[k];
        for point in join_corner(corner, normals[k - 1], normals[k], distance, join, mitre_limit) {
            coords.push(point);
            sources.push(source);
        }
    }

    let (end, end_distance, end_source) = vertices[vertices.len() - 1];
    coords.push(end + normals[normals.len() - 1] * end_distance);
    sources.push(end_source);

    Some(OffsetCurve {
        line: LineString::new(coords),
        sources,
    })
}

/// Unit normal pointing left of the direction `a → b`
fn left_normal(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let d = b - a;
    let length = d.x.hypot(d.y);
    Coord {
        x: -d.y / length,
        y: d.x / length,
    }
}

/// Offset vertices replacing the input vertex `corner`
fn join_corner(
    corner: Coord<f64>,
    n_prev: Coord<f64>,
    n_next: Coord<f64>,
    distance: f64,
    join: JoinStyle,
    mitre_limit: f64,
) -> SmallVec<[Coord<f64>; 2]> {
    if distance == 0.0 {
        return smallvec![corner];
    }

    let dot = n_prev.x * n_next.x + n_prev.y * n_next.y;
    let cross = n_prev.x * n_next.y - n_prev.y * n_next.x;

    if cross.abs() < COLLINEAR_SIN && dot > 0.0 {
        return smallvec![corner + n_prev * distance];
    }
    let bevel: SmallVec<[Coord<f64>; 2]> =
        smallvec![corner + n_prev * distance, corner + n_next * distance];
    if dot < HAIRPIN_COS {
        return bevel;
    }

    // Both offset lines pass at `distance` from the corner, they meet on the bisector
    let mitre = corner + (n_prev + n_next) * (distance / (1.0 + dot));
    // A left turn (cross > 0) puts the left side on the inside of the corner
    let inner = cross * distance > 0.0;
    if inner {
        return smallvec![mitre];
    }

    match join {
        JoinStyle::Bevel => bevel,
        JoinStyle::Mitre => {
            let mitre_ratio = (2.0 / (1.0 + dot)).sqrt();
            if mitre_ratio > mitre_limit {
                bevel
            } else {
                smallvec![mitre]
            }
        }
    }
}
