//! Shared derivation steps for tubes and cables
//!
//! A derived geometry is built from oriented legs (a section seen from a tube, a tube part seen
//! from a cable). Connected legs with continuous offsets form runs. Each run keeps its two end
//! vertices where they are, so junctions with neighbouring networks stay put, and its interior is
//! trimmed near the ends and offset.

use crate::Config;
use crate::geometry::kernel::chain_orientation;
use crate::geometry::{
    Coord3, JoinStyle, LineGeometry, LineString3, merge_lines, offset_curve_varying,
};

/// One input line in traversal order with its offsets at both ends, in local units
///
/// `lateral` is positive to the left of the traversal direction, `vertical` is added to heights.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Leg {
    pub geom: LineString3,
    pub lateral: (f64, f64),
    pub vertical: (f64, f64),
}

impl Leg {
    /// Same leg traversed the other way round
    ///
    /// Offsets are expressed in the frame of the line, so the lateral side flips as well.
    pub fn reversed(self) -> Leg {
        Leg {
            geom: self.geom.reversed(),
            lateral: (-self.lateral.1, -self.lateral.0),
            vertical: (self.vertical.1, self.vertical.0),
        }
    }

    /// Per-vertex values tapered linearly along the planar length
    fn vertex_values(&self, (start, end): (f64, f64)) -> Vec<f64> {
        let length = self.geom.length_2d();
        if length == 0.0 || start == end {
            return vec![start; self.geom.len()];
        }
        let mut walked = 0.0;
        let mut values = Vec::with_capacity(self.geom.len());
        for (i, c) in self.geom.coords().iter().enumerate() {
            if i > 0 {
                walked += self.geom.coords()[i - 1].distance_2d(c);
            }
            values.push(start + (end - start) * walked / length);
        }
        values
    }
}

/// Reverse the legs that are traversed against their own direction
pub(crate) fn orient(legs: Vec<Leg>, tolerance: f64) -> Vec<Leg> {
    let reversed = {
        let geoms: Vec<&LineString3> = legs.iter().map(|l| &l.geom).collect();
        chain_orientation(&geoms, tolerance)
    };
    legs.into_iter()
        .zip(reversed)
        .map(|(leg, reversed)| if reversed { leg.reversed() } else { leg })
        .collect()
}

/// A maximal chain of connected legs with per-vertex offsets
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Run {
    pub coords: Vec<Coord3>,
    pub lateral: Vec<f64>,
    pub vertical: Vec<f64>,
}

impl Run {
    fn from_leg(leg: &Leg) -> Run {
        Run {
            coords: leg.geom.coords().to_vec(),
            lateral: leg.vertex_values(leg.lateral),
            vertical: leg.vertex_values(leg.vertical),
        }
    }

    /// Append `leg` if it starts where this run ends with the same offsets
    fn extend(&mut self, leg: &Leg, tolerance: f64) -> bool {
        let (Some(end), Some(start)) = (self.coords.last(), leg.geom.first()) else {
            return false;
        };
        let continuous = self.lateral.last() == Some(&leg.lateral.0)
            && self.vertical.last() == Some(&leg.vertical.0);
        if !continuous || !end.coincides(start, tolerance) {
            return false;
        }
        let next = Run::from_leg(leg);
        self.coords.extend_from_slice(&next.coords[1..]);
        self.lateral.extend_from_slice(&next.lateral[1..]);
        self.vertical.extend_from_slice(&next.vertical[1..]);
        true
    }

    /// Move the vertex at `index` towards `neighbour` by the boundary inset, or drop it when
    /// their edge is not longer than the trim threshold
    fn trim_vertex(&mut self, index: usize, neighbour: usize, config: &Config) {
        let edge = self.coords[index].distance_2d(&self.coords[neighbour]);
        if edge > config.trim_threshold {
            let t = (config.boundary_inset / edge).min(0.5);
            let lerp = |a: f64, b: f64| a + (b - a) * t;
            self.coords[index] = self.coords[index].lerp(&self.coords[neighbour], t);
            self.lateral[index] = lerp(self.lateral[index], self.lateral[neighbour]);
            self.vertical[index] = lerp(self.vertical[index], self.vertical[neighbour]);
        } else {
            self.coords.remove(index);
            self.lateral.remove(index);
            self.vertical.remove(index);
        }
    }
}

/// Chain oriented legs into runs, in order
pub(crate) fn group_runs(legs: &[Leg], tolerance: f64) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for leg in legs.iter().filter(|l| l.geom.is_valid()) {
        if let Some(run) = runs.last_mut()
            && run.extend(leg, tolerance)
        {
            continue;
        }
        runs.push(Run::from_leg(leg));
    }
    runs
}

/// Offset one run, keeping its end vertices in place
///
/// The first and last edges are trimmed before offsetting: a boundary vertex on an edge longer
/// than the trim threshold is moved inwards by the boundary inset, otherwise it is dropped.
/// Heights of the offset vertices come from their source vertices plus the vertical offset.
pub(crate) fn offset_run(run: &Run, join: JoinStyle, config: &Config) -> LineString3 {
    let (Some(&start), Some(&end)) = (run.coords.first(), run.coords.last()) else {
        return LineString3::default();
    };
    let last = run.coords.len() - 1;
    let start = start.with_z(start.z + run.vertical[0]);
    let end = end.with_z(end.z + run.vertical[last]);

    let mut interior = run.clone();
    if interior.coords.len() >= 2 {
        interior.trim_vertex(0, 1, config);
    }
    if interior.coords.len() >= 2 {
        let n = interior.coords.len();
        interior.trim_vertex(n - 1, n - 2, config);
    }

    let mut coords = vec![start];
    let working = LineString3::new(interior.coords.clone());
    match offset_curve_varying(&working, &interior.lateral, join, config.mitre_limit) {
        Some(curve) => {
            for (c, source) in curve.vertices() {
                let z = interior.coords[source].z + interior.vertical[source];
                coords.push(Coord3::new(c.x, c.y, z));
            }
        }
        None => {
            // Too short to offset, keep the centre line
            tracing::debug!("Run of {} vertices left unoffset", run.coords.len());
            coords.extend(
                run.coords[1..last]
                    .iter()
                    .zip(&run.vertical[1..last])
                    .map(|(c, v)| c.with_z(c.z + v)),
            );
        }
    }
    coords.push(end);
    coords.dedup_by(|b, a| b.coincides(a, config.vertex_tolerance) && b.z == a.z);

    LineString3::new(coords)
}

/// Orient, chain, offset and merge legs into one derived geometry
///
/// `None` when no leg has a valid geometry.
pub(crate) fn derive(legs: Vec<Leg>, join: JoinStyle, config: &Config) -> Option<LineGeometry> {
    let legs = orient(legs, config.vertex_tolerance);
    let parts: Vec<LineString3> = group_runs(&legs, config.vertex_tolerance)
        .iter()
        .map(|run| offset_run(run, join, config))
        .filter(LineString3::is_valid)
        .collect();
    merge_lines(&parts, config.vertex_tolerance)
}
