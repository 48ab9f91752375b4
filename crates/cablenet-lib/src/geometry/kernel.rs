//! Line primitives: intersection, split, interpolation, merge and azimuths
//!
//! Every function is pure. Malformed input (fewer than two vertices, zero length) degrades to
//! an empty or `None` result instead of an error; callers decide whether that is fatal.

use super::{Coord3, LineGeometry, LineString3, MultiLineString3};
use geo::Intersects;
use geo::Line;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use std::f64::consts::TAU;

/// Measures closer than this (in segment units) are the same cut location
const CUT_EPSILON: f64 = 1e-9;

/// Whether two lines share at least one planar point
pub fn intersects(a: &LineString3, b: &LineString3) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    a.to_2d().intersects(&b.to_2d())
}

/// A cut location along a line: segment index plus parameter within that segment
#[derive(Debug, Clone, Copy)]
struct Cut {
    segment: usize,
    t: f64,
}

impl Cut {
    /// Moves a cut sitting on a segment end to the start of the following segment
    fn normalized(segment: usize, t: f64) -> Self {
        if t >= 1.0 - CUT_EPSILON {
            Cut {
                segment: segment + 1,
                t: 0.0,
            }
        } else if t <= CUT_EPSILON {
            Cut { segment, t: 0.0 }
        } else {
            Cut { segment, t }
        }
    }

    #[inline]
    fn measure(&self) -> f64 {
        self.segment as f64 + self.t
    }
}

/// Split `line` at every point where `cutter` crosses or touches it
///
/// Pieces are returned in line order and keep the heights of the input (interpolated at the
/// cut points). Without an intersection the input comes back unchanged as the only piece.
/// Collinear overlaps do not cut. An invalid `line` yields no pieces.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn split(line: &LineString3, cutter: &LineString3) -> Vec<LineString3> {
    if !line.is_valid() {
        return Vec::new();
    }
    if cutter.len() < 2 {
        return vec![line.clone()];
    }

    let coords = line.coords();
    let segment_count = coords.len() - 1;
    let mut cuts = Vec::new();

    for (i, w) in coords.windows(2).enumerate() {
        let length = w[0].distance_2d(&w[1]);
        if length == 0.0 {
            continue;
        }
        let segment = Line::new(w[0].xy(), w[1].xy());
        for blade in cutter.coords().windows(2) {
            let blade = Line::new(blade[0].xy(), blade[1].xy());
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(segment, blade)
            {
                let t = (intersection.x - w[0].x).hypot(intersection.y - w[0].y) / length;
                cuts.push(Cut::normalized(i, t.clamp(0.0, 1.0)));
            }
        }
    }

    // Cuts on the line's own end points do not produce a piece
    let end_measure = segment_count as f64 - CUT_EPSILON;
    cuts.retain(|c| c.measure() > CUT_EPSILON && c.measure() < end_measure);
    if cuts.is_empty() {
        return vec![line.clone()];
    }
    cuts.sort_by(|a, b| a.measure().total_cmp(&b.measure()));
    cuts.dedup_by(|a, b| (a.measure() - b.measure()).abs() < CUT_EPSILON);

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut current = vec![coords[0]];
    let mut cuts = cuts.into_iter().peekable();

    for i in 0..segment_count {
        let (a, b) = (coords[i], coords[i + 1]);
        while let Some(cut) = cuts.next_if(|c| c.segment == i) {
            let point = if cut.t == 0.0 { a } else { a.lerp(&b, cut.t) };
            if current.last() != Some(&point) {
                current.push(point);
            }
            pieces.push(LineString3(std::mem::replace(&mut current, vec![point])));
        }
        current.push(b);
    }
    pieces.push(LineString3(current));

    pieces.retain(LineString3::is_valid);
    pieces
}

/// Point at `fraction` (0..=1) of the planar length, height interpolated
pub fn interpolate(line: &LineString3, fraction: f64) -> Option<Coord3> {
    let length = line.length_2d();
    if line.is_empty() || !fraction.is_finite() {
        return None;
    }
    interpolate_at_distance(line, fraction.clamp(0.0, 1.0) * length)
}

/// Point at a planar `distance` from the start; negative distances count from the end
pub fn interpolate_at_distance(line: &LineString3, distance: f64) -> Option<Coord3> {
    let coords = line.coords();
    let first = *coords.first()?;
    let length = line.length_2d();
    if length == 0.0 {
        return Some(first);
    }

    let target = if distance < 0.0 {
        (length + distance).max(0.0)
    } else {
        distance.min(length)
    };

    let mut walked = 0.0;
    for w in coords.windows(2) {
        let edge = w[0].distance_2d(&w[1]);
        if edge > 0.0 && walked + edge >= target {
            return Some(w[0].lerp(&w[1], (target - walked) / edge));
        }
        walked += edge;
    }
    coords.last().copied()
}

/// Portion of `line` between two length fractions, `start <= end`
///
/// Returns `None` for invalid input or when the requested portion has no length.
pub fn substring(line: &LineString3, start: f64, end: f64) -> Option<LineString3> {
    if !line.is_valid() || !(start.is_finite() && end.is_finite()) {
        return None;
    }
    let (start, end) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
    if start >= end {
        return None;
    }

    let length = line.length_2d();
    let (from, to) = (start * length, end * length);
    let mut coords = vec![interpolate_at_distance(line, from)?];

    let mut walked = 0.0;
    for w in line.coords().windows(2) {
        walked += w[0].distance_2d(&w[1]);
        if walked > from && walked < to {
            coords.push(w[1]);
        }
    }
    coords.push(interpolate_at_distance(line, to)?);
    coords.dedup();

    Some(LineString3(coords))
}

/// Planar union of edge-disjoint lines, in input order
///
/// Lines coming from the sections of one track never overlap, so the union is the collection of
/// the valid parts with exact duplicates (in either direction) removed.
pub fn union_lines<'a>(lines: impl IntoIterator<Item = &'a LineString3>) -> MultiLineString3 {
    let mut parts: Vec<LineString3> = Vec::new();
    for line in lines {
        if !line.is_valid() {
            continue;
        }
        let reversed = line.reversed();
        if parts.iter().any(|p| p == line || *p == reversed) {
            continue;
        }
        parts.push(line.clone());
    }
    MultiLineString3(parts)
}

/// For lines given in traversal order, which ones must be reversed to follow the traversal
///
/// A line connects to its predecessor through whichever of its end points touches the
/// predecessor's (oriented) end. The first line, or any line disconnected from its predecessor,
/// is oriented towards its successor instead. Lines touching neither keep their direction.
pub fn chain_orientation(lines: &[&LineString3], tolerance: f64) -> Vec<bool> {
    let mut reversed: Vec<bool> = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let (Some(first), Some(last)) = (line.first(), line.last()) else {
            reversed.push(false);
            continue;
        };

        let previous_end = i.checked_sub(1).and_then(|p| {
            if reversed[p] {
                lines[p].first()
            } else {
                lines[p].last()
            }
        });
        if let Some(end) = previous_end {
            if first.coincides(end, tolerance) {
                reversed.push(false);
                continue;
            }
            if last.coincides(end, tolerance) {
                reversed.push(true);
                continue;
            }
        }

        let touches_next = |point: &Coord3| {
            lines.get(i + 1).is_some_and(|next| {
                [next.first(), next.last()]
                    .into_iter()
                    .flatten()
                    .any(|c| c.coincides(point, tolerance))
            })
        };
        reversed.push(!touches_next(last) && touches_next(first));
    }

    reversed
}

/// Join line parts that share end points into maximal simple runs
///
/// Two parts are joined only through a node where exactly two part ends meet, so branches stay
/// separate. At a junction the vertex of the earlier part is kept. Returns `None` when no valid
/// part is given, a single line when everything could be joined.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn merge_lines(parts: &[LineString3], tolerance: f64) -> Option<LineGeometry> {
    let mut runs: Vec<Vec<Coord3>> = parts
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| p.0.clone())
        .collect();
    if runs.is_empty() {
        return None;
    }

    'merge: loop {
        for i in 0..runs.len() {
            for j in (i + 1)..runs.len() {
                let Some((junction, joined)) = join_pair(&runs[i], &runs[j], tolerance) else {
                    continue;
                };
                if node_degree(&runs, &junction, tolerance) != 2 {
                    continue;
                }
                runs[i] = joined;
                runs.remove(j);
                continue 'merge;
            }
        }
        break;
    }

    let mut runs: Vec<LineString3> = runs.into_iter().map(LineString3).collect();
    if runs.len() == 1 {
        runs.pop().map(LineGeometry::Line)
    } else {
        Some(LineGeometry::MultiLine(MultiLineString3(runs)))
    }
}

/// Number of run end points located at `node`
fn node_degree(runs: &[Vec<Coord3>], node: &Coord3, tolerance: f64) -> usize {
    runs.iter()
        .flat_map(|r| [r.first(), r.last()])
        .flatten()
        .filter(|c| c.coincides(node, tolerance))
        .count()
}

/// Join `b` onto `a` if they share an end point, preferring `a`'s end to `b`'s start
fn join_pair(a: &[Coord3], b: &[Coord3], tolerance: f64) -> Option<(Coord3, Vec<Coord3>)> {
    let (a0, a1) = (*a.first()?, *a.last()?);
    let (b0, b1) = (*b.first()?, *b.last()?);

    let joined: (Coord3, Vec<Coord3>) = if a1.coincides(&b0, tolerance) {
        (a1, a.iter().chain(&b[1..]).copied().collect())
    } else if a1.coincides(&b1, tolerance) {
        (a1, a.iter().copied().chain(b.iter().rev().skip(1).copied()).collect())
    } else if a0.coincides(&b1, tolerance) {
        (a0, b[..b.len() - 1].iter().chain(a).copied().collect())
    } else if a0.coincides(&b0, tolerance) {
        (a0, b.iter().rev().chain(&a[1..]).copied().collect())
    } else {
        return None;
    };
    Some(joined)
}

/// Planar azimuth of the segment `a → b`, clockwise from north, in radians `[0, 2π)`
fn azimuth(a: &Coord3, b: &Coord3) -> Option<f64> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let angle = dx.atan2(dy);
    Some(if angle < 0.0 { angle + TAU } else { angle })
}

/// Direction at every vertex, in degrees clockwise from north
///
/// Angles are not rounded, see [`whole_degree_azimuths`] for integer degrees.
///
/// Interior vertices get the circular mean of the incoming and outgoing segment azimuths
/// (`atan2` of the averaged sines and cosines, so in `(-180, 180]`); end points get the azimuth
/// of their only segment, in `[0, 360)`. A vertex between two zero-length segments repeats the
/// previous direction.
pub fn azimuths_along_line(line: &LineString3) -> Vec<f64> {
    let coords = line.coords();
    if coords.len() < 2 {
        return Vec::new();
    }

    let segments: Vec<Option<f64>> = coords.windows(2).map(|w| azimuth(&w[0], &w[1])).collect();
    let mut azimuths = Vec::with_capacity(coords.len());
    let mut previous = 0.0;

    for i in 0..coords.len() {
        let ante = i.checked_sub(1).and_then(|s| segments[s]);
        let post = segments.get(i).copied().flatten();
        let degrees = match (ante, post) {
            (Some(a), Some(p)) => {
                let sin = (a.sin() + p.sin()) / 2.0;
                let cos = (a.cos() + p.cos()) / 2.0;
                sin.atan2(cos).to_degrees()
            }
            (Some(a), None) => a.to_degrees(),
            (None, Some(p)) => p.to_degrees(),
            (None, None) => previous,
        };
        azimuths.push(degrees);
        previous = degrees;
    }

    azimuths
}

/// [`azimuths_along_line`] rounded to whole degrees, halves away from zero
pub fn whole_degree_azimuths(line: &LineString3) -> Vec<i32> {
    azimuths_along_line(line)
        .into_iter()
        .map(|a| a.round() as i32)
        .collect()
}
