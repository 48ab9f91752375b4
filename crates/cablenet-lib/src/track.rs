//! Track creation and the track split engine
//!
//! A track owns an ordered sequence of sections. Splitting rewrites that sequence in place:
//! sections crossed by the cutting line are cut into ordered pieces, the first piece keeps the
//! section's identity and every following piece is inserted right after it as a new section.

use crate::geometry::{LineString3, MultiLineString3, intersects, split, union_lines};
use crate::model::{Section, SectionId, Track, TrackId};
use crate::ordering::check_contiguous;
use crate::store::Repository;
use crate::{NetworkError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sections touched by a split
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitOutcome {
    /// Sections whose geometry was replaced by their first piece
    pub modified: Vec<SectionId>,
    /// New sections holding the following pieces
    pub created: Vec<SectionId>,
    /// Untouched sections that only moved to a new `order_index`
    pub renumbered: Vec<SectionId>,
}

impl SplitOutcome {
    /// Whether anything was cut
    pub fn has_split(&self) -> bool {
        !self.modified.is_empty()
    }
}

/// Create a track with one section per part of `geom`, numbered in part order
pub fn create_track<S: Repository>(
    store: &mut S,
    original_id: Option<String>,
    geom: MultiLineString3,
) -> Result<TrackId> {
    if geom.is_empty() {
        return Err(NetworkError::Geometry("track geometry is empty".to_string()));
    }
    if let Some(position) = geom.parts().iter().position(|p| !p.is_valid()) {
        return Err(NetworkError::Geometry(format!(
            "track part {} is not a valid line",
            position
        )));
    }

    let track = Track {
        id: TrackId::new(),
        original_id,
        geom: geom.clone(),
    };
    let id = track.id;
    store.put(track);

    for (order_index, part) in geom.0.into_iter().enumerate() {
        store.put(Section {
            id: SectionId::new(),
            track: id,
            geom: part,
            order_index: order_index as u32,
            network_node_start: None,
            network_node_end: None,
        });
    }

    tracing::info!("Created track {} with {} sections", id, store.sections_of(id).len());
    Ok(id)
}

/// Cut every section of `track` crossed by `cutter`
///
/// Sections after the first cut are renumbered so indices stay contiguous, and the track
/// geometry is rebuilt from its sections. A cutter crossing no section changes nothing.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn split_track<S: Repository>(
    store: &mut S,
    track: TrackId,
    cutter: &LineString3,
) -> Result<SplitOutcome> {
    if !cutter.is_valid() {
        return Err(NetworkError::Geometry(
            "cutting line needs at least two distinct vertices".to_string(),
        ));
    }
    store.require(track)?;

    let sections = store.sections_of(track);
    check_contiguous(&sections)?;

    let mut outcome = SplitOutcome::default();
    let mut order_index: u32 = 0;

    for mut section in sections {
        let pieces = if intersects(&section.geom, cutter) {
            split(&section.geom, cutter)
        } else {
            Vec::new()
        };

        if pieces.len() >= 2 {
            let mut pieces = pieces.into_iter();
            if let Some(first) = pieces.next() {
                section.geom = first;
                section.order_index = order_index;
                outcome.modified.push(section.id);
            }
            for piece in pieces {
                order_index += 1;
                let created = section.split_off(piece, order_index);
                outcome.created.push(created.id);
                store.put(created);
            }
            store.put(section);
        } else if outcome.has_split() && section.order_index != order_index {
            section.order_index = order_index;
            outcome.renumbered.push(section.id);
            store.put(section);
        }

        order_index += 1;
    }

    if !outcome.has_split() {
        tracing::debug!("Cutting line does not cross track {}", track);
        return Ok(outcome);
    }

    check_contiguous(&store.sections_of(track))?;
    rebuild_track_geometry(store, track)?;

    tracing::info!(
        "Split track {}: {} sections cut into {} new sections, {} renumbered",
        track,
        outcome.modified.len(),
        outcome.created.len(),
        outcome.renumbered.len()
    );
    Ok(outcome)
}

/// Set a track's geometry to the union of its sections
pub fn rebuild_track_geometry<S: Repository>(store: &mut S, track: TrackId) -> Result<()> {
    let mut record: Track = store.require(track)?;
    let sections = store.sections_of(track);
    record.geom = union_lines(sections.iter().map(|s| &s.geom));
    store.put(record);
    Ok(())
}

/// Replace the geometry of one section and rebuild its track
pub fn replace_section_geometry<S: Repository>(
    store: &mut S,
    section: SectionId,
    geom: LineString3,
) -> Result<()> {
    if !geom.is_valid() {
        return Err(NetworkError::Geometry(format!(
            "section {} geometry is not a valid line",
            section
        )));
    }
    let mut record: Section = store.require(section)?;
    let track = record.track;
    record.geom = geom;
    store.put(record);
    rebuild_track_geometry(store, track)
}
