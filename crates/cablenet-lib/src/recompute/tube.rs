//! Tube geometry from its ordered sections

use super::legs::{Leg, derive};
use crate::geometry::{JoinStyle, LineGeometry};
use crate::model::{Section, Tube, TubeId};
use crate::ordering::check_contiguous;
use crate::store::Repository;
use crate::utils::mm_to_units;
use crate::{Config, Result};

/// Derive the geometry of `tube` from its sections and offsets
///
/// Offsets are converted from millimetres to local units and applied with mitre joins. A tube
/// without sections has no geometry.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn tube_geometry<S: Repository>(
    store: &S,
    tube: TubeId,
    config: &Config,
) -> Result<Option<LineGeometry>> {
    let _: Tube = store.require(tube)?;
    let memberships = store.tube_sections_of(tube);
    check_contiguous(&memberships)?;
    if memberships.is_empty() {
        return Ok(None);
    }

    let mm = |value: i32| mm_to_units(value, config.millimetres_per_unit);
    let mut legs = Vec::with_capacity(memberships.len());
    for membership in &memberships {
        let section: Section = store.require(membership.section)?;
        let offsets = membership.offsets;
        legs.push(Leg {
            geom: section.geom,
            lateral: (mm(offsets.offset_x), mm(offsets.end_x())),
            vertical: (mm(offsets.offset_z), mm(offsets.end_z())),
        });
    }

    let geom = derive(legs, JoinStyle::Mitre, config);
    if geom.is_none() {
        tracing::warn!(
            "Tube {} has {} sections but no valid geometry",
            tube,
            memberships.len()
        );
    }
    Ok(geom)
}
