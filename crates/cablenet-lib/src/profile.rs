//! Cross-section view of the tubes laid along one section

use crate::model::{Cable, CableId, Section, SectionId, Tube, TubeId};
use crate::store::Repository;
use crate::{Offsets, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean position of a tube in the section's cross-section, in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfilePosition {
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableProfile {
    pub id: CableId,
    pub identifier: Option<String>,
    pub display_offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TubeProfile {
    pub id: TubeId,
    pub diameter: Option<u32>,
    pub pos: ProfilePosition,
    pub offsets: Offsets,
    /// Cables in the tube ordered by display offset
    pub cables: Vec<CableProfile>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectionProfile {
    pub section: SectionId,
    /// Tubes from left to right, then bottom to top
    pub tubes: Vec<TubeProfile>,
}

/// Tubes and cables crossing `section`, with their offsets
pub fn section_profile<S: Repository>(store: &S, section: SectionId) -> Result<SectionProfile> {
    let _: Section = store.require(section)?;

    let mut tubes = Vec::new();
    for membership in store.tube_sections_on(section) {
        let tube: Tube = store.require(membership.tube)?;
        let offsets = membership.offsets;

        let mut cables = Vec::new();
        for cable_tube in store.cable_tubes_on(tube.id) {
            let cable: Cable = store.require(cable_tube.cable)?;
            cables.push(CableProfile {
                id: cable.id,
                identifier: cable.identifier,
                display_offset: cable_tube.display_offset,
            });
        }

        tubes.push(TubeProfile {
            id: tube.id,
            diameter: tube.diameter,
            pos: ProfilePosition {
                x: f64::from(offsets.offset_x + offsets.end_x()) / 2.0,
                z: f64::from(offsets.offset_z + offsets.end_z()) / 2.0,
            },
            offsets,
            cables,
        });
    }

    tubes.sort_by(|a, b| {
        a.pos
            .x
            .total_cmp(&b.pos.x)
            .then(a.pos.z.total_cmp(&b.pos.z))
            .then(a.id.cmp(&b.id))
    });

    Ok(SectionProfile { section, tubes })
}
