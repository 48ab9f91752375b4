//! Cable geometry from its ordered tubes

use super::legs::{Leg, derive};
use crate::geometry::{JoinStyle, LineGeometry};
use crate::model::{Cable, CableId, Tube};
use crate::ordering::check_contiguous;
use crate::store::Repository;
use crate::{Config, Result};

/// Lateral position of a cable in a tube: slots are centred on the tube axis
#[inline]
pub fn cable_lateral_offset(display_offset: u32, cable_count: usize, spacing: f64) -> f64 {
    let centre = (cable_count.max(1) as f64 - 1.0) / 2.0;
    (f64::from(display_offset) - centre) * spacing
}

/// Derive the geometry of `cable` from the geometries of its tubes
///
/// Each tube contributes its parts, shifted sideways by the cable's slot and applied with bevel
/// joins. The result is planar, every height is zero. Tubes without a geometry are skipped, and a cable with no
/// usable tube has no geometry.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn cable_geometry<S: Repository>(
    store: &S,
    cable: CableId,
    config: &Config,
) -> Result<Option<LineGeometry>> {
    let _: Cable = store.require(cable)?;
    let memberships = store.cable_tubes_of(cable);
    check_contiguous(&memberships)?;
    if memberships.is_empty() {
        return Ok(None);
    }

    let mut legs = Vec::new();
    for membership in &memberships {
        let tube: Tube = store.require(membership.tube)?;
        let Some(geom) = tube.geom else {
            tracing::debug!("Cable {} skips tube {} without geometry", cable, tube.id);
            continue;
        };
        let cable_count = store.cable_tubes_on(tube.id).len();
        let lateral =
            cable_lateral_offset(membership.display_offset, cable_count, config.cable_spacing);
        // Cables are planar: the tube is flattened before offsetting, ends included
        legs.extend(geom.parts().iter().map(|part| Leg {
            geom: part.flattened(),
            lateral: (lateral, lateral),
            vertical: (0.0, 0.0),
        }));
    }

    if legs.is_empty() {
        tracing::warn!("Cable {} goes through no tube with a geometry", cable);
        return Ok(None);
    }
    Ok(derive(legs, JoinStyle::Bevel, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkError;
    use crate::geometry::{Coord3, LineString3};
    use crate::model::{CableAttributes, CableTube, CableTubeId, TubeAttributes, TubeId};
    use crate::store::{MemoryStore, Store};

    fn tube_with(store: &mut MemoryStore, geom: Option<LineGeometry>) -> TubeId {
        let mut tube = Tube::new(TubeAttributes::default());
        tube.geom = geom;
        let id = tube.id;
        store.put(tube);
        id
    }

    fn cable_through(store: &mut MemoryStore, tubes: &[(TubeId, u32)]) -> CableId {
        let cable = Cable::new(CableAttributes::default());
        let id = cable.id;
        store.put(cable);
        for (order_index, (tube, display_offset)) in tubes.iter().enumerate() {
            store.put(CableTube {
                id: CableTubeId::new(),
                tube: *tube,
                cable: id,
                order_index: order_index as u32,
                display_offset: *display_offset,
            });
        }
        id
    }

    fn straight(from: f64, to: f64, z: f64) -> LineGeometry {
        LineGeometry::Line(
            vec![(from, 0.0, z), ((from + to) / 2.0, 0.0, z), (to, 0.0, z)]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_cable_lateral_offset() {
        assert_eq!(cable_lateral_offset(0, 1, 0.1), 0.0);
        assert!((cable_lateral_offset(0, 3, 0.1) + 0.1).abs() < 1e-12);
        assert!((cable_lateral_offset(2, 3, 0.1) - 0.1).abs() < 1e-12);
        assert!((cable_lateral_offset(1, 2, 0.1) - 0.05).abs() < 1e-12);
        // A gap left by a removed cable shifts the remaining slots
        assert!((cable_lateral_offset(2, 2, 0.1) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_cables_share_a_tube() {
        let mut store = MemoryStore::default();
        let tube = tube_with(&mut store, Some(straight(0.0, 20.0, -1.0)));
        let first = cable_through(&mut store, &[(tube, 0)]);
        let second = cable_through(&mut store, &[(tube, 1)]);
        let config = Config::default();

        let y_of = |cable| {
            let geom = cable_geometry(&store, cable, &config).unwrap().unwrap();
            let line = geom.as_line().cloned().unwrap_or_default();
            assert_eq!(line.first(), Some(&Coord3::new(0.0, 0.0, 0.0)));
            assert_eq!(line.last(), Some(&Coord3::new(20.0, 0.0, 0.0)));
            assert!(line.coords().iter().all(|c| c.z == 0.0));
            line.coords()[1..line.len() - 1]
                .iter()
                .map(|c| c.y)
                .collect::<Vec<_>>()
        };

        assert!(y_of(first).iter().all(|y| (y + 0.05).abs() < 1e-9));
        assert!(y_of(second).iter().all(|y| (y - 0.05).abs() < 1e-9));
    }

    #[test]
    fn test_cable_through_consecutive_tubes() {
        let mut store = MemoryStore::default();
        let a = tube_with(&mut store, Some(straight(0.0, 10.0, 0.0)));
        let b = tube_with(&mut store, Some(straight(10.0, 20.0, 0.0)));
        let cable = cable_through(&mut store, &[(a, 0), (b, 0)]);

        let geom = cable_geometry(&store, cable, &Config::default()).unwrap().unwrap();
        let line: &LineString3 = geom.as_line().unwrap();
        assert_eq!(line.first().map(|c| c.x), Some(0.0));
        assert_eq!(line.last().map(|c| c.x), Some(20.0));
        assert!(line.coords().iter().all(|c| c.y.abs() < 1e-9));
    }

    #[test]
    fn test_cable_without_tube_geometry() {
        let mut store = MemoryStore::default();
        let empty = cable_through(&mut store, &[]);
        assert_eq!(cable_geometry(&store, empty, &Config::default()).unwrap(), None);

        let tube = tube_with(&mut store, None);
        let cable = cable_through(&mut store, &[(tube, 0)]);
        assert_eq!(cable_geometry(&store, cable, &Config::default()).unwrap(), None);

        let dangling = cable_through(&mut store, &[(TubeId::new(), 0)]);
        assert!(matches!(
            cable_geometry(&store, dangling, &Config::default()),
            Err(NetworkError::Referential { kind: "Tube", .. })
        ));
    }
}
