//! Contiguous `order_index` sequences and display-offset slots
//!
//! Sections of a track, memberships of a tube and memberships of a cable are each numbered
//! `0..n` under their parent. Everything here writes through the store it is given, so callers
//! run it inside a transaction: intermediate states with duplicated or missing indices are never
//! visible outside.

use crate::model::{Cable, CableTube, Entity, Id, Section, Track, Tube, TubeId, TubeSection};
use crate::store::{Repository, Store};
use crate::{NetworkError, Result};
use std::collections::BTreeSet;

/// A child entity ordered among its siblings under one parent
pub trait OrderedChild: Entity {
    type Parent: Entity;

    fn parent(&self) -> Id<Self::Parent>;

    fn order_index(&self) -> u32;

    fn set_order_index(&mut self, order_index: u32);

    /// All children of `parent` ordered by `order_index`
    fn siblings<S: Repository>(store: &S, parent: Id<Self::Parent>) -> Vec<Self>;
}

impl OrderedChild for Section {
    type Parent = Track;

    fn parent(&self) -> Id<Track> {
        self.track
    }

    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: u32) {
        self.order_index = order_index;
    }

    fn siblings<S: Repository>(store: &S, parent: Id<Track>) -> Vec<Self> {
        store.sections_of(parent)
    }
}

impl OrderedChild for TubeSection {
    type Parent = Tube;

    fn parent(&self) -> Id<Tube> {
        self.tube
    }

    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: u32) {
        self.order_index = order_index;
    }

    fn siblings<S: Repository>(store: &S, parent: Id<Tube>) -> Vec<Self> {
        store.tube_sections_of(parent)
    }
}

impl OrderedChild for CableTube {
    type Parent = Cable;

    fn parent(&self) -> Id<Cable> {
        self.cable
    }

    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: u32) {
        self.order_index = order_index;
    }

    fn siblings<S: Repository>(store: &S, parent: Id<Cable>) -> Vec<Self> {
        store.cable_tubes_of(parent)
    }
}

/// Fail unless the children's indices are exactly `0..n`
pub fn check_contiguous<C: OrderedChild>(children: &[C]) -> Result<()> {
    let mut indices: Vec<u32> = children.iter().map(OrderedChild::order_index).collect();
    indices.sort_unstable();
    for (expected, actual) in indices.into_iter().enumerate() {
        if actual as usize != expected {
            let problem = if (actual as usize) < expected {
                "duplicate"
            } else {
                "gap"
            };
            return Err(NetworkError::InvariantViolation(format!(
                "{} order_index {} at position {} ({})",
                C::KIND,
                actual,
                expected,
                problem
            )));
        }
    }
    Ok(())
}

/// Renumber the children of `parent` `0..n` in the order given by `order`
///
/// `order` must list every current child exactly once.
pub fn reindex<S, C>(store: &mut S, parent: Id<C::Parent>, order: &[Id<C>]) -> Result<()>
where
    S: Repository + Store<C>,
    C: OrderedChild,
{
    let current: BTreeSet<Id<C>> = C::siblings(&*store, parent)
        .iter()
        .map(Entity::id)
        .collect();
    let requested: BTreeSet<Id<C>> = order.iter().copied().collect();
    if requested.len() != order.len() || requested != current {
        return Err(NetworkError::InvariantViolation(format!(
            "reorder of {} under {} {} is not a permutation of its {} children",
            C::KIND,
            <C::Parent as Entity>::KIND,
            parent,
            current.len()
        )));
    }

    for (order_index, id) in order.iter().enumerate() {
        let mut child = Store::<C>::require(&*store, *id)?;
        if child.order_index() != order_index as u32 {
            child.set_order_index(order_index as u32);
            Store::<C>::put(store, child);
        }
    }
    Ok(())
}

/// Delete a child and close the gap it leaves, shifting the following children down by one
///
/// The siblings are checked before anything is written: a sequence that is already broken is
/// reported, not renumbered.
pub fn remove_child<S, C>(store: &mut S, id: Id<C>) -> Result<C>
where
    S: Repository + Store<C>,
    C: OrderedChild,
{
    let child = Store::<C>::require(&*store, id)?;
    let siblings = C::siblings(&*store, child.parent());
    check_contiguous(&siblings)?;

    Store::<C>::delete(store, id);
    for mut sibling in siblings {
        if sibling.order_index() > child.order_index() {
            sibling.set_order_index(sibling.order_index() - 1);
            Store::<C>::put(store, sibling);
        }
    }
    Ok(child)
}

/// Index for a new child inserted at `position`, shifting the following children up by one
///
/// Positions past the end append.
pub fn make_room<S, C>(store: &mut S, parent: Id<C::Parent>, position: u32) -> Result<u32>
where
    S: Repository + Store<C>,
    C: OrderedChild,
{
    let siblings = C::siblings(&*store, parent);
    check_contiguous(&siblings)?;
    let position = position.min(siblings.len() as u32);
    for mut child in siblings.into_iter().rev() {
        if child.order_index() < position {
            break;
        }
        child.set_order_index(child.order_index() + 1);
        Store::<C>::put(store, child);
    }
    Ok(position)
}

/// Index for a new child appended after the current last one
pub fn next_order_index<S, C>(store: &S, parent: Id<C::Parent>) -> Result<u32>
where
    S: Repository,
    C: OrderedChild,
{
    let siblings = C::siblings(&*store, parent);
    check_contiguous(&siblings)?;
    Ok(siblings.len() as u32)
}

/// Next free lateral slot in a tube: one past the highest used, `0` for an empty tube
///
/// Slots freed by removed cables are not reused.
pub fn next_display_offset<S: Repository>(store: &S, tube: TubeId) -> u32 {
    store
        .cable_tubes_on(tube)
        .iter()
        .map(|ct| ct.display_offset)
        .max()
        .map_or(0, |max| max + 1)
}
