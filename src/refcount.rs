//! Cascading reference counts.
//!
//! Nodes own lists and lists own nodes, so an ownership chain alternates
//! between the two. Every entry keeps a local count, and every change to that
//! count is mirrored onto each ancestor up to the nearest root. The root's
//! count is therefore the number of outstanding handles anywhere in its tree,
//! and the tree dies with it.
//!
//! The functions here only walk parent links; they never free anything. When
//! a release leaves a root at zero the root is handed back to the caller,
//! which is responsible for destroying it exactly once.

use crate::forest::ListId;
use crate::forest::NodeId;

/// Something that carries a cascading count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Node(NodeId),
    List(ListId),
}

/// Storage that can answer "who is my parent" and hand out counts.
pub(crate) trait Counted {
    /// The owning parent, or `None` for a root.
    fn parent_of(&self, owner: Owner) -> Option<Owner>;

    /// The local count of `owner`, or `None` if it no longer exists.
    fn count_mut(&mut self, owner: Owner) -> Option<&mut usize>;
}

/// Add `units` to `owner` and to every ancestor above it.
pub(crate) fn acquire<C: Counted>(store: &mut C, owner: Owner, units: usize) {
    let mut current = Some(owner);
    while let Some(entry) = current {
        let Some(count) = store.count_mut(entry) else {
            tracing::warn!(?entry, "acquire reached a missing entry");
            return;
        };
        *count += units;
        current = store.parent_of(entry);
    }
}

/// Remove `units` from `owner` and every ancestor above it.
///
/// Returns the root of the chain if its count reached zero.
pub(crate) fn release<C: Counted>(store: &mut C, owner: Owner, units: usize) -> Option<Owner> {
    let mut current = owner;
    loop {
        let Some(count) = store.count_mut(current) else {
            tracing::warn!(entry = ?current, "release reached a missing entry");
            return None;
        };
        debug_assert!(*count >= units, "released {:?} below zero", current);
        *count = count.saturating_sub(units);
        let remaining = *count;
        match store.parent_of(current) {
            Some(parent) => current = parent,
            None => {
                if remaining == 0 {
                    return Some(current);
                }
                return None;
            }
        }
    }
}

/// Replay the whole local count of `child` onto `parent` in one step.
///
/// The caller must already have linked `child` beneath `parent`.
pub(crate) fn attach<C: Counted>(store: &mut C, child: Owner, parent: Owner) {
    let units = store.count_mut(child).map_or(0, |count| *count);
    tracing::trace!(?child, ?parent, units, "cascading count onto new parent");
    if units > 0 {
        acquire(store, parent, units);
    }
}

/// Take the whole local count of `child` back off `former_parent`.
///
/// The caller must already have unlinked `child`. Returns the former root if
/// nothing keeps it alive any more.
pub(crate) fn detach<C: Counted>(store: &mut C, child: Owner, former_parent: Owner) -> Option<Owner> {
    let units = store.count_mut(child).map_or(0, |count| *count);
    tracing::trace!(?child, ?former_parent, units, "withdrawing count from former parent");
    if units == 0 {
        return None;
    }
    return release(store, former_parent, units);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    /// A bare chain: list 0 <- node 1 <- list 2 <- node 3 ...
    #[derive(Default)]
    struct Chain {
        parents: FxHashMap<Owner, Owner>,
        counts: FxHashMap<Owner, usize>,
    }

    impl Chain {
        fn alternating(depth: u64) -> (Chain, Vec<Owner>) {
            let mut chain = Chain::default();
            let mut path = Vec::new();
            for i in 0..depth {
                let owner = if i % 2 == 0 {
                    Owner::List(ListId(i))
                } else {
                    Owner::Node(NodeId(i))
                };
                chain.counts.insert(owner, 0);
                if let Some(&parent) = path.last() {
                    chain.parents.insert(owner, parent);
                }
                path.push(owner);
            }
            return (chain, path);
        }
    }

    impl Counted for Chain {
        fn parent_of(&self, owner: Owner) -> Option<Owner> {
            return self.parents.get(&owner).copied();
        }

        fn count_mut(&mut self, owner: Owner) -> Option<&mut usize> {
            return Some(self.counts.entry(owner).or_insert(0));
        }
    }

    #[test]
    fn acquire_reaches_every_ancestor() {
        let (mut chain, path) = Chain::alternating(5);
        let leaf = *path.last().unwrap();
        acquire(&mut chain, leaf, 3);
        for owner in &path {
            assert_eq!(chain.counts[owner], 3);
        }
    }

    #[test]
    fn acquire_leaves_descendants_alone() {
        let (mut chain, path) = Chain::alternating(4);
        acquire(&mut chain, path[1], 1);
        assert_eq!(chain.counts[&path[0]], 1);
        assert_eq!(chain.counts[&path[1]], 1);
        assert_eq!(chain.counts[&path[2]], 0);
        assert_eq!(chain.counts[&path[3]], 0);
    }

    #[test]
    fn release_reports_dead_root() {
        let (mut chain, path) = Chain::alternating(3);
        acquire(&mut chain, path[2], 2);
        assert_eq!(release(&mut chain, path[2], 1), None);
        assert_eq!(release(&mut chain, path[2], 1), Some(path[0]));
    }

    #[test]
    fn release_keeps_root_with_other_holders() {
        let (mut chain, path) = Chain::alternating(3);
        acquire(&mut chain, path[0], 1);
        acquire(&mut chain, path[2], 1);
        assert_eq!(release(&mut chain, path[2], 1), None);
        assert_eq!(chain.counts[&path[0]], 1);
    }

    #[test]
    fn attach_then_detach_is_balanced() {
        let (mut chain, path) = Chain::alternating(2);
        let orphan = Owner::Node(NodeId(99));
        acquire(&mut chain, path[0], 1);
        acquire(&mut chain, orphan, 4);

        chain.parents.insert(orphan, path[1]);
        attach(&mut chain, orphan, path[1]);
        assert_eq!(chain.counts[&path[1]], 4);
        assert_eq!(chain.counts[&path[0]], 5);

        chain.parents.remove(&orphan);
        assert_eq!(detach(&mut chain, orphan, path[1]), None);
        assert_eq!(chain.counts[&path[1]], 0);
        assert_eq!(chain.counts[&path[0]], 1);
        assert_eq!(chain.counts[&orphan], 4);
    }

    #[test]
    fn detach_of_last_holder_frees_former_root() {
        let (mut chain, path) = Chain::alternating(2);
        let orphan = Owner::Node(NodeId(7));
        acquire(&mut chain, orphan, 1);
        chain.parents.insert(orphan, path[1]);
        attach(&mut chain, orphan, path[1]);

        chain.parents.remove(&orphan);
        assert_eq!(detach(&mut chain, orphan, path[1]), Some(path[0]));
    }

    #[test]
    fn detach_of_unreferenced_child_is_silent() {
        let (mut chain, path) = Chain::alternating(2);
        let orphan = Owner::Node(NodeId(8));
        assert_eq!(detach(&mut chain, orphan, path[1]), None);
    }
}
