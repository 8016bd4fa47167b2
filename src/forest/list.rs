use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use crate::broadcast::Listener;
use crate::broadcast::ListenerId;
use crate::broadcast::deliver;
use crate::document::Document;
use crate::error::Error;
use crate::error::Result;
use crate::refcount;
use crate::refcount::Owner;

use super::Doomed;
use super::Event;
use super::Forest;
use super::ListId;
use super::ListenerSet;
use super::LiveIterator;
use super::NodeId;
use super::NodeRef;

/// A counted handle to a list of nodes.
///
/// A list is either a root made by [`Forest::make_list`] or the derivative
/// list of some node, reached through [`NodeRef::derived_models`].
pub struct ListRef {
    pub(crate) forest: Forest,
    pub(crate) id: ListId,
}

impl ListRef {
    pub(crate) fn acquire(forest: Forest, id: ListId) -> ListRef {
        forest.acquire(Owner::List(id));
        return ListRef { forest, id };
    }

    pub fn id(&self) -> ListId {
        return self.id;
    }

    pub fn forest(&self) -> &Forest {
        return &self.forest;
    }

    pub fn ref_count(&self) -> usize {
        return self.forest.arena().list(self.id).refcount;
    }

    pub fn is_root(&self) -> bool {
        return self.forest.arena().list(self.id).parent_node.is_none();
    }

    /// The node whose derivatives this list holds.
    pub fn parent_node(&self) -> Option<NodeRef> {
        let node = self.forest.arena().list(self.id).parent_node?;
        return Some(NodeRef::acquire(self.forest.clone(), node));
    }

    pub fn len(&self) -> usize {
        return self.forest.arena().list(self.id).nodes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        if !self.forest.same_forest(&node.forest) {
            return false;
        }
        return self.forest.arena().list(self.id).nodes.contains(&node.id);
    }

    /// Number of live iterators currently walking this list.
    pub fn live_iterator_count(&self) -> usize {
        return self.forest.arena().list(self.id).cursors.len();
    }

    /// Create a new root node holding `document`. The node is not attached
    /// to this list.
    pub fn make_node(&self, document: Option<Rc<dyn Document>>) -> Result<NodeRef> {
        let document = document.ok_or(Error::NullDocument)?;
        return Ok(self.forest.create_node(document));
    }

    /// Append a root node to this list.
    pub fn add_model(&self, node: &NodeRef) -> Result<()> {
        if !self.forest.same_forest(&node.forest) {
            return Err(Error::ForeignNode);
        }

        {
            let mut arena = self.forest.arena_mut();
            if arena.node(node.id).parent_list.is_some() {
                return Err(Error::NotRoot);
            }
            if arena.list_is_below(self.id, node.id) {
                return Err(Error::OwnershipCycle);
            }

            arena.list_mut(self.id).nodes.push(node.id);
            arena.node_mut(node.id).parent_list = Some(self.id);
            refcount::attach(&mut *arena, Owner::Node(node.id), Owner::List(self.id));
        }
        tracing::debug!(list = ?self.id, node = ?node.id, "attached node");

        self.notify_structure(|depth| Event::ModelAdded { node: node.clone(), depth });
        return Ok(());
    }

    /// Detach `node` from this list. The node becomes a root again and
    /// survives for as long as handles to it remain.
    ///
    /// Listeners hear about the removal while the node is still attached.
    /// Listeners are told even when the node is not in this list; nothing
    /// is unlinked in that case.
    pub fn remove_model(&self, node: &NodeRef) -> Result<()> {
        if !self.forest.same_forest(&node.forest) {
            return Err(Error::ForeignNode);
        }
        self.notify_structure(|depth| Event::ModelRemoved { node: node.clone(), depth });

        let mut doomed = Doomed::default();
        {
            let mut arena = self.forest.arena_mut();
            // Not a member, or a listener already moved it.
            let list = arena.list_mut(self.id);
            let Some(index) = list.nodes.iter().position(|id| *id == node.id) else {
                return Ok(());
            };
            list.cursors.removed_at(index);
            list.nodes.remove(index);
            arena.node_mut(node.id).parent_list = None;

            if let Some(root) = refcount::detach(&mut *arena, Owner::Node(node.id), Owner::List(self.id)) {
                arena.destroy(root, &mut doomed);
            }
        }
        doomed.finish();
        tracing::debug!(list = ?self.id, node = ?node.id, "detached node");
        return Ok(());
    }

    /// Walk the nodes of this list. The iterator tolerates the list being
    /// changed underneath it.
    pub fn iter_models(&self) -> LiveIterator {
        return LiveIterator::new(self.clone());
    }

    /// Listen for node events from every node anywhere below this list.
    pub fn add_node_listener(&self, listener: Rc<dyn Listener<Event>>) -> ListenerId {
        return self.forest.arena_mut().list_mut(self.id).node_listeners.register(listener);
    }

    pub fn remove_node_listener(&self, id: ListenerId) -> bool {
        return self.forest.unregister(ListenerSet::NodesOf(self.id), id);
    }

    /// Listen for nodes being added to or removed from this list or any list
    /// below it.
    pub fn add_list_listener(&self, listener: Rc<dyn Listener<Event>>) -> ListenerId {
        return self.forest.arena_mut().list_mut(self.id).list_listeners.register(listener);
    }

    pub fn remove_list_listener(&self, id: ListenerId) -> bool {
        return self.forest.unregister(ListenerSet::ListOf(self.id), id);
    }

    /// Deliver a structural event to this list's listeners at depth 0, then
    /// to each ancestor list's listeners with the depth raised by one per
    /// level.
    fn notify_structure(&self, event_at: impl Fn(u32) -> Event) {
        let forest = &self.forest;
        let mut depth = 0;
        let mut current = Some(self.id);
        while let Some(list) = current {
            let snapshot = forest.arena().listeners(ListenerSet::ListOf(list)).map(|set| set.snapshot());
            let Some(snapshot) = snapshot else {
                break;
            };
            if !snapshot.is_empty() {
                let event = event_at(depth);
                deliver(&snapshot, &event, |listener| {
                    forest.unregister(ListenerSet::ListOf(list), listener);
                });
            }
            current = forest.arena().grandparent_list(list);
            depth += 1;
        }
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<NodeId> {
        return self.forest.arena().list(self.id).nodes.get(index).copied();
    }
}

impl Clone for ListRef {
    fn clone(&self) -> ListRef {
        return ListRef::acquire(self.forest.clone(), self.id);
    }
}

impl Drop for ListRef {
    fn drop(&mut self) {
        self.forest.release(Owner::List(self.id));
    }
}

impl PartialEq for ListRef {
    fn eq(&self, other: &ListRef) -> bool {
        return self.id == other.id && self.forest.same_forest(&other.forest);
    }
}

impl Eq for ListRef {}

impl Hash for ListRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ListRef({})", self.id.0);
    }
}
