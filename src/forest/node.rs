use std::any::Any;
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
use crate::refcount::Owner;

use super::DirtyMarker;
use super::Event;
use super::Forest;
use super::ListRef;
use super::ListenerSet;
use super::NodeId;

/// A counted handle to a node.
///
/// Holding one keeps the node, and every list and node above it, alive.
/// Cloning acquires another reference; dropping releases it.
pub struct NodeRef {
    pub(crate) forest: Forest,
    pub(crate) id: NodeId,
}

impl NodeRef {
    pub(crate) fn acquire(forest: Forest, id: NodeId) -> NodeRef {
        forest.acquire(Owner::Node(id));
        return NodeRef { forest, id };
    }

    pub fn id(&self) -> NodeId {
        return self.id;
    }

    pub fn forest(&self) -> &Forest {
        return &self.forest;
    }

    /// The node's local cascading count: handles to it plus everything
    /// counted below it.
    pub fn ref_count(&self) -> usize {
        return self.forest.arena().node(self.id).refcount;
    }

    pub fn is_root(&self) -> bool {
        return self.forest.arena().node(self.id).parent_list.is_none();
    }

    pub fn name(&self) -> String {
        return self.forest.arena().node(self.id).name.clone();
    }

    pub fn rename(&self, name: impl Into<String>) {
        let name = name.into();
        self.forest.arena_mut().node_mut(self.id).name = name.clone();
        self.notify(Event::Renamed { node: self.clone(), name });
    }

    pub fn timestamp(&self) -> u64 {
        return self.forest.arena().node(self.id).timestamp;
    }

    /// Re-stamp the node from the forest clock. Nothing else ever changes the
    /// timestamp.
    pub fn stamp_modified_now(&self) {
        let mut arena = self.forest.arena_mut();
        let now = arena.config.now();
        arena.node_mut(self.id).timestamp = now;
    }

    pub fn is_frozen(&self) -> bool {
        return self.forest.arena().node(self.id).frozen;
    }

    /// Freeze or thaw the node. Setting the current state is a no-op.
    pub fn set_frozen(&self, frozen: bool) {
        {
            let mut arena = self.forest.arena_mut();
            let entry = arena.node_mut(self.id);
            if entry.frozen == frozen {
                return;
            }
            entry.frozen = frozen;
        }
        self.notify(Event::FrozenStateChanged { node: self.clone(), frozen });
    }

    pub fn is_dirty(&self) -> bool {
        return self.forest.arena().node(self.id).dirty;
    }

    /// Set by the document's change notifications; otherwise only changed
    /// through this call. Flushing does not clear it.
    pub fn set_dirty(&self, dirty: bool) {
        self.forest.arena_mut().node_mut(self.id).dirty = dirty;
    }

    pub fn document(&self) -> Rc<dyn Document> {
        return self.forest.arena().node(self.id).document.clone();
    }

    /// Swap in a new document, moving change observation over to it first.
    ///
    /// A document with the same identity as the current one is re-observed
    /// and announced but the existing handle is kept.
    pub fn replace_document(&self, document: Option<Rc<dyn Document>>) -> Result<()> {
        let document = document.ok_or(Error::NullDocument)?;

        let (current, token) = {
            let arena = self.forest.arena();
            let entry = arena.node(self.id);
            (entry.document.clone(), entry.subscription)
        };
        if let Some(token) = token {
            current.unsubscribe(token);
        }
        let token = document.subscribe(Box::new(DirtyMarker::new(&self.forest, self.id)));

        let replaced = {
            let mut arena = self.forest.arena_mut();
            let entry = arena.node_mut(self.id);
            entry.subscription = Some(token);
            if entry.document.id() != document.id() {
                Some(std::mem::replace(&mut entry.document, document.clone()))
            } else {
                None
            }
        };
        drop(replaced);
        drop(current);

        tracing::debug!(node = ?self.id, document = ?document.id(), "replaced document");
        self.notify(Event::DocumentReplaced { node: self.clone(), document });
        return Ok(());
    }

    pub fn owner(&self) -> Option<Rc<dyn Any>> {
        return self.forest.arena().node(self.id).owner.clone();
    }

    /// Attach an arbitrary owner object. The node holds it but it is not
    /// part of the ownership tree.
    pub fn set_owner(&self, owner: Option<Rc<dyn Any>>) {
        let previous = std::mem::replace(&mut self.forest.arena_mut().node_mut(self.id).owner, owner.clone());
        drop(previous);
        self.notify(Event::OwnerChanged { node: self.clone(), owner });
    }

    /// Announce that pending changes have been written out.
    pub fn flush_changes(&self) {
        self.notify(Event::ChangesFlushed { node: self.clone() });
    }

    /// The list of nodes derived from this one.
    pub fn derived_models(&self) -> ListRef {
        let list = self.forest.arena().node(self.id).child_list;
        return ListRef::acquire(self.forest.clone(), list);
    }

    /// The list this node is attached to, or `None` for a root.
    pub fn parent_list(&self) -> Option<ListRef> {
        let list = self.forest.arena().node(self.id).parent_list?;
        return Some(ListRef::acquire(self.forest.clone(), list));
    }

    pub fn add_listener(&self, listener: Rc<dyn Listener<Event>>) -> ListenerId {
        return self.forest.arena_mut().node_mut(self.id).listeners.register(listener);
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        return self.forest.unregister(ListenerSet::Node(self.id), id);
    }

    /// A node that may be modified.
    ///
    /// An unfrozen node is returned as is. A frozen node has its document
    /// cloned into a new node, which is attached beneath it as a derivative
    /// and returned.
    pub fn get_writable(&self) -> Result<NodeRef> {
        if !self.is_frozen() {
            return Ok(self.clone());
        }

        let copy = self.document().clone_document().ok_or(Error::CloneFailed)?;
        let derivatives = self.derived_models();
        let derivative = derivatives.make_node(Some(copy))?;
        derivatives.add_model(&derivative)?;
        tracing::debug!(frozen = ?self.id, derivative = ?derivative.id, "created writable derivative");
        return Ok(derivative);
    }

    /// The most recently stamped node among this one and all of its
    /// derivatives, at any depth.
    ///
    /// Candidates are compared with a strict greater-than, so on equal
    /// timestamps the one met first in iteration order wins, and this node
    /// wins over any derivative stamped at the same time.
    pub fn latest_derivative(&self) -> NodeRef {
        let mut best = self.clone();
        let mut best_stamp = self.timestamp();

        for child in self.derived_models().iter_models() {
            let candidate = child.latest_derivative();
            let stamp = candidate.timestamp();
            if stamp > best_stamp {
                best_stamp = stamp;
                best = candidate;
            }
        }
        return best;
    }

    /// Deliver a node event to this node's listeners, then to the
    /// node-listener set of every list above it.
    fn notify(&self, event: Event) {
        let forest = &self.forest;

        let snapshot = forest.arena().listeners(ListenerSet::Node(self.id)).map(|set| set.snapshot());
        if let Some(snapshot) = snapshot {
            deliver(&snapshot, &event, |listener| {
                forest.unregister(ListenerSet::Node(self.id), listener);
            });
        }

        let mut current = forest.arena().nodes.get(&self.id).and_then(|entry| entry.parent_list);
        while let Some(list) = current {
            let snapshot = forest.arena().listeners(ListenerSet::NodesOf(list)).map(|set| set.snapshot());
            let Some(snapshot) = snapshot else {
                break;
            };
            deliver(&snapshot, &event, |listener| {
                forest.unregister(ListenerSet::NodesOf(list), listener);
            });
            current = forest.arena().grandparent_list(list);
        }
    }
}

impl Clone for NodeRef {
    fn clone(&self) -> NodeRef {
        return NodeRef::acquire(self.forest.clone(), self.id);
    }
}

impl Drop for NodeRef {
    fn drop(&mut self) {
        self.forest.release(Owner::Node(self.id));
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &NodeRef) -> bool {
        return self.id == other.id && self.forest.same_forest(&other.forest);
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "NodeRef({})", self.id.0);
    }
}
