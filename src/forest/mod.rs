//! The ownership tree.
//!
//! A forest is an arena of nodes and lists. Each node holds one document and
//! owns a list of its derivatives; each list owns an ordered run of nodes. A
//! list made with [`Forest::make_list`] is a root, as is a node that has not
//! been attached anywhere.
//!
//! Callers never touch entries directly. They hold [`NodeRef`] and
//! [`ListRef`] handles, and every handle is one unit of a cascading count
//! (see [`crate::refcount`]). A handle anywhere in a tree keeps every ancestor
//! up to its root alive; when the root's count falls to zero the root and
//! everything it owns are destroyed together.
//!
//! The arena is only borrowed for the duration of a single bookkeeping step.
//! Listener delivery, document calls, and drops of anything that might hold a
//! handle all happen with the arena released, so callbacks may freely call
//! back into the forest.

mod event;
mod iter;
mod list;
mod node;

use std::any::Any;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::fmt;
use std::rc::Rc;
use std::rc::Weak;

use rustc_hash::FxHashMap;

use crate::broadcast::Broadcaster;
use crate::broadcast::ListenerId;
use crate::config::ForestConfig;
use crate::cursor::Cursors;
use crate::document::ChangeObserver;
use crate::document::Document;
use crate::document::SubscriptionToken;
use crate::refcount;
use crate::refcount::Counted;
use crate::refcount::Owner;

pub use event::Event;
pub use event::EventKind;
pub use iter::LiveIterator;
pub use list::ListRef;
pub use node::NodeRef;

/// Identity of a node within its forest. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// Identity of a list within its forest. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub(crate) u64);

pub(crate) struct NodeEntry {
    pub(crate) document: Rc<dyn Document>,
    pub(crate) subscription: Option<SubscriptionToken>,
    pub(crate) name: String,
    pub(crate) timestamp: u64,
    pub(crate) frozen: bool,
    pub(crate) dirty: bool,
    pub(crate) owner: Option<Rc<dyn Any>>,
    pub(crate) child_list: ListId,
    pub(crate) parent_list: Option<ListId>,
    pub(crate) refcount: usize,
    pub(crate) listeners: Broadcaster<Event>,
}

pub(crate) struct ListEntry {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) parent_node: Option<NodeId>,
    pub(crate) node_listeners: Broadcaster<Event>,
    pub(crate) list_listeners: Broadcaster<Event>,
    pub(crate) cursors: Cursors,
    pub(crate) refcount: usize,
}

impl ListEntry {
    fn new(parent_node: Option<NodeId>) -> ListEntry {
        return ListEntry {
            nodes: Vec::new(),
            parent_node,
            node_listeners: Broadcaster::new(),
            list_listeners: Broadcaster::new(),
            cursors: Cursors::default(),
            refcount: 0,
        };
    }
}

/// Which listener set an operation targets.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ListenerSet {
    /// Listeners on a node itself.
    Node(NodeId),
    /// Node-event listeners on a list; they hear about every node below it.
    NodesOf(ListId),
    /// Structural listeners on a list.
    ListOf(ListId),
}

pub(crate) struct Arena {
    pub(crate) nodes: FxHashMap<NodeId, NodeEntry>,
    pub(crate) lists: FxHashMap<ListId, ListEntry>,
    pub(crate) config: ForestConfig,
    next_id: u64,
}

impl Arena {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        return id;
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeEntry {
        match self.nodes.get(&id) {
            Some(entry) => return entry,
            None => panic!("node {:?} is not alive", id),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeEntry {
        match self.nodes.get_mut(&id) {
            Some(entry) => return entry,
            None => panic!("node {:?} is not alive", id),
        }
    }

    pub(crate) fn list(&self, id: ListId) -> &ListEntry {
        match self.lists.get(&id) {
            Some(entry) => return entry,
            None => panic!("list {:?} is not alive", id),
        }
    }

    pub(crate) fn list_mut(&mut self, id: ListId) -> &mut ListEntry {
        match self.lists.get_mut(&id) {
            Some(entry) => return entry,
            None => panic!("list {:?} is not alive", id),
        }
    }

    /// The list one ownership level above `list`, if any.
    pub(crate) fn grandparent_list(&self, list: ListId) -> Option<ListId> {
        let parent = self.lists.get(&list)?.parent_node?;
        return self.nodes.get(&parent)?.parent_list;
    }

    /// Whether `list` sits somewhere inside the subtree owned by `node`.
    pub(crate) fn list_is_below(&self, list: ListId, node: NodeId) -> bool {
        let mut current = Some(list);
        while let Some(list) = current {
            match self.lists.get(&list).and_then(|entry| entry.parent_node) {
                Some(parent) if parent == node => return true,
                Some(parent) => current = self.nodes.get(&parent).and_then(|entry| entry.parent_list),
                None => return false,
            }
        }
        return false;
    }

    fn listeners_mut(&mut self, set: ListenerSet) -> Option<&mut Broadcaster<Event>> {
        return match set {
            ListenerSet::Node(id) => self.nodes.get_mut(&id).map(|entry| &mut entry.listeners),
            ListenerSet::NodesOf(id) => self.lists.get_mut(&id).map(|entry| &mut entry.node_listeners),
            ListenerSet::ListOf(id) => self.lists.get_mut(&id).map(|entry| &mut entry.list_listeners),
        };
    }

    pub(crate) fn listeners(&self, set: ListenerSet) -> Option<&Broadcaster<Event>> {
        return match set {
            ListenerSet::Node(id) => self.nodes.get(&id).map(|entry| &entry.listeners),
            ListenerSet::NodesOf(id) => self.lists.get(&id).map(|entry| &entry.node_listeners),
            ListenerSet::ListOf(id) => self.lists.get(&id).map(|entry| &entry.list_listeners),
        };
    }

    /// Unlink `root` and everything it owns from the arena.
    ///
    /// Nothing is dropped here; the entries move into `doomed` so that their
    /// destructors run after the arena borrow ends.
    pub(crate) fn destroy(&mut self, root: Owner, doomed: &mut Doomed) {
        tracing::debug!(?root, "destroying unreferenced root");
        let mut pending = vec![root];
        while let Some(owner) = pending.pop() {
            match owner {
                Owner::Node(id) => {
                    if let Some(entry) = self.nodes.remove(&id) {
                        pending.push(Owner::List(entry.child_list));
                        doomed.nodes.push(entry);
                    }
                }
                Owner::List(id) => {
                    if let Some(entry) = self.lists.remove(&id) {
                        pending.extend(entry.nodes.iter().map(|node| Owner::Node(*node)));
                        doomed.lists.push(entry);
                    }
                }
            }
        }
    }
}

impl Counted for Arena {
    fn parent_of(&self, owner: Owner) -> Option<Owner> {
        return match owner {
            Owner::Node(id) => self.nodes.get(&id)?.parent_list.map(Owner::List),
            Owner::List(id) => self.lists.get(&id)?.parent_node.map(Owner::Node),
        };
    }

    fn count_mut(&mut self, owner: Owner) -> Option<&mut usize> {
        return match owner {
            Owner::Node(id) => self.nodes.get_mut(&id).map(|entry| &mut entry.refcount),
            Owner::List(id) => self.lists.get_mut(&id).map(|entry| &mut entry.refcount),
        };
    }
}

/// Entries removed from the arena, waiting to be torn down.
#[derive(Default)]
pub(crate) struct Doomed {
    nodes: Vec<NodeEntry>,
    lists: Vec<ListEntry>,
}

impl Doomed {
    /// Unsubscribe from documents and drop everything. Must be called with
    /// the arena released.
    pub(crate) fn finish(self) {
        for node in &self.nodes {
            if let Some(token) = node.subscription {
                node.document.unsubscribe(token);
            }
        }
        if !self.nodes.is_empty() || !self.lists.is_empty() {
            tracing::debug!(nodes = self.nodes.len(), lists = self.lists.len(), "destroyed subtree");
        }
    }
}

/// The non-owning observation a node places on its own document.
///
/// It holds no count on the node and no strong reference to the forest, so a
/// document never keeps its node alive. A notification for a node that has
/// since been destroyed is ignored.
pub(crate) struct DirtyMarker {
    arena: Weak<RefCell<Arena>>,
    node: NodeId,
}

impl DirtyMarker {
    pub(crate) fn new(forest: &Forest, node: NodeId) -> DirtyMarker {
        return DirtyMarker {
            arena: Rc::downgrade(&forest.arena),
            node,
        };
    }
}

impl ChangeObserver for DirtyMarker {
    fn document_changed(&self) {
        let Some(arena) = self.arena.upgrade() else {
            return;
        };
        let Ok(mut guard) = arena.try_borrow_mut() else {
            tracing::warn!(node = ?self.node, "document changed while the forest was mid-update");
            return;
        };
        if let Some(entry) = guard.nodes.get_mut(&self.node) {
            entry.dirty = true;
        }
    }
}

/// A handle to an arena of nodes and lists. Cloning the handle shares the
/// arena.
#[derive(Clone)]
pub struct Forest {
    arena: Rc<RefCell<Arena>>,
}

impl Forest {
    pub fn new() -> Forest {
        return Forest::with_config(ForestConfig::default());
    }

    pub fn with_config(config: ForestConfig) -> Forest {
        let arena = Arena {
            nodes: FxHashMap::default(),
            lists: FxHashMap::default(),
            config,
            next_id: 0,
        };
        return Forest { arena: Rc::new(RefCell::new(arena)) };
    }

    /// Create a new, empty root list.
    pub fn make_list(&self) -> ListRef {
        let id = {
            let mut arena = self.arena_mut();
            let id = ListId(arena.allocate());
            arena.lists.insert(id, ListEntry::new(None));
            id
        };
        return ListRef::acquire(self.clone(), id);
    }

    pub fn config(&self) -> ForestConfig {
        return self.arena().config.clone();
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        return self.arena().nodes.len();
    }

    /// Number of live lists, including every node's derivative list.
    pub fn list_count(&self) -> usize {
        return self.arena().lists.len();
    }

    pub fn same_forest(&self, other: &Forest) -> bool {
        return Rc::ptr_eq(&self.arena, &other.arena);
    }

    pub(crate) fn arena(&self) -> Ref<'_, Arena> {
        return self.arena.borrow();
    }

    pub(crate) fn arena_mut(&self) -> RefMut<'_, Arena> {
        return self.arena.borrow_mut();
    }

    pub(crate) fn acquire(&self, owner: Owner) {
        refcount::acquire(&mut *self.arena_mut(), owner, 1);
    }

    pub(crate) fn release(&self, owner: Owner) {
        let mut doomed = Doomed::default();
        {
            let mut arena = self.arena_mut();
            if let Some(root) = refcount::release(&mut *arena, owner, 1) {
                arena.destroy(root, &mut doomed);
            }
        }
        doomed.finish();
    }

    /// Create an unattached node holding `document`.
    pub(crate) fn create_node(&self, document: Rc<dyn Document>) -> NodeRef {
        let (node, list, timestamp, name) = {
            let mut arena = self.arena_mut();
            let node = NodeId(arena.allocate());
            let list = ListId(arena.allocate());
            let timestamp = arena.config.now();
            let name = arena.config.default_name(timestamp);
            (node, list, timestamp, name)
        };

        let subscription = document.subscribe(Box::new(DirtyMarker::new(self, node)));
        let document_id = document.id();
        {
            let mut arena = self.arena_mut();
            arena.lists.insert(list, ListEntry::new(Some(node)));
            arena.nodes.insert(node, NodeEntry {
                document,
                subscription: Some(subscription),
                name,
                timestamp,
                frozen: false,
                dirty: false,
                owner: None,
                child_list: list,
                parent_list: None,
                refcount: 0,
                listeners: Broadcaster::new(),
            });
        }
        tracing::debug!(?node, document = ?document_id, timestamp, "created node");
        return NodeRef::acquire(self.clone(), node);
    }

    pub(crate) fn unregister(&self, set: ListenerSet, id: ListenerId) -> bool {
        let removed = {
            let mut arena = self.arena_mut();
            arena.listeners_mut(set).and_then(|listeners| listeners.unregister(id))
        };
        return removed.is_some();
    }
}

impl Default for Forest {
    fn default() -> Forest {
        return Forest::new();
    }
}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena();
        return f
            .debug_struct("Forest")
            .field("nodes", &arena.nodes.len())
            .field("lists", &arena.lists.len())
            .finish();
    }
}
