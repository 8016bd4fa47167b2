use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::document::Document;

use super::NodeRef;

/// A change to the forest, delivered to node and list listeners.
///
/// `ModelAdded` and `ModelRemoved` go to list listeners and carry the number
/// of list levels between the list that changed and the list whose listener
/// is being called. Every other variant goes to node listeners: first the
/// node's own, then the node-listener set of every list above it.
pub enum Event {
    ModelAdded { node: NodeRef, depth: u32 },
    ModelRemoved { node: NodeRef, depth: u32 },
    Renamed { node: NodeRef, name: String },
    FrozenStateChanged { node: NodeRef, frozen: bool },
    DocumentReplaced { node: NodeRef, document: Rc<dyn Document> },
    OwnerChanged { node: NodeRef, owner: Option<Rc<dyn Any>> },
    ChangesFlushed { node: NodeRef },
}

/// The variant of an [`Event`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ModelAdded,
    ModelRemoved,
    Renamed,
    FrozenStateChanged,
    DocumentReplaced,
    OwnerChanged,
    ChangesFlushed,
}

impl Event {
    /// The node the event is about.
    pub fn node(&self) -> &NodeRef {
        return match self {
            Event::ModelAdded { node, .. }
            | Event::ModelRemoved { node, .. }
            | Event::Renamed { node, .. }
            | Event::FrozenStateChanged { node, .. }
            | Event::DocumentReplaced { node, .. }
            | Event::OwnerChanged { node, .. }
            | Event::ChangesFlushed { node } => node,
        };
    }

    pub fn kind(&self) -> EventKind {
        return match self {
            Event::ModelAdded { .. } => EventKind::ModelAdded,
            Event::ModelRemoved { .. } => EventKind::ModelRemoved,
            Event::Renamed { .. } => EventKind::Renamed,
            Event::FrozenStateChanged { .. } => EventKind::FrozenStateChanged,
            Event::DocumentReplaced { .. } => EventKind::DocumentReplaced,
            Event::OwnerChanged { .. } => EventKind::OwnerChanged,
            Event::ChangesFlushed { .. } => EventKind::ChangesFlushed,
        };
    }

    /// Only structural events carry a depth.
    pub fn depth(&self) -> Option<u32> {
        return match self {
            Event::ModelAdded { depth, .. } | Event::ModelRemoved { depth, .. } => Some(*depth),
            _ => None,
        };
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Event");
        out.field("kind", &self.kind()).field("node", &self.node().id());
        match self {
            Event::ModelAdded { depth, .. } | Event::ModelRemoved { depth, .. } => {
                out.field("depth", depth);
            }
            Event::Renamed { name, .. } => {
                out.field("name", name);
            }
            Event::FrozenStateChanged { frozen, .. } => {
                out.field("frozen", frozen);
            }
            Event::DocumentReplaced { document, .. } => {
                out.field("document", &document.id());
            }
            Event::OwnerChanged { owner, .. } => {
                out.field("owner", &owner.is_some());
            }
            Event::ChangesFlushed { .. } => {}
        }
        return out.finish();
    }
}
