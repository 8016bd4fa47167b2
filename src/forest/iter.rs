use std::fmt;
use std::iter::FusedIterator;

use crate::cursor::CursorId;

use super::ListRef;
use super::NodeRef;

/// A forward walk over a list that survives the list changing under it.
///
/// The iterator holds a reference on its list for as long as it lives, so the
/// list and every ancestor stay alive. Removing the node the cursor rests on
/// moves the cursor to the node after it. Nodes appended before the end is
/// reached are visited; once `next` has returned `None` it always will.
pub struct LiveIterator {
    list: ListRef,
    cursor: CursorId,
    finished: bool,
}

impl LiveIterator {
    pub(crate) fn new(list: ListRef) -> LiveIterator {
        let cursor = list.forest.arena_mut().list_mut(list.id).cursors.open();
        return LiveIterator {
            list,
            cursor,
            finished: false,
        };
    }

    pub fn list(&self) -> &ListRef {
        return &self.list;
    }
}

impl Iterator for LiveIterator {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if self.finished {
            return None;
        }

        let index = self.list.forest.arena_mut().list_mut(self.list.id).cursors.advance(self.cursor);
        let node = index.and_then(|index| self.list.node_at(index));
        match node {
            Some(node) => return Some(NodeRef::acquire(self.list.forest.clone(), node)),
            None => {
                self.finished = true;
                self.list.forest.arena_mut().list_mut(self.list.id).cursors.close(self.cursor);
                return None;
            }
        }
    }
}

impl FusedIterator for LiveIterator {}

impl Drop for LiveIterator {
    fn drop(&mut self) {
        if !self.finished {
            self.list.forest.arena_mut().list_mut(self.list.id).cursors.close(self.cursor);
        }
    }
}

impl fmt::Debug for LiveIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("LiveIterator")
            .field("list", &self.list)
            .field("finished", &self.finished)
            .finish();
    }
}
