//! Cursor positions for live iterators.
//!
//! A live iterator does not borrow the sequence it walks. It registers a
//! cursor with the owner of the sequence, and the owner keeps every cursor
//! valid as entries are removed underneath it.

use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CursorId(u64);

/// The outstanding cursors over one sequence.
#[derive(Debug, Default)]
pub(crate) struct Cursors {
    next_id: u64,
    positions: FxHashMap<CursorId, usize>,
}

impl Cursors {
    /// Register a cursor positioned at the start of the sequence.
    pub(crate) fn open(&mut self) -> CursorId {
        let id = CursorId(self.next_id);
        self.next_id += 1;
        self.positions.insert(id, 0);
        return id;
    }

    pub(crate) fn close(&mut self, id: CursorId) {
        self.positions.remove(&id);
    }

    /// Return the index under the cursor and step past it.
    pub(crate) fn advance(&mut self, id: CursorId) -> Option<usize> {
        let position = self.positions.get_mut(&id)?;
        let current = *position;
        *position += 1;
        return Some(current);
    }

    /// Call before removing the entry at `index`.
    ///
    /// A cursor sitting on the removed entry ends up on the entry that
    /// followed it; cursors beyond it shift down with the sequence.
    pub(crate) fn removed_at(&mut self, index: usize) {
        for position in self.positions.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        return self.positions.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(cursors: &mut Cursors, id: CursorId, items: &[char]) -> Option<char> {
        let index = cursors.advance(id)?;
        return items.get(index).copied();
    }

    #[test]
    fn removal_under_cursor_yields_following_entry() {
        let mut items = vec!['a', 'b', 'c'];
        let mut cursors = Cursors::default();
        let id = cursors.open();

        assert_eq!(walk(&mut cursors, id, &items), Some('a'));
        // The cursor now rests on 'b'.
        cursors.removed_at(1);
        items.remove(1);
        assert_eq!(walk(&mut cursors, id, &items), Some('c'));
        assert_eq!(walk(&mut cursors, id, &items), None);
    }

    #[test]
    fn removal_behind_cursor_does_not_skip() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        let mut cursors = Cursors::default();
        let id = cursors.open();

        walk(&mut cursors, id, &items);
        walk(&mut cursors, id, &items);
        cursors.removed_at(0);
        items.remove(0);
        assert_eq!(walk(&mut cursors, id, &items), Some('c'));
        assert_eq!(walk(&mut cursors, id, &items), Some('d'));
    }

    #[test]
    fn removal_ahead_of_cursor_is_skipped_naturally() {
        let mut items = vec!['a', 'b', 'c'];
        let mut cursors = Cursors::default();
        let id = cursors.open();

        walk(&mut cursors, id, &items);
        cursors.removed_at(2);
        items.remove(2);
        assert_eq!(walk(&mut cursors, id, &items), Some('b'));
        assert_eq!(walk(&mut cursors, id, &items), None);
    }

    #[test]
    fn independent_cursors() {
        let mut items = vec!['a', 'b', 'c'];
        let mut cursors = Cursors::default();
        let first = cursors.open();
        let second = cursors.open();

        walk(&mut cursors, first, &items);
        walk(&mut cursors, first, &items);
        cursors.removed_at(0);
        items.remove(0);

        assert_eq!(walk(&mut cursors, first, &items), Some('c'));
        assert_eq!(walk(&mut cursors, second, &items), Some('b'));

        cursors.close(first);
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors.advance(first), None);
    }
}
