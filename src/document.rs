//! The document collaborator.
//!
//! The forest never looks inside a document. It needs a stable identity, a
//! way to produce an independent copy for derivatives, and a push
//! notification whenever the document changes. [`TextDocument`] is a small
//! implementation of that contract.

use std::any::Any;
use std::cell::Cell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rustc_hash::FxHashMap;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a document, independent of the handle used to reach it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn fresh() -> DocumentId {
        return DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed));
    }
}

/// Returned by [`Document::subscribe`]; hand it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub fn new(raw: u64) -> SubscriptionToken {
        return SubscriptionToken(raw);
    }
}

/// Told about structural changes to a document.
pub trait ChangeObserver {
    /// Called synchronously, before the mutating call returns.
    fn document_changed(&self);
}

/// A versioned document held by a forest node.
pub trait Document {
    fn id(&self) -> DocumentId;

    /// An independent copy with a new identity, or `None` if this document
    /// cannot be copied.
    fn clone_document(&self) -> Option<Rc<dyn Document>>;

    fn subscribe(&self, observer: Box<dyn ChangeObserver>) -> SubscriptionToken;

    /// Returns whether the token was still subscribed.
    fn unsubscribe(&self, token: SubscriptionToken) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Opaque values attached to an element by string key.
pub trait UserData {
    /// Store `value` under `key`, or clear the key when `value` is `None`.
    fn set_user_data(&self, key: &str, value: Option<Rc<dyn Any>>);

    fn user_data(&self, key: &str) -> Option<Rc<dyn Any>>;
}

/// A plain text document.
///
/// Every mutation bumps the revision and notifies observers. Observers are
/// snapshotted first, so they may subscribe or unsubscribe while being told.
pub struct TextDocument {
    id: DocumentId,
    text: RefCell<String>,
    revision: Cell<u64>,
    next_token: Cell<u64>,
    observers: RefCell<Vec<(SubscriptionToken, Rc<dyn ChangeObserver>)>>,
    user_data: RefCell<FxHashMap<String, Rc<dyn Any>>>,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> TextDocument {
        return TextDocument {
            id: DocumentId::fresh(),
            text: RefCell::new(text.into()),
            revision: Cell::new(0),
            next_token: Cell::new(0),
            observers: RefCell::new(Vec::new()),
            user_data: RefCell::new(FxHashMap::default()),
        };
    }

    pub fn text(&self) -> String {
        return self.text.borrow().clone();
    }

    pub fn revision(&self) -> u64 {
        return self.revision.get();
    }

    pub fn observer_count(&self) -> usize {
        return self.observers.borrow().len();
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = text.into();
        self.changed();
    }

    /// Insert `content` at byte offset `pos`, clamped to the end and to the
    /// nearest char boundary below it.
    pub fn insert(&self, pos: usize, content: &str) {
        {
            let mut text = self.text.borrow_mut();
            let mut at = pos.min(text.len());
            while !text.is_char_boundary(at) {
                at -= 1;
            }
            text.insert_str(at, content);
        }
        self.changed();
    }

    pub fn append(&self, content: &str) {
        self.text.borrow_mut().push_str(content);
        self.changed();
    }

    fn changed(&self) {
        self.revision.set(self.revision.get() + 1);
        let snapshot: Vec<Rc<dyn ChangeObserver>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in snapshot {
            observer.document_changed();
        }
    }
}

impl Document for TextDocument {
    fn id(&self) -> DocumentId {
        return self.id;
    }

    fn clone_document(&self) -> Option<Rc<dyn Document>> {
        return Some(Rc::new(TextDocument::new(self.text())));
    }

    fn subscribe(&self, observer: Box<dyn ChangeObserver>) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.get());
        self.next_token.set(self.next_token.get() + 1);
        self.observers.borrow_mut().push((token, Rc::from(observer)));
        return token;
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let removed = {
            let mut observers = self.observers.borrow_mut();
            match observers.iter().position(|(entry, _)| *entry == token) {
                Some(index) => Some(observers.remove(index)),
                None => None,
            }
        };
        return removed.is_some();
    }

    fn as_any(&self) -> &dyn Any {
        return self;
    }
}

impl UserData for TextDocument {
    fn set_user_data(&self, key: &str, value: Option<Rc<dyn Any>>) {
        let previous = match value {
            Some(value) => self.user_data.borrow_mut().insert(key.to_string(), value),
            None => self.user_data.borrow_mut().remove(key),
        };
        drop(previous);
    }

    fn user_data(&self, key: &str) -> Option<Rc<dyn Any>> {
        return self.user_data.borrow().get(key).cloned();
    }
}

impl fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("TextDocument")
            .field("id", &self.id)
            .field("revision", &self.revision.get())
            .field("text", &*self.text.borrow())
            .finish();
    }
}
