//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use lineage::Event;
use lineage::EventKind;
use lineage::Forest;
use lineage::ForestConfig;
use lineage::Listener;
use lineage::ListenerError;
use lineage::config::ManualClock;
use lineage::document::ChangeObserver;
use lineage::document::Document;
use lineage::document::DocumentId;
use lineage::document::SubscriptionToken;
use lineage::document::TextDocument;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// A forest whose clock starts at `start` and only moves when told to.
pub fn manual_forest(start: u64) -> (Forest, Rc<ManualClock>) {
    init_tracing();
    let clock = Rc::new(ManualClock::new(start));
    let config = ForestConfig::new().with_clock(clock.clone()).with_name_format("node");
    return (Forest::with_config(config), clock);
}

pub fn text(body: &str) -> Option<Rc<dyn Document>> {
    return Some(Rc::new(TextDocument::new(body)));
}

pub fn text_of(document: &Rc<dyn Document>) -> String {
    return document
        .as_any()
        .downcast_ref::<TextDocument>()
        .map(|document| document.text())
        .unwrap_or_default();
}

/// One delivered event, reduced to what the tests compare.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seen {
    pub tag: &'static str,
    pub kind: EventKind,
    pub depth: Option<u32>,
}

pub type Log = Rc<RefCell<Vec<Seen>>>;

pub fn log() -> Log {
    return Rc::new(RefCell::new(Vec::new()));
}

/// A listener that appends every event it hears to `log` under `tag`.
pub fn recorder(log: &Log, tag: &'static str) -> Rc<dyn Listener<Event>> {
    let log = log.clone();
    return Rc::new(move |event: &Event| -> Result<(), ListenerError> {
        log.borrow_mut().push(Seen {
            tag,
            kind: event.kind(),
            depth: event.depth(),
        });
        Ok(())
    });
}

pub fn failing(reason: &'static str) -> Rc<dyn Listener<Event>> {
    return Rc::new(move |_: &Event| -> Result<(), ListenerError> { Err(ListenerError::new(reason)) });
}

/// A document that refuses to be copied.
pub struct SealedDocument {
    id: DocumentId,
}

impl SealedDocument {
    pub fn new() -> SealedDocument {
        return SealedDocument { id: DocumentId::fresh() };
    }
}

impl Document for SealedDocument {
    fn id(&self) -> DocumentId {
        return self.id;
    }

    fn clone_document(&self) -> Option<Rc<dyn Document>> {
        return None;
    }

    fn subscribe(&self, _observer: Box<dyn ChangeObserver>) -> SubscriptionToken {
        return SubscriptionToken::new(0);
    }

    fn unsubscribe(&self, _token: SubscriptionToken) -> bool {
        return true;
    }

    fn as_any(&self) -> &dyn Any {
        return self;
    }
}
