//! Lineage - trees of versioned document snapshots.
//!
//! A [`Forest`] holds documents in nodes. A node can be frozen to publish
//! its state; asking a frozen node for something writable clones its
//! document into a derivative node beneath it. Every node and list can be
//! observed, and handles are counted so that holding any node keeps its
//! whole ancestry alive.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//!
//! use lineage::Forest;
//! use lineage::document::TextDocument;
//!
//! let forest = Forest::new();
//! let loaded = forest.make_list();
//!
//! // Load a document and publish it
//! let original = loaded.make_node(Some(Rc::new(TextDocument::new("v1")))).unwrap();
//! loaded.add_model(&original).unwrap();
//! original.set_frozen(true);
//!
//! // Editing a frozen node goes through a derivative
//! let draft = original.get_writable().unwrap();
//! assert_ne!(draft, original);
//! assert_eq!(draft.parent_list().unwrap(), original.derived_models());
//! ```

pub mod annotation;
pub mod broadcast;
pub mod config;
pub mod context;
mod cursor;
pub mod document;
pub mod error;
pub mod forest;
pub mod refcount;
pub mod registry;

pub use broadcast::Listener;
pub use broadcast::ListenerError;
pub use broadcast::ListenerId;
pub use config::ForestConfig;
pub use context::Context;
pub use error::Error;
pub use error::Result;
pub use forest::Event;
pub use forest::EventKind;
pub use forest::Forest;
pub use forest::ListRef;
pub use forest::NodeRef;
