//! Errors reported by forest and registry operations.

use thiserror::Error;

/// Errors returned synchronously to the caller of a failing operation.
/// None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A node was requested without a document.
    #[error("document is absent")]
    NullDocument,

    /// The node is already attached to a list.
    #[error("node is not a root")]
    NotRoot,

    /// The node belongs to a different forest.
    #[error("node does not belong to this forest")]
    ForeignNode,

    /// The document refused to produce a copy for a derivative.
    #[error("document could not be cloned")]
    CloneFailed,

    /// Attaching the node would place it beneath itself.
    #[error("node cannot be attached inside its own subtree")]
    OwnershipCycle,

    /// Loading a module by name alone is not implemented.
    #[error("lazy loading of module {name} {version} is not supported")]
    NotSupported {
        name: String,
        version: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
