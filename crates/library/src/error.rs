//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally. `Parse` and `UnknownAuthor` are recoverable during folder
/// scans (skip the file, count it); everything else aborts the operation.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Note content does not contain the required identity fields.
    #[display("content does not contain the required identity fields")]
    Parse,
    /// Two note files claim the same book id.
    #[display("duplicate book id {_0}")]
    DuplicateBookId(#[error(not(source))] String),
    /// A note references an author with no loaded author note.
    #[display("author `{_0}` has no author note")]
    UnknownAuthor(#[error(not(source))] String),
    /// A file operation was attempted on an entity without a folder.
    #[display("entity is not attached to a folder")]
    Detached,
    /// A template failed to render for this entity.
    #[display("failed to render note from template")]
    Render,
    /// The configured templates and rules cannot round-trip their own output.
    #[display("template self-check failed: {_0}")]
    Check(#[error(not(source))] String),
    /// A filesystem operation failed.
    #[display("filesystem operation failed")]
    Io,
}
