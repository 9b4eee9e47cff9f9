//! Template Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A template error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Everything here is a configuration problem: a broken template document, a
/// broken rule, or a bundle with pieces missing. None of it is retryable and
/// all of it should abort startup.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The template document does not follow the three-line header grammar.
    #[display("invalid template document: {_0}")]
    Syntax(#[error(not(source))] &'static str),
    /// A template failed to compile or render.
    #[display("failed to render template")]
    Render,
    /// A file-name template produced an empty name.
    #[display("template produced an empty file name")]
    EmptyFileName,
    /// An extraction rule is malformed (bad pattern or group index).
    #[display("invalid extraction rule: {_0}")]
    Rule(#[error(not(source))] String),
    /// A template bundle is missing a required file or rule section.
    #[display("template bundle is missing {_0}")]
    MissingAsset(#[error(not(source))] String),
    /// The rule configuration document could not be deserialized.
    #[display("failed to load rule configuration")]
    Config,
    /// A template folder could not be read.
    #[display("failed to read template folder {}", _0.display())]
    Folder(#[error(not(source))] PathBuf),
}
