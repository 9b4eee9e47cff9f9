//! Plain book records handed over by an ingestion source.

use serde::{Deserialize, Serialize};

/// One book as supplied by the external export.
///
/// The library is agnostic to how the source parsed it; this is the whole
/// contract between the ingestion side and [`Library::dump`](crate::Library::dump).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// External catalog identity, unique per library.
    pub book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub isbn: Option<u64>,
    #[serde(default)]
    pub isbn13: Option<u64>,
    /// Titles of the series this book belongs to, if any.
    #[serde(default)]
    pub series: Vec<String>,
}
