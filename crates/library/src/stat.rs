//! Counters surfaced to the caller after load, merge and ingestion passes.

use std::collections::BTreeSet;

/// Running statistics for one [`Library`](crate::Library) instance.
#[derive(Debug, Clone, Default)]
pub struct Stat {
    pub books_added: usize,
    pub authors_added: usize,
    pub series_added: usize,
    pub authors_renamed: usize,
    /// Files that matched a scan mask but could not be parsed as any known
    /// entity kind.
    pub skipped_unknown_files: usize,
    unique_authors: BTreeSet<String>,
}

impl Stat {
    /// Records an author name seen during ingestion. Returns `true` the
    /// first time a name is seen.
    pub fn register_author(&mut self, name: &str) -> bool {
        self.unique_authors.insert(name.to_string())
    }

    pub fn unique_authors(&self) -> usize {
        self.unique_authors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_author_counts_each_name_once() {
        let mut stat = Stat::default();
        assert!(stat.register_author("Jules Verne"));
        assert!(!stat.register_author("Jules Verne"));
        assert!(stat.register_author("Mark Twain"));
        assert_eq!(stat.unique_authors(), 2);
    }
}
