//! The root aggregate: folder loading, canonical-name resolution, alias
//! reconciliation, and the ingestion pipeline.
//!
//! A library folder has an `authors/` subfolder and two book buckets,
//! `reviews/` and `toread/`, holding book notes and series descriptors side
//! by side. Loading is strictly bottom-up — authors, then series, then
//! books — so forward references always resolve against an already
//! populated map. Ingestion runs top-down: author ensured first, then the
//! book, then its series descriptors.

use crate::author::{AuthorFile, AuthorRef};
use crate::book::{BookFile, BookRef};
use crate::error::{ErrorKind, Result};
use crate::note::Note;
use crate::record::BookRecord;
use crate::series::SeriesFile;
use crate::stat::Stat;
use exn::{OptionExt, ResultExt};
use shelfmark_templates::TemplateSet;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Subfolder holding one note per canonical author.
pub const AUTHORS_SUBFOLDER: &str = "authors";
/// Bucket for books with a review or rating.
pub const REVIEWS_SUBFOLDER: &str = "reviews";
/// Bucket for books without review and rating.
pub const TOREAD_SUBFOLDER: &str = "toread";

const BOOK_SUBFOLDERS: [&str; 2] = [REVIEWS_SUBFOLDER, TOREAD_SUBFOLDER];

/// Books and authors of one note folder.
///
/// Holds the denormalized object graph: `authors` maps every alias to its
/// author (many aliases may share one), `books` maps each external book id
/// to its book. Detached libraries (no folder) host transient entities for
/// template self-checks and tests.
#[derive(Debug)]
pub struct Library {
    folder: Option<PathBuf>,
    templates: Rc<TemplateSet>,
    pub authors: BTreeMap<String, AuthorRef>,
    pub books: BTreeMap<String, BookRef>,
    pub stat: Stat,
}

impl Library {
    /// A library without a folder: fully functional as a host for entities
    /// except that nothing can be persisted.
    pub fn detached(templates: TemplateSet) -> Self {
        Self {
            folder: None,
            templates: Rc::new(templates),
            authors: BTreeMap::new(),
            books: BTreeMap::new(),
            stat: Stat::default(),
        }
    }

    /// Loads a library from `folder`: authors first, then series, then
    /// books, each bucket in turn. Missing subfolders are treated as empty.
    #[instrument(skip_all, fields(folder = %folder.as_ref().display()))]
    pub fn open(folder: impl AsRef<Path>, templates: TemplateSet) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();
        let mut library = Self {
            folder: Some(folder.clone()),
            templates: Rc::new(templates),
            authors: BTreeMap::new(),
            books: BTreeMap::new(),
            stat: Stat::default(),
        };
        library.load_authors(&folder.join(AUTHORS_SUBFOLDER))?;
        for bucket in BOOK_SUBFOLDERS {
            library.load_series(&folder.join(bucket))?;
        }
        for bucket in BOOK_SUBFOLDERS {
            library.load_books(&folder.join(bucket))?;
        }
        info!(
            authors = library.authors.len(),
            books = library.books.len(),
            series = library.stat.series_added,
            skipped = library.stat.skipped_unknown_files,
            "library loaded"
        );
        Ok(library)
    }

    pub fn folder(&self) -> Option<&PathBuf> {
        self.folder.as_ref()
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Whether `file_name` classifies as a series descriptor.
    pub fn is_series_file_name(&self, file_name: &str) -> bool {
        SeriesFile::is_file_name(&self.templates, file_name)
    }

    /// Runs the render-then-reparse self-check for all three entity kinds.
    pub fn check_templates(&self) -> Result<()> {
        AuthorFile::check(&self.templates)?;
        BookFile::check(&self.templates)?;
        SeriesFile::check(&self.templates)
    }

    /// File names in `folder`, sorted for deterministic scan order. A
    /// missing folder reads as empty.
    fn sorted_entries(folder: &Path) -> Result<Vec<String>> {
        if !folder.exists() {
            debug!(folder = %folder.display(), "subfolder not present, nothing to load");
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(folder).or_raise(|| ErrorKind::Io)? {
            let entry = entry.or_raise(|| ErrorKind::Io)?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Suffix of rendered author note names, used as the author scan mask.
    fn author_file_suffix(&self) -> Result<String> {
        let mut dummy = AuthorFile::new(Rc::clone(&self.templates), None, "author");
        Ok(file_suffix(&dummy.file_name()?))
    }

    /// Suffix of rendered book note names, used as the book scan mask.
    fn book_file_suffix(&self) -> Result<String> {
        let author = AuthorFile::new(Rc::clone(&self.templates), None, "author").into_ref();
        let record = BookRecord { title: "title".into(), author: "author".into(), ..BookRecord::default() };
        let mut dummy = BookFile::from_record(Rc::clone(&self.templates), None, author, record);
        Ok(file_suffix(&dummy.file_name()?))
    }

    /// Loads every parseable author note in `folder` and registers all its
    /// aliases. Files that fail to parse are counted and skipped.
    #[instrument(skip_all)]
    pub fn load_authors(&mut self, folder: &Path) -> Result<()> {
        let suffix = self.author_file_suffix()?;
        for file_name in Self::sorted_entries(folder)? {
            if !file_name.ends_with(&suffix) {
                continue;
            }
            let content = fs::read_to_string(folder.join(&file_name)).or_raise(|| ErrorKind::Io)?;
            match AuthorFile::from_file(Rc::clone(&self.templates), folder.to_path_buf(), file_name.clone(), content)
            {
                Ok(author) => self.register_author(author.into_ref()),
                Err(error) if matches!(error.deref(), ErrorKind::Parse) => {
                    debug!(file = %file_name, "note has no author links, skipped");
                    self.stat.skipped_unknown_files += 1;
                },
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Registers every alias of `author` in the alias map.
    ///
    /// The canonical name always rebinds to the note that declares it; the
    /// reconciliation pass relies on that to find mergeable files. Further
    /// aliases are first-registered-wins, so a primary note that loaded
    /// earlier keeps the aliases it claimed.
    fn register_author(&mut self, author: AuthorRef) {
        let names = author.borrow().names.clone();
        let mut aliases = names.into_iter();
        if let Some(canonical) = aliases.next() {
            self.authors.insert(canonical, Rc::clone(&author));
        }
        for alias in aliases {
            self.authors.entry(alias).or_insert_with(|| Rc::clone(&author));
        }
    }

    /// Loads series descriptors from one bucket, attaching each to its
    /// already-loaded author. Notes with no parseable header or an unknown
    /// author are counted and skipped.
    #[instrument(skip_all)]
    pub fn load_series(&mut self, folder: &Path) -> Result<()> {
        for file_name in Self::sorted_entries(folder)? {
            if !SeriesFile::is_file_name(&self.templates, &file_name) {
                continue;
            }
            let content = fs::read_to_string(folder.join(&file_name)).or_raise(|| ErrorKind::Io)?;
            let authors = &self.authors;
            let result = SeriesFile::from_file(
                Rc::clone(&self.templates),
                folder.to_path_buf(),
                file_name.clone(),
                content,
                |name| authors.get(name).cloned().ok_or_raise(|| ErrorKind::UnknownAuthor(name.to_string())),
            );
            match result {
                Ok(series) => {
                    let series = series.into_ref();
                    let author = series.borrow().author.clone();
                    author.borrow_mut().series.push(series);
                    self.stat.series_added += 1;
                },
                Err(error) if matches!(error.deref(), ErrorKind::Parse) => {
                    info!(file = %file_name, "series note has no author name, skipped");
                    self.stat.skipped_unknown_files += 1;
                },
                Err(error) if matches!(error.deref(), ErrorKind::UnknownAuthor(_)) => {
                    info!(file = %file_name, "series note references an author without an author note, skipped");
                    self.stat.skipped_unknown_files += 1;
                },
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Loads book notes from one bucket. Unparseable files that are not
    /// series descriptors are counted as unknown; a duplicate book id is a
    /// hard error and aborts the load.
    #[instrument(skip_all)]
    pub fn load_books(&mut self, folder: &Path) -> Result<()> {
        let suffix = self.book_file_suffix()?;
        for file_name in Self::sorted_entries(folder)? {
            if !file_name.ends_with(&suffix) {
                continue;
            }
            let content = fs::read_to_string(folder.join(&file_name)).or_raise(|| ErrorKind::Io)?;
            let templates = Rc::clone(&self.templates);
            let result =
                BookFile::from_file(templates, folder.to_path_buf(), file_name.clone(), content, |name| {
                    self.author_factory(name)
                });
            match result {
                Ok(book) => {
                    if self.books.contains_key(&book.book_id) {
                        exn::bail!(ErrorKind::DuplicateBookId(book.book_id.clone()));
                    }
                    let book_id = book.book_id.clone();
                    let book = book.into_ref();
                    let author = book.borrow().author.clone();
                    author.borrow_mut().books.push(Rc::clone(&book));
                    self.books.insert(book_id, book);
                },
                Err(error) if matches!(error.deref(), ErrorKind::Parse) => {
                    if !self.is_series_file_name(&file_name) {
                        debug!(file = %file_name, "unknown note skipped");
                        self.stat.skipped_unknown_files += 1;
                    }
                },
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Gets the author registered under `name`, creating one when absent.
    ///
    /// Attached libraries persist and register the new author immediately;
    /// detached libraries return a transient, unregistered instance.
    pub fn author_factory(&mut self, name: &str) -> Result<AuthorRef> {
        if let Some(author) = self.authors.get(name) {
            return Ok(Rc::clone(author));
        }
        let Some(folder) = self.folder.clone() else {
            return Ok(AuthorFile::new(Rc::clone(&self.templates), None, name).into_ref());
        };
        info!(author = name, "creating author note");
        let mut author = AuthorFile::new(Rc::clone(&self.templates), Some(folder.join(AUTHORS_SUBFOLDER)), name);
        author.write()?;
        let author = author.into_ref();
        self.authors.insert(name.to_string(), Rc::clone(&author));
        Ok(author)
    }

    /// Folds every alias of every primary author onto the primary object.
    ///
    /// To merge author names (translations, misspellings), list all of the
    /// author's name links in one note; the first link is the primary name.
    /// Books and series registered under the other names are renamed to the
    /// primary name and the now-redundant author notes are deleted.
    ///
    /// Primaries are processed in lexicographic canonical-name order, and a
    /// primary that has itself been folded into an earlier group is skipped,
    /// so the outcome is deterministic when two primary notes claim the same
    /// alias: the one whose canonical name sorts first wins. Running the
    /// pass twice is safe.
    #[instrument(skip_all)]
    pub fn merge_author_names(&mut self) -> Result<()> {
        let mut primaries: Vec<AuthorRef> = Vec::new();
        for author in self.authors.values() {
            if author.borrow().is_primary() && !primaries.iter().any(|known| Rc::ptr_eq(known, author)) {
                primaries.push(Rc::clone(author));
            }
        }
        primaries.sort_by_key(|author| author.borrow().name.clone());
        for primary in primaries {
            let (primary_name, aliases) = {
                let primary = primary.borrow();
                (primary.name.clone(), primary.names.clone())
            };
            // A primary folded into an earlier group no longer owns its own
            // canonical name; its aliases are the winner's business now.
            if !self.authors.get(&primary_name).is_some_and(|owner| Rc::ptr_eq(owner, &primary)) {
                continue;
            }
            for alias in aliases {
                let Some(existing) = self.authors.get(&alias).cloned() else {
                    continue;
                };
                if Rc::ptr_eq(&existing, &primary) {
                    continue;
                }
                debug!(primary = %primary_name, alias = %alias, "merging author synonym");
                self.stat.authors_renamed += 1;
                AuthorFile::merge(&primary, &existing)?;
                self.authors.insert(alias, Rc::clone(&primary));
            }
        }
        Ok(())
    }

    /// Saves `records` into the library folder, in caller order.
    ///
    /// Author names already known under an alias are normalized to the
    /// canonical name first. Records whose book id is already present are
    /// skipped; for the rest the author note is ensured to exist (never
    /// overwritten), then the book note is written, then its missing series
    /// descriptors. Not transactional: a mid-run failure leaves the files
    /// already written, and re-running is safe because identity-defining
    /// files are checked for existence first.
    #[instrument(skip_all)]
    pub fn dump(&mut self, records: impl IntoIterator<Item = BookRecord>) -> Result<()> {
        let Some(folder) = self.folder.clone() else {
            exn::bail!(ErrorKind::Detached);
        };
        for subfolder in [AUTHORS_SUBFOLDER, REVIEWS_SUBFOLDER, TOREAD_SUBFOLDER] {
            fs::create_dir_all(folder.join(subfolder)).or_raise(|| ErrorKind::Io)?;
        }
        for mut record in records {
            if let Some(known) = self.authors.get(&record.author) {
                let canonical = known.borrow().name.clone();
                if canonical != record.author {
                    debug!(from = %record.author, to = %canonical, "author name normalized to canonical");
                    record.author = canonical;
                }
            }
            self.stat.register_author(&record.author);
            if self.books.contains_key(&record.book_id) {
                continue;
            }
            if !self.authors.contains_key(&record.author) {
                self.create_author_file(&record.author, &folder)?;
            }
            let title = record.title.clone();
            let path = self.create_book_file(record)?;
            self.stat.books_added += 1;
            debug!(book = %title, file = %path.display(), "book note written");
        }
        Ok(())
    }

    /// Creates and registers an author note, leaving an already existing
    /// file untouched.
    fn create_author_file(&mut self, name: &str, folder: &Path) -> Result<AuthorRef> {
        let mut author = AuthorFile::new(Rc::clone(&self.templates), Some(folder.join(AUTHORS_SUBFOLDER)), name);
        if !author.path()?.is_file() {
            author.write()?;
        }
        let author = author.into_ref();
        self.authors.insert(name.to_string(), Rc::clone(&author));
        self.stat.authors_added += 1;
        Ok(author)
    }

    /// Writes one book note (and its missing series descriptors) into the
    /// bucket matching its review state, and registers it.
    fn create_book_file(&mut self, record: BookRecord) -> Result<PathBuf> {
        let Some(folder) = self.folder.clone() else {
            exn::bail!(ErrorKind::Detached);
        };
        let bucket = match record.review.is_empty() && record.rating == 0 {
            true => TOREAD_SUBFOLDER,
            false => REVIEWS_SUBFOLDER,
        };
        let author = self.author_factory(&record.author)?;
        let book_id = record.book_id.clone();
        let mut book = BookFile::from_record(Rc::clone(&self.templates), Some(folder.join(bucket)), author, record);
        book.write()?;
        book.create_series_files()?;
        let path = book.path()?;
        let book = book.into_ref();
        let author = book.borrow().author.clone();
        author.borrow_mut().books.push(Rc::clone(&book));
        self.books.insert(book_id, book);
        Ok(path)
    }
}

/// Final extension of a rendered file name, dot included.
fn file_suffix(name: &str) -> String {
    name.rfind('.').map(|index| name[index..].to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelfmark_templates::{DEFAULT_BUILTIN_TEMPLATES, TemplatesLoader};

    fn templates() -> TemplateSet {
        TemplatesLoader::builtin(DEFAULT_BUILTIN_TEMPLATES).unwrap()
    }

    fn author_link(name: &str) -> String {
        format!(
            "[{name}](https://www.goodreads.com/search?utf8=%E2%9C%93&q={name}&search_type=books&search%5Bfield%5D=author)"
        )
    }

    fn author_note(names: &[&str]) -> String {
        let links: Vec<String> = names.iter().map(|name| author_link(name)).collect();
        format!("{}\n\n#book/author\n", links.join("\n"))
    }

    fn book_note(author: &str, title: &str, book_id: &str) -> String {
        format!("[[{author}]] - [{title}](https://www.goodreads.com/book/show/{book_id})\n\n#book/book\n")
    }

    fn series_note(author: &str, title: &str) -> String {
        format!(
            "[[{author}]] - [{title}](https://www.goodreads.com/search?utf8=%E2%9C%93&q={title}&search_type=books&search%5Bfield%5D=title)\n\n#book/series\n"
        )
    }

    fn md_files(folder: &Path) -> Vec<String> {
        Library::sorted_entries(folder).unwrap()
    }

    fn verne_record() -> BookRecord {
        BookRecord {
            book_id: "54479".into(),
            title: "Around the World in Eighty Days".into(),
            author: "Jules Verne".into(),
            rating: 5,
            review: "This is a review\nin two lines".into(),
            series: vec!["Voyages extraordinaires".into()],
            ..BookRecord::default()
        }
    }

    #[test]
    fn builtin_templates_pass_the_self_check() {
        assert!(Library::detached(templates()).check_templates().is_ok());
    }

    #[test]
    fn detached_author_factory_returns_transient_authors() {
        let mut library = Library::detached(templates());
        let author = library.author_factory("Jules Verne").unwrap();
        assert_eq!(author.borrow().name, "Jules Verne");
        assert!(library.authors.is_empty());
    }

    #[test]
    fn dump_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), templates()).unwrap();
        let toread = BookRecord {
            book_id: "99".into(),
            title: "Mort".into(),
            author: "Terry Pratchett".into(),
            ..BookRecord::default()
        };
        library.dump(vec![verne_record(), toread]).unwrap();
        assert_eq!(library.stat.books_added, 2);
        assert_eq!(library.stat.authors_added, 2);

        assert!(dir.path().join(AUTHORS_SUBFOLDER).join("Jules Verne.md").is_file());
        assert!(dir.path().join(REVIEWS_SUBFOLDER).join("Jules Verne - Around the World in Eighty Days.md").is_file());
        assert!(dir.path().join(REVIEWS_SUBFOLDER).join("Jules Verne - Voyages extraordinaires - series.md").is_file());
        // No review and no rating lands in the to-read bucket.
        assert!(dir.path().join(TOREAD_SUBFOLDER).join("Terry Pratchett - Mort.md").is_file());

        let first = Library::open(dir.path(), templates()).unwrap();
        assert_eq!(first.books.len(), 2);
        assert_eq!(first.authors.len(), 2);
        assert_eq!(first.stat.series_added, 1);
        assert_eq!(first.stat.skipped_unknown_files, 0);
        let book = first.books.get("54479").unwrap().borrow();
        assert_eq!(book.title, "Around the World in Eighty Days");
        assert_eq!(book.author.borrow().name, "Jules Verne");
        assert_eq!(book.series_titles, ["Voyages extraordinaires"]);
        drop(book);

        // Loading the same unmodified folder again yields identical counts.
        let second = Library::open(dir.path(), templates()).unwrap();
        assert_eq!(second.books.len(), first.books.len());
        assert_eq!(second.authors.len(), first.authors.len());
        assert_eq!(second.stat.series_added, first.stat.series_added);
    }

    #[rstest]
    #[case(0, "", TOREAD_SUBFOLDER)]
    #[case(5, "a review", REVIEWS_SUBFOLDER)]
    #[case(3, "", REVIEWS_SUBFOLDER)]
    #[case(0, "review only", REVIEWS_SUBFOLDER)]
    fn bucket_follows_review_state(#[case] rating: u8, #[case] review: &str, #[case] bucket: &str) {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), templates()).unwrap();
        let record = BookRecord {
            book_id: "1".into(),
            title: "Mort".into(),
            author: "Terry Pratchett".into(),
            rating,
            review: review.into(),
            ..BookRecord::default()
        };
        library.dump(vec![record]).unwrap();
        assert!(dir.path().join(bucket).join("Terry Pratchett - Mort.md").is_file());
    }

    #[test]
    fn dump_skips_already_known_book_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), templates()).unwrap();
        library.dump(vec![verne_record()]).unwrap();
        assert_eq!(library.stat.books_added, 1);
        library.dump(vec![verne_record()]).unwrap();
        assert_eq!(library.stat.books_added, 1);
        assert_eq!(md_files(&dir.path().join(REVIEWS_SUBFOLDER)).len(), 2); // book + series
    }

    #[test]
    fn dump_normalizes_author_names_to_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let authors_dir = dir.path().join(AUTHORS_SUBFOLDER);
        fs::create_dir_all(&authors_dir).unwrap();
        fs::write(authors_dir.join("Mark Twain.md"), author_note(&["Mark Twain", "Samuel Clemens"])).unwrap();

        let mut library = Library::open(dir.path(), templates()).unwrap();
        let record = BookRecord {
            book_id: "7".into(),
            title: "Huckleberry Finn".into(),
            author: "Samuel Clemens".into(),
            ..BookRecord::default()
        };
        library.dump(vec![record]).unwrap();

        assert!(dir.path().join(TOREAD_SUBFOLDER).join("Mark Twain - Huckleberry Finn.md").is_file());
        assert_eq!(library.books.get("7").unwrap().borrow().author.borrow().name, "Mark Twain");
    }

    #[test]
    fn load_creates_author_notes_for_orphaned_books() {
        let dir = tempfile::tempdir().unwrap();
        let reviews = dir.path().join(REVIEWS_SUBFOLDER);
        fs::create_dir_all(&reviews).unwrap();
        fs::write(reviews.join("Ghost Writer - Untitled.md"), book_note("Ghost Writer", "Untitled", "13")).unwrap();

        let library = Library::open(dir.path(), templates()).unwrap();
        assert!(library.authors.contains_key("Ghost Writer"));
        assert!(dir.path().join(AUTHORS_SUBFOLDER).join("Ghost Writer.md").is_file());
    }

    #[test]
    fn duplicate_book_id_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let reviews = dir.path().join(REVIEWS_SUBFOLDER);
        fs::create_dir_all(&reviews).unwrap();
        fs::write(reviews.join("A - One.md"), book_note("A", "One", "42")).unwrap();
        fs::write(reviews.join("A - Two.md"), book_note("A", "Two", "42")).unwrap();

        let error = Library::open(dir.path(), templates()).unwrap_err();
        assert!(matches!(error.deref(), ErrorKind::DuplicateBookId(id) if id == "42"));
    }

    #[test]
    fn unparseable_files_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let authors_dir = dir.path().join(AUTHORS_SUBFOLDER);
        let reviews = dir.path().join(REVIEWS_SUBFOLDER);
        fs::create_dir_all(&authors_dir).unwrap();
        fs::create_dir_all(&reviews).unwrap();
        fs::write(authors_dir.join("shopping list.md"), "milk, eggs\n").unwrap();
        fs::write(reviews.join("scratchpad.md"), "not a book note\n").unwrap();
        // A series note whose author has no author note is skipped too.
        fs::write(reviews.join("Nobody - Lost - series.md"), series_note("Nobody", "Lost")).unwrap();

        let library = Library::open(dir.path(), templates()).unwrap();
        assert!(library.books.is_empty());
        assert_eq!(library.stat.skipped_unknown_files, 3);
    }

    #[test]
    fn alias_convergence_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        let authors_dir = dir.path().join(AUTHORS_SUBFOLDER);
        let reviews = dir.path().join(REVIEWS_SUBFOLDER);
        fs::create_dir_all(&authors_dir).unwrap();
        fs::create_dir_all(&reviews).unwrap();
        // One primary note listing three names, plus single-alias notes for
        // the two synonyms, each owning a file on disk.
        fs::write(
            authors_dir.join("Mark Twain.md"),
            author_note(&["Mark Twain", "Samuel Clemens", "S. Clemens"]),
        )
        .unwrap();
        fs::write(authors_dir.join("Samuel Clemens.md"), author_note(&["Samuel Clemens"])).unwrap();
        fs::write(authors_dir.join("S. Clemens.md"), author_note(&["S. Clemens"])).unwrap();
        fs::write(reviews.join("Samuel Clemens - Huck Finn.md"), book_note("Samuel Clemens", "Huck Finn", "11"))
            .unwrap();
        fs::write(reviews.join("S. Clemens - Tales - series.md"), series_note("S. Clemens", "Tales")).unwrap();

        let mut library = Library::open(dir.path(), templates()).unwrap();
        library.merge_author_names().unwrap();

        let primary = library.authors.get("Mark Twain").unwrap();
        for alias in ["Mark Twain", "Samuel Clemens", "S. Clemens"] {
            assert!(Rc::ptr_eq(library.authors.get(alias).unwrap(), primary), "alias {alias} diverged");
        }
        assert_eq!(library.stat.authors_renamed, 2);
        // The synonym notes are gone from disk.
        assert_eq!(md_files(&authors_dir), ["Mark Twain.md"]);
        // Book and series notes were renamed to the primary name and no file
        // references the old names any more.
        assert_eq!(md_files(&reviews), ["Mark Twain - Huck Finn.md", "Mark Twain - Tales - series.md"]);
        for file in md_files(&reviews) {
            let content = fs::read_to_string(reviews.join(file)).unwrap();
            assert!(content.contains("[[Mark Twain]]"));
            assert!(!content.contains("Clemens"));
        }

        // Running the pass again is a no-op.
        library.merge_author_names().unwrap();
        assert_eq!(library.stat.authors_renamed, 2);
        assert_eq!(md_files(&authors_dir), ["Mark Twain.md"]);
    }
}
