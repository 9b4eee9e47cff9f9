//! Book notes: parsing, rendering, collision-safe writes, and the author
//! rename cascade.

use crate::author::{AuthorFile, AuthorRef};
use crate::error::{ErrorKind, Result};
use crate::note::{self, Note, NoteFile, file_stem};
use crate::record::BookRecord;
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use shelfmark_templates::TemplateSet;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

/// Shared handle to a book.
pub type BookRef = Rc<RefCell<BookFile>>;

/// Marker tag present in every rendered book note.
const BOOK_MARKER_TAG: &str = "#book/book";

fn rating_tag(rating: u8) -> String {
    format!("#book/rating{rating}")
}

/// Series files deleted and created by a rename cascade, keyed by series
/// title.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenamedSeries {
    pub deleted: BTreeMap<String, PathBuf>,
    pub created: BTreeMap<String, PathBuf>,
}

/// A book's note file.
///
/// Identity is the external `book_id`; the `(author, title)` pair determines
/// the file name, with a `book_id` suffix added only on a genuine collision
/// between different books.
#[derive(Debug)]
pub struct BookFile {
    templates: Rc<TemplateSet>,
    note: NoteFile,
    pub author: AuthorRef,
    pub title: String,
    pub book_id: String,
    pub tags: Vec<String>,
    pub rating: u8,
    pub isbn: Option<u64>,
    pub isbn13: Option<u64>,
    pub review: String,
    /// Titles of series this book references.
    pub series_titles: Vec<String>,
}

#[derive(Serialize)]
struct BookContext {
    title: String,
    author: String,
    book_id: String,
    tags: Vec<String>,
    rating: u8,
    has_isbn: bool,
    isbn: String,
    has_isbn13: bool,
    isbn13: String,
    review: String,
    series_links: Vec<String>,
}

#[derive(Serialize)]
struct SeriesNameContext<'a> {
    author: &'a str,
    title: &'a str,
}

impl BookFile {
    /// A book built from an ingestion record; name and content render on
    /// first access.
    pub fn from_record(
        templates: Rc<TemplateSet>,
        folder: Option<PathBuf>,
        author: AuthorRef,
        record: BookRecord,
    ) -> Self {
        Self {
            templates,
            note: NoteFile::in_folder(folder),
            author,
            title: record.title,
            book_id: record.book_id,
            tags: record.tags,
            rating: record.rating,
            isbn: record.isbn,
            isbn13: record.isbn13,
            review: record.review,
            series_titles: record.series,
        }
    }

    /// A book loaded from an existing note.
    ///
    /// The catalog link must be extractable or construction fails with
    /// [`ErrorKind::Parse`]; missing series links just mean an empty list.
    /// The embedded author name is resolved to a shared [`AuthorRef`]
    /// through `resolve` (the library's get-or-create factory).
    pub fn from_file(
        templates: Rc<TemplateSet>,
        folder: PathBuf,
        file_name: String,
        content: String,
        mut resolve: impl FnMut(&str) -> Result<AuthorRef>,
    ) -> Result<Self> {
        let link = templates
            .book
            .goodreads_link
            .extract_first(&content)
            .or_raise(|| ErrorKind::Parse)?
            .ok_or_raise(|| ErrorKind::Parse)?;
        let series_titles = templates.book.series.extract_all(&content).or_raise(|| ErrorKind::Parse)?;
        let author = resolve(&link.author)?;
        Ok(Self {
            templates,
            note: NoteFile::loaded(folder, file_name, content),
            author,
            title: link.title,
            book_id: link.book_id,
            tags: Vec::new(),
            rating: 0,
            isbn: None,
            isbn13: None,
            review: String::new(),
            series_titles,
        })
    }

    pub fn into_ref(self) -> BookRef {
        Rc::new(RefCell::new(self))
    }

    fn author_name(&self) -> String {
        self.author.borrow().name.clone()
    }

    fn ctx(&self) -> Result<BookContext> {
        let series_links =
            self.series_titles.iter().map(|title| self.series_link(title)).collect::<Result<Vec<_>>>()?;
        Ok(BookContext {
            title: self.title.clone(),
            author: self.author_name(),
            book_id: self.book_id.clone(),
            tags: self.tags.clone(),
            rating: self.rating,
            has_isbn: self.isbn.is_some(),
            isbn: self.isbn.map(|value| value.to_string()).unwrap_or_default(),
            has_isbn13: self.isbn13.is_some(),
            isbn13: self.isbn13.map(|value| value.to_string()).unwrap_or_default(),
            review: self.review.clone(),
            series_links,
        })
    }

    /// The cross-reference text for one of this book's series under the
    /// current author.
    pub fn series_link(&self, title: &str) -> Result<String> {
        let author = self.author_name();
        let ctx = SeriesNameContext { author: &author, title };
        match self.templates.series.template.render_file_link(&ctx).or_raise(|| ErrorKind::Render)? {
            Some(link) => Ok(link),
            None => {
                let name = self.templates.series.template.render_file_name(&ctx).or_raise(|| ErrorKind::Render)?;
                Ok(file_stem(&name).to_string())
            },
        }
    }

    fn series_file_name(&self, title: &str) -> Result<String> {
        let author = self.author_name();
        let ctx = SeriesNameContext { author: &author, title };
        self.templates.series.template.render_file_name(&ctx).or_raise(|| ErrorKind::Render)
    }

    /// Series links for every referenced series, keyed by title.
    pub fn series_links(&self) -> Result<BTreeMap<String, String>> {
        self.series_titles.iter().map(|title| Ok((title.clone(), self.series_link(title)?))).collect()
    }

    fn folder(&self) -> Result<PathBuf> {
        self.note.folder.clone().ok_or_raise(|| ErrorKind::Detached)
    }

    /// Creates a note file for every referenced series that does not exist
    /// yet; files already on disk are left untouched.
    pub fn create_series_files(&self) -> Result<BTreeMap<String, PathBuf>> {
        let folder = self.folder()?;
        let author = self.author_name();
        let mut created = BTreeMap::new();
        for title in &self.series_titles {
            let path = folder.join(self.series_file_name(title)?);
            if !path.is_file() {
                let ctx = SeriesNameContext { author: &author, title };
                let body = self.templates.series.template.render_body(&ctx).or_raise(|| ErrorKind::Render)?;
                fs::write(&path, body).or_raise(|| ErrorKind::Io)?;
                created.insert(title.clone(), path);
            }
        }
        Ok(created)
    }

    /// Deletes the note files of every referenced series under the current
    /// author identity.
    pub fn delete_series_files(&self) -> Result<BTreeMap<String, PathBuf>> {
        let folder = self.folder()?;
        let mut deleted = BTreeMap::new();
        for title in &self.series_titles {
            let path = folder.join(self.series_file_name(title)?);
            if path.exists() {
                fs::remove_file(&path).or_raise(|| ErrorKind::Io)?;
                deleted.insert(title.clone(), path);
            }
        }
        Ok(deleted)
    }

    /// Points this book at a different author, keeping every user edit in
    /// the note intact.
    ///
    /// Only the author link and the series links are substring-replaced in
    /// the content; the rest, review text included, is never re-rendered.
    /// Series files move with the book: the ones under the old identity are
    /// deleted and any now-missing ones are recreated under the new name.
    pub fn rename_author(&mut self, new_author: &AuthorRef) -> Result<RenamedSeries> {
        let old_series_links = self.series_links()?;
        let deleted = self.delete_series_files()?;
        self.delete_file()?;
        let old_author_link = self.author.borrow_mut().file_link()?;
        let new_author_link = new_author.borrow_mut().file_link()?;
        let content = self.content()?.replace(&old_author_link, &new_author_link);
        self.note.content = Some(content);
        self.author = Rc::clone(new_author);
        self.reset_file_name();
        for (title, old_link) in &old_series_links {
            let new_link = self.series_link(title)?;
            let content = self.content()?.replace(old_link.as_str(), &new_link);
            self.note.content = Some(content);
        }
        let created = self.create_series_files()?;
        self.write()?;
        Ok(RenamedSeries { deleted, created })
    }

    /// Renders a known book and re-parses it, verifying that the configured
    /// rules recover every identity field from the rendered note.
    pub fn check(templates: &Rc<TemplateSet>) -> Result<()> {
        let record = BookRecord {
            book_id: "54479".into(),
            title: "Around the World in Eighty Days".into(),
            author: "Jules Verne".into(),
            rating: 5,
            review: "This is a review\nin two lines".into(),
            tags: ["#adventure", "#classics", "#fiction", "#novel", "#travel"]
                .map(String::from)
                .to_vec(),
            isbn: None,
            isbn13: None,
            series: vec!["Voyages extraordinaires".into()],
        };
        let author = AuthorFile::new(Rc::clone(templates), None, &record.author).into_ref();
        let mut book = BookFile::from_record(Rc::clone(templates), None, author, record.clone());
        let body = book.render_body()?;
        let link = templates
            .book
            .goodreads_link
            .extract_first(&body)
            .or_raise(|| ErrorKind::Parse)?
            .ok_or_raise(|| ErrorKind::Check("rendered book note has no catalog link".into()))?;
        let series = templates.book.series.extract_all(&body).or_raise(|| ErrorKind::Parse)?;
        if link.book_id != record.book_id {
            exn::bail!(ErrorKind::Check(format!("book id parsed back as `{}`", link.book_id)));
        }
        if link.title != record.title {
            exn::bail!(ErrorKind::Check(format!("book title parsed back as `{}`", link.title)));
        }
        if link.author != record.author {
            exn::bail!(ErrorKind::Check(format!("book author parsed back as `{}`", link.author)));
        }
        if series != record.series {
            exn::bail!(ErrorKind::Check(format!("book series parsed back as {series:?}")));
        }
        Ok(())
    }
}

impl Note for BookFile {
    fn note(&self) -> &NoteFile {
        &self.note
    }

    fn note_mut(&mut self) -> &mut NoteFile {
        &mut self.note
    }

    fn render_file_name(&self) -> Result<String> {
        let ctx = self.ctx()?;
        self.templates.book.template.render_file_name(&ctx).or_raise(|| ErrorKind::Render)
    }

    /// Renders the body, first making sure the tag collection carries the
    /// book marker and, for rated books, the rating-tier tag. Both
    /// insertions are idempotent.
    fn render_body(&mut self) -> Result<String> {
        if !self.tags.iter().any(|tag| tag == BOOK_MARKER_TAG) {
            self.tags.push(BOOK_MARKER_TAG.to_string());
        }
        if self.rating > 0 {
            let tier = rating_tag(self.rating);
            if !self.tags.contains(&tier) {
                self.tags.push(tier);
            }
        }
        let ctx = self.ctx()?;
        self.templates.book.template.render_body(&ctx).or_raise(|| ErrorKind::Render)
    }

    fn file_link(&mut self) -> Result<String> {
        let templates = Rc::clone(&self.templates);
        let ctx = self.ctx()?;
        match templates.book.template.render_file_link(&ctx).or_raise(|| ErrorKind::Render)? {
            Some(link) => Ok(link),
            None => Ok(file_stem(&self.file_name()?).to_string()),
        }
    }

    /// Persists the note, disambiguating the file name with a `book_id`
    /// suffix when the target name is already taken by a different book. A
    /// repeat write of the same book (its id already embedded in the name)
    /// never appends the suffix again.
    fn write(&mut self) -> Result<()> {
        let name = self.file_name()?;
        if let Some(folder) = self.note.folder.clone()
            && !self.book_id.is_empty()
            && folder.join(&name).exists()
            && !name.contains(&self.book_id)
        {
            let disambiguated = match name.rsplit_once('.') {
                Some((stem, extension)) => format!("{stem} - {}.{extension}", self.book_id),
                None => format!("{name} - {}", self.book_id),
            };
            tracing::debug!(old = %name, new = %disambiguated, "book file name collision");
            self.note.file_name = Some(disambiguated);
        }
        note::persist(self)
    }
}

impl PartialEq for BookFile {
    fn eq(&self, other: &Self) -> bool {
        self.note == other.note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_templates::{DEFAULT_BUILTIN_TEMPLATES, TemplatesLoader};

    fn templates() -> Rc<TemplateSet> {
        Rc::new(TemplatesLoader::builtin(DEFAULT_BUILTIN_TEMPLATES).unwrap())
    }

    fn verne_record() -> BookRecord {
        BookRecord {
            book_id: "54479".into(),
            title: "Around the World in Eighty Days".into(),
            author: "Jules Verne".into(),
            rating: 5,
            review: "A classic.".into(),
            series: vec!["Voyages extraordinaires".into()],
            ..BookRecord::default()
        }
    }

    fn detached_book(record: BookRecord) -> BookFile {
        let templates = templates();
        let author = AuthorFile::new(Rc::clone(&templates), None, &record.author).into_ref();
        BookFile::from_record(templates, None, author, record)
    }

    #[test]
    fn default_book_round_trips() {
        assert!(BookFile::check(&templates()).is_ok());
    }

    #[test]
    fn rendered_book_parses_back_through_from_file() {
        let mut book = detached_book(verne_record());
        let body = book.render_body().unwrap();
        let templates = templates();
        let author = AuthorFile::new(Rc::clone(&templates), None, "placeholder").into_ref();
        let parsed = BookFile::from_file(
            templates,
            PathBuf::from("reviews"),
            "whatever.md".into(),
            body,
            |name| {
                assert_eq!(name, "Jules Verne");
                Ok(Rc::clone(&author))
            },
        )
        .unwrap();
        assert_eq!(parsed.book_id, "54479");
        assert_eq!(parsed.title, "Around the World in Eighty Days");
        assert_eq!(parsed.series_titles, ["Voyages extraordinaires"]);
    }

    #[test]
    fn marker_and_rating_tags_are_inserted_once() {
        let mut book = detached_book(verne_record());
        book.render_body().unwrap();
        book.render_body().unwrap();
        assert_eq!(book.tags.iter().filter(|tag| *tag == "#book/book").count(), 1);
        assert_eq!(book.tags.iter().filter(|tag| *tag == "#book/rating5").count(), 1);
    }

    #[test]
    fn unrated_book_gets_no_rating_tag() {
        let mut book = detached_book(BookRecord { rating: 0, ..verne_record() });
        book.render_body().unwrap();
        assert!(!book.tags.iter().any(|tag| tag.starts_with("#book/rating")));
    }

    #[test]
    fn file_name_derives_from_author_and_title() {
        let mut book = detached_book(verne_record());
        assert_eq!(book.file_name().unwrap(), "Jules Verne - Around the World in Eighty Days.md");
    }

    #[test]
    fn parse_without_catalog_link_fails() {
        let templates = templates();
        let result = BookFile::from_file(
            Rc::clone(&templates),
            PathBuf::from("reviews"),
            "note.md".into(),
            "free-form note\n".into(),
            |_| unreachable!("no author should be resolved"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn collision_appends_book_id_suffix_once() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_path_buf();
        let templates = templates();
        let author = AuthorFile::new(Rc::clone(&templates), None, "Jules Verne").into_ref();

        let mut first = BookFile::from_record(
            Rc::clone(&templates),
            Some(folder.clone()),
            Rc::clone(&author),
            BookRecord { book_id: "1".into(), ..verne_record() },
        );
        first.write().unwrap();
        assert_eq!(first.file_name().unwrap(), "Jules Verne - Around the World in Eighty Days.md");

        // A different book normalizing to the same name gets the suffix.
        let mut second = BookFile::from_record(
            Rc::clone(&templates),
            Some(folder.clone()),
            Rc::clone(&author),
            BookRecord { book_id: "2".into(), ..verne_record() },
        );
        second.write().unwrap();
        assert_eq!(second.file_name().unwrap(), "Jules Verne - Around the World in Eighty Days - 2.md");
        assert!(folder.join("Jules Verne - Around the World in Eighty Days - 2.md").is_file());

        // A repeat write of the suffixed book does not suffix again.
        second.write().unwrap();
        assert_eq!(second.file_name().unwrap(), "Jules Verne - Around the World in Eighty Days - 2.md");
    }

    #[test]
    fn rename_author_cascades_and_preserves_review() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_path_buf();
        let templates = templates();
        let old_author = AuthorFile::new(Rc::clone(&templates), None, "Jules Verne").into_ref();
        let new_author = AuthorFile::new(Rc::clone(&templates), None, "Jules Gabriel Verne").into_ref();

        let mut book = BookFile::from_record(
            Rc::clone(&templates),
            Some(folder.clone()),
            old_author,
            verne_record(),
        );
        // Simulate a user edit that must survive the rename untouched.
        let edited = format!("{}\nMy own margin note.\n", book.content().unwrap());
        book.note.content = Some(edited);
        book.write().unwrap();
        book.create_series_files().unwrap();
        assert!(folder.join("Jules Verne - Voyages extraordinaires - series.md").is_file());

        let renamed = book.rename_author(&new_author).unwrap();

        assert_eq!(renamed.deleted.keys().collect::<Vec<_>>(), ["Voyages extraordinaires"]);
        assert_eq!(renamed.created.keys().collect::<Vec<_>>(), ["Voyages extraordinaires"]);
        assert!(!folder.join("Jules Verne - Around the World in Eighty Days.md").exists());
        assert!(!folder.join("Jules Verne - Voyages extraordinaires - series.md").exists());
        assert!(folder.join("Jules Gabriel Verne - Around the World in Eighty Days.md").is_file());
        assert!(folder.join("Jules Gabriel Verne - Voyages extraordinaires - series.md").is_file());

        let content = book.content().unwrap();
        assert!(content.contains("[[Jules Gabriel Verne]]"));
        assert!(!content.contains("[[Jules Verne]]"));
        assert!(content.contains("[[Jules Gabriel Verne - Voyages extraordinaires - series]]"));
        assert!(content.contains("My own margin note."));
    }
}
