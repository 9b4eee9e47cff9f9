//! Author notes: canonical names, aliases, and merge behavior.

use crate::book::BookRef;
use crate::error::{ErrorKind, Result};
use crate::note::{Note, NoteFile, file_stem};
use crate::series::SeriesRef;
use exn::ResultExt;
use serde::Serialize;
use shelfmark_templates::TemplateSet;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Shared handle to an author. Many alias map entries may point to one.
pub type AuthorRef = Rc<RefCell<AuthorFile>>;

/// An author's note file.
///
/// Identity is the canonical name: the first alias found in content. A note
/// may list further aliases (translations, misspellings); the library's
/// reconciliation pass folds entities registered under those aliases into
/// the note that declares them.
pub struct AuthorFile {
    templates: Rc<TemplateSet>,
    note: NoteFile,
    /// Canonical name, always equal to `names[0]`.
    pub name: String,
    /// All aliases in note order.
    pub names: Vec<String>,
    /// Books owned by this author, populated during folder loads.
    pub books: Vec<BookRef>,
    /// Series owned by this author, populated during folder loads.
    pub series: Vec<SeriesRef>,
}

#[derive(Serialize)]
struct AuthorContext<'a> {
    name: &'a str,
}

impl AuthorFile {
    /// A new or transient author known only by name. The note body renders
    /// a default search-link note on first access.
    pub fn new(templates: Rc<TemplateSet>, folder: Option<PathBuf>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            templates,
            note: NoteFile::in_folder(folder),
            names: vec![name.clone()],
            name,
            books: Vec::new(),
            series: Vec::new(),
        }
    }

    /// An author loaded from an existing note. At least one alias must be
    /// extractable from the content or construction fails with
    /// [`ErrorKind::Parse`]; the content always wins over the file name.
    pub fn from_file(
        templates: Rc<TemplateSet>,
        folder: PathBuf,
        file_name: String,
        content: String,
    ) -> Result<Self> {
        let mut author = Self {
            templates,
            note: NoteFile::loaded(folder, file_name, content),
            name: String::new(),
            names: Vec::new(),
            books: Vec::new(),
            series: Vec::new(),
        };
        author.parse()?;
        Ok(author)
    }

    pub fn into_ref(self) -> AuthorRef {
        Rc::new(RefCell::new(self))
    }

    /// Re-extracts `names` and the canonical `name` from the current content.
    pub fn parse(&mut self) -> Result<()> {
        let Some(content) = &self.note.content else {
            exn::bail!(ErrorKind::Parse);
        };
        let names = self.templates.author.names.extract_all(content).or_raise(|| ErrorKind::Parse)?;
        let Some(first) = names.first() else {
            exn::bail!(ErrorKind::Parse);
        };
        self.name = first.clone();
        self.names = names;
        Ok(())
    }

    /// Replaces the note content and re-parses it.
    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        self.note.content = Some(content.into());
        self.parse()
    }

    /// Whether this note declares aliases beyond its canonical name.
    pub fn is_primary(&self) -> bool {
        self.names.iter().any(|name| name != &self.name)
    }

    fn ctx(&self) -> AuthorContext<'_> {
        AuthorContext { name: &self.name }
    }

    /// Folds `other` into `primary`: every book and series owned by `other`
    /// is renamed to the primary's canonical name and appended to the
    /// primary's lists, then `other`'s backing file is deleted.
    ///
    /// Ownership lists are deduplicated by entity identity, so running the
    /// same merge twice cannot duplicate ownership.
    pub fn merge(primary: &AuthorRef, other: &AuthorRef) -> Result<()> {
        if Rc::ptr_eq(primary, other) {
            return Ok(());
        }
        let books: Vec<BookRef> = other.borrow().books.clone();
        let series: Vec<SeriesRef> = other.borrow().series.clone();
        for book in &books {
            book.borrow_mut().rename_author(primary)?;
        }
        for series_file in &series {
            series_file.borrow_mut().rename_author(primary)?;
        }
        {
            let mut primary_mut = primary.borrow_mut();
            for book in books {
                if !primary_mut.books.iter().any(|existing| Rc::ptr_eq(existing, &book)) {
                    primary_mut.books.push(book);
                }
            }
            for series_file in series {
                if !primary_mut.series.iter().any(|existing| Rc::ptr_eq(existing, &series_file)) {
                    primary_mut.series.push(series_file);
                }
            }
        }
        other.borrow_mut().delete_file()
    }

    /// Renders a default author and re-parses it, verifying that the
    /// configured rules recover the name from the rendered note.
    pub fn check(templates: &Rc<TemplateSet>) -> Result<()> {
        let name = "Mark Twain";
        let mut author = AuthorFile::new(Rc::clone(templates), None, name);
        let body = author.render_body()?;
        author.set_content(body).or_raise(|| {
            ErrorKind::Check("no author name could be parsed back from the rendered author note".into())
        })?;
        if author.names != [name] {
            exn::bail!(ErrorKind::Check(format!(
                "rendered author note for `{name}` parsed back as {:?}",
                author.names
            )));
        }
        Ok(())
    }
}

impl Note for AuthorFile {
    fn note(&self) -> &NoteFile {
        &self.note
    }

    fn note_mut(&mut self) -> &mut NoteFile {
        &mut self.note
    }

    fn render_file_name(&self) -> Result<String> {
        self.templates.author.template.render_file_name(&self.ctx()).or_raise(|| ErrorKind::Render)
    }

    fn render_body(&mut self) -> Result<String> {
        self.templates.author.template.render_body(&self.ctx()).or_raise(|| ErrorKind::Render)
    }

    fn file_link(&mut self) -> Result<String> {
        let templates = Rc::clone(&self.templates);
        let link = templates.author.template.render_file_link(&self.ctx()).or_raise(|| ErrorKind::Render)?;
        match link {
            Some(link) => Ok(link),
            None => Ok(file_stem(&self.file_name()?).to_string()),
        }
    }
}

impl PartialEq for AuthorFile {
    fn eq(&self, other: &Self) -> bool {
        self.note == other.note
    }
}

// The ownership lists point back through their entities to this author, so
// a derived Debug would recurse; print them as counts.
impl std::fmt::Debug for AuthorFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorFile")
            .field("name", &self.name)
            .field("names", &self.names)
            .field("books", &self.books.len())
            .field("series", &self.series.len())
            .finish_non_exhaustive()
    }
}
