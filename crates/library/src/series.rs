//! Series notes: identity, filename classification, and author renames.

use crate::author::{AuthorFile, AuthorRef};
use crate::error::{ErrorKind, Result};
use crate::note::{Note, NoteFile, file_stem};
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use shelfmark_templates::TemplateSet;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Shared handle to a series.
pub type SeriesRef = Rc<RefCell<SeriesFile>>;

/// A series descriptor note. Identity is the `(author, title)` pair, both
/// parsed from a single content rule.
#[derive(Debug)]
pub struct SeriesFile {
    templates: Rc<TemplateSet>,
    note: NoteFile,
    pub author: AuthorRef,
    pub title: String,
}

#[derive(Serialize)]
struct SeriesContext<'a> {
    author: &'a str,
    title: &'a str,
}

impl SeriesFile {
    pub fn new(
        templates: Rc<TemplateSet>,
        folder: Option<PathBuf>,
        author: AuthorRef,
        title: impl Into<String>,
    ) -> Self {
        Self { templates, note: NoteFile::in_folder(folder), author, title: title.into() }
    }

    /// A series loaded from an existing note. The author/title header must
    /// be extractable or construction fails with [`ErrorKind::Parse`]; the
    /// embedded author name is resolved through `resolve`.
    pub fn from_file(
        templates: Rc<TemplateSet>,
        folder: PathBuf,
        file_name: String,
        content: String,
        mut resolve: impl FnMut(&str) -> Result<AuthorRef>,
    ) -> Result<Self> {
        let header = templates
            .series
            .content
            .extract_first(&content)
            .or_raise(|| ErrorKind::Parse)?
            .ok_or_raise(|| ErrorKind::Parse)?;
        let author = resolve(&header.author)?;
        Ok(Self { templates, note: NoteFile::loaded(folder, file_name, content), author, title: header.title })
    }

    pub fn into_ref(self) -> SeriesRef {
        Rc::new(RefCell::new(self))
    }

    /// Whether `file_name` looks like a series descriptor. Folder scans use
    /// this to classify files without opening them.
    pub fn is_file_name(templates: &TemplateSet, file_name: &str) -> bool {
        templates.series.file_names.choose(file_name).is_some()
    }

    /// Points this series at a different author via the same minimal-edit
    /// cascade as books: delete the old file, swap the author link in the
    /// content, recompute the file name, write.
    pub fn rename_author(&mut self, new_author: &AuthorRef) -> Result<()> {
        self.delete_file()?;
        let old_author_link = self.author.borrow_mut().file_link()?;
        let new_author_link = new_author.borrow_mut().file_link()?;
        let content = self.content()?.replace(&old_author_link, &new_author_link);
        self.note.content = Some(content);
        self.author = Rc::clone(new_author);
        self.reset_file_name();
        self.write()
    }

    /// Renders a default series and re-parses it, verifying content rules
    /// and the filename classification against the rendered output.
    pub fn check(templates: &Rc<TemplateSet>) -> Result<()> {
        let author_name = "Mark Twain";
        let title = "title";
        let author = AuthorFile::new(Rc::clone(templates), None, author_name).into_ref();
        let mut series = SeriesFile::new(Rc::clone(templates), None, author, title);
        let body = series.render_body()?;
        let header = templates
            .series
            .content
            .extract_first(&body)
            .or_raise(|| ErrorKind::Parse)?
            .ok_or_raise(|| ErrorKind::Check("rendered series note has no author/title header".into()))?;
        if header.author != author_name {
            exn::bail!(ErrorKind::Check(format!("series author parsed back as `{}`", header.author)));
        }
        if header.title != title {
            exn::bail!(ErrorKind::Check(format!("series title parsed back as `{}`", header.title)));
        }
        let file_name = series.file_name()?;
        if !Self::is_file_name(templates, &file_name) {
            exn::bail!(ErrorKind::Check(format!("series file name `{file_name}` is not classified as a series")));
        }
        Ok(())
    }
}

impl Note for SeriesFile {
    fn note(&self) -> &NoteFile {
        &self.note
    }

    fn note_mut(&mut self) -> &mut NoteFile {
        &mut self.note
    }

    fn render_file_name(&self) -> Result<String> {
        let author = self.author.borrow();
        let ctx = SeriesContext { author: &author.name, title: &self.title };
        self.templates.series.template.render_file_name(&ctx).or_raise(|| ErrorKind::Render)
    }

    fn render_body(&mut self) -> Result<String> {
        let author = self.author.borrow();
        let ctx = SeriesContext { author: &author.name, title: &self.title };
        self.templates.series.template.render_body(&ctx).or_raise(|| ErrorKind::Render)
    }

    fn file_link(&mut self) -> Result<String> {
        let templates = Rc::clone(&self.templates);
        let link = {
            let author = self.author.borrow();
            let ctx = SeriesContext { author: &author.name, title: &self.title };
            templates.series.template.render_file_link(&ctx).or_raise(|| ErrorKind::Render)?
        };
        match link {
            Some(link) => Ok(link),
            None => Ok(file_stem(&self.file_name()?).to_string()),
        }
    }
}

impl PartialEq for SeriesFile {
    fn eq(&self, other: &Self) -> bool {
        self.note == other.note
    }
}
