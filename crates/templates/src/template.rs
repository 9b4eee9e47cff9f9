//! Note templating for rendered entity files.
//!
//! A [`FileTemplate`] is compiled from a single template document with a
//! fixed line grammar:
//!
//! ```text
//! line 1      file-name template (required)
//! line 2      link template, or empty to derive links from the file name
//! line 3      blank separator
//! line 4...   body template
//! ```
//!
//! Template expressions use [upon]'s Mustache-like syntax (`{{ variable }}`,
//! `{{ value | filter }}`, `{% for %}`, `{% if %}`), extended with two
//! note-specific filters:
//!
//! - **`clean`** — Substitutes characters unsafe in file names, see
//!   [`clean_file_name`](crate::sanitize::clean_file_name).
//! - **`urlencode`** — Percent-encodes a value for embedding in a URL.
//!
//! # Example
//!
//! ```
//! use shelfmark_templates::FileTemplate;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Ctx<'a> {
//!     name: &'a str,
//! }
//!
//! let template: FileTemplate = "{{ name | clean }}.md\n[[{{ name | clean }}]]\n\nHello {{ name }}\n"
//!     .parse()
//!     .unwrap();
//! let ctx = Ctx { name: "Who? Me" };
//! assert_eq!(template.render_file_name(&ctx).unwrap(), "Who Me.md");
//! assert_eq!(template.render_file_link(&ctx).unwrap(), Some("[[Who Me]]".to_string()));
//! assert_eq!(template.render_body(&ctx).unwrap(), "Hello Who? Me\n");
//! ```

use crate::error::{ErrorKind, Result};
use crate::sanitize::clean_file_name;
use exn::ResultExt;
use serde::Serialize;
use std::str::FromStr;
use upon::{Engine, Template};

/// A compiled entity template: file-name, optional link, and body.
///
/// Constructed via [`FromStr`], which compiles all three sub-templates
/// eagerly so that syntax errors surface at load time rather than at render
/// time. The compiled object is reusable across many renders and shared
/// read-only between all entities of one library.
pub struct FileTemplate {
    engine: Engine<'static>,
    file_name: Template<'static>,
    link: Option<Template<'static>>,
    body: Template<'static>,
}

impl FromStr for FileTemplate {
    type Err = crate::error::Error;

    fn from_str(document: &str) -> Result<Self> {
        let mut parts = document.splitn(4, '\n');
        let name_line = parts.next().unwrap_or_default();
        if name_line.trim().is_empty() {
            exn::bail!(ErrorKind::Syntax("first line must be the file-name template"));
        }
        let link_line = parts.next().unwrap_or_default();
        if let Some(separator) = parts.next()
            && !separator.trim().is_empty()
        {
            exn::bail!(ErrorKind::Syntax("third line must be a blank separator"));
        }
        let body = parts.next().unwrap_or_default();

        let mut engine = Engine::new();
        engine.add_filter("clean", filters::clean);
        engine.add_filter("urlencode", filters::urlencode);
        let file_name = engine.compile(name_line.to_string()).or_raise(|| ErrorKind::Render)?;
        let link = match link_line.trim().is_empty() {
            true => None,
            false => Some(engine.compile(link_line.to_string()).or_raise(|| ErrorKind::Render)?),
        };
        let body = engine.compile(body.to_string()).or_raise(|| ErrorKind::Render)?;
        Ok(Self { engine, file_name, link, body })
    }
}

impl FileTemplate {
    /// Renders the file name for the given context.
    ///
    /// The rendered text always passes through the character sanitizer, on
    /// top of any `clean` filters the template itself applies.
    pub fn render_file_name<C: Serialize>(&self, ctx: &C) -> Result<String> {
        let name = self.file_name.render(&self.engine, ctx).to_string().or_raise(|| ErrorKind::Render)?;
        let name = clean_file_name(name.trim());
        if name.is_empty() {
            exn::bail!(ErrorKind::EmptyFileName);
        }
        Ok(name)
    }

    /// Renders the cross-reference link for the given context, or `None`
    /// when the document has no link template and the caller should derive
    /// the link from the file name's stem.
    pub fn render_file_link<C: Serialize>(&self, ctx: &C) -> Result<Option<String>> {
        self.link
            .as_ref()
            .map(|link| link.render(&self.engine, ctx).to_string().or_raise(|| ErrorKind::Render))
            .transpose()
    }

    /// Renders the note body for the given context.
    pub fn render_body<C: Serialize>(&self, ctx: &C) -> Result<String> {
        self.body.render(&self.engine, ctx).to_string().or_raise(|| ErrorKind::Render)
    }
}

impl std::fmt::Debug for FileTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTemplate").field("has_link", &self.link.is_some()).finish_non_exhaustive()
    }
}

/// Custom [`upon`] filters for note-safe string manipulation.
mod filters {
    use crate::sanitize::clean_file_name;

    pub(super) fn clean(value: &str) -> String {
        clean_file_name(value)
    }

    pub(super) fn urlencode(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }
}
