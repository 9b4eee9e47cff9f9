//! Template bundles: one [`FileTemplate`] plus its extraction rules per
//! entity kind, loaded once and shared read-only by a whole library.
//!
//! A bundle is a folder of four files — `author.md`, `book.md`, `series.md`
//! and `regex.toml` — either embedded in the binary (the builtin bundles) or
//! supplied by the user. The rule document is TOML, sectioned per entity
//! kind, with one ordered array of rules per concern:
//!
//! ```toml
//! [[author.names]]
//! regex = '...'
//! name-group = 1
//!
//! [[book.goodreads-link]]
//! regex = '...'
//! author-group = 1
//! title-group = 2
//! book-id-group = 3
//! ```

use crate::error::{ErrorKind, Result};
use crate::rules::{AuthorNameRule, BookLinkRule, Extract, FileNameRule, RuleList, SeriesContentRule, SeriesLinkRule};
use crate::template::FileTemplate;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Format, Toml};
use rust_embed::Embed;
use serde::Deserialize;
use std::path::Path;
use tracing::instrument;

/// Name of the builtin bundle used when the caller has no opinion.
pub const DEFAULT_BUILTIN_TEMPLATES: &str = "default";

const AUTHOR_DOCUMENT: &str = "author.md";
const BOOK_DOCUMENT: &str = "book.md";
const SERIES_DOCUMENT: &str = "series.md";
const RULES_DOCUMENT: &str = "regex.toml";

/// Template and rules for author notes.
#[derive(Debug)]
pub struct AuthorTemplates {
    pub template: FileTemplate,
    /// Recovers the alias list; every match is one alias, the first one is
    /// the canonical name.
    pub names: RuleList<AuthorNameRule>,
}

/// Template and rules for book notes.
#[derive(Debug)]
pub struct BookTemplates {
    pub template: FileTemplate,
    /// Recovers the identity triple (author, title, book id). Required.
    pub goodreads_link: RuleList<BookLinkRule>,
    /// Recovers referenced series titles. Optional and repeatable.
    pub series: RuleList<SeriesLinkRule>,
}

/// Template and rules for series notes.
#[derive(Debug)]
pub struct SeriesTemplates {
    pub template: FileTemplate,
    /// Recovers the identity pair (author, title) from content.
    pub content: RuleList<SeriesContentRule>,
    /// Classifies series descriptors by file name alone, so folder scans can
    /// tell them apart from book notes without opening the file.
    pub file_names: RuleList<FileNameRule>,
}

/// One loaded template bundle, shared by all entities of a library.
#[derive(Debug)]
pub struct TemplateSet {
    pub name: String,
    pub author: AuthorTemplates,
    pub book: BookTemplates,
    pub series: SeriesTemplates,
}

#[derive(Debug, Deserialize)]
struct RulesConfig {
    author: AuthorSection,
    book: BookSection,
    series: SeriesSection,
}

#[derive(Debug, Deserialize)]
struct AuthorSection {
    #[serde(default)]
    names: Vec<AuthorNameRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AuthorNameRow {
    regex: String,
    name_group: usize,
}

#[derive(Debug, Deserialize)]
struct BookSection {
    #[serde(default, rename = "goodreads-link")]
    goodreads_link: Vec<BookLinkRow>,
    #[serde(default)]
    series: Vec<SeriesLinkRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BookLinkRow {
    regex: String,
    author_group: usize,
    title_group: usize,
    book_id_group: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SeriesLinkRow {
    regex: String,
    title_group: usize,
}

#[derive(Debug, Deserialize)]
struct SeriesSection {
    #[serde(default)]
    content: Vec<SeriesContentRow>,
    #[serde(default, rename = "file-name")]
    file_name: Vec<FileNameRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SeriesContentRow {
    regex: String,
    author_group: usize,
    title_group: usize,
}

#[derive(Debug, Deserialize)]
struct FileNameRow {
    regex: String,
}

impl TemplateSet {
    /// Builds a set from the four raw bundle documents.
    ///
    /// Fails fast on any malformed template, malformed rule, or empty rule
    /// section; a bundle that loads is fully usable.
    pub fn from_documents(
        name: impl Into<String>,
        author_document: &str,
        book_document: &str,
        series_document: &str,
        rules_document: &str,
    ) -> Result<Self> {
        let name = name.into();
        let config: RulesConfig =
            Figment::from(Toml::string(rules_document)).extract().or_raise(|| ErrorKind::Config)?;

        let author = AuthorTemplates {
            template: author_document.parse()?,
            names: required(
                &name,
                "author.names",
                config.author.names.iter().map(|row| AuthorNameRule::new(&row.regex, row.name_group)).collect(),
            )?,
        };
        let book = BookTemplates {
            template: book_document.parse()?,
            goodreads_link: required(
                &name,
                "book.goodreads-link",
                config
                    .book
                    .goodreads_link
                    .iter()
                    .map(|row| BookLinkRule::new(&row.regex, row.author_group, row.title_group, row.book_id_group))
                    .collect(),
            )?,
            series: required(
                &name,
                "book.series",
                config.book.series.iter().map(|row| SeriesLinkRule::new(&row.regex, row.title_group)).collect(),
            )?,
        };
        let series = SeriesTemplates {
            template: series_document.parse()?,
            content: required(
                &name,
                "series.content",
                config
                    .series
                    .content
                    .iter()
                    .map(|row| SeriesContentRule::new(&row.regex, row.author_group, row.title_group))
                    .collect(),
            )?,
            file_names: required(
                &name,
                "series.file-name",
                config.series.file_name.iter().map(|row| FileNameRule::new(&row.regex)).collect(),
            )?,
        };
        Ok(Self { name, author, book, series })
    }
}

/// Wraps a compiled rule section, rejecting empty ones: a bundle without a
/// rule for a required concern cannot round-trip what it renders.
fn required<R: Extract>(bundle: &str, section: &str, rules: Result<Vec<R>>) -> Result<RuleList<R>> {
    let rules = rules?;
    if rules.is_empty() {
        exn::bail!(ErrorKind::MissingAsset(format!("rule section `{section}` in bundle `{bundle}`")));
    }
    Ok(RuleList::new(rules))
}

#[derive(Embed)]
#[folder = "templates/"]
struct BuiltinBundles;

/// Loads [`TemplateSet`]s from the embedded builtin bundles or from a user
/// supplied folder.
pub struct TemplatesLoader;

impl TemplatesLoader {
    /// Loads a builtin bundle embedded in the binary.
    #[instrument]
    pub fn builtin(name: &str) -> Result<TemplateSet> {
        TemplateSet::from_documents(
            name,
            &Self::asset(name, AUTHOR_DOCUMENT)?,
            &Self::asset(name, BOOK_DOCUMENT)?,
            &Self::asset(name, SERIES_DOCUMENT)?,
            &Self::asset(name, RULES_DOCUMENT)?,
        )
    }

    /// Loads a bundle from a user folder laid out like a builtin one.
    #[instrument]
    pub fn from_folder(folder: &Path) -> Result<TemplateSet> {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_raise(|| ErrorKind::Folder(folder.to_path_buf()))?;
        TemplateSet::from_documents(
            name,
            &Self::file(folder, AUTHOR_DOCUMENT)?,
            &Self::file(folder, BOOK_DOCUMENT)?,
            &Self::file(folder, SERIES_DOCUMENT)?,
            &Self::file(folder, RULES_DOCUMENT)?,
        )
    }

    /// List of all builtin bundle names.
    pub fn builtin_names() -> Vec<String> {
        let mut names: Vec<String> = BuiltinBundles::iter()
            .filter_map(|path| path.split_once('/').map(|(bundle, _)| bundle.to_string()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn asset(bundle: &str, file: &str) -> Result<String> {
        let path = format!("{bundle}/{file}");
        let asset = BuiltinBundles::get(&path).ok_or_raise(|| ErrorKind::MissingAsset(format!("builtin:{path}")))?;
        String::from_utf8(asset.data.into_owned()).or_raise(|| ErrorKind::MissingAsset(format!("builtin:{path}")))
    }

    fn file(folder: &Path, file: &str) -> Result<String> {
        std::fs::read_to_string(folder.join(file)).or_raise(|| ErrorKind::MissingAsset(format!("{file} in {}", folder.display())))
    }
}
