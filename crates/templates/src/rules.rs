//! Extraction rules: configured patterns that recover entity fields from
//! rendered note text.
//!
//! Each rule pairs a regular expression with named capture-group positions
//! and produces a strongly-typed result, so callers never index a match by a
//! config-declared number themselves. Rules of one kind are grouped into an
//! ordered [`RuleList`]; selection is always by declaration order, not by
//! pattern specificity.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use regex::{Captures, Regex};

/// A single extraction rule producing a typed result from a regex match.
pub trait Extract {
    /// The typed value recovered from one match.
    type Output;

    fn regex(&self) -> &Regex;

    /// Converts a successful match into the typed output.
    fn capture(&self, caps: &Captures<'_>) -> Result<Self::Output>;
}

/// An ordered list of extraction rules of one kind.
///
/// `choose` returns the first rule whose pattern matches anywhere in the
/// text, in declaration order. The tie-break is deliberate: a bundle author
/// lists the preferred rule first, and nothing here second-guesses that.
#[derive(Debug, Clone)]
pub struct RuleList<R> {
    rules: Vec<R>,
}

impl<R: Extract> RuleList<R> {
    pub fn new(rules: Vec<R>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule whose pattern search-matches `text`, in declaration order.
    pub fn choose(&self, text: &str) -> Option<&R> {
        self.rules.iter().find(|rule| rule.regex().is_match(text))
    }

    /// Extracts the first match of the chosen rule, or `None` when no rule
    /// matches. What "no match" means is the caller's decision: a required
    /// identity field treats it as a parse failure, an optional repeatable
    /// field as an empty list.
    pub fn extract_first(&self, text: &str) -> Result<Option<R::Output>> {
        match self.choose(text) {
            None => Ok(None),
            Some(rule) => match rule.regex().captures(text) {
                None => Ok(None),
                Some(caps) => rule.capture(&caps).map(Some),
            },
        }
    }

    /// Extracts every match of the chosen rule, in text order.
    pub fn extract_all(&self, text: &str) -> Result<Vec<R::Output>> {
        match self.choose(text) {
            None => Ok(Vec::new()),
            Some(rule) => rule.regex().captures_iter(text).map(|caps| rule.capture(&caps)).collect(),
        }
    }
}

/// Compiles a configured pattern, raising [`ErrorKind::Rule`] on bad syntax.
fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).or_raise(|| ErrorKind::Rule(format!("pattern `{pattern}` does not compile")))
}

/// Checks that a configured group index exists in the compiled pattern.
fn validate_group(regex: &Regex, group: usize, field: &'static str) -> Result<usize> {
    if group == 0 || group >= regex.captures_len() {
        exn::bail!(ErrorKind::Rule(format!(
            "group {group} ({field}) is out of range for pattern `{}`",
            regex.as_str()
        )));
    }
    Ok(group)
}

/// Reads a capture group that is expected to participate in the match.
fn group_text(caps: &Captures<'_>, group: usize, field: &'static str) -> Result<String> {
    caps.get(group)
        .map(|m| m.as_str().to_string())
        .ok_or_raise(|| ErrorKind::Rule(format!("group {group} ({field}) did not participate in the match")))
}

/// Recovers one author alias per match from author note content.
#[derive(Debug, Clone)]
pub struct AuthorNameRule {
    regex: Regex,
    name_group: usize,
}

impl AuthorNameRule {
    pub fn new(pattern: &str, name_group: usize) -> Result<Self> {
        let regex = compile(pattern)?;
        let name_group = validate_group(&regex, name_group, "name")?;
        Ok(Self { regex, name_group })
    }
}

impl Extract for AuthorNameRule {
    type Output = String;

    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn capture(&self, caps: &Captures<'_>) -> Result<String> {
        group_text(caps, self.name_group, "name")
    }
}

/// The identity fields recovered from a book's catalog link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLink {
    pub author: String,
    pub title: String,
    pub book_id: String,
}

/// Recovers a [`BookLink`] from book note content.
#[derive(Debug, Clone)]
pub struct BookLinkRule {
    regex: Regex,
    author_group: usize,
    title_group: usize,
    book_id_group: usize,
}

impl BookLinkRule {
    pub fn new(pattern: &str, author_group: usize, title_group: usize, book_id_group: usize) -> Result<Self> {
        let regex = compile(pattern)?;
        Ok(Self {
            author_group: validate_group(&regex, author_group, "author")?,
            title_group: validate_group(&regex, title_group, "title")?,
            book_id_group: validate_group(&regex, book_id_group, "book-id")?,
            regex,
        })
    }
}

impl Extract for BookLinkRule {
    type Output = BookLink;

    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn capture(&self, caps: &Captures<'_>) -> Result<BookLink> {
        Ok(BookLink {
            author: group_text(caps, self.author_group, "author")?,
            title: group_text(caps, self.title_group, "title")?,
            book_id: group_text(caps, self.book_id_group, "book-id")?,
        })
    }
}

/// Recovers one referenced series title per match from book note content.
#[derive(Debug, Clone)]
pub struct SeriesLinkRule {
    regex: Regex,
    title_group: usize,
}

impl SeriesLinkRule {
    pub fn new(pattern: &str, title_group: usize) -> Result<Self> {
        let regex = compile(pattern)?;
        let title_group = validate_group(&regex, title_group, "title")?;
        Ok(Self { regex, title_group })
    }
}

impl Extract for SeriesLinkRule {
    type Output = String;

    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn capture(&self, caps: &Captures<'_>) -> Result<String> {
        group_text(caps, self.title_group, "title")
    }
}

/// The identity fields recovered from series note content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesHeader {
    pub author: String,
    pub title: String,
}

/// Recovers a [`SeriesHeader`] from series note content.
#[derive(Debug, Clone)]
pub struct SeriesContentRule {
    regex: Regex,
    author_group: usize,
    title_group: usize,
}

impl SeriesContentRule {
    pub fn new(pattern: &str, author_group: usize, title_group: usize) -> Result<Self> {
        let regex = compile(pattern)?;
        Ok(Self {
            author_group: validate_group(&regex, author_group, "author")?,
            title_group: validate_group(&regex, title_group, "title")?,
            regex,
        })
    }
}

impl Extract for SeriesContentRule {
    type Output = SeriesHeader;

    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn capture(&self, caps: &Captures<'_>) -> Result<SeriesHeader> {
        Ok(SeriesHeader {
            author: group_text(caps, self.author_group, "author")?,
            title: group_text(caps, self.title_group, "title")?,
        })
    }
}

/// Classifies a file by name alone, without opening it.
///
/// Used by folder scans to tell series descriptors apart from book notes
/// before any content is read.
#[derive(Debug, Clone)]
pub struct FileNameRule {
    regex: Regex,
}

impl FileNameRule {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self { regex: compile(pattern)? })
    }
}

impl Extract for FileNameRule {
    type Output = ();

    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn capture(&self, _caps: &Captures<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_is_declaration_order() {
        let rules = RuleList::new(vec![
            AuthorNameRule::new("a(x)?", 1).unwrap(),
            AuthorNameRule::new("(b)", 1).unwrap(),
        ]);
        // Both patterns match "ab"; the first declared wins even though the
        // second is the more specific match.
        assert_eq!(rules.choose("ab").unwrap().regex().as_str(), "a(x)?");
        assert_eq!(rules.choose("b").unwrap().regex().as_str(), "(b)");
        assert!(rules.choose("z").is_none());
    }

    #[test]
    fn extract_all_returns_matches_in_text_order() {
        let rules = RuleList::new(vec![AuthorNameRule::new(r"\[([^]]+)\]", 1).unwrap()]);
        let names = rules.extract_all("[One] text [Two] more [Three]").unwrap();
        assert_eq!(names, ["One", "Two", "Three"]);
    }

    #[test]
    fn extract_first_is_none_without_match() {
        let rules = RuleList::new(vec![SeriesLinkRule::new(r"series: (\w+)", 1).unwrap()]);
        assert!(rules.extract_first("nothing here").unwrap().is_none());
    }

    #[test]
    fn book_link_rule_yields_typed_fields() {
        let rule = BookLinkRule::new(r"\[\[([^]]+)\]\] - \[([^]]+)\]\(show/(\d+)\)", 1, 2, 3).unwrap();
        let caps = rule.regex().captures("[[Jules Verne]] - [Around the World](show/54479)").unwrap();
        let link = rule.capture(&caps).unwrap();
        assert_eq!(
            link,
            BookLink {
                author: "Jules Verne".into(),
                title: "Around the World".into(),
                book_id: "54479".into(),
            }
        );
    }

    #[test]
    fn bad_pattern_is_a_rule_error() {
        assert!(AuthorNameRule::new("(unclosed", 1).is_err());
    }

    #[test]
    fn out_of_range_group_is_a_rule_error() {
        assert!(AuthorNameRule::new("(a)", 2).is_err());
        assert!(AuthorNameRule::new("(a)", 0).is_err());
    }

    #[test]
    fn optional_group_that_does_not_participate_is_an_error() {
        let rules = RuleList::new(vec![AuthorNameRule::new("a(x)?", 1).unwrap()]);
        assert!(rules.extract_first("a").is_err());
    }
}
