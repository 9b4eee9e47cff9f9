pub mod error;
mod rules;
mod sanitize;
mod set;
mod template;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::rules::{
    AuthorNameRule, BookLink, BookLinkRule, Extract, FileNameRule, RuleList, SeriesContentRule, SeriesHeader,
    SeriesLinkRule,
};
pub use crate::sanitize::clean_file_name;
pub use crate::set::{
    AuthorTemplates, BookTemplates, DEFAULT_BUILTIN_TEMPLATES, SeriesTemplates, TemplateSet, TemplatesLoader,
};
pub use crate::template::FileTemplate;
