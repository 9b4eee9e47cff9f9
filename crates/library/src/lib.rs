pub mod author;
pub mod book;
pub mod error;
pub mod library;
mod note;
pub mod record;
pub mod series;
mod stat;

pub use crate::author::{AuthorFile, AuthorRef};
pub use crate::book::{BookFile, BookRef, RenamedSeries};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::library::{AUTHORS_SUBFOLDER, Library, REVIEWS_SUBFOLDER, TOREAD_SUBFOLDER};
pub use crate::note::{Note, NoteFile};
pub use crate::record::BookRecord;
pub use crate::series::{SeriesFile, SeriesRef};
pub use crate::stat::Stat;
