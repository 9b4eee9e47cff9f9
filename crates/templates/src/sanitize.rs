//! File-name sanitization for cloud-synced note folders.
//!
//! Target filesystems (OneDrive, iCloud, Android) reject or mangle a handful
//! of characters, so every rendered file name passes through a fixed
//! substitution map. The map is idempotent: no replacement text contains a
//! character that is itself substituted.

/// Replaces characters unsafe in note file names with benign substitutes.
///
/// The substitutions are fixed rather than configurable so that a file name
/// rendered on one machine matches the name parsed back on another.
///
/// ```
/// use shelfmark_templates::clean_file_name;
/// assert_eq!(clean_file_name("AC/DC: Best Of*"), "AC_DC Best Ofx");
/// ```
pub fn clean_file_name(file_name: &str) -> String {
    let mut cleaned = String::with_capacity(file_name.len());
    for ch in file_name.chars() {
        match ch {
            '%' => cleaned.push_str(" percent"),
            ':' | ',' | '?' => {},
            '/' | '\\' | '|' => cleaned.push('_'),
            '[' | '<' => cleaned.push('('),
            ']' | '>' => cleaned.push(')'),
            '*' => cleaned.push('x'),
            '"' => cleaned.push('\''),
            '#' => cleaned.push('@'),
            other => cleaned.push(other),
        }
    }
    cleaned
}
