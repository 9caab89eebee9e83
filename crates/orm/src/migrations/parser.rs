//! Change-set parsing
//!
//! A change-set file holds one UP marker and at most one DOWN marker. Text
//! before the DOWN marker is the apply part, text after it the revert part.
//! Statements are split on `;` with no knowledge of SQL, so a semicolon
//! inside a string literal or comment splits the statement it appears in.

use super::definitions::{DOWN_MARKER, UP_MARKER};

/// Split raw change-set text into `(apply, revert)` statement lists
///
/// A missing UP marker is tolerated: the whole text before the DOWN marker
/// is used as the apply part.
pub fn parse_change_set(content: &str) -> (Vec<String>, Vec<String>) {
    let (up_part, down_part) = match content.split_once(DOWN_MARKER) {
        Some((up, down)) => (up, down),
        None => (content, ""),
    };

    let up_part = up_part.replacen(UP_MARKER, "", 1);

    (split_sql_statements(&up_part), split_sql_statements(down_part))
}

/// Split on `;`, trim each piece and drop the empty ones
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
