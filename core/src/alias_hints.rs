//! Nullability-hint quoting.
//!
//! A column alias ending in `!` (force NOT NULL) or `?` (force nullable) is
//! not valid SQL on its own, so the hint is smuggled through the server as a
//! quoted identifier: `SELECT COUNT(*) AS total!` becomes
//! `SELECT COUNT(*) AS "total!"`, and RowDescription then carries the hint
//! back verbatim for the introspector to strip.

use crate::scanner::{ident_end, is_ident_start, skip_region};

/// Wrap every bare identifier immediately followed by `!` or `?` in double
/// quotes. Identifiers inside strings, comments, or already-quoted names are
/// left alone, as is `!` that begins a `!=` comparison.
pub fn quote_alias_hints(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut copy_from = 0;
    let mut i = 0;
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        if is_ident_start(bytes[i]) {
            let end = ident_end(bytes, i);
            let hinted = match bytes.get(end) {
                Some(b'!') => bytes.get(end + 1) != Some(&b'='),
                Some(b'?') => true,
                _ => false,
            };
            if hinted {
                out.push_str(&sql[copy_from..i]);
                out.push('"');
                out.push_str(&sql[i..=end]);
                out.push('"');
                copy_from = end + 1;
                i = end + 1;
            } else {
                // The byte at `end` may open a skip region; leave it to the
                // top of the loop.
                i = end;
            }
        } else {
            i += 1;
        }
    }
    out.push_str(&sql[copy_from..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_null_hint() {
        assert_eq!(
            quote_alias_hints("SELECT COUNT(*) AS total! FROM posts"),
            "SELECT COUNT(*) AS \"total!\" FROM posts"
        );
    }

    #[test]
    fn test_nullable_hint() {
        assert_eq!(
            quote_alias_hints("SELECT max(score) AS best? FROM games"),
            "SELECT max(score) AS \"best?\" FROM games"
        );
    }

    #[test]
    fn test_unhinted_sql_is_untouched() {
        let sql = "SELECT id, name FROM users WHERE id = $1";
        assert_eq!(quote_alias_hints(sql), sql);
    }

    #[test]
    fn test_not_equals_is_not_a_hint() {
        let sql = "SELECT id FROM t WHERE status!= 'done'";
        assert_eq!(quote_alias_hints(sql), sql);
    }

    #[test]
    fn test_hints_in_strings_and_comments_are_ignored() {
        let sql = "SELECT 'lit!' AS a, b -- c!\nFROM \"already!\" t";
        assert_eq!(quote_alias_hints(sql), sql);
    }

    #[test]
    fn test_region_abutting_an_identifier_is_still_skipped() {
        // No separating byte between the identifier and the region opener.
        let sql = "SELECT id FROM t WHERE tag LIKE'urgent!'";
        assert_eq!(quote_alias_hints(sql), sql);

        let sql = "SELECT c/*x!*/ FROM t";
        assert_eq!(quote_alias_hints(sql), sql);

        let sql = "SELECT id--c!\nFROM t";
        assert_eq!(quote_alias_hints(sql), sql);

        let sql = "SELECT t\"Col!\" FROM x";
        assert_eq!(quote_alias_hints(sql), sql);
    }

    #[test]
    fn test_multiple_hints() {
        assert_eq!(
            quote_alias_hints("SELECT a.id AS id!, sum(x) AS total? FROM a"),
            "SELECT a.id AS \"id!\", sum(x) AS \"total?\" FROM a"
        );
    }
}
