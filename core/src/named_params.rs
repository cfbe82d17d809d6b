//! `@name` → `$N` parameter rewriting.
//!
//! sqlc-style named parameters are sugar for positional slots. The rewrite
//! numbers new slots above the highest `$K` already present, so mixing both
//! styles in one query can never collide, and repeated `@x` always maps to
//! a single slot.

use crate::scanner::{ident_end, is_ident_start, placeholder_number, skip_region};

/// Outcome of a rewrite that found at least one `@name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenQuery {
    /// The SQL with every `@name` replaced by its `$K`.
    pub sql: String,
    /// Source names of the newly assigned slots, in slot order.
    pub names: Vec<String>,
    /// Highest `$K` that was already present in the input.
    pub positional_count: u16,
}

/// Rewrite `@name` parameters to positional `$K`. Returns `None` when the
/// input has no named parameter (callers keep the original SQL untouched).
pub fn rewrite_named_params(sql: &str) -> Option<RewrittenQuery> {
    let bytes = sql.as_bytes();

    // Pass 1: highest preexisting $K, and whether any @name occurs at all.
    let mut positional_count: u16 = 0;
    let mut has_named = false;
    let mut i = 0;
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        match bytes[i] {
            b'$' => {
                if let Some((n, end)) = placeholder_number(bytes, i + 1) {
                    positional_count = positional_count.max(n);
                    i = end;
                } else {
                    i += 1;
                }
            }
            b'@' if bytes.get(i + 1).is_some_and(|&b| is_ident_start(b)) => {
                has_named = true;
                i = ident_end(bytes, i + 1);
            }
            _ => i += 1,
        }
    }

    if !has_named {
        return None;
    }

    // Pass 2: emit, assigning each distinct name one slot above the
    // preexisting numbering.
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut copy_from = 0;
    let mut i = 0;
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        if bytes[i] == b'@' && bytes.get(i + 1).is_some_and(|&b| is_ident_start(b)) {
            let end = ident_end(bytes, i + 1);
            let name = &sql[i + 1..end];
            let slot = match names.iter().position(|n| n == name) {
                Some(pos) => positional_count as usize + pos + 1,
                None => {
                    names.push(name.to_string());
                    positional_count as usize + names.len()
                }
            };
            out.push_str(&sql[copy_from..i]);
            out.push('$');
            out.push_str(&slot.to_string());
            copy_from = end;
            i = end;
        } else {
            i += 1;
        }
    }
    out.push_str(&sql[copy_from..]);

    Some(RewrittenQuery {
        sql: out,
        names,
        positional_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_change_for_positional_only() {
        assert_eq!(rewrite_named_params("SELECT * FROM users WHERE id = $1"), None);
    }

    #[test]
    fn test_single_named_param() {
        let rw = rewrite_named_params("SELECT * FROM users WHERE id = @id").unwrap();
        assert_eq!(rw.sql, "SELECT * FROM users WHERE id = $1");
        assert_eq!(rw.names, vec!["id"]);
        assert_eq!(rw.positional_count, 0);
    }

    #[test]
    fn test_mixed_numbering_is_collision_free() {
        let rw = rewrite_named_params(
            "UPDATE accounts SET locked_until_at = @locked_until_at WHERE id = $1",
        )
        .unwrap();
        assert_eq!(
            rw.sql,
            "UPDATE accounts SET locked_until_at = $2 WHERE id = $1"
        );
        assert_eq!(rw.names, vec!["locked_until_at"]);
        assert_eq!(rw.positional_count, 1);
    }

    #[test]
    fn test_repeats_reuse_one_slot() {
        let rw = rewrite_named_params(
            "WHERE (@author_id::int IS NULL OR p.user_id = @author_id)",
        )
        .unwrap();
        assert_eq!(rw.sql, "WHERE ($1::int IS NULL OR p.user_id = $1)");
        assert_eq!(rw.names, vec!["author_id"]);
    }

    #[test]
    fn test_at_inside_string_and_comment_is_ignored() {
        let sql = "SELECT '@not_a_param', email FROM t -- @also_not\nWHERE email = @email";
        let rw = rewrite_named_params(sql).unwrap();
        assert_eq!(
            rw.sql,
            "SELECT '@not_a_param', email FROM t -- @also_not\nWHERE email = $1"
        );
        assert_eq!(rw.names, vec!["email"]);
    }

    #[test]
    fn test_bare_at_passes_through() {
        assert_eq!(rewrite_named_params("SELECT a @> b FROM t"), None);
        // A bare operator does not stop a real named param elsewhere.
        let rw = rewrite_named_params("SELECT a @> b FROM t WHERE id = @id").unwrap();
        assert_eq!(rw.sql, "SELECT a @> b FROM t WHERE id = $1");
    }

    #[test]
    fn test_idempotent() {
        let rw = rewrite_named_params("WHERE a = @a AND b = @b AND a2 = @a").unwrap();
        assert_eq!(rw.sql, "WHERE a = $1 AND b = $2 AND a2 = $1");
        assert_eq!(rewrite_named_params(&rw.sql), None);
    }

    #[test]
    fn test_output_has_no_named_tokens_outside_literals() {
        let sql = "INSERT INTO t (a, b) VALUES (@a, '@b') -- @c\n/* @d */ RETURNING @a";
        let rw = rewrite_named_params(sql).unwrap();
        assert_eq!(
            rw.sql,
            "INSERT INTO t (a, b) VALUES ($1, '@b') -- @c\n/* @d */ RETURNING $1"
        );
    }

    #[test]
    fn test_slots_count_from_highest_positional() {
        let rw = rewrite_named_params("WHERE a = $3 AND b = @b AND c = @c").unwrap();
        assert_eq!(rw.sql, "WHERE a = $3 AND b = $4 AND c = $5");
        assert_eq!(rw.positional_count, 3);
        assert_eq!(rw.names, vec!["b", "c"]);
    }
}
