//! Parameter-name inference.
//!
//! The server reports parameter *types* but not names, so names are derived
//! from SQL context: an INSERT column list pairs each `$K` with a column, a
//! `col = $K` predicate borrows the left-hand identifier, and `LIMIT $K` /
//! `OFFSET $K` use the keyword itself. Anything else falls back to
//! `param_<K>`.

use crate::scanner::{ident_end, is_ident_char, is_ident_start, placeholder_number, skip_region};

/// INSERT column lists longer than this are not used for naming.
const MAX_INSERT_COLUMNS: usize = 64;

/// Left-hand identifiers that carry no useful name.
const NOISE_WORDS: [&str; 14] = [
    "and", "or", "not", "is", "in", "like", "set", "where", "having", "on", "then", "when",
    "else", "null",
];

/// Derive `count` non-empty, unique parameter names from `sql`.
pub fn infer_param_names(sql: &str, count: usize) -> Vec<String> {
    let mut slots: Vec<Option<String>> = vec![None; count];
    apply_insert_columns(sql, &mut slots);
    for k in 0..count {
        if slots[k].is_none() {
            slots[k] = infer_from_context(sql, (k + 1) as u16);
        }
    }

    let mut names: Vec<String> = slots
        .into_iter()
        .enumerate()
        .map(|(k, slot)| slot.unwrap_or_else(|| format!("param_{}", k + 1)))
        .collect();
    dedupe_names(&mut names);
    names
}

/// Make every name unique by suffixing later duplicates with `_1`, `_2`, ….
/// The first occurrence keeps its name.
pub fn dedupe_names(names: &mut [String]) {
    for j in 0..names.len() {
        if !names[..j].contains(&names[j]) {
            continue;
        }
        let base = names[j].clone();
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !names[..j].contains(&candidate) {
                names[j] = candidate;
                break;
            }
            n += 1;
        }
    }
}

/// Skip whitespace and comments (but not strings or quoted identifiers).
fn skip_ws_comments(bytes: &[u8], mut i: usize) -> usize {
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return i;
        }
        let skipped = match bytes[i] {
            b'-' | b'/' => skip_region(bytes, i),
            _ => i,
        };
        if skipped == i {
            return i;
        }
        i = skipped;
    }
}

/// Case-insensitive keyword match with a word boundary after it.
fn match_keyword(bytes: &[u8], i: usize, kw: &str) -> Option<usize> {
    let end = i + kw.len();
    if end > bytes.len() || !bytes[i..end].eq_ignore_ascii_case(kw.as_bytes()) {
        return None;
    }
    if end < bytes.len() && is_ident_char(bytes[end]) {
        return None;
    }
    Some(end)
}

/// Read a bare or quoted identifier, returning `(name, end)`.
fn read_name(sql: &str, bytes: &[u8], i: usize) -> Option<(String, usize)> {
    match bytes.get(i)? {
        b'"' => {
            let end = skip_region(bytes, i);
            if end <= i + 2 {
                return None;
            }
            Some((sql[i + 1..end - 1].replace("\"\"", "\""), end))
        }
        &b if is_ident_start(b) => {
            let end = ident_end(bytes, i);
            Some((sql[i..end].to_string(), end))
        }
        _ => None,
    }
}

/// Rule 1: `INSERT INTO t (c1, c2, ...) VALUES (e1, e2, ...)` pairs each
/// `$K` inside a value expression with the column at the same position.
fn apply_insert_columns(sql: &str, slots: &mut [Option<String>]) {
    let bytes = sql.as_bytes();

    let mut i = skip_ws_comments(bytes, 0);
    let Some(next) = match_keyword(bytes, i, "insert") else {
        return;
    };
    i = skip_ws_comments(bytes, next);
    let Some(next) = match_keyword(bytes, i, "into") else {
        return;
    };
    i = skip_ws_comments(bytes, next);

    // Table name, optionally schema-qualified.
    let Some((_, mut end)) = read_name(sql, bytes, i) else {
        return;
    };
    if bytes.get(end) == Some(&b'.') {
        match read_name(sql, bytes, end + 1) {
            Some((_, e)) => end = e,
            None => return,
        }
    }
    i = skip_ws_comments(bytes, end);

    if bytes.get(i) != Some(&b'(') {
        return;
    }
    i += 1;

    let mut columns = Vec::new();
    loop {
        i = skip_ws_comments(bytes, i);
        let Some((col, end)) = read_name(sql, bytes, i) else {
            return;
        };
        columns.push(col);
        if columns.len() > MAX_INSERT_COLUMNS {
            return;
        }
        i = skip_ws_comments(bytes, end);
        match bytes.get(i) {
            Some(b',') => i += 1,
            Some(b')') => {
                i += 1;
                break;
            }
            _ => return,
        }
    }

    i = skip_ws_comments(bytes, i);
    let Some(next) = match_keyword(bytes, i, "values") else {
        return;
    };
    i = skip_ws_comments(bytes, next);
    if bytes.get(i) != Some(&b'(') {
        return;
    }
    i += 1;

    // Pair $K placeholders with columns by comma position at depth 0.
    let mut expr_index = 0usize;
    let mut depth = 0u32;
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' if depth == 0 => break,
            b')' => {
                depth -= 1;
                i += 1;
            }
            b',' if depth == 0 => {
                expr_index += 1;
                i += 1;
            }
            b'$' => {
                if let Some((k, end)) = placeholder_number(bytes, i + 1) {
                    let k = k as usize;
                    if (1..=slots.len()).contains(&k) && slots[k - 1].is_none() {
                        if let Some(col) = columns.get(expr_index) {
                            slots[k - 1] = Some(col.clone());
                        }
                    }
                    i = end;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
}

/// Rules 2 and 3: comparison left-hand side, or a LIMIT/OFFSET keyword slot.
fn infer_from_context(sql: &str, k: u16) -> Option<String> {
    let bytes = sql.as_bytes();
    let dollar = find_placeholder(bytes, k)?;

    let mut j = dollar;
    while j > 0 && bytes[j - 1].is_ascii_whitespace() {
        j -= 1;
    }

    // Longest operator match first.
    const OPS: [&[u8]; 7] = [b"!=", b"<>", b"<=", b">=", b"=", b"<", b">"];
    let op_len = OPS
        .iter()
        .find(|op| j >= op.len() && &bytes[j - op.len()..j] == **op)
        .map(|op| op.len());

    match op_len {
        Some(len) => {
            let mut e = j - len;
            while e > 0 && bytes[e - 1].is_ascii_whitespace() {
                e -= 1;
            }
            let mut s = e;
            while s > 0 && is_ident_char(bytes[s - 1]) {
                s -= 1;
            }
            if s == e || !is_ident_start(bytes[s]) {
                return None;
            }
            let ident = &sql[s..e];
            if NOISE_WORDS.iter().any(|w| ident.eq_ignore_ascii_case(w)) {
                return None;
            }
            Some(ident.to_string())
        }
        None => {
            let e = j;
            let mut s = e;
            while s > 0 && is_ident_char(bytes[s - 1]) {
                s -= 1;
            }
            if s == e {
                return None;
            }
            let word = &sql[s..e];
            if word.eq_ignore_ascii_case("limit") {
                Some("limit".to_string())
            } else if word.eq_ignore_ascii_case("offset") {
                Some("offset".to_string())
            } else {
                None
            }
        }
    }
}

/// Byte offset of the `$` of the first top-level `$k`.
fn find_placeholder(bytes: &[u8], k: u16) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        if bytes[i] == b'$' {
            if let Some((n, end)) = placeholder_number(bytes, i + 1) {
                if n == k {
                    return Some(i);
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_predicate() {
        assert_eq!(
            infer_param_names("SELECT id, name FROM users WHERE id = $1", 1),
            vec!["id"]
        );
    }

    #[test]
    fn test_qualified_column_uses_last_segment() {
        assert_eq!(
            infer_param_names("SELECT * FROM posts p WHERE p.user_id = $1", 1),
            vec!["user_id"]
        );
    }

    #[test]
    fn test_all_comparison_operators() {
        assert_eq!(infer_param_names("WHERE age >= $1", 1), vec!["age"]);
        assert_eq!(infer_param_names("WHERE age<$1", 1), vec!["age"]);
        assert_eq!(infer_param_names("WHERE status != $1", 1), vec!["status"]);
        assert_eq!(infer_param_names("WHERE status <> $1", 1), vec!["status"]);
    }

    #[test]
    fn test_noise_word_is_rejected() {
        // `WHERE $1` has the WHERE keyword before the slot but no operator;
        // `x IS NULL AND $1` walks back onto AND.
        assert_eq!(
            infer_param_names("SELECT 1 FROM t WHERE x = 1 AND = $1", 1),
            vec!["param_1"]
        );
    }

    #[test]
    fn test_insert_column_list() {
        assert_eq!(
            infer_param_names(
                "INSERT INTO users (name, email, bio) VALUES ($1, $2, $3) RETURNING *",
                3
            ),
            vec!["name", "email", "bio"]
        );
    }

    #[test]
    fn test_insert_with_expressions_and_comments() {
        assert_eq!(
            infer_param_names(
                "INSERT INTO logs /* audit */ (actor, level) VALUES (lower($1), $2)",
                2
            ),
            vec!["actor", "level"]
        );
    }

    #[test]
    fn test_insert_schema_qualified_table() {
        assert_eq!(
            infer_param_names("INSERT INTO app.users (name) VALUES ($1)", 1),
            vec!["name"]
        );
    }

    #[test]
    fn test_limit_offset_slots() {
        assert_eq!(
            infer_param_names("SELECT * FROM t ORDER BY id LIMIT $1 OFFSET $2", 2),
            vec!["limit", "offset"]
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            infer_param_names("SELECT coalesce($1, 'x')", 1),
            vec!["param_1"]
        );
    }

    #[test]
    fn test_count_agreement_and_non_empty() {
        let names = infer_param_names("SELECT $1, $2, $3, $4", 4);
        assert_eq!(names.len(), 4);
        assert!(names.iter().all(|n| !n.is_empty()));
    }

    #[test]
    fn test_dedup_suffixes() {
        let mut names = vec![
            "id".to_string(),
            "id".to_string(),
            "id".to_string(),
            "other".to_string(),
        ];
        dedupe_names(&mut names);
        assert_eq!(names, vec!["id", "id_1", "id_2", "other"]);
    }

    #[test]
    fn test_dedup_avoids_existing_suffix() {
        let mut names = vec!["id".to_string(), "id_1".to_string(), "id".to_string()];
        dedupe_names(&mut names);
        assert_eq!(names, vec!["id", "id_1", "id_2"]);
    }

    #[test]
    fn test_duplicate_predicates_dedupe() {
        assert_eq!(
            infer_param_names("SELECT * FROM spans WHERE ts >= $1 AND ts <= $2", 2),
            vec!["ts", "ts_1"]
        );
    }

    #[test]
    fn test_placeholder_in_string_is_not_context() {
        assert_eq!(
            infer_param_names("SELECT '$1', id FROM t WHERE id = $1", 1),
            vec!["id"]
        );
    }
}
