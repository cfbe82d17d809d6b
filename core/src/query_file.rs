//! Annotated `.sql` file parser.
//!
//! Queries are separated by `;` and preceded by an annotation comment line,
//! optionally followed by free-form doc lines:
//!
//! ```text
//! -- name: GetUser :one
//! -- Fetch a single user by primary key.
//! SELECT id, name FROM users WHERE id = $1;
//!
//! -- name: DeleteUser :exec
//! DELETE FROM users WHERE id = $1;
//! ```
//!
//! The `name:` line is mandatory for every query; the kind is optional here
//! and defaulted later from the server's column report.

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::{char, space0, space1},
    combinator::opt,
    sequence::preceded,
};
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::query::{QueryKind, UntypedQuery};
use crate::scanner::skip_region;

/// Parse all annotated queries out of one file's contents.
pub fn parse_query_file(file_path: &Path, content: &str) -> CoreResult<Vec<UntypedQuery>> {
    let file = file_path.display().to_string();
    let bytes = content.as_bytes();
    let mut queries = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < content.len() {
        let eol = content[i..]
            .find('\n')
            .map(|p| i + p)
            .unwrap_or(content.len());
        let text = content[i..eol].trim();

        if text.is_empty() {
            i = eol + 1;
            line += 1;
            continue;
        }

        if let Ok((rest, (name, kind))) = name_line(text) {
            if !rest.is_empty() {
                return Err(CoreError::annotation(
                    &file,
                    line,
                    format!("trailing content after annotation: '{}'", rest.trim()),
                ));
            }
            let kind = match kind {
                Some(k) => Some(
                    QueryKind::parse(k).ok_or_else(|| CoreError::UnknownQueryKind(k.to_string()))?,
                ),
                None => None,
            };
            let header_line = line;
            let name = name.to_string();
            i = eol + 1;
            line += 1;

            // Doc comment: the run of `--` lines immediately after the header.
            let mut doc_lines: Vec<String> = Vec::new();
            while i < content.len() {
                let eol2 = content[i..]
                    .find('\n')
                    .map(|p| i + p)
                    .unwrap_or(content.len());
                let t = content[i..eol2].trim();
                if !t.starts_with("--") {
                    break;
                }
                if name_line(t).is_ok() {
                    return Err(CoreError::annotation(
                        &file,
                        header_line,
                        format!("query '{}' has no SQL body", name),
                    ));
                }
                doc_lines.push(t.trim_start_matches('-').trim().to_string());
                i = eol2 + 1;
                line += 1;
            }

            let (body_end, resume) = find_terminator(bytes, i);
            let body = content[i..body_end].trim();
            if body.is_empty() {
                return Err(CoreError::annotation(
                    &file,
                    header_line,
                    format!("query '{}' has no SQL body", name),
                ));
            }
            line += content[i..resume].matches('\n').count();
            queries.push(UntypedQuery {
                name,
                file_path: file_path.to_path_buf(),
                sql: body.to_string(),
                comment: if doc_lines.is_empty() {
                    None
                } else {
                    Some(doc_lines.join("\n"))
                },
                kind,
            });
            i = resume;
        } else if text.starts_with("--") {
            // Free comment before any query.
            i = eol + 1;
            line += 1;
        } else {
            return Err(CoreError::annotation(
                &file,
                line,
                "SQL outside of a named query (missing `-- name:` line)",
            ));
        }
    }

    Ok(queries)
}

/// `-- name: <Name> :<kind>` (without the trailing newline).
fn name_line(line: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (rest, _) = (tag("--"), space0, tag("name:"), space0).parse(line)?;
    let (rest, name) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(rest)?;
    let (rest, kind) = opt(preceded(
        (space1, char(':')),
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    ))
    .parse(rest)?;
    let (rest, _) = space0.parse(rest)?;
    Ok((rest, (name, kind)))
}

/// Scan from `i` to the query-terminating `;` (honoring strings and
/// comments). Returns `(body_end, resume)`: the body is `[i, body_end)` and
/// scanning continues at `resume`. A missing final `;` terminates at EOF.
fn find_terminator(bytes: &[u8], mut i: usize) -> (usize, usize) {
    while i < bytes.len() {
        let skipped = skip_region(bytes, i);
        if skipped != i {
            i = skipped;
            continue;
        }
        if bytes[i] == b';' {
            return (i, i + 1);
        }
        i += 1;
    }
    (bytes.len(), bytes.len())
}
