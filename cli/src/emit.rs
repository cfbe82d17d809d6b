//! Rust code emission.
//!
//! One generated module per source file: the SQL as a `pub const`, a
//! `<Name>Params` struct when the query takes parameters, a `<Name>Row`
//! struct for `:one`/`:many` queries, and one Rust enum per PostgreSQL
//! enum referenced anywhere in the file.

use std::fmt::Write as _;
use std::path::Path;

use sqlgen_core::{QueryKind, TypeRef, TypedQuery};

/// `users.sql` → `users.rs`.
pub fn output_file_name(source: &Path) -> String {
    format!(
        "{}.rs",
        source
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
    )
}

/// Render the complete generated module for one source file.
pub fn render_module(source: &Path, queries: &[TypedQuery]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated by sqlgen. DO NOT EDIT.");
    let _ = writeln!(out, "// Source: {}", source.display());

    for (name, variants) in collect_enums(queries) {
        out.push('\n');
        render_enum(&mut out, &name, &variants);
    }

    for query in queries {
        out.push('\n');
        render_query(&mut out, query);
    }
    out
}

fn render_query(out: &mut String, query: &TypedQuery) {
    if let Some(comment) = &query.comment {
        for line in comment.lines() {
            let _ = writeln!(out, "/// {}", line);
        }
    }
    let type_name = camel_case(&query.name);
    let _ = writeln!(
        out,
        "pub const {}: &str = {};",
        to_shouty_snake(&query.name),
        sql_literal(&query.sql)
    );

    if !query.params.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "#[derive(Debug, Clone)]");
        let _ = writeln!(out, "pub struct {}Params {{", type_name);
        for param in &query.params {
            render_field(out, &param.name, &param.ty, false);
        }
        let _ = writeln!(out, "}}");
    }

    if matches!(query.kind, QueryKind::One | QueryKind::Many) {
        out.push('\n');
        let _ = writeln!(out, "#[derive(Debug, Clone)]");
        let _ = writeln!(out, "pub struct {}Row {{", type_name);
        for column in &query.columns {
            render_field(out, &column.name, &column.ty, column.nullable);
        }
        let _ = writeln!(out, "}}");
    }
}

fn render_field(out: &mut String, name: &str, ty: &TypeRef, nullable: bool) {
    let mut rust_ty = rust_type(ty);
    if nullable {
        rust_ty = format!("Option<{}>", rust_ty);
    }
    match ty {
        TypeRef::Unknown(oid) => {
            let _ = writeln!(
                out,
                "    pub {}: {}, // unresolved type (oid {})",
                field_ident(name),
                rust_ty,
                oid
            );
        }
        _ => {
            let _ = writeln!(out, "    pub {}: {},", field_ident(name), rust_ty);
        }
    }
}

fn render_enum(out: &mut String, name: &str, variants: &[String]) {
    let type_name = camel_case(name);
    let _ = writeln!(out, "/// PostgreSQL enum `{}`.", name);
    let _ = writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
    let _ = writeln!(out, "pub enum {} {{", type_name);
    for variant in variants {
        let _ = writeln!(out, "    {},", camel_case(variant));
    }
    let _ = writeln!(out, "}}");
    out.push('\n');
    let _ = writeln!(out, "impl {} {{", type_name);
    let _ = writeln!(out, "    pub fn as_str(&self) -> &'static str {{");
    let _ = writeln!(out, "        match self {{");
    for variant in variants {
        let _ = writeln!(
            out,
            "            {}::{} => \"{}\",",
            type_name,
            camel_case(variant),
            variant
        );
    }
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
}

/// Every distinct PostgreSQL enum referenced by the given queries, in
/// first-appearance order.
fn collect_enums(queries: &[TypedQuery]) -> Vec<(String, Vec<String>)> {
    let mut enums: Vec<(String, Vec<String>)> = Vec::new();
    let mut visit = |ty: &TypeRef| {
        let mut ty = ty;
        while let TypeRef::Array(elem) = ty {
            ty = elem;
        }
        if let TypeRef::Enum { name, variants } = ty {
            if !enums.iter().any(|(n, _)| n == name) {
                enums.push((name.clone(), variants.clone()));
            }
        }
    };
    for query in queries {
        for param in &query.params {
            visit(&param.ty);
        }
        for column in &query.columns {
            visit(&column.ty);
        }
    }
    enums
}

/// The Rust type a descriptor maps to in generated code. Interval and
/// numeric stay textual: the generated bindings do no value decoding.
pub fn rust_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Bool => "bool".to_string(),
        TypeRef::Int2 => "i16".to_string(),
        TypeRef::Int4 => "i32".to_string(),
        TypeRef::Int8 => "i64".to_string(),
        TypeRef::Float4 => "f32".to_string(),
        TypeRef::Float8 => "f64".to_string(),
        TypeRef::Text | TypeRef::Varchar | TypeRef::Bpchar | TypeRef::Name => "String".to_string(),
        TypeRef::Bytea => "Vec<u8>".to_string(),
        TypeRef::Uuid => "uuid::Uuid".to_string(),
        TypeRef::Json | TypeRef::Jsonb => "serde_json::Value".to_string(),
        TypeRef::Date => "chrono::NaiveDate".to_string(),
        TypeRef::Time => "chrono::NaiveTime".to_string(),
        TypeRef::Timestamp => "chrono::NaiveDateTime".to_string(),
        TypeRef::Timestamptz => "chrono::DateTime<chrono::Utc>".to_string(),
        TypeRef::Interval => "String".to_string(),
        TypeRef::Numeric => "String".to_string(),
        TypeRef::Oid => "u32".to_string(),
        TypeRef::Array(elem) => format!("Vec<{}>", rust_type(elem)),
        TypeRef::Enum { name, .. } => camel_case(name),
        TypeRef::Unknown(_) => "Vec<u8>".to_string(),
    }
}

/// `GetUserById` → `GET_USER_BY_ID`.
pub fn to_shouty_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_is_break = i == 0 || chars[i - 1] == '_';
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if !prev_is_break && (prev_lower || next_lower) {
                out.push('_');
            }
            out.push(c);
        } else {
            out.push(c.to_ascii_uppercase());
        }
    }
    out
}

/// `user_mood` / `mood` → `UserMood` / `Mood`.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next {
                out.push(c.to_ascii_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        } else {
            upper_next = true;
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// SQL-derived names become Rust field identifiers; keywords get the `r#`
/// prefix, anything else invalid is underscored.
fn field_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    match ident.as_str() {
        // Cannot be raw identifiers at all.
        "self" | "Self" | "super" | "crate" => format!("{}_", ident),
        _ if RUST_KEYWORDS.contains(&ident.as_str()) => format!("r#{}", ident),
        _ => ident,
    }
}

const RUST_KEYWORDS: [&str; 35] = [
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "yield",
];

fn sql_literal(sql: &str) -> String {
    if sql.contains('"') || sql.contains('\\') || sql.contains('\n') {
        let mut hashes = 1;
        while sql.contains(&format!("\"{}", "#".repeat(hashes))) {
            hashes += 1;
        }
        let h = "#".repeat(hashes);
        format!("r{h}\"{sql}\"{h}")
    } else {
        format!("\"{}\"", sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlgen_core::{Column, Param};
    use std::path::PathBuf;

    fn typed(name: &str, kind: QueryKind, params: Vec<Param>, columns: Vec<Column>) -> TypedQuery {
        TypedQuery {
            name: name.to_string(),
            file_path: PathBuf::from("queries/users.sql"),
            sql: format!("SELECT 1 -- {}", name),
            comment: None,
            kind,
            params,
            columns,
        }
    }

    #[test]
    fn test_to_shouty_snake() {
        assert_eq!(to_shouty_snake("GetUser"), "GET_USER");
        assert_eq!(to_shouty_snake("GetUserByID"), "GET_USER_BY_ID");
        assert_eq!(to_shouty_snake("ListHTTPRoutes"), "LIST_HTTP_ROUTES");
        assert_eq!(to_shouty_snake("Ping"), "PING");
    }

    #[test]
    fn test_field_ident() {
        assert_eq!(field_ident("user_id"), "user_id");
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("self"), "self_");
        assert_eq!(field_ident("2fa"), "_2fa");
        assert_eq!(field_ident("weird name"), "weird_name");
    }

    #[test]
    fn test_rust_type_mapping() {
        assert_eq!(rust_type(&TypeRef::Int8), "i64");
        assert_eq!(
            rust_type(&TypeRef::Array(Box::new(TypeRef::Uuid))),
            "Vec<uuid::Uuid>"
        );
        assert_eq!(
            rust_type(&TypeRef::Enum {
                name: "user_mood".to_string(),
                variants: vec![]
            }),
            "UserMood"
        );
    }

    #[test]
    fn test_sql_literal_uses_raw_string_when_needed() {
        assert_eq!(sql_literal("SELECT 1"), "\"SELECT 1\"");
        assert_eq!(
            sql_literal("SELECT \"weird\"\nFROM t"),
            "r#\"SELECT \"weird\"\nFROM t\"#"
        );
    }

    #[test]
    fn test_render_module_shape() {
        let query = TypedQuery {
            name: "GetUser".to_string(),
            file_path: PathBuf::from("queries/users.sql"),
            sql: "SELECT id, name, mood FROM users WHERE id = $1".to_string(),
            comment: Some("Fetch a single user by primary key.".to_string()),
            kind: QueryKind::One,
            params: vec![Param {
                index: 0,
                name: "id".to_string(),
                ty: TypeRef::Int4,
            }],
            columns: vec![
                Column {
                    name: "id".to_string(),
                    ty: TypeRef::Int4,
                    nullable: false,
                    table_oid: 16385,
                    column_attr: 1,
                },
                Column {
                    name: "name".to_string(),
                    ty: TypeRef::Text,
                    nullable: true,
                    table_oid: 16385,
                    column_attr: 2,
                },
                Column {
                    name: "mood".to_string(),
                    ty: TypeRef::Enum {
                        name: "mood".to_string(),
                        variants: vec!["sad".to_string(), "happy".to_string()],
                    },
                    nullable: false,
                    table_oid: 16385,
                    column_attr: 3,
                },
            ],
        };

        let rendered = render_module(Path::new("queries/users.sql"), &[query]);
        let expected = "\
// Generated by sqlgen. DO NOT EDIT.
// Source: queries/users.sql

/// PostgreSQL enum `mood`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Sad,
    Happy,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Sad => \"sad\",
            Mood::Happy => \"happy\",
        }
    }
}

/// Fetch a single user by primary key.
pub const GET_USER: &str = \"SELECT id, name, mood FROM users WHERE id = $1\";

#[derive(Debug, Clone)]
pub struct GetUserParams {
    pub id: i32,
}

#[derive(Debug, Clone)]
pub struct GetUserRow {
    pub id: i32,
    pub name: Option<String>,
    pub mood: Mood,
}
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_exec_query_has_no_row_struct() {
        let rendered = render_module(
            Path::new("queries/users.sql"),
            &[typed(
                "DeleteUser",
                QueryKind::Exec,
                vec![Param {
                    index: 0,
                    name: "id".to_string(),
                    ty: TypeRef::Int4,
                }],
                vec![],
            )],
        );
        assert!(rendered.contains("pub struct DeleteUserParams"));
        assert!(!rendered.contains("Row"));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(Path::new("queries/users.sql")), "users.rs");
    }
}
