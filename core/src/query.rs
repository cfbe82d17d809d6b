//! The typed query model.
//!
//! `UntypedQuery` is what the annotation parser produces from a `.sql` file;
//! `TypedQuery` is the same query after the server has been asked about its
//! parameter and column types. `TypedQuery` is the canonical artifact the
//! code emitter consumes.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Return-shape annotation on a `-- name:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Exactly one row.
    One,
    /// Zero or more rows.
    Many,
    /// No result rows.
    Exec,
    /// No result rows; the affected-row count is returned.
    ExecRows,
}

impl QueryKind {
    /// Parse the kind token of a `-- name: Foo :kind` line.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one" => Some(Self::One),
            "many" => Some(Self::Many),
            "exec" => Some(Self::Exec),
            "execrows" => Some(Self::ExecRows),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::One => ":one",
            Self::Many => ":many",
            Self::Exec => ":exec",
            Self::ExecRows => ":execrows",
        };
        f.write_str(s)
    }
}

/// A named query as parsed from a source file, before introspection.
#[derive(Debug, Clone)]
pub struct UntypedQuery {
    /// Query name from the annotation (CamelCase by convention).
    pub name: String,
    pub file_path: PathBuf,
    /// The SQL body exactly as written (named params and alias hints intact).
    pub sql: String,
    /// Free-form doc comment lines following the name line.
    pub comment: Option<String>,
    pub kind: Option<QueryKind>,
}

/// A query with server-reported parameter and column types.
#[derive(Debug, Clone, Serialize)]
pub struct TypedQuery {
    pub name: String,
    pub file_path: PathBuf,
    /// The SQL handed to generated code: named params rewritten to `$N`,
    /// alias hints left unquoted.
    pub sql: String,
    pub comment: Option<String>,
    pub kind: QueryKind,
    pub params: Vec<Param>,
    pub columns: Vec<Column>,
}

impl TypedQuery {
    /// Export to JSON for the manifest output.
    pub fn to_json(queries: &[TypedQuery]) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(queries)
    }
}

/// One `$N` parameter slot with its inferred name and server type.
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    /// Zero-based slot index; dense `0..N-1`.
    pub index: u16,
    /// Never empty; unique within a query.
    pub name: String,
    pub ty: TypeRef,
}

/// One output column, with nullability resolved from hints or the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Column name with any trailing `!`/`?` hint stripped.
    pub name: String,
    pub ty: TypeRef,
    pub nullable: bool,
    /// Originating table OID, zero for computed expressions.
    pub table_oid: u32,
    /// Attribute number in the originating table, zero for expressions.
    pub column_attr: i16,
}

/// Language-neutral type descriptor resolved from a PostgreSQL OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Varchar,
    Bpchar,
    Name,
    Bytea,
    Uuid,
    Json,
    Jsonb,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Interval,
    Numeric,
    Oid,
    Array(Box<TypeRef>),
    /// A user-defined enum resolved from `pg_type`/`pg_enum`.
    Enum { name: String, variants: Vec<String> },
    /// An OID the catalog could not resolve.
    Unknown(u32),
}
