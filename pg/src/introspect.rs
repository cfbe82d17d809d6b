//! Query introspection: ask the server what it thinks of each query.
//!
//! For every annotated query the introspector rewrites `@name` parameters,
//! quotes alias hints, runs Parse/Describe/Sync on the unnamed statement,
//! and reconciles the server's ParameterDescription / RowDescription with
//! the local type and nullability caches. The server is authoritative: a
//! failure is a fault in the user's SQL and is surfaced, never retried.

use std::mem;

use sqlgen_core::alias_hints::quote_alias_hints;
use sqlgen_core::infer::{dedupe_names, infer_param_names};
use sqlgen_core::named_params::rewrite_named_params;
use sqlgen_core::{Column, Param, QueryKind, TypedQuery, UntypedQuery};

use crate::catalog::{NullabilityCache, TypeCache};
use crate::connection::Connection;
use crate::error::{PgError, PgResult};
use crate::protocol::{BackendMessage, FieldDescription};

/// Drives Parse/Describe/Sync per query and assembles `TypedQuery` records.
/// Caches live for the whole run; warnings are collected for the caller to
/// print.
pub struct Introspector<'a> {
    conn: &'a mut Connection,
    types: TypeCache,
    nullability: NullabilityCache,
    warnings: Vec<String>,
}

impl<'a> Introspector<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            types: TypeCache::new(),
            nullability: NullabilityCache::new(),
            warnings: Vec::new(),
        }
    }

    /// Warnings accumulated so far, draining them.
    pub fn take_warnings(&mut self) -> Vec<String> {
        mem::take(&mut self.warnings)
    }

    /// Type one query against the live server.
    pub fn introspect(&mut self, query: &UntypedQuery) -> PgResult<TypedQuery> {
        let rewritten = rewrite_named_params(&query.sql);
        let effective_sql = rewritten
            .as_ref()
            .map(|rw| rw.sql.clone())
            .unwrap_or_else(|| query.sql.clone());

        // The server sees the quoted form; generated code keeps the
        // pre-quote SQL the user can recognize.
        let wire_sql = quote_alias_hints(&effective_sql);

        self.conn.parse_describe_sync(&wire_sql)?;
        let messages = self.conn.recv_until_ready()?;

        let mut param_oids: Option<Vec<u32>> = None;
        let mut fields: Vec<FieldDescription> = Vec::new();
        let mut error = None;
        for msg in messages {
            match msg {
                BackendMessage::ParameterDescription(oids) => param_oids = Some(oids),
                BackendMessage::RowDescription(f) => fields = f,
                BackendMessage::ErrorResponse(err) if error.is_none() => error = Some(err),
                // NoData simply leaves `fields` empty.
                _ => {}
            }
        }
        if let Some(err) = error {
            return Err(PgError::Query {
                query: query.name.clone(),
                message: err.message,
            });
        }
        let param_oids = param_oids.unwrap_or_default();

        // Positional slots are named from the original SQL; named slots
        // keep their source names, appended in assignment order.
        let mut names = match &rewritten {
            Some(rw) => {
                let mut names = infer_param_names(&query.sql, rw.positional_count as usize);
                names.extend(rw.names.iter().cloned());
                names
            }
            None => infer_param_names(&query.sql, param_oids.len()),
        };
        for k in names.len()..param_oids.len() {
            names.push(format!("param_{}", k + 1));
        }
        names.truncate(param_oids.len());
        dedupe_names(&mut names);

        let mut params = Vec::with_capacity(param_oids.len());
        for (i, (type_oid, name)) in param_oids.iter().zip(names).enumerate() {
            params.push(Param {
                index: i as u16,
                name,
                ty: self.types.resolve(self.conn, *type_oid)?,
            });
        }

        let mut columns = Vec::with_capacity(fields.len());
        for field in &fields {
            let (name, nullable) = self.column_nullability(field)?;
            let ty = self.types.resolve(self.conn, field.type_oid)?;
            columns.push(Column {
                name,
                ty,
                nullable,
                table_oid: field.table_oid,
                column_attr: field.column_attr,
            });
        }

        let kind = query.kind.unwrap_or(if columns.is_empty() {
            QueryKind::Exec
        } else {
            QueryKind::Many
        });
        match kind {
            QueryKind::One | QueryKind::Many if columns.is_empty() => {
                return Err(PgError::Query {
                    query: query.name.clone(),
                    message: format!("annotated {} but the statement returns no columns", kind),
                });
            }
            QueryKind::Exec | QueryKind::ExecRows if !columns.is_empty() => {
                self.warnings.push(format!(
                    "query '{}' is annotated {} but returns {} column(s); they will be ignored",
                    query.name,
                    kind,
                    columns.len()
                ));
            }
            _ => {}
        }

        Ok(TypedQuery {
            name: query.name.clone(),
            file_path: query.file_path.clone(),
            sql: effective_sql,
            comment: query.comment.clone(),
            kind,
            params,
            columns,
        })
    }

    /// Hint suffix beats the catalog; expressions without a hint count as
    /// nullable. Returns the suffix-stripped name.
    fn column_nullability(&mut self, field: &FieldDescription) -> PgResult<(String, bool)> {
        if let Some(stripped) = field.name.strip_suffix('!') {
            if !stripped.is_empty() {
                return Ok((stripped.to_string(), false));
            }
        }
        if let Some(stripped) = field.name.strip_suffix('?') {
            if !stripped.is_empty() {
                return Ok((stripped.to_string(), true));
            }
        }
        if field.table_oid != 0 && field.column_attr > 0 {
            let not_null =
                self.nullability
                    .lookup(self.conn, field.table_oid, field.column_attr)?;
            return Ok((field.name.clone(), !not_null));
        }
        Ok((field.name.clone(), true))
    }
}
