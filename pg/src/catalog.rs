//! OID resolution and nullability lookups against the system catalogs.
//!
//! Both caches are per-generation-run: the server is authoritative, and a
//! run sees a single consistent schema. Lookups use the simple-Query path
//! and run only between introspections, never interleaved with an open
//! Parse/Describe/Sync exchange.

use std::collections::HashMap;

use sqlgen_core::TypeRef;

use crate::connection::Connection;
use crate::error::PgResult;
use crate::protocol::oid;

/// Maps type OIDs to descriptors. Preloaded with the built-in scalar and
/// array types; user enums are resolved once and cached.
#[derive(Debug)]
pub struct TypeCache {
    map: HashMap<u32, TypeRef>,
}

impl TypeCache {
    pub fn new() -> Self {
        let mut map = HashMap::new();

        map.insert(oid::BOOL, TypeRef::Bool);
        map.insert(oid::BYTEA, TypeRef::Bytea);
        map.insert(oid::NAME, TypeRef::Name);
        map.insert(oid::INT8, TypeRef::Int8);
        map.insert(oid::INT2, TypeRef::Int2);
        map.insert(oid::INT4, TypeRef::Int4);
        map.insert(oid::TEXT, TypeRef::Text);
        map.insert(oid::BPCHAR, TypeRef::Bpchar);
        map.insert(oid::VARCHAR, TypeRef::Varchar);
        map.insert(oid::OID, TypeRef::Oid);
        map.insert(oid::JSON, TypeRef::Json);
        map.insert(oid::JSONB, TypeRef::Jsonb);
        map.insert(oid::FLOAT4, TypeRef::Float4);
        map.insert(oid::FLOAT8, TypeRef::Float8);
        map.insert(oid::NUMERIC, TypeRef::Numeric);
        map.insert(oid::DATE, TypeRef::Date);
        map.insert(oid::TIME, TypeRef::Time);
        map.insert(oid::TIMESTAMP, TypeRef::Timestamp);
        map.insert(oid::TIMESTAMPTZ, TypeRef::Timestamptz);
        map.insert(oid::INTERVAL, TypeRef::Interval);
        map.insert(oid::UUID, TypeRef::Uuid);

        let arrays = [
            (oid::BOOL_ARRAY, TypeRef::Bool),
            (oid::BYTEA_ARRAY, TypeRef::Bytea),
            (oid::INT2_ARRAY, TypeRef::Int2),
            (oid::INT4_ARRAY, TypeRef::Int4),
            (oid::TEXT_ARRAY, TypeRef::Text),
            (oid::VARCHAR_ARRAY, TypeRef::Varchar),
            (oid::INT8_ARRAY, TypeRef::Int8),
            (oid::FLOAT4_ARRAY, TypeRef::Float4),
            (oid::FLOAT8_ARRAY, TypeRef::Float8),
            (oid::TIMESTAMP_ARRAY, TypeRef::Timestamp),
            (oid::DATE_ARRAY, TypeRef::Date),
            (oid::TIMESTAMPTZ_ARRAY, TypeRef::Timestamptz),
            (oid::NUMERIC_ARRAY, TypeRef::Numeric),
            (oid::UUID_ARRAY, TypeRef::Uuid),
            (oid::JSONB_ARRAY, TypeRef::Jsonb),
        ];
        for (array_oid, elem) in arrays {
            map.insert(array_oid, TypeRef::Array(Box::new(elem)));
        }

        Self { map }
    }

    /// Descriptor already known for `oid`, if any.
    pub fn cached(&self, oid: u32) -> Option<&TypeRef> {
        self.map.get(&oid)
    }

    /// Resolve an OID, asking the server about unknown ones. Every result
    /// (including `Unknown`) is cached for the rest of the run.
    pub fn resolve(&mut self, conn: &mut Connection, type_oid: u32) -> PgResult<TypeRef> {
        if let Some(t) = self.map.get(&type_oid) {
            return Ok(t.clone());
        }
        let resolved = self.lookup(conn, type_oid)?;
        self.map.insert(type_oid, resolved.clone());
        Ok(resolved)
    }

    fn lookup(&mut self, conn: &mut Connection, type_oid: u32) -> PgResult<TypeRef> {
        let sql = format!(
            "SELECT t.typname, t.typtype, t.typelem, e.enumlabel \
             FROM pg_catalog.pg_type t \
             LEFT JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid \
             WHERE t.oid = {} \
             ORDER BY e.enumsortorder",
            type_oid
        );
        let rows = conn.simple_query(&sql)?;
        let Some(first) = rows.first() else {
            return Ok(TypeRef::Unknown(type_oid));
        };

        let typname = text_cell(first, 0).unwrap_or_default();
        let typtype = text_cell(first, 1).unwrap_or_default();

        if typtype == "e" {
            let variants = rows.iter().filter_map(|row| text_cell(row, 3)).collect();
            return Ok(TypeRef::Enum {
                name: typname,
                variants,
            });
        }

        // Array of a user type: `_elemname` with a nonzero typelem.
        if typname.starts_with('_') {
            if let Some(elem_oid) = text_cell(first, 2).and_then(|v| v.parse::<u32>().ok()) {
                if elem_oid != 0 {
                    let elem = self.resolve(conn, elem_oid)?;
                    return Ok(TypeRef::Array(Box::new(elem)));
                }
            }
        }

        Ok(TypeRef::Unknown(type_oid))
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Memoizes `pg_attribute.attnotnull` per `(table_oid, column_attr)`.
#[derive(Debug, Default)]
pub struct NullabilityCache {
    map: HashMap<(u32, i16), bool>,
}

impl NullabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` ⇒ the column is NOT NULL in the catalog. Columns that cannot
    /// be found (dropped mid-run, system attributes) count as nullable.
    pub fn lookup(
        &mut self,
        conn: &mut Connection,
        table_oid: u32,
        column_attr: i16,
    ) -> PgResult<bool> {
        if let Some(&not_null) = self.map.get(&(table_oid, column_attr)) {
            return Ok(not_null);
        }
        let sql = format!(
            "SELECT attnotnull FROM pg_catalog.pg_attribute \
             WHERE attrelid = {} AND attnum = {}",
            table_oid, column_attr
        );
        let rows = conn.simple_query(&sql)?;
        let not_null = rows
            .first()
            .and_then(|row| text_cell(row, 0))
            .map(|v| v == "t")
            .unwrap_or(false);
        self.map.insert((table_oid, column_attr), not_null);
        Ok(not_null)
    }
}

/// Text-format cell as a String; `None` for SQL NULL or a missing column.
fn text_cell(row: &[Option<Vec<u8>>], idx: usize) -> Option<String> {
    row.get(idx)
        .and_then(|cell| cell.as_ref())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}
