//! Annotated-SQL parsing and rewriting for sqlgen.
//!
//! Everything in this crate is pure string work: splitting `.sql` files
//! into named queries, rewriting `@name` parameters to `$N`, quoting
//! `!`/`?` nullability hints, and inferring parameter names from SQL
//! context. Talking to PostgreSQL lives in `sqlgen-pg`.
//!
//! ```
//! use sqlgen_core::named_params::rewrite_named_params;
//!
//! let rw = rewrite_named_params("SELECT * FROM users WHERE id = @id").unwrap();
//! assert_eq!(rw.sql, "SELECT * FROM users WHERE id = $1");
//! ```

pub mod alias_hints;
pub mod error;
pub mod infer;
pub mod named_params;
pub mod query;
pub mod query_file;
pub mod scanner;

pub use error::{CoreError, CoreResult};
pub use query::{Column, Param, QueryKind, TypeRef, TypedQuery, UntypedQuery};
pub use query_file::parse_query_file;
