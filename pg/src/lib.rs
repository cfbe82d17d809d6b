//! # sqlgen PostgreSQL client
//!
//! A deliberately small, blocking PostgreSQL wire client: just enough of
//! the v3 protocol to ask the server what it thinks of a query. No COPY,
//! no LISTEN, no TLS, no runtime query execution.
//!
//! ## Architecture
//!
//! ```text
//! UntypedQuery → rewrite/quote → Parse/Describe/Sync → TypedQuery
//! ```
//!
//! ### Protocol (pure, no I/O)
//! - `PgEncoder` - frontend messages into a reusable `BytesMut`
//! - `BackendMessage::decode` - backend messages out of a byte slice
//! - `ScramClient` - SCRAM-SHA-256 exchange (RFC 5802 / RFC 7677)
//!
//! ### Client (blocking I/O)
//! - `Connection` - TCP startup, auth dispatch, framed message loop
//! - `TypeCache` / `NullabilityCache` - catalog lookups, memoized per run
//! - `Introspector` - drives the whole pipeline per query

pub mod catalog;
pub mod connection;
pub mod error;
pub mod introspect;
pub mod protocol;

pub use catalog::{NullabilityCache, TypeCache};
pub use connection::{ConnectParams, Connection};
pub use error::{PgError, PgResult};
pub use introspect::Introspector;
pub use protocol::{BackendMessage, PgEncoder, ScramClient};
