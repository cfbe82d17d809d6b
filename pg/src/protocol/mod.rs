//! PostgreSQL wire protocol: pure encode/decode, no I/O.

pub mod auth;
pub mod encoder;
pub mod types;
pub mod wire;

pub use auth::ScramClient;
pub use encoder::{PROTOCOL_VERSION, PgEncoder};
pub use types::{oid, oid_to_name};
pub use wire::{BackendMessage, ErrorFields, FieldDescription, TransactionStatus};
