pub use sqlgen_core::{CoreError, TypedQuery, UntypedQuery, parse_query_file};
pub use sqlgen_pg::{ConnectParams, Connection, Introspector};

// CLI modules
pub mod dburl;
pub mod emit;
pub mod files;
pub mod generate;
pub mod verify;
