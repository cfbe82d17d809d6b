//! Error type for the PostgreSQL client.

use std::fmt;

/// Errors surfaced by the wire client and the introspector.
#[derive(Debug)]
pub enum PgError {
    /// TCP or startup-level failure (refused, handshake rejected).
    Connection(String),
    /// The server closed the stream mid-conversation.
    ConnectionClosed,
    /// Malformed frame from the server.
    Protocol(String),
    /// A backend message type byte this client does not speak.
    UnknownMessageType(u8),
    /// Unsupported auth method or failed SCRAM/password exchange.
    Auth(String),
    /// The server rejected a statement; `query` is the annotation name.
    Query { query: String, message: String },
    Io(std::io::Error),
}

impl fmt::Display for PgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgError::Connection(e) => write!(f, "Connection error: {}", e),
            PgError::ConnectionClosed => write!(f, "Connection closed by server"),
            PgError::Protocol(e) => write!(f, "Protocol error: {}", e),
            PgError::UnknownMessageType(b) => {
                write!(f, "Unknown backend message type: 0x{:02x}", b)
            }
            PgError::Auth(e) => write!(f, "Auth error: {}", e),
            PgError::Query { query, message } => {
                write!(f, "Query '{}' failed: {}", query, message)
            }
            PgError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PgError {}

impl From<std::io::Error> for PgError {
    fn from(e: std::io::Error) -> Self {
        PgError::Io(e)
    }
}

/// Result type alias for client operations.
pub type PgResult<T> = Result<T, PgError>;
