//! Frontend (client → server) message encoding.
//!
//! Every method clears the caller's buffer and writes exactly one framed
//! message, so a connection can reuse a single send buffer across the whole
//! conversation. Pure computation, no I/O.

use bytes::{BufMut, BytesMut};

/// Protocol version 3.0.
pub const PROTOCOL_VERSION: i32 = 196608;

/// Encodes frontend messages into a reusable buffer.
pub struct PgEncoder;

impl PgEncoder {
    /// StartupMessage: no type byte, protocol version, then alternating
    /// key/value NUL-terminated strings and a final NUL.
    pub fn startup(buf: &mut BytesMut, user: &str, database: &str) {
        buf.clear();
        let content_len = 4 + 5 + user.len() + 1 + 9 + database.len() + 1 + 1;
        buf.reserve(4 + content_len);
        buf.put_i32((content_len + 4) as i32);
        buf.put_i32(PROTOCOL_VERSION);
        buf.put_slice(b"user\0");
        buf.put_slice(user.as_bytes());
        buf.put_u8(0);
        buf.put_slice(b"database\0");
        buf.put_slice(database.as_bytes());
        buf.put_u8(0);
        buf.put_u8(0);
    }

    /// PasswordMessage ('p'): cleartext or md5 digest response.
    pub fn password(buf: &mut BytesMut, password: &str) {
        Self::header(buf, b'p', password.len() + 1);
        buf.put_slice(password.as_bytes());
        buf.put_u8(0);
    }

    /// SASLInitialResponse ('p'): mechanism, then length-prefixed
    /// client-first bytes.
    pub fn sasl_initial_response(buf: &mut BytesMut, mechanism: &str, data: &[u8]) {
        Self::header(buf, b'p', mechanism.len() + 1 + 4 + data.len());
        buf.put_slice(mechanism.as_bytes());
        buf.put_u8(0);
        buf.put_i32(data.len() as i32);
        buf.put_slice(data);
    }

    /// SASLResponse ('p'): raw client-final bytes.
    pub fn sasl_response(buf: &mut BytesMut, data: &[u8]) {
        Self::header(buf, b'p', data.len());
        buf.put_slice(data);
    }

    /// Parse ('P') with the unnamed or a named statement. Zero declared
    /// parameter types: the server infers them, which is the whole point
    /// of Describe.
    pub fn parse(buf: &mut BytesMut, statement: &str, sql: &str) {
        Self::header(buf, b'P', statement.len() + 1 + sql.len() + 1 + 2);
        buf.put_slice(statement.as_bytes());
        buf.put_u8(0);
        buf.put_slice(sql.as_bytes());
        buf.put_u8(0);
        buf.put_i16(0);
    }

    /// Describe ('D') a prepared statement ('S') or portal ('P').
    pub fn describe(buf: &mut BytesMut, portal: bool, name: &str) {
        Self::header(buf, b'D', 1 + name.len() + 1);
        buf.put_u8(if portal { b'P' } else { b'S' });
        buf.put_slice(name.as_bytes());
        buf.put_u8(0);
    }

    /// Close ('C') a prepared statement ('S') or portal ('P').
    pub fn close(buf: &mut BytesMut, portal: bool, name: &str) {
        Self::header(buf, b'C', 1 + name.len() + 1);
        buf.put_u8(if portal { b'P' } else { b'S' });
        buf.put_slice(name.as_bytes());
        buf.put_u8(0);
    }

    /// Sync ('S'): ends one extended-protocol request.
    pub fn sync(buf: &mut BytesMut) {
        Self::header(buf, b'S', 0);
    }

    /// Terminate ('X'): graceful goodbye.
    pub fn terminate(buf: &mut BytesMut) {
        Self::header(buf, b'X', 0);
    }

    /// Simple Query ('Q').
    pub fn query(buf: &mut BytesMut, sql: &str) {
        Self::header(buf, b'Q', sql.len() + 1);
        buf.put_slice(sql.as_bytes());
        buf.put_u8(0);
    }

    fn header(buf: &mut BytesMut, ty: u8, content_len: usize) {
        buf.clear();
        buf.reserve(1 + 4 + content_len);
        buf.put_u8(ty);
        buf.put_i32((content_len + 4) as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_layout() {
        let mut buf = BytesMut::new();
        PgEncoder::startup(&mut buf, "alice", "appdb");

        let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, buf.len());
        let version = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(version, PROTOCOL_VERSION);
        assert_eq!(&buf[8..], b"user\0alice\0database\0appdb\0\0");
    }

    #[test]
    fn test_query() {
        let mut buf = BytesMut::new();
        PgEncoder::query(&mut buf, "SELECT 1");

        assert_eq!(buf[0], b'Q');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len, 13);
        assert_eq!(&buf[5..], b"SELECT 1\0");
    }

    #[test]
    fn test_parse_declares_zero_param_types() {
        let mut buf = BytesMut::new();
        PgEncoder::parse(&mut buf, "", "SELECT $1");

        assert_eq!(buf[0], b'P');
        assert_eq!(&buf[buf.len() - 2..], &[0, 0]);
        assert_eq!(&buf[5..7], b"\0S"); // unnamed statement, then the sql
    }

    #[test]
    fn test_describe_statement_and_portal() {
        let mut buf = BytesMut::new();
        PgEncoder::describe(&mut buf, false, "");
        assert_eq!(buf.as_ref(), &[b'D', 0, 0, 0, 6, b'S', 0]);

        PgEncoder::describe(&mut buf, true, "p1");
        assert_eq!(buf.as_ref(), &[b'D', 0, 0, 0, 8, b'P', b'p', b'1', 0]);
    }

    #[test]
    fn test_sync_and_terminate() {
        let mut buf = BytesMut::new();
        PgEncoder::sync(&mut buf);
        assert_eq!(buf.as_ref(), &[b'S', 0, 0, 0, 4]);

        PgEncoder::terminate(&mut buf);
        assert_eq!(buf.as_ref(), &[b'X', 0, 0, 0, 4]);
    }

    #[test]
    fn test_sasl_initial_response() {
        let mut buf = BytesMut::new();
        PgEncoder::sasl_initial_response(&mut buf, "SCRAM-SHA-256", b"n,,n=,r=abc");

        assert_eq!(buf[0], b'p');
        assert_eq!(&buf[5..19], b"SCRAM-SHA-256\0");
        let data_len = i32::from_be_bytes([buf[19], buf[20], buf[21], buf[22]]);
        assert_eq!(data_len, 11);
        assert_eq!(&buf[23..], b"n,,n=,r=abc");
    }

    #[test]
    fn test_buffer_is_cleared_between_messages() {
        let mut buf = BytesMut::new();
        PgEncoder::query(&mut buf, "SELECT 1");
        let first = buf.len();
        PgEncoder::sync(&mut buf);
        assert_eq!(buf.len(), 5);
        assert!(first > 5);
    }

    #[test]
    fn test_close_statement() {
        let mut buf = BytesMut::new();
        PgEncoder::close(&mut buf, false, "s1");
        assert_eq!(buf.as_ref(), &[b'C', 0, 0, 0, 8, b'S', b's', b'1', 0]);
    }
}
