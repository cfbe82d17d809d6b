//! Blocking PostgreSQL connection.
//!
//! One connection serves one caller, synchronously: every suspension point
//! is a blocking read or write on the TCP stream. `recv_msg` is the only
//! framing loop; everything else is sequenced on top of it.

use bytes::BytesMut;
use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::{PgError, PgResult};
use crate::protocol::{BackendMessage, PgEncoder, ScramClient};

/// Fixed receive window. Catalog and describe responses are small; anything
/// that cannot fit here is a protocol-level surprise we refuse to buffer.
const RECV_BUF_SIZE: usize = 16 * 1024;

/// Where and as whom to connect.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// A raw PostgreSQL connection.
pub struct Connection {
    stream: TcpStream,
    recv_buf: Vec<u8>,
    /// Unconsumed bytes live in `recv_buf[start..len]`.
    start: usize,
    len: usize,
    send_buf: BytesMut,
    terminated: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Establish a TCP session, run the startup/auth exchange, and consume
    /// server status messages until the first ReadyForQuery.
    pub fn connect(params: &ConnectParams) -> PgResult<Self> {
        let stream = TcpStream::connect((params.host.as_str(), params.port)).map_err(|e| {
            PgError::Connection(format!("{}:{}: {}", params.host, params.port, e))
        })?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream,
            recv_buf: vec![0u8; RECV_BUF_SIZE],
            start: 0,
            len: 0,
            send_buf: BytesMut::with_capacity(1024),
            terminated: false,
        };

        PgEncoder::startup(&mut conn.send_buf, &params.user, &params.database);
        conn.flush_send_buf()?;
        conn.handle_startup(&params.user, params.password.as_deref())?;
        Ok(conn)
    }

    /// Auth dispatch driven by the first `R` messages after Startup.
    fn handle_startup(&mut self, user: &str, password: Option<&str>) -> PgResult<()> {
        let mut scram: Option<ScramClient> = None;

        loop {
            match self.recv_msg()? {
                BackendMessage::AuthenticationOk => {}
                BackendMessage::AuthenticationCleartextPassword => {
                    let password = required_password(password)?;
                    PgEncoder::password(&mut self.send_buf, password);
                    self.flush_send_buf()?;
                }
                BackendMessage::AuthenticationMD5Password(salt) => {
                    let password = required_password(password)?;
                    let digest = md5_password(user, password, &salt);
                    PgEncoder::password(&mut self.send_buf, &digest);
                    self.flush_send_buf()?;
                }
                BackendMessage::AuthenticationSASL(mechanisms) => {
                    let password = required_password(password)?;
                    if !mechanisms.iter().any(|m| m == "SCRAM-SHA-256") {
                        return Err(PgError::Auth(format!(
                            "server offers no supported SASL mechanism (available: {:?})",
                            mechanisms
                        )));
                    }
                    let client = ScramClient::new(user, password);
                    let first = client.client_first_message();
                    PgEncoder::sasl_initial_response(&mut self.send_buf, "SCRAM-SHA-256", &first);
                    self.flush_send_buf()?;
                    scram = Some(client);
                }
                BackendMessage::AuthenticationSASLContinue(data) => {
                    let client = scram
                        .as_mut()
                        .ok_or_else(|| PgError::Auth("SASL continue without initial".to_string()))?;
                    let response = client.process_server_first(&data).map_err(PgError::Auth)?;
                    PgEncoder::sasl_response(&mut self.send_buf, &response);
                    self.flush_send_buf()?;
                }
                BackendMessage::AuthenticationSASLFinal(signature) => {
                    let client = scram
                        .as_ref()
                        .ok_or_else(|| PgError::Auth("SASL final without initial".to_string()))?;
                    client.verify_server_final(&signature).map_err(PgError::Auth)?;
                }
                // Server config and cancel key: consumed, unused.
                BackendMessage::ParameterStatus { .. }
                | BackendMessage::BackendKeyData { .. }
                | BackendMessage::NoticeResponse(_) => {}
                BackendMessage::ReadyForQuery(_) => return Ok(()),
                BackendMessage::ErrorResponse(err) => {
                    return Err(PgError::Connection(err.message));
                }
                other => {
                    return Err(PgError::Protocol(format!(
                        "unexpected message during startup: {:?}",
                        other
                    )));
                }
            }
        }
    }

    /// Receive one backend message. The framing loop: decode what is
    /// buffered, compact, read more when the frame is incomplete.
    pub fn recv_msg(&mut self) -> PgResult<BackendMessage> {
        loop {
            if let Some((msg, consumed)) =
                BackendMessage::decode(&self.recv_buf[self.start..self.len])?
            {
                self.start += consumed;
                if self.start > self.recv_buf.len() / 2 {
                    self.compact();
                }
                return Ok(msg);
            }

            if self.start > 0 {
                self.compact();
            }
            if self.len == self.recv_buf.len() {
                return Err(PgError::Protocol(format!(
                    "message larger than the {} byte receive buffer",
                    RECV_BUF_SIZE
                )));
            }
            let n = self.stream.read(&mut self.recv_buf[self.len..])?;
            if n == 0 {
                return Err(PgError::ConnectionClosed);
            }
            self.len += n;
        }
    }

    /// Accumulate messages until (and including) the next ReadyForQuery.
    pub fn recv_until_ready(&mut self) -> PgResult<Vec<BackendMessage>> {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv_msg()?;
            let done = matches!(msg, BackendMessage::ReadyForQuery(_));
            messages.push(msg);
            if done {
                return Ok(messages);
            }
        }
    }

    /// Issue Parse/Describe/Sync for the unnamed statement as one
    /// contiguous request; the caller collects with `recv_until_ready`.
    pub fn parse_describe_sync(&mut self, sql: &str) -> PgResult<()> {
        PgEncoder::parse(&mut self.send_buf, "", sql);
        self.flush_send_buf()?;
        PgEncoder::describe(&mut self.send_buf, false, "");
        self.flush_send_buf()?;
        PgEncoder::sync(&mut self.send_buf);
        self.flush_send_buf()
    }

    /// Run one simple Query and return its DataRow payloads. Used for
    /// catalog lookups between introspections.
    pub fn simple_query(&mut self, sql: &str) -> PgResult<Vec<Vec<Option<Vec<u8>>>>> {
        PgEncoder::query(&mut self.send_buf, sql);
        self.flush_send_buf()?;

        let mut rows = Vec::new();
        let mut error = None;
        for msg in self.recv_until_ready()? {
            match msg {
                BackendMessage::DataRow(columns) => rows.push(columns),
                BackendMessage::ErrorResponse(err) => error = Some(err),
                _ => {}
            }
        }
        match error {
            Some(err) => Err(PgError::Query {
                query: "pg_catalog".to_string(),
                message: err.message,
            }),
            None => Ok(rows),
        }
    }

    /// Gracefully close by sending Terminate.
    pub fn close(mut self) -> PgResult<()> {
        PgEncoder::terminate(&mut self.send_buf);
        self.flush_send_buf()?;
        self.terminated = true;
        Ok(())
    }

    fn flush_send_buf(&mut self) -> PgResult<()> {
        self.stream.write_all(&self.send_buf)?;
        Ok(())
    }

    fn compact(&mut self) {
        self.recv_buf.copy_within(self.start..self.len, 0);
        self.len -= self.start;
        self.start = 0;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Best effort: tell the server we are done. TCP teardown covers
        // the failure case.
        if !self.terminated {
            let _ = self.stream.write_all(&[b'X', 0, 0, 0, 4]);
        }
    }
}

fn required_password(password: Option<&str>) -> PgResult<&str> {
    password.ok_or_else(|| {
        PgError::Auth("server requested a password but none was supplied".to_string())
    })
}

/// `"md5" || hex(md5( hex(md5(password || user)) || salt ))`
fn md5_password(user: &str, password: &str, salt: &[u8; 4]) -> String {
    let inner = format!("{:x}", md5::compute(format!("{}{}", password, user)));
    let mut outer = inner.into_bytes();
    outer.extend_from_slice(salt);
    format!("md5{:x}", md5::compute(outer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_password_digest() {
        // Precomputed for user "alice", password "secret", salt 01 02 03 04.
        assert_eq!(
            md5_password("alice", "secret", &[1, 2, 3, 4]),
            "md598a0412b9c31436fc53776e863350083"
        );
    }

    #[test]
    fn test_connect_params_debug_hides_password() {
        let params = ConnectParams {
            host: "localhost".to_string(),
            port: 5432,
            user: "alice".to_string(),
            password: Some("hunter2".to_string()),
            database: "appdb".to_string(),
        };
        let s = format!("{:?}", params);
        assert!(!s.contains("hunter2"));
    }
}
