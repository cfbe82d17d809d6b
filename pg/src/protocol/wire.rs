//! Backend (server → client) messages of the PostgreSQL wire protocol.
//!
//! Pure decoding over a byte slice, no I/O. All integers are big-endian.
//! Reference: https://www.postgresql.org/docs/current/protocol-message-formats.html

use crate::error::{PgError, PgResult};

/// Backend message types this client interprets.
#[derive(Debug, Clone)]
pub enum BackendMessage {
    AuthenticationOk,
    AuthenticationCleartextPassword,
    AuthenticationMD5Password([u8; 4]),
    AuthenticationSASL(Vec<String>),
    AuthenticationSASLContinue(Vec<u8>),
    AuthenticationSASLFinal(Vec<u8>),
    /// Server config report during startup.
    ParameterStatus {
        name: String,
        value: String,
    },
    /// Cancellation key (consumed, unused).
    BackendKeyData {
        process_id: i32,
        secret_key: i32,
    },
    ReadyForQuery(TransactionStatus),
    ParseComplete,
    BindComplete,
    CloseComplete,
    NoData,
    /// Type OIDs the server inferred for `$N` parameters.
    ParameterDescription(Vec<u32>),
    RowDescription(Vec<FieldDescription>),
    DataRow(Vec<Option<Vec<u8>>>),
    CommandComplete(String),
    ErrorResponse(ErrorFields),
    NoticeResponse(ErrorFields),
    EmptyQueryResponse,
}

/// Transaction status byte of ReadyForQuery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,    // 'I'
    InBlock, // 'T'
    Failed,  // 'E'
}

/// One entry of a RowDescription, exactly as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
    /// Originating table OID, zero for computed expressions.
    pub table_oid: u32,
    /// Attribute number within the table, zero for expressions.
    pub column_attr: i16,
    pub type_oid: u32,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: i16,
}

/// Fields of an ErrorResponse / NoticeResponse.
#[derive(Debug, Clone, Default)]
pub struct ErrorFields {
    pub severity: String,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
}

impl BackendMessage {
    /// Decode one message from the front of `buf`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete
    /// frame, and `Ok(Some((msg, consumed)))` otherwise. Variable-length
    /// payloads are copied out, so the caller may compact its receive
    /// buffer as soon as the message is returned.
    pub fn decode(buf: &[u8]) -> PgResult<Option<(Self, usize)>> {
        if buf.len() < 5 {
            return Ok(None);
        }
        let msg_type = buf[0];
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        if len < 4 {
            return Err(PgError::Protocol(format!("frame length {} < 4", len)));
        }
        let len = len as usize;
        if buf.len() < len + 1 {
            return Ok(None);
        }
        let payload = &buf[5..len + 1];

        let message = match msg_type {
            b'R' => Self::decode_auth(payload)?,
            b'S' => Self::decode_parameter_status(payload)?,
            b'K' => Self::decode_backend_key(payload)?,
            b'Z' => Self::decode_ready_for_query(payload)?,
            b'1' => BackendMessage::ParseComplete,
            b'2' => BackendMessage::BindComplete,
            b'3' => BackendMessage::CloseComplete,
            b'n' => BackendMessage::NoData,
            b't' => Self::decode_parameter_description(payload)?,
            b'T' => Self::decode_row_description(payload)?,
            b'D' => Self::decode_data_row(payload)?,
            b'C' => Self::decode_command_complete(payload),
            b'E' => BackendMessage::ErrorResponse(parse_error_fields(payload)?),
            b'N' => BackendMessage::NoticeResponse(parse_error_fields(payload)?),
            b'I' => BackendMessage::EmptyQueryResponse,
            other => return Err(PgError::UnknownMessageType(other)),
        };

        Ok(Some((message, len + 1)))
    }

    fn decode_auth(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        let code = r.i32()?;
        match code {
            0 => Ok(BackendMessage::AuthenticationOk),
            3 => Ok(BackendMessage::AuthenticationCleartextPassword),
            5 => {
                let salt = r.take(4)?;
                Ok(BackendMessage::AuthenticationMD5Password([
                    salt[0], salt[1], salt[2], salt[3],
                ]))
            }
            10 => {
                let mut mechanisms = Vec::new();
                while !r.remaining().is_empty() && r.remaining()[0] != 0 {
                    mechanisms.push(r.cstr()?);
                }
                Ok(BackendMessage::AuthenticationSASL(mechanisms))
            }
            11 => Ok(BackendMessage::AuthenticationSASLContinue(
                r.remaining().to_vec(),
            )),
            12 => Ok(BackendMessage::AuthenticationSASLFinal(
                r.remaining().to_vec(),
            )),
            other => Err(PgError::Auth(format!(
                "unsupported authentication request (code {})",
                other
            ))),
        }
    }

    fn decode_parameter_status(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        Ok(BackendMessage::ParameterStatus {
            name: r.cstr()?,
            value: r.cstr()?,
        })
    }

    fn decode_backend_key(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        Ok(BackendMessage::BackendKeyData {
            process_id: r.i32()?,
            secret_key: r.i32()?,
        })
    }

    fn decode_ready_for_query(payload: &[u8]) -> PgResult<Self> {
        let status = match payload.first() {
            Some(b'I') => TransactionStatus::Idle,
            Some(b'T') => TransactionStatus::InBlock,
            Some(b'E') => TransactionStatus::Failed,
            other => {
                return Err(PgError::Protocol(format!(
                    "unknown transaction status: {:?}",
                    other
                )));
            }
        };
        Ok(BackendMessage::ReadyForQuery(status))
    }

    fn decode_parameter_description(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.i16()?;
        if count < 0 {
            return Err(PgError::Protocol("negative parameter count".to_string()));
        }
        let mut oids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            oids.push(r.u32()?);
        }
        Ok(BackendMessage::ParameterDescription(oids))
    }

    fn decode_row_description(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.i16()?;
        if count < 0 {
            return Err(PgError::Protocol("negative field count".to_string()));
        }
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            fields.push(FieldDescription {
                name: r.cstr()?,
                table_oid: r.u32()?,
                column_attr: r.i16()?,
                type_oid: r.u32()?,
                type_size: r.i16()?,
                type_modifier: r.i32()?,
                format: r.i16()?,
            });
        }
        Ok(BackendMessage::RowDescription(fields))
    }

    fn decode_data_row(payload: &[u8]) -> PgResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.i16()?;
        if count < 0 {
            return Err(PgError::Protocol("negative column count".to_string()));
        }
        let mut columns = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = r.i32()?;
            if len == -1 {
                columns.push(None);
            } else if len < 0 {
                return Err(PgError::Protocol(format!("bad column length {}", len)));
            } else {
                columns.push(Some(r.take(len as usize)?.to_vec()));
            }
        }
        Ok(BackendMessage::DataRow(columns))
    }

    fn decode_command_complete(payload: &[u8]) -> Self {
        let tag = String::from_utf8_lossy(payload)
            .trim_end_matches('\0')
            .to_string();
        BackendMessage::CommandComplete(tag)
    }
}

fn parse_error_fields(payload: &[u8]) -> PgResult<ErrorFields> {
    let mut fields = ErrorFields::default();
    let mut r = Reader::new(payload);
    while let Some(&field_type) = r.remaining().first() {
        if field_type == 0 {
            break;
        }
        r.take(1)?;
        let value = r.cstr()?;
        match field_type {
            b'S' => fields.severity = value,
            b'C' => fields.code = value,
            b'M' => fields.message = value,
            b'D' => fields.detail = Some(value),
            b'H' => fields.hint = Some(value),
            _ => {}
        }
    }
    Ok(fields)
}

/// Bounds-checked cursor over a message payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> PgResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(PgError::Protocol("truncated message payload".to_string()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn i16(&mut self) -> PgResult<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> PgResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u32(&mut self) -> PgResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// NUL-terminated string, duplicated out of the payload.
    fn cstr(&mut self) -> PgResult<String> {
        let rest = self.remaining();
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| PgError::Protocol("missing NUL terminator".to_string()))?;
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(s)
    }
}
