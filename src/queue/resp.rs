//! RESP2 framing for the Redis queue client
//!
//! Only what the queue needs: commands are sent as arrays of bulk strings
//! and every reply type is decoded.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BotbotError;

/// A decoded RESP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+OK`
    Simple(String),
    /// `-ERR ...`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$5\r\nhello`, `None` for the null bulk string
    Bulk(Option<Bytes>),
    /// `*2\r\n...`, `None` for the null array
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// True for the null bulk string and the null array
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None))
    }
}

/// Codec turning commands into RESP arrays and bytes into [`Frame`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct RespCodec;

impl Encoder<Vec<Bytes>> for RespCodec {
    type Error = BotbotError;

    fn encode(&mut self, args: Vec<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(format!("*{}\r\n", args.len()).as_bytes());
        for arg in args {
            dst.put_slice(format!("${}\r\n", arg.len()).as_bytes());
            dst.put_slice(&arg);
            dst.put_slice(b"\r\n");
        }
        Ok(())
    }
}

impl Decoder for RespCodec {
    type Item = Frame;
    type Error = BotbotError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        match parse(src, 0)? {
            Some((frame, consumed)) => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

/// Largest bulk string Redis will hand out (512 MB)
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Largest element count accepted in one array reply
const MAX_ARRAY_LEN: i64 = i32::MAX as i64;
/// Elements reserved up front; larger arrays grow as items arrive
const PREALLOC_LIMIT: i64 = 64;

/// Parse one frame starting at `pos`; `None` means more bytes are needed.
fn parse(src: &[u8], pos: usize) -> Result<Option<(Frame, usize)>, BotbotError> {
    let Some((line, after)) = read_line(src, pos) else {
        return Ok(None);
    };
    let Some((&tag, body)) = line.split_first() else {
        return Err(protocol("empty reply line"));
    };

    match tag {
        b'+' => Ok(Some((Frame::Simple(text(body)?), after))),
        b'-' => Ok(Some((Frame::Error(text(body)?), after))),
        b':' => Ok(Some((Frame::Integer(number(body)?), after))),
        b'$' => {
            let len = number(body)?;
            if len < 0 {
                return Ok(Some((Frame::Bulk(None), after)));
            }
            if len > MAX_BULK_LEN {
                return Err(protocol(&format!("bulk string of {} bytes exceeds limit", len)));
            }
            let end = after + len as usize;
            if src.len() < end + 2 {
                return Ok(None);
            }
            if &src[end..end + 2] != b"\r\n" {
                return Err(protocol("bulk string missing terminator"));
            }
            let data = Bytes::copy_from_slice(&src[after..end]);
            Ok(Some((Frame::Bulk(Some(data)), end + 2)))
        }
        b'*' => {
            let count = number(body)?;
            if count < 0 {
                return Ok(Some((Frame::Array(None), after)));
            }
            if count > MAX_ARRAY_LEN {
                return Err(protocol(&format!("array of {} elements exceeds limit", count)));
            }
            let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT) as usize);
            let mut cursor = after;
            for _ in 0..count {
                match parse(src, cursor)? {
                    Some((item, next)) => {
                        items.push(item);
                        cursor = next;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Frame::Array(Some(items)), cursor)))
        }
        other => Err(protocol(&format!("unknown reply type byte 0x{:02x}", other))),
    }
}

fn read_line(src: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = src.get(pos..)?;
    let idx = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..idx], pos + idx + 2))
}

fn text(body: &[u8]) -> Result<String, BotbotError> {
    String::from_utf8(body.to_vec()).map_err(|_| protocol("reply line is not UTF-8"))
}

fn number(body: &[u8]) -> Result<i64, BotbotError> {
    text(body)?
        .parse()
        .map_err(|_| protocol("reply length is not a number"))
}

fn protocol(message: &str) -> BotbotError {
    BotbotError::Queue(format!("RESP protocol error: {}", message))
}

/// Build a command from string-like arguments
pub fn command<I, A>(args: I) -> Vec<Bytes>
where
    I: IntoIterator<Item = A>,
    A: Into<Bytes>,
{
    args.into_iter().map(Into::into).collect()
}
