//! Redis-backed queue
//!
//! [`RedisQueue`] speaks `BLPOP` and `RPUSH` over RESP. Pops and pushes use
//! separate connections so a long blocking pop never holds up a response.
//! A connection that fails mid-command is dropped and reopened on the next
//! call; the failure itself surfaces as a `BotbotError::Queue`. An error
//! reply from the server is reported the same way but keeps the connection.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{BotbotError, Result};
use crate::queue::resp::{command, Frame, RespCodec};
use crate::queue::{Popped, Queue};

const DEFAULT_PORT: u16 = 6379;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

type Connection = Framed<TcpStream, RespCodec>;

/// Where and how to connect
#[derive(Clone)]
struct Target {
    addr: String,
    username: Option<String>,
    password: Option<String>,
    db: Option<u32>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .finish()
    }
}

impl Target {
    fn from_url(url: &Url) -> Result<Self> {
        let host = url.host_str().unwrap_or("127.0.0.1");
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let db = match url.path().trim_start_matches('/') {
            "" => None,
            raw => Some(raw.parse::<u32>().map_err(|_| {
                BotbotError::Config(format!("invalid redis database in url: {}", raw))
            })?),
        };

        Ok(Self {
            addr: format!("{}:{}", host, port),
            username: Some(url.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: url.password().map(str::to_string),
            db,
        })
    }

    async fn open(&self) -> Result<Connection> {
        debug!(addr = %self.addr, "Opening redis connection");
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| BotbotError::Queue(format!("connecting to {} timed out", self.addr)))?
            .map_err(|e| BotbotError::Queue(format!("cannot connect to {}: {}", self.addr, e)))?;
        let mut conn = Framed::new(stream, RespCodec);

        if let Some(password) = &self.password {
            let mut args = vec![Bytes::from_static(b"AUTH")];
            if let Some(username) = &self.username {
                args.push(Bytes::from(username.clone()));
            }
            args.push(Bytes::from(password.clone()));
            let reply = round_trip(&mut conn, args, REPLY_TIMEOUT).await?;
            expect_ok(server_reply(reply)?, "AUTH")?;
        }

        if let Some(db) = self.db {
            let select = command(["SELECT".to_string(), db.to_string()]);
            let reply = round_trip(&mut conn, select, REPLY_TIMEOUT).await?;
            expect_ok(server_reply(reply)?, "SELECT")?;
        }

        match server_reply(round_trip(&mut conn, command(["PING"]), REPLY_TIMEOUT).await?)? {
            Frame::Simple(pong) if pong == "PONG" => Ok(conn),
            other => Err(unexpected("PING", &other).into()),
        }
    }
}

/// Queue client for a Redis server
#[derive(Debug)]
pub struct RedisQueue {
    target: Target,
    pop_conn: Mutex<Option<Connection>>,
    push_conn: Mutex<Option<Connection>>,
}

impl RedisQueue {
    /// Connect to the server at `url` (`redis://[user:password@]host[:port][/db]`).
    ///
    /// One connection is opened eagerly so an unreachable server is reported
    /// at startup; the push connection is opened on first use.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Queue` if the server cannot be reached or
    /// rejects the handshake, `BotbotError::Config` for a malformed url.
    pub async fn connect(url: &Url) -> Result<Self> {
        let target = Target::from_url(url)?;
        let conn = target.open().await?;
        Ok(Self {
            target,
            pop_conn: Mutex::new(Some(conn)),
            push_conn: Mutex::new(None),
        })
    }

    /// Address this client talks to
    pub fn addr(&self) -> &str {
        &self.target.addr
    }

    async fn call(
        &self,
        slot: &Mutex<Option<Connection>>,
        args: Vec<Bytes>,
        reply_timeout: Duration,
    ) -> Result<Frame> {
        let mut guard = slot.lock().await;
        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.target.open().await?,
        };

        match round_trip(&mut conn, args, reply_timeout).await {
            // An error reply leaves the connection usable.
            Ok(frame) => {
                *guard = Some(conn);
                server_reply(frame)
            }
            Err(e) => {
                warn!(addr = %self.target.addr, error = %e, "Dropping redis connection");
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl Queue for RedisQueue {
    async fn blocking_pop(&self, keys: &[String], timeout: Duration) -> Result<Option<Popped>> {
        let wait_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        let mut args = vec![Bytes::from_static(b"BLPOP")];
        args.extend(keys.iter().map(|k| Bytes::from(k.clone())));
        args.push(Bytes::from(wait_secs.max(1).to_string()));

        let reply = self
            .call(&self.pop_conn, args, timeout + REPLY_TIMEOUT)
            .await?;
        parse_pop_reply(reply)
    }

    async fn push(&self, key: &str, payload: Bytes) -> Result<()> {
        trace!(key = %key, bytes = payload.len(), "RPUSH");
        let args = vec![
            Bytes::from_static(b"RPUSH"),
            Bytes::from(key.to_string()),
            payload,
        ];
        match self.call(&self.push_conn, args, REPLY_TIMEOUT).await? {
            Frame::Integer(_) => Ok(()),
            other => Err(unexpected("RPUSH", &other).into()),
        }
    }
}

async fn round_trip(
    conn: &mut Connection,
    args: Vec<Bytes>,
    reply_timeout: Duration,
) -> Result<Frame> {
    conn.send(args).await?;
    match tokio::time::timeout(reply_timeout, conn.next()).await {
        Err(_) => Err(BotbotError::Queue("no reply from redis in time".to_string()).into()),
        Ok(None) => Err(BotbotError::Queue("redis closed the connection".to_string()).into()),
        Ok(Some(Err(e))) => Err(e.into()),
        Ok(Some(Ok(frame))) => Ok(frame),
    }
}

/// Turn a server error reply into a `BotbotError::Queue`
fn server_reply(frame: Frame) -> Result<Frame> {
    match frame {
        Frame::Error(message) => Err(BotbotError::Queue(message).into()),
        frame => Ok(frame),
    }
}

fn parse_pop_reply(reply: Frame) -> Result<Option<Popped>> {
    if reply.is_null() {
        return Ok(None);
    }
    match reply {
        Frame::Array(Some(items)) => match <[Frame; 2]>::try_from(items) {
            Ok([Frame::Bulk(Some(key)), Frame::Bulk(Some(payload))]) => Ok(Some(Popped {
                key: String::from_utf8_lossy(&key).into_owned(),
                payload,
            })),
            Ok(other) => Err(unexpected("BLPOP", &Frame::Array(Some(other.into()))).into()),
            Err(items) => Err(unexpected("BLPOP", &Frame::Array(Some(items))).into()),
        },
        other => Err(unexpected("BLPOP", &other).into()),
    }
}

fn expect_ok(reply: Frame, what: &str) -> Result<()> {
    match reply {
        Frame::Simple(ok) if ok == "OK" => Ok(()),
        other => Err(unexpected(what, &other).into()),
    }
}

fn unexpected(what: &str, reply: &Frame) -> BotbotError {
    BotbotError::Queue(format!("unexpected {} reply: {:?}", what, reply))
}
