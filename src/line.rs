//! Decoded chat lines
//!
//! A [`Line`] is one chat event popped from the ingest queue. The wire
//! format is a JSON object with the canonical fields
//! `Content`, `User`, `Channel`, `Command`, `BotNick` and `ChatBotId`.
//! Older producers wrote `Text` and `Nick`; those are accepted as aliases
//! for `Content` and `User`. Every field is optional.
//!
//! # Example
//!
//! ```
//! use botbot_plugins::line::Line;
//!
//! let payload = r#"{"Text":"hello world","Nick":"yml","Command":"PRIVMSG"}"#;
//! let line = Line::decode(payload).unwrap();
//! assert_eq!(line.content, "hello world");
//! assert_eq!(line.user, "yml");
//! assert!(line.is_message());
//! ```

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BotbotError, Result};

/// Protocol command carried by ordinary user messages
pub const MESSAGE_COMMAND: &str = "PRIVMSG";

/// A decoded chat event
///
/// Immutable once decoded. The exact payload it was decoded from is kept
/// alongside the fields so it can be stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Line {
    /// Message text
    #[serde(rename = "Content", alias = "Text", default)]
    pub content: String,

    /// Nick of the user the line came from
    #[serde(rename = "User", alias = "Nick", default)]
    pub user: String,

    /// Channel the line was seen on
    #[serde(rename = "Channel", default)]
    pub channel: String,

    /// Protocol command, `PRIVMSG` for user messages
    #[serde(rename = "Command", default)]
    pub command: String,

    /// Nick the bot is connected as
    #[serde(rename = "BotNick", default)]
    pub bot_nick: String,

    /// Identifier of the chat bot connection that saw the line
    #[serde(rename = "ChatBotId", default, deserialize_with = "string_or_number")]
    pub chatbot_id: String,

    #[serde(skip)]
    raw: Bytes,
}

impl Line {
    /// Decode a raw queue payload.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Decode` if the payload is not a JSON object or a
    /// field has the wrong type.
    pub fn decode(payload: impl Into<Bytes>) -> Result<Self> {
        let raw = payload.into();
        if raw.iter().find(|b| !b.is_ascii_whitespace()) != Some(&b'{') {
            return Err(BotbotError::Decode("line payload is not a JSON object".to_string()).into());
        }
        let mut line: Line = serde_json::from_slice(&raw)
            .map_err(|e| BotbotError::Decode(format!("malformed line payload: {}", e)))?;
        line.raw = raw;
        Ok(line)
    }

    /// The payload this line was decoded from
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// True when the line is an ordinary user message rather than a
    /// protocol or control event
    pub fn is_message(&self) -> bool {
        self.command.eq_ignore_ascii_case(MESSAGE_COMMAND)
    }

    /// True when the line is `<botnick>: <command>`, ignoring case
    pub fn is_addressed_command(&self, command: &str) -> bool {
        if self.bot_nick.is_empty() {
            return false;
        }
        let expected = format!("{}: {}", self.bot_nick, command);
        self.content.to_lowercase() == expected.to_lowercase()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
        Missing(()),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
        Id::Missing(()) => String::new(),
    })
}
