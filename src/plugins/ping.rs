//! Ping plugin
//!
//! Answers `<botnick>: ping` (any case) with a greeting addressed to the
//! user who asked.

use bytes::Bytes;

use crate::action::Action;
use crate::context::Context;
use crate::error::Result;
use crate::line::Line;
use crate::plugins::Plugin;

/// Responds to pings addressed to the bot
#[derive(Debug, Default, Clone, Copy)]
pub struct PingPlugin;

impl PingPlugin {
    /// Configuration name
    pub const NAME: &'static str = "ping";

    /// The `WRITE` command sent back through the response queue
    pub fn greeting(line: &Line) -> String {
        format!(
            "WRITE {} {} Are you in need of my services, {} ?",
            line.chatbot_id, line.channel, line.user
        )
    }
}

#[async_trait::async_trait]
impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn invoke(&self, line: &Line, _ctx: &Context) -> Result<Action> {
        if line.is_addressed_command("ping") {
            Ok(Action::Respond(Bytes::from(Self::greeting(line))))
        } else {
            Ok(Action::NoOp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;

    #[tokio::test]
    async fn test_ping_responds_to_user() {
        let (ctx, _, _) = test_context();
        let line = Line::decode(
            r##"{"Content":"bot: ping","BotNick":"bot","User":"alice","Channel":"#chan","ChatBotId":"3"}"##,
        )
        .unwrap();

        let action = PingPlugin.invoke(&line, &ctx).await.unwrap();
        assert_eq!(
            action,
            Action::Respond(Bytes::from_static(
                b"WRITE 3 #chan Are you in need of my services, alice ?"
            ))
        );
    }

    #[tokio::test]
    async fn test_ping_is_case_insensitive() {
        let (ctx, _, _) = test_context();
        let line =
            Line::decode(r#"{"Content":"Bot: PING","BotNick":"bot","User":"bob"}"#).unwrap();
        let action = PingPlugin.invoke(&line, &ctx).await.unwrap();
        assert!(matches!(action, Action::Respond(ref p) if p.ends_with(b"bob ?")));
    }

    #[tokio::test]
    async fn test_ping_ignores_other_content() {
        let (ctx, _, _) = test_context();
        for content in ["hello world", "bot: pingpong", "ping", "other: ping"] {
            let line = Line::decode(
                serde_json::json!({"Content": content, "BotNick": "bot", "User": "alice"})
                    .to_string(),
            )
            .unwrap();
            assert_eq!(PingPlugin.invoke(&line, &ctx).await.unwrap(), Action::NoOp);
        }
    }
}
