use {
    async_trait::async_trait,
    std::{future::Future, time::Duration},
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ChatId, MessageId, ReplyParameters},
    },
    tracing::{debug, warn},
};

use parlor_channels::{ChannelOutbound, SentMessage};

use crate::Error;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for one Telegram bot account.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
    account_id: String,
    reply_to_message: bool,
}

impl TelegramOutbound {
    pub fn new(bot: Bot, account_id: impl Into<String>) -> Self {
        Self {
            bot,
            account_id: account_id.into(),
            reply_to_message: true,
        }
    }

    /// Whether the first chunk is threaded under the inbound message.
    #[must_use]
    pub fn with_reply_to_message(mut self, enabled: bool) -> Self {
        self.reply_to_message = enabled;
        self
    }

    /// Build reply parameters only when `reply_to_message` is enabled.
    fn reply_params(&self, reply_to: Option<&str>) -> Option<ReplyParameters> {
        if self.reply_to_message {
            parse_reply_params(reply_to)
        } else {
            None
        }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        target: &str,
        operation: &'static str,
        mut request: F,
    ) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let account_id = self.account_id.as_str();
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            account_id,
                            target,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        account_id,
                        target,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

/// Parse a platform message ID string into Telegram `ReplyParameters`.
/// Returns `None` if the string is not a valid i32 (Telegram message IDs are i32).
fn parse_reply_params(reply_to: Option<&str>) -> Option<ReplyParameters> {
    reply_to
        .and_then(|id| id.parse::<i32>().ok())
        .map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply())
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn parse_chat_id(to: &str) -> parlor_channels::Result<ChatId> {
    Ok(ChatId(to.parse::<i64>()?))
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(
        &self,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> parlor_channels::Result<SentMessage> {
        let chat_id = parse_chat_id(to)?;
        let reply_params = self.reply_params(reply_to);

        let message = self
            .run_telegram_request_with_retry(to, "send message", || {
                let mut req = self.bot.send_message(chat_id, text);
                if let Some(ref rp) = reply_params {
                    req = req.reply_parameters(rp.clone());
                }
                async move { req.await }
            })
            .await
            .map_err(Error::from)?;

        debug!(
            account_id = %self.account_id,
            chat_id = to,
            message_id = message.id.0,
            reply_to = ?reply_to,
            text_len = text.len(),
            "telegram message sent"
        );

        Ok(SentMessage {
            message_id: message.id.0.to_string(),
            chat_id: to.to_string(),
            text: message.text().unwrap_or(text).to_string(),
            date: message.date.timestamp(),
        })
    }

    async fn resolve_file(&self, file_id: &str) -> parlor_channels::Result<String> {
        let file = self
            .run_telegram_request_with_retry(file_id, "get file", || {
                let req = self.bot.get_file(file_id);
                async move { req.await }
            })
            .await
            .map_err(Error::from)?;

        // https://api.telegram.org/file/bot<token>/<file_path>
        let url = self
            .bot
            .api_url()
            .join(&format!("file/bot{}/{}", self.bot.token(), file.path))
            .map_err(|e| Error::external("build telegram file url", e))?;
        Ok(url.to_string())
    }

    async fn send_typing(&self, to: &str) -> parlor_channels::Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::MockTelegramApi,
        teloxide::{ApiError, types::Seconds},
    };

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(Seconds::from_seconds(3));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(3)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Api(ApiError::BotBlocked);
        assert!(retry_after_duration(&err).is_none());
    }

    #[test]
    fn reply_params_need_numeric_ids() {
        assert!(parse_reply_params(Some("42")).is_some());
        assert!(parse_reply_params(Some("abc")).is_none());
        assert!(parse_reply_params(None).is_none());
    }

    #[tokio::test]
    async fn send_text_returns_platform_message() {
        let api = MockTelegramApi::start().await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        let sent = outbound.send_text("-500", "hello group", Some("12")).await.unwrap();
        assert_eq!(sent.chat_id, "-500");
        assert_eq!(sent.text, "hello group");
        assert_eq!(sent.message_id, "100");

        let requests = api.send_message_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["chat_id"], -500);
        assert_eq!(requests[0]["text"], "hello group");
        assert_eq!(requests[0]["reply_parameters"]["message_id"], 12);
        api.shutdown().await;
    }

    #[tokio::test]
    async fn reply_threading_can_be_disabled() {
        let api = MockTelegramApi::start().await;
        let outbound = TelegramOutbound::new(api.bot(), "main").with_reply_to_message(false);

        outbound.send_text("42", "hi", Some("12")).await.unwrap();
        let requests = api.send_message_requests();
        assert!(requests[0].get("reply_parameters").is_none());
        api.shutdown().await;
    }

    #[tokio::test]
    async fn send_text_waits_out_rate_limit() {
        let api = MockTelegramApi::start().await;
        api.rate_limit_next_sends(1);
        let outbound = TelegramOutbound::new(api.bot(), "main");

        let sent = outbound.send_text("42", "after wait", None).await.unwrap();
        assert_eq!(sent.text, "after wait");
        assert_eq!(api.send_message_requests().len(), 2);
        api.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_chat_id_is_rejected_without_request() {
        let api = MockTelegramApi::start().await;
        let outbound = TelegramOutbound::new(api.bot(), "main");
        assert!(outbound.send_text("not-a-chat", "x", None).await.is_err());
        assert!(api.send_message_requests().is_empty());
        api.shutdown().await;
    }

    #[tokio::test]
    async fn resolve_file_builds_download_url() {
        let api = MockTelegramApi::start().await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        let url = outbound.resolve_file("photo-large").await.unwrap();
        assert_eq!(
            url,
            format!("{}file/bottest-token/photos/photo-large.jpg", api.base_url())
        );
        api.shutdown().await;
    }
}
