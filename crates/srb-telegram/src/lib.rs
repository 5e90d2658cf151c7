//! Telegram adapter (teloxide).
//!
//! This crate implements the `srb-core` MessagingGateway over the Telegram
//! Bot API and runs the polling dispatcher.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use srb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::MessagingGateway,
    Result,
};

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn reply(&self, to: MessageRef, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(to.chat_id), text.to_string())
                .reply_to_message_id(Self::tg_msg_id(to.message_id))
        })
        .await?;
        Ok(())
    }

    async fn forward(&self, to: ChatId, source: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot.forward_message(
                Self::tg_chat(to),
                Self::tg_chat(source.chat_id),
                Self::tg_msg_id(source.message_id),
            )
        })
        .await?;
        Ok(())
    }

    async fn send(&self, to: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(to), text.to_string()))
            .await?;
        Ok(())
    }
}
