use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::Action,
    Result,
};

/// Hexagonal port for the chat platform.
///
/// Telegram is the first implementation; the shape is small enough that other
/// messengers could fit behind it as long as they can forward a message with
/// provenance intact.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send `text` as a reply to the given message.
    async fn reply(&self, to: MessageRef, text: &str) -> Result<()>;

    /// Forward the source message to another chat.
    async fn forward(&self, to: ChatId, source: MessageRef) -> Result<()>;

    /// Send `text` to a chat.
    async fn send(&self, to: ChatId, text: &str) -> Result<()>;
}

/// Execute a batch of actions best-effort.
///
/// Each action is independent: a failed forward to one operator must not
/// prevent delivery to the others, and never re-arms any session state.
pub async fn dispatch_actions(gateway: &dyn MessagingGateway, actions: Vec<Action>) {
    for action in actions {
        let res = match &action {
            Action::Reply { to, text } => gateway.reply(*to, text).await,
            Action::Forward { to, source } => gateway.forward(*to, *source).await,
            Action::Send { to, text } => gateway.send(*to, text).await,
        };
        if let Err(e) = res {
            tracing::warn!("outbound action failed, continuing: {e} ({action:?})");
        }
    }
}
