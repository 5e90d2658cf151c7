//! Telegram update handling: turn a `Message` into the core inbound model,
//! run the relay under the per-user lock, then execute the resulting actions.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ForwardedFrom, Message},
};

use srb_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::{dispatch_actions, InboundMessage, ReplyContext},
};

use crate::router::AppState;

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(inbound) = classify(&msg) else {
        // Non-text updates (photos, stickers, joins) are outside the relay's
        // contract and are ignored.
        return Ok(());
    };

    // Serialize per user: the relay's decision depends on mutable per-user
    // state, so two messages from the same sender must not interleave.
    let _guard = state.user_locks.lock_user(inbound.sender.0).await;

    match state.relay.handle(&inbound).await {
        Ok(actions) => dispatch_actions(state.gateway.as_ref(), actions).await,
        Err(e) => {
            // Policy: a post-retry storage failure drops this message's
            // actions instead of crashing or risking a duplicate nudge.
            tracing::error!(user = inbound.sender.0, "routing failed, dropping actions: {e}");
        }
    }

    Ok(())
}

/// Map a Telegram message onto the core inbound model. Returns `None` for
/// anything that is not a text message from an identifiable sender.
fn classify(msg: &Message) -> Option<InboundMessage> {
    let sender = msg.from()?;
    let text = msg.text()?;

    let reply_to = msg.reply_to_message().map(|replied| ReplyContext {
        forward_origin: forward_origin(replied),
    });

    Some(InboundMessage {
        sender: UserId(sender.id.0 as i64),
        chat: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        text: text.to_string(),
        is_start: is_start_command(text),
        reply_to,
    })
}

/// Forward provenance: the original sender of a forwarded copy, when
/// Telegram exposes it. Forwards from users with privacy mode enabled carry
/// only a sender name and cannot be routed back.
fn forward_origin(msg: &Message) -> Option<UserId> {
    match msg.forward_from()? {
        ForwardedFrom::User(user) => Some(UserId(user.id.0 as i64)),
        _ => None,
    }
}

/// `/start`, optionally with the `@botname` suffix Telegram adds in groups.
fn is_start_command(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or("");
    first == "/start" || first.starts_with("/start@")
}
