use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// One inbound text message, already stripped of platform-specific detail.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub sender: UserId,
    pub chat: ChatId,
    pub message_id: MessageId,
    pub text: String,
    /// True when the message is the `/start` command.
    pub is_start: bool,
    /// Present when the message is a reply to an earlier message.
    pub reply_to: Option<ReplyContext>,
}

impl InboundMessage {
    /// Reference to this message, for reply/forward actions.
    pub fn source(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat,
            message_id: self.message_id,
        }
    }
}

/// What is known about the message being replied to.
#[derive(Clone, Copy, Debug)]
pub struct ReplyContext {
    /// If the replied-to message was a forwarded copy, the original sender.
    /// This is the forward-provenance contract: without it an operator reply
    /// cannot be routed back.
    pub forward_origin: Option<UserId>,
}

/// Outbound actions the relay asks the gateway to perform.
///
/// Actions are independent: the gateway executes them best-effort and a
/// failure of one does not abort the others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Reply to a specific message in its chat.
    Reply { to: MessageRef, text: String },
    /// Forward a message verbatim, preserving provenance metadata.
    Forward { to: ChatId, source: MessageRef },
    /// Plain message to a chat.
    Send { to: ChatId, text: String },
}
