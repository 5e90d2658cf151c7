//! Cross-messenger abstractions: the inbound message model, the outbound
//! actions the relay emits, and the gateway port that executes them.

pub mod port;
pub mod types;

pub use port::{dispatch_actions, MessagingGateway};
pub use types::{Action, InboundMessage, ReplyContext};
