use std::sync::Arc;

use crate::{
    dedup::SuggestionStore,
    domain::{AdminSet, ChatId, UserId},
    messaging::{Action, InboundMessage},
    session::SupportSessions,
    texts, Result,
};

/// The per-user routing state machine.
///
/// For each inbound message exactly one branch fires, in priority order:
/// support-mode forward, operator reply routing, onboarding nudge. The relay
/// only decides; executing the returned actions is the gateway's job.
pub struct Relay {
    admins: AdminSet,
    sessions: SupportSessions,
    suggestions: Arc<dyn SuggestionStore>,
}

impl Relay {
    pub fn new(admins: AdminSet, suggestions: Arc<dyn SuggestionStore>) -> Self {
        Self {
            admins,
            sessions: SupportSessions::default(),
            suggestions,
        }
    }

    pub fn admins(&self) -> &AdminSet {
        &self.admins
    }

    /// Classify one inbound message and return the outbound actions.
    ///
    /// Callers must serialize invocations per user (see the dispatcher's
    /// per-user locks); messages from different users may run concurrently.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<Vec<Action>> {
        if msg.is_start {
            return Ok(self.handle_start(msg).await);
        }

        // Support mode wins over everything, including admin status: an
        // operator who typed /start is a support seeker on their next message.
        if self.sessions.is_armed(msg.sender).await {
            return Ok(self.forward_to_admins(msg).await);
        }

        if self.admins.contains(msg.sender) {
            return Ok(self.route_admin_reply(msg));
        }

        self.nudge_once(msg).await
    }

    /// `/start`: arm the session and greet. Repeating the command simply
    /// re-arms the flag.
    async fn handle_start(&self, msg: &InboundMessage) -> Vec<Action> {
        self.sessions.arm(msg.sender).await;
        vec![Action::Reply {
            to: msg.source(),
            text: texts::WELCOME.to_string(),
        }]
    }

    /// First text after `/start`: one forward per operator plus a
    /// confirmation. The flag is dropped before the actions run, so a failed
    /// forward never re-enters support mode.
    async fn forward_to_admins(&self, msg: &InboundMessage) -> Vec<Action> {
        self.sessions.disarm(msg.sender).await;

        let mut actions: Vec<Action> = self
            .admins
            .iter()
            .map(|admin| Action::Forward {
                to: ChatId(admin.0),
                source: msg.source(),
            })
            .collect();
        actions.push(Action::Reply {
            to: msg.source(),
            text: texts::FORWARDED.to_string(),
        });
        actions
    }

    /// Operator message: route it back to the original sender if (and only
    /// if) it replies to a forwarded copy with provenance.
    fn route_admin_reply(&self, msg: &InboundMessage) -> Vec<Action> {
        let origin = msg.reply_to.as_ref().and_then(|r| r.forward_origin);
        let Some(origin) = origin else {
            // Known gap carried over from the original: an operator message
            // that is not a qualifying reply is dropped without feedback.
            tracing::debug!(
                admin = msg.sender.0,
                "operator message without forward provenance, ignoring"
            );
            return Vec::new();
        };

        vec![
            Action::Send {
                to: ChatId(origin.0),
                text: msg.text.clone(),
            },
            Action::Reply {
                to: msg.source(),
                text: texts::reply_delivered(origin),
            },
        ]
    }

    /// Ordinary message from an ordinary user: nudge them towards `/start`,
    /// at most once per the configured dedup strategy. The flag is written
    /// before the reply is emitted, so a storage failure can only lose the
    /// nudge, never duplicate it.
    async fn nudge_once(&self, msg: &InboundMessage) -> Result<Vec<Action>> {
        if self.suggestions.was_shown(msg.sender).await? {
            return Ok(Vec::new());
        }
        self.suggestions.mark_shown(msg.sender).await?;

        Ok(vec![Action::Reply {
            to: msg.source(),
            text: texts::NUDGE.to_string(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{MemorySuggestions, StatelessSuggestions};
    use crate::domain::{MessageId, MessageRef};
    use crate::errors::Error;
    use crate::messaging::ReplyContext;
    use async_trait::async_trait;

    const ADMIN_A: i64 = 100;
    const ADMIN_B: i64 = 200;

    fn relay() -> Relay {
        Relay::new(
            AdminSet::new([ADMIN_A, ADMIN_B]),
            Arc::new(MemorySuggestions::default()),
        )
    }

    fn text(sender: i64, id: i32, body: &str) -> InboundMessage {
        InboundMessage {
            sender: UserId(sender),
            chat: ChatId(sender),
            message_id: MessageId(id),
            text: body.to_string(),
            is_start: false,
            reply_to: None,
        }
    }

    fn start(sender: i64, id: i32) -> InboundMessage {
        InboundMessage {
            is_start: true,
            ..text(sender, id, "/start")
        }
    }

    fn admin_reply(sender: i64, id: i32, body: &str, origin: Option<i64>) -> InboundMessage {
        InboundMessage {
            reply_to: Some(ReplyContext {
                forward_origin: origin.map(UserId),
            }),
            ..text(sender, id, body)
        }
    }

    fn source(msg: &InboundMessage) -> MessageRef {
        msg.source()
    }

    #[tokio::test]
    async fn start_greets_and_arms() {
        let relay = relay();
        let msg = start(42, 1);
        let actions = relay.handle(&msg).await.unwrap();
        assert_eq!(
            actions,
            vec![Action::Reply {
                to: source(&msg),
                text: texts::WELCOME.to_string(),
            }]
        );
        assert!(relay.sessions.is_armed(UserId(42)).await);
    }

    #[tokio::test]
    async fn armed_user_is_forwarded_to_every_admin_once() {
        let relay = relay();
        relay.handle(&start(42, 1)).await.unwrap();

        let msg = text(42, 2, "hello");
        let actions = relay.handle(&msg).await.unwrap();

        let forwards: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, Action::Forward { .. }))
            .collect();
        assert_eq!(forwards.len(), 2);
        assert!(actions.contains(&Action::Forward {
            to: ChatId(ADMIN_A),
            source: source(&msg),
        }));
        assert!(actions.contains(&Action::Forward {
            to: ChatId(ADMIN_B),
            source: source(&msg),
        }));
        assert_eq!(
            actions.last(),
            Some(&Action::Reply {
                to: source(&msg),
                text: texts::FORWARDED.to_string(),
            })
        );

        // Flag dropped: the very next message falls through to the nudge.
        assert!(!relay.sessions.is_armed(UserId(42)).await);
    }

    #[tokio::test]
    async fn full_user_journey() {
        // /start -> greet; "hello" -> forward; "hi again" -> first-time nudge.
        let relay = relay();

        let actions = relay.handle(&start(42, 1)).await.unwrap();
        assert!(matches!(&actions[..], [Action::Reply { text, .. }] if text == texts::WELCOME));

        let actions = relay.handle(&text(42, 2, "hello")).await.unwrap();
        assert_eq!(actions.len(), 3);

        let actions = relay.handle(&text(42, 3, "hi again")).await.unwrap();
        assert!(matches!(&actions[..], [Action::Reply { text, .. }] if text == texts::NUDGE));
    }

    #[tokio::test]
    async fn admin_reply_routes_back_to_origin() {
        let relay = relay();
        let msg = admin_reply(ADMIN_A, 5, "use /start first", Some(42));
        let actions = relay.handle(&msg).await.unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Send {
                    to: ChatId(42),
                    text: "use /start first".to_string(),
                },
                Action::Reply {
                    to: source(&msg),
                    text: texts::reply_delivered(UserId(42)),
                },
            ]
        );
    }

    #[tokio::test]
    async fn admin_message_without_provenance_is_dropped() {
        let relay = relay();

        // Not a reply at all.
        let actions = relay.handle(&text(ADMIN_A, 5, "hello?")).await.unwrap();
        assert!(actions.is_empty());

        // Reply to a message that was not a forwarded copy.
        let actions = relay
            .handle(&admin_reply(ADMIN_A, 6, "hello?", None))
            .await
            .unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn nudge_is_sent_exactly_once() {
        let relay = relay();

        let actions = relay.handle(&text(7, 1, "hi")).await.unwrap();
        assert!(matches!(&actions[..], [Action::Reply { text, .. }] if text == texts::NUDGE));

        for id in 2..5 {
            let actions = relay.handle(&text(7, id, "hi again")).await.unwrap();
            assert!(actions.is_empty());
        }
    }

    #[tokio::test]
    async fn stateless_strategy_always_nudges() {
        let relay = Relay::new(AdminSet::new([ADMIN_A]), Arc::new(StatelessSuggestions));

        for id in 1..4 {
            let actions = relay.handle(&text(7, id, "hi")).await.unwrap();
            assert_eq!(actions.len(), 1);
        }
    }

    #[tokio::test]
    async fn support_mode_takes_priority_over_admin_status() {
        // An operator who typed /start is routed as a support seeker on
        // their next message, not as an operator.
        let relay = relay();
        relay.handle(&start(ADMIN_A, 1)).await.unwrap();

        let msg = admin_reply(ADMIN_A, 2, "my own question", Some(42));
        let actions = relay.handle(&msg).await.unwrap();

        assert!(actions
            .iter()
            .all(|a| !matches!(a, Action::Send { .. })));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Forward { .. })));
    }

    #[tokio::test]
    async fn admin_check_precedes_suggestion_logic() {
        // A "new" admin never receives the nudge.
        let relay = relay();
        let actions = relay.handle(&text(ADMIN_B, 1, "hello")).await.unwrap();
        assert!(actions.is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl SuggestionStore for BrokenStore {
        async fn was_shown(&self, _user: UserId) -> Result<bool> {
            Err(Error::Storage("connection refused".to_string()))
        }

        async fn mark_shown(&self, _user: UserId) -> Result<()> {
            Err(Error::Storage("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn storage_failure_propagates_instead_of_nudging() {
        let relay = Relay::new(AdminSet::new([ADMIN_A]), Arc::new(BrokenStore));
        let err = relay.handle(&text(7, 1, "hi")).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn storage_failure_does_not_affect_support_mode() {
        // Branches 1 and 2 never touch the store.
        let relay = Relay::new(AdminSet::new([ADMIN_A]), Arc::new(BrokenStore));
        relay.handle(&start(42, 1)).await.unwrap();
        let actions = relay.handle(&text(42, 2, "hello")).await.unwrap();
        assert_eq!(actions.len(), 2);
    }
}
