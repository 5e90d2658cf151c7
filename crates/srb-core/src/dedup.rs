use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{domain::UserId, Result};

/// Port for the durable "onboarding nudge already shown" flag.
///
/// The flag is monotonic: once a user is marked, they stay marked. Backends
/// own their retry behavior; errors surfacing from here have already
/// exhausted retries and the caller decides whether to drop the action.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Whether the nudge was already shown to this user. Absent == false.
    async fn was_shown(&self, user: UserId) -> Result<bool>;

    /// Mark the nudge as shown. Idempotent, last-write-wins.
    async fn mark_shown(&self, user: UserId) -> Result<()>;
}

/// Always-nudge variant: nothing is stored, so every qualifying message
/// looks like the first one.
pub struct StatelessSuggestions;

#[async_trait]
impl SuggestionStore for StatelessSuggestions {
    async fn was_shown(&self, _user: UserId) -> Result<bool> {
        Ok(false)
    }

    async fn mark_shown(&self, _user: UserId) -> Result<()> {
        Ok(())
    }
}

/// In-process variant: deduplicates within a single run, forgets on restart.
/// Used by tests and useful for local development without a database.
#[derive(Default)]
pub struct MemorySuggestions {
    shown: Mutex<HashSet<UserId>>,
}

#[async_trait]
impl SuggestionStore for MemorySuggestions {
    async fn was_shown(&self, user: UserId) -> Result<bool> {
        Ok(self.shown.lock().await.contains(&user))
    }

    async fn mark_shown(&self, user: UserId) -> Result<()> {
        self.shown.lock().await.insert(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mark_is_idempotent() {
        let store = MemorySuggestions::default();
        assert!(!store.was_shown(UserId(1)).await.unwrap());

        store.mark_shown(UserId(1)).await.unwrap();
        store.mark_shown(UserId(1)).await.unwrap();
        assert!(store.was_shown(UserId(1)).await.unwrap());
        assert!(!store.was_shown(UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn stateless_never_remembers() {
        let store = StatelessSuggestions;
        store.mark_shown(UserId(1)).await.unwrap();
        assert!(!store.was_shown(UserId(1)).await.unwrap());
    }
}
