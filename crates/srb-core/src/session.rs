use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::UserId;

/// Volatile per-user "awaiting support forward" flags.
///
/// A user is armed strictly between their `/start` and their next text
/// message. Absence of an entry means not armed. No durability: a restart
/// drops all support-mode state, which matches the original behavior.
#[derive(Default)]
pub struct SupportSessions {
    inner: Mutex<HashMap<UserId, bool>>,
}

impl SupportSessions {
    pub async fn arm(&self, user: UserId) {
        self.inner.lock().await.insert(user, true);
    }

    pub async fn disarm(&self, user: UserId) {
        self.inner.lock().await.insert(user, false);
    }

    pub async fn is_armed(&self, user: UserId) -> bool {
        self.inner.lock().await.get(&user).copied().unwrap_or(false)
    }
}
