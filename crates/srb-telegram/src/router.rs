use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use srb_core::{config::Config, messaging::MessagingGateway, relay::Relay};

use crate::handlers;
use crate::TelegramGateway;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub user_locks: Arc<UserLocks>,
}

/// One lock per user id. Messages from the same user are processed in
/// arrival order; unrelated users proceed concurrently, so a retry/backoff
/// wait for one user never stalls another.
///
/// Once the map reaches `SWEEP_THRESHOLD` entries, uncontended locks are
/// swept out, keeping it bounded by the number of users active at once
/// rather than every user ever seen.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

const SWEEP_THRESHOLD: usize = 1024;

impl UserLocks {
    pub async fn lock_user(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            if map.len() >= SWEEP_THRESHOLD {
                // A held or awaited lock keeps an extra Arc clone alive, so
                // strong_count == 1 means nobody is using the entry.
                map.retain(|id, lock| *id == user_id || Arc::strong_count(lock) > 1);
            }
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, relay: Arc<Relay>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        println!("srb started: @{}", me.username());
    }
    println!("Operators: {}", relay.admins().len());

    let state = Arc::new(AppState {
        relay,
        gateway: Arc::new(TelegramGateway::new(bot.clone())),
        user_locks: Arc::new(UserLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_map_stays_bounded() {
        let locks = UserLocks::default();
        for user_id in 0..(SWEEP_THRESHOLD as i64 * 2) {
            let guard = locks.lock_user(user_id).await;
            drop(guard);
        }
        assert!(locks.inner.lock().await.len() <= SWEEP_THRESHOLD);
    }

    #[tokio::test]
    async fn sweep_keeps_held_locks() {
        let locks = UserLocks::default();
        let held = locks.lock_user(-1).await;

        for user_id in 0..(SWEEP_THRESHOLD as i64 + 1) {
            let guard = locks.lock_user(user_id).await;
            drop(guard);
        }

        assert!(locks.inner.lock().await.contains_key(&-1));
        drop(held);
    }
}
