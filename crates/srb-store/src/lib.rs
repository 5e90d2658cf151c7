//! PostgreSQL adapter for the suggestion-dedup store.
//!
//! One table, one boolean per user. Every operation is wrapped in a bounded
//! exponential-backoff retry: a generous policy on the one-shot startup path,
//! a tight one on the per-message path.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Row,
};

use srb_core::{
    config::DbConfig, dedup::SuggestionStore, domain::UserId, errors::Error, retry::RetryPolicy,
    Result,
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id BIGINT PRIMARY KEY,
    has_shown_suggestion BOOLEAN DEFAULT FALSE
)";

const SELECT_FLAG: &str = "SELECT has_shown_suggestion FROM users WHERE user_id = $1";

const UPSERT_FLAG: &str = "INSERT INTO users (user_id, has_shown_suggestion)
VALUES ($1, $2)
ON CONFLICT (user_id) DO UPDATE
SET has_shown_suggestion = EXCLUDED.has_shown_suggestion";

/// Transport-level failures worth retrying; anything else (bad SQL, auth,
/// constraint violations) fails immediately.
fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
    )
}

fn map_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Connect options built from the discrete config fields, never from a URL,
/// so credentials containing `@`, `/` or `#` need no escaping.
fn connect_options(db: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .database(&db.name)
        .username(&db.user)
        .password(&db.password)
}

pub struct PgSuggestionStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgSuggestionStore {
    /// Connect and ensure the schema exists, retrying on transient failures
    /// with the startup policy.
    pub async fn connect(db: &DbConfig) -> Result<Self> {
        let options = connect_options(db);
        let startup = RetryPolicy::startup();

        let pool = startup
            .run(is_transient, || {
                PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(options.clone())
            })
            .await
            .map_err(map_err)?;

        startup
            .run(is_transient, || sqlx::query(SCHEMA).execute(&pool))
            .await
            .map_err(map_err)?;

        tracing::info!(host = %db.host, db = %db.name, "connected to postgres");

        Ok(Self {
            pool,
            retry: RetryPolicy::steady(),
        })
    }
}

#[async_trait]
impl SuggestionStore for PgSuggestionStore {
    async fn was_shown(&self, user: UserId) -> Result<bool> {
        let row = self
            .retry
            .run(is_transient, || {
                sqlx::query(SELECT_FLAG).bind(user.0).fetch_optional(&self.pool)
            })
            .await
            .map_err(map_err)?;

        Ok(row
            .and_then(|r| r.get::<Option<bool>, _>("has_shown_suggestion"))
            .unwrap_or(false))
    }

    async fn mark_shown(&self, user: UserId) -> Result<()> {
        self.retry
            .run(is_transient, || {
                sqlx::query(UPSERT_FLAG)
                    .bind(user.0)
                    .bind(true)
                    .execute(&self.pool)
            })
            .await
            .map_err(map_err)?;
        Ok(())
    }
}
