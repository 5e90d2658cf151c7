use std::sync::Arc;

use srb_core::{
    config::{Config, DedupMode},
    dedup::{StatelessSuggestions, SuggestionStore},
    domain::AdminSet,
    relay::Relay,
    Error,
};
use srb_store::PgSuggestionStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    srb_core::logging::init("srb")?;

    let cfg = Arc::new(Config::load()?);

    let suggestions: Arc<dyn SuggestionStore> = match (&cfg.dedup_mode, &cfg.db) {
        (DedupMode::Persistent, Some(db)) => Arc::new(PgSuggestionStore::connect(db).await?),
        (DedupMode::Stateless, _) => Arc::new(StatelessSuggestions),
        (DedupMode::Persistent, None) => {
            // Config::load guarantees db params exist in persistent mode.
            return Err(Error::Config(
                "persistent dedup selected but no database configured".to_string(),
            ));
        }
    };

    let relay = Arc::new(Relay::new(AdminSet::new(cfg.admin_ids.clone()), suggestions));

    srb_telegram::router::run_polling(cfg, relay)
        .await
        .map_err(|e| Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
