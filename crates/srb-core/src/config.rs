use std::{env, fs, path::Path};

use crate::{errors::Error, Result};

/// Which suggestion-deduplication strategy the bot runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupMode {
    /// Durable flag in PostgreSQL; each user gets the nudge at most once ever.
    Persistent,
    /// No storage; every qualifying message gets the nudge.
    Stateless,
}

/// PostgreSQL connection parameters.
///
/// Kept as discrete fields; the store adapter builds connect options from
/// them directly, so credentials never pass through URL parsing and need no
/// escaping.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

/// Typed configuration, loaded from the environment (with optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    pub dedup_mode: DedupMode,
    /// Present iff `dedup_mode` is `Persistent`.
    pub db: Option<DbConfig>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_ids = parse_csv_i64(env_str("ADMIN_IDS"));
        if admin_ids.is_empty() {
            return Err(Error::Config(
                "ADMIN_IDS environment variable is required and must be non-empty".to_string(),
            ));
        }

        let dedup_mode = match env_str("DEDUP_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("persistent") => DedupMode::Persistent,
            Some("stateless") => DedupMode::Stateless,
            Some(other) => {
                return Err(Error::Config(format!(
                    "DEDUP_MODE must be 'persistent' or 'stateless', got '{other}'"
                )))
            }
        };

        let db = match dedup_mode {
            DedupMode::Persistent => Some(load_db_config()?),
            DedupMode::Stateless => None,
        };

        Ok(Self {
            bot_token,
            admin_ids,
            dedup_mode,
            db,
        })
    }
}

fn load_db_config() -> Result<DbConfig> {
    let host = env_str("DB_HOST").and_then(non_empty);
    let port = env_str("DB_PORT").and_then(non_empty);
    let name = env_str("DB_NAME").and_then(non_empty);
    let user = env_str("DB_USER").and_then(non_empty);
    let password = env_str("DB_PASSWORD").and_then(non_empty);

    let (Some(host), Some(port), Some(name), Some(user), Some(password)) =
        (host, port, name, user, password)
    else {
        return Err(Error::Config(
            "DB_HOST, DB_PORT, DB_NAME, DB_USER and DB_PASSWORD are all required \
             when DEDUP_MODE is 'persistent'"
                .to_string(),
        ));
    };

    let port = port
        .trim()
        .parse::<u16>()
        .map_err(|_| Error::Config(format!("DB_PORT is not a valid port: '{port}'")))?;

    Ok(DbConfig {
        host,
        port,
        name,
        user,
        password,
    })
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_skips_junk() {
        assert_eq!(
            parse_csv_i64(Some("1, 2,,abc, 3".to_string())),
            vec![1, 2, 3]
        );
        assert!(parse_csv_i64(None).is_empty());
        assert!(parse_csv_i64(Some("  ".to_string())).is_empty());
    }
}
