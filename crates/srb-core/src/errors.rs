/// Core error type.
///
/// Adapter crates should map their specific errors into this type so the bot
/// core can handle failures consistently (fatal config vs droppable action).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
