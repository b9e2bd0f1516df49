use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Duplicate session id: {0}")]
    DuplicateSessionId(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unknown action kind: {0}")]
    UnknownAction(String),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin handler error: {0}")]
    PluginHandler(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Name collision: {0}")]
    NameCollision(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
