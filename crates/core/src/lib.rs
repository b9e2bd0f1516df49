pub mod config;
pub mod envelope;
pub mod error;
pub mod paths;

pub use config::Config;
pub use envelope::{ToolRequest, ToolResponse};
pub use error::{Error, Result};
pub use paths::Paths;
