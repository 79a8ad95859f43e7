//! Shared types and error hierarchy for mcpc.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
mod util;

pub use error::{ApiError, ConfigError, McpcError, ToolError};
pub use message::*;
pub use provider::Provider;
pub use tool::*;
pub use util::truncate_str;
