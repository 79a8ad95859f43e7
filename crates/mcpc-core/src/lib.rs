//! Chat handler and tool-call round loop for mcpc.

mod chat;

pub use chat::{ChatEvent, ChatHandler, ChatSettings};
