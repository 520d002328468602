//! Financial Function Assistant
//!
//! A console assistant that answers financial questions by letting a chat
//! model call a small set of functions:
//! - Fixed advisor instructions looked up by id
//! - Monthly US treasury yield and retail sales series from Alpha Vantage
//! - A simulated stock purchase
//!
//! TURN LOOP:
//! USER → MODEL → TOOL CALLS → OBSERVATIONS → MODEL → ... → ANSWER

pub mod config;
pub mod conversation;
pub mod error;
pub mod execution;
pub mod instructions;
pub mod llm;
pub mod market_data;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod repl;
pub mod tools;
pub mod trade;

pub use error::{AssistantError, Result};

// Re-export common types
pub use conversation::Conversation;
pub use models::*;
pub use repl::{Repl, ReplExit};
