//! Command Handler Module
//!
//! This module executes validated commands against the store.
//!
//! ## Architecture
//!
//! ```text
//! Queue message
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  decode_message │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Execute      │
//! │  - Log          │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    MemStore     │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

// Re-export the main command handler
pub use handler::{CommandHandler, Outcome};
