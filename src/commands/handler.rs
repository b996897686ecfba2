//! Command Handler Module
//!
//! This module applies decoded queue commands to the store.
//!
//! ## Supported Commands
//!
//! - `addItem key value` - Upsert the key, stamped with the receipt time
//! - `deleteItem key` - Remove the key if present
//! - `getItem key` - Look the key up and log the result
//! - `getAllItems` - Dump every entry through the store's sink
//!
//! Anything else is logged as a warning and leaves the store untouched.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Command    │───>│  dispatch   │───>│   Outcome   │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                         MemStore                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, CommandKind};
use crate::storage::MemStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// What executing a command did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `addItem` wrote the entry
    Stored,
    /// `deleteItem` ran; `existed` tells whether anything was removed
    Deleted { existed: bool },
    /// `getItem` found the key
    Found { value: String, timestamp: i64 },
    /// `getItem` did not find the key
    NotFound,
    /// `getAllItems` emitted this many entries
    Dumped(usize),
    /// The command name is not one we handle
    Unsupported(String),
}

impl Outcome {
    /// Returns true if the command touched the store.
    pub fn is_store_operation(&self) -> bool {
        !matches!(self, Outcome::Unsupported(_))
    }
}

/// Executes commands against a shared store.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<MemStore>,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }

    /// Returns the store this handler mutates.
    pub fn store(&self) -> &MemStore {
        &self.store
    }

    /// Executes a command.
    ///
    /// # Arguments
    ///
    /// * `command` - A validated command
    /// * `timestamp` - Receipt time of the message, stored by `addItem`
    pub fn execute(&self, command: Command, timestamp: i64) -> Outcome {
        let Command { kind, key, value } = command;

        match kind {
            CommandKind::Add => self.cmd_add(key, value, timestamp),
            CommandKind::Delete => self.cmd_delete(&key),
            CommandKind::Get => self.cmd_get(&key),
            CommandKind::GetAll => self.cmd_get_all(),
            CommandKind::Unknown(name) => {
                warn!(command = %name, "Unsupported command");
                Outcome::Unsupported(name)
            }
        }
    }

    fn cmd_add(&self, key: String, value: String, timestamp: i64) -> Outcome {
        debug!(key = %key, "Stored value under key");
        self.store.add(key, value, timestamp);
        Outcome::Stored
    }

    fn cmd_delete(&self, key: &str) -> Outcome {
        let existed = self.store.delete(key);
        debug!(key = %key, existed, "Deleted value under key");
        Outcome::Deleted { existed }
    }

    fn cmd_get(&self, key: &str) -> Outcome {
        match self.store.get(key) {
            Some(entry) => {
                debug!(key = %key, value = %entry.value, "Got value under key");
                Outcome::Found {
                    value: entry.value,
                    timestamp: entry.timestamp,
                }
            }
            None => {
                debug!(key = %key, "Value under key not found");
                Outcome::NotFound
            }
        }
    }

    fn cmd_get_all(&self) -> Outcome {
        debug!("Getting all entries...");
        Outcome::Dumped(self.store.dump_all())
    }
}
