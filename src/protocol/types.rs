//! Command Message Types
//!
//! This module defines the structured command carried by every queue message.
//!
//! ## Wire Format
//!
//! Each message body is a JSON object with three string fields:
//!
//! ```text
//! {"command": "addItem", "key": "name", "value": "Ariz"}
//! ```
//!
//! Field names match case-insensitively, a repeated field keeps its last
//! value, missing or `null` fields read as empty, and unknown extra fields
//! are ignored.
//!
//! ## Recognized Commands
//!
//! - `addItem` - upsert `key` with `value`
//! - `deleteItem` - remove `key`
//! - `getItem` - look up `key`
//! - `getAllItems` - dump every entry (no key required)
//!
//! Any other non-empty command name is kept as [`CommandKind::Unknown`].

use std::fmt;

/// Wire name of the add command
pub const ADD_COMMAND: &str = "addItem";

/// Wire name of the delete command
pub const DELETE_COMMAND: &str = "deleteItem";

/// Wire name of the get command
pub const GET_COMMAND: &str = "getItem";

/// Wire name of the dump command
pub const GET_ALL_COMMAND: &str = "getAllItems";

/// The kind of operation a message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Upsert a key
    Add,
    /// Remove a key
    Delete,
    /// Point lookup
    Get,
    /// Timestamp-ordered dump of the whole store
    GetAll,
    /// Any other name, including the empty one. Rejected at validation
    /// when empty, otherwise a no-op at execution time.
    Unknown(String),
}

impl CommandKind {
    /// Maps a wire name onto a command kind.
    pub fn from_name(name: &str) -> Self {
        match name {
            ADD_COMMAND => CommandKind::Add,
            DELETE_COMMAND => CommandKind::Delete,
            GET_COMMAND => CommandKind::Get,
            GET_ALL_COMMAND => CommandKind::GetAll,
            other => CommandKind::Unknown(other.to_string()),
        }
    }

    /// Returns the wire name of this kind.
    pub fn name(&self) -> &str {
        match self {
            CommandKind::Add => ADD_COMMAND,
            CommandKind::Delete => DELETE_COMMAND,
            CommandKind::Get => GET_COMMAND,
            CommandKind::GetAll => GET_ALL_COMMAND,
            CommandKind::Unknown(name) => name,
        }
    }

    /// Every kind except `GetAll` addresses a single key.
    #[inline]
    pub fn requires_key(&self) -> bool {
        !matches!(self, CommandKind::GetAll)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A command decoded from one queue message.
///
/// Built once per received message and dropped after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// What to do
    pub kind: CommandKind,
    /// Target key (empty for `GetAll`)
    pub key: String,
    /// Value to store (only meaningful for `Add`)
    pub value: String,
}

impl Command {
    /// Creates a command from its parts.
    pub fn new(kind: CommandKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(CommandKind::from_name("addItem"), CommandKind::Add);
        assert_eq!(CommandKind::from_name("deleteItem"), CommandKind::Delete);
        assert_eq!(CommandKind::from_name("getItem"), CommandKind::Get);
        assert_eq!(CommandKind::from_name("getAllItems"), CommandKind::GetAll);
        assert_eq!(
            CommandKind::from_name("AddItem"),
            CommandKind::Unknown("AddItem".to_string())
        );
    }

    #[test]
    fn test_kind_name_matches_wire() {
        assert_eq!(CommandKind::GetAll.name(), "getAllItems");
        assert_eq!(CommandKind::Unknown("flush".into()).to_string(), "flush");
        assert_eq!(CommandKind::Unknown(String::new()).name(), "");
    }

    #[test]
    fn test_requires_key() {
        assert!(CommandKind::Add.requires_key());
        assert!(CommandKind::Delete.requires_key());
        assert!(CommandKind::Get.requires_key());
        assert!(CommandKind::Unknown("x".into()).requires_key());
        assert!(!CommandKind::GetAll.requires_key());
    }
}
