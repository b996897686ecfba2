//! Message Decoding and Validation
//!
//! Turns a raw message body into a [`Command`] in two steps:
//!
//! 1. **Parse**: decode the JSON payload. Fails if the body is not a JSON
//!    object (arrays included) or a known field holds something other than
//!    a string or `null`. Field names match case-insensitively and a later
//!    occurrence of a field overwrites an earlier one.
//! 2. **Validate**: check structural well-formedness. The command name must
//!    be non-empty and, unless it is `getAllItems`, the key must be non-empty.
//!
//! Validation deliberately does not check that the command name is one the
//! processor supports. Unknown names are left for the executor, which logs
//! them and lets the message be acknowledged.

use crate::protocol::types::{Command, CommandKind};
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while decoding a message body.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The body is not a decodable command payload
    #[error("unsupported message format: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The `command` field is missing or empty
    #[error("command is empty")]
    EmptyCommand,

    /// The `key` field is missing or empty for a keyed command
    #[error("key is empty")]
    EmptyKey,
}

impl CommandError {
    /// Returns true if the payload could not be decoded at all.
    pub fn is_malformed(&self) -> bool {
        matches!(self, CommandError::Malformed(_))
    }
}

/// Decodes a message body without validating it.
pub fn parse_command(body: &[u8]) -> Result<Command, CommandError> {
    // A top-level `null` decodes to all-empty fields
    let fields: Option<CommandFields> = serde_json::from_slice(body)?;
    let fields = fields.unwrap_or_default();

    Ok(Command::new(
        CommandKind::from_name(&fields.command),
        fields.key,
        fields.value,
    ))
}

/// The known string fields of a command object.
#[derive(Debug, Default)]
struct CommandFields {
    command: String,
    key: String,
    value: String,
}

impl<'de> Deserialize<'de> for CommandFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(CommandFieldsVisitor)
    }
}

struct CommandFieldsVisitor;

impl<'de> Visitor<'de> for CommandFieldsVisitor {
    type Value = CommandFields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a command object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = CommandFields::default();

        // Entries arrive in document order, so a repeated field keeps its last value
        while let Some(name) = map.next_key::<String>()? {
            let slot = if name.eq_ignore_ascii_case("command") {
                &mut fields.command
            } else if name.eq_ignore_ascii_case("key") {
                &mut fields.key
            } else if name.eq_ignore_ascii_case("value") {
                &mut fields.value
            } else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };

            // `null` leaves the field as it was
            if let Some(text) = map.next_value::<Option<String>>()? {
                *slot = text;
            }
        }

        Ok(fields)
    }
}

impl Command {
    /// Checks that the command is structurally well-formed.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.kind.name().is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        if self.kind.requires_key() && self.key.is_empty() {
            return Err(CommandError::EmptyKey);
        }
        Ok(())
    }
}

/// Parses and validates a message body in one go.
pub fn decode_message(body: &[u8]) -> Result<Command, CommandError> {
    let command = parse_command(body)?;
    command.validate()?;
    Ok(command)
}
