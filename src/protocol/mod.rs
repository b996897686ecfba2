//! Command Message Protocol
//!
//! This module turns raw queue message bodies into structured commands.
//!
//! ## Modules
//!
//! - `types`: Defines `Command`, `CommandKind` and the wire names
//! - `parser`: JSON decoding and structural validation
//!
//! ## Example
//!
//! ```
//! use queuekv::protocol::{decode_message, CommandKind};
//!
//! let cmd = decode_message(br#"{"command":"addItem","key":"name","value":"Ariz"}"#).unwrap();
//! assert_eq!(cmd.kind, CommandKind::Add);
//! assert_eq!(cmd.key, "name");
//!
//! let err = decode_message(br#"{"command":"addItem","key":""}"#).unwrap_err();
//! assert_eq!(err.to_string(), "key is empty");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{decode_message, parse_command, CommandError};
pub use types::{Command, CommandKind};
