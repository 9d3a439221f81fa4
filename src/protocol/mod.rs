//! M2MXML protocol core
//!
//! This module provides the wire dialect: the arena that holds parsed and
//! outgoing data, the micro-XML parser, the incoming command model with its
//! dispatch table, and the outgoing message model with its serializer.

mod arena;
mod error;
mod inbound;
mod message;
mod parser;
mod timestamp;
mod types;

pub use arena::{Arena, ArenaError, PropertySet, SLOT_SIZE, Span};
pub use error::{Error, Result, SyntaxError};
pub use inbound::{CommandHandlers, IncomingCommand, ParseLimits, Properties, parse_message};
pub use message::Message;
pub use parser::{Attributes, ElementHandler, MAX_ATTRIBUTES, Parser};
pub use timestamp::{Timestamp, format_timestamp};
pub use types::{CommandKind, EntryType, ExceptionCode, PerceptType, ResultCode};

/// Protocol version carried in the root `ver` attribute
pub const VERSION: &str = "1.0";

/// Deepest element level below the root (message, command, property)
pub const MAX_DEPTH: usize = 2;

/// Characters in a device UUID
pub const UUID_SIZE: usize = 32;

/// Element names
pub mod element {
    /// Root element
    pub const MESSAGE: &str = "M2MXML";
    /// Command element
    pub const COMMAND: &str = "Command";
    /// Exception element
    pub const EXCEPTION: &str = "Exception";
    /// Percept element
    pub const PERCEPT: &str = "Percept";
    /// Property element
    pub const PROPERTY: &str = "Property";
    /// Response element
    pub const RESPONSE: &str = "Response";
}

/// Attribute names
pub mod attribute {
    /// Transducer address
    pub const ADDRESS: &str = "address";
    /// Exception code
    pub const EXCEPTION_CODE: &str = "exceptionCode";
    /// Percept entry type
    pub const ENTRY_TYPE: &str = "entryType";
    /// Transducer label
    pub const LABEL: &str = "label";
    /// Command or property name
    pub const NAME: &str = "name";
    /// Free-text message
    pub const MESSAGE: &str = "message";
    /// Percept type
    pub const PERCEPT_TYPE: &str = "perceptType";
    /// Response result code
    pub const RESULT_CODE: &str = "resultCode";
    /// Sequence number
    pub const SEQ: &str = "seq";
    /// Telemetry device UUID
    pub const TELEMETRY_DEVICE: &str = "td";
    /// Timestamp
    pub const TIMESTAMP: &str = "timestamp";
    /// Transducer type
    pub const TYPE: &str = "type";
    /// Transducer units
    pub const UNITS: &str = "units";
    /// Property or percept value
    pub const VALUE: &str = "value";
    /// Protocol version
    pub const VERSION: &str = "ver";
}

/// Command property names with protocol meaning
pub mod property {
    /// `setStringOutput` payload
    pub const DATA: &str = "data";
    /// Actuation duration
    pub const DURATION: &str = "duration";
    /// `setAnalogOutput` payload
    pub const SET_POINT: &str = "setPoint";
}

/// Outgoing-only command announcing a transducer and its configuration
pub const SETUP_TRANSDUCER: &str = "setupTransducer";
