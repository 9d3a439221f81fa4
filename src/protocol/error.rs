//! M2MXML error types

use thiserror::Error;

use super::types::CommandKind;

/// Syntax errors raised by the micro-XML parser.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    /// Input does not open an element where one is required
    #[error("Begin element expected")]
    BeginElementExpected,

    /// `<` is not followed by an alphanumeric name
    #[error("Element name expected")]
    ElementNameExpected,

    /// Attribute list contains something other than a name
    #[error("Attribute name expected")]
    AttributeNameExpected,

    /// Attribute name is not followed by `=`
    #[error("Attribute = separator expected")]
    SeparatorExpected,

    /// Attribute value does not open with `"`
    #[error("Attribute value expected")]
    AttributeValueExpected,

    /// Attribute value runs to the end of input
    #[error("Attribute value doesn't terminate")]
    UnterminatedAttributeValue,

    /// Start tag does not close with `>` or `/>`
    #[error("End of element expected")]
    EndOfElementExpected,

    /// Element content is not followed by `</`
    #[error("End element tag expected")]
    EndTagExpected,

    /// End tag names a different element
    #[error("Mismatching ending element name")]
    MismatchedEndTag,

    /// End tag name is not followed by `>`
    #[error("Incomplete element end tag")]
    IncompleteEndTag,

    /// Start tag carries more attributes than the parser holds
    #[error("Too many attributes")]
    TooManyAttributes {
        /// Attribute capacity
        max: usize,
    },

    /// Element nesting exceeds the schema
    #[error("Unexpected depth")]
    UnexpectedDepth {
        /// Depth of the offending element
        depth: usize,
    },
}

/// M2MXML protocol and engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed wire format
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    /// Root element is not a supported `M2MXML` message
    #[error("Invalid message")]
    InvalidMessage,

    /// Command element is malformed
    #[error("Invalid command")]
    InvalidCommand,

    /// Property element is malformed
    #[error("Invalid property")]
    InvalidProperty,

    /// `setStringOutput` carries no `data` property
    #[error("'setStringOutput' data not found")]
    MissingStringData,

    /// `setAnalogOutput` carries no `setPoint` property
    #[error("'setAnalogOutput' setPoint not found")]
    MissingSetPoint,

    /// Parser arena cannot hold the message
    #[error("Not enough M2MXML buffer space; increase and recompile")]
    ParserBufferExhausted,

    /// Property capacity exceeded
    #[error("Too many properties")]
    TooManyProperties,

    /// Second command inside one message
    #[error("A command has already been found")]
    CommandAlreadyFound {
        /// Command already accepted for this message
        command: CommandKind,
    },

    /// No handler registered for the command
    #[error("Unhandled command ID")]
    UnhandledCommand {
        /// Command without a handler
        command: CommandKind,
    },

    /// Command handler declined the message
    #[error("Command handler rejected the message")]
    HandlerRejected {
        /// Command whose handler declined
        command: CommandKind,
    },

    /// Percept created without an address
    #[error("Address name required for percept")]
    PerceptAddressRequired,

    /// Command created without a name
    #[error("Command name required")]
    CommandNameRequired,

    /// Message arena cannot hold another record
    #[error("Not enough message buffer space; increase buffer size and recompile")]
    MessageBufferExhausted,

    /// Response created without a sequence number
    #[error("Sequence number required")]
    SequenceNumberRequired,

    /// Output buffer too small for the serialized message
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Behavior pool has no free slot
    #[error("Cannot add a behavior; increase buffer and recompile")]
    BehaviorPoolExhausted,

    /// Command needs a transducer address and has none
    #[error("Address required, but not found")]
    AddressRequired,

    /// Outgoing message could not be created
    #[error("Cannot create message buffer; increase buffer and recompile")]
    MessageUnavailable,

    /// Property scratch buffer exhausted
    #[error("Cannot create properties; increase buffer and recompile")]
    PropertyBufferExhausted,

    /// Behavior is not active
    #[error("Cannot find behavior to exclude")]
    BehaviorNotFound,

    /// Sequence number already seen
    #[error("Duplicate command received")]
    DuplicateCommand {
        /// Offending sequence number
        seq: String,
    },

    /// Transducer type or direction does not fit the command
    #[error("Invalid transducer")]
    InvalidTransducer,

    /// Property key unknown to the device or transducer
    #[error("Property not found")]
    PropertyNotFound,

    /// Application has no handler for the command
    #[error("Unhandled command")]
    CommandNotHandled,

    /// Message is addressed to another device
    #[error("Device and M2MXML message UUIDs are not the same")]
    UuidMismatch,

    /// Input is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Engine configuration rejected at construction
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Integer code handed to the log callback alongside the description.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Syntax(SyntaxError::UnexpectedDepth { depth }) => {
                i32::try_from(*depth).unwrap_or(i32::MAX)
            }
            Self::Syntax(_) => 0,
            Self::CommandAlreadyFound { command }
            | Self::UnhandledCommand { command }
            | Self::HandlerRejected { command } => {
                i32::from(command.as_u8())
            }
            _ => -1,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
