//! M2MXML wire enumerations

use std::fmt;

/// Commands a peer can send to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CommandKind {
    /// Any name outside the known set
    Unknown = 0,
    /// Report current transducer values
    RequestPercept = 1,
    /// Drive a digital output high
    TurnOn = 2,
    /// Drive a digital output low
    TurnOff = 3,
    /// Write a string output
    SetStringOutput = 4,
    /// Write an analog output
    SetAnalogOutput = 5,
    /// Restart the device
    Reboot = 6,
    /// Read configuration properties
    QueryConfiguration = 7,
    /// Write configuration properties
    SetConfiguration = 8,
}

impl CommandKind {
    /// Every command with a wire name.
    pub const KNOWN: [Self; 8] = [
        Self::RequestPercept,
        Self::TurnOn,
        Self::TurnOff,
        Self::SetStringOutput,
        Self::SetAnalogOutput,
        Self::Reboot,
        Self::QueryConfiguration,
        Self::SetConfiguration,
    ];

    /// Convert from command id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::RequestPercept),
            2 => Some(Self::TurnOn),
            3 => Some(Self::TurnOff),
            4 => Some(Self::SetStringOutput),
            5 => Some(Self::SetAnalogOutput),
            6 => Some(Self::Reboot),
            7 => Some(Self::QueryConfiguration),
            8 => Some(Self::SetConfiguration),
            _ => None,
        }
    }

    /// Convert to command id
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a wire name to a command; unrecognized names are [`CommandKind::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.name() == name)
            .unwrap_or(Self::Unknown)
    }

    /// Wire name; empty for [`CommandKind::Unknown`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::RequestPercept => "requestPercept",
            Self::TurnOn => "turnOn",
            Self::TurnOff => "turnOff",
            Self::SetStringOutput => "setStringOutput",
            Self::SetAnalogOutput => "setAnalogOutput",
            Self::Reboot => "reboot",
            Self::QueryConfiguration => "queryConfiguration",
            Self::SetConfiguration => "setConfiguration",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            other => other.name(),
        };
        write!(f, "{name}")
    }
}

/// Semantic type of a transducer value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PerceptType {
    /// Type not declared
    #[default]
    Unknown = 0,
    /// Floating point reading
    Analog = 1,
    /// `0`/`1` reading
    Digital = 2,
    /// Free text
    String = 3,
    /// `latitude,longitude`
    Location = 4,
}

impl PerceptType {
    /// Convert from type id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Analog),
            2 => Some(Self::Digital),
            3 => Some(Self::String),
            4 => Some(Self::Location),
            _ => None,
        }
    }

    /// Convert to type id
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Value of the `perceptType` attribute.
    ///
    /// Analog is the protocol default, so with `omit_default` it yields `None`.
    #[must_use]
    pub const fn wire_name(self, omit_default: bool) -> Option<&'static str> {
        match self {
            Self::Analog if omit_default => None,
            Self::Analog => Some("analog"),
            Self::Digital => Some("digital"),
            Self::String => Some("string"),
            Self::Location => Some("location"),
            Self::Unknown => Some("unknown"),
        }
    }

    /// Value of the `type` property announced for a transducer.
    ///
    /// The spellings of the digital names are the ones the portal matches on.
    #[must_use]
    pub const fn property_name(self, output: bool, omit_default: bool) -> Option<&'static str> {
        match (self, output) {
            (Self::Analog, false) if omit_default => None,
            (Self::Analog, false) => Some("analogIn"),
            (Self::Analog, true) => Some("analogOut"),
            (Self::Digital, false) => Some("digitialIn"),
            (Self::Digital, true) => Some("digitialOut"),
            (Self::String, false) => Some("stringIn"),
            (Self::String, true) => Some("stringOut"),
            (Self::Location, false) => Some("locationIn"),
            (Self::Location, true) => Some("locationOut"),
            (Self::Unknown, false) => Some("unknownIn"),
            (Self::Unknown, true) => Some("unknownOut"),
        }
    }
}

impl fmt::Display for PerceptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.wire_name(false).unwrap_or("analog");
        write!(f, "{name}")
    }
}

/// Why a percept was reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum EntryType {
    /// Regular schedule; omitted on the wire
    #[default]
    Scheduled = 0,
    /// Answer to `requestPercept`
    Requested = 1,
    /// Alarm condition
    ByException = 2,
    /// Operator action
    Manual = 3,
    /// Actuator feedback
    ByActuator = 4,
    /// Anything else
    Other = 5,
}

impl EntryType {
    /// Convert from entry type id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Scheduled),
            1 => Some(Self::Requested),
            2 => Some(Self::ByException),
            3 => Some(Self::Manual),
            4 => Some(Self::ByActuator),
            5 => Some(Self::Other),
            _ => None,
        }
    }

    /// Convert to entry type id
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "scheduled",
            Self::Requested => "requested",
            Self::ByException => "byException",
            Self::Manual => "manual",
            Self::ByActuator => "byActuator",
            Self::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// Result code carried by a `<Response>`.
///
/// Application handlers may return codes outside the named set; they are forwarded verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultCode(i32);

impl ResultCode {
    /// Command executed
    pub const SUCCESS: Self = Self(0);
    /// Command received, execution pending
    pub const RECEIVED: Self = Self(1);
    /// Command submitted downstream
    pub const SUBMITTED: Self = Self(2);
    /// Command could not be delivered
    pub const FAILED_DELIVERY: Self = Self(3);
    /// Command failed while executing
    pub const FAILED_EXECUTION: Self = Self(4);
    /// Command name not understood
    pub const UNKNOWN_COMMAND: Self = Self(5);
    /// Command argument rejected
    pub const BAD_ARGUMENT: Self = Self(6);
    /// Reply too large for the buffer, sent out of band
    pub const REPLY_BY_URL: Self = Self(10);
    /// Database detach failed
    pub const DETACH_FAILED: Self = Self(11);

    /// Wrap a raw code
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Raw code
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Whether this is [`ResultCode::SUCCESS`]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "success",
            1 => "received",
            2 => "submitted",
            3 => "failedDelivery",
            4 => "failedExecution",
            5 => "unknownCommand",
            6 => "badArgument",
            10 => "replyByUrl",
            11 => "detachFailed",
            other => return write!(f, "code {other}"),
        };
        write!(f, "{name}")
    }
}

/// Code carried by an `<Exception>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionCode(i32);

impl ExceptionCode {
    /// Hardware fault
    pub const HARDWARE: Self = Self(0);
    /// Software fault
    pub const SOFTWARE: Self = Self(1);
    /// Command arrived without a sequence number
    pub const NO_SEQ_NUM: Self = Self(2);
    /// Message could not be understood
    pub const BAD_MESSAGE: Self = Self(3);

    /// Wrap a raw code
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Raw code
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_map_both_ways() {
        for kind in CommandKind::KNOWN {
            assert_eq!(CommandKind::from_name(kind.name()), kind);
            assert_eq!(CommandKind::from_u8(kind.as_u8()), Some(kind));
        }
        assert_eq!(CommandKind::from_name("setupTransducer"), CommandKind::Unknown);
        assert_eq!(CommandKind::from_name("RequestPercept"), CommandKind::Unknown);
    }

    #[test]
    fn analog_type_is_the_omittable_default() {
        assert_eq!(PerceptType::Analog.wire_name(true), None);
        assert_eq!(PerceptType::Analog.wire_name(false), Some("analog"));
        assert_eq!(PerceptType::Digital.wire_name(true), Some("digital"));
        assert_eq!(PerceptType::Unknown.wire_name(true), Some("unknown"));
    }

    #[test]
    fn transducer_type_property_names() {
        assert_eq!(PerceptType::Digital.property_name(false, false), Some("digitialIn"));
        assert_eq!(PerceptType::Location.property_name(true, true), Some("locationOut"));
        assert_eq!(PerceptType::Analog.property_name(false, true), None);
        assert_eq!(PerceptType::Analog.property_name(true, true), Some("analogOut"));
    }

    #[test]
    fn result_codes_display() {
        assert_eq!(ResultCode::BAD_ARGUMENT.to_string(), "badArgument");
        assert_eq!(ResultCode::new(42).to_string(), "code 42");
        assert!(ResultCode::SUCCESS.is_success());
        assert_eq!(EntryType::from_u8(2), Some(EntryType::ByException));
    }
}
