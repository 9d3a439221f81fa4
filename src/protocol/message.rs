//! Outgoing M2MXML message model and serializer

use std::fmt;
use std::mem::size_of;

use bytes::Bytes;
use tracing::trace;

use super::arena::{Arena, ArenaError, PropertySet, SLOT_SIZE, Span};
use super::error::{Error, Result};
use super::timestamp::{Timestamp, format_timestamp};
use super::types::{EntryType, ExceptionCode, PerceptType, ResultCode};
use super::{VERSION, attribute, element};

#[derive(Debug)]
struct CommandRecord {
    seq: Option<Span>,
    address: Option<Span>,
    name: Span,
    properties: PropertySet,
    require_values: bool,
    timestamp: Option<Timestamp>,
}

#[derive(Debug)]
struct PerceptRecord {
    seq: Option<Span>,
    address: Span,
    value: Span,
    percept_type: Option<Span>,
    entry: EntryType,
    timestamp: Option<Timestamp>,
}

#[derive(Debug)]
struct ExceptionRecord {
    code: ExceptionCode,
    message: Option<Span>,
}

#[derive(Debug)]
struct ResponseRecord {
    seq: Span,
    result: ResultCode,
    message: Option<Span>,
    timestamp: Option<Timestamp>,
}

fn write_attribute(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, " {name}=\"{value}\"")
}

/// Bytes charged for the message's own bookkeeping.
const HEADER_SIZE: usize = 4 * SLOT_SIZE;

fn no_space(err: ArenaError) -> Error {
    match err {
        ArenaError::SetFull { .. } => Error::TooManyProperties,
        ArenaError::Exhausted { .. } => Error::MessageBufferExhausted,
    }
}

/// An outgoing message under construction.
///
/// Every string handed to a `create_*` call is copied into the message's
/// fixed-capacity arena. Records keep insertion order within their category;
/// serialization always emits commands, percepts, exceptions, then responses.
#[derive(Debug)]
pub struct Message {
    arena: Arena,
    uuid: Option<Span>,
    properties: Option<PropertySet>,
    commands: Vec<CommandRecord>,
    percepts: Vec<PerceptRecord>,
    exceptions: Vec<ExceptionRecord>,
    responses: Vec<ResponseRecord>,
    timezone_offset: i32,
}

impl Message {
    /// Create an empty message holding up to `capacity` bytes of records.
    pub fn new(uuid: Option<&str>, capacity: usize) -> Result<Self> {
        let mut arena = Arena::new(capacity);
        arena
            .try_alloc(HEADER_SIZE)
            .map_err(|_| Error::MessageBufferExhausted)?;
        let uuid = arena.alloc_opt_str(uuid).map_err(no_space)?;
        Ok(Self {
            arena,
            uuid,
            properties: None,
            commands: Vec::new(),
            percepts: Vec::new(),
            exceptions: Vec::new(),
            responses: Vec::new(),
            timezone_offset: 0,
        })
    }

    /// Shift rendered timestamps by `minutes`.
    #[must_use]
    pub const fn with_timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset = minutes;
        self
    }

    /// Device UUID carried in the root element.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.map(|span| self.arena.str(span))
    }

    /// Number of commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Number of percepts.
    #[must_use]
    pub fn percept_count(&self) -> usize {
        self.percepts.len()
    }

    /// Number of exceptions.
    #[must_use]
    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    /// Number of responses.
    #[must_use]
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// Whether the message carries no records and no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
            && self.percepts.is_empty()
            && self.exceptions.is_empty()
            && self.responses.is_empty()
            && self.properties.is_none()
    }

    /// Arena bytes still free.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.arena.remaining()
    }

    fn charge<T>(&mut self) -> Result<()> {
        self.arena
            .try_alloc(size_of::<T>())
            .map(|_| ())
            .map_err(no_space)
    }

    /// Append a command. `require_values` false emits property names only.
    pub fn create_command(
        &mut self,
        seq: Option<&str>,
        address: Option<&str>,
        name: &str,
        properties: &[(&str, &str)],
        require_values: bool,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::CommandNameRequired);
        }
        self.charge::<CommandRecord>()?;
        let seq = self.arena.alloc_opt_str(seq).map_err(no_space)?;
        let address = self.arena.alloc_opt_str(address).map_err(no_space)?;
        let name = self.arena.alloc_str(name).map_err(no_space)?;
        let mut set = self
            .arena
            .alloc_property_set(properties.len())
            .map_err(no_space)?;
        for (key, value) in properties {
            set.push(&mut self.arena, Some(key), Some(value))
                .map_err(no_space)?;
        }
        trace!(properties = set.len(), "create command");
        self.commands.push(CommandRecord {
            seq,
            address,
            name,
            properties: set,
            require_values,
            timestamp,
        });
        Ok(())
    }

    /// Append a percept with an explicit `perceptType` attribute value.
    pub fn create_any_percept(
        &mut self,
        seq: Option<&str>,
        address: &str,
        value: &str,
        percept_type: Option<&str>,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        if address.is_empty() {
            return Err(Error::PerceptAddressRequired);
        }
        self.charge::<PerceptRecord>()?;
        let seq = self.arena.alloc_opt_str(seq).map_err(no_space)?;
        let address = self.arena.alloc_str(address).map_err(no_space)?;
        let value = self.arena.alloc_str(value).map_err(no_space)?;
        let percept_type = self.arena.alloc_opt_str(percept_type).map_err(no_space)?;
        self.percepts.push(PerceptRecord {
            seq,
            address,
            value,
            percept_type,
            entry,
            timestamp,
        });
        Ok(())
    }

    /// Append an analog percept; analog is the default type and is not emitted.
    pub fn create_analog_percept(
        &mut self,
        seq: Option<&str>,
        address: &str,
        value: f64,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        let text = format!("{value:.6}");
        self.create_any_percept(seq, address, &text, None, entry, timestamp)
    }

    /// Append a digital percept.
    pub fn create_digital_percept(
        &mut self,
        seq: Option<&str>,
        address: &str,
        value: bool,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        let text = if value { "1" } else { "0" };
        let kind = PerceptType::Digital.wire_name(true);
        self.create_any_percept(seq, address, text, kind, entry, timestamp)
    }

    /// Append a location percept as `latitude,longitude`.
    pub fn create_location_percept(
        &mut self,
        seq: Option<&str>,
        address: &str,
        (latitude, longitude): (f64, f64),
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        let text = format!("{latitude:.6},{longitude:.6}");
        let kind = PerceptType::Location.wire_name(true);
        self.create_any_percept(seq, address, &text, kind, entry, timestamp)
    }

    /// Append a string percept.
    pub fn create_string_percept(
        &mut self,
        seq: Option<&str>,
        address: &str,
        value: &str,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        let kind = PerceptType::String.wire_name(true);
        self.create_any_percept(seq, address, value, kind, entry, timestamp)
    }

    /// Append an exception.
    pub fn create_exception(&mut self, code: ExceptionCode, message: Option<&str>) -> Result<()> {
        self.charge::<ExceptionRecord>()?;
        let message = self.arena.alloc_opt_str(message).map_err(no_space)?;
        self.exceptions.push(ExceptionRecord { code, message });
        Ok(())
    }

    /// Append a response to the command numbered `seq`.
    pub fn create_response(
        &mut self,
        seq: &str,
        result: ResultCode,
        message: Option<&str>,
        timestamp: Option<Timestamp>,
    ) -> Result<()> {
        if seq.is_empty() {
            return Err(Error::SequenceNumberRequired);
        }
        self.charge::<ResponseRecord>()?;
        let seq = self.arena.alloc_str(seq).map_err(no_space)?;
        let message = self.arena.alloc_opt_str(message).map_err(no_space)?;
        self.responses.push(ResponseRecord {
            seq,
            result,
            message,
            timestamp,
        });
        Ok(())
    }

    /// Reserve room for `count` message-level properties.
    ///
    /// They are embedded in the first response, or emitted bare under the
    /// root when the message has no response.
    pub fn create_property_set(&mut self, count: usize) -> Result<()> {
        let set = self
            .arena
            .alloc_property_set(count)
            .map_err(|_| Error::MessageBufferExhausted)?;
        self.properties = Some(set);
        Ok(())
    }

    /// Append a message-level property; an absent value is stored as empty.
    pub fn create_property(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let set = self.properties.as_mut().ok_or(Error::TooManyProperties)?;
        set.push(&mut self.arena, Some(key), Some(value.unwrap_or_default()))
            .map_err(no_space)
    }

    /// Serialize into `out`, returning the number of bytes written.
    ///
    /// Nothing is written when `out` is too small.
    pub fn format(&self, out: &mut [u8]) -> Result<usize> {
        let xml = self.to_string();
        let Some(dst) = out.get_mut(..xml.len()) else {
            return Err(Error::BufferTooSmall {
                needed: xml.len(),
                got: out.len(),
            });
        };
        dst.copy_from_slice(xml.as_bytes());
        trace!(len = xml.len(), "format message");
        Ok(xml.len())
    }

    /// Serialize into a new buffer.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        Bytes::from(self.to_string())
    }

    fn write_optional(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: &str,
        value: Option<Span>,
    ) -> fmt::Result {
        match value {
            Some(span) => write_attribute(f, name, self.arena.str(span)),
            None => Ok(()),
        }
    }

    fn write_timestamp(
        &self,
        f: &mut fmt::Formatter<'_>,
        timestamp: Option<Timestamp>,
    ) -> fmt::Result {
        match timestamp.and_then(|ts| format_timestamp(ts, self.timezone_offset)) {
            Some(text) => write_attribute(f, attribute::TIMESTAMP, &text),
            None => Ok(()),
        }
    }

    fn write_properties(
        &self,
        f: &mut fmt::Formatter<'_>,
        set: &PropertySet,
        with_values: bool,
    ) -> fmt::Result {
        for (key, value) in set.iter(&self.arena) {
            write!(f, "<{}", element::PROPERTY)?;
            write_attribute(f, attribute::NAME, key)?;
            if with_values {
                write_attribute(f, attribute::VALUE, value)?;
            }
            f.write_str("/>")?;
        }
        Ok(())
    }

    fn write_command(&self, f: &mut fmt::Formatter<'_>, command: &CommandRecord) -> fmt::Result {
        write!(f, "<{}", element::COMMAND)?;
        write_attribute(f, attribute::NAME, self.arena.str(command.name))?;
        self.write_optional(f, attribute::ADDRESS, command.address)?;
        self.write_optional(f, attribute::SEQ, command.seq)?;
        self.write_timestamp(f, command.timestamp)?;
        if command.properties.is_empty() {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        self.write_properties(f, &command.properties, command.require_values)?;
        write!(f, "</{}>", element::COMMAND)
    }

    fn write_percept(&self, f: &mut fmt::Formatter<'_>, percept: &PerceptRecord) -> fmt::Result {
        write!(f, "<{}", element::PERCEPT)?;
        write_attribute(f, attribute::ADDRESS, self.arena.str(percept.address))?;
        write_attribute(f, attribute::VALUE, self.arena.str(percept.value))?;
        self.write_optional(f, attribute::PERCEPT_TYPE, percept.percept_type)?;
        self.write_optional(f, attribute::SEQ, percept.seq)?;
        if percept.entry != EntryType::Scheduled {
            write_attribute(f, attribute::ENTRY_TYPE, &percept.entry.as_u8().to_string())?;
        }
        self.write_timestamp(f, percept.timestamp)?;
        f.write_str("/>")
    }

    fn write_exception(
        &self,
        f: &mut fmt::Formatter<'_>,
        exception: &ExceptionRecord,
    ) -> fmt::Result {
        write!(f, "<{}", element::EXCEPTION)?;
        write_attribute(f, attribute::EXCEPTION_CODE, &exception.code.as_i32().to_string())?;
        self.write_optional(f, attribute::MESSAGE, exception.message)?;
        f.write_str("/>")
    }

    fn write_response(
        &self,
        f: &mut fmt::Formatter<'_>,
        response: &ResponseRecord,
        properties: Option<&PropertySet>,
    ) -> fmt::Result {
        write!(f, "<{}", element::RESPONSE)?;
        write_attribute(f, attribute::RESULT_CODE, &response.result.as_i32().to_string())?;
        self.write_optional(f, attribute::MESSAGE, response.message)?;
        write_attribute(f, attribute::SEQ, self.arena.str(response.seq))?;
        self.write_timestamp(f, response.timestamp)?;
        let Some(set) = properties else {
            return f.write_str("/>");
        };
        f.write_str(">")?;
        self.write_properties(f, set, true)?;
        write!(f, "</{}>", element::RESPONSE)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", element::MESSAGE)?;
        write_attribute(f, attribute::VERSION, VERSION)?;
        self.write_optional(f, attribute::TELEMETRY_DEVICE, self.uuid)?;
        f.write_str(">")?;

        for command in &self.commands {
            self.write_command(f, command)?;
        }
        for percept in &self.percepts {
            self.write_percept(f, percept)?;
        }
        for exception in &self.exceptions {
            self.write_exception(f, exception)?;
        }
        for (index, response) in self.responses.iter().enumerate() {
            let embedded = if index == 0 {
                self.properties.as_ref()
            } else {
                None
            };
            self.write_response(f, response, embedded)?;
        }
        if self.responses.is_empty() {
            if let Some(set) = &self.properties {
                self.write_properties(f, set, true)?;
            }
        }

        write!(f, "</{}>", element::MESSAGE)
    }
}
