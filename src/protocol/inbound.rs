//! Incoming message model: validates the element stream of a parsed message
//! against the `<M2MXML><Command><Property/></Command></M2MXML>` schema and
//! dispatches the command to a [`CommandHandlers`] table.

use tracing::{debug, warn};

use super::arena::{Arena, ArenaError, PropertySet};
use super::error::{Error, Result};
use super::parser::{Attributes, ElementHandler, Parser};
use super::timestamp::Timestamp;
use super::types::CommandKind;
use super::{MAX_DEPTH, VERSION, attribute, element, property};

/// Capacities applied while parsing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseLimits {
    /// Property elements accepted per command.
    pub max_properties: usize,
    /// Arena bytes for the copied command fields and properties.
    pub buffer_size: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_properties: 16,
            buffer_size: 4096,
        }
    }
}

/// Key/value properties attached to a command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Properties<'a> {
    inner: Option<(&'a Arena, &'a PropertySet)>,
}

impl<'a> Properties<'a> {
    /// View over a property set stored in `arena`.
    #[must_use]
    pub const fn new(arena: &'a Arena, set: &'a PropertySet) -> Self {
        Self {
            inner: Some((arena, set)),
        }
    }

    /// No properties.
    #[must_use]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.inner.and_then(|(arena, set)| set.get(arena, key))
    }

    /// Value stored under `key`, or `default`.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.inner
            .into_iter()
            .flat_map(|(arena, set)| set.iter(arena))
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.map_or(0, |(_, set)| set.len())
    }

    /// Whether there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A validated command handed to a [`CommandHandlers`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct IncomingCommand<'a> {
    /// Recognized command, or [`CommandKind::Unknown`].
    pub kind: CommandKind,
    /// Command name as sent.
    pub name: &'a str,
    /// UUID from the root `td` attribute.
    pub uuid: Option<&'a str>,
    /// Sequence number.
    pub seq: Option<&'a str>,
    /// Target transducer address.
    pub address: Option<&'a str>,
    /// Child properties.
    pub properties: Properties<'a>,
    /// Time the message was received.
    pub timestamp: Timestamp,
}

/// Table of handlers the incoming model dispatches to.
///
/// A handler is only invoked when [`CommandHandlers::is_registered`] reports
/// it; unregistered commands are logged as unhandled. Returning `false` from
/// a handler aborts the rest of the message.
pub trait CommandHandlers {
    /// Error sink for malformed or unhandled messages.
    fn log_error(&mut self, _code: i32, _description: &str) {}

    /// Whether a handler for `kind` is installed. `turnOn` and `turnOff`
    /// share the [`CommandKind::TurnOn`] registration.
    fn is_registered(&self, _kind: CommandKind) -> bool {
        false
    }

    /// Command with an unrecognized name.
    fn unknown_command(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }

    /// `requestPercept`
    fn request_percept(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }

    /// `turnOn` (`sense` true) or `turnOff`
    fn turn_on_off(&mut self, _command: &IncomingCommand<'_>, _sense: bool) -> bool {
        false
    }

    /// `setStringOutput` with its `data` property
    fn set_string_output(&mut self, _command: &IncomingCommand<'_>, _value: &str) -> bool {
        false
    }

    /// `setAnalogOutput` with its parsed `setPoint` property
    fn set_analog_output(&mut self, _command: &IncomingCommand<'_>, _set_point: f64) -> bool {
        false
    }

    /// `reboot`
    fn reboot(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }

    /// `queryConfiguration`
    fn query_configuration(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }

    /// `setConfiguration`
    fn set_configuration(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }
}

struct MessageState<'h, H: ?Sized> {
    handlers: &'h mut H,
    arena: Arena,
    properties: PropertySet,
    timestamp: Timestamp,
    depth: usize,
    uuid: Option<super::Span>,
    name: Option<super::Span>,
    seq: Option<super::Span>,
    address: Option<super::Span>,
    kind: CommandKind,
    require_values: bool,
    command_seen: bool,
    failure: Option<Error>,
}

/// Report `err` through the log hook unless a handler raised it itself.
fn reject<H: CommandHandlers + ?Sized>(handlers: &mut H, err: &Error) {
    if !matches!(err, Error::HandlerRejected { .. }) {
        warn!(code = err.code(), error = %err, "message rejected");
        handlers.log_error(err.code(), &err.to_string());
    }
}

fn exhausted(err: ArenaError) -> Error {
    match err {
        ArenaError::SetFull { .. } => Error::TooManyProperties,
        ArenaError::Exhausted { .. } => Error::ParserBufferExhausted,
    }
}

impl<H: CommandHandlers + ?Sized> MessageState<'_, H> {
    /// Mark the message invalid; later elements are only checked for syntax.
    fn fail(&mut self, err: Error) {
        reject(&mut *self.handlers, &err);
        self.failure = Some(err);
    }

    fn validate_message(&mut self, name: &str, attributes: &Attributes<'_>) -> Result<()> {
        if name != element::MESSAGE || attributes.get(attribute::VERSION) != Some(VERSION) {
            return Err(Error::InvalidMessage);
        }
        self.uuid = self
            .arena
            .alloc_opt_str(attributes.get(attribute::TELEMETRY_DEVICE))
            .map_err(exhausted)?;
        Ok(())
    }

    fn validate_command(&mut self, name: &str, attributes: &Attributes<'_>) -> Result<()> {
        if self.command_seen {
            return Err(Error::CommandAlreadyFound { command: self.kind });
        }
        let (element::COMMAND, Some(command), Some(seq)) = (
            name,
            attributes.get(attribute::NAME),
            attributes.get(attribute::SEQ),
        ) else {
            return Err(Error::InvalidCommand);
        };
        self.name = Some(self.arena.alloc_str(command).map_err(exhausted)?);
        self.seq = Some(self.arena.alloc_str(seq).map_err(exhausted)?);
        self.address = self
            .arena
            .alloc_opt_str(attributes.get(attribute::ADDRESS))
            .map_err(exhausted)?;
        self.kind = CommandKind::from_name(command);
        self.require_values = self.kind != CommandKind::QueryConfiguration;
        self.command_seen = true;
        Ok(())
    }

    fn validate_property(&mut self, name: &str, attributes: &Attributes<'_>) -> Result<()> {
        if name != element::PROPERTY {
            return Err(Error::InvalidProperty);
        }
        let key = attributes.get(attribute::NAME).ok_or(Error::InvalidProperty)?;
        let value = match attributes.get(attribute::VALUE) {
            Some(value) => value,
            None if !self.require_values => "",
            None => return Err(Error::InvalidProperty),
        };
        self.properties
            .push(&mut self.arena, Some(key), Some(value))
            .map_err(exhausted)
    }

    fn execute(&mut self) -> Result<()> {
        let arena = &self.arena;
        let command = IncomingCommand {
            kind: self.kind,
            name: self.name.map_or("", |span| arena.str(span)),
            uuid: self.uuid.map(|span| arena.str(span)),
            seq: self.seq.map(|span| arena.str(span)),
            address: self.address.map(|span| arena.str(span)),
            properties: Properties::new(arena, &self.properties),
            timestamp: self.timestamp,
        };
        let handlers = &mut *self.handlers;
        debug!(
            command = %command.kind,
            seq = ?command.seq,
            address = ?command.address,
            "dispatch command"
        );

        // Query and set dispatch are each gated on the other's registration.
        let gate = match command.kind {
            CommandKind::QueryConfiguration => CommandKind::SetConfiguration,
            CommandKind::SetConfiguration => CommandKind::QueryConfiguration,
            CommandKind::TurnOff => CommandKind::TurnOn,
            other => other,
        };
        if !handlers.is_registered(gate) {
            return Err(Error::UnhandledCommand {
                command: command.kind,
            });
        }

        let accepted = match command.kind {
            CommandKind::Unknown => handlers.unknown_command(&command),
            CommandKind::RequestPercept => handlers.request_percept(&command),
            CommandKind::TurnOn => handlers.turn_on_off(&command, true),
            CommandKind::TurnOff => handlers.turn_on_off(&command, false),
            CommandKind::SetStringOutput => {
                let data = command
                    .properties
                    .get(property::DATA)
                    .ok_or(Error::MissingStringData)?;
                handlers.set_string_output(&command, data)
            }
            CommandKind::SetAnalogOutput => {
                let set_point = command
                    .properties
                    .get(property::SET_POINT)
                    .ok_or(Error::MissingSetPoint)?;
                handlers.set_analog_output(&command, crate::device::parse_float(set_point))
            }
            CommandKind::Reboot => handlers.reboot(&command),
            CommandKind::QueryConfiguration => handlers.query_configuration(&command),
            CommandKind::SetConfiguration => handlers.set_configuration(&command),
        };
        if accepted {
            Ok(())
        } else {
            Err(Error::HandlerRejected {
                command: command.kind,
            })
        }
    }
}

impl<H: CommandHandlers + ?Sized> ElementHandler for MessageState<'_, H> {
    fn start_element(&mut self, name: &str, attributes: &Attributes<'_>) -> Result<()> {
        if self.failure.is_none() {
            let result = match self.depth {
                0 => self.validate_message(name, attributes),
                1 => self.validate_command(name, attributes),
                _ => self.validate_property(name, attributes),
            };
            if let Err(err) = result {
                self.fail(err);
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        self.depth -= 1;
        if self.depth == 1 && self.failure.is_none() {
            if let Err(err) = self.execute() {
                self.fail(err);
            }
        }
        Ok(())
    }
}

/// Parse one message and dispatch its command.
///
/// Every failure except a handler's own rejection is also reported through
/// [`CommandHandlers::log_error`], as soon as it is found. An invalid message
/// is still read to its end so later syntax errors are reported too; the
/// syntax error is returned in preference to the first invalid element.
pub fn parse_message<H>(
    handlers: &mut H,
    input: &str,
    limits: &ParseLimits,
    timestamp: Timestamp,
) -> Result<()>
where
    H: CommandHandlers + ?Sized,
{
    match run(handlers, input, limits, timestamp) {
        Ok(None) => Ok(()),
        Ok(Some(failure)) => Err(failure),
        Err(err) => {
            reject(handlers, &err);
            Err(err)
        }
    }
}

/// Parse `input`, returning the first element failure of a well-formed
/// message.
fn run<H>(
    handlers: &mut H,
    input: &str,
    limits: &ParseLimits,
    timestamp: Timestamp,
) -> Result<Option<Error>>
where
    H: CommandHandlers + ?Sized,
{
    let mut arena = Arena::new(limits.buffer_size);
    let properties = arena
        .alloc_property_set(limits.max_properties)
        .map_err(|_| Error::ParserBufferExhausted)?;
    let mut state = MessageState {
        handlers,
        arena,
        properties,
        timestamp,
        depth: 0,
        uuid: None,
        name: None,
        seq: None,
        address: None,
        kind: CommandKind::Unknown,
        require_values: true,
        command_seen: false,
        failure: None,
    };
    Parser::new(MAX_DEPTH).parse(input, &mut state)?;
    Ok(state.failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SyntaxError;

    #[derive(Default)]
    struct Table {
        registered: Vec<CommandKind>,
        calls: Vec<String>,
        errors: Vec<(i32, String)>,
        refuse: bool,
    }

    impl Table {
        fn with(kinds: &[CommandKind]) -> Self {
            Self {
                registered: kinds.to_vec(),
                ..Self::default()
            }
        }

        fn record(&mut self, what: String) -> bool {
            self.calls.push(what);
            !self.refuse
        }
    }

    impl CommandHandlers for Table {
        fn log_error(&mut self, code: i32, description: &str) {
            self.errors.push((code, description.to_owned()));
        }

        fn is_registered(&self, kind: CommandKind) -> bool {
            self.registered.contains(&kind)
        }

        fn unknown_command(&mut self, command: &IncomingCommand<'_>) -> bool {
            let props: Vec<String> = command
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            self.record(format!("unknown {} {}", command.name, props.join(",")))
        }

        fn request_percept(&mut self, command: &IncomingCommand<'_>) -> bool {
            self.record(format!(
                "requestPercept {:?} {:?} {:?}",
                command.uuid, command.seq, command.address
            ))
        }

        fn turn_on_off(&mut self, command: &IncomingCommand<'_>, sense: bool) -> bool {
            self.record(format!("turn {sense} {:?}", command.address))
        }

        fn set_string_output(&mut self, _: &IncomingCommand<'_>, value: &str) -> bool {
            self.record(format!("string {value}"))
        }

        fn set_analog_output(&mut self, _: &IncomingCommand<'_>, set_point: f64) -> bool {
            self.record(format!("analog {set_point}"))
        }

        fn query_configuration(&mut self, command: &IncomingCommand<'_>) -> bool {
            let props: Vec<String> = command
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v:?}"))
                .collect();
            self.record(format!("query {}", props.join(",")))
        }

        fn set_configuration(&mut self, command: &IncomingCommand<'_>) -> bool {
            self.record(format!("set {}", command.properties.len()))
        }
    }

    fn parse(table: &mut Table, input: &str) -> Result<()> {
        parse_message(table, input, &ParseLimits::default(), 1_000)
    }

    #[test]
    fn request_percept_reaches_its_handler() {
        let mut table = Table::with(&[CommandKind::RequestPercept]);
        parse(
            &mut table,
            r#"<M2MXML ver="1.0" td="abc"><Command name="requestPercept" address="ain01" seq="7"/></M2MXML>"#,
        )
        .unwrap();
        assert_eq!(
            table.calls,
            [r#"requestPercept Some("abc") Some("7") Some("ain01")"#]
        );
        assert!(table.errors.is_empty());
    }

    #[test]
    fn root_must_be_a_supported_version() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(&mut table, r#"<M2MXML ver="2.0"/>"#).unwrap_err();
        assert_eq!(err, Error::InvalidMessage);
        assert_eq!(table.errors, [(-1, "Invalid message".to_owned())]);
        assert_eq!(
            parse(&mut table, r#"<Message ver="1.0"/>"#),
            Err(Error::InvalidMessage)
        );
    }

    #[test]
    fn commands_require_name_and_seq() {
        let mut table = Table::with(&CommandKind::KNOWN);
        for input in [
            r#"<M2MXML ver="1.0"><Command name="reboot"/></M2MXML>"#,
            r#"<M2MXML ver="1.0"><Command seq="1"/></M2MXML>"#,
            r#"<M2MXML ver="1.0"><Percept name="reboot" seq="1"/></M2MXML>"#,
        ] {
            assert_eq!(parse(&mut table, input), Err(Error::InvalidCommand));
        }
        assert!(table.calls.is_empty());
    }

    #[test]
    fn turn_commands_carry_their_sense() {
        let mut table = Table::with(&[CommandKind::TurnOn]);
        parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="turnOff" address="dout01" seq="1"/></M2MXML>"#,
        )
        .unwrap();
        assert_eq!(table.calls, [r#"turn false Some("dout01")"#]);
    }

    #[test]
    fn output_commands_require_their_payload() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setStringOutput" seq="1"/></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::MissingStringData);
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setAnalogOutput" seq="2"><Property name="data" value="1"/></Command></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::MissingSetPoint);

        parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setAnalogOutput" seq="3"><Property name="setPoint" value="12.5mA"/></Command></M2MXML>"#,
        )
        .unwrap();
        parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setStringOutput" seq="4"><Property name="data" value="hello"/></Command></M2MXML>"#,
        )
        .unwrap();
        assert_eq!(table.calls, ["analog 12.5", "string hello"]);
    }

    #[test]
    fn property_values_are_optional_only_for_queries() {
        let mut table = Table::with(&CommandKind::KNOWN);
        parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="queryConfiguration" seq="1"><Property name="low"/><Property name="high" value="9"/></Command></M2MXML>"#,
        )
        .unwrap();
        assert_eq!(table.calls, [r#"query low="",high="9""#]);

        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setConfiguration" seq="2"><Property name="low"/></Command></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidProperty);
    }

    #[test]
    fn property_count_is_capped() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let limits = ParseLimits {
            max_properties: 1,
            ..ParseLimits::default()
        };
        let err = parse_message(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setConfiguration" seq="1"><Property name="a" value="1"/><Property name="b" value="2"/></Command></M2MXML>"#,
            &limits,
            0,
        )
        .unwrap_err();
        assert_eq!(err, Error::TooManyProperties);
        assert!(table.calls.is_empty());
    }

    #[test]
    fn undersized_buffer_is_reported() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let limits = ParseLimits {
            max_properties: 64,
            buffer_size: 32,
        };
        let err = parse_message(&mut table, r#"<M2MXML ver="1.0"/>"#, &limits, 0).unwrap_err();
        assert_eq!(err, Error::ParserBufferExhausted);
        assert_eq!(
            table.errors[0].1,
            "Not enough M2MXML buffer space; increase and recompile"
        );
    }

    #[test]
    fn second_command_is_rejected() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="reboot" seq="1"/><Command name="reboot" seq="2"/></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::CommandAlreadyFound {
                command: CommandKind::Reboot
            }
        );
        assert_eq!(table.errors, [(6, "A command has already been found".to_owned())]);
    }

    #[test]
    fn unknown_commands_keep_name_and_properties() {
        let mut table = Table::with(&[CommandKind::Unknown]);
        parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="selfTest" seq="1"><Property name="level" value="2"/></Command></M2MXML>"#,
        )
        .unwrap();
        assert_eq!(table.calls, ["unknown selfTest level=2"]);
    }

    #[test]
    fn unregistered_commands_are_logged_as_unhandled() {
        let mut table = Table::default();
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="reboot" seq="1"/></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::UnhandledCommand {
                command: CommandKind::Reboot
            }
        );
        assert_eq!(table.errors, [(6, "Unhandled command ID".to_owned())]);
    }

    #[test]
    fn configuration_dispatch_is_gated_on_the_opposite_registration() {
        let mut table = Table::with(&[CommandKind::QueryConfiguration]);
        let query = r#"<M2MXML ver="1.0"><Command name="queryConfiguration" seq="1"/></M2MXML>"#;
        let set = r#"<M2MXML ver="1.0"><Command name="setConfiguration" seq="2"/></M2MXML>"#;
        assert!(matches!(
            parse(&mut table, query),
            Err(Error::UnhandledCommand { .. })
        ));
        parse(&mut table, set).unwrap();
        assert_eq!(table.calls, ["set 0"]);

        let mut table = Table::with(&[CommandKind::SetConfiguration]);
        parse(&mut table, query).unwrap();
        assert_eq!(table.calls, ["query "]);
    }

    #[test]
    fn handler_rejection_fails_without_logging() {
        let mut table = Table::with(&CommandKind::KNOWN);
        table.refuse = true;
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="reboot" seq="1"/></M2MXML>"#,
        );
        assert!(err.is_err());
        assert!(table.errors.is_empty());
    }

    #[test]
    fn malformed_input_invokes_no_handler() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="requestPercept" seq="1"></M2MXM>"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::Syntax(SyntaxError::MismatchedEndTag));
        assert_eq!(table.errors, [(0, "Mismatching ending element name".to_owned())]);
        assert!(table.calls.is_empty());
    }

    #[test]
    fn invalid_command_still_reports_the_broken_end_tag() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(&mut table, r#"<M2MXML ver="1.0"><Command name="x"></M2MXM>"#).unwrap_err();
        assert_eq!(err, Error::Syntax(SyntaxError::MismatchedEndTag));
        assert_eq!(
            table.errors,
            [
                (-1, "Invalid command".to_owned()),
                (0, "Mismatching ending element name".to_owned()),
            ]
        );
        assert!(table.calls.is_empty());
    }

    #[test]
    fn only_the_first_invalid_element_is_reported() {
        let mut table = Table::with(&CommandKind::KNOWN);
        let err = parse(
            &mut table,
            r#"<M2MXML ver="1.0"><Command name="setConfiguration" seq="1"><Property value="1"/><Property/></Command></M2MXML>"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidProperty);
        assert_eq!(table.errors.len(), 1);
        assert!(table.calls.is_empty());
    }

    #[test]
    fn properties_view_lookups() {
        let mut arena = Arena::new(128);
        let mut set = arena.alloc_property_set(2).unwrap();
        set.push(&mut arena, Some("a"), Some("1")).unwrap();
        let props = Properties::new(&arena, &set);
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get_or("b", "dflt"), "dflt");
        assert!(Properties::empty().is_empty());
        assert_eq!(Properties::empty().iter().count(), 0);
    }
}
