//! Standard command handlers
//!
//! Every command follows the same path: check the UUID, record the
//! sequence number and open an outgoing message, resolve the target, call
//! the application hook and answer with percepts and a response. Protocol
//! failures become responses; only capacity problems are merely logged.

use tracing::{debug, trace};

use super::Engine;
use super::handlers::DeviceHandlers;
use crate::behavior::{BehaviorKind, keys};
use crate::device::{Device, Property};
use crate::protocol::{
    CommandHandlers, CommandKind, EntryType, Error, IncomingCommand, Message, PerceptType,
    Properties, Result, ResultCode, Timestamp,
};

fn outgoing(slot: &mut Option<Message>) -> Result<&mut Message> {
    slot.as_mut().ok_or(Error::MessageUnavailable)
}

fn properties_of(device: &Device, target: Option<usize>) -> &[Property] {
    match target {
        Some(index) => device.transducers()[index].properties(),
        None => device.properties(),
    }
}

fn properties_of_mut(device: &mut Device, target: Option<usize>) -> &mut [Property] {
    match target {
        Some(index) => device.transducers_mut()[index].properties_mut(),
        None => device.properties_mut(),
    }
}

impl<H: DeviceHandlers> Engine<H> {
    fn check_uuid(&mut self, uuid: Option<&str>) {
        let mismatch = matches!(
            (uuid, self.device.uuid()),
            (Some(incoming), Some(own)) if incoming != own
        );
        if mismatch {
            self.log(&Error::UuidMismatch);
        }
    }

    /// Record `seq` and open a fresh outgoing message.
    pub(super) fn prepare_message(&mut self, seq: Option<&str>) -> bool {
        if let Some(seq) = seq {
            if !self.history.record(seq) {
                self.log(&Error::DuplicateCommand {
                    seq: seq.to_owned(),
                });
                return false;
            }
        }
        match Message::new(self.device.uuid(), self.config.message_buffer_size) {
            Ok(message) => {
                self.outgoing =
                    Some(message.with_timezone_offset(self.config.timezone_offset_minutes));
                true
            }
            Err(err) => {
                debug!(error = %err, "outgoing message unavailable");
                self.outgoing = None;
                self.log(&Error::MessageUnavailable);
                false
            }
        }
    }

    pub(super) fn send_message(&mut self) {
        if let Some(message) = self.outgoing.take() {
            trace!(
                percepts = message.percept_count(),
                commands = message.command_count(),
                responses = message.response_count(),
                "send message"
            );
            self.handlers.send_message(&self.device, &message);
        }
    }

    /// Finish the outgoing message with a response to `seq` and send it.
    ///
    /// `error` is a failure met while filling the message; it is logged and
    /// nothing is sent. Without `seq` the message goes out only if it
    /// carries something.
    fn send_response(
        &mut self,
        error: Option<Error>,
        seq: Option<&str>,
        result: ResultCode,
        message: Option<&str>,
        timestamp: Option<Timestamp>,
    ) {
        let error = error.or_else(|| {
            let seq = seq?;
            outgoing(&mut self.outgoing)
                .and_then(|outgoing| outgoing.create_response(seq, result, message, timestamp))
                .err()
        });
        if let Some(err) = error {
            self.outgoing = None;
            self.log(&err);
            return;
        }
        if seq.is_none() && self.outgoing.as_ref().is_none_or(Message::is_empty) {
            self.outgoing = None;
            return;
        }
        self.send_message();
    }

    fn send_failure(&mut self, seq: Option<&str>, reason: &Error) {
        let reason = reason.to_string();
        self.send_response(None, seq, ResultCode::FAILED_EXECUTION, Some(&reason), None);
    }

    /// Open a message and resolve the transducer a command acts on.
    ///
    /// With `required`, the transducer must be an output of that type.
    fn prepare_transducer(
        &mut self,
        seq: Option<&str>,
        address: Option<&str>,
        required: Option<PerceptType>,
        hook: CommandKind,
    ) -> Option<usize> {
        if !self.prepare_message(seq) {
            return None;
        }
        let Some(address) = address else {
            self.send_failure(seq, &Error::AddressRequired);
            return None;
        };
        if !self.handlers.handles(hook) {
            self.send_failure(seq, &Error::CommandNotHandled);
            return None;
        }
        let Some(index) = self.device.transducer_index(address) else {
            self.send_response(None, seq, ResultCode::BAD_ARGUMENT, Some(address), None);
            return None;
        };
        let transducer = &self.device.transducers()[index];
        let fits = required.is_none_or(|percept_type| {
            transducer.percept_type() == percept_type && transducer.direction().is_output()
        });
        if !fits {
            self.send_failure(seq, &Error::InvalidTransducer);
            return None;
        }
        Some(index)
    }

    /// Report one transducer, refreshing its reading first when `update`.
    pub(super) fn send_single_percept(
        &mut self,
        seq: Option<&str>,
        address: Option<&str>,
        update: bool,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) {
        let Some(index) =
            self.prepare_transducer(seq, address, None, CommandKind::RequestPercept)
        else {
            return;
        };
        let mut timestamp = timestamp;
        let transducer = &mut self.device.transducers_mut()[index];
        let result = if update {
            self.handlers.request_percept(transducer, &mut timestamp)
        } else {
            ResultCode::SUCCESS
        };
        if result.is_success() {
            let error = outgoing(&mut self.outgoing)
                .and_then(|outgoing| {
                    outgoing.create_any_percept(
                        seq,
                        transducer.address(),
                        transducer.current_value().as_str(),
                        transducer.percept_type().wire_name(true),
                        entry,
                        timestamp,
                    )
                })
                .err();
            self.send_response(error, seq, result, None, timestamp);
        } else {
            let address = transducer.address().to_owned();
            self.send_response(None, seq, result, Some(&address), None);
        }
    }

    /// Report the transducer at `address`, or every input when `None`.
    pub(super) fn report(
        &mut self,
        seq: Option<&str>,
        address: Option<&str>,
        entry: EntryType,
        timestamp: Option<Timestamp>,
    ) {
        if address.is_some() {
            self.send_single_percept(seq, address, true, entry, timestamp);
            return;
        }
        if !self.prepare_message(seq) {
            return;
        }
        if self.device.transducers().is_empty()
            || !self.handlers.handles(CommandKind::RequestPercept)
        {
            self.send_failure(seq, &Error::CommandNotHandled);
            return;
        }

        let mut timestamp = timestamp;
        let mut result = ResultCode::SUCCESS;
        let mut failed = None;
        let mut error = None;
        for transducer in self.device.transducers_mut() {
            if !transducer.direction().is_input() {
                continue;
            }
            result = self.handlers.request_percept(transducer, &mut timestamp);
            if !result.is_success() {
                failed = Some(transducer.address().to_owned());
                timestamp = None;
                break;
            }
            if let Err(err) = outgoing(&mut self.outgoing).and_then(|outgoing| {
                outgoing.create_any_percept(
                    seq,
                    transducer.address(),
                    transducer.current_value().as_str(),
                    transducer.percept_type().wire_name(true),
                    entry,
                    timestamp,
                )
            }) {
                error = Some(err);
                break;
            }
        }
        self.send_response(error, seq, result, failed.as_deref(), timestamp);
    }

    fn finish_output(&mut self, seq: Option<&str>, index: usize, result: ResultCode) {
        let failed = (!result.is_success())
            .then(|| self.device.transducers()[index].address().to_owned());
        self.send_response(None, seq, result, failed.as_deref(), None);
    }

    /// Switch a digital output.
    pub(super) fn turn(
        &mut self,
        seq: Option<&str>,
        address: Option<&str>,
        sense: bool,
        properties: &Properties<'_>,
    ) {
        let Some(index) =
            self.prepare_transducer(seq, address, Some(PerceptType::Digital), CommandKind::TurnOn)
        else {
            return;
        };
        let transducer = &mut self.device.transducers_mut()[index];
        let result = self.handlers.turn_on_off(transducer, sense, properties);
        debug!(address = transducer.address(), sense, %result, "turn on/off");
        self.finish_output(seq, index, result);
    }

    fn write_string(&mut self, seq: Option<&str>, address: Option<&str>, value: &str) {
        let Some(index) = self.prepare_transducer(
            seq,
            address,
            Some(PerceptType::String),
            CommandKind::SetStringOutput,
        ) else {
            return;
        };
        let transducer = &mut self.device.transducers_mut()[index];
        let result = self.handlers.set_string_output(transducer, value);
        self.finish_output(seq, index, result);
    }

    fn write_analog(&mut self, seq: Option<&str>, address: Option<&str>, set_point: f64) {
        let Some(index) = self.prepare_transducer(
            seq,
            address,
            Some(PerceptType::Analog),
            CommandKind::SetAnalogOutput,
        ) else {
            return;
        };
        let transducer = &mut self.device.transducers_mut()[index];
        let result = self.handlers.set_analog_output(transducer, set_point);
        self.finish_output(seq, index, result);
    }

    fn restart(&mut self, seq: Option<&str>) {
        if !self.prepare_message(seq) {
            return;
        }
        if !self.handlers.handles(CommandKind::Reboot) {
            self.send_failure(seq, &Error::CommandNotHandled);
            return;
        }
        let result = self.handlers.reboot(&self.device);
        self.send_response(None, seq, result, None, None);
    }

    fn unknown(&mut self, command: &IncomingCommand<'_>) {
        if !self.prepare_message(command.seq) {
            return;
        }
        if self.handlers.handles(CommandKind::Unknown) && self.handlers.unknown_command(command) {
            self.outgoing = None;
            return;
        }
        self.send_response(
            None,
            command.seq,
            ResultCode::UNKNOWN_COMMAND,
            Some(command.name),
            None,
        );
    }

    /// Open a message and resolve an optional configuration target.
    ///
    /// `Err(())` means the command has already been answered.
    fn prepare_configuration(
        &mut self,
        command: &IncomingCommand<'_>,
        hook: CommandKind,
    ) -> std::result::Result<Option<usize>, ()> {
        if !self.prepare_message(command.seq) {
            return Err(());
        }
        if !self.handlers.handles(hook) {
            self.send_failure(command.seq, &Error::CommandNotHandled);
            return Err(());
        }
        let Some(address) = command.address else {
            return Ok(None);
        };
        match self.device.transducer_index(address) {
            Some(index) => Ok(Some(index)),
            None => {
                self.send_response(
                    None,
                    command.seq,
                    ResultCode::BAD_ARGUMENT,
                    Some(address),
                    None,
                );
                Err(())
            }
        }
    }

    fn query_properties(&mut self, command: &IncomingCommand<'_>) {
        let Ok(target) = self.prepare_configuration(command, CommandKind::QueryConfiguration)
        else {
            return;
        };
        if target.is_none() && command.properties.get(keys::SETUP_DEVICE).is_some() {
            let _ = self.configure(BehaviorKind::SetupDevice, None, None);
        }

        let count = properties_of(&self.device, target).len();
        if let Err(err) =
            outgoing(&mut self.outgoing).and_then(|outgoing| outgoing.create_property_set(count))
        {
            self.outgoing = None;
            self.log(&err);
            return;
        }
        let all = command.properties.is_empty();
        let mut result = ResultCode::SUCCESS;
        let mut failed = None;
        let mut error = None;
        for property in properties_of_mut(&mut self.device, target) {
            let requested = command.properties.get(property.key()).is_some();
            if !(requested || (all && property.show())) {
                continue;
            }
            result = self.handlers.query_configuration(command.address, property);
            if !result.is_success() {
                failed = Some(property.key().to_owned());
                break;
            }
            if let Err(err) = outgoing(&mut self.outgoing).and_then(|outgoing| {
                outgoing.create_property(property.key(), Some(property.value().as_str()))
            }) {
                error = Some(err);
                break;
            }
        }
        self.send_response(error, command.seq, result, failed.as_deref(), None);
    }

    fn set_properties(&mut self, command: &IncomingCommand<'_>) {
        let Ok(target) = self.prepare_configuration(command, CommandKind::SetConfiguration) else {
            return;
        };
        let mut result = ResultCode::SUCCESS;
        let mut failed = None;
        let count = properties_of(&self.device, target).len();
        for index in 0..count {
            let property = &mut properties_of_mut(&mut self.device, target)[index];
            let Some(value) = command.properties.get(property.key()) else {
                continue;
            };
            property.assign(value);
            if let Some(kind) = BehaviorKind::for_property_key(property.key()) {
                let key = property.key().to_owned();
                debug!(%kind, %key, "behavior property set");
                let _ = self.configure(kind, target, Some(&key));
                continue;
            }
            result = self.handlers.set_configuration(command.address, property);
            if !result.is_success() {
                failed = Some(property.key().to_owned());
                break;
            }
        }
        self.send_response(None, command.seq, result, failed.as_deref(), None);
    }
}

impl<H: DeviceHandlers> CommandHandlers for Engine<H> {
    fn log_error(&mut self, code: i32, description: &str) {
        self.handlers.log_error(code, description);
    }

    fn is_registered(&self, _kind: CommandKind) -> bool {
        true
    }

    fn unknown_command(&mut self, command: &IncomingCommand<'_>) -> bool {
        self.check_uuid(command.uuid);
        self.unknown(command);
        true
    }

    fn request_percept(&mut self, command: &IncomingCommand<'_>) -> bool {
        self.check_uuid(command.uuid);
        self.report(
            command.seq,
            command.address,
            EntryType::Requested,
            Some(command.timestamp),
        );
        true
    }

    fn turn_on_off(&mut self, command: &IncomingCommand<'_>, sense: bool) -> bool {
        self.check_uuid(command.uuid);
        self.turn(command.seq, command.address, sense, &command.properties);
        true
    }

    fn set_string_output(&mut self, command: &IncomingCommand<'_>, value: &str) -> bool {
        self.check_uuid(command.uuid);
        self.write_string(command.seq, command.address, value);
        true
    }

    fn set_analog_output(&mut self, command: &IncomingCommand<'_>, set_point: f64) -> bool {
        self.check_uuid(command.uuid);
        self.write_analog(command.seq, command.address, set_point);
        true
    }

    fn reboot(&mut self, command: &IncomingCommand<'_>) -> bool {
        self.check_uuid(command.uuid);
        self.restart(command.seq);
        true
    }

    fn query_configuration(&mut self, command: &IncomingCommand<'_>) -> bool {
        self.check_uuid(command.uuid);
        self.query_properties(command);
        true
    }

    fn set_configuration(&mut self, command: &IncomingCommand<'_>) -> bool {
        self.check_uuid(command.uuid);
        self.set_properties(command);
        true
    }
}
