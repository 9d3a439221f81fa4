//! Application callbacks driven by the engine

use crate::device::{Device, Property, Transducer};
use crate::protocol::{CommandKind, IncomingCommand, Message, Properties, ResultCode, Timestamp};

/// Hooks the application installs on an [`Engine`](super::Engine).
///
/// The engine resolves addresses, checks transducer types and builds every
/// response; a hook only touches hardware and reports how it went. A hook is
/// called only when [`DeviceHandlers::handles`] reports its command, and
/// every method has a default so an application implements what it
/// supports.
///
/// Readings belong in [`Transducer::current_value_mut`]. The alarm
/// behaviors compare them against [`Transducer::last_value`], which they
/// latch themselves when they report.
pub trait DeviceHandlers {
    /// Whether the hook for `kind` is installed. `turnOn` and `turnOff`
    /// share [`CommandKind::TurnOn`].
    fn handles(&self, _kind: CommandKind) -> bool {
        false
    }

    /// Error sink.
    fn log_error(&mut self, _code: i32, _description: &str) {}

    /// Command the engine does not know. Return `true` once it has been
    /// dealt with; otherwise an `unknownCommand` response is sent.
    fn unknown_command(&mut self, _command: &IncomingCommand<'_>) -> bool {
        false
    }

    /// Refresh the reading of `transducer`, optionally restamping it.
    fn request_percept(
        &mut self,
        _transducer: &mut Transducer,
        _timestamp: &mut Option<Timestamp>,
    ) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Drive a digital output.
    fn turn_on_off(
        &mut self,
        _transducer: &mut Transducer,
        _sense: bool,
        _properties: &Properties<'_>,
    ) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Write a string output.
    fn set_string_output(&mut self, _transducer: &mut Transducer, _value: &str) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Write an analog output.
    fn set_analog_output(&mut self, _transducer: &mut Transducer, _set_point: f64) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Restart the device.
    fn reboot(&mut self, _device: &Device) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Refresh `property` before it is reported. `address` is `None` for
    /// device-wide properties.
    fn query_configuration(
        &mut self,
        _address: Option<&str>,
        _property: &mut Property,
    ) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Apply a property the client just set. Keys that drive a standard
    /// behavior are handled by the engine and never reach this hook.
    fn set_configuration(
        &mut self,
        _address: Option<&str>,
        _property: &mut Property,
    ) -> ResultCode {
        ResultCode::FAILED_EXECUTION
    }

    /// Deliver a finished outgoing message.
    fn send_message(&mut self, _device: &Device, _message: &Message) {}
}
