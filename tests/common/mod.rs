#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use m2mxml::device::{
    Device, Direction, Property, Transducer, analog_input_properties, device_properties,
    digital_input_properties, digital_output_properties,
};
use m2mxml::engine::{Engine, EngineConfig, ManualClock};
use m2mxml::protocol::{CommandKind, Message, PerceptType, Properties, ResultCode, Timestamp};
use m2mxml::DeviceHandlers;

pub const UUID: &str = "0123456789abcdef0123456789abcdef";

/// Tuesday 14 November 2023, mid-afternoon UTC.
pub const NOW: Timestamp = 1_699_974_000;

/// Hooks that record what the engine asks of the hardware.
#[derive(Default)]
pub struct Board {
    pub sent: Vec<String>,
    pub errors: Vec<(i32, String)>,
    pub calls: Vec<String>,
    pub readings: HashMap<String, VecDeque<String>>,
    pub unsupported: Vec<CommandKind>,
}

impl Board {
    pub fn queue_readings(&mut self, address: &str, readings: &[&str]) {
        self.readings
            .entry(address.to_owned())
            .or_default()
            .extend(readings.iter().map(|reading| (*reading).to_owned()));
    }

    pub fn logged(&self, description: &str) -> bool {
        self.errors.iter().any(|(_, text)| text == description)
    }

    pub fn last_sent(&self) -> &str {
        self.sent.last().map_or("", String::as_str)
    }
}

impl DeviceHandlers for Board {
    fn handles(&self, kind: CommandKind) -> bool {
        kind != CommandKind::Unknown && !self.unsupported.contains(&kind)
    }

    fn log_error(&mut self, code: i32, description: &str) {
        self.errors.push((code, description.to_owned()));
    }

    fn request_percept(
        &mut self,
        transducer: &mut Transducer,
        _timestamp: &mut Option<Timestamp>,
    ) -> ResultCode {
        self.calls.push(format!("requestPercept {}", transducer.address()));
        if let Some(reading) = self
            .readings
            .get_mut(transducer.address())
            .and_then(VecDeque::pop_front)
        {
            transducer.current_value_mut().set(&reading);
        }
        ResultCode::SUCCESS
    }

    fn turn_on_off(
        &mut self,
        transducer: &mut Transducer,
        sense: bool,
        _properties: &Properties<'_>,
    ) -> ResultCode {
        self.calls.push(format!("turn {} {sense}", transducer.address()));
        transducer
            .current_value_mut()
            .set(if sense { "1" } else { "0" });
        ResultCode::SUCCESS
    }

    fn set_string_output(&mut self, transducer: &mut Transducer, value: &str) -> ResultCode {
        self.calls.push(format!("string {} {value}", transducer.address()));
        ResultCode::SUCCESS
    }

    fn set_analog_output(&mut self, transducer: &mut Transducer, set_point: f64) -> ResultCode {
        self.calls.push(format!("analog {} {set_point}", transducer.address()));
        ResultCode::SUCCESS
    }

    fn reboot(&mut self, _device: &Device) -> ResultCode {
        self.calls.push("reboot".to_owned());
        ResultCode::SUCCESS
    }

    fn query_configuration(&mut self, _address: Option<&str>, _property: &mut Property) -> ResultCode {
        ResultCode::SUCCESS
    }

    fn set_configuration(&mut self, address: Option<&str>, property: &mut Property) -> ResultCode {
        self.calls.push(format!(
            "set {} {}={}",
            address.unwrap_or("device"),
            property.key(),
            property.value()
        ));
        ResultCode::SUCCESS
    }

    fn send_message(&mut self, _device: &Device, message: &Message) {
        self.sent.push(message.to_string());
    }
}

/// Device with one of each stock transducer kind.
pub fn device() -> Device {
    Device::new(Some(UUID))
        .with_properties(device_properties())
        .with_transducer(
            Transducer::new("ain01", PerceptType::Analog, Direction::IN)
                .with_label("Tank level")
                .with_units("m")
                .with_properties(analog_input_properties()),
        )
        .with_transducer(
            Transducer::new("din01", PerceptType::Digital, Direction::IN)
                .with_properties(digital_input_properties()),
        )
        .with_transducer(
            Transducer::new("dout01", PerceptType::Digital, Direction::OUT)
                .with_properties(digital_output_properties()),
        )
        .with_transducer(Transducer::new("sout01", PerceptType::String, Direction::OUT))
        .with_transducer(Transducer::new("aout01", PerceptType::Analog, Direction::OUT))
}

pub fn engine() -> (Engine<Board>, ManualClock) {
    let clock = ManualClock::new(NOW);
    let engine = Engine::new(device(), Board::default(), EngineConfig::default())
        .expect("default config is valid")
        .with_clock(clock.clone());
    (engine, clock)
}

/// Wrap a command in a message addressed to [`UUID`].
pub fn message(command: &str) -> String {
    format!(r#"<M2MXML ver="1.0" td="{UUID}">{command}</M2MXML>"#)
}

/// `setConfiguration` for `address` carrying `pairs`.
pub fn set_configuration(seq: &str, address: Option<&str>, pairs: &[(&str, &str)]) -> String {
    let address = address.map_or(String::new(), |address| format!(r#" address="{address}""#));
    let properties: String = pairs
        .iter()
        .map(|(key, value)| format!(r#"<Property name="{key}" value="{value}"/>"#))
        .collect();
    message(&format!(
        r#"<Command name="setConfiguration" seq="{seq}"{address}>{properties}</Command>"#
    ))
}
