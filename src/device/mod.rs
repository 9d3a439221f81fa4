//! Device data model
//!
//! A [`Device`] owns its [`Transducer`]s and device-wide [`Property`]s. All
//! configuration is held as text in fixed-capacity [`Value`] buffers and is
//! parsed on use, so the stored form and the wire form never diverge.

mod standard;

use std::fmt;

use uuid::Uuid;

use crate::protocol::{PerceptType, UUID_SIZE};

pub use standard::{
    analog_input_properties, device_properties, digital_input_properties,
    digital_output_properties,
};

/// Default capacity of a [`Value`] buffer, terminator slot included.
pub const VALUE_SIZE: usize = 32;

/// Parse the leading integer of `text`.
///
/// Leading whitespace and a sign are accepted; parsing stops at the first
/// non-digit and an input without digits yields 0.
#[must_use]
pub fn parse_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}

/// Parse the leading decimal number of `text`, or 0 when there is none.
#[must_use]
pub fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut at: usize| {
        while bytes.get(at).is_some_and(u8::is_ascii_digit) {
            at += 1;
        }
        at
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integral_end = digits_from(end);
    let mut mantissa = integral_end > end;
    end = integral_end;
    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_from(end + 1);
        mantissa |= fraction_end > end + 1;
        end = fraction_end;
    }
    if !mantissa {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = digits_from(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

/// Fixed-capacity text buffer.
///
/// A value holds at most `capacity - 1` bytes, leaving room for the
/// terminator of the wire buffer; longer input is truncated at a character
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Value {
    text: String,
    capacity: usize,
}

impl Value {
    /// Empty value holding up to `capacity - 1` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Value initialised with `text`.
    #[must_use]
    pub fn with_text(capacity: usize, text: &str) -> Self {
        let mut value = Self::new(capacity);
        value.set(text);
        value
    }

    /// Buffer size, terminator slot included.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace the text, truncating to fit.
    pub fn set(&mut self, text: &str) {
        let mut end = text.len().min(self.capacity.saturating_sub(1));
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.text.clear();
        self.text.push_str(&text[..end]);
    }

    /// Copy another value's text, truncating to fit.
    pub fn copy_from(&mut self, other: &Self) {
        self.set(&other.text);
    }

    /// Leading integer of the text.
    #[must_use]
    pub fn as_int(&self) -> i64 {
        parse_int(&self.text)
    }

    /// Leading decimal number of the text.
    #[must_use]
    pub fn as_float(&self) -> f64 {
        parse_float(&self.text)
    }

    /// Whether the text starts with a non-zero integer.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        self.as_int() != 0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::new(VALUE_SIZE)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Named configuration value of a device or transducer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    key: String,
    value: Value,
    show: bool,
}

impl Property {
    /// Property that is not yet configured.
    #[must_use]
    pub fn new(key: impl Into<String>, initial: &str) -> Self {
        Self {
            key: key.into(),
            value: Value::with_text(VALUE_SIZE, initial),
            show: false,
        }
    }

    /// Use a value buffer of `capacity` bytes.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        let text = self.value.as_str().to_owned();
        self.value = Value::with_text(capacity, &text);
        self
    }

    /// Mark as configured from the start.
    #[must_use]
    pub const fn shown(mut self) -> Self {
        self.show = true;
        self
    }

    /// Schema name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored text.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable stored text.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Whether the property is exposed as configured.
    #[must_use]
    pub const fn show(&self) -> bool {
        self.show
    }

    /// Change the configured flag.
    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    /// Store a client-supplied value and mark the property configured.
    pub fn assign(&mut self, text: &str) {
        self.show = true;
        self.value.set(text);
    }
}

/// First property named `key`.
#[must_use]
pub fn find_property<'a>(properties: &'a [Property], key: &str) -> Option<&'a Property> {
    properties.iter().find(|property| property.key == key)
}

/// First property named `key`, mutably.
pub fn find_property_mut<'a>(
    properties: &'a mut [Property],
    key: &str,
) -> Option<&'a mut Property> {
    properties.iter_mut().find(|property| property.key == key)
}

/// Transducer direction bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Direction(u8);

impl Direction {
    /// Not exposed
    pub const HIDDEN: Self = Self(0);
    /// Sensor
    pub const IN: Self = Self(1);
    /// Actuator
    pub const OUT: Self = Self(2);
    /// Sensor and actuator
    pub const INOUT: Self = Self(Self::IN.0 | Self::OUT.0);

    /// Create from bits; unknown bits are rejected.
    #[must_use]
    pub const fn from_u8(bits: u8) -> Option<Self> {
        if bits & !Self::INOUT.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Raw bits
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Readable as a sensor
    #[must_use]
    pub const fn is_input(self) -> bool {
        self.has(Self::IN)
    }

    /// Drivable as an actuator
    #[must_use]
    pub const fn is_output(self) -> bool {
        self.has(Self::OUT)
    }
}

/// Addressable input or output point of a device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transducer {
    percept_type: PerceptType,
    direction: Direction,
    address: String,
    label: Option<String>,
    units: Option<String>,
    properties: Vec<Property>,
    last_value: Value,
    current_value: Value,
}

impl Transducer {
    /// Transducer without label, units or properties.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        percept_type: PerceptType,
        direction: Direction,
    ) -> Self {
        Self {
            percept_type,
            direction,
            address: address.into(),
            label: None,
            units: None,
            properties: Vec::new(),
            last_value: Value::default(),
            current_value: Value::default(),
        }
    }

    /// Set the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the engineering units.
    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Attach configuration properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Resize both reading buffers, keeping their text where it fits.
    #[must_use]
    pub fn with_value_capacity(mut self, capacity: usize) -> Self {
        self.last_value = Value::with_text(capacity, self.last_value.as_str());
        self.current_value = Value::with_text(capacity, self.current_value.as_str());
        self
    }

    /// Seed the current reading.
    #[must_use]
    pub fn with_current_value(mut self, text: &str) -> Self {
        self.current_value.set(text);
        self
    }

    /// Routing address
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Semantic type
    #[must_use]
    pub const fn percept_type(&self) -> PerceptType {
        self.percept_type
    }

    /// Direction bits
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Display label
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Engineering units
    #[must_use]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Configuration properties in declaration order
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Mutable configuration properties
    pub fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    /// Property named `key`
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Property> {
        find_property(&self.properties, key)
    }

    /// Mutable property named `key`
    pub fn property_mut(&mut self, key: &str) -> Option<&mut Property> {
        find_property_mut(&mut self.properties, key)
    }

    /// Reading last reported by exception
    #[must_use]
    pub const fn last_value(&self) -> &Value {
        &self.last_value
    }

    /// Mutable last reading
    pub fn last_value_mut(&mut self) -> &mut Value {
        &mut self.last_value
    }

    /// Most recent reading
    #[must_use]
    pub const fn current_value(&self) -> &Value {
        &self.current_value
    }

    /// Mutable current reading
    pub fn current_value_mut(&mut self) -> &mut Value {
        &mut self.current_value
    }

    /// Record a new reading, moving the previous one to the last value.
    pub fn update_value(&mut self, text: &str) {
        self.last_value.copy_from(&self.current_value);
        self.current_value.set(text);
    }

    /// Make the current reading the last reported one.
    pub fn latch_current_value(&mut self) {
        self.last_value.copy_from(&self.current_value);
    }
}

/// A device: identity, transducers and device-wide properties.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    uuid: Option<String>,
    transducers: Vec<Transducer>,
    properties: Vec<Property>,
}

impl Device {
    /// Device with the given identity and nothing attached.
    #[must_use]
    pub fn new(uuid: Option<&str>) -> Self {
        Self {
            uuid: uuid.map(str::to_owned),
            transducers: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Device identified by a fresh random UUID in 32-digit hex form.
    #[must_use]
    pub fn with_random_uuid() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        debug_assert_eq!(uuid.len(), UUID_SIZE);
        Self::new(Some(&uuid))
    }

    /// Attach a transducer.
    #[must_use]
    pub fn with_transducer(mut self, transducer: Transducer) -> Self {
        self.transducers.push(transducer);
        self
    }

    /// Attach device-wide properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Identity carried in outgoing messages.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// Replace the identity.
    pub fn set_uuid(&mut self, uuid: Option<&str>) {
        self.uuid = uuid.map(str::to_owned);
    }

    /// Transducers in declaration order
    #[must_use]
    pub fn transducers(&self) -> &[Transducer] {
        &self.transducers
    }

    /// Mutable transducers
    pub fn transducers_mut(&mut self) -> &mut [Transducer] {
        &mut self.transducers
    }

    /// Position of the transducer at `address` (exact, case-sensitive).
    #[must_use]
    pub fn transducer_index(&self, address: &str) -> Option<usize> {
        self.transducers
            .iter()
            .position(|transducer| transducer.address == address)
    }

    /// Transducer at `address`
    #[must_use]
    pub fn transducer(&self, address: &str) -> Option<&Transducer> {
        self.transducer_index(address).map(|index| &self.transducers[index])
    }

    /// Mutable transducer at `address`
    pub fn transducer_mut(&mut self, address: &str) -> Option<&mut Transducer> {
        self.transducer_index(address)
            .map(|index| &mut self.transducers[index])
    }

    /// Device-wide properties
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Mutable device-wide properties
    pub fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    /// Device-wide property named `key`
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Property> {
        find_property(&self.properties, key)
    }

    /// Mutable device-wide property named `key`
    pub fn property_mut(&mut self, key: &str) -> Option<&mut Property> {
        find_property_mut(&mut self.properties, key)
    }
}
