//! Property tables for the stock transducer kinds.
//!
//! Every entry starts hidden with the value `"0"`; a client configures it
//! with `setConfiguration`.

use super::Property;
use crate::behavior::keys;

fn table(names: &[&str]) -> Vec<Property> {
    names.iter().map(|key| Property::new(*key, "0")).collect()
}

/// Device-wide report schedules.
#[must_use]
pub fn device_properties() -> Vec<Property> {
    table(&[
        keys::REPORT_ALL_ABSOLUTE_RUN,
        keys::REPORT_ALL_ABSOLUTE_TIME,
        keys::REPORT_ALL_INTERVAL_RUN,
        keys::REPORT_ALL_INTERVAL_START,
        keys::REPORT_ALL_INTERVAL_TIME,
    ])
}

/// Analog input: calibration, report schedules and alarm boundaries.
#[must_use]
pub fn analog_input_properties() -> Vec<Property> {
    table(&[
        keys::ANALOG_CALIBRATION,
        keys::REPORT_POINT_ABSOLUTE_RUN,
        keys::REPORT_POINT_ABSOLUTE_TIME,
        keys::REPORT_POINT_INTERVAL_RUN,
        keys::REPORT_POINT_INTERVAL_START,
        keys::REPORT_POINT_INTERVAL_TIME,
        keys::LOW,
        keys::HIGH,
        keys::LOW_LOW,
        keys::HIGH_HIGH,
    ])
}

/// Digital input: transition alarm.
#[must_use]
pub fn digital_input_properties() -> Vec<Property> {
    table(&[keys::ALARM_LEVEL])
}

/// Digital output: pulses and timers.
#[must_use]
pub fn digital_output_properties() -> Vec<Property> {
    table(&[
        keys::PULSE_LOW_RUN,
        keys::PULSE_LOW_TIME,
        keys::PULSE_HIGH_RUN,
        keys::PULSE_HIGH_TIME,
        keys::TIMER_LOW_ABSOLUTE_RUN,
        keys::TIMER_LOW_ABSOLUTE_TIME,
        keys::TIMER_HIGH_ABSOLUTE_RUN,
        keys::TIMER_HIGH_ABSOLUTE_TIME,
        keys::TIMER_LOW_INTERVAL_RUN,
        keys::TIMER_LOW_INTERVAL_TIME,
        keys::TIMER_HIGH_INTERVAL_RUN,
        keys::TIMER_HIGH_INTERVAL_TIME,
    ])
}
