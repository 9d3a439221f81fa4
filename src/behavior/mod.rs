//! Standard behaviors and their scheduling primitives.
//!
//! A behavior is a scheduled or polled rule bound to the device or to one
//! transducer. The set of behaviors is closed: [`BehaviorKind`] names each
//! one, reports which configuration keys govern it, and the engine runs its
//! configure and execute phases.

pub mod keys;
mod pool;
mod schedule;

use std::fmt;

pub use pool::{Behavior, BehaviorId, BehaviorPool};
pub use schedule::{
    SECONDS_PER_DAY, catch_up, next_start_time, time_of_day, value_crosses_boundary,
};

/// The standard behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorKind {
    /// Report every transducer once a day
    ReportAllAbsolute,
    /// Report one transducer once a day
    ReportPointAbsolute,
    /// Report every transducer periodically
    ReportAllInterval,
    /// Report one transducer periodically
    ReportPointInterval,
    /// Report a digital input when it changes level
    DigitalTransition,
    /// Report an analog input when it crosses a boundary
    OutOfBounds,
    /// Announce every transducer with `setupTransducer`, once
    SetupDevice,
    /// Switch a digital output off once a day
    TimerOffAbsolute,
    /// Switch a digital output on once a day
    TimerOnAbsolute,
    /// Switch a digital output off periodically
    TimerOffInterval,
    /// Switch a digital output on periodically
    TimerOnInterval,
}

impl BehaviorKind {
    /// Behaviors offered a configuration key when a client sets it, in
    /// matching order.
    pub const STANDARD: [Self; 10] = [
        Self::ReportAllAbsolute,
        Self::ReportPointAbsolute,
        Self::ReportAllInterval,
        Self::ReportPointInterval,
        Self::DigitalTransition,
        Self::OutOfBounds,
        Self::TimerOffAbsolute,
        Self::TimerOnAbsolute,
        Self::TimerOffInterval,
        Self::TimerOnInterval,
    ];

    /// Configuration keys that govern this behavior.
    #[must_use]
    pub const fn property_keys(self) -> &'static [&'static str] {
        match self {
            Self::ReportAllAbsolute => {
                &[keys::REPORT_ALL_ABSOLUTE_RUN, keys::REPORT_ALL_ABSOLUTE_TIME]
            }
            Self::ReportPointAbsolute => {
                &[keys::REPORT_POINT_ABSOLUTE_RUN, keys::REPORT_POINT_ABSOLUTE_TIME]
            }
            Self::ReportAllInterval => &[
                keys::REPORT_ALL_INTERVAL_RUN,
                keys::REPORT_ALL_INTERVAL_START,
                keys::REPORT_ALL_INTERVAL_TIME,
            ],
            Self::ReportPointInterval => &[
                keys::REPORT_POINT_INTERVAL_RUN,
                keys::REPORT_POINT_INTERVAL_START,
                keys::REPORT_POINT_INTERVAL_TIME,
            ],
            Self::DigitalTransition => &[keys::ALARM_LEVEL],
            Self::OutOfBounds => &[keys::LOW, keys::HIGH, keys::LOW_LOW, keys::HIGH_HIGH],
            Self::SetupDevice => &[],
            Self::TimerOffAbsolute => {
                &[keys::TIMER_LOW_ABSOLUTE_RUN, keys::TIMER_LOW_ABSOLUTE_TIME]
            }
            Self::TimerOnAbsolute => {
                &[keys::TIMER_HIGH_ABSOLUTE_RUN, keys::TIMER_HIGH_ABSOLUTE_TIME]
            }
            Self::TimerOffInterval => {
                &[keys::TIMER_LOW_INTERVAL_RUN, keys::TIMER_LOW_INTERVAL_TIME]
            }
            Self::TimerOnInterval => {
                &[keys::TIMER_HIGH_INTERVAL_RUN, keys::TIMER_HIGH_INTERVAL_TIME]
            }
        }
    }

    /// Whether setting `key` should (re)configure this behavior.
    #[must_use]
    pub fn matches_property_key(self, key: &str) -> bool {
        self.property_keys().contains(&key)
    }

    /// First standard behavior governed by `key`.
    #[must_use]
    pub fn for_property_key(key: &str) -> Option<Self> {
        Self::STANDARD
            .into_iter()
            .find(|kind| kind.matches_property_key(key))
    }

    /// Whether the behavior reads the device's own properties rather than a
    /// transducer's.
    #[must_use]
    pub const fn is_device_wide(self) -> bool {
        matches!(
            self,
            Self::ReportAllAbsolute | Self::ReportAllInterval | Self::SetupDevice
        )
    }

    /// Actuation sense of a timer behavior.
    #[must_use]
    pub const fn timer_sense(self) -> Option<bool> {
        match self {
            Self::TimerOffAbsolute | Self::TimerOffInterval => Some(false),
            Self::TimerOnAbsolute | Self::TimerOnInterval => Some(true),
            _ => None,
        }
    }

    /// Stable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReportAllAbsolute => "reportAllAbsolute",
            Self::ReportPointAbsolute => "reportPointAbsolute",
            Self::ReportAllInterval => "reportAllInterval",
            Self::ReportPointInterval => "reportPointInterval",
            Self::DigitalTransition => "digitalTransition",
            Self::OutOfBounds => "outOfBounds",
            Self::SetupDevice => "setupDevice",
            Self::TimerOffAbsolute => "timerOffAbsolute",
            Self::TimerOnAbsolute => "timerOnAbsolute",
            Self::TimerOffInterval => "timerOffInterval",
            Self::TimerOnInterval => "timerOnInterval",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Digital transition that raises an alarm, stored under
/// [`keys::ALARM_LEVEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LevelChange {
    /// Disabled
    Off = 0,
    /// Rising edge
    LowToHigh = 1,
    /// Falling edge
    HighToLow = 2,
    /// Any edge
    Either = 3,
}

impl LevelChange {
    /// Decode a stored level.
    #[must_use]
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::LowToHigh),
            2 => Some(Self::HighToLow),
            3 => Some(Self::Either),
            _ => None,
        }
    }

    /// Whether moving from `last` to `current` is an alarming transition.
    #[must_use]
    pub const fn triggers(self, last: i64, current: i64) -> bool {
        if last == current {
            return false;
        }
        match self {
            Self::Off => false,
            Self::LowToHigh => current != 0,
            Self::HighToLow => last != 0,
            Self::Either => true,
        }
    }
}
