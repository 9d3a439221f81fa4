//! Property keys that drive the standard behaviors

/// Device: enable the daily report of every transducer
pub const REPORT_ALL_ABSOLUTE_RUN: &str = "reportallabsolute.run";
/// Device: seconds after midnight of the daily report
pub const REPORT_ALL_ABSOLUTE_TIME: &str = "reportallabsolute.time";

/// Device: enable the periodic report of every transducer
pub const REPORT_ALL_INTERVAL_RUN: &str = "reportallinterval.run";
/// Device: seconds after midnight of the first periodic report
pub const REPORT_ALL_INTERVAL_START: &str = "reportallinterval.start";
/// Device: seconds between periodic reports
pub const REPORT_ALL_INTERVAL_TIME: &str = "reportallinterval.time";

/// Device: request a `setupTransducer` announcement
pub const SETUP_DEVICE: &str = "template";

/// Transducer: enable the daily report
pub const REPORT_POINT_ABSOLUTE_RUN: &str = "ReportPtAbsolute.Run";
/// Transducer: seconds after midnight of the daily report
pub const REPORT_POINT_ABSOLUTE_TIME: &str = "ReportPtAbsolute.Time";

/// Transducer: enable the periodic report
pub const REPORT_POINT_INTERVAL_RUN: &str = "ReportPtInterval.Run";
/// Transducer: seconds after midnight of the first periodic report
pub const REPORT_POINT_INTERVAL_START: &str = "ReportPtInterval.Start";
/// Transducer: seconds between periodic reports
pub const REPORT_POINT_INTERVAL_TIME: &str = "ReportPtInterval.Time";

/// Analog transducer: calibration id
pub const ANALOG_CALIBRATION: &str = "type";

/// 0-10 V DC calibration
pub const CALIBRATION_10VDC: i64 = 0;
/// 4-20 mA calibration
pub const CALIBRATION_20MA: i64 = 1;
/// ICTD temperature calibration
pub const CALIBRATION_ICTD: i64 = 2;

/// Analog transducer: inner low boundary
pub const LOW: &str = "low";
/// Analog transducer: outer low boundary
pub const LOW_LOW: &str = "lowlow";
/// Analog transducer: inner high boundary
pub const HIGH: &str = "high";
/// Analog transducer: outer high boundary
pub const HIGH_HIGH: &str = "highhigh";

/// Digital input: transition that raises an alarm
pub const ALARM_LEVEL: &str = "alarmLevel";

/// Digital output: enable the low pulse
pub const PULSE_LOW_RUN: &str = "PulseLow.Run";
/// Digital output: low pulse length
pub const PULSE_LOW_TIME: &str = "PulseLow.Time";
/// Digital output: enable the high pulse
pub const PULSE_HIGH_RUN: &str = "PulseHigh.Run";
/// Digital output: high pulse length
pub const PULSE_HIGH_TIME: &str = "PulseHigh.Time";

/// Digital output: enable the daily switch-off
pub const TIMER_LOW_ABSOLUTE_RUN: &str = "TimerLowAbsolute.Run";
/// Digital output: seconds after midnight of the daily switch-off
pub const TIMER_LOW_ABSOLUTE_TIME: &str = "TimerLowAbsolute.Time";
/// Digital output: enable the daily switch-on
pub const TIMER_HIGH_ABSOLUTE_RUN: &str = "TimerHighAbsolute.Run";
/// Digital output: seconds after midnight of the daily switch-on
pub const TIMER_HIGH_ABSOLUTE_TIME: &str = "TimerHighAbsolute.Time";

/// Digital output: enable the periodic switch-off
pub const TIMER_LOW_INTERVAL_RUN: &str = "TimerLowInterval.Run";
/// Digital output: seconds between switch-offs
pub const TIMER_LOW_INTERVAL_TIME: &str = "TimerLowInterval.Time";
/// Digital output: enable the periodic switch-on
pub const TIMER_HIGH_INTERVAL_RUN: &str = "TimerHighInterval.Run";
/// Digital output: seconds between switch-ons
pub const TIMER_HIGH_INTERVAL_TIME: &str = "TimerHighInterval.Time";
