//! Engine capacities and policy

use crate::protocol::{Error, ParseLimits, Result};

/// Engine configuration.
///
/// Capacities are fixed at construction; exceeding one at runtime abandons
/// the operation that hit it and reports a "increase buffer" error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Behaviors that can be active at once.
    pub max_behaviors: usize,
    /// Properties accepted per incoming command.
    pub max_properties: usize,
    /// Arena bytes for parsing one incoming message.
    pub parser_buffer_size: usize,
    /// Arena bytes for one outgoing message.
    pub message_buffer_size: usize,
    /// Scratch bytes for the properties of one `setupTransducer` command.
    pub property_buffer_size: usize,
    /// Sequence numbers remembered for duplicate detection.
    pub sequence_history: usize,
    /// Shortest accepted report interval, in seconds.
    pub min_report_interval: i64,
    /// Minutes added to timestamps before they are rendered.
    pub timezone_offset_minutes: i32,
    /// Announce the `type` of analog inputs even though it is the default.
    pub announce_default_type: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_behaviors: 16,
            max_properties: 16,
            parser_buffer_size: 4096,
            message_buffer_size: 8192,
            property_buffer_size: 2048,
            sequence_history: 16,
            min_report_interval: 60,
            timezone_offset_minutes: 0,
            announce_default_type: true,
        }
    }
}

impl EngineConfig {
    /// Reject capacities the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("max_behaviors", self.max_behaviors),
            ("max_properties", self.max_properties),
            ("parser_buffer_size", self.parser_buffer_size),
            ("message_buffer_size", self.message_buffer_size),
            ("property_buffer_size", self.property_buffer_size),
            ("sequence_history", self.sequence_history),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{name} must be non-zero")));
        }
        if self.min_report_interval <= 0 {
            return Err(Error::Config(
                "min_report_interval must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Limits handed to the incoming message parser.
    #[must_use]
    pub const fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_properties: self.max_properties,
            buffer_size: self.parser_buffer_size,
        }
    }
}
