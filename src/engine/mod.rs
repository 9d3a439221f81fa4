//! Behavior engine
//!
//! [`Engine`] owns one [`Device`] and drives it: incoming messages are
//! parsed and dispatched to the standard command handlers, and
//! [`Engine::process_state`] runs the active behaviors. Everything happens
//! on the caller's thread; the engine never blocks or spawns.
//!
//! ```no_run
//! use m2mxml::device::{Device, Direction, Transducer};
//! use m2mxml::engine::{DeviceHandlers, Engine, EngineConfig};
//! use m2mxml::protocol::PerceptType;
//!
//! struct Board;
//! impl DeviceHandlers for Board {}
//!
//! let device = Device::with_random_uuid()
//!     .with_transducer(Transducer::new("ain01", PerceptType::Analog, Direction::IN));
//! let mut engine = Engine::new(device, Board, EngineConfig::default())?;
//! engine.parse_message(br#"<M2MXML ver="1.0"><Command name="reboot" seq="1"/></M2MXML>"#)?;
//! while let Some(delay) = engine.process_state() {
//!     std::thread::sleep(delay);
//! }
//! # Ok::<(), m2mxml::protocol::Error>(())
//! ```

mod behaviors;
mod clock;
mod config;
mod dedup;
mod dispatch;
mod handlers;

use std::time::Duration;

use tracing::{debug, trace, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use dedup::SequenceHistory;
pub use handlers::DeviceHandlers;

use crate::behavior::{self, Behavior, BehaviorKind, BehaviorPool};
use crate::device::Device;
use crate::protocol::{self, Arena, Error, ExceptionCode, Message, Result, Timestamp};

/// Device runtime: command dispatch plus the behavior state machine.
pub struct Engine<H> {
    device: Device,
    handlers: H,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    behaviors: BehaviorPool,
    history: SequenceHistory,
    outgoing: Option<Message>,
    property_arena: Arena,
    last_error: Option<Error>,
}

impl<H: DeviceHandlers> Engine<H> {
    /// Engine for `device`, reading the system clock.
    pub fn new(device: Device, handlers: H, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            uuid = ?device.uuid(),
            transducers = device.transducers().len(),
            max_behaviors = config.max_behaviors,
            "engine created"
        );
        Ok(Self {
            device,
            handlers,
            behaviors: BehaviorPool::new(config.max_behaviors),
            history: SequenceHistory::new(config.sequence_history),
            property_arena: Arena::new(config.property_buffer_size),
            outgoing: None,
            last_error: None,
            clock: Box::new(SystemClock),
            config,
        })
    }

    /// Read time from `clock` instead.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The managed device.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Mutable device, e.g. to record readings outside a request.
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Installed hooks.
    #[must_use]
    pub const fn handlers(&self) -> &H {
        &self.handlers
    }

    /// Mutable hooks.
    pub fn handlers_mut(&mut self) -> &mut H {
        &mut self.handlers
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse one incoming message and execute its command.
    ///
    /// Protocol failures are answered with a response where the message
    /// carries a sequence number; malformed input is only logged and
    /// returned.
    pub fn parse_message(&mut self, input: &[u8]) -> Result<()> {
        let result = match std::str::from_utf8(input) {
            Ok(text) => {
                let limits = self.config.parse_limits();
                let now = self.clock.now();
                protocol::parse_message(self, text, &limits, now)
            }
            Err(err) => {
                let err = Error::from(err);
                self.log(&err);
                Err(err)
            }
        };
        if let Err(err) = &result {
            self.last_error = Some(err.clone());
        }
        result
    }

    /// Most recent failure of [`Engine::parse_message`].
    #[must_use]
    pub const fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Run the next due behavior, if any, and report how long the caller
    /// may wait before calling again.
    ///
    /// Returns `None` once no behavior is active. A zero delay means
    /// another behavior is already due.
    pub fn process_state(&mut self) -> Option<Duration> {
        if self.behaviors.is_empty() {
            return None;
        }
        let now = self.clock.now();
        if let Some(id) = self.behaviors.find_due(now) {
            self.behaviors.anchor_after(id);
            if !self.run_behavior(id, behaviors::Phase::Execute, now) {
                trace!(slot = id.index(), "behavior finished");
                // The slot is known to be active here.
                let _ = self.behaviors.exclude(id);
            }
        }
        let id = self.behaviors.earliest()?;
        self.behaviors.anchor_at(id);
        let next = self.behaviors.get(id)?.next_firing;
        Some(Duration::from_secs(
            u64::try_from(next.saturating_sub(now)).unwrap_or(0),
        ))
    }

    /// Activate `kind` on the transducer at `address` (the device itself
    /// when `None`) and configure it from the current properties.
    ///
    /// With `property_key`, nothing happens unless the key governs `kind`.
    /// Returns whether the behavior is active afterwards.
    pub fn configure_behavior(
        &mut self,
        kind: BehaviorKind,
        address: Option<&str>,
        property_key: Option<&str>,
    ) -> Result<bool> {
        let target = self.resolve(address)?;
        self.configure(kind, target, property_key)
    }

    /// Deactivate `kind` on the transducer at `address`.
    pub fn exclude_behavior(&mut self, kind: BehaviorKind, address: Option<&str>) -> Result<()> {
        let target = self.resolve(address)?;
        let result = self
            .behaviors
            .find(kind, target)
            .ok_or(Error::BehaviorNotFound)
            .and_then(|id| self.behaviors.exclude(id));
        if let Err(err) = &result {
            self.log(err);
        }
        result
    }

    /// Number of active behaviors.
    #[must_use]
    pub fn count_behaviors(&self) -> usize {
        self.behaviors.len()
    }

    /// Active instance of `kind` on the transducer at `address`.
    #[must_use]
    pub fn behavior(&self, kind: BehaviorKind, address: Option<&str>) -> Option<&Behavior> {
        let target = match address {
            Some(address) => Some(self.device.transducer_index(address)?),
            None => None,
        };
        self.behaviors
            .find(kind, target)
            .and_then(|id| self.behaviors.get(id))
    }

    /// Send an unsolicited `<Exception>`.
    pub fn report_exception(&mut self, code: ExceptionCode, message: Option<&str>) -> Result<()> {
        if let Some(message) = message {
            self.handlers.log_error(-1, message);
        }
        let result = Message::new(self.device.uuid(), self.config.message_buffer_size)
            .map_err(|_| Error::MessageUnavailable)
            .and_then(|outgoing| {
                let mut outgoing =
                    outgoing.with_timezone_offset(self.config.timezone_offset_minutes);
                outgoing.create_exception(code, message)?;
                Ok(outgoing)
            });
        match result {
            Ok(outgoing) => {
                debug!(code = code.as_i32(), "exception reported");
                self.handlers.send_message(&self.device, &outgoing);
                Ok(())
            }
            Err(err) => {
                self.log(&err);
                Err(err)
            }
        }
    }

    /// `seconds_since_midnight` into today, local time, per the engine clock.
    #[must_use]
    pub fn next_start_time(&self, seconds_since_midnight: i64, must_be_future: bool) -> Timestamp {
        behavior::next_start_time(self.clock.now(), seconds_since_midnight, must_be_future)
    }

    fn resolve(&self, address: Option<&str>) -> Result<Option<usize>> {
        address
            .map(|address| {
                self.device
                    .transducer_index(address)
                    .ok_or(Error::InvalidTransducer)
            })
            .transpose()
    }

    fn log(&mut self, err: &Error) {
        warn!(code = err.code(), error = %err, "engine error");
        self.handlers.log_error(err.code(), &err.to_string());
    }
}
