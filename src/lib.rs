//! M2MXML - compact XML telemetry and control protocol for constrained devices
//!
//! This library implements the device side of M2MXML: a micro-XML parser
//! sized for embedded targets, the incoming command and outgoing message
//! models, a device data model of transducers and properties, and an engine
//! that dispatches commands and runs the standard scheduled behaviors.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use m2mxml::{Device, DeviceHandlers, Direction, Engine, EngineConfig, PerceptType, Transducer};
//!
//! struct Sensor;
//! impl DeviceHandlers for Sensor {}
//!
//! let device = Device::with_random_uuid()
//!     .with_transducer(Transducer::new("din01", PerceptType::Digital, Direction::IN));
//! let mut engine = Engine::new(device, Sensor, EngineConfig::default())?;
//!
//! let query = r#"<M2MXML ver="1.0"><Command name="queryConfiguration" seq="7"/></M2MXML>"#;
//! engine.parse_message(query.as_bytes())?;
//! let delay = engine.process_state();
//! # let _ = delay;
//! # Ok::<(), m2mxml::Error>(())
//! ```
//!
//! # Layout
//!
//! - [`protocol`] - parser, arena, incoming and outgoing message models
//! - [`device`] - device, transducers and their configuration properties
//! - [`behavior`] - scheduled reports, timers and alarm behaviors
//! - [`engine`] - runtime tying the device, its hooks and its behaviors together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod behavior;
pub mod device;
pub mod engine;
pub mod protocol;

pub use behavior::BehaviorKind;
pub use device::{Device, Direction, Property, Transducer, Value};
pub use engine::{DeviceHandlers, Engine, EngineConfig};
pub use protocol::{
    CommandKind, EntryType, Error, ExceptionCode, Message, PerceptType, Result, ResultCode,
    Timestamp,
};

/// M2MXML protocol version
pub const VERSION: &str = protocol::VERSION;
