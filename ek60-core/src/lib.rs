//! Core types for the EK60/ER60 echosounder ingest pipeline: time codec,
//! errors, enums, configuration headers, per-channel ping storage,
//! ancillary time-series logs, calibration overrides, and the calibrated
//! grid result type. Built either with serialization support, or in a
//! slightly more lightweight manner without it (see features).
#![allow(clippy::derive_partial_eq_without_eq)]
extern crate fnv;
extern crate num;
#[macro_use]
extern crate num_derive;

#[cfg(any(feature = "to_json", feature = "serde"))]
extern crate serde;
#[cfg(feature = "to_json")]
extern crate serde_json;

pub mod ancillary;
pub mod calibration;
pub mod config;
pub mod enums;
pub mod errors;
pub mod grid;
pub mod settings;
pub mod store;
pub mod time;

pub use ancillary::{BottomLog, MotionLog, NmeaLog};
pub use calibration::{CalParam, Calibration};
pub use config::{ConfigHeader, TransceiverConfig};
pub use enums::*;
pub use errors::EkError;
pub use grid::CalibratedGrid;
pub use settings::ReadSettings;
pub use store::{PingMeta, RawChannelData};
pub use time::{FileTime, Instant};
