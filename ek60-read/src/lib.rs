//! Datagram framing reader, per-tag datagram parsers, and the minimal ECS
//! calibration-file reader for EK60/ER60 `.raw` streams.
extern crate ek60_core;

pub mod datagram;
pub mod ecs;
pub mod framing;

pub use datagram::{Datagram, RawPayload};
pub use ecs::{parse_ecs, EcsFile};
pub use framing::{FrameHeader, FrameReader};
