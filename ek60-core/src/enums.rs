//! Enumerations used by the configuration headers, ping metadata, and
//! transform entry points.
use num::FromPrimitive;
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

use crate::errors::*;

/// From the CON0 TransceiverConfig record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum BeamType {
    SingleBeam = 0,
    SplitBeam = 1,
    Invalid,
}

impl BeamType {
    pub fn new(source: u8) -> Self {
        Self::from_u8(source).unwrap_or(Self::Invalid)
    }

    pub fn is_split_beam(self) -> bool {
        self == Self::SplitBeam
    }
}

/// RAW0 transmit_mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum TransmitMode {
    Active = 0,
    Passive = 1,
    Test = 2,
    Unknown,
}

impl TransmitMode {
    /// NB: unrecognised codes fall back to `Unknown` rather than erroring,
    /// since this field never gates parsing of the rest of the payload.
    pub fn new(source: u16) -> Self {
        Self::from_u16(source).unwrap_or(Self::Unknown)
    }
}

/// Seawater absorption model, selectable per transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum AbsorptionModel {
    AinslieMcColm = 0,
    FrancoisGarrison = 1,
}

impl AbsorptionModel {
    /// NB: there is no "no such model" numeric source in the public API
    /// (callers select by this enum directly), so this returns a
    /// `Result` purely for symmetry with the other enums used in fallible
    /// contexts such as ECS key parsing.
    pub fn new(source: u8) -> Result<Self, EkError> {
        Self::from_u8(source).ok_or_else(|| EkError::ParseEnum {
            f: "AbsorptionModel".to_string(),
            code: source as i64,
        })
    }
}

/// `to_grid` vertical alignment reference (spec §4.8.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum AlignReference {
    TransducerFace,
    Surface,
    Bottom,
}

/// Logical NMEA field categories a caller can request without naming a
/// concrete sentence type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum MetaNmeaType {
    Position,
    Speed,
    Distance,
    Attitude,
}

impl MetaNmeaType {
    /// Concrete sentence types tried in priority order for this
    /// meta-type (empty for `Attitude`, which is served from `MotionLog`
    /// rather than NMEA).
    pub fn preference_order(self) -> &'static [&'static str] {
        match self {
            Self::Position => &["GGA", "GLL", "RMC"],
            Self::Speed => &["VTG", "VHW", "RMC"],
            Self::Distance => &["VLW"],
            Self::Attitude => &[],
        }
    }
}
