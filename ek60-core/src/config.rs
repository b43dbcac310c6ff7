//! `ConfigHeader` and `TransceiverConfig`, decoded from the file's CON0
//! datagram (spec §3.1).
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

use crate::enums::BeamType;

/// Number of entries in `pulse_length_table` / `gain_table` /
/// `sa_correction_table`.
pub const CAL_TABLE_LEN: usize = 5;

/// One per file: survey metadata plus the per-channel static
/// configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub struct ConfigHeader {
    pub survey_name: String,
    pub transect_name: String,
    pub sounder_name: String,
    pub version: String,
    pub transceivers: Vec<TransceiverConfig>,
}

impl ConfigHeader {
    pub fn transceiver_count(&self) -> usize {
        self.transceivers.len()
    }

    pub fn transceiver_by_channel_id(&self, channel_id: &str) -> Option<&TransceiverConfig> {
        self.transceivers
            .iter()
            .find(|t| t.channel_id == channel_id)
    }
}

/// Static per-channel configuration, one entry per transceiver listed in
/// CON0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub struct TransceiverConfig {
    pub channel_id: String,
    pub beam_type: BeamType,
    /// Hz.
    pub frequency: f64,
    /// dB re 1 steradian.
    pub equivalent_beam_angle: f64,
    /// dB.
    pub gain: f64,
    /// Degrees.
    pub beamwidth_alongship: f64,
    /// Degrees.
    pub beamwidth_athwartship: f64,
    pub angle_sensitivity_alongship: f64,
    pub angle_sensitivity_athwartship: f64,
    pub angle_offset_alongship: f64,
    pub angle_offset_athwartship: f64,
    /// Transducer position, (x, y, z) meters relative to the vessel
    /// reference point.
    pub position: [f64; 3],
    /// Transducer mounting direction, unit vector (x, y, z).
    pub direction: [f64; 3],
    /// Seconds, indexed in parallel with `gain_table` and
    /// `sa_correction_table`.
    pub pulse_length_table: [f64; CAL_TABLE_LEN],
    /// dB, indexed by `pulse_length_table`.
    pub gain_table: [f64; CAL_TABLE_LEN],
    /// dB, indexed by `pulse_length_table`.
    pub sa_correction_table: [f64; CAL_TABLE_LEN],
}

impl TransceiverConfig {
    /// Index into `pulse_length_table` (and therefore `gain_table` /
    /// `sa_correction_table`) whose entry is closest to `pulse_length`,
    /// within a 1 microsecond tolerance. `None` if no entry is within
    /// tolerance (spec §3.3, §7 `PulseLengthMismatch`).
    pub fn pulse_length_index(&self, pulse_length: f64) -> Option<usize> {
        const TOLERANCE_S: f64 = 1e-6;
        self.pulse_length_table
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - pulse_length)
                    .abs()
                    .partial_cmp(&(*b - pulse_length).abs())
                    .unwrap()
            })
            .filter(|(_, v)| (**v - pulse_length).abs() <= TOLERANCE_S)
            .map(|(i, _)| i)
    }

    /// Nearest-match pulse length index even when nothing is within
    /// tolerance, for the `PulseLengthMismatch` warn-and-continue path.
    pub fn nearest_pulse_length_index(&self, pulse_length: f64) -> usize {
        self.pulse_length_table
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - pulse_length)
                    .abs()
                    .partial_cmp(&(*b - pulse_length).abs())
                    .unwrap()
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Trim null bytes and trailing whitespace from a fixed-width ASCII field,
/// as required for every string field in CON0 (spec §4.3).
pub fn trim_ascii_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}
