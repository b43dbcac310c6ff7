//! User-facing calibration overrides (spec §3.1 `Calibration`), resolved
//! against raw per-ping data and static config by `ek60-transform`.
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

use crate::config::TransceiverConfig;

/// One calibration field: either left to fall back to raw/config data, a
/// single scalar broadcast to every ping, or a per-ping vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum CalParam {
    Unset,
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Default for CalParam {
    fn default() -> Self {
        CalParam::Unset
    }
}

impl CalParam {
    pub fn is_unset(&self) -> bool {
        matches!(self, CalParam::Unset)
    }
}

/// A set of named calibration parameter overrides (spec §3.1). All fields
/// default to `Unset`, i.e. "fall back to raw/config". Fields are private;
/// use [`Calibration::get`]/[`set_scalar`](Self::set_scalar)/
/// [`set_vector`](Self::set_vector) by field name, since the resolver in
/// `ek60-transform` walks the same closed field-name list.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub struct Calibration {
    frequency: CalParam,
    sound_speed: CalParam,
    absorption_coefficient: CalParam,
    sample_interval: CalParam,
    transmit_power: CalParam,
    pulse_length: CalParam,
    gain: CalParam,
    sa_correction: CalParam,
    equivalent_beam_angle: CalParam,
    angle_offset_alongship: CalParam,
    angle_offset_athwartship: CalParam,
    angle_sensitivity_alongship: CalParam,
    angle_sensitivity_athwartship: CalParam,
    transducer_depth: CalParam,
    tvg_range_correction: CalParam,
    absorption_depth: CalParam,
    acidity: CalParam,
    salinity: CalParam,
    temperature: CalParam,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scalar(&mut self, field: &str, value: f64) {
        if let Some(slot) = self.field_mut(field) {
            *slot = CalParam::Scalar(value);
        }
    }

    pub fn set_vector(&mut self, field: &str, values: Vec<f64>) {
        if let Some(slot) = self.field_mut(field) {
            *slot = CalParam::Vector(values);
        }
    }

    pub fn get(&self, field: &str) -> Option<&CalParam> {
        self.field_ref(field)
    }

    fn field_ref(&self, field: &str) -> Option<&CalParam> {
        Some(match field {
            "frequency" => &self.frequency,
            "sound_speed" => &self.sound_speed,
            "absorption_coefficient" => &self.absorption_coefficient,
            "sample_interval" => &self.sample_interval,
            "transmit_power" => &self.transmit_power,
            "pulse_length" => &self.pulse_length,
            "gain" => &self.gain,
            "sa_correction" => &self.sa_correction,
            "equivalent_beam_angle" => &self.equivalent_beam_angle,
            "angle_offset_alongship" => &self.angle_offset_alongship,
            "angle_offset_athwartship" => &self.angle_offset_athwartship,
            "angle_sensitivity_alongship" => &self.angle_sensitivity_alongship,
            "angle_sensitivity_athwartship" => &self.angle_sensitivity_athwartship,
            "transducer_depth" => &self.transducer_depth,
            "tvg_range_correction" => &self.tvg_range_correction,
            "absorption_depth" => &self.absorption_depth,
            "acidity" => &self.acidity,
            "salinity" => &self.salinity,
            "temperature" => &self.temperature,
            _ => return None,
        })
    }

    fn field_mut(&mut self, field: &str) -> Option<&mut CalParam> {
        Some(match field {
            "frequency" => &mut self.frequency,
            "sound_speed" => &mut self.sound_speed,
            "absorption_coefficient" => &mut self.absorption_coefficient,
            "sample_interval" => &mut self.sample_interval,
            "transmit_power" => &mut self.transmit_power,
            "pulse_length" => &mut self.pulse_length,
            "gain" => &mut self.gain,
            "sa_correction" => &mut self.sa_correction,
            "equivalent_beam_angle" => &mut self.equivalent_beam_angle,
            "angle_offset_alongship" => &mut self.angle_offset_alongship,
            "angle_offset_athwartship" => &mut self.angle_offset_athwartship,
            "angle_sensitivity_alongship" => &mut self.angle_sensitivity_alongship,
            "angle_sensitivity_athwartship" => &mut self.angle_sensitivity_athwartship,
            "transducer_depth" => &mut self.transducer_depth,
            "tvg_range_correction" => &mut self.tvg_range_correction,
            "absorption_depth" => &mut self.absorption_depth,
            "acidity" => &mut self.acidity,
            "salinity" => &mut self.salinity,
            "temperature" => &mut self.temperature,
            _ => return None,
        })
    }

    /// Seed scalar defaults straight from a channel's static config
    /// (donor: `fill_default_transceiver_calibration`), for callers who
    /// just want the recorded hardware values with no further overrides.
    pub fn from_transceiver_config(config: &TransceiverConfig) -> Self {
        let mut cal = Calibration::new();
        cal.set_scalar("frequency", config.frequency);
        cal.set_scalar("gain", config.gain);
        cal.set_scalar("equivalent_beam_angle", config.equivalent_beam_angle);
        cal.set_scalar("angle_offset_alongship", config.angle_offset_alongship);
        cal.set_scalar(
            "angle_offset_athwartship",
            config.angle_offset_athwartship,
        );
        cal.set_scalar(
            "angle_sensitivity_alongship",
            config.angle_sensitivity_alongship,
        );
        cal.set_scalar(
            "angle_sensitivity_athwartship",
            config.angle_sensitivity_athwartship,
        );
        cal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_by_default() {
        let cal = Calibration::new();
        assert!(cal.get("gain").unwrap().is_unset());
    }

    #[test]
    fn set_scalar_and_vector() {
        let mut cal = Calibration::new();
        cal.set_scalar("gain", 26.5);
        assert_eq!(cal.get("gain"), Some(&CalParam::Scalar(26.5)));
        cal.set_vector("sa_correction", vec![-0.7, -0.6]);
        assert_eq!(
            cal.get("sa_correction"),
            Some(&CalParam::Vector(vec![-0.7, -0.6]))
        );
    }
}
