//! Calibration parameter resolution (spec §4.8.1): for a named field,
//! walk calibration overrides, then raw per-ping data, then static
//! config, in a fixed order.
use ek60_core::calibration::{CalParam, Calibration};
use ek60_core::config::TransceiverConfig;
use ek60_core::errors::EkError;
use ek60_core::store::RawChannelData;

/// Resolve `field` to one value per entry of `indices` (a view into the
/// channel's pings), in precedence order:
///
/// 1. calibration has the field set and scalar -> broadcast.
/// 2. calibration has the field set as a vector of length `n_pings` -> use
///    positionally by ping index.
/// 3. calibration has the field set as a vector of length
///    `indices.len()` -> use positionally within the selection.
/// 4. calibration unset -> derive from `raw`'s per-ping field of the same
///    name, if one exists.
/// 5. otherwise -> fall back to `config`'s static field, if one exists
///    (gain/sa_correction are pulse-length-table lookups per ping rather
///    than a flat scalar).
/// 6. otherwise -> `MissingCalibrationParameter`.
pub fn resolve(
    calibration: &Calibration,
    raw: &RawChannelData,
    config: Option<&TransceiverConfig>,
    field: &str,
    indices: &[usize],
) -> Result<Vec<f64>, EkError> {
    let n_pings = raw.n_pings();
    let selection_len = indices.len();

    if let Some(param) = calibration.get(field) {
        match param {
            CalParam::Scalar(v) => return Ok(vec![*v; selection_len]),
            CalParam::Vector(values) => {
                if values.len() == n_pings {
                    return Ok(indices.iter().map(|&i| values[i]).collect());
                }
                if values.len() == selection_len {
                    return Ok(values.clone());
                }
                return Err(EkError::InvalidCalibrationLength {
                    expected: n_pings,
                    got: values.len(),
                });
            }
            CalParam::Unset => {}
        }
    }

    if let Some(values) = raw_channel_field(raw, field, indices) {
        return Ok(values);
    }

    if let Some(cfg) = config {
        if let Some(values) = config_static_field(cfg, raw, field, indices) {
            return Ok(values);
        }
    }

    Err(EkError::MissingCalibrationParameter {
        field: field.to_string(),
    })
}

fn raw_channel_field(raw: &RawChannelData, field: &str, indices: &[usize]) -> Option<Vec<f64>> {
    let pick = |values: &[f64]| indices.iter().map(|&i| values[i]).collect();
    match field {
        "transmit_power" => Some(pick(raw.transmit_power())),
        "pulse_length" => Some(pick(raw.pulse_length())),
        "sample_interval" => Some(pick(raw.sample_interval())),
        "sound_speed" => Some(pick(raw.sound_velocity())),
        "absorption_coefficient" => Some(pick(raw.absorption_coefficient())),
        "transducer_depth" => Some(pick(raw.transducer_depth())),
        "temperature" => Some(pick(raw.temperature())),
        _ => None,
    }
}

fn config_static_field(
    config: &TransceiverConfig,
    raw: &RawChannelData,
    field: &str,
    indices: &[usize],
) -> Option<Vec<f64>> {
    match field {
        "frequency" => Some(vec![config.frequency; indices.len()]),
        "equivalent_beam_angle" => Some(vec![config.equivalent_beam_angle; indices.len()]),
        "angle_offset_alongship" => Some(vec![config.angle_offset_alongship; indices.len()]),
        "angle_offset_athwartship" => Some(vec![config.angle_offset_athwartship; indices.len()]),
        "angle_sensitivity_alongship" => Some(vec![config.angle_sensitivity_alongship; indices.len()]),
        "angle_sensitivity_athwartship" => Some(vec![config.angle_sensitivity_athwartship; indices.len()]),
        "gain" => Some(vec![config.gain; indices.len()]),
        "sa_correction" => Some(
            indices
                .iter()
                .map(|&i| {
                    let pulse_length = raw.pulse_length()[i];
                    let table_index = config.pulse_length_index(pulse_length).unwrap_or_else(|| {
                        log::warn!(
                            "pulse length {} has no cal table match within tolerance for channel '{}', using nearest entry",
                            pulse_length,
                            config.channel_id
                        );
                        config.nearest_pulse_length_index(pulse_length)
                    });
                    config.sa_correction_table[table_index]
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ek60_core::enums::BeamType;
    use ek60_core::store::PingMeta;
    use ek60_core::time::Instant;
    use ek60_core::enums::TransmitMode;

    fn meta(pulse_length: f64) -> PingMeta {
        PingMeta {
            ping_time: Instant::from_millis(0),
            transmit_power: 2000.0,
            pulse_length,
            bandwidth: 2425.0,
            sample_interval: 2.56e-4,
            sound_velocity: 1500.0,
            absorption_coefficient: 0.00986,
            transducer_depth: 9.15,
            heave: 0.0,
            pitch: 0.0,
            roll: 0.0,
            heading: 0.0,
            temperature: 8.0,
            transmit_mode: TransmitMode::Active,
            sample_offset: 0,
        }
    }

    fn config() -> TransceiverConfig {
        TransceiverConfig {
            channel_id: "GPT 38".to_string(),
            beam_type: BeamType::SplitBeam,
            frequency: 38000.0,
            equivalent_beam_angle: -20.7,
            gain: 26.5,
            beamwidth_alongship: 7.0,
            beamwidth_athwartship: 7.0,
            angle_sensitivity_alongship: 21.9,
            angle_sensitivity_athwartship: 21.9,
            angle_offset_alongship: 0.0,
            angle_offset_athwartship: 0.0,
            position: [0.0, 0.0, 0.0],
            direction: [0.0, 0.0, 1.0],
            pulse_length_table: [0.000256, 0.000512, 0.001024, 0.002048, 0.004096],
            gain_table: [25.0, 25.5, 26.5, 26.0, 25.0],
            sa_correction_table: [0.0, -0.1, -0.7, -0.2, 0.0],
        }
    }

    #[test]
    fn scalar_override_broadcasts() {
        let mut cal = Calibration::new();
        cal.set_scalar("gain", 27.0);
        let mut raw = RawChannelData::new("GPT 38");
        raw.append_ping(meta(0.001024), &[1, 2], None).unwrap();
        raw.append_ping(meta(0.001024), &[3, 4], None).unwrap();
        let out = resolve(&cal, &raw, None, "gain", &[0, 1]).unwrap();
        assert_eq!(out, vec![27.0, 27.0]);
    }

    #[test]
    fn unset_falls_back_to_raw_then_config() {
        let cal = Calibration::new();
        let mut raw = RawChannelData::new("GPT 38");
        raw.append_ping(meta(0.001024), &[1, 2], None).unwrap();
        let cfg = config();

        let pulse_length = resolve(&cal, &raw, Some(&cfg), "pulse_length", &[0]).unwrap();
        assert_eq!(pulse_length, vec![0.001024]);

        let gain = resolve(&cal, &raw, Some(&cfg), "gain", &[0]).unwrap();
        assert_eq!(gain, vec![26.5]);
    }

    #[test]
    fn sa_correction_falls_back_to_pulse_length_table() {
        let cal = Calibration::new();
        let mut raw = RawChannelData::new("GPT 38");
        raw.append_ping(meta(0.001024), &[1, 2], None).unwrap();
        let cfg = config();
        let sa = resolve(&cal, &raw, Some(&cfg), "sa_correction", &[0]).unwrap();
        assert_eq!(sa, vec![-0.7]);
    }

    #[test]
    fn missing_everywhere_errors() {
        let cal = Calibration::new();
        let mut raw = RawChannelData::new("GPT 38");
        raw.append_ping(meta(0.001024), &[1, 2], None).unwrap();
        let err = resolve(&cal, &raw, None, "salinity", &[0]).unwrap_err();
        assert!(matches!(err, EkError::MissingCalibrationParameter { .. }));
    }

    #[test]
    fn mismatched_vector_length_errors() {
        let mut cal = Calibration::new();
        cal.set_vector("gain", vec![1.0, 2.0, 3.0]);
        let mut raw = RawChannelData::new("GPT 38");
        raw.append_ping(meta(0.001024), &[1], None).unwrap();
        let err = resolve(&cal, &raw, None, "gain", &[0]).unwrap_err();
        assert!(matches!(err, EkError::InvalidCalibrationLength { .. }));
    }
}
