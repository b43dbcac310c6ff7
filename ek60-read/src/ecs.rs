//! Minimal ECS calibration-file reader (spec §6.2): line-oriented text,
//! three top-level sections, and a `SourceCal T<n>` / `LocalCal T<n>`
//! subsection naming a 1-based transceiver index.
use ek60_core::calibration::Calibration;
use ek60_core::errors::EkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Fileset,
    SourceCal,
    LocalCal,
}

/// Calibration overrides parsed from one ECS file: file-wide defaults plus
/// per-transceiver source/local calibration, keyed by the file's 1-based
/// transceiver index.
#[derive(Debug, Clone, Default)]
pub struct EcsFile {
    pub fileset: Calibration,
    pub source_cal: Vec<(usize, Calibration)>,
    pub local_cal: Vec<(usize, Calibration)>,
}

impl EcsFile {
    pub fn source_cal_for(&self, transceiver_index: usize) -> Option<&Calibration> {
        self.source_cal
            .iter()
            .find(|(i, _)| *i == transceiver_index)
            .map(|(_, c)| c)
    }

    pub fn local_cal_for(&self, transceiver_index: usize) -> Option<&Calibration> {
        self.local_cal
            .iter()
            .find(|(i, _)| *i == transceiver_index)
            .map(|(_, c)| c)
    }
}

/// Map an ECS key as written in the file to an internal `Calibration`
/// field name, plus a unit scale factor applied before storing the value
/// (only `Frequency` needs one: the file gives kHz, the internal field is
/// Hz).
fn field_for_key(key: &str) -> Option<(&'static str, f64)> {
    Some(match key {
        "Frequency" => ("frequency", 1000.0),
        "SoundVelocity" => ("sound_speed", 1.0),
        "AbsorptionCoefficient" => ("absorption_coefficient", 1.0),
        "SampleInterval" => ("sample_interval", 1.0),
        "TransmitPower" => ("transmit_power", 1.0),
        "PulseLength" => ("pulse_length", 1.0),
        "Ek60TransducerGain" | "TransducerGain" => ("gain", 1.0),
        "SaCorrection" => ("sa_correction", 1.0),
        "EquivalentBeamAngle" => ("equivalent_beam_angle", 1.0),
        "AngleOffsetAlongship" => ("angle_offset_alongship", 1.0),
        "AngleOffsetAthwartship" => ("angle_offset_athwartship", 1.0),
        "AngleSensitivityAlongship" => ("angle_sensitivity_alongship", 1.0),
        "AngleSensitivityAthwartship" => ("angle_sensitivity_athwartship", 1.0),
        "TransducerDepth" => ("transducer_depth", 1.0),
        "TvgRangeCorrection" => ("tvg_range_correction", 1.0),
        "Depth" => ("absorption_depth", 1.0),
        "Acidity" => ("acidity", 1.0),
        "Salinity" => ("salinity", 1.0),
        "Temperature" => ("temperature", 1.0),
        _ => return None,
    })
}

/// Parse a full ECS file's text. Any `key = value` line whose key is not
/// in the fixed mapping table is an error (spec §6.2).
pub fn parse_ecs(text: &str) -> Result<EcsFile, EkError> {
    let mut file = EcsFile::default();
    let mut section = Section::None;
    let mut current_index: Option<usize> = None;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            section = match line {
                "# FILESET SETTINGS" => Section::Fileset,
                "# SOURCECAL SETTINGS" => Section::SourceCal,
                "# LOCALCAL SETTINGS" => Section::LocalCal,
                _ => section, // stray comment-like header, keep current section
            };
            current_index = None;
            continue;
        }

        if let Some(rest) = line.strip_prefix("SourceCal T") {
            current_index = rest.trim().parse().ok();
            continue;
        }
        if let Some(rest) = line.strip_prefix("LocalCal T") {
            current_index = rest.trim().parse().ok();
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        let key = key.trim();
        let value = value.trim();

        let (field, scale) = field_for_key(key).ok_or_else(|| EkError::UnknownCalibrationKey {
            key: key.to_string(),
        })?;
        let parsed: f64 = value.parse().map_err(|_| EkError::UnknownCalibrationKey {
            key: key.to_string(),
        })?;
        let scaled = parsed * scale;

        match section {
            Section::Fileset => file.fileset.set_scalar(field, scaled),
            Section::SourceCal => {
                let idx = current_index.unwrap_or(1);
                find_or_insert(&mut file.source_cal, idx).set_scalar(field, scaled);
            }
            Section::LocalCal => {
                let idx = current_index.unwrap_or(1);
                find_or_insert(&mut file.local_cal, idx).set_scalar(field, scaled);
            }
            Section::None => {} // key/value line outside any section: ignored
        }
    }

    Ok(file)
}

fn find_or_insert(list: &mut Vec<(usize, Calibration)>, idx: usize) -> &mut Calibration {
    if let Some(pos) = list.iter().position(|(i, _)| *i == idx) {
        &mut list[pos].1
    } else {
        list.push((idx, Calibration::new()));
        &mut list.last_mut().unwrap().1
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(0) => line, // a leading '#' is a section header, not a comment
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ek60_core::calibration::CalParam;

    const SAMPLE: &str = "\
# FILESET SETTINGS
AbsorptionCoefficient = 0.00981 # dB/m
# SOURCECAL SETTINGS
    SourceCal T1
    Frequency = 38.0
    Ek60TransducerGain = 26.5
    SourceCal T2
    Frequency = 120.0
";

    #[test]
    fn parses_fileset_and_per_transceiver_sections() {
        let file = parse_ecs(SAMPLE).unwrap();
        assert_eq!(
            file.fileset.get("absorption_coefficient"),
            Some(&CalParam::Scalar(0.00981))
        );
        let t1 = file.source_cal_for(1).unwrap();
        assert_eq!(t1.get("frequency"), Some(&CalParam::Scalar(38_000.0)));
        assert_eq!(t1.get("gain"), Some(&CalParam::Scalar(26.5)));
        let t2 = file.source_cal_for(2).unwrap();
        assert_eq!(t2.get("frequency"), Some(&CalParam::Scalar(120_000.0)));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let text = "# FILESET SETTINGS\nNotARealKey = 1\n";
        let err = parse_ecs(text).unwrap_err();
        assert!(matches!(err, EkError::UnknownCalibrationKey { .. }));
    }
}
