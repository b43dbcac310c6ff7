//! Electrical and physical angle decode (spec §4.8.7, §4.8.8).

/// One sample's decoded electrical angle, both axes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedAngle {
    pub alongship_elec: f64,
    pub athwartship_elec: f64,
}

/// Unpack a RAW0 indexed angle: low byte is alongship, high byte is
/// athwartship, both signed two's-complement 8-bit (spec §4.8.7).
pub fn decode_electrical_angle(indexed: u16) -> DecodedAngle {
    let low = (indexed & 0xFF) as u8 as i8;
    let high = ((indexed >> 8) & 0xFF) as u8 as i8;
    DecodedAngle {
        alongship_elec: low as f64 * 180.0 / 128.0,
        athwartship_elec: high as f64 * 180.0 / 128.0,
    }
}

pub fn electrical_angle_row(row: &[u16]) -> Vec<DecodedAngle> {
    row.iter().map(|&v| decode_electrical_angle(v)).collect()
}

/// `angle_phys = angle_elec / sensitivity - offset` (spec §4.8.8).
pub fn physical_angle(angle_elec: f64, sensitivity: f64, offset: f64) -> f64 {
    angle_elec / sensitivity - offset
}

/// Physical angle for a full row, split into (alongship, athwartship).
pub fn physical_angle_row(
    decoded: &[DecodedAngle],
    along_sensitivity: f64,
    along_offset: f64,
    athwart_sensitivity: f64,
    athwart_offset: f64,
) -> (Vec<f64>, Vec<f64>) {
    let along = decoded
        .iter()
        .map(|d| physical_angle(d.alongship_elec, along_sensitivity, along_offset))
        .collect();
    let athwart = decoded
        .iter()
        .map(|d| physical_angle(d.athwartship_elec, athwart_sensitivity, athwart_offset))
        .collect();
    (along, athwart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scenario_3() {
        let decoded = decode_electrical_angle(0x83FE);
        assert!((decoded.alongship_elec - (-2.8125)).abs() < 1e-9);
        assert!((decoded.athwartship_elec - (-175.78125)).abs() < 1e-9);
    }

    #[test]
    fn physical_angle_applies_sensitivity_and_offset() {
        let phys = physical_angle(21.9, 21.9, 0.0);
        assert!((phys - 1.0).abs() < 1e-9);
        let phys_with_offset = physical_angle(21.9, 21.9, 0.5);
        assert!((phys_with_offset - 0.5).abs() < 1e-9);
    }

    #[test]
    fn row_decode_matches_per_sample_decode() {
        let row = vec![0x83FEu16, 0x0000];
        let decoded = electrical_angle_row(&row);
        assert_eq!(decoded[0], decode_electrical_angle(0x83FE));
        assert_eq!(decoded[1], decode_electrical_angle(0x0000));

        let (along, athwart) = physical_angle_row(&decoded, 21.9, 0.0, 21.9, 0.0);
        assert!((along[0] - decoded[0].alongship_elec / 21.9).abs() < 1e-9);
        assert!((athwart[0] - decoded[0].athwartship_elec / 21.9).abs() < 1e-9);
    }
}
