//! Field extraction from the handful of NMEA sentence types the facade's
//! `interpolate` understands (spec §4.5, §6.3). Sentences are validated
//! and split by [`ek60_core::ancillary::checksum_and_fields`]; this module
//! only knows where the fields of interest sit per sentence type.
use ek60_core::enums::MetaNmeaType;

/// What [`crate::EkData::interpolate`] should resolve onto a grid's ping
/// times: either a logical category (tried via its NMEA preference order,
/// or `MotionLog` for `Attitude`) or one concrete sentence type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRequest {
    Meta(MetaNmeaType),
    Concrete(String),
}

/// `ddmm.mmmm` (lat) or `dddmm.mmmm` (lon) plus a hemisphere letter, to
/// signed decimal degrees.
fn dm_to_decimal(raw: &str, hemisphere: &str, is_longitude: bool) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let deg_digits = if is_longitude { 3 } else { 2 };
    if raw.len() <= deg_digits {
        return None;
    }
    let degrees: f64 = raw[..deg_digits].parse().ok()?;
    let minutes: f64 = raw[deg_digits..].parse().ok()?;
    let mut value = degrees + minutes / 60.0;
    if hemisphere == "S" || hemisphere == "W" {
        value = -value;
    }
    Some(value)
}

/// Decoded (latitude, longitude) in decimal degrees, from a GGA, GLL, or
/// RMC sentence's already-split fields (index 0 is the talker+type
/// header).
pub fn extract_position(sentence_type: &str, fields: &[&str]) -> Option<(f64, f64)> {
    match sentence_type {
        "GGA" => {
            let lat = dm_to_decimal(fields.get(2)?, fields.get(3)?, false)?;
            let lon = dm_to_decimal(fields.get(4)?, fields.get(5)?, true)?;
            Some((lat, lon))
        }
        "GLL" => {
            let lat = dm_to_decimal(fields.get(1)?, fields.get(2)?, false)?;
            let lon = dm_to_decimal(fields.get(3)?, fields.get(4)?, true)?;
            Some((lat, lon))
        }
        "RMC" => {
            let lat = dm_to_decimal(fields.get(3)?, fields.get(4)?, false)?;
            let lon = dm_to_decimal(fields.get(5)?, fields.get(6)?, true)?;
            Some((lat, lon))
        }
        _ => None,
    }
}

/// Speed over ground, knots, from a VTG/VHW/RMC sentence's fields.
pub fn extract_speed_knots(sentence_type: &str, fields: &[&str]) -> Option<f64> {
    match sentence_type {
        "VTG" => fields.get(5)?.parse().ok(),
        "VHW" => fields.get(5)?.parse().ok(),
        "RMC" => fields.get(7)?.parse().ok(),
        _ => None,
    }
}

/// Cumulative distance traveled, nautical miles, from a VLW sentence.
pub fn extract_distance_nm(sentence_type: &str, fields: &[&str]) -> Option<f64> {
    match sentence_type {
        "VLW" => fields.get(1)?.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gga_decodes_known_fixture() {
        let fields: Vec<&str> = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"
            .split(',')
            .collect();
        let (lat, lon) = extract_position("GGA", &fields).unwrap();
        assert!((lat - 48.1173).abs() < 1e-3);
        assert!((lon - 11.5167).abs() < 1e-3);
    }

    #[test]
    fn southern_western_hemisphere_negates() {
        let fields: Vec<&str> = "$GPGLL,3740.123,S,12200.456,W,123519,A".split(',').collect();
        let (lat, lon) = extract_position("GLL", &fields).unwrap();
        assert!(lat < 0.0);
        assert!(lon < 0.0);
    }

    #[test]
    fn vtg_extracts_speed() {
        let fields: Vec<&str> = "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K".split(',').collect();
        let speed = extract_speed_knots("VTG", &fields).unwrap();
        assert_eq!(speed, 5.5);
    }

    #[test]
    fn unsupported_type_returns_none() {
        assert!(extract_position("ZZZ", &["$GPZZZ"]).is_none());
    }
}
