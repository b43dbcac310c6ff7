//! Linear interpolation of ancillary (motion, position) series onto ping
//! times, plus the supporting GPS time-of-day and outlier-rejection
//! helpers (spec §4.7).
use ek60_core::time::Instant;
use std::collections::HashSet;

/// Mean earth radius used throughout this module (spec §4.7), in km.
const EARTH_RADIUS_KM: f64 = 6356.78;
const KM_PER_NM: f64 = 1.852;

/// Linearly interpolate `values` sampled at `times` onto `targets`.
/// Targets outside `[times[0], times.last()]` get `NaN`. Duplicate
/// source timestamps keep only their first occurrence.
pub fn interpolate_linear(times: &[Instant], values: &[f64], targets: &[Instant]) -> Vec<f64> {
    let (times, values) = dedup_by_timestamp(times, values);
    targets.iter().map(|&t| interpolate_one(&times, &values, t)).collect()
}

/// As [`interpolate_linear`], but after interpolation, fill any
/// remaining out-of-range `NaN` with the nearest endpoint value
/// (spec §4.7, nearest-extrapolation backfill).
pub fn interpolate_linear_with_backfill(times: &[Instant], values: &[f64], targets: &[Instant]) -> Vec<f64> {
    let (times, values) = dedup_by_timestamp(times, values);
    if times.is_empty() {
        return vec![f64::NAN; targets.len()];
    }
    targets
        .iter()
        .map(|&t| {
            if t < times[0] {
                values[0]
            } else if t > *times.last().unwrap() {
                *values.last().unwrap()
            } else {
                interpolate_one(&times, &values, t)
            }
        })
        .collect()
}

fn dedup_by_timestamp(times: &[Instant], values: &[f64]) -> (Vec<Instant>, Vec<f64>) {
    let mut seen = HashSet::new();
    let mut out_times = Vec::with_capacity(times.len());
    let mut out_values = Vec::with_capacity(values.len());
    for (&t, &v) in times.iter().zip(values.iter()) {
        if seen.insert(t.millis_since_epoch()) {
            out_times.push(t);
            out_values.push(v);
        }
    }
    (out_times, out_values)
}

fn interpolate_one(times: &[Instant], values: &[f64], t: Instant) -> f64 {
    if times.is_empty() {
        return f64::NAN;
    }
    if t < times[0] || t > *times.last().unwrap() {
        return f64::NAN;
    }
    match times.binary_search(&t) {
        Ok(i) => values[i],
        Err(i) => {
            let (t0, t1) = (times[i - 1], times[i]);
            let (v0, v1) = (values[i - 1], values[i]);
            let frac = t0.seconds_until(t) / t0.seconds_until(t1);
            v0 + frac * (v1 - v0)
        }
    }
}

/// Reconstruct a full `Instant` from a GPS time-of-day field (hour,
/// minute, second, no date), pairing it with the calendar day implied
/// by `reference` and correcting for a UTC-midnight crossing between
/// the two (spec §4.7).
pub fn reconstruct_midnight_crossing(hour: u32, minute: u32, second: f64, reference: Instant) -> Instant {
    let ms_of_day = (hour as i64 * 3600 + minute as i64 * 60) * 1000 + (second * 1000.0).round() as i64;
    let ref_day_start = reference.millis_since_epoch().div_euclid(86_400_000) * 86_400_000;
    let candidate = Instant::from_millis(ref_day_start + ms_of_day);

    let file_hour = reference.utc_hour();
    if file_hour == 23 && hour < 12 {
        candidate.checked_add_days(1)
    } else if file_hour < 12 && hour == 23 {
        candidate.checked_add_days(-1)
    } else {
        candidate
    }
}

fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = std::f64::consts::PI / 180.0;
    let phi1 = lat1 * to_rad;
    let phi2 = lat2 * to_rad;
    let dphi = (lat2 - lat1) * to_rad;
    let dlambda = (lon2 - lon1) * to_rad;
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    (EARTH_RADIUS_KM * c) / KM_PER_NM
}

/// Cumulative great-circle distance traveled, nautical miles, through a
/// sequence of position fixes (spec §4.5, distance-from-position
/// fallback when no VLW sentence is present). Same length as `lat`/`lon`,
/// starting at `0.0`.
pub fn cumulative_distance_nm(lat: &[f64], lon: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(lat.len());
    let mut total = 0.0;
    for i in 0..lat.len() {
        if i > 0 {
            total += haversine_nm(lat[i - 1], lon[i - 1], lat[i], lon[i]);
        }
        out.push(total);
    }
    out
}

/// Drop position samples whose jump from their predecessor exceeds
/// `threshold_nm`, both endpoints of the jump, iterating until no jump
/// remains or `max_iterations` rounds have run (spec §4.7, default cap
/// 40).
pub fn reject_position_outliers(
    times: &mut Vec<Instant>,
    lat: &mut Vec<f64>,
    lon: &mut Vec<f64>,
    threshold_nm: f64,
    max_iterations: usize,
) {
    for _ in 0..max_iterations {
        let mut drop = HashSet::new();
        for i in 1..lat.len() {
            if haversine_nm(lat[i - 1], lon[i - 1], lat[i], lon[i]) > threshold_nm {
                drop.insert(i - 1);
                drop.insert(i);
            }
        }
        if drop.is_empty() {
            break;
        }
        let keep: Vec<usize> = (0..lat.len()).filter(|i| !drop.contains(i)).collect();
        *times = keep.iter().map(|&i| times[i]).collect();
        *lat = keep.iter().map(|&i| lat[i]).collect();
        *lon = keep.iter().map(|&i| lon[i]).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_out_of_range_targets_are_nan() {
        let times = vec![Instant::from_millis(10_000), Instant::from_millis(20_000)];
        let values = vec![1.0, 3.0];
        let targets = vec![
            Instant::from_millis(5_000),
            Instant::from_millis(15_000),
            Instant::from_millis(25_000),
        ];
        let out = interpolate_linear(&times, &values, &targets);
        assert!(out[0].is_nan());
        assert!((out[1] - 2.0).abs() < 1e-9);
        assert!(out[2].is_nan());
    }

    #[test]
    fn duplicate_timestamps_keep_first_occurrence() {
        let times = vec![
            Instant::from_millis(0),
            Instant::from_millis(0),
            Instant::from_millis(10_000),
        ];
        let values = vec![1.0, 99.0, 3.0];
        let targets = vec![Instant::from_millis(0)];
        let out = interpolate_linear(&times, &values, &targets);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn backfill_clamps_to_nearest_endpoint() {
        let times = vec![Instant::from_millis(10_000), Instant::from_millis(20_000)];
        let values = vec![1.0, 3.0];
        let targets = vec![Instant::from_millis(0), Instant::from_millis(30_000)];
        let out = interpolate_linear_with_backfill(&times, &values, &targets);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 3.0);
    }

    #[test]
    fn midnight_crossing_rolls_forward_a_day() {
        let reference = Instant::from_millis(23 * 3_600_000); // 23:00 same day
        let reconstructed = reconstruct_midnight_crossing(0, 5, 0.0, reference);
        assert_eq!(reconstructed.utc_hour(), 0);
        assert!(reconstructed.millis_since_epoch() > reference.millis_since_epoch());
    }

    #[test]
    fn midnight_crossing_rolls_back_a_day() {
        let reference = Instant::from_millis(0); // 00:00
        let reconstructed = reconstruct_midnight_crossing(23, 55, 0.0, reference);
        assert_eq!(reconstructed.utc_hour(), 23);
        assert!(reconstructed.millis_since_epoch() < reference.millis_since_epoch());
    }

    #[test]
    fn cumulative_distance_accumulates_and_starts_at_zero() {
        let lat = vec![60.0, 60.01, 60.02];
        let lon = vec![5.0, 5.0, 5.0];
        let out = cumulative_distance_nm(&lat, &lon);
        assert_eq!(out[0], 0.0);
        assert!(out[1] > 0.0);
        assert!(out[2] > out[1]);
    }

    #[test]
    fn outlier_rejection_drops_a_single_spurious_spike() {
        let mut times = vec![
            Instant::from_millis(0),
            Instant::from_millis(1000),
            Instant::from_millis(2000),
            Instant::from_millis(3000),
        ];
        let mut lat = vec![60.0, 60.001, 70.0, 60.0];
        let mut lon = vec![5.0, 5.001, 5.0, 5.0];
        reject_position_outliers(&mut times, &mut lat, &mut lon, 5.0, 40);
        assert_eq!(lat.len(), 1);
        assert_eq!(lat[0], 60.0);
        assert_eq!(times.len(), 1);
    }
}
