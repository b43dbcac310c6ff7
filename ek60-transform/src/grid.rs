//! Resampling onto a common pulse length and vertical alignment across
//! pings of differing `sample_offset`/geometry (spec §4.8.9, §4.8.10).
use ek60_core::enums::AlignReference;

/// How to reconcile one ping's sample spacing with the grid's target
/// pulse length, once the ratio between the two is known to be a whole
/// number (spec §4.8.9 point 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resample {
    Identity,
    /// Average every `n` consecutive samples in linear domain.
    Reduce(usize),
    /// Repeat each sample `n` times.
    Expand(usize),
}

pub fn resample(values_db: &[f64], mode: Resample) -> Vec<f64> {
    match mode {
        Resample::Identity => values_db.to_vec(),
        Resample::Reduce(n) => values_db
            .chunks(n)
            .map(|chunk| {
                let mean_linear: f64 =
                    chunk.iter().map(|&v| 10f64.powf(v / 10.0)).sum::<f64>() / chunk.len() as f64;
                10.0 * mean_linear.log10()
            })
            .collect(),
        Resample::Expand(n) => values_db.iter().flat_map(|&v| std::iter::repeat(v).take(n)).collect(),
    }
}

/// Decide the resample mode from `source_pulse_length` to
/// `target_pulse_length`. `None` if their ratio isn't a whole number in
/// either direction within `tolerance`.
pub fn resample_mode(source_pulse_length: f64, target_pulse_length: f64, tolerance: f64) -> Option<Resample> {
    if (source_pulse_length - target_pulse_length).abs() <= tolerance {
        return Some(Resample::Identity);
    }
    if source_pulse_length > target_pulse_length {
        let ratio = source_pulse_length / target_pulse_length;
        let rounded = ratio.round();
        if (ratio - rounded).abs() < 1e-6 && rounded >= 1.0 {
            return Some(Resample::Expand(rounded as usize));
        }
    } else {
        let ratio = target_pulse_length / source_pulse_length;
        let rounded = ratio.round();
        if (ratio - rounded).abs() < 1e-6 && rounded >= 1.0 {
            return Some(Resample::Reduce(rounded as usize));
        }
    }
    None
}

/// Per-ping starting range (meters) for a chosen alignment reference
/// (spec §4.8.9 point 3). `explicit_start`, when given, overrides the
/// geometric computation entirely.
pub fn alignment_start(
    reference: AlignReference,
    sample_offset: u32,
    m: f64,
    transducer_depth: f64,
    bottom_depth: Option<f64>,
    explicit_start: Option<f64>,
) -> f64 {
    if let Some(v) = explicit_start {
        return v;
    }
    match reference {
        AlignReference::TransducerFace => sample_offset as f64 * m,
        AlignReference::Surface => sample_offset as f64 * m - transducer_depth,
        AlignReference::Bottom => sample_offset as f64 * m - bottom_depth.unwrap_or(0.0),
    }
}

/// A shared range axis plus one row per input ping, padded with `NaN`
/// wherever a ping doesn't reach that row (spec §4.8.9 point 4).
#[derive(Debug, Clone)]
pub struct AlignedGrid {
    pub range: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

/// Align already-resampled rows onto one range axis given each row's
/// starting range. An empty row (an empty ping, spec §4.8.10) produces
/// an all-`NaN` output row with no special-casing.
pub fn align(rows: &[Vec<f64>], starts: &[f64], m: f64) -> AlignedGrid {
    if rows.is_empty() {
        return AlignedGrid {
            range: Vec::new(),
            values: Vec::new(),
        };
    }

    let start_indices: Vec<i64> = starts.iter().map(|&s| (s / m).round() as i64).collect();
    let end_indices: Vec<i64> = rows
        .iter()
        .zip(start_indices.iter())
        .map(|(row, &start_idx)| start_idx + row.len() as i64)
        .collect();

    let min_start = *start_indices.iter().min().unwrap();
    let max_end = *end_indices.iter().max().unwrap();
    let n_out = (max_end - min_start).max(0) as usize;
    let range: Vec<f64> = (0..n_out).map(|i| (min_start + i as i64) as f64 * m).collect();

    let values = rows
        .iter()
        .zip(start_indices.iter())
        .map(|(row, &start_idx)| {
            let mut out = vec![f64::NAN; n_out];
            if !row.is_empty() {
                let offset = (start_idx - min_start) as usize;
                out[offset..offset + row.len()].copy_from_slice(row);
            }
            out
        })
        .collect();

    AlignedGrid { range, values }
}

/// One ping's row and the metadata `to_grid` needs to resample and
/// align it.
pub struct ToGridInput<'a> {
    pub values_db: &'a [f64],
    pub pulse_length: f64,
    pub sample_offset: u32,
    pub transducer_depth: f64,
    pub bottom_depth: Option<f64>,
    pub explicit_start: Option<f64>,
}

/// Resample every ping onto the shortest (finest-resolution) pulse
/// length present, then align vertically against `reference`
/// (spec §4.8.9).
pub fn to_grid(
    pings: &[ToGridInput],
    m: f64,
    reference: AlignReference,
    pulse_length_tolerance: f64,
) -> AlignedGrid {
    if pings.is_empty() {
        return AlignedGrid {
            range: Vec::new(),
            values: Vec::new(),
        };
    }

    let target_pulse_length = pings.iter().map(|p| p.pulse_length).fold(f64::INFINITY, f64::min);

    let resampled: Vec<Vec<f64>> = pings
        .iter()
        .map(|p| {
            let mode = resample_mode(p.pulse_length, target_pulse_length, pulse_length_tolerance)
                .unwrap_or(Resample::Identity);
            resample(p.values_db, mode)
        })
        .collect();

    let starts: Vec<f64> = pings
        .iter()
        .map(|p| {
            alignment_start(
                reference,
                p.sample_offset,
                m,
                p.transducer_depth,
                p.bottom_depth,
                p.explicit_start,
            )
        })
        .collect();

    align(&resampled, &starts, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_two_reduces_or_expands_an_eight_sample_ping() {
        let row: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let reduced = resample(&row, Resample::Reduce(2));
        assert_eq!(reduced.len(), 4);
        let expanded = resample(&row, Resample::Expand(2));
        assert_eq!(expanded.len(), 16);
    }

    #[test]
    fn resample_mode_picks_expand_for_coarser_source() {
        let mode = resample_mode(0.002048, 0.001024, 1e-9).unwrap();
        assert_eq!(mode, Resample::Expand(2));
    }

    #[test]
    fn resample_mode_picks_reduce_for_finer_source() {
        let mode = resample_mode(0.001024, 0.002048, 1e-9).unwrap();
        assert_eq!(mode, Resample::Reduce(2));
    }

    #[test]
    fn resample_mode_none_for_non_integer_ratio() {
        assert!(resample_mode(0.001024, 0.0015, 1e-9).is_none());
    }

    #[test]
    fn empty_ping_propagates_as_all_nan_row() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![]];
        let grid = align(&rows, &[0.0, 0.0], 1.0);
        assert_eq!(grid.range.len(), 3);
        assert!(grid.values[1].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn surface_reference_shifts_start_by_transducer_depth() {
        let start = alignment_start(AlignReference::Surface, 0, 0.192, 9.15, None, None);
        assert!((start - (-9.15)).abs() < 1e-9);
    }

    #[test]
    fn explicit_start_overrides_reference() {
        let start = alignment_start(AlignReference::TransducerFace, 10, 0.192, 9.15, None, Some(42.0));
        assert_eq!(start, 42.0);
    }

    #[test]
    fn to_grid_aligns_two_pings_of_differing_offset() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![2.0, 2.0];
        let pings = vec![
            ToGridInput {
                values_db: &a,
                pulse_length: 0.001024,
                sample_offset: 0,
                transducer_depth: 9.15,
                bottom_depth: None,
                explicit_start: None,
            },
            ToGridInput {
                values_db: &b,
                pulse_length: 0.001024,
                sample_offset: 1,
                transducer_depth: 9.15,
                bottom_depth: None,
                explicit_start: None,
            },
        ];
        let grid = to_grid(&pings, 0.192, AlignReference::TransducerFace, 1e-9);
        assert_eq!(grid.range.len(), 4);
        assert!(grid.values[1][3].is_nan());
    }
}
