//! Power conversion, range vector, and the Sv/sv, Sp/sp sonar equations
//! (spec §4.8.3–§4.8.6).

/// `P_dB = indexed * 10*log10(2)/256` (spec §4.8.4).
pub fn power_to_db(indexed: i16) -> f64 {
    indexed as f64 * 10.0 * 2f64.log10() / 256.0
}

pub fn power_row_to_db(row: &[i16]) -> Vec<f64> {
    row.iter().map(|&v| power_to_db(v)).collect()
}

/// Meters per sample: `m = c*dt/2` (spec §4.8.3).
pub fn meters_per_sample(sound_speed: f64, sample_interval: f64) -> f64 {
    sound_speed * sample_interval / 2.0
}

/// Range (meters) of each sample index `k` in `0..n_samples`, honoring
/// the ping's `sample_offset` (spec §4.8.3): `r_k = (k + sample_offset)*m`.
pub fn range_vector(n_samples: usize, sample_offset: u32, m: f64) -> Vec<f64> {
    (0..n_samples).map(|k| (k as f64 + sample_offset as f64) * m).collect()
}

/// Per-ping scalar inputs to the Sv/Sp sonar equation, already resolved
/// by [`crate::resolve::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct SonarEquationParams {
    pub sound_speed: f64,
    pub absorption_coefficient: f64,
    pub transmit_power: f64,
    pub frequency: f64,
    pub pulse_length: f64,
    pub gain: f64,
    pub sa_correction: f64,
    /// dB re 1 steradian, as recorded; converted to steradians internally.
    pub equivalent_beam_angle_db: f64,
    /// In units of samples, matching `tvg_range_correction · m` in the
    /// range-correction term (spec default: 2 for Sv, 0 for Sp).
    pub tvg_range_correction: f64,
}

impl SonarEquationParams {
    fn wavelength(&self) -> f64 {
        self.sound_speed / self.frequency
    }

    fn equivalent_beam_angle_sr(&self) -> f64 {
        10f64.powf(self.equivalent_beam_angle_db / 10.0)
    }

    fn constant_term(&self) -> f64 {
        let lambda = self.wavelength();
        let psi = self.equivalent_beam_angle_sr();
        10.0 * (self.transmit_power * lambda * lambda * self.sound_speed * self.pulse_length * psi
            / (32.0 * std::f64::consts::PI * std::f64::consts::PI))
            .log10()
    }
}

fn effective_range(r: f64, tvg_range_correction: f64, m: f64) -> f64 {
    (r - tvg_range_correction * m).max(0.0)
}

/// Sv (dB re 1 m⁻¹) for one ping's samples (spec §4.8.5). `power_db` and
/// `range` must be the same length.
pub fn sv_row(power_db: &[f64], range: &[f64], m: f64, params: &SonarEquationParams) -> Vec<f64> {
    let const_term = params.constant_term() + 2.0 * params.gain + 2.0 * params.sa_correction;
    power_db
        .iter()
        .zip(range.iter())
        .map(|(&p, &r)| {
            let r_eff = effective_range(r, params.tvg_range_correction, m);
            if r_eff <= 0.0 {
                return f64::NAN;
            }
            p + 20.0 * r_eff.log10() + 2.0 * params.absorption_coefficient * r - const_term
        })
        .collect()
}

/// Sp (dB) for one ping's samples (spec §4.8.6): as [`sv_row`], but with
/// `40*log10(R_eff)` and no Sa term.
pub fn sp_row(power_db: &[f64], range: &[f64], m: f64, params: &SonarEquationParams) -> Vec<f64> {
    let const_term = params.constant_term() + 2.0 * params.gain;
    power_db
        .iter()
        .zip(range.iter())
        .map(|(&p, &r)| {
            let r_eff = effective_range(r, params.tvg_range_correction, m);
            if r_eff <= 0.0 {
                return f64::NAN;
            }
            p + 40.0 * r_eff.log10() + 2.0 * params.absorption_coefficient * r - const_term
        })
        .collect()
}

/// Antilog of a dB quantity with a /10 exponent, i.e. `sv` from `Sv` or
/// `sp` from `Sp` (spec §4.8.5, §8.1).
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_2_params() -> SonarEquationParams {
        SonarEquationParams {
            sound_speed: 1500.0,
            absorption_coefficient: 0.00986,
            transmit_power: 2000.0,
            frequency: 38_000.0,
            pulse_length: 1.024e-3,
            gain: 26.5,
            sa_correction: -0.70,
            equivalent_beam_angle_db: -20.7,
            tvg_range_correction: 2.0,
        }
    }

    #[test]
    fn power_to_db_matches_scenario_2() {
        assert!((power_to_db(2560) - 30.103).abs() < 1e-3);
    }

    #[test]
    fn range_vector_matches_scenario_2() {
        // The scenario's range value (≈19.392 m for the 101st sample) is
        // reproduced with sample_offset = 1, i.e. a one-sample transmit
        // blank ahead of the recorded samples.
        let m = meters_per_sample(1500.0, 2.56e-4);
        assert!((m - 0.192).abs() < 1e-9);
        let range = range_vector(101, 1, m);
        assert!((range[100] - 19.392).abs() < 1e-3);
    }

    #[test]
    fn sv_is_finite_and_round_trips_through_linear() {
        let m = meters_per_sample(1500.0, 2.56e-4);
        let range = range_vector(101, 1, m);
        let power_db = vec![power_to_db(2560); 101];
        let params = scenario_2_params();
        let sv = sv_row(&power_db, &range, m, &params);
        let sv_100 = sv[100];
        assert!(sv_100.is_finite());
        let linear = db_to_linear(sv_100);
        assert!((sv_100 - 10.0 * linear.log10()).abs() < 1e-9);
    }

    #[test]
    fn zero_effective_range_is_nan() {
        let params = scenario_2_params();
        let sv = sv_row(&[1.0], &[0.0], 0.192, &params);
        assert!(sv[0].is_nan());
    }

    #[test]
    fn sp_uses_40log_and_drops_sa_term() {
        let m = meters_per_sample(1500.0, 2.56e-4);
        let range = range_vector(10, 0, m);
        let power_db = vec![10.0; 10];
        let mut params = scenario_2_params();
        params.tvg_range_correction = 0.0;
        let sp = sp_row(&power_db, &range, m, &params);
        assert!(sp.iter().all(|v| v.is_finite() || v.is_nan()));
    }
}
