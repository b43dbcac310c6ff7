//! Per-channel dense ping storage (spec §4.4).
use crate::enums::TransmitMode;
use crate::errors::EkError;
use crate::time::Instant;

/// Sentinel written into padding cells of `indexed_power` beyond a ping's
/// `sample_count`, or for an entirely empty ping row.
pub const POWER_MISSING: i16 = i16::MIN;
/// Sentinel written into padding cells of `indexed_angle`.
pub const ANGLE_MISSING: u16 = u16::MAX;

/// Default number of pings a growth chunk reserves ahead of actual use.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Everything recorded about a ping except its sample rows, which are
/// passed separately to [`RawChannelData::append_ping`].
#[derive(Debug, Clone, PartialEq)]
pub struct PingMeta {
    pub ping_time: Instant,
    pub transmit_power: f64,
    pub pulse_length: f64,
    pub bandwidth: f64,
    pub sample_interval: f64,
    pub sound_velocity: f64,
    pub absorption_coefficient: f64,
    pub transducer_depth: f64,
    pub heave: f64,
    pub pitch: f64,
    pub roll: f64,
    pub heading: f64,
    pub temperature: f64,
    pub transmit_mode: TransmitMode,
    pub sample_offset: u32,
}

/// Dense, per-channel store of all pings recorded for one `channel_id`, in
/// load order (spec §3.1 `RawChannelData`).
#[derive(Debug, Clone)]
pub struct RawChannelData {
    channel_id: String,
    chunk_size: usize,
    /// `Some(n)` puts the store in fixed-capacity rolling mode: once
    /// `n_pings` reaches `n`, appending a new ping drops ping 0 and shifts
    /// everything left by one (spec §4.4, "rolling" growth for live feeds).
    rolling_capacity: Option<usize>,
    n_pings: usize,
    n_cols: usize,
    has_angle: bool,

    ping_time: Vec<Instant>,
    transmit_power: Vec<f64>,
    pulse_length: Vec<f64>,
    bandwidth: Vec<f64>,
    sample_interval: Vec<f64>,
    sound_velocity: Vec<f64>,
    absorption_coefficient: Vec<f64>,
    transducer_depth: Vec<f64>,
    heave: Vec<f64>,
    pitch: Vec<f64>,
    roll: Vec<f64>,
    heading: Vec<f64>,
    temperature: Vec<f64>,
    transmit_mode: Vec<TransmitMode>,
    sample_offset: Vec<u32>,
    sample_count: Vec<u32>,

    /// Row-major (n_pings, n_cols).
    indexed_power: Vec<i16>,
    /// Row-major (n_pings, n_cols); empty until the first angle-bearing
    /// ping is appended.
    indexed_angle: Vec<u16>,
}

impl RawChannelData {
    pub fn new(channel_id: impl Into<String>) -> Self {
        RawChannelData {
            channel_id: channel_id.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            rolling_capacity: None,
            n_pings: 0,
            n_cols: 0,
            has_angle: false,
            ping_time: Vec::new(),
            transmit_power: Vec::new(),
            pulse_length: Vec::new(),
            bandwidth: Vec::new(),
            sample_interval: Vec::new(),
            sound_velocity: Vec::new(),
            absorption_coefficient: Vec::new(),
            transducer_depth: Vec::new(),
            heave: Vec::new(),
            pitch: Vec::new(),
            roll: Vec::new(),
            heading: Vec::new(),
            temperature: Vec::new(),
            transmit_mode: Vec::new(),
            sample_offset: Vec::new(),
            sample_count: Vec::new(),
            indexed_power: Vec::new(),
            indexed_angle: Vec::new(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Puts the store into rolling (ring-buffer) mode with a fixed ping
    /// capacity, for live-feed-style bounded growth.
    pub fn with_rolling_capacity(mut self, capacity: usize) -> Self {
        self.rolling_capacity = Some(capacity.max(1));
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn n_pings(&self) -> usize {
        self.n_pings
    }

    pub fn n_samples(&self) -> usize {
        self.n_cols
    }

    pub fn has_angle(&self) -> bool {
        self.has_angle
    }

    pub fn ping_time(&self) -> &[Instant] {
        &self.ping_time
    }

    pub fn transmit_power(&self) -> &[f64] {
        &self.transmit_power
    }

    pub fn pulse_length(&self) -> &[f64] {
        &self.pulse_length
    }

    pub fn bandwidth(&self) -> &[f64] {
        &self.bandwidth
    }

    pub fn sample_interval(&self) -> &[f64] {
        &self.sample_interval
    }

    pub fn sound_velocity(&self) -> &[f64] {
        &self.sound_velocity
    }

    pub fn absorption_coefficient(&self) -> &[f64] {
        &self.absorption_coefficient
    }

    pub fn transducer_depth(&self) -> &[f64] {
        &self.transducer_depth
    }

    pub fn heave(&self) -> &[f64] {
        &self.heave
    }

    pub fn pitch(&self) -> &[f64] {
        &self.pitch
    }

    pub fn roll(&self) -> &[f64] {
        &self.roll
    }

    pub fn heading(&self) -> &[f64] {
        &self.heading
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn transmit_mode(&self) -> &[TransmitMode] {
        &self.transmit_mode
    }

    pub fn sample_offset(&self) -> &[u32] {
        &self.sample_offset
    }

    pub fn sample_count(&self) -> &[u32] {
        &self.sample_count
    }

    /// Row `i` of `indexed_power`, length `n_samples()`, padded with
    /// [`POWER_MISSING`] past `sample_count[i]`.
    pub fn power_row(&self, i: usize) -> &[i16] {
        &self.indexed_power[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Row `i` of `indexed_angle`, or `None` if this channel has never
    /// carried angle data.
    pub fn angle_row(&self, i: usize) -> Option<&[u16]> {
        if self.has_angle {
            Some(&self.indexed_angle[i * self.n_cols..(i + 1) * self.n_cols])
        } else {
            None
        }
    }

    /// Overwrite the valid (non-padding) portion of a power row in place,
    /// for external callers (e.g. a gain-correction fitter) that
    /// recompute a row and write it back.
    pub fn set_power_row(&mut self, i: usize, values: &[i16]) {
        let count = self.sample_count[i] as usize;
        let len = values.len().min(count);
        let start = i * self.n_cols;
        self.indexed_power[start..start + len].copy_from_slice(&values[..len]);
    }

    pub fn set_angle_row(&mut self, i: usize, values: &[u16]) {
        if !self.has_angle {
            return;
        }
        let count = self.sample_count[i] as usize;
        let len = values.len().min(count);
        let start = i * self.n_cols;
        self.indexed_angle[start..start + len].copy_from_slice(&values[..len]);
    }

    /// Append one ping. `power` and, when present, `angle` must both have
    /// length equal to the ping's sample count (`power.len()`); `angle`
    /// must be `None` for single-beam channels and channels that have not
    /// yet seen angle data is promoted to carrying it on first use.
    pub fn append_ping(
        &mut self,
        meta: PingMeta,
        power: &[i16],
        angle: Option<&[u16]>,
    ) -> Result<(), EkError> {
        if let Some(angle) = angle {
            if angle.len() != power.len() {
                return Err(EkError::InvalidMode {
                    mode: 0,
                    msg: format!(
                        "angle length {} does not match power length {}",
                        angle.len(),
                        power.len()
                    ),
                });
            }
        }

        let sample_count = power.len();
        if sample_count > self.n_cols {
            self.grow_columns(sample_count);
        }
        if angle.is_some() && !self.has_angle {
            self.promote_to_angle_bearing();
        }

        if let Some(capacity) = self.rolling_capacity {
            if self.n_pings >= capacity {
                self.drop_oldest_ping();
            }
        } else if self.n_pings == self.ping_time.capacity() {
            self.reserve_chunk();
        }

        self.ping_time.push(meta.ping_time);
        self.transmit_power.push(meta.transmit_power);
        self.pulse_length.push(meta.pulse_length);
        self.bandwidth.push(meta.bandwidth);
        self.sample_interval.push(meta.sample_interval);
        self.sound_velocity.push(meta.sound_velocity);
        self.absorption_coefficient.push(meta.absorption_coefficient);
        self.transducer_depth.push(meta.transducer_depth);
        self.heave.push(meta.heave);
        self.pitch.push(meta.pitch);
        self.roll.push(meta.roll);
        self.heading.push(meta.heading);
        self.temperature.push(meta.temperature);
        self.transmit_mode.push(meta.transmit_mode);
        self.sample_offset.push(meta.sample_offset);
        self.sample_count.push(sample_count as u32);

        let mut power_row = vec![POWER_MISSING; self.n_cols];
        power_row[..sample_count].copy_from_slice(power);
        self.indexed_power.extend_from_slice(&power_row);

        if self.has_angle {
            let mut angle_row = vec![ANGLE_MISSING; self.n_cols];
            if let Some(angle) = angle {
                angle_row[..sample_count].copy_from_slice(angle);
            }
            self.indexed_angle.extend_from_slice(&angle_row);
        }

        self.n_pings += 1;
        Ok(())
    }

    fn reserve_chunk(&mut self) {
        self.ping_time.reserve(self.chunk_size);
        self.transmit_power.reserve(self.chunk_size);
        self.pulse_length.reserve(self.chunk_size);
        self.bandwidth.reserve(self.chunk_size);
        self.sample_interval.reserve(self.chunk_size);
        self.sound_velocity.reserve(self.chunk_size);
        self.absorption_coefficient.reserve(self.chunk_size);
        self.transducer_depth.reserve(self.chunk_size);
        self.heave.reserve(self.chunk_size);
        self.pitch.reserve(self.chunk_size);
        self.roll.reserve(self.chunk_size);
        self.heading.reserve(self.chunk_size);
        self.temperature.reserve(self.chunk_size);
        self.transmit_mode.reserve(self.chunk_size);
        self.sample_offset.reserve(self.chunk_size);
        self.sample_count.reserve(self.chunk_size);
        self.indexed_power.reserve(self.chunk_size * self.n_cols);
        if self.has_angle {
            self.indexed_angle.reserve(self.chunk_size * self.n_cols);
        }
    }

    /// Grow the sample (column) dimension, re-laying out existing rows
    /// with padding in the new columns (spec §4.4 vertical growth).
    fn grow_columns(&mut self, new_cols: usize) {
        if new_cols <= self.n_cols {
            return;
        }
        let old_cols = self.n_cols;
        let mut new_power = vec![POWER_MISSING; self.n_pings * new_cols];
        for row in 0..self.n_pings {
            let old_start = row * old_cols;
            let new_start = row * new_cols;
            new_power[new_start..new_start + old_cols]
                .copy_from_slice(&self.indexed_power[old_start..old_start + old_cols]);
        }
        self.indexed_power = new_power;

        if self.has_angle {
            let mut new_angle = vec![ANGLE_MISSING; self.n_pings * new_cols];
            for row in 0..self.n_pings {
                let old_start = row * old_cols;
                let new_start = row * new_cols;
                new_angle[new_start..new_start + old_cols]
                    .copy_from_slice(&self.indexed_angle[old_start..old_start + old_cols]);
            }
            self.indexed_angle = new_angle;
        }
        self.n_cols = new_cols;
    }

    /// The first angle-bearing ping for a channel promotes it to carrying
    /// an angle matrix; all previously appended pings backfill as missing.
    fn promote_to_angle_bearing(&mut self) {
        self.has_angle = true;
        self.indexed_angle = vec![ANGLE_MISSING; self.n_pings * self.n_cols];
    }

    fn drop_oldest_ping(&mut self) {
        if self.n_pings == 0 {
            return;
        }
        self.ping_time.remove(0);
        self.transmit_power.remove(0);
        self.pulse_length.remove(0);
        self.bandwidth.remove(0);
        self.sample_interval.remove(0);
        self.sound_velocity.remove(0);
        self.absorption_coefficient.remove(0);
        self.transducer_depth.remove(0);
        self.heave.remove(0);
        self.pitch.remove(0);
        self.roll.remove(0);
        self.heading.remove(0);
        self.temperature.remove(0);
        self.transmit_mode.remove(0);
        self.sample_offset.remove(0);
        self.sample_count.remove(0);
        self.indexed_power.drain(0..self.n_cols);
        if self.has_angle {
            self.indexed_angle.drain(0..self.n_cols);
        }
        self.n_pings -= 1;
    }

    /// Deallocate unused tail capacity after bulk load. Idempotent: a
    /// second call changes nothing (spec §8.1).
    pub fn trim(&mut self) {
        self.ping_time.shrink_to_fit();
        self.transmit_power.shrink_to_fit();
        self.pulse_length.shrink_to_fit();
        self.bandwidth.shrink_to_fit();
        self.sample_interval.shrink_to_fit();
        self.sound_velocity.shrink_to_fit();
        self.absorption_coefficient.shrink_to_fit();
        self.transducer_depth.shrink_to_fit();
        self.heave.shrink_to_fit();
        self.pitch.shrink_to_fit();
        self.roll.shrink_to_fit();
        self.heading.shrink_to_fit();
        self.temperature.shrink_to_fit();
        self.transmit_mode.shrink_to_fit();
        self.sample_offset.shrink_to_fit();
        self.sample_count.shrink_to_fit();
        self.indexed_power.shrink_to_fit();
        self.indexed_angle.shrink_to_fit();
    }

    /// Resolve a (ping-index or ping-time) range to half-open `[lo, hi)`
    /// indices by nearest match, ties breaking to the earlier index.
    pub fn get_index_range(
        &self,
        start_ping: Option<usize>,
        end_ping: Option<usize>,
        start_time: Option<Instant>,
        end_time: Option<Instant>,
    ) -> Result<(usize, usize), EkError> {
        let lo = if let Some(t) = start_time {
            self.nearest_index(t)
        } else {
            start_ping.unwrap_or(0)
        };
        let hi = if let Some(t) = end_time {
            self.nearest_index(t) + 1
        } else {
            end_ping.unwrap_or(self.n_pings)
        };
        if hi < lo {
            return Err(EkError::InvertedRange { lo, hi });
        }
        Ok((lo, hi.min(self.n_pings)))
    }

    fn nearest_index(&self, t: Instant) -> usize {
        self.ping_time
            .iter()
            .enumerate()
            .min_by_key(|(_, pt)| (pt.millis_since_epoch() - t.millis_since_epoch()).abs())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Remove pings whose `sample_count` is zero, renumbering the
    /// remaining pings contiguously (spec §4.8.10).
    pub fn remove_empty_pings(&mut self) {
        let keep: Vec<usize> = (0..self.n_pings)
            .filter(|&i| self.sample_count[i] > 0)
            .collect();
        if keep.len() == self.n_pings {
            return;
        }
        self.retain_indices(&keep);
    }

    fn retain_indices(&mut self, keep: &[usize]) {
        let n_cols = self.n_cols;
        macro_rules! filter_vec {
            ($field:expr) => {
                $field = keep.iter().map(|&i| $field[i].clone()).collect();
            };
        }
        filter_vec!(self.ping_time);
        filter_vec!(self.transmit_power);
        filter_vec!(self.pulse_length);
        filter_vec!(self.bandwidth);
        filter_vec!(self.sample_interval);
        filter_vec!(self.sound_velocity);
        filter_vec!(self.absorption_coefficient);
        filter_vec!(self.transducer_depth);
        filter_vec!(self.heave);
        filter_vec!(self.pitch);
        filter_vec!(self.roll);
        filter_vec!(self.heading);
        filter_vec!(self.temperature);
        filter_vec!(self.transmit_mode);
        filter_vec!(self.sample_offset);
        filter_vec!(self.sample_count);

        let mut new_power = Vec::with_capacity(keep.len() * n_cols);
        let mut new_angle = Vec::with_capacity(if self.has_angle { keep.len() * n_cols } else { 0 });
        for &i in keep {
            new_power.extend_from_slice(&self.indexed_power[i * n_cols..(i + 1) * n_cols]);
            if self.has_angle {
                new_angle.extend_from_slice(&self.indexed_angle[i * n_cols..(i + 1) * n_cols]);
            }
        }
        self.indexed_power = new_power;
        if self.has_angle {
            self.indexed_angle = new_angle;
        }
        self.n_pings = keep.len();
    }

    /// Merge another channel's pings (e.g. from a second appended file)
    /// onto the end of this one, matching on `channel_id`.
    pub fn append_channel(&mut self, mut other: RawChannelData) -> Result<(), EkError> {
        if other.n_cols > self.n_cols {
            self.grow_columns(other.n_cols);
        } else if self.n_cols > other.n_cols {
            other.grow_columns(self.n_cols);
        }
        if other.has_angle && !self.has_angle {
            self.promote_to_angle_bearing();
        } else if self.has_angle && !other.has_angle {
            other.promote_to_angle_bearing();
        }

        self.ping_time.extend(other.ping_time);
        self.transmit_power.extend(other.transmit_power);
        self.pulse_length.extend(other.pulse_length);
        self.bandwidth.extend(other.bandwidth);
        self.sample_interval.extend(other.sample_interval);
        self.sound_velocity.extend(other.sound_velocity);
        self.absorption_coefficient
            .extend(other.absorption_coefficient);
        self.transducer_depth.extend(other.transducer_depth);
        self.heave.extend(other.heave);
        self.pitch.extend(other.pitch);
        self.roll.extend(other.roll);
        self.heading.extend(other.heading);
        self.temperature.extend(other.temperature);
        self.transmit_mode.extend(other.transmit_mode);
        self.sample_offset.extend(other.sample_offset);
        self.sample_count.extend(other.sample_count);
        self.indexed_power.extend(other.indexed_power);
        if self.has_angle {
            self.indexed_angle.extend(other.indexed_angle);
        }
        self.n_pings += other.n_pings;
        Ok(())
    }

    /// Shift every ping timestamp by `offset_ms` (spec §12 `adjust_timestamps`),
    /// for correcting a whole container against a known clock-drift offset.
    pub fn shift_ping_times(&mut self, offset_ms: i64) {
        for t in self.ping_time.iter_mut() {
            *t = t.shift_millis(offset_ms);
        }
    }

    /// Distinct pulse-length groups present in this channel, as (value,
    /// ping indices), grouping values within `tolerance_s` of each other.
    pub fn pulse_length_groups(&self, tolerance_s: f64) -> Vec<(f64, Vec<usize>)> {
        let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
        for (i, &pl) in self.pulse_length.iter().enumerate() {
            match groups.iter_mut().find(|(v, _)| (*v - pl).abs() <= tolerance_s) {
                Some((_, idxs)) => idxs.push(i),
                None => groups.push((pl, vec![i])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(ping_time_ms: i64) -> PingMeta {
        PingMeta {
            ping_time: Instant::from_millis(ping_time_ms),
            transmit_power: 2000.0,
            pulse_length: 1.024e-3,
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

    #[test]
    fn dense_append_with_growth_scenario_6() {
        let mut store = RawChannelData::new("GPT 38").with_chunk_size(4);
        for (i, count) in [8usize, 10, 6, 12, 12, 4].into_iter().enumerate() {
            let power: Vec<i16> = (0..count as i16).collect();
            store.append_ping(meta(i as i64), &power, None).unwrap();
        }
        store.trim();
        assert_eq!(store.n_pings(), 6);
        assert_eq!(store.n_samples(), 12);

        let row0 = store.power_row(0);
        assert_eq!(&row0[0..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&row0[8..12], &[POWER_MISSING; 4]);

        let row2 = store.power_row(2);
        assert_eq!(&row2[6..12], &[POWER_MISSING; 6]);

        let row5 = store.power_row(5);
        assert_eq!(&row5[4..12], &[POWER_MISSING; 8]);
    }

    #[test]
    fn trim_is_idempotent() {
        let mut store = RawChannelData::new("GPT 38");
        store.append_ping(meta(0), &[1, 2, 3], None).unwrap();
        store.trim();
        let before = store.clone();
        store.trim();
        assert_eq!(before.n_pings(), store.n_pings());
        assert_eq!(before.power_row(0), store.power_row(0));
    }

    #[test]
    fn empty_ping_appends_as_all_padding() {
        let mut store = RawChannelData::new("GPT 38");
        store.append_ping(meta(0), &[1, 2, 3, 4], None).unwrap();
        store.append_ping(meta(1), &[], None).unwrap();
        assert_eq!(store.sample_count()[1], 0);
        assert!(store.power_row(1).iter().all(|&v| v == POWER_MISSING));
    }

    #[test]
    fn remove_empty_pings_renumbers_contiguously() {
        let mut store = RawChannelData::new("GPT 38");
        store.append_ping(meta(0), &[1, 2], None).unwrap();
        store.append_ping(meta(1), &[], None).unwrap();
        store.append_ping(meta(2), &[3, 4], None).unwrap();
        store.remove_empty_pings();
        assert_eq!(store.n_pings(), 2);
        assert_eq!(store.power_row(1), &[3, 4]);
    }

    #[test]
    fn shift_ping_times_applies_a_uniform_offset() {
        let mut store = RawChannelData::new("GPT 38");
        store.append_ping(meta(0), &[1], None).unwrap();
        store.append_ping(meta(1000), &[2], None).unwrap();
        store.shift_ping_times(500);
        assert_eq!(store.ping_time()[0].millis_since_epoch(), 500);
        assert_eq!(store.ping_time()[1].millis_since_epoch(), 1500);
    }

    #[test]
    fn rolling_capacity_drops_oldest() {
        let mut store = RawChannelData::new("GPT 38").with_rolling_capacity(2);
        store.append_ping(meta(0), &[1], None).unwrap();
        store.append_ping(meta(1), &[2], None).unwrap();
        store.append_ping(meta(2), &[3], None).unwrap();
        assert_eq!(store.n_pings(), 2);
        assert_eq!(store.ping_time()[0].millis_since_epoch(), 1);
        assert_eq!(store.power_row(1), &[3]);
    }

    #[test]
    fn angle_bearing_promotion_backfills_missing() {
        let mut store = RawChannelData::new("GPT 38");
        store.append_ping(meta(0), &[1, 2], None).unwrap();
        store.append_ping(meta(1), &[3, 4], Some(&[0x0102, 0x0304])).unwrap();
        assert!(store.has_angle());
        assert_eq!(store.angle_row(0), Some(&[ANGLE_MISSING, ANGLE_MISSING][..]));
        assert_eq!(store.angle_row(1), Some(&[0x0102, 0x0304][..]));
    }
}
