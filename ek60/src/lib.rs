//! Top-level aggregator tying `ek60-read`'s framing/parsing together with
//! `ek60-transform`'s calibration and acoustic transforms: [`EkData`] is the
//! single entry point most callers need.
extern crate ek60_core;
extern crate ek60_read;
extern crate ek60_transform;

// Re-exported so downstream crates (the CLI) can name calibration/error/
// settings types without also depending on these crates directly.
pub use ek60_core;
pub use ek60_read;

pub mod nmea;

use std::collections::HashMap;
use std::path::Path;

use ek60_core::ancillary::{checksum_and_fields, BottomLog, MotionLog, NmeaLog};
use ek60_core::calibration::Calibration;
use ek60_core::config::{ConfigHeader, TransceiverConfig};
use ek60_core::enums::MetaNmeaType;
use ek60_core::errors::EkError;
use ek60_core::grid::CalibratedGrid;
use ek60_core::settings::ReadSettings;
use ek60_core::store::{PingMeta, RawChannelData};
use ek60_core::time::Instant;

use ek60_read::framing::FrameReader;
use ek60_read::Datagram;

use ek60_transform::{
    angles, cumulative_distance_nm, interpolate_linear, meters_per_sample, power_row_to_db, range_vector, resolve,
    sp_row, sv_row, SonarEquationParams,
};

pub use nmea::FieldRequest;

/// Tally of what a [`EkData::read_raw`] call actually did.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub n_files: usize,
    pub n_datagrams: usize,
    pub n_pings: usize,
    /// Set when a progress callback requested early termination (spec §5
    /// "Cancellation and timeouts"); the container is trimmed and
    /// internally consistent up to the point of cancellation.
    pub truncated: bool,
}

/// Every channel's dense ping store plus the static config recorded for
/// it, and the file-wide ancillary logs.
#[derive(Debug, Clone, Default)]
pub struct EkData {
    channels: HashMap<String, RawChannelData>,
    configs: HashMap<String, TransceiverConfig>,
    config_header: Option<ConfigHeader>,
    nmea: NmeaLog,
    motion: MotionLog,
    bottom: BottomLog,
}

impl EkData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one or more `.raw` files in sequence (spec §5 "ordering
    /// guarantees": file N completes before file N+1 begins).
    pub fn read_raw<P: AsRef<Path>>(&mut self, paths: &[P], options: &ReadSettings) -> Result<LoadReport, EkError> {
        self.read_raw_with_progress(paths, options, None)
    }

    /// As [`Self::read_raw`], but with a progress callback invoked after
    /// every committed ping. Returning `false` requests early
    /// termination; the container is left trimmed and consistent.
    pub fn read_raw_with_progress<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        options: &ReadSettings,
        mut progress: Option<&mut dyn FnMut(usize) -> bool>,
    ) -> Result<LoadReport, EkError> {
        let mut report = LoadReport::default();

        'files: for path in paths {
            let file = std::fs::File::open(path)?;
            let mut reader = FrameReader::new(std::io::BufReader::new(file));
            report.n_files += 1;

            loop {
                let header = match reader.peek_header()? {
                    Some(h) => h,
                    None => break,
                };
                if !options.datagram_admitted(&header.tag) || !options.time_admitted(header.time) {
                    reader.skip()?;
                    continue;
                }
                let dg = match reader.read()? {
                    Some(dg) => dg,
                    None => break,
                };
                report.n_datagrams += 1;
                self.ingest(dg, options, &mut report);

                if let Some(cb) = progress.as_deref_mut() {
                    if !cb(report.n_pings) {
                        report.truncated = true;
                        self.trim_all();
                        break 'files;
                    }
                }
            }
        }

        self.trim_all();
        Ok(report)
    }

    fn ingest(&mut self, dg: Datagram, options: &ReadSettings, report: &mut LoadReport) {
        match dg {
            Datagram::Con0 { header, .. } => {
                for cfg in &header.transceivers {
                    self.configs.insert(cfg.channel_id.clone(), cfg.clone());
                }
                self.config_header = Some(header);
            }
            Datagram::Con1 { .. } => {}
            Datagram::Raw0 { time, payload } => {
                let channel_id = self.channel_id_for(payload.channel);
                let frequency = self
                    .configs
                    .get(&channel_id)
                    .map(|c| c.frequency)
                    .unwrap_or(payload.frequency);
                if !options.channel_admitted(&channel_id, frequency) {
                    return;
                }

                let store = self.channels.entry(channel_id.clone()).or_insert_with(|| {
                    let mut s = RawChannelData::new(channel_id.clone()).with_chunk_size(options.chunk_size());
                    if let Some(cap) = options.rolling_capacity() {
                        s = s.with_rolling_capacity(cap);
                    }
                    s
                });

                let meta = PingMeta {
                    ping_time: time,
                    transmit_power: payload.transmit_power,
                    pulse_length: payload.pulse_length,
                    bandwidth: payload.bandwidth,
                    sample_interval: payload.sample_interval,
                    sound_velocity: payload.sound_velocity,
                    absorption_coefficient: payload.absorption_coefficient,
                    transducer_depth: payload.transducer_depth,
                    heave: payload.heave,
                    pitch: payload.tx_pitch,
                    roll: payload.tx_roll,
                    heading: payload.heading,
                    temperature: payload.temperature,
                    transmit_mode: payload.transmit_mode,
                    sample_offset: payload.sample_offset,
                };
                if store
                    .append_ping(meta, &payload.power, payload.angle.as_deref())
                    .is_ok()
                {
                    report.n_pings += 1;
                }
            }
            Datagram::Nme0 { time, text } => self.nmea.insert(time, text),
            Datagram::Tag0 { .. } => {}
            Datagram::Mru0 {
                time,
                heave,
                roll,
                pitch,
                heading,
            } => self.motion.insert(time, heave, pitch, roll, heading),
            Datagram::Dep0 {
                time,
                depth,
                reflectivity,
            } => self.bottom.insert(time, depth, reflectivity),
            Datagram::Bot0 { time, depth } => self.bottom.insert(time, depth, Vec::new()),
            Datagram::Unknown { .. } => {}
        }
    }

    /// RAW0's `channel` field is the 1-based index into the CON0
    /// transceiver list; resolve it to that transceiver's `channel_id`,
    /// falling back to a synthetic id if CON0 hasn't been seen yet.
    fn channel_id_for(&self, channel: u16) -> String {
        if let Some(header) = &self.config_header {
            if let Some(cfg) = header.transceivers.get(channel as usize - 1) {
                return cfg.channel_id.clone();
            }
        }
        format!("channel_{}", channel)
    }

    fn trim_all(&mut self) {
        for store in self.channels.values_mut() {
            store.trim();
        }
    }

    pub fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get_raw(&self, channel_id: &str) -> Result<&RawChannelData, EkError> {
        self.channels.get(channel_id).ok_or_else(|| EkError::UnknownChannel {
            channel_id: channel_id.to_string(),
        })
    }

    /// Look up a channel by its `channel_id`, or by a frequency (in Hz,
    /// parsed from the string) matching a recorded transceiver config
    /// (donor: `get_channel`).
    pub fn get_channel(&self, id_or_frequency: &str) -> Result<&RawChannelData, EkError> {
        if let Some(store) = self.channels.get(id_or_frequency) {
            return Ok(store);
        }
        if let Ok(freq) = id_or_frequency.parse::<f64>() {
            if let Some((channel_id, _)) = self.configs.iter().find(|(_, cfg)| (cfg.frequency - freq).abs() < 1e-6) {
                if let Some(store) = self.channels.get(channel_id) {
                    return Ok(store);
                }
            }
        }
        Err(EkError::UnknownChannel {
            channel_id: id_or_frequency.to_string(),
        })
    }

    pub fn get_nmea_types(&self) -> Vec<&str> {
        self.nmea.get_nmea_types()
    }

    pub fn get_nmea(&self, type_or_header: &str, ignore_checksum: bool) -> Vec<(Instant, &str)> {
        self.nmea.get_by_type(type_or_header, ignore_checksum)
    }

    /// Shift every recorded timestamp (pings, NMEA, motion, bottom) by a
    /// fixed offset, for correcting a whole container against a known
    /// GPS/Simrad clock-drift offset (donor: `adjust_timestamps`).
    pub fn adjust_timestamps(&mut self, offset_ms: i64) {
        for store in self.channels.values_mut() {
            store.shift_ping_times(offset_ms);
        }
        self.nmea.shift_times(offset_ms);
        self.motion.shift_times(offset_ms);
        self.bottom.shift_times(offset_ms);
    }

    fn config_for(&self, channel_id: &str) -> Option<&TransceiverConfig> {
        self.configs.get(channel_id)
    }

    fn resolve_selection<'a>(raw: &RawChannelData, selection: Option<&'a [usize]>) -> Vec<usize> {
        match selection {
            Some(s) => s.to_vec(),
            None => (0..raw.n_pings()).collect(),
        }
    }

    /// Power, dB, with no calibration applied. Padding cells (beyond a
    /// ping's `sample_count`) come back as `NaN`.
    pub fn get_power(&self, channel_id: &str, selection: Option<&[usize]>) -> Result<CalibratedGrid, EkError> {
        let raw = self.get_raw(channel_id)?;
        let indices = Self::resolve_selection(raw, selection);
        let n_samples = raw.n_samples();

        let i0 = *indices.first().ok_or_else(|| EkError::InvertedRange { lo: 0, hi: 0 })?;
        let m = meters_per_sample(raw.sound_velocity()[i0], raw.sample_interval()[i0]);
        let range = range_vector(n_samples, raw.sample_offset()[i0], m);

        let mut values = Vec::with_capacity(indices.len() * n_samples);
        let mut ping_time = Vec::with_capacity(indices.len());
        for &i in &indices {
            let mut row = power_row_to_db(raw.power_row(i));
            mask_beyond_sample_count(&mut row, raw.sample_count()[i] as usize);
            values.extend(row);
            ping_time.push(raw.ping_time()[i]);
        }

        Ok(CalibratedGrid::new(
            indices.len(),
            n_samples,
            values,
            range,
            ping_time,
            Calibration::new(),
        ))
    }

    /// Volume backscattering strength Sv (dB) or linear sv, per spec
    /// §4.8.5. Calibration overrides not supplied fall back to raw
    /// per-ping data, then the channel's static config.
    pub fn get_sv(
        &self,
        channel_id: &str,
        calibration: Option<&Calibration>,
        linear: bool,
        selection: Option<&[usize]>,
    ) -> Result<CalibratedGrid, EkError> {
        self.get_sonar_equation(channel_id, calibration, linear, selection, true)
    }

    /// As [`Self::get_sv`], but for point/target strength Sp (spec
    /// §4.8.6).
    pub fn get_sp(
        &self,
        channel_id: &str,
        calibration: Option<&Calibration>,
        linear: bool,
        selection: Option<&[usize]>,
    ) -> Result<CalibratedGrid, EkError> {
        self.get_sonar_equation(channel_id, calibration, linear, selection, false)
    }

    fn get_sonar_equation(
        &self,
        channel_id: &str,
        calibration: Option<&Calibration>,
        linear: bool,
        selection: Option<&[usize]>,
        volume: bool,
    ) -> Result<CalibratedGrid, EkError> {
        let raw = self.get_raw(channel_id)?;
        let config = self.config_for(channel_id);
        let indices = Self::resolve_selection(raw, selection);
        let n_samples = raw.n_samples();
        let cal = calibration.cloned().unwrap_or_default();

        let sound_speed = resolve(&cal, raw, config, "sound_speed", &indices)?;
        let absorption_coefficient = resolve(&cal, raw, config, "absorption_coefficient", &indices)?;
        let transmit_power = resolve(&cal, raw, config, "transmit_power", &indices)?;
        let frequency = resolve(&cal, raw, config, "frequency", &indices)?;
        let pulse_length = resolve(&cal, raw, config, "pulse_length", &indices)?;
        let gain = resolve(&cal, raw, config, "gain", &indices)?;
        let sa_correction = resolve(&cal, raw, config, "sa_correction", &indices)?;
        let equivalent_beam_angle = resolve(&cal, raw, config, "equivalent_beam_angle", &indices)?;
        let tvg_range_correction =
            resolve(&cal, raw, config, "tvg_range_correction", &indices).unwrap_or_else(|_| vec![2.0; indices.len()]);

        let i0 = *indices.first().ok_or_else(|| EkError::InvertedRange { lo: 0, hi: 0 })?;
        let m = meters_per_sample(sound_speed[0], raw.sample_interval()[i0]);
        let range = range_vector(n_samples, raw.sample_offset()[i0], m);

        let mut values = Vec::with_capacity(indices.len() * n_samples);
        let mut ping_time = Vec::with_capacity(indices.len());
        for (j, &i) in indices.iter().enumerate() {
            let power_db = power_row_to_db(raw.power_row(i));
            let params = SonarEquationParams {
                sound_speed: sound_speed[j],
                absorption_coefficient: absorption_coefficient[j],
                transmit_power: transmit_power[j],
                frequency: frequency[j],
                pulse_length: pulse_length[j],
                gain: gain[j],
                sa_correction: sa_correction[j],
                equivalent_beam_angle_db: equivalent_beam_angle[j],
                tvg_range_correction: tvg_range_correction[j],
            };
            let mut row = if volume {
                sv_row(&power_db, &range, m, &params)
            } else {
                sp_row(&power_db, &range, m, &params)
            };
            mask_beyond_sample_count(&mut row, raw.sample_count()[i] as usize);
            if linear {
                for v in row.iter_mut() {
                    *v = ek60_transform::db_to_linear(*v);
                }
            }
            values.extend(row);
            ping_time.push(raw.ping_time()[i]);
        }

        Ok(CalibratedGrid::new(indices.len(), n_samples, values, range, ping_time, cal))
    }

    /// Electrical along/athwartship angle, degrees (spec §4.8.7). Errors
    /// if the channel has never carried angle-bearing pings.
    pub fn get_electrical_angles(
        &self,
        channel_id: &str,
        selection: Option<&[usize]>,
    ) -> Result<(CalibratedGrid, CalibratedGrid), EkError> {
        let raw = self.get_raw(channel_id)?;
        if !raw.has_angle() {
            return Err(EkError::InvalidMode {
                mode: 0,
                msg: format!("channel '{}' has no angle-bearing pings", channel_id),
            });
        }
        let indices = Self::resolve_selection(raw, selection);
        let n_samples = raw.n_samples();
        let i0 = *indices.first().ok_or_else(|| EkError::InvertedRange { lo: 0, hi: 0 })?;
        let m = meters_per_sample(raw.sound_velocity()[i0], raw.sample_interval()[i0]);
        let range = range_vector(n_samples, raw.sample_offset()[i0], m);

        let mut along_values = Vec::with_capacity(indices.len() * n_samples);
        let mut athwart_values = Vec::with_capacity(indices.len() * n_samples);
        let mut ping_time = Vec::with_capacity(indices.len());
        for &i in &indices {
            let angle_row = raw.angle_row(i).unwrap_or(&[]);
            let decoded = angles::electrical_angle_row(angle_row);
            let mut along: Vec<f64> = decoded.iter().map(|d| d.alongship_elec).collect();
            let mut athwart: Vec<f64> = decoded.iter().map(|d| d.athwartship_elec).collect();
            along.resize(n_samples, f64::NAN);
            athwart.resize(n_samples, f64::NAN);
            mask_beyond_sample_count(&mut along, raw.sample_count()[i] as usize);
            mask_beyond_sample_count(&mut athwart, raw.sample_count()[i] as usize);
            along_values.extend(along);
            athwart_values.extend(athwart);
            ping_time.push(raw.ping_time()[i]);
        }

        Ok((
            CalibratedGrid::new(
                indices.len(),
                n_samples,
                along_values,
                range.clone(),
                ping_time.clone(),
                Calibration::new(),
            ),
            CalibratedGrid::new(indices.len(), n_samples, athwart_values, range, ping_time, Calibration::new()),
        ))
    }

    /// Physical along/athwartship angle, degrees (spec §4.8.8), applying
    /// `angle_sensitivity_*`/`angle_offset_*` resolved the usual way.
    pub fn get_physical_angles(
        &self,
        channel_id: &str,
        calibration: Option<&Calibration>,
        selection: Option<&[usize]>,
    ) -> Result<(CalibratedGrid, CalibratedGrid), EkError> {
        let raw = self.get_raw(channel_id)?;
        let config = self.config_for(channel_id);
        let indices = Self::resolve_selection(raw, selection);
        let cal = calibration.cloned().unwrap_or_default();

        let along_sensitivity = resolve(&cal, raw, config, "angle_sensitivity_alongship", &indices)?;
        let along_offset = resolve(&cal, raw, config, "angle_offset_alongship", &indices)?;
        let athwart_sensitivity = resolve(&cal, raw, config, "angle_sensitivity_athwartship", &indices)?;
        let athwart_offset = resolve(&cal, raw, config, "angle_offset_athwartship", &indices)?;

        let (electrical_along, electrical_athwart) = self.get_electrical_angles(channel_id, Some(&indices))?;

        let n_samples = electrical_along.n_samples();
        let mut along_values = Vec::with_capacity(indices.len() * n_samples);
        let mut athwart_values = Vec::with_capacity(indices.len() * n_samples);
        for j in 0..indices.len() {
            for &v in electrical_along.row(j) {
                along_values.push(angles::physical_angle(v, along_sensitivity[j], along_offset[j]));
            }
            for &v in electrical_athwart.row(j) {
                athwart_values.push(angles::physical_angle(v, athwart_sensitivity[j], athwart_offset[j]));
            }
        }

        Ok((
            CalibratedGrid::new(
                indices.len(),
                n_samples,
                along_values,
                electrical_along.range().to_vec(),
                electrical_along.ping_time().to_vec(),
                cal.clone(),
            ),
            CalibratedGrid::new(
                indices.len(),
                n_samples,
                athwart_values,
                electrical_athwart.range().to_vec(),
                electrical_athwart.ping_time().to_vec(),
                cal,
            ),
        ))
    }

    /// Interpolate an ancillary field onto `grid`'s ping times (spec
    /// §6.3, §4.7). `Attitude` reads `MotionLog` directly; the NMEA
    /// meta-types resolve through `NmeaLog`'s preference order and parse
    /// the resulting sentences with [`nmea`].
    pub fn interpolate(
        &self,
        grid: &CalibratedGrid,
        request: FieldRequest,
    ) -> Result<HashMap<String, Vec<f64>>, EkError> {
        match request {
            FieldRequest::Meta(MetaNmeaType::Attitude) => Ok(self.interpolate_attitude(grid.ping_time())),
            FieldRequest::Meta(MetaNmeaType::Distance) => {
                match self.nmea.resolve_meta_type(MetaNmeaType::Distance.preference_order(), false) {
                    Some(records) => {
                        Ok(self.interpolate_nmea_records(MetaNmeaType::Distance, &records, grid.ping_time()))
                    }
                    None => Ok(self.interpolate_distance_from_position(grid.ping_time())),
                }
            }
            FieldRequest::Meta(meta) => {
                let records = self
                    .nmea
                    .resolve_meta_type(meta.preference_order(), false)
                    .unwrap_or_default();
                Ok(self.interpolate_nmea_records(meta, &records, grid.ping_time()))
            }
            FieldRequest::Concrete(sentence_type) => {
                let records = self.nmea.get_by_type(&sentence_type, false);
                let meta = meta_type_for(&sentence_type);
                Ok(self.interpolate_nmea_records(meta, &records, grid.ping_time()))
            }
        }
    }

    /// Distance-from-position fallback (spec §4.5: "distance | VLW (else
    /// derive from position)"): cumulative great-circle distance over the
    /// resolved position fixes, interpolated onto `targets`. Used when the
    /// stream carries no VLW sentences.
    fn interpolate_distance_from_position(&self, targets: &[Instant]) -> HashMap<String, Vec<f64>> {
        let records = self
            .nmea
            .resolve_meta_type(MetaNmeaType::Position.preference_order(), false)
            .unwrap_or_default();

        let mut times = Vec::with_capacity(records.len());
        let mut lat = Vec::with_capacity(records.len());
        let mut lon = Vec::with_capacity(records.len());
        for &(time, text) in &records {
            let fields = match checksum_and_fields(text) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let sentence_type = sentence_type_of(&fields);
            if let Some((la, lo)) = nmea::extract_position(sentence_type, &fields) {
                times.push(time);
                lat.push(la);
                lon.push(lo);
            }
        }

        let distance = cumulative_distance_nm(&lat, &lon);
        let mut out = HashMap::new();
        out.insert("distance_nm".to_string(), interpolate_linear(&times, &distance, targets));
        out
    }

    fn interpolate_attitude(&self, targets: &[Instant]) -> HashMap<String, Vec<f64>> {
        let times = self.motion.time();
        let mut out = HashMap::new();
        for field in ["heave", "pitch", "roll", "heading"] {
            let indices: Vec<usize> = (0..times.len()).collect();
            let values = self.motion.values_at(&indices, field);
            out.insert(field.to_string(), interpolate_linear(times, &values, targets));
        }
        out
    }

    fn interpolate_nmea_records(
        &self,
        meta: MetaNmeaType,
        records: &[(Instant, &str)],
        targets: &[Instant],
    ) -> HashMap<String, Vec<f64>> {
        let mut times = Vec::with_capacity(records.len());
        let mut field_a = Vec::with_capacity(records.len());
        let mut field_b = Vec::with_capacity(records.len());
        let (name_a, name_b) = match meta {
            MetaNmeaType::Position => ("lat", "lon"),
            MetaNmeaType::Speed => ("speed_knots", "speed_knots"),
            MetaNmeaType::Distance => ("distance_nm", "distance_nm"),
            MetaNmeaType::Attitude => ("heave", "heave"),
        };

        for &(time, text) in records {
            let fields = match checksum_and_fields(text) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let sentence_type = sentence_type_of(&fields);
            match meta {
                MetaNmeaType::Position => {
                    if let Some((lat, lon)) = nmea::extract_position(sentence_type, &fields) {
                        times.push(time);
                        field_a.push(lat);
                        field_b.push(lon);
                    }
                }
                MetaNmeaType::Speed => {
                    if let Some(speed) = nmea::extract_speed_knots(sentence_type, &fields) {
                        times.push(time);
                        field_a.push(speed);
                    }
                }
                MetaNmeaType::Distance => {
                    if let Some(distance) = nmea::extract_distance_nm(sentence_type, &fields) {
                        times.push(time);
                        field_a.push(distance);
                    }
                }
                MetaNmeaType::Attitude => {}
            }
        }

        let mut out = HashMap::new();
        match meta {
            MetaNmeaType::Position => {
                out.insert(name_a.to_string(), interpolate_linear(&times, &field_a, targets));
                out.insert(name_b.to_string(), interpolate_linear(&times, &field_b, targets));
            }
            MetaNmeaType::Speed | MetaNmeaType::Distance => {
                out.insert(name_a.to_string(), interpolate_linear(&times, &field_a, targets));
            }
            MetaNmeaType::Attitude => {}
        }
        out
    }
}

/// Zero out the padding tail of a row past a ping's actual sample count,
/// so missing samples read as `NaN` rather than whatever the sonar
/// equation made of the padding sentinel.
fn mask_beyond_sample_count(row: &mut [f64], sample_count: usize) {
    for v in row.iter_mut().skip(sample_count) {
        *v = f64::NAN;
    }
}

/// The 3-letter sentence type from a checksum-validated field list whose
/// first element is the `$xxxxx` header.
fn sentence_type_of<'a>(fields: &[&'a str]) -> &'a str {
    match fields.first() {
        Some(&header) if header.len() >= 6 => &header[3..6],
        _ => "",
    }
}

fn meta_type_for(sentence_type: &str) -> MetaNmeaType {
    match sentence_type {
        "GGA" | "GLL" | "RMC" => MetaNmeaType::Position,
        "VTG" | "VHW" => MetaNmeaType::Speed,
        "VLW" => MetaNmeaType::Distance,
        _ => MetaNmeaType::Attitude,
    }
}
