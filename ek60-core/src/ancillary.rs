//! Ancillary time-series stores: NMEA text log, motion (MRU) log, bottom
//! depth log (spec §4.5, §4.6).
use fnv::FnvHashMap;

use crate::errors::EkError;
use crate::time::Instant;

/// Append-only (Instant, raw_text) log with a secondary by-type index
/// (spec §3.1, §4.5).
#[derive(Debug, Clone, Default)]
pub struct NmeaLog {
    records: Vec<(Instant, String)>,
    /// Keyed by the full 5-char talker+type header, e.g. "GPGGA".
    by_talker_type: FnvHashMap<String, Vec<usize>>,
    /// Keyed by the 3-letter sentence type alone, e.g. "GGA".
    by_type: FnvHashMap<String, Vec<usize>>,
    valid_checksum: Vec<bool>,
}

impl NmeaLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a raw NMEA sentence. The 5-character header (positions 1..6,
    /// i.e. after the leading `$`) is extracted and uppercased; if it is 5
    /// ASCII letters it is indexed by both the full header and the
    /// trailing 3-letter type. Malformed headers are kept in the raw log
    /// but left unindexed. The XOR checksum between `$` and `*` is
    /// validated and recorded for the `ignore_checksum` query path.
    pub fn insert(&mut self, time: Instant, raw_text: impl Into<String>) {
        let raw_text = raw_text.into();
        let idx = self.records.len();
        let valid = checksum_valid(&raw_text);
        self.valid_checksum.push(valid);

        if let Some(header) = extract_header(&raw_text) {
            self.by_talker_type
                .entry(header.clone())
                .or_default()
                .push(idx);
            let sentence_type = header[2..].to_string();
            self.by_type.entry(sentence_type).or_default().push(idx);
        }
        self.records.push((time, raw_text));
    }

    /// Shift every record's timestamp (spec §12 `adjust_timestamps`).
    pub fn shift_times(&mut self, offset_ms: i64) {
        for (t, _) in self.records.iter_mut() {
            *t = t.shift_millis(offset_ms);
        }
    }

    pub fn get_nmea_types(&self) -> Vec<&str> {
        self.by_type.keys().map(|s| s.as_str()).collect()
    }

    /// Records matching a concrete sentence type (3-letter, e.g. "GGA", or
    /// the full 5-char talker+type header), honoring checksum validity
    /// unless `ignore_checksum` is set.
    pub fn get_by_type(&self, type_or_header: &str, ignore_checksum: bool) -> Vec<(Instant, &str)> {
        let key = type_or_header.to_uppercase();
        let indices = if key.len() == 5 {
            self.by_talker_type.get(&key)
        } else {
            self.by_type.get(&key)
        };
        indices
            .into_iter()
            .flatten()
            .filter(|&&i| ignore_checksum || self.valid_checksum[i])
            .map(|&i| (self.records[i].0, self.records[i].1.as_str()))
            .collect()
    }

    /// Resolve a logical meta-type (spec §4.5 table) by trying its
    /// concrete preference order in turn; returns the first type with any
    /// records, or `None`.
    pub fn resolve_meta_type(
        &self,
        preference_order: &[&str],
        ignore_checksum: bool,
    ) -> Option<Vec<(Instant, &str)>> {
        for candidate in preference_order {
            let records = self.get_by_type(candidate, ignore_checksum);
            if !records.is_empty() {
                return Some(records);
            }
        }
        None
    }
}

/// Extract and uppercase the 5-character talker+type header from a raw
/// `$xxxxx,...*hh` sentence (spec §4.5). Returns `None` if the text is
/// too short or the header is not 5 ASCII letters.
fn extract_header(raw_text: &str) -> Option<String> {
    let bytes = raw_text.as_bytes();
    if bytes.len() < 6 {
        return None;
    }
    let header = &raw_text[1..6];
    if header.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(header.to_uppercase())
    } else {
        None
    }
}

/// Validate the XOR checksum of a `$...*hh` sentence (hex of the XOR of
/// all payload bytes strictly between `$` and `*`).
fn checksum_valid(raw_text: &str) -> bool {
    let Some(dollar) = raw_text.find('$') else {
        return false;
    };
    let Some(star) = raw_text.find('*') else {
        return false;
    };
    if star <= dollar + 1 || star + 3 > raw_text.len() {
        return false;
    }
    let payload = &raw_text[dollar + 1..star];
    let claimed = &raw_text[star + 1..star + 3];
    let Ok(claimed) = u8::from_str_radix(claimed, 16) else {
        return false;
    };
    let computed = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    computed == claimed
}

/// Checksum-validate and split a raw sentence's payload into
/// comma-separated fields, for the per-sentence parsers.
pub fn checksum_and_fields(raw_text: &str) -> Result<Vec<&str>, EkError> {
    if !checksum_valid(raw_text) {
        return Err(EkError::ChecksumInvalid {
            sentence: raw_text.to_string(),
        });
    }
    let end = raw_text.find('*').unwrap_or(raw_text.len());
    Ok(raw_text[..end].split(',').collect())
}

/// Append-only (Instant, heave, pitch, roll, heading) log, with
/// same-timestamp-as-previous entries dropped at insert (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct MotionLog {
    time: Vec<Instant>,
    heave: Vec<f64>,
    pitch: Vec<f64>,
    roll: Vec<f64>,
    heading: Vec<f64>,
}

impl MotionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn insert(&mut self, time: Instant, heave: f64, pitch: f64, roll: f64, heading: f64) {
        if self.time.last() == Some(&time) {
            return;
        }
        self.time.push(time);
        self.heave.push(heave);
        self.pitch.push(pitch);
        self.roll.push(roll);
        self.heading.push(heading);
    }

    pub fn time(&self) -> &[Instant] {
        &self.time
    }

    /// Shift every record's timestamp (spec §12 `adjust_timestamps`).
    pub fn shift_times(&mut self, offset_ms: i64) {
        for t in self.time.iter_mut() {
            *t = t.shift_millis(offset_ms);
        }
    }

    pub fn indices_in_range(&self, start: Instant, end: Instant) -> (usize, usize) {
        let lo = self.time.partition_point(|t| *t < start);
        let hi = self.time.partition_point(|t| *t <= end);
        (lo, hi)
    }

    /// Values of a named field at the given indices; `field` is one of
    /// "heave", "pitch", "roll", "heading".
    pub fn values_at(&self, indices: &[usize], field: &str) -> Vec<f64> {
        let source: &[f64] = match field {
            "heave" => &self.heave,
            "pitch" => &self.pitch,
            "roll" => &self.roll,
            "heading" => &self.heading,
            _ => return Vec::new(),
        };
        indices.iter().map(|&i| source[i]).collect()
    }
}

/// Append-only (Instant, depth[channels], reflectivity[channels]) log
/// (spec §4.6, §4.3 DEP0/BOT0).
#[derive(Debug, Clone, Default)]
pub struct BottomLog {
    time: Vec<Instant>,
    depth: Vec<Vec<f64>>,
    reflectivity: Vec<Vec<f64>>,
}

impl BottomLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn insert(&mut self, time: Instant, depth: Vec<f64>, reflectivity: Vec<f64>) {
        self.time.push(time);
        self.depth.push(depth);
        self.reflectivity.push(reflectivity);
    }

    pub fn time(&self) -> &[Instant] {
        &self.time
    }

    /// Shift every record's timestamp (spec §12 `adjust_timestamps`).
    pub fn shift_times(&mut self, offset_ms: i64) {
        for t in self.time.iter_mut() {
            *t = t.shift_millis(offset_ms);
        }
    }

    pub fn indices_in_range(&self, start: Instant, end: Instant) -> (usize, usize) {
        let lo = self.time.partition_point(|t| *t < start);
        let hi = self.time.partition_point(|t| *t <= end);
        (lo, hi)
    }

    /// Depth for a given channel index at the given record indices.
    pub fn depth_at(&self, indices: &[usize], channel: usize) -> Vec<f64> {
        indices
            .iter()
            .map(|&i| self.depth[i].get(channel).copied().unwrap_or(f64::NAN))
            .collect()
    }

    pub fn reflectivity_at(&self, indices: &[usize], channel: usize) -> Vec<f64> {
        indices
            .iter()
            .map(|&i| self.reflectivity[i].get(channel).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_extraction_and_indexing() {
        let mut log = NmeaLog::new();
        // $GPGGA,... checksum over "GPGGA,..." must match 4A for this to
        // validate; use a known-good GGA fixture string.
        log.insert(
            Instant::from_millis(0),
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
        );
        assert_eq!(log.get_by_type("GGA", false).len(), 1);
        assert_eq!(log.get_by_type("GPGGA", false).len(), 1);
    }

    #[test]
    fn bad_checksum_excluded_unless_opted_in() {
        let mut log = NmeaLog::new();
        log.insert(Instant::from_millis(0), "$GPGGA,bogus*00");
        assert_eq!(log.get_by_type("GGA", false).len(), 0);
        assert_eq!(log.get_by_type("GGA", true).len(), 1);
    }

    #[test]
    fn meta_type_resolution_scenario_4() {
        let mut log = NmeaLog::new();
        log.insert(
            Instant::from_millis(0),
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
        );
        let resolved = log.resolve_meta_type(&["GGA", "GLL", "RMC"], false);
        assert!(resolved.is_some());

        let empty = NmeaLog::new();
        assert!(empty.resolve_meta_type(&["GGA", "GLL", "RMC"], false).is_none());
    }

    #[test]
    fn motion_log_drops_duplicate_timestamp() {
        let mut log = MotionLog::new();
        log.insert(Instant::from_millis(0), 1.0, 0.0, 0.0, 0.0);
        log.insert(Instant::from_millis(0), 2.0, 0.0, 0.0, 0.0);
        log.insert(Instant::from_millis(1), 3.0, 0.0, 0.0, 0.0);
        assert_eq!(log.len(), 2);
        assert_eq!(log.values_at(&[0, 1], "heave"), vec![1.0, 3.0]);
    }
}
