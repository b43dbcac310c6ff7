//! This module contains the [`ReadSettings`] structure used to customise
//! how `read_raw` filters and chunks an incoming `.raw` stream.
//!
//! As with the underlying `RawChannelData` growth policy, most of these
//! fields interact with each other (an empty include-list means "include
//! everything", an exclude entry only makes sense if it isn't also
//! included), so changes go through setter methods rather than direct
//! field access.
use crate::store::DEFAULT_CHUNK_SIZE;
use crate::time::Instant;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// Options controlling a `read_raw` load (spec §6.3).
pub struct ReadSettings {
    pub(crate) include_channel_ids: Vec<String>,
    pub(crate) exclude_channel_ids: Vec<String>,
    pub(crate) include_frequencies: Vec<f64>,
    pub(crate) time_window: Option<(Instant, Instant)>,
    /// Datagram tags to keep; empty means "keep all recognised tags".
    pub(crate) datagram_type_filter: Vec<[u8; 4]>,
    pub(crate) preferred_position_types: Vec<String>,
    pub(crate) preferred_distance_types: Vec<String>,
    pub(crate) chunk_size: usize,
    pub(crate) rolling_capacity: Option<usize>,
}

impl Default for ReadSettings {
    /// No channel/frequency/time filtering, all recognised datagram types
    /// kept, default NMEA preference order, default chunk size, unbounded
    /// growth.
    fn default() -> Self {
        ReadSettings {
            include_channel_ids: Vec::new(),
            exclude_channel_ids: Vec::new(),
            include_frequencies: Vec::new(),
            time_window: None,
            datagram_type_filter: Vec::new(),
            preferred_position_types: vec!["GGA".to_string(), "GLL".to_string(), "RMC".to_string()],
            preferred_distance_types: vec!["VLW".to_string()],
            chunk_size: DEFAULT_CHUNK_SIZE,
            rolling_capacity: None,
        }
    }
}

impl ReadSettings {
    #[cfg(feature = "to_json")]
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(&self).map_err(|e| e.to_string())
    }

    pub fn include_channel(&mut self, channel_id: impl Into<String>) {
        self.include_channel_ids.push(channel_id.into());
    }

    pub fn exclude_channel(&mut self, channel_id: impl Into<String>) {
        self.exclude_channel_ids.push(channel_id.into());
    }

    pub fn include_frequency(&mut self, hz: f64) {
        self.include_frequencies.push(hz);
    }

    pub fn set_time_window(&mut self, start: Instant, end: Instant) {
        self.time_window = Some((start, end));
    }

    pub fn set_datagram_type_filter(&mut self, tags: Vec<[u8; 4]>) {
        self.datagram_type_filter = tags;
    }

    pub fn set_preferred_position_types(&mut self, types: Vec<String>) {
        self.preferred_position_types = types;
    }

    pub fn set_preferred_distance_types(&mut self, types: Vec<String>) {
        self.preferred_distance_types = types;
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    pub fn set_rolling_capacity(&mut self, capacity: Option<usize>) {
        self.rolling_capacity = capacity;
    }

    /// Whether `channel_id`/`frequency` survive the include/exclude
    /// filters. An empty include-list means "include everything not
    /// explicitly excluded".
    pub fn channel_admitted(&self, channel_id: &str, frequency: f64) -> bool {
        if self.exclude_channel_ids.iter().any(|c| c == channel_id) {
            return false;
        }
        let include_by_id =
            self.include_channel_ids.is_empty() || self.include_channel_ids.iter().any(|c| c == channel_id);
        let include_by_freq = self.include_frequencies.is_empty()
            || self
                .include_frequencies
                .iter()
                .any(|f| (f - frequency).abs() < 1e-6);
        if self.include_channel_ids.is_empty() && self.include_frequencies.is_empty() {
            true
        } else {
            include_by_id || include_by_freq
        }
    }

    pub fn time_admitted(&self, time: Instant) -> bool {
        match self.time_window {
            None => true,
            Some((start, end)) => time >= start && time <= end,
        }
    }

    pub fn datagram_admitted(&self, tag: &[u8; 4]) -> bool {
        self.datagram_type_filter.is_empty() || self.datagram_type_filter.contains(tag)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn rolling_capacity(&self) -> Option<usize> {
        self.rolling_capacity
    }

    pub fn preferred_position_types(&self) -> &[String] {
        &self.preferred_position_types
    }

    pub fn preferred_distance_types(&self) -> &[String] {
        &self.preferred_distance_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_include_list_admits_everything() {
        let settings = ReadSettings::default();
        assert!(settings.channel_admitted("GPT 38", 38000.0));
    }

    #[test]
    fn exclude_wins_over_include() {
        let mut settings = ReadSettings::default();
        settings.include_channel("GPT 38");
        settings.exclude_channel("GPT 38");
        assert!(!settings.channel_admitted("GPT 38", 38000.0));
    }

    #[test]
    fn include_list_restricts_to_named_channels() {
        let mut settings = ReadSettings::default();
        settings.include_channel("GPT 120");
        assert!(!settings.channel_admitted("GPT 38", 38000.0));
        assert!(settings.channel_admitted("GPT 120", 120000.0));
    }
}
