//! End-to-end ingest: build a tiny synthetic `.raw` byte stream (one CON0,
//! one RAW0 ping) on disk and drive it through the public `EkData` API,
//! reproducing spec.md's Scenario 2/6 shapes without the parser internals.
use std::io::Write;

use ek60::EkData;
use ek60::ek60_core::settings::ReadSettings;

const TRANSCEIVER_RECORD_LEN: usize = 320;

fn le_f32(v: f32) -> [u8; 4] {
    v.to_le_bytes()
}

fn text_field(s: &str, len: usize) -> Vec<u8> {
    let mut field = vec![0u8; len];
    field[..s.len()].copy_from_slice(s.as_bytes());
    field
}

fn transceiver_record(channel_id: &str, frequency: f32) -> Vec<u8> {
    let mut record = Vec::with_capacity(TRANSCEIVER_RECORD_LEN);
    record.extend(text_field(channel_id, 128));
    record.extend_from_slice(&1u16.to_le_bytes()); // beam_type: SplitBeam
    record.extend_from_slice(&le_f32(frequency));
    record.extend_from_slice(&le_f32(-20.7)); // equivalent_beam_angle
    record.extend_from_slice(&le_f32(26.5)); // gain
    record.extend_from_slice(&le_f32(7.0)); // beamwidth_alongship
    record.extend_from_slice(&le_f32(7.0)); // beamwidth_athwartship
    record.extend_from_slice(&le_f32(21.9)); // angle_sensitivity_alongship
    record.extend_from_slice(&le_f32(21.9)); // angle_sensitivity_athwartship
    record.extend_from_slice(&le_f32(0.0)); // angle_offset_alongship
    record.extend_from_slice(&le_f32(0.0)); // angle_offset_athwartship
    for _ in 0..3 {
        record.extend_from_slice(&le_f32(0.0)); // position
    }
    for _ in 0..3 {
        record.extend_from_slice(&le_f32(0.0)); // direction
    }
    for v in [0.000256, 0.000512, 0.001024, 0.002048, 0.004096] {
        record.extend_from_slice(&le_f32(v));
    }
    for v in [25.0, 25.5, 26.5, 26.0, 25.0] {
        record.extend_from_slice(&le_f32(v));
    }
    for v in [0.0, -0.1, -0.7, -0.2, 0.0] {
        record.extend_from_slice(&le_f32(v));
    }
    record.resize(TRANSCEIVER_RECORD_LEN, 0);
    record
}

fn con0_body(channel_id: &str, frequency: f32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(text_field("survey", 128));
    body.extend(text_field("transect", 128));
    body.extend(text_field("ER60", 128));
    body.extend(text_field("2.4.3", 128));
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend(transceiver_record(channel_id, frequency));
    body
}

fn raw0_body(power: &[i16]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_le_bytes()); // channel (1-based)
    body.extend_from_slice(&1u16.to_le_bytes()); // mode: power only
    let floats: [f32; 15] = [
        9.15,   // transducer_depth
        38000.0, // frequency
        2000.0, // transmit_power
        0.001024, // pulse_length
        2425.0, // bandwidth
        0.000256, // sample_interval
        1500.0, // sound_velocity
        0.00986, // absorption_coefficient
        0.0,    // heave
        0.0,    // tx_roll
        0.0,    // tx_pitch
        8.0,    // temperature
        0.0,    // rx_roll
        0.0,    // rx_pitch
        0.0,    // heading
    ];
    for f in floats {
        body.extend_from_slice(&le_f32(f));
    }
    body.extend_from_slice(&0u16.to_le_bytes()); // transmit_mode: Active
    body.extend_from_slice(&[0u8; 6]); // spare
    body.extend_from_slice(&0u32.to_le_bytes()); // sample_offset
    body.extend_from_slice(&(power.len() as u32).to_le_bytes());
    for &p in power {
        body.extend_from_slice(&p.to_le_bytes());
    }
    body
}

/// FILETIME for 2022-10-01T00:00:00Z, reused from the framing reader's own
/// fixture constant.
fn filetime_2022_10_01() -> (u32, u32) {
    (0xD53E_8000, 0x01D8_9A54)
}

fn frame(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let (low, high) = filetime_2022_10_01();
    let mut payload = Vec::new();
    payload.extend_from_slice(tag);
    payload.extend_from_slice(&low.to_le_bytes());
    payload.extend_from_slice(&high.to_le_bytes());
    payload.extend_from_slice(body);

    let mut out = Vec::new();
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out
}

#[test]
fn reads_a_synthetic_con0_raw0_file_end_to_end() {
    let mut bytes = frame(b"CON0", &con0_body("GPT 38", 38000.0));
    bytes.extend(frame(b"RAW0", &raw0_body(&[100, 2560, 500])));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let mut data = EkData::new();
    let report = data.read_raw(&[file.path()], &ReadSettings::default()).unwrap();
    assert_eq!(report.n_files, 1);
    assert_eq!(report.n_datagrams, 2);
    assert_eq!(report.n_pings, 1);
    assert!(!report.truncated);

    assert_eq!(data.channel_ids(), vec!["GPT 38".to_string()]);

    let raw = data.get_raw("GPT 38").unwrap();
    assert_eq!(raw.n_pings(), 1);
    assert_eq!(raw.n_samples(), 3);
    assert_eq!(raw.power_row(0), &[100, 2560, 500]);

    let power = data.get_power("GPT 38", None).unwrap();
    assert_eq!(power.n_pings(), 1);
    assert_eq!(power.n_samples(), 3);

    let sv = data.get_sv("GPT 38", None, false, None).unwrap();
    assert_eq!(sv.n_pings(), 1);
    assert!(sv.row(0).iter().all(|v| v.is_finite() || v.is_nan()));
}

#[test]
fn channel_allow_list_excludes_unlisted_channels() {
    let mut bytes = frame(b"CON0", &con0_body("GPT 38", 38000.0));
    bytes.extend(frame(b"RAW0", &raw0_body(&[100, 200])));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let mut settings = ReadSettings::default();
    settings.include_channel("GPT 120");

    let mut data = EkData::new();
    data.read_raw(&[file.path()], &settings).unwrap();
    assert!(data.channel_ids().is_empty());
}
