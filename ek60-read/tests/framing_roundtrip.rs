//! Synthetic byte-stream round trip through `FrameReader`, covering the
//! framing/parsing boundary end to end rather than one function at a time.
use std::io::Cursor;

use ek60_core::errors::EkError;
use ek60_read::{Datagram, FrameReader};

fn le_f32(v: f32) -> [u8; 4] {
    v.to_le_bytes()
}

fn text_field(s: &str, len: usize) -> Vec<u8> {
    let mut field = vec![0u8; len];
    field[..s.len()].copy_from_slice(s.as_bytes());
    field
}

fn transceiver_record(channel_id: &str, frequency: f32) -> Vec<u8> {
    let mut record = Vec::with_capacity(320);
    record.extend(text_field(channel_id, 128));
    record.extend_from_slice(&1u16.to_le_bytes());
    record.extend_from_slice(&le_f32(frequency));
    for _ in 0..8 {
        record.extend_from_slice(&le_f32(0.0));
    }
    for _ in 0..6 {
        record.extend_from_slice(&le_f32(0.0));
    }
    for v in [0.000256f32, 0.000512, 0.001024, 0.002048, 0.004096] {
        record.extend_from_slice(&le_f32(v));
    }
    for _ in 0..10 {
        record.extend_from_slice(&le_f32(0.0));
    }
    record.resize(320, 0);
    record
}

fn con0_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(text_field("survey", 128));
    body.extend(text_field("transect", 128));
    body.extend(text_field("ER60", 128));
    body.extend(text_field("2.4.3", 128));
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend(transceiver_record("GPT 38", 38000.0));
    body
}

fn raw0_body(power: &[i16]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    for _ in 0..14 {
        body.extend_from_slice(&le_f32(0.0));
    }
    body.extend_from_slice(&0u16.to_le_bytes());
    body.extend_from_slice(&[0u8; 6]);
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&(power.len() as u32).to_le_bytes());
    for &p in power {
        body.extend_from_slice(&p.to_le_bytes());
    }
    body
}

fn frame(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let low = 0xD53E_8000u32;
    let high = 0x01D8_9A54u32;
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
fn reads_con0_raw0_tag0_in_sequence() {
    let mut bytes = frame(b"CON0", &con0_body());
    bytes.extend(frame(b"RAW0", &raw0_body(&[10, 20, 30])));
    bytes.extend(frame(b"TAG0", b"survey start\0"));

    let mut reader = FrameReader::new(Cursor::new(bytes));

    match reader.read().unwrap().unwrap() {
        Datagram::Con0 { header, .. } => {
            assert_eq!(header.transceiver_count(), 1);
            assert_eq!(header.transceivers[0].channel_id, "GPT 38");
        }
        other => panic!("expected Con0, got {:?}", other),
    }

    match reader.read().unwrap().unwrap() {
        Datagram::Raw0 { payload, .. } => {
            assert_eq!(payload.power, vec![10, 20, 30]);
            assert!(payload.angle.is_none());
        }
        other => panic!("expected Raw0, got {:?}", other),
    }

    match reader.read().unwrap().unwrap() {
        Datagram::Tag0 { text, .. } => assert_eq!(text, "survey start"),
        other => panic!("expected Tag0, got {:?}", other),
    }

    assert!(reader.read().unwrap().is_none());
}

#[test]
fn truncated_trailing_length_is_reported_as_corrupt_frame() {
    let mut bytes = frame(b"TAG0", b"ok\0");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let mut reader = FrameReader::new(Cursor::new(bytes));
    match reader.read() {
        Err(EkError::CorruptFrame { .. }) => {}
        other => panic!("expected CorruptFrame, got {:?}", other),
    }
}

#[test]
fn unknown_datagram_type_does_not_halt_the_stream() {
    let mut bytes = frame(b"ZZZZ", b"\x01\x02\x03");
    bytes.extend(frame(b"TAG0", b"after unknown\0"));

    let mut reader = FrameReader::new(Cursor::new(bytes));
    match reader.read().unwrap().unwrap() {
        Datagram::Unknown { tag, .. } => assert_eq!(&tag, b"ZZZZ"),
        other => panic!("expected Unknown, got {:?}", other),
    }
    match reader.read().unwrap().unwrap() {
        Datagram::Tag0 { text, .. } => assert_eq!(text, "after unknown"),
        other => panic!("expected Tag0, got {:?}", other),
    }
}
