//! Per-tag datagram payload parsers (spec §4.3).
use ek60_core::config::{trim_ascii_field, TransceiverConfig, CAL_TABLE_LEN};
use ek60_core::enums::{BeamType, TransmitMode};
use ek60_core::errors::EkError;
use ek60_core::time::Instant;
use ek60_core::ConfigHeader;

/// Byte length of one `TransceiverConfig` record within a CON0 payload in
/// the reference layout (spec §4.3).
pub const TRANSCEIVER_RECORD_LEN: usize = 320;
/// Byte length of the four fixed-width text fields at the head of CON0.
const CON0_TEXT_FIELD_LEN: usize = 128;

/// A parsed datagram, tagged by its 4-byte type and carrying the
/// datagram header's `Instant` (spec Design Notes: "the reader returns
/// `Datagram::Raw(RawPayload)`, `Datagram::Nmea(…)`, and so on").
#[derive(Debug, Clone)]
pub enum Datagram {
    Con0 { time: Instant, header: ConfigHeader },
    /// Multibeam beam-configuration text; preserved only as an opaque
    /// blob for pass-through (spec §4.3).
    Con1 { time: Instant, raw: Vec<u8> },
    Raw0 { time: Instant, payload: RawPayload },
    Nme0 { time: Instant, text: String },
    Tag0 { time: Instant, text: String },
    Mru0 {
        time: Instant,
        heave: f64,
        roll: f64,
        pitch: f64,
        heading: f64,
    },
    Dep0 {
        time: Instant,
        depth: Vec<f64>,
        reflectivity: Vec<f64>,
    },
    Bot0 { time: Instant, depth: Vec<f64> },
    Unknown {
        time: Instant,
        tag: [u8; 4],
        raw: Vec<u8>,
    },
}

impl Datagram {
    pub fn time(&self) -> Instant {
        match self {
            Datagram::Con0 { time, .. }
            | Datagram::Con1 { time, .. }
            | Datagram::Raw0 { time, .. }
            | Datagram::Nme0 { time, .. }
            | Datagram::Tag0 { time, .. }
            | Datagram::Mru0 { time, .. }
            | Datagram::Dep0 { time, .. }
            | Datagram::Bot0 { time, .. }
            | Datagram::Unknown { time, .. } => *time,
        }
    }
}

/// The body of a RAW0 sample datagram (spec §4.3).
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub channel: u16,
    pub mode: u16,
    pub transducer_depth: f64,
    pub frequency: f64,
    pub transmit_power: f64,
    pub pulse_length: f64,
    pub bandwidth: f64,
    pub sample_interval: f64,
    pub sound_velocity: f64,
    pub absorption_coefficient: f64,
    pub heave: f64,
    pub tx_roll: f64,
    pub tx_pitch: f64,
    pub temperature: f64,
    pub rx_roll: f64,
    pub rx_pitch: f64,
    pub heading: f64,
    pub transmit_mode: TransmitMode,
    pub sample_offset: u32,
    pub sample_count: u32,
    pub power: Vec<i16>,
    pub angle: Option<Vec<u16>>,
}

impl RawPayload {
    pub fn has_power(&self) -> bool {
        self.mode & 0x1 != 0
    }

    pub fn has_angle(&self) -> bool {
        self.mode & 0x2 != 0
    }
}

/// A tiny sequential little-endian byte cursor, in the spirit of the
/// teacher's byte-range-with-endianness-switch parsing idiom, specialised
/// to LE since spec §6.1 fixes the binary format as little-endian
/// throughout.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], EkError> {
        if self.pos + len > self.bytes.len() {
            return Err(EkError::CorruptFrame {
                offset: self.pos as u64,
                msg: format!("expected {} more bytes, found {}", len, self.bytes.len() - self.pos),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, EkError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into()?))
    }

    fn u32(&mut self) -> Result<u32, EkError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into()?))
    }

    fn f32(&mut self) -> Result<f32, EkError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into()?))
    }

    fn i16(&mut self) -> Result<i16, EkError> {
        Ok(i16::from_le_bytes(self.take(2)?.try_into()?))
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

pub fn parse_con0(time: Instant, body: &[u8]) -> Result<Datagram, EkError> {
    let mut c = Cursor::new(body);
    let survey_name = trim_ascii_field(c.take(CON0_TEXT_FIELD_LEN)?);
    let transect_name = trim_ascii_field(c.take(CON0_TEXT_FIELD_LEN)?);
    let sounder_name = trim_ascii_field(c.take(CON0_TEXT_FIELD_LEN)?);
    let version = trim_ascii_field(c.take(CON0_TEXT_FIELD_LEN)?);
    let transceiver_count = c.u32()? as usize;

    let mut transceivers = Vec::with_capacity(transceiver_count);
    for _ in 0..transceiver_count {
        let record = c.take(TRANSCEIVER_RECORD_LEN)?;
        transceivers.push(parse_transceiver_config(record)?);
    }

    Ok(Datagram::Con0 {
        time,
        header: ConfigHeader {
            survey_name,
            transect_name,
            sounder_name,
            version,
            transceivers,
        },
    })
}

fn parse_transceiver_config(record: &[u8]) -> Result<TransceiverConfig, EkError> {
    let mut c = Cursor::new(record);
    let channel_id = trim_ascii_field(c.take(128)?);
    let beam_type = BeamType::new(c.u16()? as u8);
    let frequency = c.f32()? as f64;
    let equivalent_beam_angle = c.f32()? as f64;
    let gain = c.f32()? as f64;
    let beamwidth_alongship = c.f32()? as f64;
    let beamwidth_athwartship = c.f32()? as f64;
    let angle_sensitivity_alongship = c.f32()? as f64;
    let angle_sensitivity_athwartship = c.f32()? as f64;
    let angle_offset_alongship = c.f32()? as f64;
    let angle_offset_athwartship = c.f32()? as f64;
    let position = [c.f32()? as f64, c.f32()? as f64, c.f32()? as f64];
    let direction = [c.f32()? as f64, c.f32()? as f64, c.f32()? as f64];
    let mut pulse_length_table = [0.0f64; CAL_TABLE_LEN];
    for slot in pulse_length_table.iter_mut() {
        *slot = c.f32()? as f64;
    }
    let mut gain_table = [0.0f64; CAL_TABLE_LEN];
    for slot in gain_table.iter_mut() {
        *slot = c.f32()? as f64;
    }
    let mut sa_correction_table = [0.0f64; CAL_TABLE_LEN];
    for slot in sa_correction_table.iter_mut() {
        *slot = c.f32()? as f64;
    }
    // Remaining bytes up to TRANSCEIVER_RECORD_LEN are reserved spare.

    Ok(TransceiverConfig {
        channel_id,
        beam_type,
        frequency,
        equivalent_beam_angle,
        gain,
        beamwidth_alongship,
        beamwidth_athwartship,
        angle_sensitivity_alongship,
        angle_sensitivity_athwartship,
        angle_offset_alongship,
        angle_offset_athwartship,
        position,
        direction,
        pulse_length_table,
        gain_table,
        sa_correction_table,
    })
}

pub fn parse_con1(time: Instant, body: &[u8]) -> Datagram {
    Datagram::Con1 {
        time,
        raw: body.to_vec(),
    }
}

pub fn parse_raw0(time: Instant, body: &[u8]) -> Result<Datagram, EkError> {
    let mut c = Cursor::new(body);
    let channel = c.u16()?;
    let mode = c.u16()?;
    let transducer_depth = c.f32()? as f64;
    let frequency = c.f32()? as f64;
    let transmit_power = c.f32()? as f64;
    let pulse_length = c.f32()? as f64;
    let bandwidth = c.f32()? as f64;
    let sample_interval = c.f32()? as f64;
    let sound_velocity = c.f32()? as f64;
    let absorption_coefficient = c.f32()? as f64;
    let heave = c.f32()? as f64;
    let tx_roll = c.f32()? as f64;
    let tx_pitch = c.f32()? as f64;
    let temperature = c.f32()? as f64;
    let rx_roll = c.f32()? as f64;
    let rx_pitch = c.f32()? as f64;
    let heading = c.f32()? as f64;
    let transmit_mode = TransmitMode::new(c.u16()?);
    c.take(6)?; // spare
    let sample_offset = c.u32()?;
    let count = c.u32()? as usize;

    let has_power = mode & 0x1 != 0;
    let has_angle = mode & 0x2 != 0;

    let power = if has_power {
        let mut power = Vec::with_capacity(count);
        for _ in 0..count {
            power.push(c.i16()?);
        }
        power
    } else {
        Vec::new()
    };

    let angle = if has_angle {
        let mut angle = Vec::with_capacity(count);
        for _ in 0..count {
            angle.push(c.u16()?);
        }
        Some(angle)
    } else {
        None
    };

    Ok(Datagram::Raw0 {
        time,
        payload: RawPayload {
            channel,
            mode,
            transducer_depth,
            frequency,
            transmit_power,
            pulse_length,
            bandwidth,
            sample_interval,
            sound_velocity,
            absorption_coefficient,
            heave,
            tx_roll,
            tx_pitch,
            temperature,
            rx_roll,
            rx_pitch,
            heading,
            transmit_mode,
            sample_offset,
            sample_count: count as u32,
            power,
            angle,
        },
    })
}

pub fn parse_nme0(time: Instant, body: &[u8]) -> Datagram {
    Datagram::Nme0 {
        time,
        text: ascii_from_terminated_bytes(body),
    }
}

pub fn parse_tag0(time: Instant, body: &[u8]) -> Datagram {
    Datagram::Tag0 {
        time,
        text: ascii_from_terminated_bytes(body),
    }
}

pub fn parse_mru0(time: Instant, body: &[u8]) -> Result<Datagram, EkError> {
    let mut c = Cursor::new(body);
    let heave = c.f32()? as f64;
    let roll = c.f32()? as f64;
    let pitch = c.f32()? as f64;
    let heading = c.f32()? as f64;
    Ok(Datagram::Mru0 {
        time,
        heave,
        roll,
        pitch,
        heading,
    })
}

pub fn parse_dep0(time: Instant, body: &[u8], transceiver_count: usize) -> Result<Datagram, EkError> {
    let mut c = Cursor::new(body);
    let depth = read_f32_vec(&mut c, transceiver_count)?;
    let reflectivity = read_f32_vec(&mut c, transceiver_count)?;
    // A trailing `transceiver_count` floats of "unused" data follows per
    // spec §4.3; read and discard if present.
    let _unused = read_f32_vec(&mut c, transceiver_count).unwrap_or_default();
    Ok(Datagram::Dep0 {
        time,
        depth,
        reflectivity,
    })
}

pub fn parse_bot0(time: Instant, body: &[u8], transceiver_count: usize) -> Result<Datagram, EkError> {
    let mut c = Cursor::new(body);
    let depth = read_f32_vec(&mut c, transceiver_count)?;
    Ok(Datagram::Bot0 { time, depth })
}

fn read_f32_vec(c: &mut Cursor, count: usize) -> Result<Vec<f64>, EkError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(c.f32()? as f64);
    }
    Ok(out)
}

fn ascii_from_terminated_bytes(body: &[u8]) -> String {
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    String::from_utf8_lossy(&body[..end]).trim_end().to_string()
}

/// Dispatch by 4-byte tag (spec §4.3). `transceiver_count` is needed to
/// size DEP0/BOT0 payloads and must come from the file's CON0 (zero
/// before it has been seen, in which case DEP0/BOT0 decode to empty
/// vectors).
pub fn parse_body(
    tag: [u8; 4],
    time: Instant,
    body: &[u8],
    transceiver_count: usize,
) -> Result<Datagram, EkError> {
    match &tag {
        b"CON0" => parse_con0(time, body),
        b"CON1" => Ok(parse_con1(time, body)),
        b"RAW0" => parse_raw0(time, body),
        b"NME0" => Ok(parse_nme0(time, body)),
        b"TAG0" => Ok(parse_tag0(time, body)),
        b"MRU0" => parse_mru0(time, body),
        b"DEP0" => parse_dep0(time, body, transceiver_count),
        b"BOT0" => parse_bot0(time, body, transceiver_count),
        _ => {
            log::warn!("skipping unknown datagram type {:?}", String::from_utf8_lossy(&tag));
            Ok(Datagram::Unknown {
                time,
                tag,
                raw: body.to_vec(),
            })
        }
    }
}
