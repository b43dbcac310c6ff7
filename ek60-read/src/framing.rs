//! [`FrameReader`], the length-delimited datagram framing reader (spec
//! §4.2). Works over any `Read`, so it's equally at home wrapping a file,
//! a socket, or an in-memory buffer in tests.
use std::convert::TryInto;
use std::io::Read;

use ek60_core::errors::EkError;
use ek60_core::time::{FileTime, Instant};

use crate::datagram::{parse_body, Datagram};

/// Tag and timestamp of a datagram, available via [`FrameReader::peek_header`]
/// before its body is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub tag: [u8; 4],
    pub time: Instant,
}

struct PendingFrame {
    start_offset: u64,
    len: usize,
    tag: [u8; 4],
    time: Instant,
}

/// Reads one length-delimited EK60 datagram frame at a time: `[u32 len]
/// [payload][u32 len]`, where the first 12 bytes of `payload` are the
/// 4-byte type tag and 8-byte FILETIME.
pub struct FrameReader<R: Read> {
    reader: R,
    offset: u64,
    transceiver_count: usize,
    pending: Option<PendingFrame>,
    halted: Option<(u64, String)>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        FrameReader {
            reader,
            offset: 0,
            transceiver_count: 0,
            pending: None,
            halted: None,
        }
    }

    /// Byte offset of the next unread frame.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Tag/time of the next frame without parsing its body. Idempotent:
    /// calling it twice in a row without an intervening `read`/`skip`
    /// returns the same header without touching the stream again.
    pub fn peek_header(&mut self) -> Result<Option<FrameHeader>, EkError> {
        self.check_halted()?;
        if let Some(p) = &self.pending {
            return Ok(Some(FrameHeader {
                tag: p.tag,
                time: p.time,
            }));
        }

        let start = self.offset;
        let len = match self.read_u32()? {
            None => return Ok(None),
            Some(0) => return Err(self.halt(start, "zero-length frame".to_string())),
            Some(len) => len as usize,
        };
        self.offset += 4;

        if len < 12 {
            return Err(self.halt(
                start,
                format!("frame of {} bytes is shorter than the 12-byte datagram header", len),
            ));
        }

        let mut header_bytes = [0u8; 12];
        if let Err(e) = self.reader.read_exact(&mut header_bytes) {
            return Err(self.halt(start, format!("short payload: {}", e)));
        }
        self.offset += 12;

        let tag: [u8; 4] = header_bytes[0..4].try_into()?;
        let low = u32::from_le_bytes(header_bytes[4..8].try_into()?);
        let high = u32::from_le_bytes(header_bytes[8..12].try_into()?);
        let time: Instant = FileTime::new(low, high).into();

        self.pending = Some(PendingFrame {
            start_offset: start,
            len,
            tag,
            time,
        });
        Ok(Some(FrameHeader { tag, time }))
    }

    /// Read and fully parse the next datagram. `Ok(None)` means clean EOF.
    /// Once a `CorruptFrame` has been produced, every later call (to
    /// either `read` or `skip`) returns the same error without touching
    /// the stream again (spec §4.2: "halts further reads").
    pub fn read(&mut self) -> Result<Option<Datagram>, EkError> {
        let pending = match self.take_pending()? {
            Some(p) => p,
            None => return Ok(None),
        };

        let body = self.read_body(&pending)?;

        match parse_body(pending.tag, pending.time, &body, self.transceiver_count) {
            Ok(dg) => {
                if let Datagram::Con0 { header, .. } = &dg {
                    self.transceiver_count = header.transceiver_count();
                }
                Ok(Some(dg))
            }
            Err(e) => Err(e),
        }
    }

    /// Advance past one datagram without building a `Datagram` for it,
    /// still validating the length sentinels.
    pub fn skip(&mut self) -> Result<bool, EkError> {
        let pending = match self.take_pending()? {
            Some(p) => p,
            None => return Ok(false),
        };
        self.read_body(&pending)?;
        Ok(true)
    }

    fn take_pending(&mut self) -> Result<Option<PendingFrame>, EkError> {
        if let Some(p) = self.pending.take() {
            return Ok(Some(p));
        }
        match self.peek_header()? {
            None => Ok(None),
            Some(_) => Ok(self.pending.take()),
        }
    }

    fn read_body(&mut self, pending: &PendingFrame) -> Result<Vec<u8>, EkError> {
        let body_len = pending.len - 12;
        let mut body = vec![0u8; body_len];
        if let Err(e) = self.reader.read_exact(&mut body) {
            return Err(self.halt(pending.start_offset, format!("short payload: {}", e)));
        }
        self.offset += body_len as u64;

        let trailing = match self.read_u32() {
            Ok(Some(v)) => v,
            Ok(None) => {
                return Err(self.halt(pending.start_offset, "missing trailing length field".to_string()))
            }
            Err(e) => return Err(e),
        };
        self.offset += 4;

        if trailing as usize != pending.len {
            return Err(self.halt(
                pending.start_offset,
                format!(
                    "leading length {} does not match trailing length {}",
                    pending.len, trailing
                ),
            ));
        }

        Ok(body)
    }

    fn read_u32(&mut self) -> Result<Option<u32>, EkError> {
        let mut buf = [0u8; 4];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => Ok(Some(u32::from_le_bytes(buf))),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn check_halted(&self) -> Result<(), EkError> {
        if let Some((offset, msg)) = &self.halted {
            return Err(EkError::CorruptFrame {
                offset: *offset,
                msg: msg.clone(),
            });
        }
        Ok(())
    }

    fn halt(&mut self, offset: u64, msg: String) -> EkError {
        self.halted = Some((offset, msg.clone()));
        EkError::CorruptFrame { offset, msg }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Datagram, EkError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read() {
            Ok(Some(dg)) => Some(Ok(dg)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
