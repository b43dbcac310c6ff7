use crate::enums::AbsorptionModel;

/// Basic Error types.
#[derive(Debug)]
pub enum EkError {
    /// TryFromSliceError from the std library.
    TryFromSlice(std::array::TryFromSliceError),
    /// FromUtf8Error from the std library.
    TryFromUtf8(std::string::FromUtf8Error),
    /// IoError from the std library.
    StdIoError(std::io::Error),
    /// Length sentinels at the start and end of a frame disagree, or the
    /// frame claims more bytes than remain in the stream.
    CorruptFrame { offset: u64, msg: String },
    /// A 4-byte datagram tag that is not recognised. Non-fatal: callers
    /// that treat this as an error are opting out of the "log and skip"
    /// default.
    UnknownDatagramType { tag: [u8; 4] },
    /// RAW0 mode bits disagree with the payload byte count actually
    /// present.
    InvalidMode { mode: u16, msg: String },
    /// A user-supplied calibration vector override does not match
    /// n_pings.
    InvalidCalibrationLength { expected: usize, got: usize },
    /// Neither calibration, nor raw per-ping data, nor config supplies a
    /// value for a parameter a transform needs.
    MissingCalibrationParameter { field: String },
    /// Index resolution produced hi < lo.
    InvertedRange { lo: usize, hi: usize },
    /// A ping's pulse_length does not match any entry in the channel's
    /// pulse_length_table within tolerance.
    PulseLengthMismatch { pulse_length: f64 },
    /// NMEA sentence checksum did not validate.
    ChecksumInvalid { sentence: String },
    /// An ECS calibration key that is not in the fixed mapping table.
    UnknownCalibrationKey { key: String },
    /// An enum value could not be parsed from its numeric source.
    ParseEnum { f: String, code: i64 },
    /// Absorption model requested is not implemented.
    UnsupportedAbsorptionModel { model: AbsorptionModel },
    /// Channel id referenced by the caller does not exist in the
    /// container.
    UnknownChannel { channel_id: String },
    #[cfg(feature = "to_json")]
    /// Serialisation/Deserialisation error.
    SerdeError(serde_json::Error),
}

impl From<std::array::TryFromSliceError> for EkError {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Self::TryFromSlice(e)
    }
}

impl From<std::string::FromUtf8Error> for EkError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::TryFromUtf8(e)
    }
}

impl From<std::io::Error> for EkError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl std::fmt::Display for EkError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use self::EkError::*;
        match self {
            #[cfg(feature = "to_json")]
            SerdeError(x) => write!(fmt, "{}", x),
            StdIoError(x) => write!(fmt, "{}", x),
            TryFromSlice(x) => write!(fmt, "{}", x),
            TryFromUtf8(x) => write!(fmt, "{}", x),
            CorruptFrame { offset, msg } => {
                write!(fmt, "Corrupt frame at offset {}: {}", offset, msg)
            }
            UnknownDatagramType { tag } => write!(
                fmt,
                "Unknown datagram type {:?}",
                String::from_utf8_lossy(tag)
            ),
            InvalidMode { mode, msg } => write!(fmt, "Invalid RAW0 mode {}: {}", mode, msg),
            InvalidCalibrationLength { expected, got } => write!(
                fmt,
                "Calibration vector has length {} but channel has {} pings",
                got, expected
            ),
            MissingCalibrationParameter { field } => {
                write!(fmt, "No value available for calibration field '{}'", field)
            }
            InvertedRange { lo, hi } => {
                write!(fmt, "Index range resolved to hi ({}) < lo ({})", hi, lo)
            }
            PulseLengthMismatch { pulse_length } => write!(
                fmt,
                "Pulse length {} does not match any entry in the channel's pulse_length_table",
                pulse_length
            ),
            ChecksumInvalid { sentence } => {
                write!(fmt, "NMEA checksum invalid for sentence: {}", sentence)
            }
            UnknownCalibrationKey { key } => write!(fmt, "Unknown ECS calibration key '{}'", key),
            ParseEnum { f, code } => write!(fmt, "Could not parse source ({}) to {}.", code, f),
            UnsupportedAbsorptionModel { model } => {
                write!(fmt, "Absorption model {:?} is not implemented", model)
            }
            UnknownChannel { channel_id } => write!(fmt, "Unknown channel id '{}'", channel_id),
        }
    }
}

impl From<EkError> for String {
    fn from(e: EkError) -> String {
        e.to_string()
    }
}

impl std::error::Error for EkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use self::EkError::*;
        match self {
            #[cfg(feature = "to_json")]
            SerdeError(x) => x.source(),
            StdIoError(x) => x.source(),
            TryFromSlice(x) => x.source(),
            TryFromUtf8(x) => x.source(),
            _ => None,
        }
    }
}
