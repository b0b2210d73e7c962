use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug)]
pub enum JpixError {
    IoError(io::Error),
    /// Declared segment length disagrees with the bytes actually present.
    /// Tolerated locally: the reader takes what is available and continues.
    MalformedSegment { marker: u8, detail: String },
    /// A Huffman walk consumed 16 bits without reaching a symbol.
    InvalidHuffmanSequence,
    /// The entropy-coded segment ran out mid-scan under `EndOfData::Fail`.
    UnexpectedEndOfEntropyData,
    UnsupportedPrecision(u8),
    UnsupportedComponentCount(u8),
    Unsupported(String),
    InvalidDimensions { width: u32, height: u32 },
    MissingFrameHeader,
    MissingScanData,
}

impl Error for JpixError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            JpixError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for JpixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JpixError::IoError(err) => write!(f, "I/O error: {}", err),
            JpixError::MalformedSegment { marker, detail } => {
                write!(f, "Malformed segment 0xFF{:02X}: {}", marker, detail)
            }
            JpixError::InvalidHuffmanSequence => write!(f, "Invalid Huffman sequence"),
            JpixError::UnexpectedEndOfEntropyData => write!(f, "Unexpected end of entropy-coded data"),
            JpixError::UnsupportedPrecision(p) => write!(f, "Unsupported sample precision: {}", p),
            JpixError::UnsupportedComponentCount(n) => write!(f, "Unsupported component count: {}", n),
            JpixError::Unsupported(what) => write!(f, "Unsupported: {}", what),
            JpixError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            JpixError::MissingFrameHeader => write!(f, "No frame header (SOF) before scan data"),
            JpixError::MissingScanData => write!(f, "No scan data (SOS) found"),
        }
    }
}

impl From<io::Error> for JpixError {
    fn from(error: io::Error) -> Self {
        JpixError::IoError(error)
    }
}

// Result type alias for jpix operations
pub type JpixResult<T> = Result<T, JpixError>;
