mod decoders;
mod image;
mod utils;

pub use decoders::jpeg::colorspace::Colorspace;
pub use decoders::jpeg::{
    AdobeHeader, DecodeOptions, JfifHeader, JpegDecoder, JpegMode, ScanComponent,
};
pub use decoders::jpeg::frame::SamplePlane;
pub use image::DecodedImage;
pub use utils::bitreader::{BitReader, EndOfData, EntropyReader};
pub use utils::error::{JpixError, JpixResult};
pub use utils::info::{ComponentInfo, JpegInfo, ScanInfo};

use std::io::Cursor;

/// Every JPEG stream begins with the SOI marker.
pub const JPEG_SIGNATURE: [u8; 2] = [0xFF, 0xD8];

/// Magic-byte check for the container dispatch layer: does this byte stream
/// belong to the JPEG pipeline?
pub fn matches_signature(data: &[u8]) -> bool {
    data.starts_with(&JPEG_SIGNATURE)
}

/// Decodes an in-memory JPEG stream with default options.
pub fn decode(data: &[u8]) -> JpixResult<DecodedImage> {
    JpegDecoder::new(Cursor::new(data)).decode()
}
