use crate::decoders::jpeg::colorspace::{self, Colorspace};
use crate::decoders::jpeg::frame::SamplePlane;

/// A fully decoded image: frame geometry, the detected colorspace and one
/// full-resolution 8-bit sample plane per component. Color conversion is
/// deferred to [`DecodedImage::to_rgb`] / [`DecodedImage::to_rgba`] so callers
/// that want raw planes never pay for it.
#[derive(Debug)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    precision: u8,
    colorspace: Colorspace,
    planes: Vec<SamplePlane>,
}

impl DecodedImage {
    pub fn new(
        width: u32,
        height: u32,
        precision: u8,
        colorspace: Colorspace,
        planes: Vec<SamplePlane>,
    ) -> Self {
        DecodedImage {
            width,
            height,
            precision,
            colorspace,
            planes,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bit precision per sample as declared by the frame header. Planes are
    /// always materialized at 8 bits; wider lossless samples were scaled.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.precision as u32 * self.planes.len() as u32
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn planes(&self) -> &[SamplePlane] {
        &self.planes
    }

    /// Interleaved RGB bytes, `width * height * 3` long.
    pub fn to_rgb(&self) -> Vec<u8> {
        colorspace::to_rgb(&self.planes, self.colorspace, self.width, self.height)
    }

    /// Interleaved RGBA bytes, `width * height * 4` long.
    pub fn to_rgba(&self) -> Vec<u8> {
        colorspace::to_rgba(&self.planes, self.colorspace, self.width, self.height)
    }
}
