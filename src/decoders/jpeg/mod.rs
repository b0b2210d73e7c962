pub mod colorspace;
pub mod frame;
pub mod huffman;
pub mod idct;
pub mod lossless;
pub mod scan;
pub mod upsample;

use crate::image::DecodedImage;
use crate::utils::bitreader::{BitReader, EndOfData};
use crate::utils::error::{JpixError, JpixResult};
use crate::utils::info::{ComponentInfo, JpegInfo, ScanInfo};
use crate::utils::marker::Marker;
use crate::{log_debug, log_warn};
use colorspace::Colorspace;
use frame::{Component, Frame, SamplePlane};
use huffman::HuffmanTable;
use scan::{ScanComponentTables, ScanDecoder};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub enum JpegMarker {
    // Start Of Frame markers, non-differential, Huffman coding
    SOF0, // Baseline DCT
    SOF1, // Extended sequential DCT
    SOF2, // Progressive DCT
    SOF3, // Lossless (sequential)

    // Start Of Frame markers, differential, Huffman coding
    SOF5, // Differential sequential DCT
    SOF6, // Differential progressive DCT
    SOF7, // Differential lossless (sequential)

    // Start Of Frame markers, non-differential, arithmetic coding
    JPG,   // Reserved for JPEG extensions
    SOF9,  // Extended sequential DCT
    SOF10, // Progressive DCT
    SOF11, // Lossless (sequential)

    // Start Of Frame markers, differential, arithmetic coding
    SOF13, // Differential sequential DCT
    SOF14, // Differential progressive DCT
    SOF15, // Differential lossless (sequential)

    // Huffman table specification
    DHT, // Define Huffman table(s)

    // Arithmetic coding conditioning specification
    DAC, // Define arithmetic coding conditioning(s)

    // Restart interval termination
    RST0,
    RST1,
    RST2,
    RST3,
    RST4,
    RST5,
    RST6,
    RST7,

    // Other markers
    SOI, // Start of image
    EOI, // End of image
    SOS, // Start of scan
    DQT, // Define quantization table(s)
    DNL, // Define number of lines
    DRI, // Define restart interval
    DHP, // Define hierarchical progression
    EXP, // Expand reference component(s)

    // Application segments
    APP0,
    APP1,
    APP2,
    APP3,
    APP4,
    APP5,
    APP6,
    APP7,
    APP8,
    APP9,
    APP10,
    APP11,
    APP12,
    APP13,
    APP14,
    APP15,

    // JPEG extensions
    JPG0,
    JPG1,
    JPG2,
    JPG3,
    JPG4,
    JPG5,
    JPG6,
    JPG7,
    JPG8,
    JPG9,
    JPG10,
    JPG11,
    JPG12,
    JPG13,

    COM, // Comment

    // For temporary private use in arithmetic coding
    TEM,
}

impl Marker for JpegMarker {
    fn from_u16(value: u16) -> Option<JpegMarker> {
        match value {
            0xFFC0 => Some(JpegMarker::SOF0),
            0xFFC1 => Some(JpegMarker::SOF1),
            0xFFC2 => Some(JpegMarker::SOF2),
            0xFFC3 => Some(JpegMarker::SOF3),
            0xFFC5 => Some(JpegMarker::SOF5),
            0xFFC6 => Some(JpegMarker::SOF6),
            0xFFC7 => Some(JpegMarker::SOF7),
            0xFFC8 => Some(JpegMarker::JPG),
            0xFFC9 => Some(JpegMarker::SOF9),
            0xFFCA => Some(JpegMarker::SOF10),
            0xFFCB => Some(JpegMarker::SOF11),
            0xFFCD => Some(JpegMarker::SOF13),
            0xFFCE => Some(JpegMarker::SOF14),
            0xFFCF => Some(JpegMarker::SOF15),
            0xFFC4 => Some(JpegMarker::DHT),
            0xFFCC => Some(JpegMarker::DAC),
            0xFFD0 => Some(JpegMarker::RST0),
            0xFFD1 => Some(JpegMarker::RST1),
            0xFFD2 => Some(JpegMarker::RST2),
            0xFFD3 => Some(JpegMarker::RST3),
            0xFFD4 => Some(JpegMarker::RST4),
            0xFFD5 => Some(JpegMarker::RST5),
            0xFFD6 => Some(JpegMarker::RST6),
            0xFFD7 => Some(JpegMarker::RST7),
            0xFFD8 => Some(JpegMarker::SOI),
            0xFFD9 => Some(JpegMarker::EOI),
            0xFFDA => Some(JpegMarker::SOS),
            0xFFDB => Some(JpegMarker::DQT),
            0xFFDC => Some(JpegMarker::DNL),
            0xFFDD => Some(JpegMarker::DRI),
            0xFFDE => Some(JpegMarker::DHP),
            0xFFDF => Some(JpegMarker::EXP),
            0xFFE0 => Some(JpegMarker::APP0),
            0xFFE1 => Some(JpegMarker::APP1),
            0xFFE2 => Some(JpegMarker::APP2),
            0xFFE3 => Some(JpegMarker::APP3),
            0xFFE4 => Some(JpegMarker::APP4),
            0xFFE5 => Some(JpegMarker::APP5),
            0xFFE6 => Some(JpegMarker::APP6),
            0xFFE7 => Some(JpegMarker::APP7),
            0xFFE8 => Some(JpegMarker::APP8),
            0xFFE9 => Some(JpegMarker::APP9),
            0xFFEA => Some(JpegMarker::APP10),
            0xFFEB => Some(JpegMarker::APP11),
            0xFFEC => Some(JpegMarker::APP12),
            0xFFED => Some(JpegMarker::APP13),
            0xFFEE => Some(JpegMarker::APP14),
            0xFFEF => Some(JpegMarker::APP15),
            0xFFF0 => Some(JpegMarker::JPG0),
            0xFFF1 => Some(JpegMarker::JPG1),
            0xFFF2 => Some(JpegMarker::JPG2),
            0xFFF3 => Some(JpegMarker::JPG3),
            0xFFF4 => Some(JpegMarker::JPG4),
            0xFFF5 => Some(JpegMarker::JPG5),
            0xFFF6 => Some(JpegMarker::JPG6),
            0xFFF7 => Some(JpegMarker::JPG7),
            0xFFF8 => Some(JpegMarker::JPG8),
            0xFFF9 => Some(JpegMarker::JPG9),
            0xFFFA => Some(JpegMarker::JPG10),
            0xFFFB => Some(JpegMarker::JPG11),
            0xFFFC => Some(JpegMarker::JPG12),
            0xFFFD => Some(JpegMarker::JPG13),
            0xFFFE => Some(JpegMarker::COM),
            0xFF01 => Some(JpegMarker::TEM),
            _ => None,
        }
    }

    fn to_u16(&self) -> u16 {
        match self {
            JpegMarker::SOF0 => 0xFFC0,
            JpegMarker::SOF1 => 0xFFC1,
            JpegMarker::SOF2 => 0xFFC2,
            JpegMarker::SOF3 => 0xFFC3,
            JpegMarker::SOF5 => 0xFFC5,
            JpegMarker::SOF6 => 0xFFC6,
            JpegMarker::SOF7 => 0xFFC7,
            JpegMarker::JPG => 0xFFC8,
            JpegMarker::SOF9 => 0xFFC9,
            JpegMarker::SOF10 => 0xFFCA,
            JpegMarker::SOF11 => 0xFFCB,
            JpegMarker::SOF13 => 0xFFCD,
            JpegMarker::SOF14 => 0xFFCE,
            JpegMarker::SOF15 => 0xFFCF,
            JpegMarker::DHT => 0xFFC4,
            JpegMarker::DAC => 0xFFCC,
            JpegMarker::RST0 => 0xFFD0,
            JpegMarker::RST1 => 0xFFD1,
            JpegMarker::RST2 => 0xFFD2,
            JpegMarker::RST3 => 0xFFD3,
            JpegMarker::RST4 => 0xFFD4,
            JpegMarker::RST5 => 0xFFD5,
            JpegMarker::RST6 => 0xFFD6,
            JpegMarker::RST7 => 0xFFD7,
            JpegMarker::SOI => 0xFFD8,
            JpegMarker::EOI => 0xFFD9,
            JpegMarker::SOS => 0xFFDA,
            JpegMarker::DQT => 0xFFDB,
            JpegMarker::DNL => 0xFFDC,
            JpegMarker::DRI => 0xFFDD,
            JpegMarker::DHP => 0xFFDE,
            JpegMarker::EXP => 0xFFDF,
            JpegMarker::APP0 => 0xFFE0,
            JpegMarker::APP1 => 0xFFE1,
            JpegMarker::APP2 => 0xFFE2,
            JpegMarker::APP3 => 0xFFE3,
            JpegMarker::APP4 => 0xFFE4,
            JpegMarker::APP5 => 0xFFE5,
            JpegMarker::APP6 => 0xFFE6,
            JpegMarker::APP7 => 0xFFE7,
            JpegMarker::APP8 => 0xFFE8,
            JpegMarker::APP9 => 0xFFE9,
            JpegMarker::APP10 => 0xFFEA,
            JpegMarker::APP11 => 0xFFEB,
            JpegMarker::APP12 => 0xFFEC,
            JpegMarker::APP13 => 0xFFED,
            JpegMarker::APP14 => 0xFFEE,
            JpegMarker::APP15 => 0xFFEF,
            JpegMarker::JPG0 => 0xFFF0,
            JpegMarker::JPG1 => 0xFFF1,
            JpegMarker::JPG2 => 0xFFF2,
            JpegMarker::JPG3 => 0xFFF3,
            JpegMarker::JPG4 => 0xFFF4,
            JpegMarker::JPG5 => 0xFFF5,
            JpegMarker::JPG6 => 0xFFF6,
            JpegMarker::JPG7 => 0xFFF7,
            JpegMarker::JPG8 => 0xFFF8,
            JpegMarker::JPG9 => 0xFFF9,
            JpegMarker::JPG10 => 0xFFFA,
            JpegMarker::JPG11 => 0xFFFB,
            JpegMarker::JPG12 => 0xFFFC,
            JpegMarker::JPG13 => 0xFFFD,
            JpegMarker::COM => 0xFFFE,
            JpegMarker::TEM => 0xFF01,
        }
    }
}

static JPEG_MARKERS: [JpegMarker; 64] = [
    JpegMarker::SOF0,
    JpegMarker::SOF1,
    JpegMarker::SOF2,
    JpegMarker::SOF3,
    JpegMarker::SOF5,
    JpegMarker::SOF6,
    JpegMarker::SOF7,
    JpegMarker::JPG,
    JpegMarker::SOF9,
    JpegMarker::SOF10,
    JpegMarker::SOF11,
    JpegMarker::SOF13,
    JpegMarker::SOF14,
    JpegMarker::SOF15,
    JpegMarker::DHT,
    JpegMarker::DAC,
    JpegMarker::RST0,
    JpegMarker::RST1,
    JpegMarker::RST2,
    JpegMarker::RST3,
    JpegMarker::RST4,
    JpegMarker::RST5,
    JpegMarker::RST6,
    JpegMarker::RST7,
    JpegMarker::SOI,
    JpegMarker::EOI,
    JpegMarker::SOS,
    JpegMarker::DQT,
    JpegMarker::DNL,
    JpegMarker::DRI,
    JpegMarker::DHP,
    JpegMarker::EXP,
    JpegMarker::APP0,
    JpegMarker::APP1,
    JpegMarker::APP2,
    JpegMarker::APP3,
    JpegMarker::APP4,
    JpegMarker::APP5,
    JpegMarker::APP6,
    JpegMarker::APP7,
    JpegMarker::APP8,
    JpegMarker::APP9,
    JpegMarker::APP10,
    JpegMarker::APP11,
    JpegMarker::APP12,
    JpegMarker::APP13,
    JpegMarker::APP14,
    JpegMarker::APP15,
    JpegMarker::JPG0,
    JpegMarker::JPG1,
    JpegMarker::JPG2,
    JpegMarker::JPG3,
    JpegMarker::JPG4,
    JpegMarker::JPG5,
    JpegMarker::JPG6,
    JpegMarker::JPG7,
    JpegMarker::JPG8,
    JpegMarker::JPG9,
    JpegMarker::JPG10,
    JpegMarker::JPG11,
    JpegMarker::JPG12,
    JpegMarker::JPG13,
    JpegMarker::COM,
    JpegMarker::TEM,
];

/// Zigzag-index to natural (row-major) position for 8x8 blocks.
#[rustfmt::skip]
pub(crate) const ZIGZAG: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

// Table K.1, substituted when a component references a table never defined.
#[rustfmt::skip]
const DEFAULT_QUANTIZATION_TABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum JpegMode {
    Baseline,
    ExtendedSequential,
    Progressive,
    Lossless,
}

#[derive(Debug, Clone)]
pub struct QuantizationTable {
    pub id: u8,
    /// Entries in natural order; the zigzag remap happens at parse time.
    pub table: [u16; 64],
}

#[derive(Debug, Clone, Serialize)]
pub struct JfifHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,
    pub thumbnail_width: u8,
    pub thumbnail_height: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdobeHeader {
    pub version: u16,
    pub flags0: u16,
    pub flags1: u16,
    pub color_transform: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanComponent {
    pub component_id: u8,
    pub dc_table_selector: u8,
    pub ac_table_selector: u8,
}

/// One SOS segment with its entropy-coded data and a snapshot of the table
/// state at that point in the stream (later DHT/DRI segments must not leak
/// backwards into earlier scans).
#[derive(Debug, Clone)]
struct Scan {
    spectral_start: u8,
    spectral_end: u8,
    successive_high: u8,
    successive_low: u8,
    components: Vec<ScanComponent>,
    dc_tables: [Option<HuffmanTable>; 4],
    ac_tables: [Option<HuffmanTable>; 4],
    restart_interval: u16,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct SofInfo {
    precision: u8,
    width: u32,
    height: u32,
    components: Vec<(u8, u8, u8)>, // (id, h<<4|v, qtable id)
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Edge-weighted interpolation for the 2:1 chroma cases. Off, those
    /// components go through the 16x16 scaling transform instead.
    pub fancy_upsampling: bool,
    /// Policy for entropy data that ends before the scan is complete.
    pub end_of_data: EndOfData,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            fancy_upsampling: true,
            end_of_data: EndOfData::Pad,
        }
    }
}

pub struct JpegDecoder<R: Read + Seek> {
    reader: BitReader<R>,
    options: DecodeOptions,
    mode: JpegMode,
    sof: Option<SofInfo>,
    number_of_lines: Option<u16>,
    quantization_tables: [Option<QuantizationTable>; 4],
    dc_huffman_tables: [Option<HuffmanTable>; 4],
    ac_huffman_tables: [Option<HuffmanTable>; 4],
    restart_interval: u16,
    scans: Vec<Scan>,
    comments: Vec<String>,
    jfif_header: Option<JfifHeader>,
    adobe_header: Option<AdobeHeader>,
    /// Unrecognized segments, kept opaque.
    unknown_segments: Vec<(u8, Vec<u8>)>,
}

impl<R: Read + Seek> JpegDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self {
            reader: BitReader::new(reader),
            options,
            mode: JpegMode::Baseline,
            sof: None,
            number_of_lines: None,
            quantization_tables: [None, None, None, None],
            dc_huffman_tables: [None, None, None, None],
            ac_huffman_tables: [None, None, None, None],
            restart_interval: 0,
            scans: Vec::new(),
            comments: Vec::new(),
            jfif_header: None,
            adobe_header: None,
            unknown_segments: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.sof.as_ref().map(|s| s.width).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        let declared = self.sof.as_ref().map(|s| s.height).unwrap_or(0);
        if declared == 0 {
            self.number_of_lines.unwrap_or(0) as u32
        } else {
            declared
        }
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Segments whose markers were not recognized, kept as raw payloads.
    pub fn unknown_segments(&self) -> &[(u8, Vec<u8>)] {
        &self.unknown_segments
    }

    pub fn get_info(&self) -> JpegInfo {
        let components = self
            .sof
            .as_ref()
            .map(|sof| {
                sof.components
                    .iter()
                    .map(|&(id, hv, qid)| ComponentInfo {
                        id,
                        horizontal_sampling_factor: hv >> 4,
                        vertical_sampling_factor: hv & 0x0F,
                        quantization_table_id: qid,
                    })
                    .collect()
            })
            .unwrap_or_default();

        JpegInfo {
            width: self.width(),
            height: self.height(),
            precision: self.sof.as_ref().map(|s| s.precision).unwrap_or(0),
            mode: self.mode,
            component_count: self.sof.as_ref().map(|s| s.components.len() as u8).unwrap_or(0),
            components,
            restart_interval: self.restart_interval,
            quantization_table_ids: self
                .quantization_tables
                .iter()
                .flatten()
                .map(|t| t.id)
                .collect(),
            dc_table_ids: self.dc_huffman_tables.iter().flatten().map(|t| t.id).collect(),
            ac_table_ids: self.ac_huffman_tables.iter().flatten().map(|t| t.id).collect(),
            jfif_header: self.jfif_header.clone(),
            adobe_header: self.adobe_header.clone(),
            comments: self.comments.clone(),
            scans: self
                .scans
                .iter()
                .map(|scan| ScanInfo {
                    spectral_start: scan.spectral_start,
                    spectral_end: scan.spectral_end,
                    successive_high: scan.successive_high,
                    successive_low: scan.successive_low,
                    components: scan.components.clone(),
                    data_length: scan.data.len() as u64,
                })
                .collect(),
        }
    }

    pub fn decode(&mut self) -> JpixResult<DecodedImage> {
        self.parse_segments()?;

        let sof = self.sof.clone().ok_or(JpixError::MissingFrameHeader)?;

        let width = sof.width;
        // a zero SOF height defers the line count to a DNL segment
        let height = if sof.height == 0 {
            self.number_of_lines.unwrap_or(0) as u32
        } else {
            sof.height
        };
        if width == 0 || height == 0 {
            return Err(JpixError::InvalidDimensions { width, height });
        }

        if sof.components.is_empty() || sof.components.len() > 4 {
            return Err(JpixError::UnsupportedComponentCount(sof.components.len() as u8));
        }

        log_debug!("Dimensions: {}x{}, mode: {:?}", width, height, self.mode);
        log_debug!(
            "Components: {}, scans: {}, restart interval: {}",
            sof.components.len(),
            self.scans.len(),
            self.restart_interval
        );

        match self.mode {
            JpegMode::Lossless => self.decode_lossless(&sof, width, height),
            _ => self.decode_dct(&sof, width, height),
        }
    }

    fn parse_segments(&mut self) -> JpixResult<()> {
        while let Some(marker) = self.reader.next_marker(&JPEG_MARKERS)? {
            log_debug!("Found marker: {:?}", marker);

            let result = match &marker {
                JpegMarker::SOI | JpegMarker::TEM => Ok(()),
                JpegMarker::RST0
                | JpegMarker::RST1
                | JpegMarker::RST2
                | JpegMarker::RST3
                | JpegMarker::RST4
                | JpegMarker::RST5
                | JpegMarker::RST6
                | JpegMarker::RST7 => {
                    log_warn!("Stray restart marker outside a scan");
                    Ok(())
                }
                JpegMarker::COM => self.read_com(),
                JpegMarker::APP0 => self.read_app0(),
                JpegMarker::APP14 => self.read_app14(),
                JpegMarker::SOF0 => {
                    self.mode = JpegMode::Baseline;
                    self.read_sof()
                }
                JpegMarker::SOF1 => {
                    self.mode = JpegMode::ExtendedSequential;
                    self.read_sof()
                }
                JpegMarker::SOF2 => {
                    self.mode = JpegMode::Progressive;
                    self.read_sof()
                }
                JpegMarker::SOF3 => {
                    self.mode = JpegMode::Lossless;
                    self.read_sof()
                }
                JpegMarker::SOF9 | JpegMarker::SOF10 | JpegMarker::SOF11 => {
                    return Err(JpixError::Unsupported(
                        "arithmetic-coded entropy data".to_string(),
                    ))
                }
                JpegMarker::SOF5
                | JpegMarker::SOF6
                | JpegMarker::SOF7
                | JpegMarker::SOF13
                | JpegMarker::SOF14
                | JpegMarker::SOF15
                | JpegMarker::DHP
                | JpegMarker::EXP => {
                    return Err(JpixError::Unsupported(
                        "hierarchical/differential JPEG".to_string(),
                    ))
                }
                JpegMarker::DQT => self.read_dqt(),
                JpegMarker::DHT => self.read_dht(),
                JpegMarker::DRI => self.read_dri(),
                JpegMarker::DNL => self.read_dnl(),
                JpegMarker::SOS => self.read_sos(),
                JpegMarker::EOI => break,
                other => self.read_unknown(other),
            };

            // a malformed segment is a local problem: log it and scan on to
            // the next recognizable marker
            if let Err(e) = result {
                log_warn!("Failed to process {:?} segment: {}", marker, e);
            }
        }

        Ok(())
    }

    /// Declared payload length, already minus the length field itself.
    fn segment_length(&mut self) -> JpixResult<usize> {
        let length = self.reader.read_u16()?;
        Ok((length as usize).saturating_sub(2))
    }

    fn read_com(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;
        let bytes = self.reader.read_bytes(length)?;
        self.comments.push(String::from_utf8_lossy(&bytes).to_string());
        Ok(())
    }

    fn read_app0(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;
        let payload = self.reader.read_bytes(length)?;

        if payload.len() >= 14 && &payload[..5] == b"JFIF\0" {
            self.jfif_header = Some(JfifHeader {
                version_major: payload[5],
                version_minor: payload[6],
                density_units: payload[7],
                x_density: u16::from_be_bytes([payload[8], payload[9]]),
                y_density: u16::from_be_bytes([payload[10], payload[11]]),
                thumbnail_width: payload[12],
                thumbnail_height: payload[13],
            });

            let thumbnail = payload[12] as usize * payload[13] as usize * 3;
            if payload.len() != 14 + thumbnail {
                log_warn!(
                    "Invalid JFIF segment length, expected {}, got {}",
                    14 + thumbnail,
                    payload.len()
                );
            }
        }

        Ok(())
    }

    fn read_app14(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;
        let payload = self.reader.read_bytes(length)?;

        if payload.len() >= 12 && &payload[..5] == b"Adobe" {
            self.adobe_header = Some(AdobeHeader {
                version: u16::from_be_bytes([payload[5], payload[6]]),
                flags0: u16::from_be_bytes([payload[7], payload[8]]),
                flags1: u16::from_be_bytes([payload[9], payload[10]]),
                color_transform: payload[11],
            });
        }

        Ok(())
    }

    fn read_unknown(&mut self, marker: &JpegMarker) -> JpixResult<()> {
        let length = self.segment_length()?;
        let payload = self.reader.read_bytes(length)?;
        self.unknown_segments.push(((marker.to_u16() & 0xFF) as u8, payload));
        Ok(())
    }

    fn read_sof(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;

        if self.sof.is_some() {
            log_warn!("Multiple frame headers, keeping the last one");
        }

        let precision = self.reader.read_u8()?;
        let height = self.reader.read_u16()? as u32;
        let width = self.reader.read_u16()? as u32;
        let component_count = self.reader.read_u8()?;

        if component_count == 0 || component_count > 4 {
            log_warn!("Unusual component count in SOF: {}", component_count);
        }

        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let id = self.reader.read_u8()?;
            let hv = self.reader.read_u8()?;
            let qid = self.reader.read_u8()?;
            components.push((id, hv, qid));
        }

        if length != 6 + 3 * component_count as usize {
            log_warn!(
                "Invalid SOF length, expected {}, got {}",
                6 + 3 * component_count as usize,
                length
            );
        }

        self.sof = Some(SofInfo {
            precision,
            width,
            height,
            components,
        });

        Ok(())
    }

    fn read_dqt(&mut self) -> JpixResult<()> {
        let mut remaining = self.segment_length()? as i64;

        while remaining > 0 {
            let spec = self.reader.read_u8()?;
            let id = spec & 0x0F;
            let precision = (spec >> 4) & 0x0F;
            remaining -= 1;

            let mut zigzagged = [0u16; 64];
            if precision == 0 {
                for entry in zigzagged.iter_mut() {
                    *entry = self.reader.read_u8()? as u16;
                }
                remaining -= 64;
            } else {
                for entry in zigzagged.iter_mut() {
                    *entry = self.reader.read_u16()?;
                }
                remaining -= 128;
            }

            let mut table = [0u16; 64];
            for (i, &value) in zigzagged.iter().enumerate() {
                table[ZIGZAG[i]] = value;
            }

            if id > 3 {
                log_warn!("Invalid quantization table id {}, ignoring", id);
                continue;
            }

            self.quantization_tables[id as usize] = Some(QuantizationTable { id, table });
        }

        Ok(())
    }

    fn read_dht(&mut self) -> JpixResult<()> {
        let mut remaining = self.segment_length()? as i64;

        while remaining > 0 {
            let spec = self.reader.read_u8()?;
            let id = spec & 0x0F;
            let class = (spec >> 4) & 0x0F;

            let mut counts = [0u8; 16];
            let mut total: u32 = 0;
            for count in counts.iter_mut() {
                *count = self.reader.read_u8()?;
                total += *count as u32;
            }

            if total > 256 {
                log_warn!("Too many symbols in Huffman table: {}", total);
                total = 256;
            }

            let symbols = self.reader.read_bytes(total as usize)?;
            remaining -= 17 + total as i64;

            if id > 3 {
                log_warn!("Invalid Huffman table id {}, ignoring", id);
                continue;
            }

            let table = HuffmanTable::new(id, class, &counts, symbols);
            match class {
                0 => self.dc_huffman_tables[id as usize] = Some(table),
                1 => self.ac_huffman_tables[id as usize] = Some(table),
                _ => log_warn!("Invalid Huffman table class: {}, ignoring the table", class),
            }
        }

        Ok(())
    }

    fn read_dri(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;
        if length != 2 {
            log_warn!("Invalid DRI length: {}", length + 2);
        }

        self.restart_interval = self.reader.read_u16()?;
        Ok(())
    }

    fn read_dnl(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;
        if length != 2 {
            log_warn!("Invalid DNL length: {}", length + 2);
        }

        let lines = self.reader.read_u16()?;
        self.number_of_lines = Some(lines);

        if let Some(sof) = &self.sof {
            if sof.height != 0 && sof.height != lines as u32 {
                log_warn!("DNL declares {} lines, frame header {}", lines, sof.height);
            }
        }

        Ok(())
    }

    fn read_sos(&mut self) -> JpixResult<()> {
        let length = self.segment_length()?;

        let component_count = self.reader.read_u8()?;
        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let component_id = self.reader.read_u8()?;
            let selectors = self.reader.read_u8()?;
            components.push(ScanComponent {
                component_id,
                dc_table_selector: (selectors >> 4) & 0x0F,
                ac_table_selector: selectors & 0x0F,
            });
        }

        let spectral_start = self.reader.read_u8()?;
        let spectral_end = self.reader.read_u8()?;
        let approx = self.reader.read_u8()?;

        if length != 4 + 2 * component_count as usize {
            log_warn!(
                "Invalid SOS length, expected {}, got {}",
                4 + 2 * component_count as usize,
                length
            );
        }

        // scans that start before any DHT lean on the default table pair
        if self.dc_huffman_tables.iter().all(|t| t.is_none())
            && self.ac_huffman_tables.iter().all(|t| t.is_none())
        {
            log_warn!("No Huffman tables before scan, substituting defaults");
            self.dc_huffman_tables[0] = Some(HuffmanTable::default_dc());
            self.ac_huffman_tables[0] = Some(HuffmanTable::default_ac());
        }

        let data = self.read_entropy_data()?;

        self.scans.push(Scan {
            spectral_start,
            spectral_end,
            successive_high: (approx >> 4) & 0x0F,
            successive_low: approx & 0x0F,
            components,
            dc_tables: self.dc_huffman_tables.clone(),
            ac_tables: self.ac_huffman_tables.clone(),
            restart_interval: self.restart_interval,
            data,
        });

        Ok(())
    }

    /// Collects the entropy-coded segment following a scan header: everything
    /// up to the first `0xFF` that is neither a stuffing pair nor a restart
    /// marker. Stuffed pairs and restart markers stay in the data for the
    /// entropy reader and scan decoder to interpret.
    fn read_entropy_data(&mut self) -> JpixResult<Vec<u8>> {
        let mut data = Vec::new();

        loop {
            let byte = match self.reader.read_u8() {
                Ok(byte) => byte,
                Err(_) => {
                    log_warn!("Unexpected EOF while reading scan data");
                    break;
                }
            };

            if byte != 0xFF {
                data.push(byte);
                continue;
            }

            let next = match self.reader.read_u8() {
                Ok(byte) => byte,
                Err(_) => {
                    log_warn!("Unexpected EOF after 0xFF in scan data");
                    break;
                }
            };

            match next {
                0x00 | 0xD0..=0xD7 => {
                    data.push(byte);
                    data.push(next);
                }
                _ => {
                    // a real marker: rewind so the segment loop sees it
                    self.reader.seek(SeekFrom::Current(-2))?;
                    break;
                }
            }
        }

        Ok(data)
    }

    fn qtable_for(&self, qid: u8) -> [u16; 64] {
        match self
            .quantization_tables
            .get(qid as usize)
            .and_then(|t| t.as_ref())
        {
            Some(table) => table.table,
            None => {
                log_warn!("Quantization table {} not found, substituting default", qid);
                DEFAULT_QUANTIZATION_TABLE
            }
        }
    }

    fn decode_dct(&mut self, sof: &SofInfo, width: u32, height: u32) -> JpixResult<DecodedImage> {
        if sof.precision != 8 {
            return Err(JpixError::UnsupportedPrecision(sof.precision));
        }
        if self.scans.is_empty() {
            return Err(JpixError::MissingScanData);
        }

        let mut components = Vec::with_capacity(sof.components.len());
        for &(id, hv, qid) in &sof.components {
            components.push(Component::new(id, hv, qid)?);
        }

        let progressive = self.mode == JpegMode::Progressive;
        let mut frame = Frame::new(width, height, sof.precision, progressive, components)?;

        for scan in &self.scans {
            let mut comps = Vec::with_capacity(scan.components.len());
            for sc in &scan.components {
                let index = match frame.component_index(sc.component_id) {
                    Some(index) => index,
                    None => {
                        log_warn!("Scan references unknown component {}", sc.component_id);
                        continue;
                    }
                };

                comps.push(ScanComponentTables {
                    index,
                    dc: scan.dc_tables[(sc.dc_table_selector & 3) as usize].clone(),
                    ac: scan.ac_tables[(sc.ac_table_selector & 3) as usize].clone(),
                });
            }

            if comps.is_empty() {
                log_warn!("Scan with no resolvable components, skipping");
                continue;
            }

            let mut decoder = ScanDecoder::new(
                &scan.data,
                progressive,
                scan.spectral_start,
                scan.spectral_end,
                scan.successive_high,
                scan.successive_low,
                scan.restart_interval,
                self.options.end_of_data,
            );
            decoder.decode_scan(&mut frame, &comps)?;
        }

        let fancy = self.options.fancy_upsampling;
        let geometry = frame.geometry;

        let jobs: Vec<(&Component, [u16; 64], bool)> = frame
            .components
            .iter()
            .map(|component| {
                let qtable = self.qtable_for(component.qid);
                // half-sampled components skip the upsampler entirely via the
                // scaling transform when fancy interpolation is off
                let scale2 = !fancy
                    && component.h * 2 == geometry.max_h
                    && component.v * 2 == geometry.max_v;
                (component, qtable, scale2)
            })
            .collect();

        #[cfg(feature = "rayon")]
        let rendered: Vec<(SamplePlane, bool)> = jobs
            .par_iter()
            .map(|(component, qtable, scale2)| (component.render_plane(qtable, *scale2), *scale2))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let rendered: Vec<(SamplePlane, bool)> = jobs
            .iter()
            .map(|(component, qtable, scale2)| (component.render_plane(qtable, *scale2), *scale2))
            .collect();

        let planes: Vec<SamplePlane> = frame
            .components
            .iter()
            .zip(rendered)
            .map(|(component, (plane, scale2))| {
                upsample::upsample_component(
                    &plane,
                    component.h,
                    component.v,
                    geometry.max_h,
                    geometry.max_v,
                    scale2,
                    fancy,
                    width,
                    height,
                )
            })
            .collect();

        let ids: Vec<u8> = frame.components.iter().map(|c| c.id).collect();
        let cs = Colorspace::detect(&ids, self.adobe_header.as_ref(), self.jfif_header.is_some());

        Ok(DecodedImage::new(width, height, sof.precision, cs, planes))
    }

    fn decode_lossless(&mut self, sof: &SofInfo, width: u32, height: u32) -> JpixResult<DecodedImage> {
        let mut precision = sof.precision;
        if !(2..=16).contains(&precision) {
            log_warn!("Invalid precision for lossless mode: {}, clamping", precision);
            precision = precision.clamp(2, 16);
        }

        let scan = self.scans.first().ok_or(JpixError::MissingScanData)?;
        if scan.restart_interval != 0 {
            log_warn!("Restart intervals in lossless scans are not supported, decoding as one batch");
        }

        let mut tables = Vec::with_capacity(scan.components.len());
        for sc in &scan.components {
            let table = scan.dc_tables[(sc.dc_table_selector & 3) as usize]
                .clone()
                .unwrap_or_else(|| {
                    log_warn!(
                        "No DC table {} for lossless component {}, substituting default",
                        sc.dc_table_selector,
                        sc.component_id
                    );
                    HuffmanTable::default_dc()
                });
            tables.push(table);
        }

        let samples = lossless::decode_scan(
            &scan.data,
            width as usize,
            height as usize,
            precision,
            scan.spectral_start,
            scan.successive_low,
            &tables,
            self.options.end_of_data,
        )?;

        // planes are 8-bit: wider lossless samples scale down, narrower up
        let planes: Vec<SamplePlane> = samples
            .into_iter()
            .map(|component_samples| {
                let mut plane = SamplePlane::new(width, height);
                for (dst, &sample) in plane.data.iter_mut().zip(component_samples.iter()) {
                    *dst = if precision <= 8 {
                        (sample as u8) << (8 - precision)
                    } else {
                        (sample >> (precision - 8)) as u8
                    };
                }
                plane
            })
            .collect();

        let ids: Vec<u8> = scan.components.iter().map(|c| c.component_id).collect();
        let cs = Colorspace::detect(&ids, self.adobe_header.as_ref(), self.jfif_header.is_some());

        Ok(DecodedImage::new(width, height, precision, cs, planes))
    }
}
