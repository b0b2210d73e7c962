use crate::decoders::jpeg::{AdobeHeader, JfifHeader, JpegMode, ScanComponent};
use serde::Serialize;

/// Metadata snapshot of a parsed JPEG stream, independent of pixel decoding.
#[derive(Debug, Clone, Serialize)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub precision: u8,
    pub mode: JpegMode,
    pub component_count: u8,
    pub components: Vec<ComponentInfo>,
    pub restart_interval: u16,
    pub quantization_table_ids: Vec<u8>,
    pub dc_table_ids: Vec<u8>,
    pub ac_table_ids: Vec<u8>,
    pub jfif_header: Option<JfifHeader>,
    pub adobe_header: Option<AdobeHeader>,
    pub comments: Vec<String>,
    pub scans: Vec<ScanInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentInfo {
    pub id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
    pub quantization_table_id: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanInfo {
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub successive_high: u8,
    pub successive_low: u8,
    pub components: Vec<ScanComponent>,
    pub data_length: u64,
}
