//! Lossless (SOF3) predictive decoding. Each pixel is a DC-style magnitude
//! category plus extension bits, added to one of eight fixed predictors and
//! taken modulo 2^16, then shifted by the point transform.

use crate::decoders::jpeg::huffman::HuffmanTable;
use crate::log_warn;
use crate::utils::bitreader::{EndOfData, EntropyReader};
use crate::utils::error::JpixResult;

/// Predictor selection, carried in the scan header's spectral-start byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predictor {
    NoPrediction = 0,
    Ra = 1,
    Rb = 2,
    Rc = 3,
    RaRbRc1 = 4,
    RaRbRc2 = 5,
    RaRbRc3 = 6,
    RaRb = 7,
}

impl Predictor {
    pub fn from_selector(selector: u8) -> Predictor {
        match selector {
            0 => Predictor::NoPrediction,
            1 => Predictor::Ra,
            2 => Predictor::Rb,
            3 => Predictor::Rc,
            4 => Predictor::RaRbRc1,
            5 => Predictor::RaRbRc2,
            6 => Predictor::RaRbRc3,
            7 => Predictor::RaRb,
            _ => {
                log_warn!("Invalid predictor selection: {}", selector);
                Predictor::NoPrediction
            }
        }
    }

    fn apply(&self, ra: i32, rb: i32, rc: i32) -> i32 {
        match self {
            Predictor::NoPrediction => 0,
            Predictor::Ra => ra,
            Predictor::Rb => rb,
            Predictor::Rc => rc,
            Predictor::RaRbRc1 => ra + rb - rc,
            Predictor::RaRbRc2 => ra + ((rb - rc) >> 1),
            Predictor::RaRbRc3 => rb + ((ra - rc) >> 1),
            Predictor::RaRb => (ra + rb) / 2,
        }
    }
}

/// Prediction for one pixel position, with the image-corner and edge cases
/// seeded from the precision midpoint.
pub(crate) fn predict(
    ra: i32,
    rb: i32,
    rc: i32,
    predictor: Predictor,
    point_transform: u8,
    precision: u8,
    x: usize,
    y: usize,
) -> i32 {
    if x == 0 && y == 0 {
        if precision > 1 + point_transform {
            1 << (precision - point_transform - 1)
        } else {
            0
        }
    } else if y == 0 {
        ra
    } else if x == 0 {
        rb
    } else {
        predictor.apply(ra, rb, rc)
    }
}

/// Decodes one lossless scan into `width * height` samples per component.
///
/// The difference pass and the reconstruction pass are separate: every
/// difference is entropy-decoded first (they interleave per pixel across
/// components), then predictions are applied in raster order.
#[allow(clippy::too_many_arguments)]
pub fn decode_scan(
    data: &[u8],
    width: usize,
    height: usize,
    precision: u8,
    predictor_selector: u8,
    point_transform: u8,
    dc_tables: &[HuffmanTable],
    end_of_data: EndOfData,
) -> JpixResult<Vec<Vec<u16>>> {
    let component_count = dc_tables.len();
    let predictor = Predictor::from_selector(predictor_selector);

    let mut reader = EntropyReader::new(data, end_of_data);
    let mut differences = vec![vec![0i32; width * height]; component_count];

    for o in 0..width * height {
        for (i, table) in dc_tables.iter().enumerate() {
            let category = table.decode(&mut reader)?;
            let diff = match category {
                0 => 0,
                1..=15 => reader.receive_extend(category)?,
                16 => 32768,
                _ => {
                    log_warn!("Invalid DC difference magnitude category: {}", category);
                    0
                }
            };
            differences[i][o] = diff;
        }
    }

    let mut samples = vec![vec![0u16; width * height]; component_count];

    if predictor == Predictor::Ra {
        // left-neighbor prediction decomposes into a seed pixel, a first
        // column fed from above, and rows fed strictly from the left
        for i in 0..component_count {
            let seed = predict(0, 0, 0, predictor, point_transform, precision, 0, 0);
            samples[i][0] = (((seed + differences[i][0]) & 0xFFFF) as u16) << point_transform;

            for y in 1..height {
                let rb = samples[i][(y - 1) * width] as i32;
                samples[i][y * width] =
                    (((rb + differences[i][y * width]) & 0xFFFF) as u16) << point_transform;
            }

            for y in 0..height {
                for x in 1..width {
                    let index = y * width + x;
                    let ra = samples[i][index - 1] as i32;
                    samples[i][index] =
                        (((ra + differences[i][index]) & 0xFFFF) as u16) << point_transform;
                }
            }
        }
    } else {
        for y in 0..height {
            for x in 0..width {
                for i in 0..component_count {
                    let index = y * width + x;
                    let ra = if x > 0 { samples[i][index - 1] as i32 } else { 0 };
                    let rb = if y > 0 { samples[i][(y - 1) * width + x] as i32 } else { 0 };
                    let rc = if x > 0 && y > 0 {
                        samples[i][(y - 1) * width + (x - 1)] as i32
                    } else {
                        0
                    };

                    let prediction = predict(ra, rb, rc, predictor, point_transform, precision, x, y);
                    samples[i][index] =
                        (((prediction + differences[i][index]) & 0xFFFF) as u16) << point_transform;
                }
            }
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_table() -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[1] = 3;
        counts[2] = 1;
        HuffmanTable::new(0, 0, &counts, vec![0, 1, 2, 3])
    }

    #[test]
    fn predictor_functions() {
        let (ra, rb, rc) = (10, 20, 4);
        assert_eq!(Predictor::NoPrediction.apply(ra, rb, rc), 0);
        assert_eq!(Predictor::Ra.apply(ra, rb, rc), 10);
        assert_eq!(Predictor::Rb.apply(ra, rb, rc), 20);
        assert_eq!(Predictor::Rc.apply(ra, rb, rc), 4);
        assert_eq!(Predictor::RaRbRc1.apply(ra, rb, rc), 26);
        assert_eq!(Predictor::RaRbRc2.apply(ra, rb, rc), 18);
        assert_eq!(Predictor::RaRbRc3.apply(ra, rb, rc), 23);
        assert_eq!(Predictor::RaRb.apply(ra, rb, rc), 15);
    }

    #[test]
    fn corner_and_edge_seeding() {
        // corner: midpoint of the sample range for 8-bit precision
        assert_eq!(predict(0, 0, 0, Predictor::Ra, 0, 8, 0, 0), 128);
        // point transform halves the midpoint
        assert_eq!(predict(0, 0, 0, Predictor::Ra, 1, 8, 0, 0), 64);
        // rest of the first row predicts from the left
        assert_eq!(predict(7, 99, 99, Predictor::Rb, 0, 8, 3, 0), 7);
        // first column predicts from above
        assert_eq!(predict(99, 9, 99, Predictor::Ra, 0, 8, 0, 2), 9);
    }

    #[test]
    fn left_predictor_scan_reconstructs() {
        // 2x2, one component, diffs +2, -1, +3, 0:
        //   p(0,0) = 128 + 2 = 130      p(1,0) = 130 - 1 = 129
        //   p(0,1) = 130 + 3 = 133      p(1,1) = 133 + 0 = 133
        // bits: "10" "10" | "01" "0" | "10" "11" | "00" -> 0xA5, 0x67
        let data = [0xA5, 0x67];
        let samples = decode_scan(&data, 2, 2, 8, 1, 0, &[dc_table()], EndOfData::Fail).unwrap();

        assert_eq!(samples[0], vec![130, 129, 133, 133]);
    }

    #[test]
    fn point_transform_shifts_output() {
        // single pixel, diff 0: seed is 1 << (8 - 1 - 1) = 64, shifted back
        // by the point transform to 128
        let data = [0x00];
        let samples = decode_scan(&data, 1, 1, 8, 1, 1, &[dc_table()], EndOfData::Fail).unwrap();
        assert_eq!(samples[0], vec![128]);
    }
}
