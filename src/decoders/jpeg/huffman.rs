use crate::log_warn;
use crate::utils::bitreader::EntropyReader;
use crate::utils::error::{JpixError, JpixResult};

/// One canonical Huffman table, stored flat: `offsets[l]` is the number of
/// codes shorter than `l+1` bits, `codes`/`symbols` run in canonical order.
/// Codes of equal length are consecutive integers, so decoding is a range
/// check per bit length instead of a tree walk.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    pub id: u8,
    pub class: u8,
    offsets: [u32; 17],
    symbols: Vec<u8>,
    codes: Vec<u32>,
}

impl HuffmanTable {
    /// Builds the canonical code assignment from the 16 per-length counts and
    /// the symbol list ordered by ascending code length: codes increment in
    /// symbol order and gain a bit whenever a length's code space is spent.
    pub fn new(id: u8, class: u8, counts: &[u8; 16], symbols: Vec<u8>) -> Self {
        let mut offsets = [0u32; 17];
        let mut total = 0u32;
        for (i, &count) in counts.iter().enumerate() {
            total += count as u32;
            offsets[i + 1] = total;
        }

        let mut symbols = symbols;
        if symbols.len() < total as usize {
            log_warn!(
                "Huffman table {}/{} declares {} symbols but carries {}",
                class,
                id,
                total,
                symbols.len()
            );
            symbols.resize(total as usize, 0);
        }

        let mut codes = vec![0u32; total as usize];
        let mut code = 0u32;
        for i in 0..16 {
            for k in offsets[i]..offsets[i + 1] {
                codes[k as usize] = code;
                code += 1;
            }
            code <<= 1;
        }

        HuffmanTable {
            id,
            class,
            offsets,
            symbols,
            codes,
        }
    }

    /// Decodes one symbol, consuming bits until a canonical code matches.
    /// Sixteen bits without a match is a dead end in the code tree.
    pub fn decode(&self, reader: &mut EntropyReader) -> JpixResult<u8> {
        let mut code = 0u32;

        for length in 1..=16usize {
            code = (code << 1) | reader.next_bit()?;

            let lo = self.offsets[length - 1] as usize;
            let hi = self.offsets[length] as usize;
            if hi > lo {
                let first = self.codes[lo];
                if code >= first && code - first < (hi - lo) as u32 {
                    return Ok(self.symbols[lo + (code - first) as usize]);
                }
            }
        }

        Err(JpixError::InvalidHuffmanSequence)
    }

    /// Annex K luminance DC table, substituted when a scan starts before any
    /// DHT segment (some writers rely on decoders carrying the defaults).
    pub fn default_dc() -> Self {
        const COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        let symbols: Vec<u8> = (0..=11).collect();
        HuffmanTable::new(0, 0, &COUNTS, symbols)
    }

    /// Annex K luminance AC table.
    pub fn default_ac() -> Self {
        const COUNTS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];
        const SYMBOLS: [u8; 162] = [
            0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51,
            0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1,
            0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18,
            0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
            0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57,
            0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
            0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92,
            0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
            0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
            0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8,
            0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2,
            0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
        ];
        HuffmanTable::new(0, 1, &COUNTS, SYMBOLS.to_vec())
    }

    /// The canonical `(code, length)` pair for a symbol. Test support for
    /// building bitstreams; linear scan is fine there.
    #[cfg(test)]
    pub fn code_of(&self, symbol: u8) -> Option<(u32, u8)> {
        for length in 1..=16usize {
            let lo = self.offsets[length - 1] as usize;
            let hi = self.offsets[length] as usize;
            for k in lo..hi {
                if self.symbols[k] == symbol {
                    return Some((self.codes[k], length as u8));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bitreader::EndOfData;

    fn pack_code_stream(codes: &[(u32, u8)]) -> Vec<u8> {
        let mut bits = Vec::new();
        for &(code, length) in codes {
            for i in (0..length).rev() {
                bits.push((code >> i) & 1);
            }
        }
        let mut out = Vec::new();
        let mut acc = 0u16;
        let mut n = 0;
        for bit in bits {
            acc = (acc << 1) | bit as u16;
            n += 1;
            if n == 8 {
                out.push(acc as u8);
                if acc as u8 == 0xFF {
                    out.push(0x00);
                }
                acc = 0;
                n = 0;
            }
        }
        if n > 0 {
            out.push(((acc << (8 - n)) | ((1 << (8 - n)) - 1)) as u8);
        }
        out
    }

    #[test]
    fn canonical_codes_match_reference_assignment() {
        // two 2-bit codes, one 3-bit, one 4-bit: 00, 01, 100, 1010
        let counts = {
            let mut c = [0u8; 16];
            c[1] = 2;
            c[2] = 1;
            c[3] = 1;
            c
        };
        let table = HuffmanTable::new(0, 0, &counts, vec![7, 3, 9, 1]);

        assert_eq!(table.code_of(7), Some((0b00, 2)));
        assert_eq!(table.code_of(3), Some((0b01, 2)));
        assert_eq!(table.code_of(9), Some((0b100, 3)));
        assert_eq!(table.code_of(1), Some((0b1010, 4)));
    }

    #[test]
    fn round_trips_every_symbol() {
        let counts = {
            let mut c = [0u8; 16];
            c[1] = 1;
            c[2] = 2;
            c[4] = 3;
            c
        };
        let symbols = vec![5, 0, 11, 2, 8, 15];
        let table = HuffmanTable::new(0, 0, &counts, symbols.clone());

        let codes: Vec<(u32, u8)> = symbols.iter().map(|&s| table.code_of(s).unwrap()).collect();
        let data = pack_code_stream(&codes);
        let mut reader = EntropyReader::new(&data, EndOfData::Fail);

        for &expected in &symbols {
            assert_eq!(table.decode(&mut reader).unwrap(), expected);
        }
    }

    #[test]
    fn default_tables_round_trip() {
        for table in [HuffmanTable::default_dc(), HuffmanTable::default_ac()] {
            let symbols: Vec<u8> = table.symbols.clone();
            let codes: Vec<(u32, u8)> = symbols.iter().map(|&s| table.code_of(s).unwrap()).collect();
            let data = pack_code_stream(&codes);
            let mut reader = EntropyReader::new(&data, EndOfData::Fail);
            for &expected in &symbols {
                assert_eq!(table.decode(&mut reader).unwrap(), expected);
            }
        }
    }

    #[test]
    fn dead_end_is_invalid_sequence() {
        // single 1-bit code "0"; a stream of 1s never resolves
        let counts = {
            let mut c = [0u8; 16];
            c[0] = 1;
            c
        };
        let table = HuffmanTable::new(0, 0, &counts, vec![4]);
        let data = [0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00];
        let mut reader = EntropyReader::new(&data, EndOfData::Fail);
        assert!(matches!(
            table.decode(&mut reader),
            Err(JpixError::InvalidHuffmanSequence)
        ));
    }
}
