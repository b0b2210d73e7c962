use crate::log_warn;
use crate::utils::error::{JpixError, JpixResult};
use crate::utils::marker::Marker;
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

/// Byte-level cursor over the segment stream. Entropy-coded data is handled
/// separately by [`EntropyReader`].
#[derive(Debug)]
pub struct BitReader<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> BitReader<R> {
    pub fn new(reader: R) -> Self {
        BitReader { reader }
    }

    pub fn read_u8(&mut self) -> Result<u8, std::io::Error> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Reads a big-endian 16-bit value, as all JPEG segment fields are stored.
    pub fn read_u16(&mut self) -> Result<u16, std::io::Error> {
        let mut bytes = [0u8; 2];
        self.reader.read_exact(&mut bytes)?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, std::io::Error> {
        let mut bytes = vec![0; n];
        self.reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Skips `n` bytes, stopping quietly at end of stream.
    pub fn skip_bytes(&mut self, n: usize) -> Result<(), std::io::Error> {
        match self.reader.seek(SeekFrom::Current(n as i64)) {
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, std::io::Error> {
        self.reader.seek(pos)
    }

    /// Searches for the next known marker in the stream.
    /// The sliding-window scan tolerates fill bytes and garbage between
    /// segments; the cursor ends up right after the marker found.
    pub fn next_marker<M: Marker>(&mut self, known_markers: &[M]) -> Result<Option<M>, std::io::Error> {
        let marker_set: HashSet<u16> = known_markers.iter().map(|m| m.to_u16()).collect();
        let mut buffer = [0u8; 1];
        let mut sliding_window = [0u8; 2];

        match self.reader.read_exact(&mut buffer) {
            Ok(_) => sliding_window[0] = buffer[0],
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        loop {
            match self.reader.read_exact(&mut buffer) {
                Ok(_) => {
                    sliding_window[1] = buffer[0];

                    let potential_marker = u16::from_be_bytes(sliding_window);
                    if marker_set.contains(&potential_marker) {
                        return Ok(M::from_u16(potential_marker));
                    }

                    sliding_window[0] = sliding_window[1];
                }
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}

/// What to do when the entropy-coded segment runs out mid-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfData {
    /// Substitute zero bits so a truncated image degrades to flat color.
    Pad,
    /// Raise `UnexpectedEndOfEntropyData` and abort the decode.
    Fail,
}

/// Bit-level cursor over one entropy-coded segment.
///
/// A literal `0xFF` data byte is always followed by a stuffed `0x00` that is
/// discarded here; `0xFF` followed by anything else means the entropy data
/// has ended at a marker. Restart markers are left in place for the scan
/// decoder to consume via [`EntropyReader::marker`].
#[derive(Debug)]
pub struct EntropyReader<'a> {
    data: &'a [u8],
    pos: usize,
    current: u8,
    bits_left: u8,
    policy: EndOfData,
    exhausted: bool,
}

impl<'a> EntropyReader<'a> {
    pub fn new(data: &'a [u8], policy: EndOfData) -> Self {
        EntropyReader {
            data,
            pos: 0,
            current: 0,
            bits_left: 0,
            policy,
            exhausted: false,
        }
    }

    /// True once zero bits had to be substituted for missing data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.data.get(self.pos + ahead).copied()
    }

    fn load_byte(&mut self) -> JpixResult<()> {
        let byte = match self.peek_byte(0) {
            Some(0xFF) => match self.peek_byte(1) {
                Some(0x00) => {
                    self.pos += 2;
                    Some(0xFF)
                }
                // Marker (or lone trailing 0xFF): entropy data ends here,
                // cursor stays on the 0xFF for the marker check.
                _ => None,
            },
            Some(b) => {
                self.pos += 1;
                Some(b)
            }
            None => None,
        };

        match byte {
            Some(b) => {
                self.current = b;
                self.bits_left = 8;
                Ok(())
            }
            None => {
                if self.policy == EndOfData::Fail {
                    return Err(JpixError::UnexpectedEndOfEntropyData);
                }

                if !self.exhausted {
                    log_warn!("Entropy data ended early, padding with zero bits");
                    self.exhausted = true;
                }

                self.current = 0;
                self.bits_left = 8;
                Ok(())
            }
        }
    }

    pub fn next_bit(&mut self) -> JpixResult<u32> {
        if self.bits_left == 0 {
            self.load_byte()?;
        }

        self.bits_left -= 1;
        Ok(((self.current >> self.bits_left) & 1) as u32)
    }

    pub fn receive(&mut self, length: u8) -> JpixResult<u32> {
        let mut r = 0;
        for _ in 0..length {
            r = (r << 1) | self.next_bit()?;
        }
        Ok(r)
    }

    /// Sign-extends per the JPEG magnitude-category convention: a raw value
    /// below `2^(length-1)` encodes a negative number.
    pub fn receive_extend(&mut self, length: u8) -> JpixResult<i32> {
        if length == 0 {
            return Ok(0);
        }

        let n = self.receive(length)? as i32;
        if n < (1 << (length - 1)) {
            Ok(n + ((-1) << length) + 1)
        } else {
            Ok(n)
        }
    }

    /// Drops any partially consumed byte so reading resumes on a byte
    /// boundary, as required before a restart marker.
    pub fn align(&mut self) {
        self.bits_left = 0;
    }

    /// Skips trailing bytes until the cursor sits on a marker (or the end of
    /// the segment). Returns how many bytes were skipped.
    pub fn skip_to_marker(&mut self) -> usize {
        self.align();

        let mut skipped = 0;
        while self.pos < self.data.len() {
            if self.data[self.pos] == 0xFF && self.peek_byte(1) != Some(0x00) {
                break;
            }
            self.pos += 1;
            skipped += 1;
        }
        skipped
    }

    /// The two-byte marker at the cursor, if one is fully present.
    pub fn marker(&self) -> Option<u16> {
        match (self.peek_byte(0), self.peek_byte(1)) {
            (Some(a), Some(b)) => Some(u16::from_be_bytes([a, b])),
            _ => None,
        }
    }

    pub fn consume_marker(&mut self) {
        self.pos += 2;
        self.bits_left = 0;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}
