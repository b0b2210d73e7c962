use crate::decoders::jpeg::frame::{Component, Frame};
use crate::decoders::jpeg::huffman::HuffmanTable;
use crate::decoders::jpeg::ZIGZAG;
use crate::log_warn;
use crate::utils::bitreader::{EndOfData, EntropyReader};
use crate::utils::error::{JpixError, JpixResult};

/// Per-scan decode strategy, fixed once from the scan header. Lossless scans
/// never reach here; they use their own decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanMode {
    Baseline,
    DcInitial,
    DcRefine,
    AcInitial,
    AcRefine,
}

impl ScanMode {
    pub fn select(progressive: bool, spectral_start: u8, successive_high: u8) -> ScanMode {
        if !progressive {
            ScanMode::Baseline
        } else if spectral_start == 0 {
            if successive_high == 0 {
                ScanMode::DcInitial
            } else {
                ScanMode::DcRefine
            }
        } else if successive_high == 0 {
            ScanMode::AcInitial
        } else {
            ScanMode::AcRefine
        }
    }
}

/// One scan component resolved against the frame: which component it is and
/// the Huffman tables its selectors picked at SOS time.
pub struct ScanComponentTables {
    pub index: usize,
    pub dc: Option<HuffmanTable>,
    pub ac: Option<HuffmanTable>,
}

impl ScanComponentTables {
    fn dc(&self) -> JpixResult<&HuffmanTable> {
        self.dc.as_ref().ok_or(JpixError::MalformedSegment {
            marker: 0xDA,
            detail: "scan references a DC table that was never defined".to_string(),
        })
    }

    fn ac(&self) -> JpixResult<&HuffmanTable> {
        self.ac.as_ref().ok_or(JpixError::MalformedSegment {
            marker: 0xDA,
            detail: "scan references an AC table that was never defined".to_string(),
        })
    }
}

/// Decodes one scan's entropy data into the frame's coefficient blocks.
///
/// Work proceeds in batches of `restart_interval` MCUs (or blocks, for a
/// single-component scan). A batch boundary resets every DC predictor and
/// the end-of-band run, then consumes the following restart marker. Without
/// a declared interval the whole scan is one batch.
pub struct ScanDecoder<'a> {
    reader: EntropyReader<'a>,
    mode: ScanMode,
    spectral_start: usize,
    spectral_end: usize,
    successive: u8,
    restart_interval: u32,
    eobrun: u32,
    // AC-refinement micro-state: 0 initial, 1/2 skipping a zero run,
    // 3 placing a newly significant value, 4 inside an end-of-band run.
    ac_state: u8,
    ac_next_value: i32,
}

impl<'a> ScanDecoder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data: &'a [u8],
        progressive: bool,
        spectral_start: u8,
        spectral_end: u8,
        successive_high: u8,
        successive_low: u8,
        restart_interval: u16,
        end_of_data: EndOfData,
    ) -> Self {
        ScanDecoder {
            reader: EntropyReader::new(data, end_of_data),
            mode: ScanMode::select(progressive, spectral_start, successive_high),
            spectral_start: spectral_start as usize,
            spectral_end: (spectral_end as usize).min(63),
            successive: successive_low,
            restart_interval: restart_interval as u32,
            eobrun: 0,
            ac_state: 0,
            ac_next_value: 0,
        }
    }

    pub fn decode_scan(&mut self, frame: &mut Frame, comps: &[ScanComponentTables]) -> JpixResult<()> {
        match self.run(frame, comps) {
            Ok(()) => Ok(()),
            // only raised under EndOfData::Fail; the decode as a whole fails
            Err(JpixError::UnexpectedEndOfEntropyData) => Err(JpixError::UnexpectedEndOfEntropyData),
            Err(e) => {
                // a desynchronized scan cannot be resumed; the blocks not
                // reached keep their zeroed coefficients
                log_warn!("Scan aborted: {}", e);
                Ok(())
            }
        }
    }

    fn run(&mut self, frame: &mut Frame, comps: &[ScanComponentTables]) -> JpixResult<()> {
        let mcus_per_line = frame.geometry.mcus_per_line;
        let single = comps.len() == 1;

        let mcu_expected = if single {
            let c = &frame.components[comps[0].index];
            c.blocks_per_line * c.blocks_per_column
        } else {
            mcus_per_line * frame.geometry.mcus_per_column
        };

        let batch = if self.restart_interval == 0 {
            mcu_expected
        } else {
            self.restart_interval
        };

        let mut mcu = 0u32;
        while mcu < mcu_expected {
            for ct in comps {
                frame.components[ct.index].pred = 0;
            }
            self.eobrun = 0;

            if single {
                let ct = &comps[0];
                for _ in 0..batch {
                    let comp = &mut frame.components[ct.index];
                    let block_row = mcu / comp.blocks_per_line;
                    let block_col = mcu % comp.blocks_per_line;
                    self.decode_block_at(comp, ct, block_row, block_col)?;
                    mcu += 1;
                    if mcu == mcu_expected {
                        break;
                    }
                }
            } else {
                for _ in 0..batch {
                    let mcu_row = mcu / mcus_per_line;
                    let mcu_col = mcu % mcus_per_line;
                    for ct in comps {
                        let (h, v) = {
                            let c = &frame.components[ct.index];
                            (c.h as u32, c.v as u32)
                        };
                        for j in 0..v {
                            for k in 0..h {
                                let comp = &mut frame.components[ct.index];
                                let block_row = mcu_row * v + j;
                                let block_col = mcu_col * h + k;
                                self.decode_block_at(comp, ct, block_row, block_col)?;
                            }
                        }
                    }
                    mcu += 1;
                    if mcu == mcu_expected {
                        break;
                    }
                }
            }

            if mcu == mcu_expected {
                // skip trailing bytes until the next real marker
                let skipped = self.reader.skip_to_marker();
                if skipped > 0 {
                    log_warn!("{} extra bytes at end of scan", skipped);
                }
            } else {
                self.reader.align();
            }

            match self.reader.marker() {
                // end of the entropy data is a valid scan end
                None => break,
                Some(m) if (0xFFD0..=0xFFD7).contains(&m) => {
                    self.reader.consume_marker();
                }
                Some(m) => {
                    if mcu < mcu_expected {
                        log_warn!(
                            "Expected restart marker, found 0x{:04X}; resynchronizing at the next segment",
                            m
                        );
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    fn decode_block_at(
        &mut self,
        comp: &mut Component,
        tables: &ScanComponentTables,
        block_row: u32,
        block_col: u32,
    ) -> JpixResult<()> {
        let range = match comp.block_range(block_row, block_col) {
            Some(range) => range,
            // blocks outside the padded grid are skipped, not an error
            None => return Ok(()),
        };

        let Component {
            ref mut pred,
            ref mut blocks,
            ..
        } = *comp;
        let block = &mut blocks[range];

        match self.mode {
            ScanMode::Baseline => self.decode_baseline(tables.dc()?, tables.ac()?, pred, block),
            ScanMode::DcInitial => self.decode_dc_initial(tables.dc()?, pred, block),
            ScanMode::DcRefine => self.decode_dc_refine(block),
            ScanMode::AcInitial => self.decode_ac_initial(tables.ac()?, block),
            ScanMode::AcRefine => self.decode_ac_refine(tables.ac()?, block),
        }
    }

    fn decode_baseline(
        &mut self,
        dc: &HuffmanTable,
        ac: &HuffmanTable,
        pred: &mut i32,
        block: &mut [i32],
    ) -> JpixResult<()> {
        let t = dc.decode(&mut self.reader)?;
        if t > 16 {
            return Err(JpixError::InvalidHuffmanSequence);
        }

        let diff = if t == 0 { 0 } else { self.reader.receive_extend(t)? };
        *pred += diff;
        block[0] = *pred;

        let mut k = 1usize;
        while k < 64 {
            let rs = ac.decode(&mut self.reader)?;
            let s = rs & 15;
            let r = rs >> 4;

            if s == 0 {
                // end of block, unless this is a 16-zero run
                if r < 15 {
                    break;
                }
                k += 16;
                continue;
            }

            k += r as usize;
            if k > 63 {
                log_warn!("AC run-length past the end of the block");
                break;
            }

            block[ZIGZAG[k]] = self.reader.receive_extend(s)?;
            k += 1;
        }

        Ok(())
    }

    fn decode_dc_initial(&mut self, dc: &HuffmanTable, pred: &mut i32, block: &mut [i32]) -> JpixResult<()> {
        let t = dc.decode(&mut self.reader)?;
        if t > 16 {
            return Err(JpixError::InvalidHuffmanSequence);
        }

        let diff = if t == 0 {
            0
        } else {
            self.reader.receive_extend(t)? << self.successive
        };
        *pred += diff;
        block[0] = *pred;

        Ok(())
    }

    fn decode_dc_refine(&mut self, block: &mut [i32]) -> JpixResult<()> {
        block[0] |= (self.reader.next_bit()? as i32) << self.successive;
        Ok(())
    }

    fn decode_ac_initial(&mut self, ac: &HuffmanTable, block: &mut [i32]) -> JpixResult<()> {
        if self.eobrun > 0 {
            self.eobrun -= 1;
            return Ok(());
        }

        let mut k = self.spectral_start;
        while k <= self.spectral_end {
            let rs = ac.decode(&mut self.reader)?;
            let s = rs & 15;
            let r = rs >> 4;

            if s == 0 {
                if r < 15 {
                    // end-of-band run covering this block and `eobrun` more
                    self.eobrun = self.reader.receive(r)? + (1 << r) - 1;
                    break;
                }
                k += 16;
                continue;
            }

            k += r as usize;
            if k > 63 {
                log_warn!("AC run-length past the spectral band");
                break;
            }

            block[ZIGZAG[k]] = self.reader.receive_extend(s)? << self.successive;
            k += 1;
        }

        Ok(())
    }

    /// Merges one correction bit into every already-nonzero coefficient it
    /// passes while placing newly significant coefficients, per the scan's
    /// run/value/eob decisions. The interleaving must not be reordered.
    fn decode_ac_refine(&mut self, ac: &HuffmanTable, block: &mut [i32]) -> JpixResult<()> {
        let mut k = self.spectral_start;
        let e = self.spectral_end;
        let mut r = 0i32;

        while k <= e {
            let z = ZIGZAG[k];
            let direction = if block[z] < 0 { -1 } else { 1 };

            match self.ac_state {
                0 => {
                    let rs = ac.decode(&mut self.reader)?;
                    let s = rs & 15;
                    let run = (rs >> 4) as i32;
                    r = run;

                    if s == 0 {
                        if run < 15 {
                            self.eobrun = self.reader.receive(run as u8)? + (1 << run);
                            self.ac_state = 4;
                        } else {
                            r = 16;
                            self.ac_state = 1;
                        }
                    } else {
                        if s != 1 {
                            // refinement scans may only introduce +-1 values
                            return Err(JpixError::InvalidHuffmanSequence);
                        }
                        self.ac_next_value = self.reader.receive_extend(1)?;
                        self.ac_state = if run == 0 { 3 } else { 2 };
                    }
                    continue;
                }
                1 | 2 => {
                    // skipping `r` currently-zero coefficients
                    if block[z] != 0 {
                        block[z] += ((self.reader.next_bit()? as i32) << self.successive) * direction;
                    } else {
                        r -= 1;
                        if r == 0 {
                            self.ac_state = if self.ac_state == 2 { 3 } else { 0 };
                        }
                    }
                    k += 1;
                }
                3 => {
                    // the next zero coefficient takes the pending value
                    if block[z] != 0 {
                        block[z] += ((self.reader.next_bit()? as i32) << self.successive) * direction;
                    } else {
                        block[z] = self.ac_next_value << self.successive;
                        self.ac_state = 0;
                    }
                    k += 1;
                }
                4 => {
                    // end-of-band: corrections only
                    if block[z] != 0 {
                        block[z] += ((self.reader.next_bit()? as i32) << self.successive) * direction;
                    }
                    k += 1;
                }
                state => {
                    return Err(JpixError::Unsupported(format!(
                        "invalid AC refinement state {}",
                        state
                    )))
                }
            }
        }

        if self.ac_state == 4 {
            self.eobrun -= 1;
            if self.eobrun == 0 {
                self.ac_state = 0;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_table() -> HuffmanTable {
        // categories 0..=2 as 2-bit codes, 3 as a 3-bit code
        let mut counts = [0u8; 16];
        counts[1] = 3;
        counts[2] = 1;
        HuffmanTable::new(0, 0, &counts, vec![0, 1, 2, 3])
    }

    fn eob_only_ac_table() -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        HuffmanTable::new(0, 1, &counts, vec![0x00])
    }

    fn gray_frame(width: u32, height: u32) -> Frame {
        let components = vec![Component::new(1, 0x11, 0).unwrap()];
        Frame::new(width, height, 8, false, components).unwrap()
    }

    #[test]
    fn restart_marker_resets_dc_predictor() {
        // two blocks, restart interval 1:
        //   block 0: DC category 2 code "10", bits "11" (value 3), EOB "0"
        //   RST0
        //   block 1: DC category 1 code "01", bit  "1"  (value 1), EOB "0"
        let data = [0xB7, 0xFF, 0xD0, 0x6F];

        let mut frame = gray_frame(8, 16);
        let comps = vec![ScanComponentTables {
            index: 0,
            dc: Some(dc_table()),
            ac: Some(eob_only_ac_table()),
        }];

        let mut decoder = ScanDecoder::new(&data, false, 0, 63, 0, 0, 1, EndOfData::Fail);
        decoder.decode_scan(&mut frame, &comps).unwrap();

        let comp = &frame.components[0];
        let block0 = comp.block_range(0, 0).unwrap();
        let block1 = comp.block_range(1, 0).unwrap();

        // absolute DC of the second block equals its own magnitude: the
        // predictor went back to zero after the restart marker
        assert_eq!(comp.blocks[block0.start], 3);
        assert_eq!(comp.blocks[block1.start], 1);
    }

    #[test]
    fn without_restart_dc_accumulates() {
        // same two blocks but as one batch and no marker in between:
        // bits: 10 11 0 | 01 1 0 -> 1011 0011 0 + pad -> 0xB3, 0x7F
        let data = [0xB3, 0x7F];

        let mut frame = gray_frame(8, 16);
        let comps = vec![ScanComponentTables {
            index: 0,
            dc: Some(dc_table()),
            ac: Some(eob_only_ac_table()),
        }];

        let mut decoder = ScanDecoder::new(&data, false, 0, 63, 0, 0, 0, EndOfData::Fail);
        decoder.decode_scan(&mut frame, &comps).unwrap();

        let comp = &frame.components[0];
        let block1 = comp.block_range(1, 0).unwrap();
        assert_eq!(comp.blocks[block1.start], 4); // 3 + 1
    }

    #[test]
    fn baseline_places_ac_in_natural_order() {
        // DC cat 0, then AC (run=1, size=1) value 1, then EOB
        // AC table: "0" -> 0x11, "10" -> 0x00
        let mut counts = [0u8; 16];
        counts[0] = 1;
        counts[1] = 1;
        let ac = HuffmanTable::new(0, 1, &counts, vec![0x11, 0x00]);

        // bits: DC "00" | AC "0" value "1" | EOB "10" -> 000110 + pad
        let data = [0b0001_1011];

        let mut frame = gray_frame(8, 8);
        let comps = vec![ScanComponentTables {
            index: 0,
            dc: Some(dc_table()),
            ac: Some(ac),
        }];

        let mut decoder = ScanDecoder::new(&data, false, 0, 63, 0, 0, 0, EndOfData::Fail);
        decoder.decode_scan(&mut frame, &comps).unwrap();

        let comp = &frame.components[0];
        // run of 1 zero puts the value at zigzag index 2 = natural position 8
        assert_eq!(comp.blocks[8], 1);
        assert_eq!(comp.blocks[1], 0);
    }

    #[test]
    fn ac_refine_inserts_newly_significant_coefficient() {
        // refinement of band 1..=5, low bit 1. The block already carries
        // +4 at zigzag 1 and -4 at zigzag 3 from the previous pass.
        let mut counts = [0u8; 16];
        counts[0] = 2;
        let ac = HuffmanTable::new(0, 1, &counts, vec![0x01, 0x00]);

        // bits: "0" (run 0, size 1), sign "1" -> pending +1
        //       correction for zigzag 1: "0"
        //       (zigzag 2 is zero: takes the pending value, state back to 0)
        //       "1" (EOB), correction for zigzag 3: "0"
        let data = [0b0101_0111];

        let mut frame = gray_frame(8, 8);
        {
            let comp = &mut frame.components[0];
            comp.blocks[ZIGZAG[1]] = 4;
            comp.blocks[ZIGZAG[3]] = -4;
        }

        let comps = vec![ScanComponentTables {
            index: 0,
            dc: None,
            ac: Some(ac),
        }];

        let mut decoder = ScanDecoder::new(&data, true, 1, 5, 2, 1, 0, EndOfData::Fail);
        decoder.decode_scan(&mut frame, &comps).unwrap();

        let comp = &frame.components[0];
        assert_eq!(comp.blocks[ZIGZAG[1]], 4, "zero correction bit leaves value");
        assert_eq!(comp.blocks[ZIGZAG[2]], 2, "newly significant takes sign and low bit");
        assert_eq!(comp.blocks[ZIGZAG[3]], -4, "zero correction bit leaves negative value");
        assert_eq!(comp.blocks[ZIGZAG[4]], 0);
        assert_eq!(comp.blocks[ZIGZAG[5]], 0);
    }

    #[test]
    fn ac_initial_eob_run_skips_blocks() {
        // band 1..=63, first block reads EOB with run length 1:
        // eobrun = receive(1) + (1 << 1) - 1 = 1 + 1 = 2 extra... with bit 1
        let mut counts = [0u8; 16];
        counts[0] = 2;
        let ac = HuffmanTable::new(0, 1, &counts, vec![0x10, 0x01]);

        // block 0: "0" -> rs 0x10 (EOB, r=1), bit "1": eobrun = 1 + 2 - 1 = 2,
        // covering blocks 1 and 2. Block 3 then reads three (size 1, bit "1")
        // pairs before the padded tail produces another end-of-band run.
        let data = [0b0111_1111];

        let mut frame = gray_frame(8, 32); // 4 blocks in one column
        let comps = vec![ScanComponentTables {
            index: 0,
            dc: None,
            ac: Some(ac),
        }];

        let mut decoder = ScanDecoder::new(&data, true, 1, 63, 0, 0, 0, EndOfData::Pad);
        decoder.decode_scan(&mut frame, &comps).unwrap();

        let comp = &frame.components[0];
        for skipped in 0..3u32 {
            let range = comp.block_range(skipped, 0).unwrap();
            assert!(comp.blocks[range].iter().all(|&c| c == 0), "block {}", skipped);
        }
        let block3 = comp.block_range(3, 0).unwrap();
        assert_eq!(comp.blocks[block3.start + ZIGZAG[1]], 1);
        assert_eq!(comp.blocks[block3.start + ZIGZAG[2]], 1);
        assert_eq!(comp.blocks[block3.start + ZIGZAG[3]], 1);
    }
}
