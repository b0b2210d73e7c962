use crate::decoders::jpeg::idct;
use crate::log_warn;
use crate::utils::error::{JpixError, JpixResult};
use std::ops::Range;

/// A rendered sample plane: one component's decoded bytes at the component's
/// block-aligned resolution (which may exceed the visible image size).
#[derive(Debug, Clone)]
pub struct SamplePlane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl SamplePlane {
    pub fn new(width: u32, height: u32) -> Self {
        SamplePlane {
            width,
            height,
            data: vec![0; (width * height) as usize],
        }
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }
}

/// One frame component: sampling factors from the SOF segment plus the
/// coefficient block storage the scans fill in. Blocks are allocated for
/// whole MCUs; the padding beyond the visible image is never sampled.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    pub h: u8,
    pub v: u8,
    pub qid: u8,
    pub blocks_per_line: u32,
    pub blocks_per_column: u32,
    blocks_per_line_mcu: u32,
    blocks_per_column_mcu: u32,
    pub blocks: Vec<i32>,
    /// DC predictor, reset at every restart boundary.
    pub pred: i32,
}

impl Component {
    pub fn new(id: u8, hv: u8, qid: u8) -> JpixResult<Self> {
        let mut h = hv >> 4;
        let mut v = hv & 0x0F;

        if h == 0 || v == 0 {
            return Err(JpixError::MalformedSegment {
                marker: 0xC0,
                detail: format!("component {} has zero sampling factor", id),
            });
        }

        // the standard allows 1..=4
        if h > 4 || v > 4 {
            log_warn!("Component {} sampling factors {}x{} out of range, clamping", id, h, v);
            h = h.min(4);
            v = v.min(4);
        }

        Ok(Component {
            id,
            h,
            v,
            qid,
            blocks_per_line: 0,
            blocks_per_column: 0,
            blocks_per_line_mcu: 0,
            blocks_per_column_mcu: 0,
            blocks: Vec::new(),
            pred: 0,
        })
    }

    fn prepare(&mut self, frame_width: u32, frame_height: u32, frame: &FrameGeometry) {
        self.blocks_per_line =
            (frame_width.div_ceil(8) * self.h as u32).div_ceil(frame.max_h as u32);
        self.blocks_per_column =
            (frame_height.div_ceil(8) * self.v as u32).div_ceil(frame.max_v as u32);
        self.blocks_per_line_mcu = frame.mcus_per_line * self.h as u32;
        self.blocks_per_column_mcu = frame.mcus_per_column * self.v as u32;
        self.blocks =
            vec![0; (self.blocks_per_line_mcu * self.blocks_per_column_mcu * 64) as usize];
        self.pred = 0;
    }

    /// Index range of one 64-coefficient block within the MCU-rounded grid,
    /// or `None` for blocks that fall outside it entirely.
    pub fn block_range(&self, block_row: u32, block_col: u32) -> Option<Range<usize>> {
        if block_row >= self.blocks_per_column_mcu || block_col >= self.blocks_per_line_mcu {
            return None;
        }
        let start = ((block_row * self.blocks_per_line_mcu + block_col) * 64) as usize;
        Some(start..start + 64)
    }

    /// Runs dequantization and the inverse transform over every visible block,
    /// producing the component's sample plane. With `scale2` the 16x16
    /// transform doubles the plane resolution in both axes.
    pub fn render_plane(&self, qtable: &[u16; 64], scale2: bool) -> SamplePlane {
        let unit: u32 = if scale2 { 16 } else { 8 };
        let mut plane = SamplePlane::new(self.blocks_per_line * unit, self.blocks_per_column * unit);
        let stride = plane.width as usize;

        for block_row in 0..self.blocks_per_column {
            for block_col in 0..self.blocks_per_line {
                let range = match self.block_range(block_row, block_col) {
                    Some(range) => range,
                    None => continue,
                };
                let offset = (block_row * unit) as usize * stride + (block_col * unit) as usize;

                if scale2 {
                    idct::idct_16x16(&self.blocks[range], qtable, &mut plane.data, offset, stride);
                } else {
                    idct::idct_8x8(&self.blocks[range], qtable, &mut plane.data, offset, stride);
                }
            }
        }

        plane
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameGeometry {
    pub max_h: u8,
    pub max_v: u8,
    pub mcus_per_line: u32,
    pub mcus_per_column: u32,
}

/// Frame geometry derived from the SOF segment. Components never hold a
/// reference back; the geometry they need during decode travels by value.
#[derive(Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub precision: u8,
    pub progressive: bool,
    pub components: Vec<Component>,
    pub geometry: FrameGeometry,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        precision: u8,
        progressive: bool,
        mut components: Vec<Component>,
    ) -> JpixResult<Self> {
        if width == 0 || height == 0 {
            return Err(JpixError::InvalidDimensions { width, height });
        }

        let max_h = components.iter().map(|c| c.h).max().unwrap_or(1);
        let max_v = components.iter().map(|c| c.v).max().unwrap_or(1);

        let geometry = FrameGeometry {
            max_h,
            max_v,
            mcus_per_line: width.div_ceil(8 * max_h as u32),
            mcus_per_column: height.div_ceil(8 * max_v as u32),
        };

        for component in &mut components {
            component.prepare(width, height, &geometry);
        }

        Ok(Frame {
            width,
            height,
            precision,
            progressive,
            components,
            geometry,
        })
    }

    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_420_17x17() -> Frame {
        // 4:2:0 chroma subsampling on a 17x17 image
        let components = vec![
            Component::new(1, 0x22, 0).unwrap(),
            Component::new(2, 0x11, 1).unwrap(),
            Component::new(3, 0x11, 1).unwrap(),
        ];
        Frame::new(17, 17, 8, false, components).unwrap()
    }

    #[test]
    fn mcu_grid_rounds_up() {
        let frame = frame_420_17x17();
        assert_eq!(frame.geometry.mcus_per_line, 2);
        assert_eq!(frame.geometry.mcus_per_column, 2);
    }

    #[test]
    fn block_counts_follow_sampling() {
        let frame = frame_420_17x17();

        let luma = &frame.components[0];
        assert_eq!(luma.blocks_per_line, 3);
        assert_eq!(luma.blocks_per_column, 3);
        // storage is rounded to whole MCUs
        assert_eq!(luma.blocks.len(), 4 * 4 * 64);

        let chroma = &frame.components[1];
        assert_eq!(chroma.blocks_per_line, 2);
        assert_eq!(chroma.blocks_per_column, 2);
        assert_eq!(chroma.blocks.len(), 2 * 2 * 64);
    }

    #[test]
    fn out_of_grid_blocks_are_rejected() {
        let frame = frame_420_17x17();
        let luma = &frame.components[0];

        assert!(luma.block_range(0, 0).is_some());
        assert!(luma.block_range(3, 3).is_some()); // MCU padding block
        assert!(luma.block_range(4, 0).is_none());
        assert!(luma.block_range(0, 4).is_none());
    }

    #[test]
    fn zero_sampling_factor_is_malformed() {
        assert!(Component::new(1, 0x10, 0).is_err());
        assert!(Component::new(1, 0x01, 0).is_err());
    }

    #[test]
    fn rendered_plane_is_block_aligned() {
        let mut component = Component::new(1, 0x11, 0).unwrap();
        let geometry = FrameGeometry {
            max_h: 1,
            max_v: 1,
            mcus_per_line: 2,
            mcus_per_column: 1,
        };
        component.prepare(12, 6, &geometry);

        assert_eq!(component.blocks_per_line, 2);
        assert_eq!(component.blocks_per_column, 1);

        if let Some(range) = component.block_range(0, 1) {
            component.blocks[range.start] = 80; // DC of the second block
        }

        let plane = component.render_plane(&[1; 64], false);
        assert_eq!(plane.width, 16);
        assert_eq!(plane.height, 8);
        assert_eq!(plane.get(0, 0), 128);
        assert_eq!(plane.get(8, 0), 138);
    }
}
