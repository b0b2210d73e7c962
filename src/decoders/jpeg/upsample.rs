//! Chroma plane reconstruction. Nearest-neighbor replication covers any
//! sampling ratio; the 2:1 horizontal (`h2v1`) and 2:1 both-axis (`h2v2`)
//! cases get the libjpeg "fancy" triangular filter, weighting the nearer
//! source sample 3:1 against the farther one, with the first/last column and
//! row reusing the nearest existing sample instead of extrapolating.

use crate::decoders::jpeg::frame::SamplePlane;

/// Full-resolution plane via nearest-neighbor sample replication.
/// `h`/`max_h` and `v`/`max_v` give the subsampling ratio; the source plane
/// may be block-aligned wider than the downsampled image region.
pub fn box_upsample(plane: &SamplePlane, h: u32, max_h: u32, v: u32, max_v: u32, out_w: u32, out_h: u32) -> SamplePlane {
    let mut out = SamplePlane::new(out_w, out_h);

    for y in 0..out_h {
        let src_y = (y * v / max_v).min(plane.height - 1);
        let src_row = plane.row(src_y);
        let dst_start = (y * out_w) as usize;

        for x in 0..out_w {
            let src_x = ((x * h / max_h) as usize).min(src_row.len() - 1);
            out.data[dst_start + x as usize] = src_row[src_x];
        }
    }

    out
}

/// 2:1 horizontal-only fancy upsampling. Output pixels between two source
/// columns take `(3*near + far + 1|2) >> 2`; the image edges replicate.
pub fn h2v1_fancy_upsample(plane: &SamplePlane, down_w: u32, out_w: u32, out_h: u32) -> SamplePlane {
    debug_assert!(down_w >= 2);
    let mut out = SamplePlane::new(out_w, out_h);
    let mut row = vec![0u8; (down_w * 2) as usize];

    for y in 0..out_h {
        let line = plane.row(y.min(plane.height - 1));
        let mut o = 0;

        // first column
        let invalue = line[0] as u32;
        row[o] = invalue as u8;
        row[o + 1] = ((invalue * 3 + line[1] as u32 + 2) >> 2) as u8;
        o += 2;

        for x in 1..(down_w - 1) as usize {
            // 3/4 * nearer pixel + 1/4 * further pixel
            let invalue = line[x] as u32 * 3;
            row[o] = ((invalue + line[x - 1] as u32 + 1) >> 2) as u8;
            row[o + 1] = ((invalue + line[x + 1] as u32 + 2) >> 2) as u8;
            o += 2;
        }

        // last column
        let invalue = line[(down_w - 1) as usize] as u32;
        row[o] = ((invalue * 3 + line[(down_w - 2) as usize] as u32 + 1) >> 2) as u8;
        row[o + 1] = invalue as u8;

        let dst_start = (y * out_w) as usize;
        out.data[dst_start..dst_start + out_w as usize].copy_from_slice(&row[..out_w as usize]);
    }

    out
}

/// 2:1 both-axis fancy upsampling: vertical 3:1 column sums first, then the
/// same horizontal triangle filter over the sums.
pub fn h2v2_fancy_upsample(plane: &SamplePlane, down_w: u32, down_h: u32, out_w: u32, out_h: u32) -> SamplePlane {
    debug_assert!(down_w >= 2);
    let mut out = SamplePlane::new(out_w, out_h);
    let mut row = vec![0u8; (down_w * 2) as usize];

    for y in 0..down_h {
        for v in 0..2u32 {
            let out_y = y * 2 + v;
            if out_y >= out_h {
                break;
            }

            let line0 = plane.row(y);
            let line1 = if v == 0 {
                // next nearest is the row above
                plane.row(if y == 0 { 0 } else { y - 1 })
            } else {
                // next nearest is the row below
                plane.row(if y == down_h - 1 { y } else { y + 1 })
            };

            let mut o = 0;
            let mut thiscolsum = line0[0] as u32 * 3 + line1[0] as u32;
            let mut nextcolsum = line0[1] as u32 * 3 + line1[1] as u32;
            row[o] = ((thiscolsum * 4 + 8) >> 4) as u8;
            row[o + 1] = ((thiscolsum * 3 + nextcolsum + 7) >> 4) as u8;
            o += 2;
            let mut lastcolsum = thiscolsum;
            thiscolsum = nextcolsum;

            for x in 2..down_w as usize {
                nextcolsum = line0[x] as u32 * 3 + line1[x] as u32;
                row[o] = ((thiscolsum * 3 + lastcolsum + 8) >> 4) as u8;
                row[o + 1] = ((thiscolsum * 3 + nextcolsum + 7) >> 4) as u8;
                o += 2;
                lastcolsum = thiscolsum;
                thiscolsum = nextcolsum;
            }

            // last column
            row[o] = ((thiscolsum * 3 + lastcolsum + 8) >> 4) as u8;
            row[o + 1] = ((thiscolsum * 4 + 7) >> 4) as u8;

            let dst_start = (out_y * out_w) as usize;
            out.data[dst_start..dst_start + out_w as usize].copy_from_slice(&row[..out_w as usize]);
        }
    }

    out
}

/// Reconstructs one component's full-resolution plane. `scaled2` marks planes
/// the 16x16 transform already doubled; `fancy` selects the triangular filter
/// for the exact 2:1 cases.
#[allow(clippy::too_many_arguments)]
pub fn upsample_component(
    plane: &SamplePlane,
    h: u8,
    v: u8,
    max_h: u8,
    max_v: u8,
    scaled2: bool,
    fancy: bool,
    out_w: u32,
    out_h: u32,
) -> SamplePlane {
    let (eff_h, eff_v) = if scaled2 {
        (h as u32 * 2, v as u32 * 2)
    } else {
        (h as u32, v as u32)
    };
    let (max_h, max_v) = (max_h as u32, max_v as u32);

    let down_w = (out_w * eff_h).div_ceil(max_h);
    let down_h = (out_h * eff_v).div_ceil(max_v);

    if fancy && !scaled2 && down_w >= 2 {
        if max_h == eff_h * 2 && max_v == eff_v {
            return h2v1_fancy_upsample(plane, down_w, out_w, out_h);
        }
        if max_h == eff_h * 2 && max_v == eff_v * 2 {
            return h2v2_fancy_upsample(plane, down_w, down_h, out_w, out_h);
        }
    }

    box_upsample(plane, eff_h, max_h, eff_v, max_v, out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_from(width: u32, height: u32, samples: &[u8]) -> SamplePlane {
        let mut plane = SamplePlane::new(width, height);
        plane.data.copy_from_slice(samples);
        plane
    }

    #[test]
    fn box_upsample_replicates() {
        let plane = plane_from(2, 2, &[1, 2, 3, 4]);
        let out = box_upsample(&plane, 1, 2, 1, 2, 4, 4);
        assert_eq!(
            out.data,
            vec![1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
    }

    #[test]
    fn h2v1_weights_three_to_one() {
        let plane = plane_from(4, 1, &[10, 20, 30, 40]);
        let out = h2v1_fancy_upsample(&plane, 4, 8, 1);
        assert_eq!(out.data, vec![10, 13, 17, 23, 27, 33, 37, 40]);
    }

    // Literal 8x8 => 16x16 vectors captured from a libjpeg-turbo run
    // (extraneous-data.jpg, Cb and Cr planes).
    #[rustfmt::skip]
    const CB_INPUT: [u8; 64] = [
         6,  12,  18,  23,  30,  34,  40,  48,
        17,  22,  29,  34,  40,  45,  53,  74,
        28,  34,  39,  45,  51,  59,  78, 100,
        39,  45,  50,  56,  64,  84, 105, 128,
        50,  56,  61,  70,  89, 111, 133, 155,
        61,  67,  75,  95, 116, 138, 160, 183,
        72,  80,  99, 122, 144, 166, 187, 210,
        85, 105, 127, 149, 171, 193, 215, 237,
    ];

    #[rustfmt::skip]
    const CB_EXPECTED: [u8; 256] = [
          6,   7,  11,  13,  17,  19,  22,  25,  28,  31,  33,  35,  39,  42,  46,  48,
          9,  10,  13,  16,  19,  22,  25,  27,  31,  34,  36,  38,  42,  46,  52,  54,
         14,  16,  18,  21,  25,  27,  30,  33,  36,  39,  41,  44,  48,  54,  63,  67,
         20,  21,  24,  27,  30,  33,  35,  38,  41,  44,  47,  51,  57,  65,  75,  80,
         25,  27,  30,  32,  35,  38,  41,  44,  47,  50,  54,  60,  68,  77,  88,  93,
         31,  32,  35,  38,  41,  43,  46,  49,  53,  57,  63,  70,  80,  90, 101, 107,
         36,  38,  41,  43,  46,  49,  52,  55,  59,  65,  74,  83,  93, 104, 115, 121,
         42,  43,  46,  49,  52,  54,  58,  62,  68,  75,  86,  96, 107, 118, 129, 135,
         47,  49,  52,  54,  57,  60,  64,  71,  79,  88,  99, 110, 121, 132, 143, 148,
         53,  54,  57,  60,  63,  67,  73,  81,  91, 101, 112, 123, 134, 145, 156, 162,
         58,  60,  63,  66,  70,  76,  84,  94, 104, 115, 126, 137, 148, 159, 170, 176,
         64,  65,  69,  73,  78,  86,  97, 107, 118, 128, 140, 150, 161, 172, 184, 190,
         69,  71,  75,  81,  89,  99, 110, 121, 132, 142, 154, 164, 175, 186, 198, 203,
         75,  78,  84,  91, 101, 112, 123, 134, 145, 156, 167, 178, 189, 200, 211, 217,
         82,  86,  95, 104, 115, 126, 137, 148, 159, 170, 181, 192, 203, 214, 225, 230,
         85,  90, 100, 110, 122, 132, 144, 154, 166, 176, 188, 198, 210, 220, 232, 237,
    ];

    #[rustfmt::skip]
    const CR_INPUT: [u8; 64] = [
        147, 132, 114,  98,  81,  66,  48,  32,
        161, 145, 128, 112,  95,  79,  62,  43,
        175, 160, 141, 126, 108,  93,  74,  55,
        189, 173, 157, 140, 123, 104,  85,  66,
        203, 187, 170, 153, 134, 115,  96,  77,
        216, 202, 183, 165, 146, 126, 107,  88,
        230, 214, 195, 175, 157, 137, 118,  99,
        244, 225, 207, 187, 167, 149, 129, 110,
    ];

    #[rustfmt::skip]
    const CR_EXPECTED: [u8; 256] = [
        147, 143, 136, 127, 119, 110, 102,  94,  85,  77,  70,  61,  53,  44,  36,  32,
        151, 147, 139, 131, 122, 113, 106,  97,  89,  81,  73,  65,  56,  47,  39,  35,
        158, 154, 146, 137, 129, 120, 113, 104,  96,  88,  80,  71,  63,  54,  45,  40,
        165, 161, 153, 144, 136, 127, 119, 111, 103,  94,  86,  78,  69,  60,  51,  46,
        172, 168, 160, 152, 142, 134, 126, 118, 109, 101,  93,  85,  76,  66,  57,  52,
        179, 175, 167, 159, 150, 141, 133, 125, 116, 108, 100,  91,  82,  72,  63,  58,
        186, 182, 174, 166, 157, 149, 141, 132, 124, 115, 106,  96,  87,  77,  68,  63,
        193, 188, 181, 172, 164, 156, 148, 139, 130, 121, 112, 102,  93,  83,  74,  69,
        200, 195, 188, 179, 171, 162, 154, 145, 136, 126, 117, 107,  98,  88,  79,  74,
        206, 202, 195, 186, 178, 169, 160, 151, 142, 132, 123, 113, 104,  94,  85,  80,
        213, 209, 202, 194, 184, 175, 166, 157, 148, 138, 128, 118, 109,  99,  90,  85,
        220, 216, 209, 200, 191, 181, 172, 163, 153, 144, 134, 124, 115, 105,  96,  91,
        227, 223, 215, 206, 197, 187, 177, 168, 159, 149, 139, 129, 120, 110, 101,  96,
        234, 229, 221, 212, 203, 193, 183, 173, 164, 155, 145, 135, 126, 116, 107, 102,
        241, 236, 227, 218, 209, 199, 189, 179, 169, 160, 151, 141, 131, 121, 112, 107,
        244, 239, 230, 220, 212, 202, 192, 182, 172, 162, 154, 144, 134, 124, 115, 110,
    ];

    #[test]
    fn h2v2_matches_cb_reference() {
        let plane = plane_from(8, 8, &CB_INPUT);
        let out = h2v2_fancy_upsample(&plane, 8, 8, 16, 16);
        assert_eq!(out.data, CB_EXPECTED.to_vec());
    }

    #[test]
    fn h2v2_matches_cr_reference() {
        let plane = plane_from(8, 8, &CR_INPUT);
        let out = h2v2_fancy_upsample(&plane, 8, 8, 16, 16);
        assert_eq!(out.data, CR_EXPECTED.to_vec());
    }

    #[test]
    fn component_dispatch_picks_fancy_for_h2v2() {
        let plane = plane_from(8, 8, &CB_INPUT);
        let fancy = upsample_component(&plane, 1, 1, 2, 2, false, true, 16, 16);
        assert_eq!(fancy.data, CB_EXPECTED.to_vec());

        let boxed = upsample_component(&plane, 1, 1, 2, 2, false, false, 16, 16);
        assert_eq!(boxed.get(0, 0), 6);
        assert_eq!(boxed.get(1, 0), 6);
        assert_eq!(boxed.get(2, 0), 12);
    }
}
