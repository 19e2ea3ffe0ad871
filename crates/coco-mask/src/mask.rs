//! COCO run-length encoding.
//!
//! COCO stores runs in column-major order: pixel (x, y) is run position
//! `y + h * x`. The functions here take and return row-major buffers (pixel
//! (x, y) at `y * w + x`), which is what image buffers use, and do the
//! transposition while walking the runs.

use crate::types::Rle;

/// Encode a row-major binary mask of size `h * w` into RLE.
///
/// Any non-zero byte counts as foreground.
pub fn encode(mask: &[u8], h: u32, w: u32) -> Rle {
    let (hu, wu) = (h as usize, w as usize);
    assert_eq!(mask.len(), hu * wu, "mask length must equal h*w");

    let mut counts = Vec::new();
    let mut p = false;
    let mut c: u32 = 0;

    for x in 0..wu {
        for y in 0..hu {
            let v = mask[y * wu + x] != 0;
            if v != p {
                counts.push(c);
                c = 0;
                p = v;
            }
            c += 1;
        }
    }
    counts.push(c);

    Rle { h, w, counts }
}

/// Decode an RLE into a row-major binary (0/1) mask of size `h * w`.
///
/// Runs past the end of the mask are truncated.
pub fn decode(rle: &Rle) -> Vec<u8> {
    let (h, w) = (rle.h as usize, rle.w as usize);
    let n = h * w;
    let mut mask = vec![0u8; n];
    let mut pos = 0usize;

    for (i, &c) in rle.counts.iter().enumerate() {
        let end = (pos + c as usize).min(n);
        if i % 2 == 1 {
            for p in pos..end {
                let (x, y) = (p / h, p % h);
                mask[y * w + x] = 1;
            }
        }
        pos = end;
        if pos == n {
            break;
        }
    }
    mask
}

/// Number of foreground pixels: the sum of the odd-indexed runs.
pub fn area(rle: &Rle) -> u64 {
    rle.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
}

/// Pack RLE counts into the COCO string form.
///
/// Each count past the second is stored as the difference to the count two
/// places earlier, then written as 5-bit groups offset by 48, with bit 5 as
/// the continuation flag and bit 4 of the last group as the sign.
pub fn rle_to_string(rle: &Rle) -> String {
    let mut s = String::new();
    for (i, &cnt) in rle.counts.iter().enumerate() {
        let mut x = cnt as i64;
        if i > 2 {
            x -= rle.counts[i - 2] as i64;
        }
        loop {
            let mut c = (x & 0x1f) as u8;
            x >>= 5;
            let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                c |= 0x20;
            }
            s.push((c + 48) as char);
            if !more {
                break;
            }
        }
    }
    s
}

/// Unpack a COCO RLE string.
///
/// Returns `None` if the string holds a byte outside the encoding alphabet,
/// ends inside a value, packs more than twelve groups into one value, or
/// decodes to a negative count.
pub fn rle_from_string(s: &str, h: u32, w: u32) -> Option<Rle> {
    let bytes = s.as_bytes();
    let mut counts: Vec<u32> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let mut x: i64 = 0;
        let mut shift = 0;
        loop {
            let byte = *bytes.get(i)?;
            if !(48..48 + 64).contains(&byte) {
                return None;
            }
            let c = (byte - 48) as i64;
            i += 1;
            x |= (c & 0x1f) << shift;
            shift += 5;
            // a group starting at bit 60 would spill past bit 63
            if shift > 60 {
                return None;
            }
            if c & 0x20 == 0 {
                if c & 0x10 != 0 {
                    x |= !0i64 << shift;
                }
                break;
            }
        }
        if counts.len() > 2 {
            x += counts[counts.len() - 2] as i64;
        }
        counts.push(u32::try_from(x).ok()?);
    }

    Some(Rle { h, w, counts })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3 rows x 4 cols, row-major
    const MASK: [u8; 12] = [
        0, 1, 0, 1, //
        0, 1, 0, 0, //
        0, 1, 1, 0, //
    ];

    #[test]
    fn test_encode_column_major_runs() {
        let rle = encode(&MASK, 3, 4);
        // columns: [0,0,0] [1,1,1] [0,0,1] [1,0,0]
        assert_eq!(rle.counts, vec![3, 3, 2, 2, 2]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let rle = encode(&MASK, 3, 4);
        assert_eq!(decode(&rle), MASK.to_vec());
    }

    #[test]
    fn test_encode_all_zeros() {
        let rle = encode(&[0u8; 12], 3, 4);
        assert_eq!(rle.counts, vec![12]);
        assert_eq!(area(&rle), 0);
    }

    #[test]
    fn test_encode_all_ones() {
        let rle = encode(&[255u8; 12], 3, 4);
        assert_eq!(rle.counts, vec![0, 12]);
        assert_eq!(decode(&rle), vec![1u8; 12]);
    }

    #[test]
    fn test_area() {
        assert_eq!(area(&encode(&MASK, 3, 4)), 5);
    }

    #[test]
    fn test_decode_truncates_overlong_runs() {
        let rle = Rle {
            h: 2,
            w: 2,
            counts: vec![1, 10],
        };
        assert_eq!(decode(&rle), vec![0, 1, 1, 1]);
    }

    #[test]
    fn test_rle_string_known_value() {
        let rle = Rle {
            h: 10,
            w: 10,
            counts: vec![5, 3, 92],
        };
        assert_eq!(rle_to_string(&rle), "53l2");
        assert_eq!(rle_from_string("53l2", 10, 10), Some(rle));
    }

    #[test]
    fn test_rle_string_delta_counts() {
        // the fourth count is stored relative to the second
        let rle = Rle {
            h: 4,
            w: 5,
            counts: vec![10, 5, 3, 1, 1],
        };
        let s = rle_to_string(&rle);
        assert_eq!(s, ":53LN");
        assert_eq!(rle_from_string(&s, 4, 5).unwrap().counts, rle.counts);
    }

    #[test]
    fn test_rle_string_large_counts() {
        let rle = Rle {
            h: 100,
            w: 100,
            counts: vec![100, 200, 9000, 500, 200],
        };
        let decoded = rle_from_string(&rle_to_string(&rle), 100, 100).unwrap();
        assert_eq!(rle.counts, decoded.counts);
    }

    #[test]
    fn test_rle_string_rejects_bad_bytes() {
        assert!(rle_from_string("5 3", 10, 10).is_none());
        // continuation flag on the last byte
        assert!(rle_from_string("P", 10, 10).is_none());
    }

    #[test]
    fn test_rle_string_rejects_overlong_values() {
        // twelve empty continuation groups, then a sign-flagged group at bit 60
        let signed = format!("{}@", "P".repeat(12));
        assert!(rle_from_string(&signed, 10, 10).is_none());
        let unsigned = format!("{}0", "P".repeat(12));
        assert!(rle_from_string(&unsigned, 10, 10).is_none());

        // eleven groups plus a terminator still fit
        let longest = format!("{}0", "P".repeat(11));
        assert_eq!(rle_from_string(&longest, 10, 10).unwrap().counts, vec![0]);
    }
}
