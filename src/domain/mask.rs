// ============================================================
// Layer 3 - Attention Mask Arithmetic
// ============================================================
// Masks are 0/1 matrices stored row-major, where 1 means "position
// i may attend to position j".
//
//   causal(4)              padding_keep([7, 9, 0, 0], 0)
//   1 0 0 0                1 1 0 0
//   1 1 0 0
//   1 1 1 0                combine(causal, keep)
//   1 1 1 1                1 0 0 0
//                          1 1 0 0
//                          1 1 0 0
//                          1 1 0 0
//
// Combining uses the element-wise minimum, so a slot is open only
// when BOTH masks allow it. The tensor version used by the decoder
// lives in ml::masking and follows exactly these rules.

/// L×L lower-triangular mask: `mask[i * len + j] == 1` iff `j <= i`.
pub fn causal(len: usize) -> Vec<u8> {
    let mut mask = vec![0u8; len * len];
    for i in 0..len {
        for j in 0..=i {
            mask[i * len + j] = 1;
        }
    }
    mask
}

/// 1 for every real token, 0 for padding.
pub fn padding_keep(ids: &[u32], pad: u32) -> Vec<u8> {
    ids.iter().map(|&id| u8::from(id != pad)).collect()
}

/// Element-wise minimum of an L×L causal mask and a length-L key mask
/// broadcast across rows.
pub fn combine(causal: &[u8], keep: &[u8], len: usize) -> Vec<u8> {
    debug_assert_eq!(causal.len(), len * len);
    debug_assert_eq!(keep.len(), len);

    causal
        .iter()
        .enumerate()
        .map(|(idx, &c)| c.min(keep[idx % len]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::PAD_INDEX;

    #[test]
    fn test_causal_mask_is_lower_triangular() {
        for len in [0usize, 1, 2, 5, 20] {
            let m = causal(len);
            assert_eq!(m.len(), len * len);
            for i in 0..len {
                for j in 0..len {
                    assert_eq!(m[i * len + j] == 1, j <= i, "len={len} i={i} j={j}");
                }
            }
        }
    }

    #[test]
    fn test_padding_keep_marks_real_tokens() {
        assert_eq!(padding_keep(&[5, 3, 0, 0], PAD_INDEX), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_combine_never_opens_padded_position() {
        let ids  = [4u32, 0, 9, 0, 0];
        let len  = ids.len();
        let keep = padding_keep(&ids, PAD_INDEX);
        let m    = combine(&causal(len), &keep, len);

        for i in 0..len {
            for j in 0..len {
                let open = m[i * len + j] == 1;
                if ids[j] == PAD_INDEX {
                    assert!(!open, "padded key {j} open for query {i}");
                } else {
                    assert_eq!(open, j <= i);
                }
            }
        }
    }

    #[test]
    fn test_combine_with_no_padding_is_causal() {
        let len = 4;
        assert_eq!(combine(&causal(len), &[1; 4], len), causal(len));
    }
}
