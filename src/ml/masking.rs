// ============================================================
// Layer 5 - Attention Masks as Tensors
// ============================================================
// Tensor versions of the rules in domain::mask, in the form Burn's
// MultiHeadAttention expects: Bool tensors where `true` means
// "masked out".
//
//   padding_mask                      [batch, len]
//     true at every padded key; used for encoder self-attention
//     and decoder cross-attention
//
//   decoder_self_attention_mask       [batch, len, len]
//     causal (j <= i) combined by element-wise minimum with the
//     target's padding keep-mask, then flipped to "masked" form
//
// The causal part is rebuilt on every call from the current length
// because the decoder sees prefixes of varying length.

use burn::prelude::*;

use crate::domain::mask;
use crate::domain::vocabulary::PAD_INDEX;

/// `true` where `ids` holds the padding id.
pub fn padding_mask<B: Backend>(ids: &Tensor<B, 2, Int>) -> Tensor<B, 2, Bool> {
    ids.clone().equal_elem(PAD_INDEX as i64)
}

/// Causal + padding mask for decoder self-attention.
pub fn decoder_self_attention_mask<B: Backend>(target: &Tensor<B, 2, Int>) -> Tensor<B, 3, Bool> {
    let [batch_size, seq_len] = target.dims();
    let device = target.device();

    let causal: Vec<i32> = mask::causal(seq_len).into_iter().map(i32::from).collect();
    let causal = Tensor::<B, 1, Int>::from_ints(causal.as_slice(), &device)
        .reshape([1, seq_len, seq_len])
        .expand([batch_size, seq_len, seq_len]);

    // 1 for real keys, 0 for padding, broadcast over query rows
    let keep = padding_mask(target)
        .bool_not()
        .int()
        .reshape([batch_size, 1, seq_len])
        .expand([batch_size, seq_len, seq_len]);

    causal.min_pair(keep).equal_elem(0)
}
