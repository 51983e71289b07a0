// ============================================================
// Layer 4 - Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to stack TranslationSamples into
// device tensors.
//
//   Input:  Vec of N samples, every sequence already padded to L
//   Output: TranslationBatch with three [N, L] Int tensors
//
// Each field is flattened into one Vec<i32> and reshaped:
//   [s1_t1, ..., s1_tL, s2_t1, ..., sN_tL] → [N, L]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source ids - shape: [batch_size, seq_len]
    pub encoder_input: Tensor<B, 2, Int>,

    /// Target ids starting with [start] - shape: [batch_size, seq_len]
    pub decoder_input: Tensor<B, 2, Int>,

    /// Target ids shifted left by one - shape: [batch_size, seq_len]
    pub labels: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let encoder_input = stack(&items, |s| &s.encoder_input, &self.device);
        let decoder_input = stack(&items, |s| &s.decoder_input, &self.device);
        let labels        = stack(&items, |s| &s.labels, &self.device);

        TranslationBatch {
            encoder_input,
            decoder_input,
            labels,
        }
    }
}

/// Flatten one field of every sample into a [batch, len] Int tensor.
fn stack<B: Backend>(
    items:  &[TranslationSample],
    field:  impl Fn(&TranslationSample) -> &Vec<u32>,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = items.len();
    let seq_len    = items.first().map(|s| field(s).len()).unwrap_or(0);

    let flat: Vec<i32> = items
        .iter()
        .flat_map(|s| field(s).iter().map(|&x| x as i32))
        .collect();

    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, seq_len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let device  = Default::default();
        let batcher = TranslationBatcher::<TestBackend>::new(device);
        let items   = vec![
            TranslationSample::new(vec![4, 5, 0], &[2, 7, 3, 0]),
            TranslationSample::new(vec![6, 0, 0], &[2, 3, 0, 0]),
        ];

        let batch = batcher.batch(items);
        assert_eq!(batch.encoder_input.dims(), [2, 3]);
        assert_eq!(batch.decoder_input.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(), [2, 3]);

        let labels: Vec<i64> = batch
            .labels
            .into_data()
            .iter::<i64>()
            .collect();
        assert_eq!(labels, vec![7, 3, 0, 3, 0, 0]);
    }
}
