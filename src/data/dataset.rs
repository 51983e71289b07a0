use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One vectorized pair, already shifted for teacher forcing.
///
///   target ids   [start] tengo hambre [end]  0  0
///   decoder_input [start] tengo hambre [end]  0      (target[..L])
///   labels        tengo hambre [end]  0       0      (target[1..])
///
/// At position i the decoder sees the ground-truth prefix up to i and
/// is scored on predicting token i + 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub encoder_input: Vec<u32>,
    pub decoder_input: Vec<u32>,
    pub labels:        Vec<u32>,
}

impl TranslationSample {
    /// Split a `L + 1` long target into decoder input and labels.
    pub fn new(encoder_input: Vec<u32>, target: &[u32]) -> Self {
        let len = target.len().saturating_sub(1);
        Self {
            encoder_input,
            decoder_input: target[..len].to_vec(),
            labels:        target.get(1..).unwrap_or(&[]).to_vec(),
        }
    }
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifts_target_by_one() {
        let s = TranslationSample::new(vec![9, 8, 0], &[2, 5, 6, 3, 0]);
        assert_eq!(s.decoder_input, vec![2, 5, 6, 3]);
        assert_eq!(s.labels, vec![5, 6, 3, 0]);
        assert_eq!(s.decoder_input.len(), s.labels.len());
    }

    #[test]
    fn test_dataset_get_and_len() {
        let ds = TranslationDataset::new(vec![TranslationSample::new(vec![1], &[2, 3])]);
        assert_eq!(ds.len(), 1);
        assert!(ds.get(0).is_some());
        assert!(ds.get(1).is_none());
    }
}
