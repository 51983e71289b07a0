// ============================================================
// Layer 5 - Greedy Decoder
// ============================================================
// Autoregressive greedy decoding, one token per forward pass:
//
//   Initializing   vectorize the source once; output = ["[start]"]
//        │
//        ▼
//   Stepping(i)    vectorize the partial output (dropping the
//        │         trailing slot), run the full model, take the
//        │         argmax at position i, append that token
//        ▼
//   Terminal       the token was "[end]", or i hit max_steps
//
// Every step re-runs the whole prefix rather than caching decoder
// state. Sequences are at most `sequence_length` long, so the
// quadratic cost stays small.
//
// Decoding is deterministic: the inference backend has no autodiff,
// so dropout is inactive, and selection is a plain argmax.

use anyhow::Result;
use burn::prelude::*;

use crate::application::train_use_case::{Architecture, ComputeBackend, TrainConfig};
use crate::data::preprocessing::Preprocessing;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::TranslationModel;
use crate::ml::{CpuBackend, GpuBackend};

/// Why decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndToken,
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Stepping(usize),
    Terminal(StopReason),
}

/// Output of one decode: the tokens including both sentinels (or the
/// start sentinel and whatever was produced before the step bound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub tokens: Vec<String>,
    pub steps:  usize,
    pub stop:   StopReason,
}

impl Decoded {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Object-safe view of a decoder so callers need not know the model
/// architecture or backend it was loaded with.
pub trait SentenceDecoder {
    fn decode(&self, preprocessing: &Preprocessing, sentence: &str) -> Result<Decoded>;
}

pub struct GreedyDecoder<B: Backend, M> {
    model:     M,
    device:    B::Device,
    max_steps: usize,
}

impl<B: Backend, M: TranslationModel<B>> GreedyDecoder<B, M> {
    /// `max_steps` is additionally capped at the sequence length the
    /// model was trained with.
    pub fn new(model: M, device: B::Device, max_steps: usize) -> Self {
        Self { model, device, max_steps }
    }

    fn ids_tensor(&self, ids: &[u32]) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = ids.iter().map(|&x| x as i32).collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).unsqueeze::<2>()
    }

    /// One full forward pass over the current prefix; returns the token
    /// predicted at position `step`.
    fn predict_next(
        &self,
        preprocessing: &Preprocessing,
        source:        &Tensor<B, 2, Int>,
        tokens:        &[String],
        step:          usize,
    ) -> Result<String> {
        let target = preprocessing.target();
        let mut ids = target.vectorize(&tokens.join(" "))?;
        ids.truncate(preprocessing.sequence_length());

        let logits = self.model.forward(source.clone(), self.ids_tensor(&ids));
        let [_, _, vocab_size] = logits.dims();

        let next = logits
            .slice([0..1, step..step + 1, 0..vocab_size])
            .reshape([vocab_size])
            .argmax(0)
            .into_scalar()
            .elem::<i64>();

        Ok(target.vocab().token(next as u32).to_string())
    }
}

impl<B: Backend, M: TranslationModel<B>> SentenceDecoder for GreedyDecoder<B, M> {
    fn decode(&self, preprocessing: &Preprocessing, sentence: &str) -> Result<Decoded> {
        // ── Initializing ──────────────────────────────────────────────────────
        let source     = self.ids_tensor(&preprocessing.source().vectorize(sentence)?);
        let end_token  = preprocessing.end_token();
        let max_steps  = self.max_steps.min(preprocessing.sequence_length());
        let mut tokens = vec![preprocessing.start_token().to_string()];
        let mut state  = DecodeState::Stepping(0);

        loop {
            state = match state {
                DecodeState::Stepping(step) if step >= max_steps => {
                    DecodeState::Terminal(StopReason::StepLimit)
                }
                DecodeState::Stepping(step) => {
                    let next = self.predict_next(preprocessing, &source, &tokens, step)?;
                    let done = next == end_token;
                    tokens.push(next);
                    if done {
                        DecodeState::Terminal(StopReason::EndToken)
                    } else {
                        DecodeState::Stepping(step + 1)
                    }
                }
                DecodeState::Terminal(stop) => {
                    let steps = tokens.len() - 1;
                    tracing::debug!("Decoded {} tokens ({:?}) for '{}'", steps, stop, sentence);
                    return Ok(Decoded { tokens, steps, stop });
                }
            };
        }
    }
}

/// Rebuild the trained model from `ckpt` on the requested backend and
/// wrap it in a greedy decoder.
pub fn load_decoder(
    ckpt:          &CheckpointManager,
    cfg:           &TrainConfig,
    preprocessing: &Preprocessing,
    backend:       ComputeBackend,
    max_steps:     usize,
) -> Result<Box<dyn SentenceDecoder>> {
    match backend {
        ComputeBackend::Wgpu => {
            load_on::<GpuBackend>(ckpt, cfg, preprocessing, Default::default(), max_steps)
        }
        ComputeBackend::Cpu => {
            load_on::<CpuBackend>(ckpt, cfg, preprocessing, Default::default(), max_steps)
        }
    }
}

fn load_on<B: Backend>(
    ckpt:          &CheckpointManager,
    cfg:           &TrainConfig,
    preprocessing: &Preprocessing,
    device:        B::Device,
    max_steps:     usize,
) -> Result<Box<dyn SentenceDecoder>> {
    tracing::info!("Using device: {:?}", device);
    let source_vocab = preprocessing.source().vocab().len();
    let target_vocab = preprocessing.target().vocab().len();

    let decoder: Box<dyn SentenceDecoder> = match cfg.architecture {
        Architecture::Transformer => {
            let model = cfg.transformer_config(source_vocab, target_vocab).try_init::<B>(&device)?;
            let model = ckpt.load_model(model, &device)?;
            Box::new(GreedyDecoder::new(model, device, max_steps))
        }
        Architecture::Gru => {
            let model = cfg.recurrent_config(source_vocab, target_vocab).try_init::<B>(&device)?;
            let model = ckpt.load_model(model, &device)?;
            Box::new(GreedyDecoder::new(model, device, max_steps))
        }
    };
    tracing::info!("Model loaded from checkpoint");
    Ok(decoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence_pair::SentencePair;
    use crate::ml::model::TransformerConfig;
    use crate::ml::recurrent::RecurrentConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn preprocessing() -> Preprocessing {
        let pairs: Vec<SentencePair> = [
            ("You go first.", "Ve tú primero."),
            ("I am hungry.", "Tengo hambre."),
            ("Where is the station?", "¿Dónde está la estación?"),
        ]
        .iter()
        .map(|(s, t)| SentencePair::new(*s, *t).with_sentinels())
        .collect();
        Preprocessing::fit(&pairs, 100, 8).unwrap()
    }

    fn transformer_decoder(prep: &Preprocessing, max_steps: usize)
        -> GreedyDecoder<TestBackend, crate::ml::model::TransformerModel<TestBackend>>
    {
        let device = Default::default();
        let model  = TransformerConfig::new(
            prep.source().vocab().len(),
            prep.target().vocab().len(),
            prep.sequence_length(),
        )
        .with_embed_dim(16)
        .with_dense_dim(32)
        .with_num_heads(2)
        .init::<TestBackend>(&device);
        GreedyDecoder::new(model, device, max_steps)
    }

    #[test]
    fn test_output_starts_with_start_sentinel() {
        let prep = preprocessing();
        let out  = transformer_decoder(&prep, 8).decode(&prep, "you go first").unwrap();
        assert_eq!(out.tokens[0], "[start]");
        assert_eq!(out.steps, out.tokens.len() - 1);
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let prep    = preprocessing();
        let decoder = transformer_decoder(&prep, 8);
        let first   = decoder.decode(&prep, "you go first").unwrap();
        let second  = decoder.decode(&prep, "you go first").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_terminates_within_step_bound() {
        let prep = preprocessing();
        for max_steps in [0, 1, 3, 100] {
            let out = transformer_decoder(&prep, max_steps).decode(&prep, "i am hungry").unwrap();
            let bound = max_steps.min(prep.sequence_length());
            assert!(out.steps <= bound, "steps {} > bound {}", out.steps, bound);
            match out.stop {
                StopReason::EndToken  => assert_eq!(out.tokens.last().unwrap(), "[end]"),
                StopReason::StepLimit => assert_eq!(out.steps, bound),
            }
        }
    }

    #[test]
    fn test_zero_steps_returns_only_start() {
        let prep = preprocessing();
        let out  = transformer_decoder(&prep, 0).decode(&prep, "you go first").unwrap();
        assert_eq!(out.tokens, vec!["[start]"]);
        assert_eq!(out.stop, StopReason::StepLimit);
        assert_eq!(out.text(), "[start]");
    }

    #[test]
    fn test_only_emits_vocabulary_tokens() {
        let prep = preprocessing();
        let out  = transformer_decoder(&prep, 8).decode(&prep, "where is the station").unwrap();
        for token in &out.tokens {
            assert!(prep.target().vocab().contains(token), "'{token}' not in vocabulary");
        }
    }

    #[test]
    fn test_gru_decoder_shares_the_loop() {
        let prep    = preprocessing();
        let device  = Default::default();
        let model   = RecurrentConfig::new(prep.source().vocab().len(), prep.target().vocab().len())
            .with_embed_dim(8)
            .with_hidden_dim(8)
            .init::<TestBackend>(&device);
        let decoder = GreedyDecoder::new(model, device, 5);

        let a = decoder.decode(&prep, "you go first").unwrap();
        let b = decoder.decode(&prep, "you go first").unwrap();
        assert_eq!(a, b);
        assert!(a.steps <= 5);
    }
}
