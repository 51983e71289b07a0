// ============================================================
// Layer 5 - GRU Encoder-Decoder
// ============================================================
// The recurrent alternative to the Transformer, used for the
// English→French pipeline:
//
//   source ids ─► Embedding ─► GRU encoder ─► state at last real token
//                                                   │ (initial state)
//   decoder ids ─► Embedding ─────────────► GRU decoder
//                                                   │
//                                     Dropout ─► Linear ─► logits
//
// Teacher forcing works exactly as for the Transformer: the decoder
// reads the ground-truth prefix and predicts the next token. The GRU
// is causal by construction, so no attention mask is needed.
//
// The recurrence is stepped explicitly, one token at a time, with
// h_t fed into step t+1:
//
//   r  = σ(W_ir x + W_hr h)
//   z  = σ(W_iz x + W_hz h)
//   n  = tanh(W_in x + r ⊙ (W_hn h))
//   h' = (1 - z) ⊙ n + z ⊙ h
//
// Reference: Cho et al. (2014)

use anyhow::{ensure, Result};
use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::vocabulary::PAD_INDEX;
use crate::ml::model::TranslationModel;

#[derive(Config, Debug)]
pub struct RecurrentConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    #[config(default = 256)]
    pub embed_dim:         usize,
    #[config(default = 512)]
    pub hidden_dim:        usize,
    #[config(default = 0.5)]
    pub dropout:           f64,
}

impl RecurrentConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.source_vocab_size > 2, "source vocabulary has no content tokens");
        ensure!(self.target_vocab_size > 2, "target vocabulary has no content tokens");
        ensure!(self.embed_dim > 0 && self.hidden_dim > 0, "embed_dim and hidden_dim must be > 0");
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");
        Ok(())
    }

    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<RecurrentModel<B>> {
        self.validate()?;
        Ok(self.init(device))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentModel<B> {
        RecurrentModel {
            source_embedding: EmbeddingConfig::new(self.source_vocab_size, self.embed_dim).init(device),
            target_embedding: EmbeddingConfig::new(self.target_vocab_size, self.embed_dim).init(device),
            encoder:          self.gru(device),
            decoder:          self.gru(device),
            dropout:          DropoutConfig::new(self.dropout).init(),
            output:           LinearConfig::new(self.hidden_dim, self.target_vocab_size).init(device),
        }
    }

    fn gru<B: Backend>(&self, device: &B::Device) -> GruLayer<B> {
        // The three gates (reset, update, candidate) share one projection
        // per input, split afterwards.
        GruLayer {
            input_gates:  LinearConfig::new(self.embed_dim, 3 * self.hidden_dim).init(device),
            hidden_gates: LinearConfig::new(self.hidden_dim, 3 * self.hidden_dim).init(device),
            hidden_dim:   self.hidden_dim,
        }
    }
}

/// Single-layer GRU that carries its state across time steps.
#[derive(Module, Debug)]
pub struct GruLayer<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    hidden_dim:       usize,
}

impl<B: Backend> GruLayer<B> {
    /// One step. x: [batch, embed], h: [batch, hidden] → [batch, hidden]
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let xs = self.input_gates.forward(x);
        let hs = self.hidden_gates.forward(h.clone());

        let reset     = sigmoid(self.gate(&xs, 0) + self.gate(&hs, 0));
        let update    = sigmoid(self.gate(&xs, 1) + self.gate(&hs, 1));
        let candidate = tanh(self.gate(&xs, 2) + reset * self.gate(&hs, 2));

        // h' = (1 - z) * n + z * h  ==  n + z * (h - n)
        candidate.clone() + update * (h - candidate)
    }

    /// Columns of gate `index` (0 reset, 1 update, 2 candidate).
    fn gate(&self, projected: &Tensor<B, 2>, index: usize) -> Tensor<B, 2> {
        projected.clone().narrow(1, index * self.hidden_dim, self.hidden_dim)
    }

    /// Run the whole sequence from `initial` (zeros when `None`).
    ///
    /// x: [batch, len, embed] → states: [batch, len, hidden]
    pub fn forward(&self, x: Tensor<B, 3>, initial: Option<Tensor<B, 2>>) -> Tensor<B, 3> {
        let [batch_size, seq_len, embed_dim] = x.dims();
        let mut h = initial
            .unwrap_or_else(|| Tensor::zeros([batch_size, self.hidden_dim], &x.device()));

        let mut states = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            let x_t = x
                .clone()
                .slice([0..batch_size, t..t + 1, 0..embed_dim])
                .reshape([batch_size, embed_dim]);
            h = self.step(x_t, h);
            states.push(h.clone().unsqueeze_dim::<3>(1));
        }

        if states.is_empty() {
            return Tensor::zeros([batch_size, 0, self.hidden_dim], &x.device());
        }
        Tensor::cat(states, 1)
    }
}

#[derive(Module, Debug)]
pub struct RecurrentModel<B: Backend> {
    pub source_embedding: Embedding<B>,
    pub target_embedding: Embedding<B>,
    pub encoder:          GruLayer<B>,
    pub decoder:          GruLayer<B>,
    pub dropout:          Dropout,
    pub output:           Linear<B>,
}

impl<B: Backend> RecurrentModel<B> {
    /// Hidden state after the last non-padding source token: [batch, hidden].
    ///
    /// Sources are post-padded, so the final GRU step has read padding.
    /// Gathering at `length - 1` gives the state that summarises the
    /// sentence itself. An all-padding row falls back to step 0.
    pub fn encode(&self, source: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _] = source.dims();

        let lengths = source
            .clone()
            .equal_elem(PAD_INDEX as i64)
            .bool_not()
            .int()
            .sum_dim(1);                                   // [batch, 1]

        let states = self.encoder.forward(self.source_embedding.forward(source), None);
        let [_, _, hidden] = states.dims();

        let last = (lengths - 1)
            .clamp_min(0)
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, hidden]);
        states.gather(1, last).reshape([batch_size, hidden])
    }
}

impl<B: Backend> TranslationModel<B> for RecurrentModel<B> {
    fn forward(&self, source: Tensor<B, 2, Int>, decoder_input: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let state  = self.encode(source);
        let hidden = self
            .decoder
            .forward(self.target_embedding.forward(decoder_input), Some(state));
        self.output.forward(self.dropout.forward(hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ids(values: &[i32], batch: usize) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default())
            .reshape([batch, values.len() / batch])
    }

    fn tiny() -> RecurrentConfig {
        RecurrentConfig::new(10, 11).with_embed_dim(8).with_hidden_dim(12)
    }

    fn max_abs_diff<const D: usize>(a: Tensor<TestBackend, D>, b: Tensor<TestBackend, D>) -> f32 {
        (a - b).abs().max().into_scalar()
    }

    #[test]
    fn test_forward_shape() {
        let model  = tiny().try_init::<TestBackend>(&Default::default()).unwrap();
        let logits = model.forward(
            ids(&[4, 5, 0, 0, 6, 7, 8, 0], 2),
            ids(&[2, 9, 3, 0, 0, 2, 3, 0, 0, 0], 2),
        );
        assert_eq!(logits.dims(), [2, 5, 11]);
    }

    #[test]
    fn test_trailing_padding_does_not_change_encoding() {
        let model = tiny().init::<TestBackend>(&Default::default());
        let short = model.encode(ids(&[4, 5, 6], 1));
        let padded = model.encode(ids(&[4, 5, 6, 0, 0], 1));
        short.into_data().assert_approx_eq(&padded.into_data(), 4);
    }

    #[test]
    fn test_earlier_source_tokens_reach_the_encoding() {
        let model = tiny().init::<TestBackend>(&Default::default());
        // Same last token, different prefix
        let a = model.encode(ids(&[4, 5, 6], 1));
        let b = model.encode(ids(&[9, 3, 6], 1));
        assert!(max_abs_diff(a, b) > 1e-6);
    }

    #[test]
    fn test_decoder_conditions_on_its_prefix() {
        let model  = tiny().init::<TestBackend>(&Default::default());
        let source = ids(&[4, 5, 6], 1);

        let a = model.forward(source.clone(), ids(&[2, 7, 3], 1));
        let b = model.forward(source, ids(&[2, 8, 3], 1));

        // Position 0 has not read token 1 yet; position 2 has
        let first_a = a.clone().slice([0..1, 0..1, 0..11]);
        let first_b = b.clone().slice([0..1, 0..1, 0..11]);
        first_a.into_data().assert_approx_eq(&first_b.into_data(), 5);

        let last_a = a.slice([0..1, 2..3, 0..11]);
        let last_b = b.slice([0..1, 2..3, 0..11]);
        assert!(max_abs_diff(last_a, last_b) > 1e-6);
    }

    #[test]
    fn test_step_matches_gru_equations() {
        let device = Default::default();
        let gru    = RecurrentConfig::new(5, 5).with_embed_dim(3).with_hidden_dim(2).gru::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 2>::from_floats([[0.5, -1.0, 0.25]], &device);
        let h = Tensor::<TestBackend, 2>::from_floats([[0.1, -0.3]], &device);

        let gx = gru.input_gates.forward(x.clone()).chunk(3, 1);
        let gh = gru.hidden_gates.forward(h.clone()).chunk(3, 1);
        let r  = sigmoid(gx[0].clone() + gh[0].clone());
        let z  = sigmoid(gx[1].clone() + gh[1].clone());
        let n  = tanh(gx[2].clone() + r * gh[2].clone());
        let expected = (z.clone().neg() + 1.0) * n + z * h.clone();

        gru.step(x, h).into_data().assert_approx_eq(&expected.into_data(), 5);
    }

    #[test]
    fn test_rejects_zero_hidden() {
        assert!(tiny().with_hidden_dim(0).validate().is_err());
    }
}
