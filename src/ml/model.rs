use anyhow::{ensure, Result};
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::masking::{decoder_self_attention_mask, padding_mask};

/// A sequence-to-sequence model trained with teacher forcing.
///
/// source: [batch, src_len], decoder_input: [batch, tgt_len]
/// → logits: [batch, tgt_len, target_vocab]
pub trait TranslationModel<B: Backend> {
    fn forward(&self, source: Tensor<B, 2, Int>, decoder_input: Tensor<B, 2, Int>) -> Tensor<B, 3>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally - do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    pub sequence_length:   usize,
    #[config(default = 256)]
    pub embed_dim:         usize,
    #[config(default = 2048)]
    pub dense_dim:         usize,
    #[config(default = 8)]
    pub num_heads:         usize,
    #[config(default = 1)]
    pub num_layers:        usize,
    #[config(default = 0.1)]
    pub dropout:           f64,
    #[config(default = 0.5)]
    pub output_dropout:    f64,
}

impl TransformerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.source_vocab_size > 2, "source vocabulary has no content tokens");
        ensure!(self.target_vocab_size > 2, "target vocabulary has no content tokens");
        ensure!(self.sequence_length > 0, "sequence_length must be > 0");
        ensure!(self.embed_dim > 0 && self.dense_dim > 0, "embed_dim and dense_dim must be > 0");
        ensure!(self.num_heads > 0, "num_heads must be > 0");
        ensure!(
            self.embed_dim % self.num_heads == 0,
            "embed_dim ({}) must be divisible by num_heads ({})",
            self.embed_dim,
            self.num_heads
        );
        ensure!(self.num_layers > 0, "num_layers must be > 0");
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");
        ensure!((0.0..1.0).contains(&self.output_dropout), "output_dropout must be in [0, 1)");
        Ok(())
    }

    /// Validate, then build the model.
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<TransformerModel<B>> {
        self.validate()?;
        Ok(self.init(device))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerModel<B> {
        let source_embedding = PositionalEmbedding {
            token:    EmbeddingConfig::new(self.source_vocab_size, self.embed_dim).init(device),
            position: EmbeddingConfig::new(self.sequence_length, self.embed_dim).init(device),
        };
        let target_embedding = PositionalEmbedding {
            token:    EmbeddingConfig::new(self.target_vocab_size, self.embed_dim).init(device),
            position: EmbeddingConfig::new(self.sequence_length, self.embed_dim).init(device),
        };
        let encoder: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let dropout = DropoutConfig::new(self.output_dropout).init();
        let output  = LinearConfig::new(self.embed_dim, self.target_vocab_size).init(device);

        TransformerModel {
            source_embedding, target_embedding, encoder, decoder, dropout, output,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.embed_dim, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            linear1: LinearConfig::new(self.embed_dim, self.dense_dim).init(device),
            linear2: LinearConfig::new(self.dense_dim, self.embed_dim).init(device),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: self.attention(device),
            ffn:       self.feed_forward(device),
            norm1:     LayerNormConfig::new(self.embed_dim).init(device),
            norm2:     LayerNormConfig::new(self.embed_dim).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:  self.attention(device),
            cross_attn: self.attention(device),
            ffn:        self.feed_forward(device),
            norm1:      LayerNormConfig::new(self.embed_dim).init(device),
            norm2:      LayerNormConfig::new(self.embed_dim).init(device),
            norm3:      LayerNormConfig::new(self.embed_dim).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Token embedding plus a learned embedding of the position index.
#[derive(Module, Debug)]
pub struct PositionalEmbedding<B: Backend> {
    pub token:    Embedding<B>,
    pub position: Embedding<B>,
}

impl<B: Backend> PositionalEmbedding<B> {
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let tok_emb = self.token.forward(ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        tok_emb + self.position.forward(positions)
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.linear2.forward(relu(self.linear1.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn:       FeedForward<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, src_len, embed_dim], pad: [batch, src_len]
    pub fn forward(&self, x: Tensor<B, 3>, pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn_out = self.ffn.forward(x.clone());
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:  MultiHeadAttention<B>,
    pub cross_attn: MultiHeadAttention<B>,
    pub ffn:        FeedForward<B>,
    pub norm1:      LayerNorm<B>,
    pub norm2:      LayerNorm<B>,
    pub norm3:      LayerNorm<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    /// x: [batch, tgt_len, embed_dim], memory: [batch, src_len, embed_dim]
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        self_mask:  Tensor<B, 3, Bool>,
        memory:     Tensor<B, 3>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(self_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let cross = self
            .cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(memory_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));

        let ffn_out = self.ffn.forward(x.clone());
        self.norm3.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerModel<B: Backend> {
    pub source_embedding: PositionalEmbedding<B>,
    pub target_embedding: PositionalEmbedding<B>,
    pub encoder:          Vec<EncoderBlock<B>>,
    pub decoder:          Vec<DecoderBlock<B>>,
    pub dropout:          Dropout,
    pub output:           Linear<B>,
}

impl<B: Backend> TransformerModel<B> {
    /// source: [batch, src_len] → memory: [batch, src_len, embed_dim]
    pub fn encode(&self, source: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let pad   = padding_mask(&source);
        let mut x = self.source_embedding.forward(source);
        for block in &self.encoder {
            x = block.forward(x, pad.clone());
        }
        x
    }
}

impl<B: Backend> TranslationModel<B> for TransformerModel<B> {
    fn forward(&self, source: Tensor<B, 2, Int>, decoder_input: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let memory_pad = padding_mask(&source);
        let memory     = self.encode(source);

        // Rebuilt per call: the decoder input length varies between calls
        let self_mask = decoder_self_attention_mask(&decoder_input);

        let mut x = self.target_embedding.forward(decoder_input);
        for block in &self.decoder {
            x = block.forward(x, self_mask.clone(), memory.clone(), memory_pad.clone());
        }
        self.output.forward(self.dropout.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny() -> TransformerConfig {
        TransformerConfig::new(12, 15, 6)
            .with_embed_dim(16)
            .with_dense_dim(32)
            .with_num_heads(4)
    }

    fn ids(values: &[i32], batch: usize) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default())
            .reshape([batch, values.len() / batch])
    }

    #[test]
    fn test_forward_shape() {
        let model  = tiny().try_init::<TestBackend>(&Default::default()).unwrap();
        let source = ids(&[4, 5, 6, 0, 0, 0, 7, 8, 0, 0, 0, 0], 2);
        let target = ids(&[2, 9, 3, 0, 0, 0, 2, 3, 0, 0, 0, 0], 2);

        let logits = model.forward(source, target);
        assert_eq!(logits.dims(), [2, 6, 15]);
    }

    #[test]
    fn test_future_tokens_do_not_change_earlier_logits() {
        let model = tiny().init::<TestBackend>(&Default::default());
        let src   = [4, 5, 6, 0, 0, 0];

        let a = model.forward(ids(&src, 1), ids(&[2, 9, 0, 0, 0, 0], 1));
        let b = model.forward(ids(&src, 1), ids(&[2, 9, 10, 11, 0, 0], 1));

        // positions 0 and 1 only attend to themselves and earlier tokens
        let a = a.slice([0..1, 0..2, 0..15]);
        let b = b.slice([0..1, 0..2, 0..15]);
        a.into_data().assert_approx_eq(&b.into_data(), 4);
    }

    #[test]
    fn test_rejects_indivisible_heads() {
        let cfg = tiny().with_num_heads(3);
        assert!(cfg.validate().is_err());
        assert!(cfg.try_init::<TestBackend>(&Default::default()).is_err());
    }

    #[test]
    fn test_rejects_bad_dropout() {
        assert!(tiny().with_dropout(1.0).validate().is_err());
    }
}
