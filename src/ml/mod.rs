// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All model, loss and decoding code lives here. The data layer
// only builds tensors; nothing above this layer runs a forward
// pass.
//
//   masking.rs     - padding and causal attention masks as Bool
//                    tensors (true = masked, Burn's convention)
//
//   model.rs       - TranslationModel trait and the Transformer
//                    encoder-decoder:
//                    • token + learned positional embeddings
//                    • encoder: self-attention + feed-forward
//                    • decoder: masked self-attention, cross-
//                      attention over the encoder output, FFN
//                    • dropout + linear projection to vocab
//
//   recurrent.rs   - GRU encoder-decoder behind the same trait
//
//   trainer.rs     - training loop with validation, per-epoch
//                    checkpoints and sample translations
//
//   inferencer.rs  - greedy autoregressive decoder
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need
//            Cho et al. (2014) GRU encoder-decoder

/// GPU backend (Vulkan / Metal / DX12 through wgpu)
pub type GpuBackend = burn::backend::Wgpu;

/// Pure-Rust CPU backend
pub type CpuBackend = burn::backend::NdArray;

/// Attention masks
pub mod masking;

/// Transformer encoder-decoder and the shared model trait
pub mod model;

/// GRU encoder-decoder
pub mod recurrent;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Greedy decoding from a trained checkpoint
pub mod inferencer;
