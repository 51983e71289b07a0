// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types and traits describing what the translator
// works with. Nothing in here touches Burn, the filesystem or
// the tokenizer library, so every rule below is unit-testable
// without a device.
//
//   sentence_pair.rs - a (source, target) pair and the sentinels
//   vocabulary.rs    - ordered token list, index = position
//   mask.rs          - causal / padding mask arithmetic
//   traits.rs        - seams implemented by the outer layers
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// A parallel sentence pair and the start / end sentinels
pub mod sentence_pair;

/// Immutable vocabulary with reserved padding and OOV slots
pub mod vocabulary;

/// Lower-triangular causal mask and its combination with padding
pub mod mask;

/// Core abstractions (traits) that other layers implement
pub mod traits;
