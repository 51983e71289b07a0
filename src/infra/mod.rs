// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting persistence that several layers rely on:
//
//   checkpoint.rs          - model weights (gzipped MessagePack),
//                            epoch pointers and train_config.json
//
//   preprocessing_store.rs - vocabularies, vectorization config and
//                            HF tokenizer files; guarantees that
//                            translation tokenizes exactly like
//                            training did
//
//   metrics.rs             - per-epoch loss / accuracy CSV
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Persistable impl for Preprocessing
pub mod preprocessing_store;

/// Training metrics CSV logger
pub mod metrics;
