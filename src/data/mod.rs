// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between a corpus file on disk and a batch of Int
// tensors:
//
//   corpus file(s)
//       │
//       ▼
//   TsvCorpus / ParallelFiles  → Vec<SentencePair>
//       │
//       ▼
//   split_three_way            → train / val / test (shuffled once)
//       │
//       ▼
//   Preprocessing::fit         → source + target TextVectorizer
//       │                        (Preprocessor + Vocabulary + tokenizer)
//       ▼
//   TranslationDataset         → Burn's Dataset trait
//       │
//       ▼
//   TranslationBatcher         → [batch, seq_len] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads tab-separated or per-language parallel corpora
pub mod loader;

/// Lowercasing and punctuation stripping
pub mod preprocessor;

/// Standardize → tokenize → fixed-length ids
pub mod vectorizer;

/// The immutable source/target preprocessing pair
pub mod preprocessing;

/// Shuffles once and splits into train/validation/test
pub mod splitter;

/// Implements Burn's Dataset trait for translation samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
