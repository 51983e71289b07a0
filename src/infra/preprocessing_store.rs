// ============================================================
// Layer 6 - Preprocessing Store
// ============================================================
// Persists the fitted Preprocessing so translation reuses it
// verbatim instead of re-fitting:
//
//   source_vocab.json       ["", "[UNK]", "i", "you", ...]
//   target_vocab.json       ["", "[UNK]", "[start]", "[end]", ...]
//   vectorization.json      sequence length, max tokens,
//                           standardization modes, sentinels
//   source_tokenizer.json   HuggingFace word-level tokenizers, for
//   target_tokenizer.json   use by other HF-compatible tools
//
// Vocabularies are plain JSON arrays where index = token id. The
// tokenizer files are derived from them and are not read back.

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

use crate::data::preprocessing::{Preprocessing, VectorizationConfig};
use crate::data::vectorizer::TextVectorizer;
use crate::domain::traits::Persistable;
use crate::domain::vocabulary::Vocabulary;

const SOURCE_VOCAB: &str = "source_vocab.json";
const TARGET_VOCAB: &str = "target_vocab.json";
const VECTORIZATION: &str = "vectorization.json";
const SOURCE_TOKENIZER: &str = "source_tokenizer.json";
const TARGET_TOKENIZER: &str = "target_tokenizer.json";

impl Persistable for Preprocessing {
    fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        write_json(&dir.join(VECTORIZATION), self.config())?;
        write_json(&dir.join(SOURCE_VOCAB), self.source().vocab())?;
        write_json(&dir.join(TARGET_VOCAB), self.target().vocab())?;
        save_tokenizer(self.source(), &dir.join(SOURCE_TOKENIZER))?;
        save_tokenizer(self.target(), &dir.join(TARGET_TOKENIZER))?;

        tracing::info!("Saved vocabularies and vectorization config to '{}'", dir.display());
        Ok(())
    }

    fn load(dir: &Path) -> Result<Self> {
        let config: VectorizationConfig = read_json(&dir.join(VECTORIZATION))?;
        let source: Vocabulary = read_json(&dir.join(SOURCE_VOCAB))?;
        let target: Vocabulary = read_json(&dir.join(TARGET_VOCAB))?;

        tracing::debug!(
            "Loaded vocabularies: {} source, {} target tokens",
            source.len(),
            target.len()
        );
        Preprocessing::from_parts(config, source, target)
    }
}

fn save_tokenizer(vectorizer: &TextVectorizer, path: &Path) -> Result<()> {
    vectorizer
        .tokenizer()
        .save(path, true)
        .map_err(|e| anyhow!("Cannot write tokenizer '{}': {e}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).with_context(|| {
        format!("Cannot read '{}'. Have you run 'train' first?", path.display())
    })?;
    serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
}
