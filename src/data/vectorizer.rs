// ============================================================
// Layer 4 - Text Vectorizer
// ============================================================
// Turns a sentence into a fixed-length id sequence:
//
//   "You go first!"
//     → standardize   "you go first"
//     → tokenize      ["you", "go", "first"]
//     → look up       [12, 48, 301]
//     → pad/truncate  [12, 48, 301, 0, 0, ... 0]   (sequence_length)
//
// Tokenization runs through a HuggingFace word-level Tokenizer
// generated from our own Vocabulary, so the ids are identical to
// vocabulary positions and the tokenizer file can be handed to any
// other HF-compatible tool. Words outside the vocabulary come back
// as [UNK] (id 1) instead of failing.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde_json::json;
use tokenizers::Tokenizer;

use crate::data::preprocessor::{Preprocessor, Standardize};
use crate::domain::vocabulary::{Vocabulary, PAD_INDEX, UNK_TOKEN};

pub struct TextVectorizer {
    vocab:           Vocabulary,
    tokenizer:       Tokenizer,
    preprocessor:    Preprocessor,
    sequence_length: usize,
}

impl TextVectorizer {
    /// Fit a vocabulary of at most `max_tokens` entries on `texts`.
    pub fn adapt<'a, I>(
        texts:           I,
        max_tokens:      usize,
        sequence_length: usize,
        mode:            Standardize,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let preprocessor     = Preprocessor::new(mode);
        let cleaned: Vec<String> = texts.into_iter().map(|t| preprocessor.clean(t)).collect();
        let vocab = Vocabulary::adapt(cleaned.iter().map(String::as_str), max_tokens);

        tracing::debug!(
            "Adapted {:?} vocabulary: {} tokens from {} texts",
            mode,
            vocab.len(),
            cleaned.len()
        );
        Self::from_vocabulary(vocab, sequence_length, mode)
    }

    /// Rebuild a vectorizer around an existing vocabulary (no re-fitting).
    pub fn from_vocabulary(
        vocab:           Vocabulary,
        sequence_length: usize,
        mode:            Standardize,
    ) -> Result<Self> {
        let tokenizer = Tokenizer::from_str(&word_level_json(&vocab).to_string())
            .map_err(|e| anyhow!("Cannot build word-level tokenizer: {e}"))?;
        Ok(Self {
            vocab,
            tokenizer,
            preprocessor: Preprocessor::new(mode),
            sequence_length,
        })
    }

    /// Standardize, tokenize and pad `text` to `sequence_length` ids.
    pub fn vectorize(&self, text: &str) -> Result<Vec<u32>> {
        let cleaned  = self.preprocessor.clean(text);
        let encoding = self
            .tokenizer
            .encode(cleaned.as_str(), false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        let mut ids = encoding.get_ids().to_vec();
        ids.truncate(self.sequence_length);
        ids.resize(self.sequence_length, PAD_INDEX);
        Ok(ids)
    }

    /// Index → string lookup for every id.
    pub fn decode(&self, ids: &[u32]) -> Vec<String> {
        self.vocab.decode(ids)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}

/// HuggingFace tokenizer JSON for a word-level model over `vocab`.
/// Text is standardized before it reaches the tokenizer, so no
/// normalizer is configured and splitting is on whitespace only.
fn word_level_json(vocab: &Vocabulary) -> serde_json::Value {
    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab.token_to_id(),
            "unk_token": UNK_TOKEN
        }
    })
}
