// ============================================================
// Layer 3 - SentencePair Domain Type
// ============================================================
// One line of a parallel corpus: a sentence in the source
// language and its translation in the target language.
//
// The decoder learns to generate the target one token at a time,
// so during training the target is wrapped in two sentinel words:
//
//   "Tengo hambre."  →  "[start] Tengo hambre. [end]"
//
// "[start]" seeds generation at inference time and "[end]" tells
// the greedy decoder when to stop. Both keep their brackets through
// target-side standardization, so they can never collide with an
// ordinary word.

use serde::{Deserialize, Serialize};

/// Sentinel that opens every target sequence
pub const START_TOKEN: &str = "[start]";

/// Sentinel that closes every target sequence
pub const END_TOKEN: &str = "[end]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Sentence in the language we translate from
    pub source: String,

    /// Reference translation
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Returns a copy whose target is bounded by the start / end sentinels.
    /// Calling it twice does not double-wrap.
    pub fn with_sentinels(&self) -> Self {
        let target = self.target.trim();
        let target = if target.starts_with(START_TOKEN) && target.ends_with(END_TOKEN) {
            target.to_string()
        } else {
            format!("{START_TOKEN} {target} {END_TOKEN}")
        };
        Self {
            source: self.source.clone(),
            target,
        }
    }
}
