// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer talks to corpora, translators and stored
// artifacts only through these traits:
//   - TsvCorpus and ParallelFiles implement CorpusSource
//   - TranslateUseCase implements Translator, whichever model
//     architecture and backend it loaded
//   - Preprocessing implements Persistable (see infra)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can yield parallel sentence pairs.
pub trait CorpusSource {
    /// Load every pair, in file order.
    fn load_pairs(&self) -> Result<Vec<SentencePair>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Turns one raw source-language sentence into a target-language sentence.
/// The output is bounded by the start sentinel and either the end
/// sentinel or whatever was produced when the step bound ran out.
pub trait Translator {
    fn translate(&self, sentence: &str) -> Result<String>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved to and restored from a
/// directory.
pub trait Persistable: Sized {
    fn save(&self, dir: &Path) -> Result<()>;

    fn load(dir: &Path) -> Result<Self>;
}
