// ============================================================
// Layer 4 - Text Standardization
// ============================================================
// Puts raw sentences into the canonical form the vocabulary was
// fitted on. Training and inference MUST run the same rule, so the
// chosen mode is stored in vectorization.json with the vocabulary.
//
// Steps (applied in order):
//   1. Lowercase
//   2. Drop punctuation characters (the set depends on the mode)
//   3. Map tabs, non-breaking spaces and control chars to spaces
//   4. Collapse runs of whitespace and trim
//
// Two modes:
//   LowerStripPunctuation   source side, all ASCII punctuation
//   TargetSentinels         target side, ASCII punctuation plus
//                           '¿' but keeping '[' and ']' so the
//                           "[start]" / "[end]" sentinels survive
//
// Reference: Rust Book §8 (Strings in Rust)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standardize {
    LowerStripPunctuation,
    TargetSentinels,
}

impl Standardize {
    fn strips(self, c: char) -> bool {
        match self {
            Standardize::LowerStripPunctuation => c.is_ascii_punctuation(),
            Standardize::TargetSentinels => {
                (c.is_ascii_punctuation() && c != '[' && c != ']') || c == '¿'
            }
        }
    }
}

pub struct Preprocessor {
    mode: Standardize,
}

impl Preprocessor {
    pub fn new(mode: Standardize) -> Self {
        Self { mode }
    }

    /// Standardize one sentence. Takes a &str and returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        // ── Steps 1-3: per-character normalisation ───────────────────────────
        let chars = text
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|&c| !self.strips(c))
            .map(|c| match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            });

        // ── Step 4: collapse whitespace ───────────────────────────────────────
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;
        for c in chars {
            if c.is_whitespace() {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        if out.ends_with(' ') {
            out.pop();
        }
        out
    }

    fn strips(&self, c: char) -> bool {
        self.mode.strips(c)
    }
}
