// ============================================================
// Layer 3 - Vocabulary
// ============================================================
// An ordered list of token strings where a token's integer id is
// simply its position in the list:
//
//   index 0 → ""       padding, fills short sequences
//   index 1 → "[UNK]"  every word the vocabulary has never seen
//   index 2.. content tokens, most frequent first
//
// The vocabulary is fitted once on the training split and never
// mutated afterwards. It is saved next to the model weights so the
// exact same mapping is used at inference time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Padding id. Never produced for a real word.
pub const PAD_INDEX: u32 = 0;

/// Out-of-vocabulary id.
pub const UNK_INDEX: u32 = 1;

pub const PAD_TOKEN: &str = "";
pub const UNK_TOKEN: &str = "[UNK]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    tokens: Vec<String>,
    index:  HashMap<String, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from word frequencies.
    ///
    /// Words are ranked by descending count, ties broken alphabetically so
    /// the same corpus always yields the same ids. At most `max_tokens`
    /// entries are kept including the two reserved slots.
    pub fn from_counts(counts: HashMap<String, usize>, max_tokens: usize) -> Self {
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(word, _)| !is_reserved(word))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_tokens.saturating_sub(2));

        let tokens = ranked.into_iter().map(|(word, _)| word);
        Self::from_tokens(tokens)
    }

    /// Count whitespace-separated words across `texts` and rank them.
    pub fn adapt<'a, I>(texts: I, max_tokens: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                *counts.entry(word.to_string()).or_insert(0) += 1;
            }
        }
        Self::from_counts(counts, max_tokens)
    }

    /// Build from content tokens. Reserved entries are always placed first
    /// and any duplicate or reserved content token is dropped.
    pub fn from_tokens<I>(content: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut tokens = vec![PAD_TOKEN.to_string(), UNK_TOKEN.to_string()];
        let mut index  = HashMap::new();
        index.insert(PAD_TOKEN.to_string(), PAD_INDEX);
        index.insert(UNK_TOKEN.to_string(), UNK_INDEX);

        for token in content {
            if index.contains_key(&token) {
                continue;
            }
            index.insert(token.clone(), tokens.len() as u32);
            tokens.push(token);
        }
        Self { tokens, index }
    }

    /// Id of `token`, or the OOV id when it is unknown.
    pub fn id(&self, token: &str) -> u32 {
        self.index.get(token).copied().unwrap_or(UNK_INDEX)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Token string at `id`. Ids past the end resolve to the OOV token.
    pub fn token(&self, id: u32) -> &str {
        self.tokens
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or(UNK_TOKEN)
    }

    /// Map ids back to strings, one entry per id.
    pub fn decode(&self, ids: &[u32]) -> Vec<String> {
        ids.iter().map(|&id| self.token(id).to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The full ordered token list (index = id).
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// token → id map, used to generate the word-level tokenizer.
    pub fn token_to_id(&self) -> &HashMap<String, u32> {
        &self.index
    }
}

fn is_reserved(word: &str) -> bool {
    word == PAD_TOKEN || word == UNK_TOKEN
}

impl From<Vec<String>> for Vocabulary {
    /// Restore a persisted list. The first two slots are the reserved ones,
    /// so they are skipped and re-inserted by `from_tokens`.
    fn from(list: Vec<String>) -> Self {
        Self::from_tokens(list.into_iter().skip_while(|t| is_reserved(t)))
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.tokens
    }
}
