// ============================================================
// Layer 4 - Preprocessing
// ============================================================
// The single, immutable preprocessing configuration shared by the
// training and inference entry points:
//
//   source vectorizer   sequence_length ids, LowerStripPunctuation
//   target vectorizer   sequence_length + 1 ids, TargetSentinels
//
// The target gets one extra slot because teacher forcing shifts it:
// decoder input is target[..L], labels are target[1..].
//
// It is fitted exactly once on the TRAINING split, written to the
// checkpoint directory and reloaded verbatim for translation. It is
// passed by reference; nothing is stored in globals.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::dataset::TranslationSample;
use crate::data::preprocessor::Standardize;
use crate::data::vectorizer::TextVectorizer;
use crate::domain::sentence_pair::{SentencePair, END_TOKEN, START_TOKEN};
use crate::domain::vocabulary::Vocabulary;

/// Everything except the vocabularies that is needed to rebuild the
/// vectorizers. Persisted as vectorization.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizationConfig {
    pub sequence_length:    usize,
    pub max_tokens:         usize,
    pub source_standardize: Standardize,
    pub target_standardize: Standardize,
    pub start_token:        String,
    pub end_token:          String,
}

pub struct Preprocessing {
    config: VectorizationConfig,
    source: TextVectorizer,
    target: TextVectorizer,
}

impl Preprocessing {
    /// Fit both vocabularies on `train` pairs. Targets must already carry
    /// the sentinels (see `SentencePair::with_sentinels`).
    pub fn fit(train: &[SentencePair], max_tokens: usize, sequence_length: usize) -> Result<Self> {
        let config = VectorizationConfig {
            sequence_length,
            max_tokens,
            source_standardize: Standardize::LowerStripPunctuation,
            target_standardize: Standardize::TargetSentinels,
            start_token:        START_TOKEN.to_string(),
            end_token:          END_TOKEN.to_string(),
        };

        let source = TextVectorizer::adapt(
            train.iter().map(|p| p.source.as_str()),
            max_tokens,
            sequence_length,
            config.source_standardize,
        )?;
        let target = TextVectorizer::adapt(
            train.iter().map(|p| p.target.as_str()),
            max_tokens,
            sequence_length + 1,
            config.target_standardize,
        )?;

        tracing::info!(
            "Vocabularies fitted: {} source tokens, {} target tokens",
            source.vocab().len(),
            target.vocab().len()
        );
        Ok(Self { config, source, target })
    }

    /// Rebuild from persisted parts without re-fitting.
    pub fn from_parts(
        config:       VectorizationConfig,
        source_vocab: Vocabulary,
        target_vocab: Vocabulary,
    ) -> Result<Self> {
        let source = TextVectorizer::from_vocabulary(
            source_vocab,
            config.sequence_length,
            config.source_standardize,
        )?;
        let target = TextVectorizer::from_vocabulary(
            target_vocab,
            config.sequence_length + 1,
            config.target_standardize,
        )?;
        Ok(Self { config, source, target })
    }

    /// Vectorize one pair into a teacher-forcing sample.
    pub fn encode_pair(&self, pair: &SentencePair) -> Result<TranslationSample> {
        let encoder_input = self.source.vectorize(&pair.source)?;
        let target        = self.target.vectorize(&pair.target)?;
        Ok(TranslationSample::new(encoder_input, &target))
    }

    pub fn encode_pairs(&self, pairs: &[SentencePair]) -> Result<Vec<TranslationSample>> {
        pairs.iter().map(|p| self.encode_pair(p)).collect()
    }

    pub fn config(&self) -> &VectorizationConfig {
        &self.config
    }

    pub fn source(&self) -> &TextVectorizer {
        &self.source
    }

    pub fn target(&self) -> &TextVectorizer {
        &self.target
    }

    /// Source length L. Decoder inputs have the same length.
    pub fn sequence_length(&self) -> usize {
        self.config.sequence_length
    }

    pub fn start_token(&self) -> &str {
        &self.config.start_token
    }

    pub fn end_token(&self) -> &str {
        &self.config.end_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<SentencePair> {
        vec![
            SentencePair::new("You go first.", "Ve tú primero."),
            SentencePair::new("I am hungry!", "¡Tengo hambre!"),
        ]
        .iter()
        .map(SentencePair::with_sentinels)
        .collect()
    }

    #[test]
    fn test_fit_builds_both_sides() {
        let prep = Preprocessing::fit(&pairs(), 100, 5).unwrap();
        assert!(prep.source().vocab().contains("hungry"));
        assert!(prep.target().vocab().contains("[start]"));
        assert!(prep.target().vocab().contains("¡tengo"));
        assert!(!prep.source().vocab().contains("[start]"));
    }

    #[test]
    fn test_encode_pair_lengths() {
        let prep   = Preprocessing::fit(&pairs(), 100, 5).unwrap();
        let sample = prep.encode_pair(&pairs()[0]).unwrap();
        assert_eq!(sample.encoder_input.len(), 5);
        assert_eq!(sample.decoder_input.len(), 5);
        assert_eq!(sample.labels.len(), 5);
        assert_eq!(sample.decoder_input[0], prep.target().vocab().id("[start]"));
        assert_eq!(sample.labels[2], prep.target().vocab().id("primero"));
    }

    #[test]
    fn test_from_parts_reproduces_ids() {
        let prep  = Preprocessing::fit(&pairs(), 100, 5).unwrap();
        let again = Preprocessing::from_parts(
            prep.config().clone(),
            prep.source().vocab().clone(),
            prep.target().vocab().clone(),
        )
        .unwrap();

        let pair = &pairs()[1];
        assert_eq!(prep.encode_pair(pair).unwrap(), again.encode_pair(pair).unwrap());
    }
}
