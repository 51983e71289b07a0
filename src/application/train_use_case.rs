// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus        (Layer 4 - data)
//   Step 2: Wrap targets in sentinels       (Layer 3 - domain)
//   Step 3: Shuffle once, split 3 ways      (Layer 4 - data)
//   Step 4: Fit preprocessing on train      (Layer 4 - data)
//   Step 5: Save preprocessing + config     (Layer 6 - infra)
//   Step 6: Vectorize into datasets         (Layer 4 - data)
//   Step 7: Run the training loop           (Layer 5 - ml)
//   Step 8: Log sample test translations    (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::{fmt, path::Path, str::FromStr};

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TranslationDataset,
    loader::{ParallelFiles, TsvCorpus},
    preprocessing::Preprocessing,
    splitter::split_three_way,
};
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::{CorpusSource, Persistable};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::TransformerConfig,
    recurrent::RecurrentConfig,
    trainer::{run_training, TrainingData},
};

// ─── Choice enums ─────────────────────────────────────────────────────────────
// Parsed from CLI strings through FromStr, stored in train_config.json
// through serde.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Transformer,
    Gru,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    RmsProp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeBackend {
    Wgpu,
    Cpu,
}

macro_rules! choice {
    ($ty:ty { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{other}', expected one of: {}",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(if *self == $variant { return f.write_str($name); })+
                Ok(())
            }
        }
    };
}

choice!(Architecture { "transformer" => Architecture::Transformer, "gru" => Architecture::Gru });
choice!(OptimizerKind { "adam" => OptimizerKind::Adam, "rmsprop" => OptimizerKind::RmsProp });
choice!(ComputeBackend { "wgpu" => ComputeBackend::Wgpu, "cpu" => ComputeBackend::Cpu });

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Tab-separated corpus (mutually exclusive with the two files below)
    pub corpus:              Option<String>,
    pub source_file:         Option<String>,
    pub target_file:         Option<String>,
    pub checkpoint_dir:      String,
    pub architecture:        Architecture,
    pub sequence_length:     usize,
    pub vocab_size:          usize,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub optimizer:           OptimizerKind,
    pub embed_dim:           usize,
    pub dense_dim:           usize,
    pub num_heads:           usize,
    pub num_layers:          usize,
    pub hidden_dim:          usize,
    /// Overrides the architecture's own default when set
    pub dropout:             Option<f64>,
    pub val_fraction:        f64,
    pub test_fraction:       f64,
    pub seed:                u64,
    pub sample_translations: usize,
    pub max_pairs:           Option<usize>,
    pub backend:             ComputeBackend,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus:              None,
            source_file:         None,
            target_file:         None,
            checkpoint_dir:      "checkpoints".to_string(),
            architecture:        Architecture::Transformer,
            sequence_length:     20,
            vocab_size:          15000,
            batch_size:          64,
            epochs:              30,
            lr:                  1e-3,
            optimizer:           OptimizerKind::Adam,
            embed_dim:           256,
            dense_dim:           2048,
            num_heads:           8,
            num_layers:          1,
            hidden_dim:          512,
            dropout:             None,
            val_fraction:        0.15,
            test_fraction:       0.15,
            seed:                42,
            sample_translations: 5,
            max_pairs:           None,
            backend:             ComputeBackend::Wgpu,
        }
    }
}

impl TrainConfig {
    /// Check everything that does not depend on the corpus. Model sizes
    /// are validated again once the vocabulary sizes are known.
    pub fn validate(&self) -> Result<()> {
        let has_tsv   = self.corpus.is_some();
        let has_files = self.source_file.is_some() && self.target_file.is_some();
        ensure!(
            has_tsv != has_files,
            "give either --corpus or both --source-file and --target-file"
        );
        ensure!(self.sequence_length > 0, "sequence_length must be > 0");
        ensure!(self.vocab_size > 2, "vocab_size must leave room beyond padding and [UNK]");
        ensure!(self.batch_size > 0, "batch_size must be > 0");
        ensure!(self.epochs > 0, "epochs must be > 0");
        ensure!(self.lr > 0.0, "learning rate must be positive");
        ensure!(
            (0.0..1.0).contains(&self.val_fraction) && (0.0..1.0).contains(&self.test_fraction),
            "split fractions must be in [0, 1)"
        );
        ensure!(
            self.val_fraction + self.test_fraction < 1.0,
            "val_fraction + test_fraction must leave a training split"
        );

        // Vocabulary sizes are placeholders; this only checks the widths
        match self.architecture {
            Architecture::Transformer => self.transformer_config(self.vocab_size, self.vocab_size).validate(),
            Architecture::Gru         => self.recurrent_config(self.vocab_size, self.vocab_size).validate(),
        }
    }

    pub fn transformer_config(&self, source_vocab: usize, target_vocab: usize) -> TransformerConfig {
        let config = TransformerConfig::new(source_vocab, target_vocab, self.sequence_length)
            .with_embed_dim(self.embed_dim)
            .with_dense_dim(self.dense_dim)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers);
        match self.dropout {
            Some(dropout) => config.with_dropout(dropout),
            None          => config,
        }
    }

    pub fn recurrent_config(&self, source_vocab: usize, target_vocab: usize) -> RecurrentConfig {
        let config = RecurrentConfig::new(source_vocab, target_vocab)
            .with_embed_dim(self.embed_dim)
            .with_hidden_dim(self.hidden_dim);
        match self.dropout {
            Some(dropout) => config.with_dropout(dropout),
            None          => config,
        }
    }

    fn corpus_source(&self) -> Result<Box<dyn CorpusSource>> {
        match (&self.corpus, &self.source_file, &self.target_file) {
            (Some(tsv), _, _) => Ok(Box::new(TsvCorpus::new(tsv))),
            (None, Some(src), Some(tgt)) => Ok(Box::new(ParallelFiles::new(src, tgt))),
            _ => bail!("no corpus configured"),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Validate the configuration up front so a bad flag fails before
    /// any corpus is read.
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the corpus ──────────────────────────────────────────
        let mut pairs = cfg.corpus_source()?.load_pairs()?;
        if let Some(max) = cfg.max_pairs {
            pairs.truncate(max);
        }
        ensure!(!pairs.is_empty(), "corpus contains no sentence pairs");

        // ── Step 2: Sentinels ─────────────────────────────────────────────────
        let pairs: Vec<SentencePair> = pairs.iter().map(SentencePair::with_sentinels).collect();

        // ── Step 3: Shuffle once and split ────────────────────────────────────
        let splits = split_three_way(pairs, cfg.val_fraction, cfg.test_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            splits.train.len(),
            splits.val.len(),
            splits.test.len()
        );
        ensure!(!splits.train.is_empty(), "training split is empty");

        // ── Step 4: Fit vocabularies on the training split only ───────────────
        let preprocessing = Preprocessing::fit(&splits.train, cfg.vocab_size, cfg.sequence_length)?;

        // ── Step 5: Persist everything inference will need ────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        preprocessing.save(Path::new(&cfg.checkpoint_dir))?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Vectorize ─────────────────────────────────────────────────
        let train = TranslationDataset::new(preprocessing.encode_pairs(&splits.train)?);
        let val   = TranslationDataset::new(preprocessing.encode_pairs(&splits.val)?);

        // ── Steps 7-8: Train, then translate a few held-out sentences ─────────
        let data = TrainingData { train, val, test: splits.test };
        run_training(cfg, &preprocessing, data, &ckpt_manager, &metrics)?;

        Ok(())
    }
}
