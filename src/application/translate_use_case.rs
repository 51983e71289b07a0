// ============================================================
// Layer 2 - TranslateUseCase
// ============================================================
// Loads everything a training run left in the checkpoint
// directory and translates sentences with it:
//
//   Step 1: Open the checkpoint directory        (Layer 6 - infra)
//   Step 2: Read train_config.json               (Layer 6 - infra)
//   Step 3: Restore vocabularies + vectorization (Layer 6 - infra)
//   Step 4: Rebuild the model, load the weights  (Layer 5 - ml)
//   Step 5: Greedy-decode each sentence          (Layer 5 - ml)

use std::path::Path;

use anyhow::Result;

use crate::application::train_use_case::ComputeBackend;
use crate::data::preprocessing::Preprocessing;
use crate::domain::traits::{Persistable, Translator};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{load_decoder, Decoded, SentenceDecoder};

pub struct TranslateUseCase {
    preprocessing: Preprocessing,
    decoder:       Box<dyn SentenceDecoder>,
}

impl TranslateUseCase {
    /// `max_steps` defaults to the trained sequence length and is never
    /// allowed to exceed it.
    pub fn new(
        checkpoint_dir: impl AsRef<Path>,
        backend:        ComputeBackend,
        max_steps:      Option<usize>,
    ) -> Result<Self> {
        let dir  = checkpoint_dir.as_ref();
        let ckpt = CheckpointManager::open(dir)?;
        let cfg  = ckpt.load_config()?;

        let preprocessing = Preprocessing::load(dir)?;
        let max_steps     = max_steps.unwrap_or(preprocessing.sequence_length());

        tracing::info!(
            "Loaded {} model (seq_len={}, max_steps={})",
            cfg.architecture,
            preprocessing.sequence_length(),
            max_steps
        );

        let decoder = load_decoder(&ckpt, &cfg, &preprocessing, backend, max_steps)?;
        Ok(Self { preprocessing, decoder })
    }

    /// Decode with the stop reason and step count kept.
    pub fn decode(&self, sentence: &str) -> Result<Decoded> {
        self.decoder.decode(&self.preprocessing, sentence)
    }
}

impl Translator for TranslateUseCase {
    fn translate(&self, sentence: &str) -> Result<String> {
        Ok(self.decode(sentence)?.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{Architecture, TrainConfig, TrainUseCase};

    fn write_corpus(dir: &Path) -> String {
        let path = dir.join("spa.txt");
        std::fs::write(
            &path,
            "Go.\tVe.\nHi.\tHola.\nRun!\t¡Corre!\nI am hungry.\tTengo hambre.\n\
             You go first.\tVe tú primero.\nWhere is it?\t¿Dónde está?\n\
             I see.\tYa veo.\nThank you.\tGracias.\n",
        )
        .unwrap();
        path.display().to_string()
    }

    fn train_tiny(dir: &Path, architecture: Architecture) -> String {
        train_tiny_with(dir, architecture, 0.25)
    }

    fn train_tiny_with(dir: &Path, architecture: Architecture, val_fraction: f64) -> String {
        let checkpoint_dir = dir.join("ckpt").display().to_string();
        let cfg = TrainConfig {
            corpus: Some(write_corpus(dir)),
            checkpoint_dir: checkpoint_dir.clone(),
            architecture,
            sequence_length: 5,
            vocab_size: 50,
            batch_size: 4,
            epochs: 1,
            embed_dim: 8,
            dense_dim: 16,
            num_heads: 2,
            hidden_dim: 8,
            val_fraction,
            test_fraction: 0.25,
            sample_translations: 0,
            backend: ComputeBackend::Cpu,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg).unwrap().execute().unwrap();
        checkpoint_dir
    }

    #[test]
    fn test_translate_after_training() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = train_tiny(dir.path(), Architecture::Transformer);

        let translator = TranslateUseCase::new(&ckpt, ComputeBackend::Cpu, None).unwrap();
        let out = translator.translate("You go first.").unwrap();
        assert!(out.starts_with("[start]"));

        let decoded = translator.decode("You go first.").unwrap();
        assert!(decoded.steps <= 5);
        assert_eq!(decoded.text(), out);
    }

    #[test]
    fn test_gru_checkpoint_and_step_cap() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = train_tiny(dir.path(), Architecture::Gru);

        let translator = TranslateUseCase::new(&ckpt, ComputeBackend::Cpu, Some(2)).unwrap();
        assert!(translator.decode("I see.").unwrap().steps <= 2);
    }

    #[test]
    fn test_retraining_ignores_previous_best_epoch() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = dir.path().join("ckpt");
        std::fs::create_dir_all(&ckpt).unwrap();
        std::fs::write(ckpt.join("best_epoch.json"), "7").unwrap();

        // Empty validation split: no epoch ever counts as an improvement
        let ckpt = train_tiny_with(dir.path(), Architecture::Gru, 0.0);

        let manager = CheckpointManager::open(&ckpt).unwrap();
        assert_eq!(manager.epoch_to_load().unwrap(), 1);
        assert!(TranslateUseCase::new(&ckpt, ComputeBackend::Cpu, None).is_ok());
    }

    #[test]
    fn test_missing_checkpoint_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TranslateUseCase::new(dir.path().join("nope"), ComputeBackend::Cpu, None);
        assert!(err.is_err());
    }
}
