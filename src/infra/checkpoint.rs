// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores model weights with Burn's gzipped named
// MessagePack recorder at half precision.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) after every epoch
//   2. latest_epoch.json  - the epoch saved last
//   3. best_epoch.json    - the epoch with the lowest val loss
//   4. train_config.json  - architecture + hyperparameters
//
// The config is needed to rebuild the exact same module tree
// before the weights can be loaded into it. Loading prefers the
// best epoch and falls back to the latest one.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     latest_epoch.json
//     best_epoch.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder},
};

use crate::application::train_use_case::TrainConfig;

/// Half-precision weights, written as `<name>.mpk.gz`.
type WeightRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

const LATEST_EPOCH: &str = "latest_epoch.json";
const BEST_EPOCH: &str = "best_epoch.json";
const TRAIN_CONFIG: &str = "train_config.json";

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Start a training run in `dir`, creating it like `mkdir -p`.
    ///
    /// Epoch pointers left by an earlier run in the same directory are
    /// removed, so they can never point at that run's weights.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;

        for pointer in [LATEST_EPOCH, BEST_EPOCH] {
            let path = dir.join(pointer);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
                tracing::debug!("Removed stale epoch pointer '{}'", path.display());
            }
        }
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory for inference.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint directory '{}' not found. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    /// Save model weights for `epoch` and move the latest pointer.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        // Without extension - the recorder adds .mpk.gz
        let path = self.model_path(epoch);

        model
            .clone()
            .save_file(path.clone(), &WeightRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_epoch(LATEST_EPOCH, epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Record `epoch` as the best one seen so far.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_epoch(BEST_EPOCH, epoch)
    }

    /// Load weights from the best (or else latest) checkpoint into `model`.
    /// The module tree must match the one that was saved.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.epoch_to_load()?;
        let path  = self.model_path(epoch);

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        model
            .load_file(path.clone(), &WeightRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(TRAIN_CONFIG);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'translate'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Best epoch if one was recorded, otherwise the latest. A best epoch
    /// past the latest one cannot belong to this run and is ignored.
    pub fn epoch_to_load(&self) -> Result<usize> {
        let latest = self.read_epoch(LATEST_EPOCH)?;
        match self.read_epoch(BEST_EPOCH) {
            Ok(best) if best <= latest => Ok(best),
            Ok(best) => {
                tracing::warn!("Ignoring best epoch {} beyond latest epoch {}", best, latest);
                Ok(latest)
            }
            Err(_) => Ok(latest),
        }
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn write_epoch(&self, file: &str, epoch: usize) -> Result<()> {
        let path = self.dir.join(file);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }

    fn read_epoch(&self, file: &str) -> Result<usize> {
        let path = self.dir.join(file);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
