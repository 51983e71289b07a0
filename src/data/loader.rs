// ============================================================
// Layer 4 - Corpus Loaders
// ============================================================
// Reads parallel text from disk in either of the two layouts the
// training data comes in:
//
//   TsvCorpus       one pair per line, tab separated
//                     "Go.\tVe.\tCC-BY 2.0 (France) ..."
//                   columns after the second (attribution) are ignored
//
//   ParallelFiles   two files, one sentence per line, where line i
//                   of the source file translates line i of the
//                   target file
//
// Both are strict: a line with no tab, or files of different
// lengths, abort the load with the file and line in the error
// instead of silently producing misaligned pairs.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

/// Tab-separated corpus file.
pub struct TsvCorpus {
    path: PathBuf,
}

impl TsvCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for TsvCorpus {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        let text = read_text(&self.path)?;

        let mut pairs = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut columns = line.split('\t');
            let (Some(source), Some(target)) = (columns.next(), columns.next()) else {
                bail!(
                    "{}:{}: expected 'source<TAB>target', found no tab",
                    self.path.display(),
                    lineno + 1
                );
            };
            pairs.push(SentencePair::new(source.trim(), target.trim()));
        }

        tracing::info!("Loaded {} pairs from '{}'", pairs.len(), self.path.display());
        Ok(pairs)
    }
}

/// Two aligned per-language files.
pub struct ParallelFiles {
    source: PathBuf,
    target: PathBuf,
}

impl ParallelFiles {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl CorpusSource for ParallelFiles {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        let source_text = read_text(&self.source)?;
        let target_text = read_text(&self.target)?;

        let sources: Vec<&str> = source_text.lines().collect();
        let targets: Vec<&str> = target_text.lines().collect();

        if sources.len() != targets.len() {
            bail!(
                "'{}' has {} lines but '{}' has {}",
                self.source.display(),
                sources.len(),
                self.target.display(),
                targets.len()
            );
        }

        let pairs: Vec<SentencePair> = sources
            .iter()
            .zip(&targets)
            .filter(|(s, t)| !s.trim().is_empty() || !t.trim().is_empty())
            .map(|(s, t)| SentencePair::new(s.trim(), t.trim()))
            .collect();

        tracing::info!(
            "Loaded {} pairs from '{}' + '{}'",
            pairs.len(),
            self.source.display(),
            self.target.display()
        );
        Ok(pairs)
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read corpus file '{}'", path.display()))
}
