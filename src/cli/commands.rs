// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `translate`, and all
// their configurable flags.
//
// The choice flags (--arch, --optimizer, --backend) parse through
// the FromStr impls in the application layer, so clap never leaks
// past this file.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{
    Architecture, ComputeBackend, OptimizerKind, TrainConfig,
};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a translation model on a parallel corpus
    Train(TrainArgs),

    /// Translate one sentence with a trained checkpoint
    Translate(TranslateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Tab-separated corpus, one "source<TAB>target" pair per line
    #[arg(long, conflicts_with_all = ["source_file", "target_file"])]
    pub corpus: Option<String>,

    /// Source-language sentences, one per line
    #[arg(long, requires = "target_file")]
    pub source_file: Option<String>,

    /// Target-language sentences, line-aligned with --source-file
    #[arg(long, requires = "source_file")]
    pub target_file: Option<String>,

    /// Directory for weights, vocabularies and the saved config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Model family: transformer or gru
    #[arg(long = "arch", default_value = "transformer")]
    pub architecture: Architecture,

    /// Tokens per source sequence (targets get one extra)
    #[arg(long, default_value_t = 20)]
    pub sequence_length: usize,

    /// Vocabulary cap per language, including padding and [UNK]
    #[arg(long, default_value_t = 15000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Full passes through the training split
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// adam or rmsprop
    #[arg(long, default_value = "adam")]
    pub optimizer: OptimizerKind,

    /// Embedding width (the Transformer's model dimension)
    #[arg(long, default_value_t = 256)]
    pub embed_dim: usize,

    /// Inner width of the Transformer feed-forward blocks
    #[arg(long, default_value_t = 2048)]
    pub dense_dim: usize,

    /// Attention heads; must divide --embed-dim
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Stacked encoder and decoder blocks
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    /// GRU state width
    #[arg(long, default_value_t = 512)]
    pub hidden_dim: usize,

    /// Dropout rate (default: 0.1 for transformer, 0.5 for gru)
    #[arg(long)]
    pub dropout: Option<f64>,

    #[arg(long, default_value_t = 0.15)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 0.15)]
    pub test_fraction: f64,

    /// Seed for the split shuffle and batch order
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Held-out pairs to translate and log once training ends
    #[arg(long, default_value_t = 5)]
    pub sample_translations: usize,

    /// Only use the first N pairs of the corpus
    #[arg(long)]
    pub max_pairs: Option<usize>,

    /// wgpu or cpu
    #[arg(long, default_value = "wgpu")]
    pub backend: ComputeBackend,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus:              a.corpus,
            source_file:         a.source_file,
            target_file:         a.target_file,
            checkpoint_dir:      a.checkpoint_dir,
            architecture:        a.architecture,
            sequence_length:     a.sequence_length,
            vocab_size:          a.vocab_size,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            lr:                  a.lr,
            optimizer:           a.optimizer,
            embed_dim:           a.embed_dim,
            dense_dim:           a.dense_dim,
            num_heads:           a.num_heads,
            num_layers:          a.num_layers,
            hidden_dim:          a.hidden_dim,
            dropout:             a.dropout,
            val_fraction:        a.val_fraction,
            test_fraction:       a.test_fraction,
            seed:                a.seed,
            sample_translations: a.sample_translations,
            max_pairs:           a.max_pairs,
            backend:             a.backend,
        }
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// The source-language sentence to translate
    #[arg(long)]
    pub sentence: String,

    /// Directory where `train` saved its artifacts
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Upper bound on generated tokens (capped at the trained length)
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// wgpu or cpu
    #[arg(long, default_value = "wgpu")]
    pub backend: ComputeBackend,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "nmt-seq2seq", "train", "--corpus", "fra.txt", "--arch", "gru",
            "--optimizer", "rmsprop", "--backend", "cpu", "--max-pairs", "100",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.architecture, Architecture::Gru);
        assert_eq!(cfg.optimizer, OptimizerKind::RmsProp);
        assert_eq!(cfg.backend, ComputeBackend::Cpu);
        assert_eq!(cfg.max_pairs, Some(100));
        assert_eq!(cfg.sequence_length, 20);
        assert_eq!(cfg.dropout, None);
        assert_eq!(cfg.recurrent_config(10, 10).dropout, 0.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_corpus_conflicts_with_parallel_files() {
        let parsed = Cli::try_parse_from([
            "nmt-seq2seq", "train", "--corpus", "spa.txt",
            "--source-file", "en.txt", "--target-file", "es.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        let parsed = Cli::try_parse_from(["nmt-seq2seq", "train", "--corpus", "a", "--arch", "lstm"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_translate_defaults() {
        let cli = Cli::try_parse_from(["nmt-seq2seq", "translate", "--sentence", "Hi."]).unwrap();
        let Commands::Translate(args) = cli.command else { panic!("expected translate") };
        assert_eq!(args.checkpoint_dir, "checkpoints");
        assert_eq!(args.max_steps, None);
        assert_eq!(args.backend, ComputeBackend::Wgpu);
    }
}
