// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`     - fits vocabularies and trains a model on a
//                    parallel corpus
//   2. `translate` - loads a checkpoint and greedily decodes one
//                    sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

use crate::domain::traits::Translator;

#[derive(Parser, Debug)]
#[command(
    name = "nmt-seq2seq",
    version,
    about = "Train a Transformer or GRU translation model on a parallel corpus, then translate with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let use_case = TrainUseCase::new(args.into())?;
    tracing::info!("Starting training");
    use_case.execute()?;

    println!("Training complete. Checkpoints saved.");
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let use_case = TranslateUseCase::new(&args.checkpoint_dir, args.backend, args.max_steps)?;
    let translation = use_case.translate(&args.sentence)?;
    println!("{translation}");
    Ok(())
}
