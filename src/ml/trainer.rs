// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader with Adam or
// RMSProp, generic over the backend and the model architecture.
//
//   - Training runs on an Autodiff backend (gradients, dropout on)
//   - model.valid() returns the same model on the inner backend,
//     so validation and sample decoding run without autodiff
//   - Loss is the mean cross-entropy over non-padding target
//     positions; accuracy counts non-padding tokens only
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::application::train_use_case::{Architecture, ComputeBackend, OptimizerKind, TrainConfig};
use crate::data::{
    batcher::TranslationBatcher,
    dataset::TranslationDataset,
    preprocessing::Preprocessing,
};
use crate::domain::sentence_pair::SentencePair;
use crate::domain::vocabulary::PAD_INDEX;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::inferencer::{GreedyDecoder, SentenceDecoder};
use crate::ml::model::TranslationModel;
use crate::ml::{CpuBackend, GpuBackend};

/// Vectorized train / validation sets plus the raw held-out test pairs.
pub struct TrainingData {
    pub train: TranslationDataset,
    pub val:   TranslationDataset,
    pub test:  Vec<SentencePair>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    preprocessing: &Preprocessing,
    data:          TrainingData,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<()> {
    match cfg.backend {
        ComputeBackend::Wgpu => train_on::<Autodiff<GpuBackend>>(
            cfg, preprocessing, data, ckpt_manager, metrics, Default::default(),
        ),
        ComputeBackend::Cpu => train_on::<Autodiff<CpuBackend>>(
            cfg, preprocessing, data, ckpt_manager, metrics, Default::default(),
        ),
    }
}

type Autodiff<B> = burn::backend::Autodiff<B>;

fn train_on<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    preprocessing: &Preprocessing,
    data:          TrainingData,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<()> {
    tracing::info!("Using device: {:?}", device);

    let source_vocab = preprocessing.source().vocab().len();
    let target_vocab = preprocessing.target().vocab().len();
    let TrainingData { train, val, test } = data;

    match cfg.architecture {
        Architecture::Transformer => {
            let model = cfg
                .transformer_config(source_vocab, target_vocab)
                .try_init::<B>(&device)?;
            tracing::info!(
                "Transformer ready: {} layers, embed_dim={}, heads={}",
                cfg.num_layers, cfg.embed_dim, cfg.num_heads
            );
            let model = fit::<B, _>(model, cfg, train, val, ckpt_manager, metrics, &device)?;
            log_sample_translations::<B::InnerBackend, _>(model.valid(), cfg, preprocessing, &test, device)
        }
        Architecture::Gru => {
            let model = cfg
                .recurrent_config(source_vocab, target_vocab)
                .try_init::<B>(&device)?;
            tracing::info!(
                "GRU encoder-decoder ready: embed_dim={}, hidden_dim={}",
                cfg.embed_dim, cfg.hidden_dim
            );
            let model = fit::<B, _>(model, cfg, train, val, ckpt_manager, metrics, &device)?;
            log_sample_translations::<B::InnerBackend, _>(model.valid(), cfg, preprocessing, &test, device)
        }
    }
}

/// Train `model` for `cfg.epochs` epochs and return the final weights.
pub fn fit<B, M>(
    model:         M,
    cfg:           &TrainConfig,
    train_dataset: TranslationDataset,
    val_dataset:   TranslationDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        &B::Device,
) -> Result<M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + TranslationModel<B>,
    M::InnerModule: TranslationModel<B::InnerBackend>,
{
    tracing::info!(
        "Training on {} samples, validating on {}",
        train_dataset.len(),
        val_dataset.len()
    );

    match cfg.optimizer {
        // m = β1*m + (1-β1)*g,  v = β2*v + (1-β2)*g²,  θ = θ - lr * m / (√v + ε)
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().with_epsilon(1e-8).init::<B, M>();
            train_epochs(model, optim, cfg, train_dataset, val_dataset, ckpt_manager, metrics, device)
        }
        // v = α*v + (1-α)*g²,  θ = θ - lr * g / (√v + ε)
        OptimizerKind::RmsProp => {
            let optim = RmsPropConfig::new().init::<B, M>();
            train_epochs(model, optim, cfg, train_dataset, val_dataset, ckpt_manager, metrics, device)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn train_epochs<B, M, O>(
    mut model:     M,
    mut optim:     O,
    cfg:           &TrainConfig,
    train_dataset: TranslationDataset,
    val_dataset:   TranslationDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        &B::Device,
) -> Result<M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + TranslationModel<B>,
    M::InnerModule: TranslationModel<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend - no autodiff overhead) ──────────
    let val_loader = DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut best_val_loss = f64::INFINITY;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let logits = model.forward(batch.encoder_input, batch.decoder_input);
            let loss   = sequence_loss(logits, batch.labels);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut val_batches   = 0usize;
        let mut correct       = 0usize;
        let mut total_tokens  = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.encoder_input, batch.decoder_input);

            let (hits, count) = token_accuracy_counts(logits.clone(), batch.labels.clone());
            correct      += hits;
            total_tokens += count;

            val_loss_sum += sequence_loss(logits, batch.labels).into_scalar().elem::<f64>();
            val_batches  += 1;
        }

        let avg_val_loss = if val_batches  > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let val_accuracy = if total_tokens > 0 { correct as f64 / total_tokens as f64 } else { 0.0 };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, val_accuracy * 100.0,
        );

        let row = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, val_accuracy);
        metrics.log(&row)?;

        ckpt_manager.save_model::<B, M>(&model, epoch)?;
        if row.is_improvement(best_val_loss) {
            best_val_loss = row.val_loss;
            ckpt_manager.mark_best(epoch)?;
            tracing::info!("New best val_loss {:.4} at epoch {}", best_val_loss, epoch);
        }
    }

    tracing::info!("Training complete!");
    Ok(model)
}

/// Mean cross-entropy over the non-padding target positions.
///
/// Burn's `pad_tokens` zeroes padded positions but still divides by
/// every position, so the mean is rescaled to the real-token count.
///
/// logits: [batch, len, vocab], labels: [batch, len]
pub fn sequence_loss<B: Backend>(logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [batch_size, seq_len, vocab_size] = logits.dims();
    let positions = (batch_size * seq_len) as f64;
    let ce = CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![PAD_INDEX as usize]))
        .init(&logits.device());

    let real_tokens = labels
        .clone()
        .equal_elem(PAD_INDEX as i64)
        .bool_not()
        .float()
        .sum()
        .clamp_min(1.0);

    let mean_over_positions = ce.forward(
        logits.reshape([batch_size * seq_len, vocab_size]),
        labels.reshape([batch_size * seq_len]),
    );
    mean_over_positions.mul_scalar(positions).div(real_tokens)
}

/// (correct, total) over non-padding label positions.
pub fn token_accuracy_counts<B: Backend>(
    logits: Tensor<B, 3>,
    labels: Tensor<B, 2, Int>,
) -> (usize, usize) {
    let [batch_size, seq_len, _] = logits.dims();

    // argmax(2) returns [batch, len, 1] - flatten to [batch, len]
    let predicted = logits.argmax(2).reshape([batch_size, seq_len]);
    let real      = labels.clone().equal_elem(PAD_INDEX as i64).bool_not().int();

    let hits = (predicted.equal(labels).int() * real.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let total = real.sum().into_scalar().elem::<i64>();

    (hits as usize, total as usize)
}

/// Greedy-translate a few random held-out pairs and log them next to
/// their references.
fn log_sample_translations<B: Backend, M: TranslationModel<B>>(
    model:         M,
    cfg:           &TrainConfig,
    preprocessing: &Preprocessing,
    test:          &[SentencePair],
    device:        B::Device,
) -> Result<()> {
    if cfg.sample_translations == 0 || test.is_empty() {
        return Ok(());
    }

    let decoder = GreedyDecoder::<B, M>::new(model, device, preprocessing.sequence_length());
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    for pair in test.choose_multiple(&mut rng, cfg.sample_translations) {
        let decoded = decoder.decode(preprocessing, &pair.source)?;
        tracing::info!(
            "\n  source:    {}\n  reference: {}\n  predicted: {}",
            pair.source,
            pair.target,
            decoded.text()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::TransformerConfig;
    use crate::ml::recurrent::RecurrentConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;
    type TestAutodiff = burn::backend::Autodiff<NdArray>;

    fn ints<const D: usize>(values: &[i32], shape: [usize; D]) -> Tensor<TestBackend, D, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default()).reshape(shape)
    }

    #[test]
    fn test_accuracy_ignores_padding() {
        // vocab of 3; predictions are the argmax of each row
        let logits = Tensor::<TestBackend, 1>::from_floats(
            [
                0.0, 9.0, 0.0, // → 1
                0.0, 0.0, 9.0, // → 2
                9.0, 0.0, 0.0, // → 0 (padding position)
            ],
            &Default::default(),
        )
        .reshape([1, 3, 3]);
        let labels = ints(&[1, 1, 0], [1, 3]);

        assert_eq!(token_accuracy_counts(logits, labels), (1, 2));
    }

    #[test]
    fn test_loss_ignores_padding_positions() {
        let device = Default::default();
        let base = Tensor::<TestBackend, 1>::from_floats(
            [2.0, 0.5, 0.1, 0.3, 1.5, 0.2],
            &device,
        )
        .reshape([1, 2, 3]);
        // Same first position, wildly different (padded) second position
        let other = Tensor::<TestBackend, 1>::from_floats(
            [2.0, 0.5, 0.1, 9.0, -4.0, 7.0],
            &device,
        )
        .reshape([1, 2, 3]);
        let labels = ints(&[1, 0], [1, 2]);

        let a = sequence_loss(base, labels.clone()).into_scalar();
        let b = sequence_loss(other, labels).into_scalar();
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn test_loss_is_mean_over_real_tokens_only() {
        let device = Default::default();
        let row    = [2.0f32, 0.5, 0.1];
        // One real position followed by three padded ones
        let logits = Tensor::<TestBackend, 1>::from_floats(
            [2.0, 0.5, 0.1, 1.0, 1.0, 1.0, 3.0, 0.0, 0.0, 0.0, 4.0, 0.0],
            &device,
        )
        .reshape([1, 4, 3]);
        let labels = ints(&[1, 0, 0, 0], [1, 4]);

        let log_sum_exp = row.iter().map(|x| x.exp()).sum::<f32>().ln();
        let expected    = log_sum_exp - row[1];

        let loss = sequence_loss(logits, labels).into_scalar();
        assert!((loss - expected).abs() < 1e-4, "loss {loss} != {expected}");
    }

    fn tiny_run(dir: &std::path::Path, architecture: Architecture) -> (TrainConfig, Preprocessing, TrainingData) {
        let pairs: Vec<SentencePair> = [
            ("You go first.", "Ve tú primero."),
            ("I am hungry.", "Tengo hambre."),
            ("Where is it?", "¿Dónde está?"),
            ("Go.", "Ve."),
        ]
        .iter()
        .map(|(s, t)| SentencePair::new(*s, *t).with_sentinels())
        .collect();

        let cfg = TrainConfig {
            corpus: Some("unused.tsv".into()),
            checkpoint_dir: dir.display().to_string(),
            architecture,
            sequence_length: 6,
            batch_size: 2,
            epochs: 2,
            embed_dim: 8,
            dense_dim: 16,
            num_heads: 2,
            hidden_dim: 8,
            sample_translations: 1,
            backend: ComputeBackend::Cpu,
            ..TrainConfig::default()
        };
        let prep = Preprocessing::fit(&pairs, 100, cfg.sequence_length).unwrap();
        let data = TrainingData {
            train: TranslationDataset::new(prep.encode_pairs(&pairs).unwrap()),
            val:   TranslationDataset::new(prep.encode_pairs(&pairs[..2]).unwrap()),
            test:  pairs[2..].to_vec(),
        };
        (cfg, prep, data)
    }

    #[test]
    fn test_transformer_training_smoke_run() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, prep, data) = tiny_run(dir.path(), Architecture::Transformer);
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();

        let model = TransformerConfig::new(prep.source().vocab().len(), prep.target().vocab().len(), 6)
            .with_embed_dim(8)
            .with_dense_dim(16)
            .with_num_heads(2)
            .init::<TestAutodiff>(&Default::default());
        fit(model, &cfg, data.train, data.val, &ckpt, &metrics, &Default::default()).unwrap();

        assert!(dir.path().join("model_epoch_2.mpk.gz").exists());
        assert!(ckpt.epoch_to_load().unwrap() <= 2);

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_run_training_on_cpu_with_gru() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, prep, data) = tiny_run(dir.path(), Architecture::Gru);
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();

        run_training(&cfg, &prep, data, &ckpt, &metrics).unwrap();
        assert!(dir.path().join("model_epoch_1.mpk.gz").exists());
        assert!(dir.path().join("latest_epoch.json").exists());

        // The recorded weights load back into a freshly built model
        let fresh = RecurrentConfig::new(prep.source().vocab().len(), prep.target().vocab().len())
            .with_embed_dim(8)
            .with_hidden_dim(8)
            .init::<TestBackend>(&Default::default());
        assert!(ckpt.load_model(fresh, &Default::default()).is_ok());
    }
}
