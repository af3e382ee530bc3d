//! Training pipeline: read the curated corpus (or the built-in sample),
//! train, and persist the artifact through the service.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use newsdesk_ai::sample::sample_corpus;
use newsdesk_ai::train::TrainingMetrics;
use newsdesk_ai::{ClassifierService, TrainerConfig};
use newsdesk_core::LabeledDocument;

pub struct TrainStats {
    pub metrics: TrainingMetrics,
    pub used_sample: bool,
    pub elapsed_secs: f64,
}

/// Train on `corpus` when it exists, otherwise on the sample corpus, and
/// write the artifact into `model_dir`.
pub fn run_train_pipeline(
    model_dir: &Path,
    corpus: Option<&Path>,
    config: TrainerConfig,
) -> anyhow::Result<TrainStats> {
    let start = Instant::now();

    let (docs, used_sample) = load_documents(corpus)?;
    eprintln!("  Training on {} documents", docs.len());

    let service = ClassifierService::new(model_dir).with_trainer_config(config);
    let metrics = service
        .retrain(&docs)
        .with_context(|| format!("training model into {}", model_dir.display()))?;

    Ok(TrainStats {
        metrics,
        used_sample,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

fn load_documents(corpus: Option<&Path>) -> anyhow::Result<(Vec<LabeledDocument>, bool)> {
    match corpus {
        Some(path) if path.exists() => {
            let docs = newsdesk_store::read_corpus(path)
                .with_context(|| format!("reading corpus {}", path.display()))?;
            eprintln!("  Read {} rows from {}", docs.len(), path.display());
            Ok((docs, false))
        }
        Some(path) => {
            eprintln!(
                "  Corpus {} not found; using built-in sample data",
                path.display()
            );
            Ok((sample_corpus(), true))
        }
        None => Ok((sample_corpus(), true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_corpus_falls_back_to_sample() {
        let dir = tempfile::tempdir().unwrap();
        let stats = run_train_pipeline(
            dir.path(),
            Some(&dir.path().join("absent.csv")),
            TrainerConfig::default(),
        )
        .unwrap();
        assert!(stats.used_sample);
        assert_eq!(stats.metrics.total_samples, 56);
        assert!(dir.path().join("model.json").exists());
    }
}
