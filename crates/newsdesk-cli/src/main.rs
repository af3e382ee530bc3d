mod display;
mod train;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use newsdesk_ai::api::ArticleRequest;
use newsdesk_ai::{ClassifierService, Dispatcher, TrainerConfig, VectorizerConfig};
use newsdesk_store::CurationPlan;
use serde::Serialize;

/// News topic classification: curate corpora, train, and predict.
#[derive(Parser, Debug)]
#[command(name = "newsdesk", version, about)]
struct Cli {
    /// Directory holding model.json and metrics.json
    #[arg(long, env = "NEWSDESK_MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    /// Directory holding an ONNX NLI model for the external backend
    #[arg(long, env = "NEWSDESK_ZERO_SHOT_DIR")]
    zero_shot_dir: Option<PathBuf>,

    /// Print JSON instead of cards
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a curated corpus from a JSON curation plan
    Curate {
        plan: PathBuf,
    },

    /// Train the statistical model
    Train {
        /// Curated corpus CSV (text,category); the built-in sample is used
        /// when absent
        #[arg(long)]
        corpus: Option<PathBuf>,

        #[arg(long, default_value_t = 1000)]
        max_features: usize,

        #[arg(long, default_value_t = 1.0)]
        alpha: f64,

        #[arg(long, default_value_t = 0.2)]
        test_ratio: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Classify a single text
    Predict {
        text: String,

        /// statistical (sklearn) or external (transformer)
        #[arg(long, short)]
        backend: Option<String>,
    },

    /// Classify the contents of a UTF-8 text file
    PredictFile {
        path: PathBuf,

        #[arg(long, short)]
        backend: Option<String>,
    },

    /// Classify every non-blank line of a file
    Batch {
        path: PathBuf,

        #[arg(long, short)]
        backend: Option<String>,
    },

    /// List the categories the model predicts
    Categories,

    /// Show loaded backends and model dimensions
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!("newsdesk v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Curate { ref plan } => {
            let plan = CurationPlan::from_file(plan)
                .with_context(|| format!("loading curation plan {}", plan.display()))?;
            let stats = plan.run().context("curating corpus")?;
            if cli.json {
                print_json(&stats)?;
            } else {
                display::print_curation(&stats);
                println!();
                println!("Wrote {}", plan.output.display());
            }
        }

        Command::Train {
            ref corpus,
            max_features,
            alpha,
            test_ratio,
            seed,
        } => {
            let config = TrainerConfig {
                vectorizer: VectorizerConfig {
                    max_features,
                    ..VectorizerConfig::default()
                },
                alpha,
                test_ratio,
                seed,
            };
            let stats = train::run_train_pipeline(&cli.model_dir, corpus.as_deref(), config)?;
            if cli.json {
                print_json(&stats.metrics)?;
            } else {
                display::print_metrics(&stats.metrics);
                println!();
                println!(
                    "Saved model to {} in {:.2}s{}",
                    cli.model_dir.display(),
                    stats.elapsed_secs,
                    if stats.used_sample { " (sample data)" } else { "" }
                );
            }
        }

        Command::Predict { ref text, ref backend } => {
            let api = dispatcher(&cli)?;
            let request = ArticleRequest {
                text: text.clone(),
                backend: backend.clone(),
            };
            let response = api.predict(request).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                display::print_prediction(&response);
            }
        }

        Command::PredictFile { ref path, ref backend } => {
            let api = dispatcher(&cli)?;
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let response = api.predict_file(bytes, backend.clone()).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                display::print_prediction(&response);
            }
        }

        Command::Batch { ref path, ref backend } => {
            let api = dispatcher(&cli)?;
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let requests: Vec<ArticleRequest> = content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| ArticleRequest {
                    text: l.to_string(),
                    backend: backend.clone(),
                })
                .collect();
            let response = api.batch_predict(requests).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                display::print_batch(&response);
            }
        }

        Command::Categories => {
            let api = dispatcher(&cli)?;
            let categories = api.categories();
            if cli.json {
                print_json(&categories)?;
            } else {
                for c in &categories.categories {
                    println!("{c}");
                }
            }
        }

        Command::Info => {
            let api = dispatcher(&cli)?;
            let info = api.model_info();
            if cli.json {
                print_json(&info)?;
            } else {
                display::print_info(&info);
            }
        }
    }

    Ok(())
}

fn dispatcher(cli: &Cli) -> anyhow::Result<Dispatcher> {
    let service = ClassifierService::load(&cli.model_dir).with_context(|| {
        format!(
            "loading model from {} (run `newsdesk train` first)",
            cli.model_dir.display()
        )
    })?;
    let service = attach_zero_shot(service, cli.zero_shot_dir.as_deref())?;
    Ok(Dispatcher::new(Arc::new(service)))
}

#[cfg(feature = "onnx")]
fn attach_zero_shot(
    service: ClassifierService,
    dir: Option<&Path>,
) -> anyhow::Result<ClassifierService> {
    let Some(dir) = dir else {
        return Ok(service);
    };
    match newsdesk_ai::NliZeroShot::load(dir) {
        Ok(model) => Ok(service.with_zero_shot(Arc::new(model))),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "zero-shot model unavailable");
            Ok(service)
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn attach_zero_shot(
    service: ClassifierService,
    dir: Option<&Path>,
) -> anyhow::Result<ClassifierService> {
    if let Some(dir) = dir {
        tracing::warn!(
            dir = %dir.display(),
            "built without the `onnx` feature; zero-shot backend disabled"
        );
    }
    Ok(service)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
