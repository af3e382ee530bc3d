//! ONNX Runtime zero-shot classifier over an NLI model (e.g. BART-MNLI).
//!
//! Each candidate label becomes the hypothesis `"This example is {label}."`
//! paired with the article as premise. A label's score is the entailment
//! probability from a softmax over the contradiction and entailment logits,
//! so labels are scored independently.
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`; an
//! optional `config.json` supplies `label2id`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::zero_shot::{ZeroShotClassifier, ZeroShotError, ZeroShotScores};

const MAX_SEQUENCE_LENGTH: usize = 512;

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    label2id: HashMap<String, usize>,
}

pub struct NliZeroShot {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    entailment: usize,
    contradiction: usize,
}

impl NliZeroShot {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let (entailment, contradiction) = label_ids(&model_dir.join("config.json"))?;

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        info!(
            model = %model_path.display(),
            entailment,
            contradiction,
            "loaded zero-shot model"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            entailment,
            contradiction,
        })
    }
}

impl ZeroShotClassifier for NliZeroShot {
    fn name(&self) -> &str {
        "onnx-nli"
    }

    fn classify(&self, text: &str, labels: &[&str]) -> anyhow::Result<ZeroShotScores> {
        if labels.is_empty() {
            return Ok(ZeroShotScores::from_pairs(Vec::new()));
        }

        let pairs: Vec<(&str, String)> = labels
            .iter()
            .map(|label| (text, format!("This example is {label}.")))
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = id as i64;
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = mask as i64;
            }
        }

        let shape = [batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ZeroShotError::SessionPoisoned)?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])
            .context("zero-shot inference")?;

        // Logits: [batch_size, num_nli_labels].
        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2
                && dims[0] as usize == batch_size
                && (dims[1] as usize) > self.entailment.max(self.contradiction),
            "unexpected logits shape: {dims:?}"
        );
        let width = dims[1] as usize;

        let scored = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let row = &logits[i * width..(i + 1) * width];
                let p = entailment_probability(row[self.contradiction], row[self.entailment]);
                (label.to_string(), p)
            })
            .collect();

        debug!(labels = labels.len(), seq_len, "zero-shot scored");
        Ok(ZeroShotScores::from_pairs(scored))
    }
}

/// Softmax over `[contradiction, entailment]`, returning the entailment
/// share.
fn entailment_probability(contradiction: f32, entailment: f32) -> f64 {
    let (c, e) = (f64::from(contradiction), f64::from(entailment));
    let max = c.max(e);
    let ec = (c - max).exp();
    let ee = (e - max).exp();
    ee / (ec + ee)
}

/// Entailment and contradiction logit indices, from `config.json` when
/// present. MNLI heads default to contradiction 0, entailment 2.
fn label_ids(config_path: &Path) -> anyhow::Result<(usize, usize)> {
    if !config_path.exists() {
        return Ok((2, 0));
    }
    let json = std::fs::read_to_string(config_path)
        .with_context(|| format!("read {}", config_path.display()))?;
    let config: ModelConfig = serde_json::from_str(&json)
        .with_context(|| format!("parse {}", config_path.display()))?;

    let find = |name: &str| {
        config
            .label2id
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, &v)| v)
    };
    match (find("entailment"), find("contradiction")) {
        (Some(e), Some(c)) => Ok((e, c)),
        _ if config.label2id.is_empty() => Ok((2, 0)),
        _ => anyhow::bail!(
            "{} label2id lacks entailment/contradiction",
            config_path.display()
        ),
    }
}
