//! Human-readable cards for predictions, training metrics, and curation
//! statistics.

use newsdesk_ai::ModelInfo;
use newsdesk_ai::api::{BatchItem, BatchResponse, PredictionResponse};
use newsdesk_ai::train::TrainingMetrics;
use newsdesk_store::CurationStats;

const BAR_WIDTH: usize = 30;

// ── Public API ──

pub fn print_prediction(r: &PredictionResponse) {
    println!("=== {} ===", r.category);
    println!("{}", r.input_text);
    println!();

    println!("Prediction");
    println!("  {:<26} {}", "category", r.category);
    println!("  {:<26} {:.4}", "confidence", r.confidence);
    println!("  {:<26} {}", "backend", r.backend);
    println!("  {:<26} {:.2} ms", "processing_time", r.processing_time * 1000.0);
    println!();

    println!("Scores");
    for s in &r.confidence_scores {
        println!("  {:<26} {:.4} {}", s.category.as_str(), s.score, bar(s.score));
    }
}

pub fn print_batch(r: &BatchResponse) {
    for (i, item) in r.predictions.iter().enumerate() {
        match item {
            BatchItem::Ok(p) => println!(
                "  {:>3}. {:<14} {:.4}  {}",
                i + 1,
                p.category.as_str(),
                p.confidence,
                p.input_text
            ),
            BatchItem::Err(e) => println!("  {:>3}. {:<14} {}  {}", i + 1, "error", e.error, e.text),
        }
    }
    println!();
    println!("{}/{} successful", r.successful, r.total);
}

pub fn print_metrics(m: &TrainingMetrics) {
    println!("Training");
    println!("  {:<26} {}", "trained_at", m.trained_at.to_rfc3339());
    println!("  {:<26} {}", "total_samples", m.total_samples);
    println!("  {:<26} {}", "train_size", m.train_size);
    println!("  {:<26} {}", "test_size", m.test_size);
    println!("  {:<26} {}", "vocabulary_size", m.vocabulary_size);
    match m.accuracy {
        Some(a) => println!("  {:<26} {:.4}", "accuracy", a),
        None => println!("  {:<26} n/a", "accuracy"),
    }

    if m.report.is_empty() {
        return;
    }
    println!();
    println!(
        "  {:<16} {:>9} {:>9} {:>9} {:>9}",
        "category", "precision", "recall", "f1", "support"
    );
    for r in &m.report {
        println!(
            "  {:<16} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            r.category.as_str(),
            r.precision,
            r.recall,
            r.f1,
            r.support
        );
    }
}

pub fn print_curation(s: &CurationStats) {
    println!("Curation");
    println!("  {:<26} {}", "input_rows", s.input_rows);
    println!("  {:<26} {}", "duplicate_rows", s.duplicate_rows);
    println!("  {:<26} {}", "missing_rows", s.missing_rows);
    println!("  {:<26} {}", "length_rejected", s.length_rejected);
    println!("  {:<26} {}", "unmapped_rows", s.unmapped_rows);
    println!("  {:<26} {}", "downsampled_rows", s.downsampled_rows);
    println!("  {:<26} {}", "output_rows", s.output_rows);

    if !s.sparse_categories.is_empty() {
        println!();
        println!("Dropped (below min support)");
        for (c, n) in &s.sparse_categories {
            println!("  {:<26} {}", c.as_str(), n);
        }
    }
    if !s.under_represented.is_empty() {
        println!();
        println!("Under-represented");
        for (c, n) in &s.under_represented {
            println!("  {:<26} {}", c.as_str(), n);
        }
    }

    println!();
    println!("Distribution");
    for (c, n) in &s.category_counts {
        let share = *n as f64 / s.output_rows.max(1) as f64;
        println!("  {:<26} {:>7} {}", c.as_str(), n, bar(share));
    }
}

pub fn print_info(info: &ModelInfo) {
    println!("Model");
    println!("  {:<26} {}", "statistical_loaded", info.statistical_loaded);
    println!("  {:<26} {}", "zero_shot_loaded", info.zero_shot_loaded);
    if let Some(name) = &info.zero_shot_name {
        println!("  {:<26} {}", "zero_shot_backend", name);
    }
    println!("  {:<26} {}", "vectorizer_features", info.vectorizer_features);
    println!("  {:<26} {}", "total_categories", info.total_categories);
    let names: Vec<&str> = info.categories.iter().map(|c| c.as_str()).collect();
    println!("  {:<26} {}", "categories", names.join(", "));
}

// ── Formatting helpers ──

/// Horizontal bar for a value in `[0, 1]`.
fn bar(value: f64) -> String {
    let filled = (value.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_and_clamps() {
        assert_eq!(bar(0.0), "");
        assert_eq!(bar(1.0).chars().count(), BAR_WIDTH);
        assert_eq!(bar(0.5).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(7.0).chars().count(), BAR_WIDTH);
        assert_eq!(bar(-1.0), "");
    }
}
