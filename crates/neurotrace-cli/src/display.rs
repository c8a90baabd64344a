//! Vertical card display for ensemble predictions.
//!
//! Renders an [`EnsembleResponse`] as a grouped, human-readable card with
//! class names from [`ClassLabels`].

use std::fmt::Write;

use neurotrace_core::{ClassLabels, EnsembleResponse, ErrorResponse, PredictionView};

// ── Public API ──

/// Print an ensemble prediction as a vertical card.
pub fn print_prediction_card(resp: &EnsembleResponse, labels: &ClassLabels) {
    print!("{}", render_prediction_card(resp, labels));
}

/// Print a failed prediction as a vertical card.
pub fn print_error_card(resp: &ErrorResponse, labels: &ClassLabels) {
    print!("{}", render_error_card(resp, labels));
}

pub fn render_prediction_card(resp: &EnsembleResponse, labels: &ClassLabels) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", labels.name(resp.prediction));
    let _ = writeln!(out);

    let _ = writeln!(out, "Decision");
    row(&mut out, "prediction", &labels.name(resp.prediction));
    row(&mut out, "confidence", &percent(resp.confidence));
    row(&mut out, "ensemble_method", resp.ensemble_method.as_str());
    row(&mut out, "model_type", &resp.model_type);
    if let Some(secs) = resp.processing_time {
        row(&mut out, "processing_time", &format!("{secs:.3}s"));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Probabilities");
    probability_rows(&mut out, &resp.probs, labels);
    let _ = writeln!(out);

    let individual = &resp.individual_results;
    model_section(&mut out, "Handwriting Model", &individual.image, labels);
    model_section(&mut out, "Clinical Model", &individual.tabular, labels);

    out
}

pub fn render_error_card(resp: &ErrorResponse, labels: &ClassLabels) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== No prediction ({}) ===", resp.error);
    let _ = writeln!(out, "{}", resp.message);
    let _ = writeln!(out);

    if let Some(individual) = &resp.individual_results {
        model_section(&mut out, "Handwriting Model", &individual.image, labels);
        model_section(&mut out, "Clinical Model", &individual.tabular, labels);
    }

    out
}

// ── Section rendering ──

fn model_section(out: &mut String, header: &str, view: &PredictionView, labels: &ClassLabels) {
    let _ = writeln!(out, "{header}");
    match view.prediction {
        None => row(out, "status", "not run"),
        Some(class) => {
            row(out, "prediction", &labels.name(class));
            row(out, "confidence", &percent(view.confidence));
            probability_rows(out, &view.probs, labels);
        }
    }
    let _ = writeln!(out);
}

fn probability_rows(out: &mut String, probs: &[f64], labels: &ClassLabels) {
    for (class, &p) in probs.iter().enumerate() {
        row(out, &format!("p({})", labels.name(class)), &percent(p));
    }
}

// ── Helpers ──

fn row(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "  {key:<26} {value}");
}

fn percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}
