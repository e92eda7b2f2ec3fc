//! Best-effort decoder for the `KEY: value` diagnosis template.
//!
//! The remote model is asked to answer in a fixed line format, but nothing
//! guarantees it will. Unknown or malformed lines are skipped and every
//! missing field is filled with a default. Only a response in which not a
//! single template key appears is rejected.

use leafscan_core::{ClassificationResult, ModelType, Severity, health_score};
use tracing::{info, warn};

const DEFAULT_PLANT: &str = "Unknown Plant";
const DEFAULT_CONFIDENCE: f64 = 50.0;
const UNNAMED_DISEASE: &str = "Disease Detected";
const EMPTY_SYMPTOMS: &str = "Visible symptoms present";
const EMPTY_RECOMMENDATIONS: &str = "Consult plant expert";
const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "Monitor plant condition",
    "Consult expert if symptoms worsen",
];

#[derive(Default)]
struct Fields {
    plant: Option<String>,
    disease: Option<Option<String>>,
    confidence: Option<f64>,
    severity: Option<Severity>,
    symptoms: Option<Vec<String>>,
    recommendations: Option<Vec<String>>,
    analysis: Option<String>,
    recognised: usize,
}

/// Parse a remote diagnosis. Returns `None` when no template key is present.
pub fn parse_analysis(text: &str) -> Option<ClassificationResult> {
    let mut f = Fields::default();

    for line in text.trim().lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.replace("**", "").trim().to_uppercase();
        let value = value.replace("**", "").trim().to_string();

        match key.as_str() {
            "PLANT" => f.plant = Some(value),
            "DISEASE" => f.disease = Some(parse_disease(&value)),
            "CONFIDENCE" => f.confidence = Some(parse_confidence(&value)),
            "SEVERITY" => f.severity = Some(value.parse().unwrap_or(Severity::Medium)),
            "SYMPTOMS" => f.symptoms = Some(split_list(&value, EMPTY_SYMPTOMS)),
            "RECOMMENDATIONS" => {
                f.recommendations = Some(split_list(&value, EMPTY_RECOMMENDATIONS))
            }
            "ANALYSIS" => f.analysis = Some(value),
            _ => continue,
        }
        f.recognised += 1;
    }

    if f.recognised == 0 {
        warn!(chars = text.len(), "remote response has no recognisable fields");
        return None;
    }

    let disease_name = f.disease.flatten();
    let disease_detected = disease_name.is_some();
    let confidence = f.confidence.unwrap_or(DEFAULT_CONFIDENCE);

    let result = ClassificationResult {
        plant_name: f.plant.unwrap_or_else(|| DEFAULT_PLANT.to_string()),
        disease_detected,
        disease_name,
        confidence,
        species_confidence: None,
        disease_confidence: None,
        severity: f.severity.unwrap_or(Severity::Medium),
        symptoms: f.symptoms.unwrap_or_default(),
        recommendations: f.recommendations.unwrap_or_else(|| {
            DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
        }),
        health_score: health_score(confidence, disease_detected),
        model_type: ModelType::Ai,
        ai_assist: Some(f.analysis.unwrap_or_else(|| text.to_string())),
    }
    .normalized();

    info!(
        plant = %result.plant_name,
        disease_detected = result.disease_detected,
        confidence = result.confidence,
        "parsed remote analysis"
    );
    Some(result)
}

/// `Some(name)` when the value starts with an affirmative, else `None`.
///
/// The name is whatever follows "yes" once separators are stripped.
fn parse_disease(value: &str) -> Option<String> {
    let affirmative = value.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("yes"));
    if !affirmative {
        return None;
    }
    let name = value[3..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ',' | ':'))
        .trim();
    if name.is_empty() || name.eq_ignore_ascii_case("yes") {
        Some(UNNAMED_DISEASE.to_string())
    } else {
        Some(name.to_string())
    }
}

/// Concatenate every ASCII digit; no digits means the default.
fn parse_confidence(value: &str) -> f64 {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(DEFAULT_CONFIDENCE)
}

fn split_list(value: &str, when_empty: &str) -> Vec<String> {
    let items: Vec<String> = value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        vec![when_empty.to_string()]
    } else {
        items
    }
}
