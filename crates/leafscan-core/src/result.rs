//! Plant classification result returned by every inference path.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a detected condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Error)]
#[error("unknown severity: {0:?}")]
pub struct ParseSeverityError(String);

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Severity implied by the disease-axis confidence (0-100) of the local model.
    pub fn from_disease_confidence(confidence: f64) -> Self {
        if confidence >= 70.0 {
            Self::High
        } else if confidence >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Which inference path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Local model evaluated against both species and disease labels.
    Dual,
    /// Remote generative analysis.
    Ai,
}

/// Diagnosis for one uploaded image.
///
/// Serialized in camelCase, which is the shape web and mobile clients consume.
/// Construct through [`ClassificationResult::normalized`] to enforce the
/// range invariants: `confidence` and `health_score` within 0-100, and no
/// disease name unless a disease was detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub plant_name: String,
    pub disease_detected: bool,
    pub disease_name: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_confidence: Option<f64>,
    pub severity: Severity,
    pub symptoms: Vec<String>,
    pub recommendations: Vec<String>,
    pub health_score: u8,
    pub model_type: ModelType,
    /// Free-text commentary: the remote analysis, or a note about the path taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assist: Option<String>,
}

impl ClassificationResult {
    /// Clamp numeric fields into range and drop a stray disease name.
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_percent(self.confidence);
        self.health_score = self.health_score.min(100);
        self.species_confidence = self.species_confidence.map(clamp_percent);
        self.disease_confidence = self.disease_confidence.map(clamp_percent);
        if !self.disease_detected {
            self.disease_name = None;
        }
        self
    }

    /// Attach a note to `ai_assist`, replacing any existing text.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.ai_assist = Some(note.into());
        self
    }
}

/// Health score for a prediction made at `confidence` percent.
///
/// A detected disease inverts the score; a healthy verdict keeps it.
pub fn health_score(confidence: f64, disease_detected: bool) -> u8 {
    let whole = clamp_percent(confidence).trunc() as u8;
    if disease_detected { 100 - whole } else { whole }
}

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}
