//! Turn a local dual prediction into a full diagnosis.

use leafscan_core::{ClassificationResult, ModelType, Severity, health_score, round2};

use crate::classifier::DualPrediction;

/// Disease labels containing any of these mark the plant as healthy.
const HEALTHY_MARKERS: &[&str] = &["healthy", "normal"];

/// Build the response for a trusted local prediction.
///
/// Severity and health score follow the disease-axis confidence; the reported
/// confidence is the mean of both axes. The health score is `100 - D` whether
/// or not the disease label marks the plant healthy.
pub fn dual_model_analysis(pred: &DualPrediction) -> ClassificationResult {
    let species = &pred.species.label;
    let disease = &pred.disease.label;
    let species_conf = round2(pred.species.confidence);
    let disease_conf = round2(pred.disease.confidence);
    let combined = round2((species_conf + disease_conf) / 2.0);

    let disease_lower = disease.to_lowercase();
    let healthy = HEALTHY_MARKERS.iter().any(|m| disease_lower.contains(m));

    let (symptoms, recommendations) = if healthy {
        (
            Vec::new(),
            vec![
                format!("{species} appears healthy"),
                "Continue regular watering and care".to_string(),
                "Monitor periodically for any changes".to_string(),
                "Maintain good air circulation".to_string(),
            ],
        )
    } else {
        (
            vec![
                "Disease symptoms detected".to_string(),
                "Visual abnormalities present".to_string(),
                format!("Identified as {disease}"),
            ],
            vec![
                format!("Disease detected: {disease}"),
                "Isolate affected plant to prevent spread".to_string(),
                "Remove severely affected leaves".to_string(),
                "Apply appropriate fungicide or treatment".to_string(),
                "Monitor other plants for similar symptoms".to_string(),
                "Consult plant expert if condition worsens".to_string(),
            ],
        )
    };

    ClassificationResult {
        plant_name: species.clone(),
        disease_detected: !healthy,
        disease_name: (!healthy).then(|| disease.clone()),
        confidence: combined,
        species_confidence: Some(species_conf),
        disease_confidence: Some(disease_conf),
        severity: Severity::from_disease_confidence(disease_conf),
        symptoms,
        recommendations,
        health_score: health_score(disease_conf, true),
        model_type: ModelType::Dual,
        ai_assist: None,
    }
    .normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::AxisPrediction;

    fn pred(species: &str, s: f64, disease: &str, d: f64) -> DualPrediction {
        DualPrediction {
            species: AxisPrediction {
                index: 0,
                label: species.into(),
                confidence: s,
            },
            disease: AxisPrediction {
                index: 0,
                label: disease.into(),
                confidence: d,
            },
        }
    }

    #[test]
    fn diseased_plant() {
        let r = dual_model_analysis(&pred("Tomato", 91.234, "Early_blight", 74.567));
        assert_eq!(r.plant_name, "Tomato");
        assert!(r.disease_detected);
        assert_eq!(r.disease_name.as_deref(), Some("Early_blight"));
        assert_eq!(r.species_confidence, Some(91.23));
        assert_eq!(r.disease_confidence, Some(74.57));
        assert_eq!(r.confidence, 82.9);
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.health_score, 26);
        assert_eq!(r.symptoms.len(), 3);
        assert_eq!(r.symptoms[2], "Identified as Early_blight");
        assert_eq!(r.recommendations[0], "Disease detected: Early_blight");
        assert_eq!(r.model_type, ModelType::Dual);
    }

    #[test]
    fn healthy_plant_has_no_disease_name() {
        let r = dual_model_analysis(&pred("Basil", 88.0, "Basil___healthy", 95.0));
        assert!(!r.disease_detected);
        assert!(r.disease_name.is_none());
        assert!(r.symptoms.is_empty());
        assert_eq!(r.recommendations[0], "Basil appears healthy");
        assert_eq!(r.health_score, 5);
    }

    #[test]
    fn health_score_inverts_disease_confidence_on_both_paths() {
        let healthy = dual_model_analysis(&pred("Basil", 80.0, "Basil___healthy", 60.7));
        let sick = dual_model_analysis(&pred("Basil", 80.0, "Rust", 60.7));
        assert_eq!(healthy.health_score, 40);
        assert_eq!(sick.health_score, 40);
        assert_eq!(dual_model_analysis(&pred("A", 10.0, "healthy", 0.0)).health_score, 100);
    }

    #[test]
    fn normal_marker_is_case_insensitive() {
        let r = dual_model_analysis(&pred("Mint", 60.0, "NORMAL_LEAF", 50.0));
        assert!(!r.disease_detected);
    }

    #[test]
    fn severity_tracks_disease_confidence() {
        assert_eq!(
            dual_model_analysis(&pred("A", 99.0, "Rust", 45.0)).severity,
            Severity::Medium
        );
        assert_eq!(
            dual_model_analysis(&pred("A", 99.0, "Rust", 12.0)).severity,
            Severity::Low
        );
    }

    #[test]
    fn detected_disease_always_named() {
        for d in ["Rust", "Unknown_Disease_40", "Leaf spot"] {
            let r = dual_model_analysis(&pred("A", 30.0, d, 20.0));
            assert!(r.disease_detected);
            assert!(r.disease_name.is_some());
        }
    }
}
