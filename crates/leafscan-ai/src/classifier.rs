//! Dual-axis classification with a single model.
//!
//! The same model is run twice on one preprocessed tensor. The first output
//! vector is read as a species distribution, the second as a disease
//! distribution; each axis takes its argmax and converts the winning score
//! into a percentage confidence.

use std::sync::Arc;

use tracing::{info, warn};

use crate::labels::{Axis, LabelSet};
use crate::preprocess::ImageTensor;

/// Sum tolerance for treating an output vector as already normalized.
const PROBABILITY_TOLERANCE: f32 = 1e-3;

/// A model that maps an input tensor to one score per class.
///
/// Implementations must be safe to share between request handlers.
pub trait ScoreModel: Send + Sync {
    fn scores(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>>;

    /// Number of classes the model emits, when known ahead of inference.
    fn output_len(&self) -> Option<usize> {
        None
    }
}

/// Winning class on one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisPrediction {
    pub index: usize,
    pub label: String,
    /// Percentage, 0-100.
    pub confidence: f64,
}

/// Species and disease predictions for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DualPrediction {
    pub species: AxisPrediction,
    pub disease: AxisPrediction,
}

impl DualPrediction {
    /// Mean of the species and disease confidences.
    pub fn combined_confidence(&self) -> f64 {
        (self.species.confidence + self.disease.confidence) / 2.0
    }

    /// `"<species> - <disease>"`, the local guess handed to remote analysis.
    pub fn guess(&self) -> String {
        format!("{} - {}", self.species.label, self.disease.label)
    }
}

/// Shared model plus label lists. Cheap to clone.
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn ScoreModel>,
    labels: Arc<LabelSet>,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn ScoreModel>, labels: Arc<LabelSet>) -> Self {
        if let Some(n) = model.output_len() {
            for axis in [Axis::Species, Axis::Disease] {
                let count = labels.list(axis).len();
                if n < count {
                    warn!(
                        axis = axis.as_str(),
                        outputs = n,
                        labels = count,
                        "model emits fewer classes than the label list"
                    );
                }
            }
        }
        Self { model, labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Run the model once and interpret its output against `axis`.
    pub fn predict_axis(&self, input: &ImageTensor, axis: Axis) -> anyhow::Result<AxisPrediction> {
        let scores = self.model.scores(input)?;
        let (index, probability) = top_probability(&scores)
            .ok_or_else(|| anyhow::anyhow!("{} prediction: model returned no scores", axis.as_str()))?;

        let label = self.labels.label(axis, index);
        let confidence = f64::from(probability) * 100.0;
        info!(axis = axis.as_str(), label = %label, confidence, "local prediction");

        Ok(AxisPrediction {
            index,
            label,
            confidence,
        })
    }

    /// Species pass followed by disease pass on the identical tensor.
    pub fn predict(&self, input: &ImageTensor) -> anyhow::Result<DualPrediction> {
        let species = self.predict_axis(input, Axis::Species)?;
        let disease = self.predict_axis(input, Axis::Disease)?;
        Ok(DualPrediction { species, disease })
    }
}

/// Argmax of `scores` and its probability.
///
/// Scores that already form a distribution are used as is; anything else
/// (logits) goes through softmax first. Returns `None` for an empty vector.
pub fn top_probability(scores: &[f32]) -> Option<(usize, f32)> {
    if scores.is_empty() {
        return None;
    }

    // First index wins ties.
    let mut index = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[index] {
            index = i;
        }
    }

    let probability = if is_distribution(scores) {
        scores[index]
    } else {
        softmax(scores)[index]
    };
    Some((index, probability))
}

fn is_distribution(scores: &[f32]) -> bool {
    let in_range = scores.iter().all(|&s| (0.0..=1.0).contains(&s));
    let sum: f32 = scores.iter().sum();
    in_range && (sum - 1.0).abs() <= PROBABILITY_TOLERANCE
}

/// Numerically stable softmax.
fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; scores.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns queued score vectors in order, one per call.
    struct ScriptedModel {
        outputs: Mutex<Vec<Vec<f32>>>,
    }

    impl ScriptedModel {
        fn new(outputs: Vec<Vec<f32>>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into_iter().rev().collect()),
            }
        }
    }

    impl ScoreModel for ScriptedModel {
        fn scores(&self, _input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
            self.outputs
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no more outputs"))
        }
    }

    fn tensor() -> ImageTensor {
        ImageTensor {
            shape: [1, 1, 1, 3],
            data: vec![0.0; 3],
        }
    }

    fn labels() -> Arc<LabelSet> {
        Arc::new(LabelSet::new(
            vec!["Tomato".into(), "Potato".into(), "Basil".into()],
            vec!["Early_blight".into(), "healthy".into()],
        ))
    }

    #[test]
    fn top_probability_uses_distribution_directly() {
        let (idx, p) = top_probability(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(idx, 1);
        assert!((p - 0.7).abs() < 1e-6);
    }

    #[test]
    fn top_probability_softmaxes_logits() {
        let (idx, p) = top_probability(&[1.0, 3.0, 1.0]).unwrap();
        assert_eq!(idx, 1);
        let expected = 3.0f32.exp() / (2.0 * 1.0f32.exp() + 3.0f32.exp());
        assert!((p - expected).abs() < 1e-5, "got {p}, expected {expected}");
    }

    #[test]
    fn top_probability_empty() {
        assert!(top_probability(&[]).is_none());
    }

    #[test]
    fn softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn predict_runs_model_twice() {
        let model = Arc::new(ScriptedModel::new(vec![
            vec![0.05, 0.9, 0.05, 0.0],
            vec![0.8, 0.2, 0.0, 0.0],
        ]));
        let clf = ClassifierAdapter::new(model, labels());

        let pred = clf.predict(&tensor()).unwrap();
        assert_eq!(pred.species.label, "Potato");
        assert!((pred.species.confidence - 90.0).abs() < 1e-4);
        assert_eq!(pred.disease.label, "Early_blight");
        assert!((pred.disease.confidence - 80.0).abs() < 1e-4);
        assert!((pred.combined_confidence() - 85.0).abs() < 1e-4);
        assert_eq!(pred.guess(), "Potato - Early_blight");
    }

    #[test]
    fn out_of_range_index_gets_unknown_label() {
        // Index 3 is beyond both label lists.
        let model = Arc::new(ScriptedModel::new(vec![
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ]));
        let clf = ClassifierAdapter::new(model, labels());

        let pred = clf.predict(&tensor()).unwrap();
        assert_eq!(pred.species.label, "Unknown_Species_3");
        assert_eq!(pred.disease.label, "Unknown_Disease_3");
    }

    #[test]
    fn empty_output_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![vec![]]));
        let clf = ClassifierAdapter::new(model, labels());
        assert!(clf.predict_axis(&tensor(), Axis::Species).is_err());
    }

    #[test]
    fn model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![vec![1.0]]));
        let clf = ClassifierAdapter::new(model, labels());
        // Species pass consumes the only output; disease pass fails.
        assert!(clf.predict(&tensor()).is_err());
    }
}
