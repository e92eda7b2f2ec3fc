//! ONNX Runtime backend for [`ScoreModel`].
//!
//! Expects an image classifier exported with a single `[1, H, W, 3]` float
//! input and a single `[1, classes]` float output (e.g. a Keras
//! EfficientNet converted with tf2onnx).

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::classifier::ScoreModel;
use crate::preprocess::ImageTensor;

/// Image classifier loaded into an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent requests serialize on
/// the session lock for the duration of one forward pass.
pub struct OnnxModel {
    session: Mutex<Session>,
    classes: Option<usize>,
}

impl OnnxModel {
    /// Load a classifier from an `.onnx` file.
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(model_path.exists(), "model not found at {model_path:?}");

        let session = Session::builder()?.commit_from_file(model_path)?;

        // Class count from the last output dimension, when the graph declares it.
        let classes = infer_classes(session.outputs()[0].dtype());

        info!(classes = ?classes, model = %model_path.display(), "loaded classifier model");
        Ok(Self {
            session: Mutex::new(session),
            classes,
        })
    }
}

impl ScoreModel for OnnxModel {
    fn scores(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        let shape = input.shape.map(|d| d as i64);
        let tensor = Tensor::from_array((shape, input.data.clone().into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("onnx session lock poisoned"))?;
        let outputs = session.run(ort::inputs![tensor])?;

        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1,
            "unexpected output shape: {dims:?}, expected [1, classes]"
        );

        Ok(output_data.to_vec())
    }

    fn output_len(&self) -> Option<usize> {
        self.classes
    }
}

fn infer_classes(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("final_plant_code")
            .join("model.onnx")
    }

    #[test]
    fn missing_model_is_an_error() {
        assert!(OnnxModel::load(Path::new("/nonexistent/model.onnx")).is_err());
    }

    #[test]
    fn scores_one_image() {
        let path = model_path();
        if !path.exists() {
            eprintln!("skipping: export the classifier to {}", path.display());
            return;
        }
        let model = OnnxModel::load(&path).unwrap();
        let input = ImageTensor {
            shape: [1, 224, 224, 3],
            data: vec![127.0; 224 * 224 * 3],
        };
        let scores = model.scores(&input).unwrap();
        assert!(!scores.is_empty());
        if let Some(n) = model.output_len() {
            assert_eq!(scores.len(), n);
        }
    }
}
