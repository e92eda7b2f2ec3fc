//! Local inference layer: label sets, image preprocessing, and a single
//! classifier evaluated against both the species and disease axes.

pub mod analysis;
pub mod classifier;
pub mod labels;
pub mod preprocess;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

pub use analysis::dual_model_analysis;
pub use classifier::{AxisPrediction, ClassifierAdapter, DualPrediction, ScoreModel};
pub use labels::{Axis, LabelSet};
pub use preprocess::{ImageError, ImageTensor, PixelScale, PreparedImage, Preprocessor};
