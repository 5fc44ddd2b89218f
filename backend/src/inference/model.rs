use ndarray::{ArrayD, ArrayView4};
#[cfg(any(feature = "torch", test))]
use std::path::Path;
use std::sync::Arc;

use crate::config::ModelPaths;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Model error: {0}")]
    Model(String),
    #[error("Unexpected model output: expected {expected}, got {actual}")]
    OutputShape { expected: String, actual: String },
    #[error("Model produced a non-finite value at index {0}")]
    NonFinite(usize),
    #[error("Model lock poisoned")]
    Poisoned,
}

#[cfg(feature = "torch")]
impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// A loaded network: one NHWC float tensor in, one float tensor out.
pub trait Predictor: Send + Sync {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, InferenceError>;
}

/// The classifier and segmenter, loaded once at startup and shared read-only
/// across requests.
#[derive(Clone)]
pub struct Models {
    pub classifier: Arc<dyn Predictor>,
    pub segmenter: Arc<dyn Predictor>,
}

impl Models {
    pub fn new(classifier: Arc<dyn Predictor>, segmenter: Arc<dyn Predictor>) -> Self {
        Self {
            classifier,
            segmenter,
        }
    }

    #[cfg(feature = "torch")]
    pub fn load(paths: &ModelPaths) -> Result<Self, InferenceError> {
        let classifier = TorchModel::load(&paths.classifier)?;
        log::info!("Classifier loaded from {}", paths.classifier.display());
        let segmenter = TorchModel::load(&paths.segmenter)?;
        log::info!("Segmenter loaded from {}", paths.segmenter.display());
        Ok(Self::new(Arc::new(classifier), Arc::new(segmenter)))
    }

    #[cfg(not(feature = "torch"))]
    pub fn load(paths: &ModelPaths) -> Result<Self, InferenceError> {
        Err(InferenceError::Load {
            path: paths.classifier.display().to_string(),
            reason: "built without the `torch` feature; rebuild with --features torch".into(),
        })
    }
}

#[cfg(any(feature = "torch", test))]
pub(crate) fn ensure_model_file(path: &Path) -> Result<(), InferenceError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(InferenceError::Load {
            path: path.display().to_string(),
            reason: "file not found".into(),
        })
    }
}

#[cfg(feature = "torch")]
pub use torch::TorchModel;

#[cfg(feature = "torch")]
mod torch {
    use super::{InferenceError, Predictor, ensure_model_file};
    use ndarray::{ArrayD, ArrayView4, IxDyn};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tch::{CModule, Device, IValue, Tensor};

    /// TorchScript module. Forward passes on one instance are serialized by
    /// the mutex.
    #[derive(Clone)]
    pub struct TorchModel {
        model: Arc<Mutex<CModule>>,
        device: Device,
    }

    impl TorchModel {
        pub fn load(path: &Path) -> Result<Self, InferenceError> {
            ensure_model_file(path)?;
            let device = Device::cuda_if_available();
            let mut module =
                CModule::load_on_device(path, device).map_err(|e| InferenceError::Load {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            module.set_eval();
            Ok(Self {
                model: Arc::new(Mutex::new(module)),
                device,
            })
        }
    }

    impl Predictor for TorchModel {
        fn predict(&self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, InferenceError> {
            let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
            let data: Vec<f32> = input.iter().copied().collect();
            let tensor = Tensor::from_slice(&data)
                .reshape(shape.as_slice())
                .to_device(self.device);

            let output = {
                let model = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
                tch::no_grad(|| model.forward_is(&[IValue::Tensor(tensor)]))?
            };
            let output = match output {
                IValue::Tensor(t) => t,
                IValue::Tuple(mut items) if !items.is_empty() => match items.remove(0) {
                    IValue::Tensor(t) => t,
                    other => {
                        return Err(InferenceError::Model(format!(
                            "unsupported output value: {other:?}"
                        )));
                    }
                },
                other => {
                    return Err(InferenceError::Model(format!(
                        "unsupported output value: {other:?}"
                    )));
                }
            };

            let output = output.to_device(Device::Cpu).to_kind(tch::Kind::Float);
            let dims: Vec<usize> = output.size().iter().map(|&d| d as usize).collect();
            let values = Vec::<f32>::try_from(output.flatten(0, -1))?;
            ArrayD::from_shape_vec(IxDyn(&dims), values)
                .map_err(|e| InferenceError::Model(e.to_string()))
        }
    }
}
