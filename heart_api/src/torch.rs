//! TorchScript backend for tree ensembles compiled to tensor programs.

use parking_lot::Mutex;
use std::path::Path;
use tch::{kind::Kind, CModule, Device, Tensor};

use crate::error::ModelError;
use crate::model::{check_proba, Classifier};

pub struct TorchScriptClassifier {
    module: Mutex<CModule>,
    device: Device,
    in_dim: usize,
}

fn backend_err(e: tch::TchError) -> ModelError {
    ModelError::Backend(e.to_string())
}

impl TorchScriptClassifier {
    pub fn load(model_path: &Path, in_dim: usize) -> Result<Self, ModelError> {
        let device = Device::Cpu;
        let module = CModule::load_on_device(model_path, device).map_err(backend_err)?;

        // Probe output shape with a dummy forward; expect [B=1, 2]
        let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
        let out = module.forward_ts(&[dummy]).map_err(backend_err)?;
        if out.size() != [1, 2] {
            return Err(ModelError::Backend(format!(
                "unexpected model output size: {:?}",
                out.size()
            )));
        }
        // Must already be probabilities, not logits
        check_proba([out.double_value(&[0, 0]), out.double_value(&[0, 1])])?;

        Ok(Self {
            module: Mutex::new(module),
            device,
            in_dim,
        })
    }
}

impl Classifier for TorchScriptClassifier {
    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], ModelError> {
        if x.len() != self.in_dim {
            return Err(ModelError::Width {
                got: x.len(),
                expected: self.in_dim,
            });
        }
        let xs: Vec<f32> = x.iter().map(|v| *v as f32).collect();
        let input = Tensor::from_slice(&xs)
            .reshape([1, self.in_dim as i64])
            .to_device(self.device);

        let out = self.module.lock().forward_ts(&[input]).map_err(backend_err)?;
        check_proba([out.double_value(&[0, 0]), out.double_value(&[0, 1])])
    }

    fn n_features(&self) -> usize {
        self.in_dim
    }

    fn backend(&self) -> &'static str {
        "torchscript"
    }
}
