use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};

use crate::config::{Backend, ServiceConfig};
use crate::error::ModelError;
use crate::features::{FeatureLayout, RAW_FEATURES};
use crate::types::{ModelInfo, PatientRecord, PredictionResult};

// ---------- Estimator seam ----------

/// A fitted binary classifier over an encoded feature vector.
pub trait Classifier: Send + Sync {
    /// `[p(no disease), p(disease)]`.
    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], ModelError>;

    /// Class label; argmax of the probabilities, ties go to class 0.
    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        let [p0, p1] = self.predict_proba(x)?;
        Ok(u8::from(p1 > p0))
    }

    fn n_features(&self) -> usize;

    fn backend(&self) -> &'static str;
}

fn check_width(x: &[f64], expected: usize) -> Result<(), ModelError> {
    if x.len() != expected {
        return Err(ModelError::Width {
            got: x.len(),
            expected,
        });
    }
    Ok(())
}

/// Rejects estimator output that is not a probability pair.
pub fn check_proba(raw: [f64; 2]) -> Result<[f64; 2], ModelError> {
    let [p0, p1] = raw;
    if !p0.is_finite() || !p1.is_finite() {
        return Err(ModelError::Backend(format!("non-finite class probabilities {raw:?}")));
    }
    if !(0.0..=1.0).contains(&p0) || !(0.0..=1.0).contains(&p1) {
        return Err(ModelError::Backend(format!("class probabilities {raw:?} outside [0, 1]")));
    }
    if (p0 + p1 - 1.0).abs() > 1e-4 {
        return Err(ModelError::Backend(format!("class probabilities {raw:?} do not sum to 1")));
    }
    Ok(raw)
}

// ---------- Tree ensemble ----------

/// One fitted tree in flat-array form: node `i` is a leaf when
/// `children_left[i] == -1`, otherwise samples with
/// `x[feature[i]] <= threshold[i]` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions).
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let n = self.children_left.len();
        if n == 0 {
            return Err(ModelError::Estimator("tree has no nodes".into()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(ModelError::Estimator("tree arrays differ in length".into()));
        }
        for i in 0..n {
            let (l, r) = (self.children_left[i], self.children_right[i]);
            if l == -1 {
                let [a, b] = self.value[i];
                if !(a >= 0.0 && b >= 0.0 && a + b > 0.0) {
                    return Err(ModelError::Estimator(format!("leaf {i} has no weight")));
                }
                continue;
            }
            // children always come after their parent in fitted trees
            let in_range = |c: i64| c > i as i64 && (c as usize) < n;
            if !in_range(l) || !in_range(r) {
                return Err(ModelError::Estimator(format!("node {i} has invalid children")));
            }
            let f = self.feature[i];
            if f < 0 || f as usize >= n_features {
                return Err(ModelError::Estimator(format!(
                    "node {i} splits on feature {f}, model has {n_features}"
                )));
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `x`.
    /// Callers check `x` against the forest width first.
    pub(crate) fn leaf_proba(&self, x: &[f64]) -> [f64; 2] {
        let mut node = 0usize;
        while self.children_left[node] != -1 {
            let f = self.feature[node] as usize;
            node = if x[f] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [a, b] = self.value[node];
        let total = a + b;
        [a / total, b / total]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Estimator("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ModelError::Estimator(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    /// Soft voting: the mean of every tree's leaf distribution.
    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], ModelError> {
        check_width(x, self.n_features)?;
        let mut acc = [0.0; 2];
        for tree in &self.trees {
            let [a, b] = tree.leaf_proba(x);
            acc[0] += a;
            acc[1] += b;
        }
        let n = self.trees.len() as f64;
        Ok([acc[0] / n, acc[1] / n])
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn backend(&self) -> &'static str {
        "random_forest"
    }
}

/// On-disk model: the fitted encoder layout plus the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub format_version: u32,
    pub name: String,
    pub layout: FeatureLayout,
    pub forest: RandomForest,
}

pub const FORMAT_VERSION: u32 = 1;

impl ForestArtifact {
    pub fn from_json(path: &str, text: &str) -> Result<Self, ModelError> {
        let artifact: ForestArtifact =
            serde_json::from_str(text).map_err(|source| ModelError::Parse {
                path: path.to_string(),
                source,
            })?;
        if artifact.format_version != FORMAT_VERSION {
            return Err(ModelError::Estimator(format!(
                "unsupported format_version {}",
                artifact.format_version
            )));
        }
        artifact.forest.validate()?;
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: shown.clone(),
            source,
        })?;
        Self::from_json(&shown, &text)
    }
}

/// Reads a standalone layout (the meta file next to a TorchScript export).
pub fn read_layout(path: &Path) -> Result<FeatureLayout, ModelError> {
    let shown = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: shown.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Parse { path: shown, source })
}

// ---------- Shared handle ----------

/// The loaded model, built once at startup and shared read-only by every
/// request. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct ModelHandle {
    name: Arc<str>,
    layout: Arc<FeatureLayout>,
    classifier: Arc<dyn Classifier>,
}

impl ModelHandle {
    pub fn new(
        name: impl Into<Arc<str>>,
        layout: FeatureLayout,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, ModelError> {
        layout.validate()?;
        if layout.width() != classifier.n_features() {
            return Err(ModelError::Width {
                got: layout.width(),
                expected: classifier.n_features(),
            });
        }
        Ok(Self {
            name: name.into(),
            layout: Arc::new(layout),
            classifier,
        })
    }

    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ModelError> {
        Self::new(artifact.name, artifact.layout, Arc::new(artifact.forest))
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Derived flag, encoding, then both estimator routines.
    pub fn infer(&self, record: &PatientRecord) -> Result<PredictionResult, ModelError> {
        let x = self.layout.encode(record)?;
        let prediction = self.classifier.predict(&x)?;
        let [_, risk_probability] = check_proba(self.classifier.predict_proba(&x)?)?;
        Ok(PredictionResult {
            prediction,
            risk_probability,
        })
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.to_string(),
            backend: self.classifier.backend().to_string(),
            n_features: self.classifier.n_features(),
            feature_names: self.layout.feature_names(),
            raw_features: RAW_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Loads whichever backend the config selects.
pub fn load_model(config: &ServiceConfig) -> Result<ModelHandle, ModelError> {
    match config.backend {
        Backend::Forest => ModelHandle::from_artifact(ForestArtifact::load(&config.model_path)?),
        #[cfg(feature = "torch")]
        Backend::TorchScript => {
            let meta = config.meta_path.as_deref().ok_or_else(|| {
                ModelError::Backend("torchscript backend needs META_PATH".into())
            })?;
            let layout = read_layout(meta)?;
            let module = crate::torch::TorchScriptClassifier::load(&config.model_path, layout.width())?;
            let name = config
                .model_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "torchscript".to_string());
            ModelHandle::new(name, layout, Arc::new(module))
        }
        #[cfg(not(feature = "torch"))]
        Backend::TorchScript => Err(ModelError::Backend(
            "built without the `torch` feature".into(),
        )),
    }
}
