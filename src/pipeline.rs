//! Pre-trained preprocessing + regression pipeline.
//!
//! The artifact is an ONNX export of the fitted scikit-learn pipeline: a column
//! transformer (scaled numerics, passthrough flags, one-hot and ordinal categories)
//! followed by a regressor. The graph declares one named input per raw column, so a
//! [`FeatureRow`] is bound to it by column name and never by position.
//!
//! Everything here is immutable after loading, so a single [`Arc<dyn Pipeline>`]
//! is shared by all requests.
//!
//! [`Arc<dyn Pipeline>`]: std::sync::Arc

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::*;

use crate::errors::StartupError;
use crate::features::{FeatureRow, FEATURE_COLUMNS};

/// Errors raised by a pipeline while binding or scoring rows.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The row's column names differ from the model's input names.
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    /// A cell has a type the model input cannot take.
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The inference runtime failed.
    Inference(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ColumnMismatch {
                missing,
                unexpected,
            } => write!(
                f,
                "feature names do not match training columns (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
            PipelineError::TypeMismatch {
                column,
                expected,
                found,
            } => write!(f, "column '{}' expected {}, found {}", column, expected, found),
            PipelineError::Inference(msg) => write!(f, "inference failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Short description of a loaded pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub version: String,
    pub producer: String,
    pub regressor: String,
}

/// Contract of the pre-trained pipeline: named rows in, one value per row out.
pub trait Pipeline: Send + Sync {
    /// Column names seen at training time, in training order.
    fn feature_names_in(&self) -> &[String];

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PipelineError>;

    fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            version: "unversioned".to_string(),
            producer: "unknown".to_string(),
            regressor: "custom".to_string(),
        }
    }
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX pipeline compiled into a runnable tract plan.
pub struct OnnxPipeline {
    plan: Plan,
    feature_names_in: Vec<String>,
    /// Element type of each input, aligned with `feature_names_in`.
    input_types: Vec<DatumType>,
    summary: PipelineSummary,
}

impl fmt::Debug for OnnxPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxPipeline")
            .field("feature_names_in", &self.feature_names_in)
            .field("summary", &self.summary)
            .finish()
    }
}

fn metadata(proto: &ModelProto, key: &str) -> Option<String> {
    proto
        .metadata_props
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value.clone())
}

impl OnnxPipeline {
    /// Parses and optimizes an ONNX model held in memory.
    pub fn from_bytes(bytes: &[u8]) -> TractResult<Self> {
        let onnx = tract_onnx::onnx();
        let proto = onnx.proto_model_for_read(&mut &bytes[..])?;
        let model = onnx.model_for_proto_model(&proto)?.into_optimized()?;

        let mut feature_names_in = Vec::new();
        let mut input_types = Vec::new();
        for (ix, outlet) in model.input_outlets()?.iter().enumerate() {
            feature_names_in.push(model.node(outlet.node).name.clone());
            input_types.push(model.input_fact(ix)?.datum_type);
        }

        let summary = PipelineSummary {
            version: metadata(&proto, "version")
                .unwrap_or_else(|| format!("model-v{}", proto.model_version)),
            producer: proto.producer_name.clone(),
            regressor: metadata(&proto, "regressor").unwrap_or_else(|| "unknown".to_string()),
        };

        Ok(Self {
            plan: model.into_runnable()?,
            feature_names_in,
            input_types,
            summary,
        })
    }

    fn check_row_columns(&self, row: &FeatureRow) -> Result<(), PipelineError> {
        let missing: Vec<String> = self
            .feature_names_in
            .iter()
            .filter(|name| row.get(name).is_none())
            .cloned()
            .collect();
        let unexpected: Vec<String> = row
            .column_names()
            .filter(|name| !self.feature_names_in.iter().any(|n| n == name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::ColumnMismatch {
                missing,
                unexpected,
            })
        }
    }

    /// Builds the `[1, 1]` tensor the model expects for `column`.
    fn input_tensor(
        &self,
        row: &FeatureRow,
        column: &str,
        datum_type: DatumType,
    ) -> Result<TValue, PipelineError> {
        let cell = row
            .get(column)
            .ok_or_else(|| PipelineError::ColumnMismatch {
                missing: vec![column.to_string()],
                unexpected: vec![],
            })?;

        let tensor = if datum_type == DatumType::String {
            let text = cell.as_text().ok_or_else(|| PipelineError::TypeMismatch {
                column: column.to_string(),
                expected: "a category string",
                found: cell.type_name(),
            })?;
            tract_ndarray::arr2(&[[text.to_string()]]).into_tensor()
        } else {
            let value = cell.as_f64().ok_or_else(|| PipelineError::TypeMismatch {
                column: column.to_string(),
                expected: "a numeric value",
                found: cell.type_name(),
            })?;
            tensor2(&[[value as f32]])
                .cast_to_dt(datum_type)
                .map_err(|e| PipelineError::Inference(e.to_string()))?
                .into_owned()
        };
        Ok(tensor.into())
    }

    fn predict_row(&self, row: &FeatureRow) -> Result<f64, PipelineError> {
        self.check_row_columns(row)?;

        let inputs = self
            .feature_names_in
            .iter()
            .zip(&self.input_types)
            .map(|(name, dt)| self.input_tensor(row, name, *dt))
            .collect::<Result<TVec<TValue>, _>>()?;

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| PipelineError::Inference("model produced no output".to_string()))?
            .cast_to::<f32>()
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        view.iter()
            .next()
            .map(|v| f64::from(*v))
            .ok_or_else(|| PipelineError::Inference("model output is empty".to_string()))
    }
}

impl Pipeline for OnnxPipeline {
    fn feature_names_in(&self) -> &[String] {
        &self.feature_names_in
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PipelineError> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn summary(&self) -> PipelineSummary {
        self.summary.clone()
    }
}

/// A pipeline loaded from disk together with the checksum of its bytes.
#[derive(Debug)]
pub struct LoadedArtifact {
    pub pipeline: OnnxPipeline,
    pub sha256: String,
}

/// Fails unless the pipeline was trained on exactly the request columns, in order.
pub fn ensure_input_schema(pipeline: &dyn Pipeline) -> Result<(), StartupError> {
    let names = pipeline.feature_names_in();
    if names.iter().map(String::as_str).eq(FEATURE_COLUMNS.iter().copied()) {
        Ok(())
    } else {
        Err(StartupError::Incompatible(format!(
            "pipeline expects columns [{}], requests provide [{}]",
            names.join(", "),
            FEATURE_COLUMNS.join(", ")
        )))
    }
}

/// Reads, compiles and checks the pipeline artifact at `path`.
///
/// Any failure here is fatal for the server: it must not start serving without a
/// usable pipeline.
pub fn load_artifact(path: impl AsRef<Path>) -> Result<LoadedArtifact, StartupError> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let bytes = std::fs::read(path).map_err(|source| StartupError::ArtifactMissing {
        path: shown.clone(),
        source,
    })?;

    let pipeline = OnnxPipeline::from_bytes(&bytes).map_err(|e| StartupError::ArtifactCorrupt {
        path: shown.clone(),
        reason: format!("{:#}", e),
    })?;

    ensure_input_schema(&pipeline)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());

    tracing::debug!(
        "Pipeline artifact {} compiled: {} input(s), regressor {}",
        shown,
        pipeline.feature_names_in.len(),
        pipeline.summary.regressor
    );

    Ok(LoadedArtifact { pipeline, sha256 })
}
