use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use utoipa::ToSchema;

use crate::pipeline::PipelineError;

/// Why a single request field was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FieldIssue {
    /// Required field absent from the payload.
    Missing,
    /// JSON type differs from the declared one.
    WrongType { expected: &'static str },
    /// Numeric value outside its allowed range.
    OutOfRange { expected: &'static str },
    /// Categorical value outside its closed set.
    NotAllowed { allowed: Vec<&'static str> },
    /// Field name not part of the request schema.
    Unexpected,
    /// The request body is not a JSON object.
    NotAnObject,
}

/// One offending field of a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub issue: FieldIssue,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue {
            FieldIssue::Missing => write!(f, "{}: field required", self.field),
            FieldIssue::WrongType { expected } => {
                write!(f, "{}: expected {}", self.field, expected)
            }
            FieldIssue::OutOfRange { expected } => {
                write!(f, "{}: must be {}", self.field, expected)
            }
            FieldIssue::NotAllowed { allowed } => {
                write!(f, "{}: must be one of [{}]", self.field, allowed.join(", "))
            }
            FieldIssue::Unexpected => write!(f, "{}: unexpected field", self.field),
            FieldIssue::NotAnObject => write!(f, "{}: expected a JSON object", self.field),
        }
    }
}

/// Every violation found in a prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Returns true if the given field is among the offending ones.
    pub fn mentions(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn issue_for(&self, field: &str) -> Option<&FieldIssue> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| &e.issue)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s): ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Failure while turning validated features into a price.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The pipeline rejected the feature row.
    Pipeline(PipelineError),
    /// The pipeline returned no value for the row.
    EmptyOutput,
    /// The pipeline returned NaN or an infinite value.
    NonFinite(f64),
    /// The blocking inference task panicked or was cancelled.
    Runtime(String),
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionError::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            PredictionError::EmptyOutput => write!(f, "Pipeline returned no prediction"),
            PredictionError::NonFinite(v) => {
                write!(f, "Pipeline returned a non-finite prediction: {}", v)
            }
            PredictionError::Runtime(msg) => write!(f, "Inference task failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictionError {}

impl From<PipelineError> for PredictionError {
    fn from(err: PipelineError) -> Self {
        PredictionError::Pipeline(err)
    }
}

/// Fatal error while loading the pipeline artifact at process start.
#[derive(Debug)]
pub enum StartupError {
    /// The artifact file does not exist or cannot be read.
    ArtifactMissing { path: String, source: std::io::Error },
    /// The artifact is not a readable serialized pipeline.
    ArtifactCorrupt { path: String, reason: String },
    /// The artifact parses but does not fit the expected input schema.
    Incompatible(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::ArtifactMissing { path, source } => {
                write!(f, "Pipeline artifact {} cannot be read: {}", path, source)
            }
            StartupError::ArtifactCorrupt { path, reason } => {
                write!(f, "Pipeline artifact {} is corrupt: {}", path, reason)
            }
            StartupError::Incompatible(msg) => {
                write!(f, "Pipeline artifact is incompatible: {}", msg)
            }
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::ArtifactMissing { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Request failed field validation.
    Validation(ValidationError),
    /// Pipeline invocation failed.
    Prediction(PredictionError),
    /// Bad request error (unparseable body).
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "Validation failed: {}", e),
            AppError::Prediction(e) => write!(f, "Prediction failed: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: &'static str,
    pub message: String,
    /// Offending fields, present on validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    ///
    /// Validation failures are client-fixable (422) and carry every offending
    /// field; pipeline failures are reported as 500 with the pipeline message.
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_failed",
                    message: e.to_string(),
                    fields: Some(e.errors),
                },
            ),
            AppError::Prediction(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "prediction_failed",
                    message: e.to_string(),
                    fields: None,
                },
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    message: msg,
                    fields: None,
                },
            ),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        AppError::Prediction(err)
    }
}

/// Failure of the form client while calling the prediction API.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request could not be sent or the connection failed.
    Transport(String),
    /// The API answered with a non-2xx status.
    Rejected { status: u16, body: String },
    /// A 2xx answer whose body is not a prediction.
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "Prediction request failed: {}", msg),
            ClientError::Rejected { status, body } => {
                write!(f, "Prediction API returned {}: {}", status, body)
            }
            ClientError::Decode(msg) => {
                write!(f, "Failed to parse prediction response: {}", msg)
            }
        }
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_serializes_flat() {
        let err = FieldError {
            field: "epc".to_string(),
            issue: FieldIssue::NotAllowed {
                allowed: vec!["good", "bad"],
            },
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({ "field": "epc", "reason": "not_allowed", "allowed": ["good", "bad"] })
        );

        let missing = serde_json::to_value(FieldError {
            field: "province".to_string(),
            issue: FieldIssue::Missing,
        })
        .unwrap();
        assert_eq!(missing, json!({ "field": "province", "reason": "missing" }));
    }

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = ValidationError {
            errors: vec![
                FieldError {
                    field: "nbr_frontages".to_string(),
                    issue: FieldIssue::OutOfRange {
                        expected: "an integer between 1 and 4",
                    },
                },
                FieldError {
                    field: "garage".to_string(),
                    issue: FieldIssue::Unexpected,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 invalid field(s)"));
        assert!(text.contains("nbr_frontages"));
        assert!(text.contains("garage: unexpected field"));
        assert!(err.mentions("garage"));
        assert!(!err.mentions("epc"));
    }

    #[test]
    fn test_status_codes() {
        let validation = AppError::Validation(ValidationError { errors: vec![] }).into_response();
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let prediction = AppError::Prediction(PredictionError::EmptyOutput).into_response();
        assert_eq!(prediction.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad = AppError::BadRequest("not json".to_string()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rejected_client_error_shows_status_and_body() {
        let err = ClientError::Rejected {
            status: 422,
            body: "{\"error\":\"validation_failed\"}".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("422"));
        assert!(text.contains("validation_failed"));
    }
}
