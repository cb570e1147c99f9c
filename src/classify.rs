//! Disease classifier client
//!
//! Talks to the LeafWise analysis backend, which classifies a maize leaf
//! image sent as a base64 data URI. The backend signals its own failures
//! in-band with an "Analysis Error" prediction instead of an error status;
//! this client mirrors that contract and folds transport failures into the
//! same sentinel, so callers always get a well-formed [`Prediction`] and
//! decide from the sentinel whether to record the scan.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Disease name the backend uses to signal a failed analysis
pub const ANALYSIS_ERROR_NAME: &str = "Analysis Error";

/// Errors that can occur when classifying an image
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    /// The image file could not be read
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: String,
        source: std::io::Error,
    },
}

/// Result of a disease detection analysis
///
/// Serialized camelCase, the backend's wire layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Predicted disease name, or a special value such as "Healthy",
    /// "Not a Maize Leaf", or the failure sentinel
    pub disease_name: String,
    /// Confidence score in [0, 1]; 0 when nothing was detected
    pub confidence: f64,
    /// Description of the disease, or of the failure for the sentinel
    pub description: String,
    /// Recommended treatments; empty when healthy or failed
    pub solutions: Vec<String>,
    /// Preventive measures; empty when healthy or failed
    pub preventive_measures: Vec<String>,
}

impl Prediction {
    /// Builds the in-band failure sentinel for a failed analysis.
    pub fn analysis_error(detail: impl Display) -> Self {
        Self {
            disease_name: ANALYSIS_ERROR_NAME.to_string(),
            confidence: 0.0,
            description: format!(
                "An error occurred during the AI analysis: {}. Please check the image or try again later.",
                detail
            ),
            solutions: Vec::new(),
            preventive_measures: Vec::new(),
        }
    }

    /// Whether this prediction is the failure sentinel.
    ///
    /// Sentinel predictions are displayed to the user but never recorded in
    /// the scan history.
    pub fn is_analysis_error(&self) -> bool {
        self.disease_name == ANALYSIS_ERROR_NAME
    }
}

/// Request body for the detection endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest<'a> {
    image_data_uri: &'a str,
}

/// Client for the LeafWise analysis backend
#[derive(Debug, Clone)]
pub struct DiseaseClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL of the backend (allows override for testing)
    base_url: String,
}

impl DiseaseClient {
    /// Creates a client pointed at the default local backend.
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:5001")
    }

    /// Creates a client with a custom backend base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Classifies an image, folding every failure into the sentinel.
    ///
    /// This is the call sites' entry point: it never fails, and the caller
    /// checks [`Prediction::is_analysis_error`] before recording the scan.
    pub async fn detect(&self, image_data_uri: &str) -> Prediction {
        match self.try_detect(image_data_uri).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(error = %e, "classification failed, returning sentinel");
                Prediction::analysis_error(e)
            }
        }
    }

    /// Classifies an image, surfacing transport and protocol errors.
    pub async fn try_detect(&self, image_data_uri: &str) -> Result<Prediction, ClassifyError> {
        let url = format!("{}/api/detect-disease", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&DetectRequest { image_data_uri })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifyError::Status(response.status()));
        }

        Ok(response.json::<Prediction>().await?)
    }
}

impl Default for DiseaseClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads an image file and encodes it as the data URI the backend expects
/// (`data:<mimetype>;base64,<encoded_data>`).
///
/// The MIME type is derived from the file extension; unknown extensions
/// fall back to `application/octet-stream`, which the backend treats as an
/// unclassifiable image rather than an error.
pub fn image_to_data_uri(path: &Path) -> Result<String, ClassifyError> {
    let bytes = std::fs::read(path).map_err(|source| ClassifyError::ImageRead {
        path: path.display().to_string(),
        source,
    })?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    };
    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}
