//! Cloud OCR adapter for a Google-Cloud-Vision-compatible `images:annotate` endpoint.

use std::time::{Duration, Instant};

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{VisionError, VisionErrorCode};
use crate::models::config::VisionConfig;

use super::{CloudOcr, OcrResult};

/// Remote document-text-detection client.
///
/// Holds only immutable configuration; whether it is usable is decided by the API key it was
/// constructed with, never by the process environment.
pub struct VisionClient {
    config: VisionConfig,
    http: reqwest::blocking::Client,
}

impl VisionClient {
    /// Create a client. Succeeds without an API key; such a client reports itself unconfigured.
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::new(VisionErrorCode::NetworkError, e.to_string()))?;

        Ok(Self { config, http })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn build_request(&self, image: &[u8]) -> AnnotateRequest {
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: RequestImage {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: vec![Feature {
                    feature_type: "DOCUMENT_TEXT_DETECTION".to_string(),
                }],
                image_context: ImageContext {
                    language_hints: self.config.language_hints.clone(),
                },
            }],
        }
    }
}

impl CloudOcr for VisionClient {
    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn detect_text(&self, image: &[u8], mime_type: &str) -> Result<OcrResult, VisionError> {
        let api_key = self.api_key().ok_or_else(|| {
            VisionError::new(VisionErrorCode::NotConfigured, "no cloud OCR API key configured")
        })?;

        let start = Instant::now();
        debug!("Cloud OCR request: {} bytes ({})", image.len(), mime_type);

        let response = self
            .http
            .post(&self.config.endpoint)
            .query(&[("key", api_key)])
            .json(&self.build_request(image))
            .send()
            .map_err(|e| VisionError::new(VisionErrorCode::NetworkError, e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| VisionError::new(VisionErrorCode::NetworkError, e.to_string()))?;

        let mut result = interpret_response(status, &body)?;
        result.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Cloud OCR complete: {} chars, confidence {:.1} in {}ms",
            result.text.len(),
            result.confidence,
            result.processing_time_ms
        );

        Ok(result)
    }
}

/// Map an HTTP status and body from the annotate endpoint to a result or a typed error.
pub fn interpret_response(status: u16, body: &str) -> Result<OcrResult, VisionError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| format!("HTTP {}", status));

        warn!("Cloud OCR returned HTTP {}: {}", status, message);

        return Err(match status {
            429 => VisionError::new(VisionErrorCode::RateLimited, message),
            401 | 403 => VisionError::new(VisionErrorCode::Forbidden, message),
            500..=599 => VisionError::new(VisionErrorCode::ApiError, message).retryable(true),
            _ => VisionError::new(VisionErrorCode::ApiError, message),
        });
    }

    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| VisionError::new(VisionErrorCode::InvalidResponse, e.to_string()))?;

    let first = parsed.responses.into_iter().next().ok_or_else(|| {
        VisionError::new(VisionErrorCode::InvalidResponse, "empty responses array")
    })?;

    if let Some(status) = first.error {
        // google.rpc.Code: 7 PERMISSION_DENIED, 8 RESOURCE_EXHAUSTED, 16 UNAUTHENTICATED
        return Err(match status.code {
            8 => VisionError::new(VisionErrorCode::RateLimited, status.message),
            7 | 16 => VisionError::new(VisionErrorCode::Forbidden, status.message),
            _ => VisionError::new(VisionErrorCode::ApiError, status.message),
        });
    }

    let annotation = first
        .full_text_annotation
        .filter(|a| !a.text.trim().is_empty())
        .ok_or_else(|| VisionError::new(VisionErrorCode::NoTextFound, "no text detected in image"))?;

    let confidences: Vec<f32> = annotation.pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32 * 100.0
    };

    Ok(OcrResult::from_text(annotation.text.trim(), confidence))
}

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: RequestImage,
    features: Vec<Feature>,
    image_context: ImageContext,
}

#[derive(Serialize)]
struct RequestImage {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<AnnotatedPage>,
}

#[derive(Deserialize)]
struct AnnotatedPage {
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RpcStatus,
}
