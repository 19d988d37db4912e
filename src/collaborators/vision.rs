//! Azure vision classifier
//!
//! One frame is sent to two services concurrently:
//! - Image Analysis 4.0 (`features=caption`) for the scene description
//! - Custom Vision prediction for the gesture detections
//!
//! Either half may be absent or fail; the call only fails when every
//! configured half failed.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::{body_excerpt, Classifier, CollaboratorError};
use crate::config::defaults;
use crate::types::{Caption, ClassifierResult, Detection};

const IMAGE_ANALYSIS_API_VERSION: &str = "2024-02-01";

/// Image Analysis endpoint and key.
#[derive(Debug, Clone)]
pub struct CaptionEndpoint {
    pub endpoint: String,
    pub key: String,
}

/// Custom Vision prediction endpoint, key and published model.
#[derive(Debug, Clone)]
pub struct PredictionEndpoint {
    pub endpoint: String,
    pub key: String,
    pub project_id: String,
    pub iteration: String,
}

pub struct AzureVisionClassifier {
    http: reqwest::Client,
    caption: Option<CaptionEndpoint>,
    prediction: Option<PredictionEndpoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    caption_result: Option<CaptionResult>,
}

#[derive(Deserialize)]
struct CaptionResult {
    text: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    tag_name: String,
    probability: f64,
}

impl AzureVisionClassifier {
    pub fn new(
        caption: Option<CaptionEndpoint>,
        prediction: Option<PredictionEndpoint>,
    ) -> Result<Self, CollaboratorError> {
        if caption.is_none() && prediction.is_none() {
            return Err(CollaboratorError::Unavailable("vision"));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::COLLABORATOR_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            caption,
            prediction,
        })
    }

    async fn fetch_caption(&self, ep: &CaptionEndpoint, frame: &[u8]) -> Result<Vec<Caption>, CollaboratorError> {
        let url = format!(
            "{}/computervision/imageanalysis:analyze",
            ep.endpoint.trim_end_matches('/')
        );
        let resp = self
            .http
            .post(&url)
            .query(&[("api-version", IMAGE_ANALYSIS_API_VERSION), ("features", "caption")])
            .header("Ocp-Apim-Subscription-Key", &ep.key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(frame.to_vec())
            .send()
            .await?;
        let resp = check_status("image-analysis", resp).await?;
        let parsed: AnalyzeResponse = resp.json().await?;
        Ok(parsed
            .caption_result
            .map(|c| vec![Caption::new(c.text, c.confidence)])
            .unwrap_or_default())
    }

    async fn fetch_predictions(
        &self,
        ep: &PredictionEndpoint,
        frame: &[u8],
    ) -> Result<Vec<Detection>, CollaboratorError> {
        let url = format!(
            "{}/customvision/v3.0/Prediction/{}/classify/iterations/{}/image",
            ep.endpoint.trim_end_matches('/'),
            ep.project_id,
            ep.iteration
        );
        let resp = self
            .http
            .post(&url)
            .header("Prediction-Key", &ep.key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(frame.to_vec())
            .send()
            .await?;
        let resp = check_status("custom-vision", resp).await?;
        let parsed: PredictionResponse = resp.json().await?;
        Ok(parsed
            .predictions
            .into_iter()
            .map(|p| Detection::new(p.tag_name, p.probability))
            .collect())
    }
}

async fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        service,
        status: status.as_u16(),
        body: body_excerpt(&body),
    })
}

/// Merge the two halves; fail only when nothing configured succeeded.
fn merge(
    captions: Option<Result<Vec<Caption>, CollaboratorError>>,
    detections: Option<Result<Vec<Detection>, CollaboratorError>>,
) -> Result<ClassifierResult, CollaboratorError> {
    let mut result = ClassifierResult::default();
    let mut first_error = None;
    let mut any_ok = false;

    match captions {
        Some(Ok(c)) => {
            result.captions = c;
            any_ok = true;
        }
        Some(Err(e)) => {
            warn!(error = %e, "Caption service failed");
            first_error = Some(e);
        }
        None => {}
    }
    match detections {
        Some(Ok(d)) => {
            result.detections = d;
            any_ok = true;
        }
        Some(Err(e)) => {
            warn!(error = %e, "Gesture prediction service failed");
            first_error.get_or_insert(e);
        }
        None => {}
    }

    match (any_ok, first_error) {
        (false, Some(e)) => Err(e),
        (false, None) => Err(CollaboratorError::Unavailable("vision")),
        (true, _) => Ok(result),
    }
}

#[async_trait]
impl Classifier for AzureVisionClassifier {
    async fn classify(&self, frame: &[u8]) -> Result<ClassifierResult, CollaboratorError> {
        let caption_call = async {
            match &self.caption {
                Some(ep) => Some(self.fetch_caption(ep, frame).await),
                None => None,
            }
        };
        let prediction_call = async {
            match &self.prediction {
                Some(ep) => Some(self.fetch_predictions(ep, frame).await),
                None => None,
            }
        };
        let (captions, detections) = tokio::join!(caption_call, prediction_call);
        merge(captions, detections)
    }

    fn name(&self) -> &'static str {
        "azure-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prediction_payload() {
        let raw = r#"{"id":"x","predictions":[{"tagName":"HELP","probability":0.93,"tagId":"1"}]}"#;
        let parsed: PredictionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.predictions[0].tag_name, "HELP");
    }

    #[test]
    fn test_parse_caption_payload() {
        let raw = r#"{"captionResult":{"text":"a man waving","confidence":0.81},"modelVersion":"2023-10-01"}"#;
        let parsed: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.caption_result.unwrap().text, "a man waving");
    }

    #[test]
    fn test_merge_partial_success() {
        let merged = merge(
            Some(Err(CollaboratorError::Parse("bad".into()))),
            Some(Ok(vec![Detection::new("HELP", 0.9)])),
        )
        .unwrap();
        assert_eq!(merged.detections.len(), 1);
        assert!(merged.captions.is_empty());
    }

    #[test]
    fn test_merge_all_failed() {
        let err = merge(Some(Err(CollaboratorError::Parse("bad".into()))), None).unwrap_err();
        assert!(matches!(err, CollaboratorError::Parse(_)));
    }

    #[test]
    fn test_requires_at_least_one_endpoint() {
        assert!(AzureVisionClassifier::new(None, None).is_err());
    }
}
