use serde::{Deserialize, Serialize};

/// Body of `POST models/{model}:predict`.
#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub output_mime_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    /// Absent when every candidate was filtered out.
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub rai_filtered_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One entry of a provider response, normalized across providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes_base64: Option<String>,
    pub mime_type: Option<String>,
    /// Why the provider withheld this image, when a safety filter did.
    pub filtered_reason: Option<String>,
}

impl GeneratedImage {
    pub fn png(bytes_base64: impl Into<String>) -> Self {
        Self {
            bytes_base64: Some(bytes_base64.into()),
            mime_type: Some("image/png".to_string()),
            filtered_reason: None,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

impl From<Prediction> for GeneratedImage {
    fn from(prediction: Prediction) -> Self {
        Self {
            bytes_base64: prediction.bytes_base64_encoded.filter(|b| !b.is_empty()),
            mime_type: prediction.mime_type,
            filtered_reason: prediction.rai_filtered_reason.filter(|r| !r.is_empty()),
        }
    }
}
