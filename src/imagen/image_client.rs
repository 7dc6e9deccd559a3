use crate::{
    config::{GeneratorConfig, DEFAULT_API_BASE},
    error::{BatchError, Result, SpriteGenError},
    imagen::{ImageCall, ImageProvider},
    models::{
        imagen::{ApiErrorEnvelope, PredictInstance, PredictParameters, PredictRequest, PredictResponse},
        GeneratedImage,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const OUTPUT_MIME_TYPE: &str = "image/png";

/// Imagen over the Generative Language REST API.
#[derive(Clone)]
pub struct ImagenClient {
    client: Client,
    api_base: String,
}

impl ImagenClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| SpriteGenError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!("{}/models/{}:predict", self.api_base, model)
    }
}

impl Default for ImagenClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProvider for ImagenClient {
    fn name(&self) -> &str {
        "imagen"
    }

    async fn generate_images(
        &self,
        call: ImageCall<'_>,
    ) -> std::result::Result<Vec<GeneratedImage>, BatchError> {
        let payload = PredictRequest {
            instances: vec![PredictInstance {
                prompt: call.prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: call.count,
                output_mime_type: OUTPUT_MIME_TYPE.to_string(),
            },
        };

        let endpoint = self.endpoint(call.model);
        log::info!("Generating {} image(s) with model: {}", call.count, call.model);
        log::debug!("Imagen prompt: {}", call.prompt);

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", call.credential)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("Imagen request failed: {:?}", e);
                BatchError::provider(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BatchError::provider(e.to_string()))?;

        if !status.is_success() {
            log::error!("Imagen returned {}: {}", status, body);
            return Err(BatchError::provider(api_error_message(status, &body)));
        }

        let parsed: PredictResponse = serde_json::from_str(&body)
            .map_err(|e| BatchError::provider(format!("Malformed Imagen response: {}", e)))?;

        log::debug!("Imagen returned {} prediction(s)", parsed.predictions.len());

        Ok(parsed.predictions.into_iter().map(GeneratedImage::from).collect())
    }
}

/// Render a non-success response as one line that keeps the HTTP code and
/// the provider's status word (e.g. `RESOURCE_EXHAUSTED`) searchable.
fn api_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
        let code = envelope.error.code.unwrap_or_else(|| status.as_u16());
        let message = envelope.error.message.unwrap_or_default();
        return match envelope.error.status.filter(|s| !s.is_empty()) {
            Some(state) => format!("[{} {}] {}", code, state, message),
            None => format!("[{}] {}", code, message),
        };
    }

    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}
