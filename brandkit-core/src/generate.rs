//! Prompt-driven product image generation.
//!
//! Secondary mode, outside the batch pipeline: a thin client over a hosted
//! image-generation model. One prompt and one aspect ratio in, one image
//! out; the first inline image part of the response is used and the rest
//! ignored. The client requires a credential at construction so a missing
//! key is detected at startup, not per call.

use base64::Engine;
use reqwest::Client;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::error::{BrandError, Result};
use crate::gemini::{
    endpoint, Content, GenerateContentRequest, GenerationConfig, GenerateContentResponse,
    ImageConfig, Part, DEFAULT_API_URL,
};

/// Default image-output model.
const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Default timeout; generation is slower than vision analysis.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The fixed set of supported output aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait3x4,
    Landscape4x3,
    Portrait9x16,
    Landscape16x9,
}

impl AspectRatio {
    /// Wire representation expected by the service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
        }
    }

    /// All supported ratios, for help text.
    pub fn all() -> [AspectRatio; 5] {
        [
            Self::Square,
            Self::Portrait3x4,
            Self::Landscape4x3,
            Self::Portrait9x16,
            Self::Landscape16x9,
        ]
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = BrandError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1:1" => Ok(Self::Square),
            "3:4" => Ok(Self::Portrait3x4),
            "4:3" => Ok(Self::Landscape4x3),
            "9:16" => Ok(Self::Portrait9x16),
            "16:9" => Ok(Self::Landscape16x9),
            other => Err(BrandError::Config(format!(
                "Unsupported aspect ratio {other:?}; expected one of 1:1, 3:4, 4:3, 9:16, 16:9"
            ))),
        }
    }
}

/// One generated image payload.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Configuration for the image generator, passed explicitly at
/// construction.
#[derive(Debug, Clone)]
pub struct ImageGeneratorConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ImageGeneratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the hosted image-generation model.
pub struct ImageGenerator {
    client: Client,
    config: ImageGeneratorConfig,
}

impl ImageGenerator {
    /// Create a new generator client. Fails with a configuration error when
    /// no credential is supplied, so callers can disable the feature up
    /// front.
    #[instrument(level = "debug", skip_all, fields(model = %config.model))]
    pub fn new(config: ImageGeneratorConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(BrandError::Config(
                "Image generation requires an API key".into(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                BrandError::Generation(format!("Failed to create HTTP client: {e}"))
            })?;

        debug!("Image generator client created");
        Ok(Self { client, config })
    }

    /// Generate one image from a free-text prompt.
    #[instrument(level = "info", skip(self, prompt), fields(aspect = %aspect, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str, aspect: AspectRatio) -> Result<GeneratedImage> {
        if prompt.trim().is_empty() {
            return Err(BrandError::Config("Prompt is empty".into()));
        }

        let start = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".into(), "IMAGE".into()]),
                image_config: Some(ImageConfig {
                    aspect_ratio: aspect.as_str().into(),
                }),
                ..Default::default()
            }),
        };

        let response = self
            .client
            .post(endpoint(&self.config.api_url, &self.config.model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Generation request rejected");
            return Err(BrandError::Generation(format!(
                "Generation API returned status: {status}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            BrandError::Generation(format!("Failed to parse generation response: {e}"))
        })?;

        let inline = body.first_inline_data().ok_or_else(|| {
            BrandError::Generation("Response contained no image part".into())
        })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&inline.data)
            .map_err(|e| {
                BrandError::Generation(format!("Image payload is not valid base64: {e}"))
            })?;

        debug!(
            bytes = bytes.len(),
            mime = %inline.mime_type,
            latency_ms = start.elapsed().as_millis() as u64,
            "Image generated"
        );

        Ok(GeneratedImage {
            bytes,
            mime_type: inline.mime_type.clone(),
        })
    }
}
