//! Gemini-backed placement advisor.
//!
//! Sends the source image inline to a Gemini vision model and asks it to
//! locate the primary product and pick the corner with the most negative
//! space. The structured JSON reply is validated strictly; anything
//! malformed surfaces as an error and the pipeline boundary degrades to the
//! fixed fallback placement.
//!
//! ## Features
//!
//! - Automatic retry with exponential backoff on transient errors
//! - Configurable endpoint, model, timeout and retry budget
//! - Full observability with tracing instrumentation

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::{AdvisorSource, BoundingBox, Corner, PlacementAdvisor, PlacementSuggestion};
use crate::error::{BrandError, Result};
use crate::gemini::{
    endpoint, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    DEFAULT_API_URL,
};

/// Default vision model.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum number of retry attempts.
const MAX_RETRIES: u32 = 3;

/// Initial retry interval.
const INITIAL_INTERVAL: Duration = Duration::from_millis(200);

/// Maximum retry interval.
const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Bounding box coordinates live in a 0-1000 normalized frame.
const COORDINATE_RANGE: f64 = 1000.0;

/// Expected reply schema from the vision model.
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    position: String,
    padding: f64,
    #[serde(rename = "boundingBox")]
    bounding_box: Option<[f64; 4]>,
}

/// Configuration for the Gemini advisor client.
///
/// Passed explicitly at construction; the core never reads ambient
/// environment state.
#[derive(Debug, Clone)]
pub struct GeminiAdvisorConfig {
    /// API base URL.
    pub api_url: String,
    /// Vision model identifier.
    pub model: String,
    /// API key.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
}

impl GeminiAdvisorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }
}

/// Gemini placement advisor client.
///
/// ## Example
///
/// ```no_run
/// use brandkit_core::advisor::{GeminiAdvisor, GeminiAdvisorConfig, PlacementAdvisor};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let advisor = GeminiAdvisor::new(GeminiAdvisorConfig::new("api-key"))?;
/// let image = std::fs::read("product.jpg")?;
/// let suggestion = advisor.suggest(&image, 50).await?;
/// println!("Place logo at {}", suggestion.corner);
/// # Ok(())
/// # }
/// ```
pub struct GeminiAdvisor {
    client: Client,
    config: GeminiAdvisorConfig,
}

impl GeminiAdvisor {
    /// Create a new Gemini advisor client.
    #[instrument(level = "debug", skip_all, fields(model = %config.model))]
    pub fn new(config: GeminiAdvisorConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(BrandError::Config(
                "Gemini advisor requires an API key".into(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                BrandError::Advisor(format!("Failed to create HTTP client: {e}"))
            })?;

        debug!("Gemini advisor client created");
        Ok(Self { client, config })
    }

    /// Instruction sent alongside the image.
    fn build_prompt(preferred_padding: u32) -> String {
        format!(
            "Analyze this product photo. Identify the primary product and return its \
             bounding box in a 0-1000 normalized coordinate space as [yMin, xMin, yMax, xMax]. \
             Then choose the logo position with the most negative space (least overlap \
             with the product) among: top-left, top-right, bottom-left, bottom-right, center. \
             Unless the composition demands otherwise, use a padding of {preferred_padding}. \
             Reply with only a JSON object: \
             {{\"position\": \"...\", \"padding\": number, \"boundingBox\": [yMin, xMin, yMax, xMax]}}"
        )
    }

    /// Parse and validate the model's JSON reply.
    fn parse_suggestion(text: &str) -> Result<PlacementSuggestion> {
        let raw: RawSuggestion = serde_json::from_str(strip_fences(text))
            .map_err(|e| BrandError::Advisor(format!("Unparseable advisor reply: {e}")))?;

        let corner = match raw.position.trim().to_lowercase().as_str() {
            "top-left" => Corner::TopLeft,
            "top-right" => Corner::TopRight,
            "bottom-left" => Corner::BottomLeft,
            "bottom-right" => Corner::BottomRight,
            "center" => Corner::Center,
            other => {
                return Err(BrandError::Advisor(format!(
                    "Unknown corner position: {other:?}"
                )))
            }
        };

        if !raw.padding.is_finite() || raw.padding < 0.0 {
            return Err(BrandError::Advisor(format!(
                "Invalid padding value: {}",
                raw.padding
            )));
        }
        let padding = raw.padding.min(COORDINATE_RANGE).round() as u32;

        let bounding_box = raw.bounding_box.and_then(|coords| {
            if coords.iter().any(|c| !c.is_finite()) {
                return None;
            }
            let clamped: Vec<u32> = coords
                .iter()
                .map(|c| c.clamp(0.0, COORDINATE_RANGE).round() as u32)
                .collect();
            let (y_min, x_min, y_max, x_max) = (clamped[0], clamped[1], clamped[2], clamped[3]);
            // A degenerate or inverted box carries no signal; drop it.
            if y_min >= y_max || x_min >= x_max {
                return None;
            }
            Some(BoundingBox {
                y_min,
                x_min,
                y_max,
                x_max,
            })
        });

        Ok(PlacementSuggestion {
            corner,
            padding,
            bounding_box,
        })
    }

    /// Check if an error is transient and should be retried.
    fn is_transient_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    /// Check if an HTTP status code indicates a transient error.
    fn is_transient_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::BAD_GATEWAY
        )
    }

    /// Build exponential backoff configuration.
    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        }
    }

    /// One request attempt against the vision model.
    #[instrument(level = "debug", skip_all, fields(model = %self.config.model))]
    async fn fetch_suggestion_internal(
        &self,
        image: &[u8],
        preferred_padding: u32,
    ) -> std::result::Result<PlacementSuggestion, backoff::Error<BrandError>> {
        let start = Instant::now();

        let mime = image::guess_format(image)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/jpeg");
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::inline_image(mime, encoded),
                Part::text(Self::build_prompt(preferred_padding)),
            ])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                ..Default::default()
            }),
        };

        let response = self
            .client
            .post(endpoint(&self.config.api_url, &self.config.model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis();
                if Self::is_transient_error(&e) {
                    warn!(
                        error = %e,
                        latency_ms = latency_ms as u64,
                        "Transient error, will retry"
                    );
                    backoff::Error::transient(BrandError::Advisor(format!(
                        "Transient error (will retry): {e}"
                    )))
                } else {
                    warn!(
                        error = %e,
                        latency_ms = latency_ms as u64,
                        "Permanent error, aborting"
                    );
                    backoff::Error::permanent(BrandError::Advisor(format!(
                        "Advisor request failed: {e}"
                    )))
                }
            })?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            let latency_ms = start.elapsed().as_millis();
            let err = BrandError::Advisor(format!("Advisor API returned status: {status}"));
            return if Self::is_transient_status(status) {
                warn!(
                    status = %status,
                    latency_ms = latency_ms as u64,
                    "Transient HTTP status, will retry"
                );
                Err(backoff::Error::transient(err))
            } else {
                warn!(
                    status = %status,
                    latency_ms = latency_ms as u64,
                    "Permanent HTTP error"
                );
                Err(backoff::Error::permanent(err))
            };
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse JSON response");
            backoff::Error::permanent(BrandError::Advisor(format!(
                "Failed to parse advisor response: {e}"
            )))
        })?;

        let text = body.first_text().ok_or_else(|| {
            warn!("Response contained no text part");
            backoff::Error::permanent(BrandError::Advisor(
                "Advisor response contained no text part".into(),
            ))
        })?;

        let latency_ms = start.elapsed().as_millis();
        debug!(
            latency_ms = latency_ms as u64,
            "Request completed successfully"
        );

        Self::parse_suggestion(text).map_err(backoff::Error::permanent)
    }
}

#[async_trait]
impl PlacementAdvisor for GeminiAdvisor {
    /// Suggest a placement for one image, retrying transient failures with
    /// exponential backoff.
    #[instrument(
        level = "info",
        skip(self, image),
        fields(
            source = "gemini",
            image_bytes = image.len(),
            max_retries = self.config.max_retries
        )
    )]
    async fn suggest(&self, image: &[u8], preferred_padding: u32) -> Result<PlacementSuggestion> {
        let start = Instant::now();
        let backoff = self.build_backoff();

        debug!("Requesting placement suggestion");

        let result = retry_notify(
            backoff,
            || async {
                self.fetch_suggestion_internal(image, preferred_padding)
                    .await
            },
            |err: BrandError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await;

        let total_latency_ms = start.elapsed().as_millis();

        match &result {
            Ok(suggestion) => {
                debug!(
                    corner = %suggestion.corner,
                    padding = suggestion.padding,
                    total_latency_ms = total_latency_ms as u64,
                    "Placement suggestion received"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    total_latency_ms = total_latency_ms as u64,
                    "Failed to obtain placement suggestion after all retries"
                );
            }
        }

        result
    }

    fn source_id(&self) -> AdvisorSource {
        AdvisorSource::Gemini
    }
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
