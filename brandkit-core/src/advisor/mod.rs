//! Logo placement advisors.
//!
//! An advisor looks at a product photo and suggests where the corner logo
//! should go: one of the four corners or the center, plus a padding value in
//! the 1000-unit reference frame and, when available, a bounding box around
//! the primary product.
//!
//! The advisor call is the only network dependency in the per-item pipeline.
//! Its failure policy is absorbed at this boundary: [`suggest_or_fallback`]
//! never propagates an error, it degrades to the deterministic fallback
//! placement instead.

mod gemini;
mod mock;

pub use gemini::{GeminiAdvisor, GeminiAdvisorConfig};
pub use mock::{MockAdvisor, MockReply};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Fallback placement used whenever an advisor fails for any reason.
pub const FALLBACK_PADDING: u32 = 50;

/// Anchor position for the corner-pass logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopLeft => write!(f, "top-left"),
            Self::TopRight => write!(f, "top-right"),
            Self::BottomLeft => write!(f, "bottom-left"),
            Self::BottomRight => write!(f, "bottom-right"),
            Self::Center => write!(f, "center"),
        }
    }
}

/// Product bounding box in a 0-1000 normalized coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y_min: u32,
    pub x_min: u32,
    pub y_max: u32,
    pub x_max: u32,
}

/// One placement suggestion, produced per asset and consumed once by the
/// compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSuggestion {
    pub corner: Corner,
    /// Padding in the 1000-unit-wide reference frame.
    pub padding: u32,
    pub bounding_box: Option<BoundingBox>,
}

impl PlacementSuggestion {
    /// The deterministic fallback: bottom-right, padding 50, no box.
    pub fn fallback() -> Self {
        Self {
            corner: Corner::BottomRight,
            padding: FALLBACK_PADDING,
            bounding_box: None,
        }
    }
}

/// Identifies the advisor backing a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisorSource {
    /// Gemini vision model.
    Gemini,
    /// Deterministic mock for tests and offline runs.
    Mock,
}

impl std::fmt::Display for AdvisorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "Gemini"),
            Self::Mock => write!(f, "Mock"),
        }
    }
}

/// Trait for placement advisors. Implementations must be thread-safe
/// (`Send + Sync`).
///
/// `preferred_padding` is the caller's configured padding; advisors may echo
/// it back or override it per image.
#[async_trait]
pub trait PlacementAdvisor: Send + Sync {
    /// Suggest a logo placement for one source image.
    ///
    /// May perform network requests; implementations handle retries
    /// internally. Errors are absorbed by [`suggest_or_fallback`] at the
    /// pipeline boundary.
    async fn suggest(&self, image: &[u8], preferred_padding: u32) -> Result<PlacementSuggestion>;

    /// Returns the advisor identifier for display.
    fn source_id(&self) -> AdvisorSource;
}

/// Ask the advisor for a placement, degrading to the fixed fallback on any
/// failure. This function never returns an error.
pub async fn suggest_or_fallback<A: PlacementAdvisor + ?Sized>(
    advisor: &A,
    image: &[u8],
    preferred_padding: u32,
) -> PlacementSuggestion {
    match advisor.suggest(image, preferred_padding).await {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!(
                advisor = %advisor.source_id(),
                error = %e,
                "Placement advisor failed, using fallback placement"
            );
            PlacementSuggestion::fallback()
        }
    }
}
