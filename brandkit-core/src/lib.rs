//! Brandkit Core - batch image-branding engine
//!
//! This crate takes a gallery of product photos plus one brand logo and
//! produces a ZIP archive of branded images: each photo gets a faint
//! full-frame watermark and a small corner mark whose position is suggested
//! by a vision model (with a deterministic fallback when the model is
//! unreachable).
//!
//! # Features
//!
//! - Pure-function compositor: watermark + corner passes, optional square
//!   canvas, max-quality JPEG output and preview thumbnails
//! - AI-assisted placement with a never-failing fallback boundary
//! - Strictly sequential batch pipeline with per-item error isolation,
//!   progress events and cooperative scheduler yields
//! - In-memory ZIP archive sink
//! - Secondary prompt-to-image generation client
//!
//! # Example
//!
//! ```no_run
//! use brandkit_core::{BatchRunner, MockAdvisor, NullObserver, RunOptions, SourceAsset};
//!
//! # async fn example() -> brandkit_core::Result<()> {
//! // Use the mock advisor for offline runs (in production, GeminiAdvisor).
//! let runner = BatchRunner::new(MockAdvisor::default());
//!
//! let assets = vec![SourceAsset::new("product.jpg", std::fs::read("product.jpg").unwrap())];
//! let logo = std::fs::read("logo.png").unwrap();
//!
//! let result = runner
//!     .run(&assets, &logo, &RunOptions::default(), &mut NullObserver)
//!     .await?;
//!
//! if let Some(archive) = result.archive {
//!     std::fs::write("branded.zip", archive).unwrap();
//! }
//! println!("{} of {} images branded", result.completed, result.items.len());
//! # Ok(())
//! # }
//! ```

pub mod advisor;
pub mod archive;
pub mod compose;
pub mod error;
mod gemini;
pub mod generate;
pub mod pipeline;

// Re-export main types for convenience
pub use advisor::{
    suggest_or_fallback, AdvisorSource, BoundingBox, Corner, GeminiAdvisor, GeminiAdvisorConfig,
    MockAdvisor, MockReply, PlacementAdvisor, PlacementSuggestion, FALLBACK_PADDING,
};
pub use archive::{branded_name, ArchiveSink};
pub use compose::{
    compose, BrandedImage, ComposeOptions, CORNER_SCALE, PADDING_REFERENCE_WIDTH, THUMBNAIL_SIDE,
    WATERMARK_OPACITY, WATERMARK_SCALE,
};
pub use error::{BrandError, Result};
pub use generate::{AspectRatio, GeneratedImage, ImageGenerator, ImageGeneratorConfig};
pub use pipeline::{
    BatchRunner, ItemState, ItemStatus, NullObserver, RunObserver, RunOptions, RunResult,
    SourceAsset,
};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([180, 180, 180]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("PNG encoding failed");
        buffer.into_inner()
    }

    /// Integration test: full gallery run producing a readable archive.
    #[tokio::test]
    async fn test_full_branding_workflow() {
        let runner = BatchRunner::new(MockAdvisor::default());
        let assets = vec![
            SourceAsset::new("front.png", png_bytes(320, 240)),
            SourceAsset::new("back.png", png_bytes(240, 320)),
        ];
        let logo = png_bytes(64, 32);

        let result = runner
            .run(&assets, &logo, &RunOptions::default(), &mut NullObserver)
            .await
            .expect("run failed");

        assert_eq!(result.completed, 2);
        assert!(result.items.iter().all(|i| i.status == ItemStatus::Completed));
        assert!(result.items.iter().all(|i| i.progress == 100));

        let archive = result.archive.expect("archive missing");
        let zip = zip::ZipArchive::new(Cursor::new(archive)).expect("invalid archive");
        assert_eq!(zip.len(), 2);
    }
}
