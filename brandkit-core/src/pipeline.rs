//! Sequential batch branding pipeline.
//!
//! The [`BatchRunner`] drives the per-item state machine across a gallery:
//!
//! ```text
//! pending -> analyzing -> processing -> { completed | error }
//! ```
//!
//! Items are processed strictly sequentially, in input order; item `i + 1`
//! never starts before item `i` reaches a terminal state. This bounds peak
//! memory (one decoded source at a time, the logo decoded once per run) and
//! paces the external advisor service. One item's failure never aborts the
//! run: the item is marked `Skipped` and the loop moves on. After every
//! `batch_size` items the runner yields to the scheduler so a host event
//! loop stays responsive during long runs.

use std::collections::HashSet;

use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::advisor::{suggest_or_fallback, PlacementAdvisor, PlacementSuggestion};
use crate::archive::{branded_name, branded_name_numbered, ArchiveSink};
use crate::compose::{compose, ComposeOptions};
use crate::error::{BrandError, Result};

/// Progress milestone: advisor call in flight.
const PROGRESS_ANALYZING: u8 = 15;
/// Progress milestone: compositing in flight.
const PROGRESS_PROCESSING: u8 = 60;
/// Progress milestone: result handed to the archive sink.
const PROGRESS_ARCHIVING: u8 = 90;
/// Progress milestone: terminal success.
const PROGRESS_DONE: u8 = 100;

/// Short user-facing category attached to failed items.
const ERROR_REASON: &str = "Skipped";

/// One source image in the gallery. Immutable once added; the runner only
/// reads it.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    /// Display name, also the basis for the archive entry name.
    pub name: String,
    /// Raw encoded image bytes.
    pub bytes: Vec<u8>,
}

impl SourceAsset {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Lifecycle state of one gallery item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Analyzing,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    /// Terminal states end an item's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Mutable per-item record, owned by the runner for the duration of a run.
/// Observers receive read-only snapshots.
#[derive(Debug, Clone)]
pub struct ItemState {
    /// Index of the item in the input gallery.
    pub id: usize,
    /// Source display name.
    pub name: String,
    pub status: ItemStatus,
    /// 0-100.
    pub progress: u8,
    /// Suggestion used for this item, whether from the advisor or the
    /// fallback.
    pub placement: Option<PlacementSuggestion>,
    /// Small preview JPEG. The full-resolution bytes live only inside the
    /// archive sink to bound memory across large batches.
    pub thumbnail: Option<Vec<u8>>,
    /// Short failure category for items that did not complete.
    pub error_reason: Option<String>,
}

impl ItemState {
    fn pending(id: usize, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            status: ItemStatus::Pending,
            progress: 0,
            placement: None,
            thumbnail: None,
            error_reason: None,
        }
    }
}

/// Run-level configuration, immutable during a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Preferred corner-logo padding in the 1000-unit reference frame.
    pub padding: u32,
    /// Force square output canvases.
    pub force_square: bool,
    /// Items processed between cooperative yields to the scheduler.
    pub batch_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            padding: 50,
            force_square: false,
            batch_size: 5,
        }
    }
}

/// Result of a finished run. Produced only after every item has reached a
/// terminal state.
#[derive(Debug)]
pub struct RunResult {
    /// The finalized ZIP, or `None` when archive finalization failed.
    /// Item states are preserved either way.
    pub archive: Option<Vec<u8>>,
    /// Number of items that reached `Completed`.
    pub completed: usize,
    /// Final state of every item, in input order.
    pub items: Vec<ItemState>,
}

/// Observer for discrete pipeline state changes.
///
/// All methods have empty default bodies so implementors only handle what
/// they care about. The runner calls them from its own task; implementations
/// should return quickly.
pub trait RunObserver: Send {
    /// An item's state changed; `item` is a read-only snapshot.
    fn item_changed(&mut self, _item: &ItemState) {}

    /// The runner moved to item `index` of `total`.
    fn run_progress(&mut self, _index: usize, _total: usize) {}

    /// Every item is terminal and archive finalization was attempted.
    fn run_finished(&mut self, _completed: usize, _total: usize) {}
}

/// Observer that ignores every event.
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// Drives the batch pipeline. Owns the advisor; one runner serves any number
/// of sequential runs.
pub struct BatchRunner<A: PlacementAdvisor> {
    advisor: A,
}

impl<A: PlacementAdvisor> BatchRunner<A> {
    pub fn new(advisor: A) -> Self {
        Self { advisor }
    }

    /// Process the whole gallery and assemble the archive.
    ///
    /// Rejects an empty gallery or an absent/undecodable logo before any
    /// item processing begins. Per-item failures are isolated; archive
    /// finalization failure is reported through `RunResult.archive = None`
    /// rather than an error, so completed item states survive.
    #[instrument(level = "info", skip_all, fields(items = assets.len(), advisor = %self.advisor.source_id()))]
    pub async fn run(
        &self,
        assets: &[SourceAsset],
        logo_bytes: &[u8],
        options: &RunOptions,
        observer: &mut dyn RunObserver,
    ) -> Result<RunResult> {
        if assets.is_empty() {
            return Err(BrandError::Config("Gallery is empty".into()));
        }
        if logo_bytes.is_empty() {
            return Err(BrandError::Config("No brand logo supplied".into()));
        }
        // Decoded once, shared read-only across every item in the run.
        let logo = image::load_from_memory(logo_bytes)
            .map_err(|e| BrandError::Config(format!("Brand logo cannot be decoded: {e}")))?;

        let compose_options = ComposeOptions {
            force_square: options.force_square,
        };
        let batch_size = options.batch_size.max(1);
        let total = assets.len();

        let mut items: Vec<ItemState> = assets
            .iter()
            .enumerate()
            .map(|(id, asset)| ItemState::pending(id, &asset.name))
            .collect();
        let mut sink = ArchiveSink::new();
        let mut used_names: HashSet<String> = HashSet::new();
        let mut completed = 0usize;

        info!(total, "Starting batch run");

        for (index, asset) in assets.iter().enumerate() {
            observer.run_progress(index, total);

            let outcome = self
                .process_item(
                    asset,
                    &logo,
                    options,
                    &compose_options,
                    &mut items[index],
                    &mut sink,
                    &mut used_names,
                    observer,
                )
                .await;

            match outcome {
                Ok(()) => completed += 1,
                Err(e) => {
                    warn!(item = %asset.name, error = %e, "Item failed, continuing with next");
                    let item = &mut items[index];
                    item.status = ItemStatus::Error;
                    item.progress = 0;
                    item.error_reason = Some(ERROR_REASON.to_string());
                    observer.item_changed(item);
                }
            }

            // Cooperative pacing, not a correctness requirement.
            if (index + 1) % batch_size == 0 {
                tokio::task::yield_now().await;
            }
        }

        let archive = match sink.finalize() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Archive finalization failed; item states preserved");
                None
            }
        };

        info!(completed, total, "Batch run finished");
        observer.run_finished(completed, total);

        Ok(RunResult {
            archive,
            completed,
            items,
        })
    }

    /// One pass through the per-item state machine. Any error here marks the
    /// item as skipped at the call site; advisor failures never reach this
    /// far because the fallback absorbs them.
    #[allow(clippy::too_many_arguments)]
    async fn process_item(
        &self,
        asset: &SourceAsset,
        logo: &DynamicImage,
        options: &RunOptions,
        compose_options: &ComposeOptions,
        item: &mut ItemState,
        sink: &mut ArchiveSink,
        used_names: &mut HashSet<String>,
        observer: &mut dyn RunObserver,
    ) -> Result<()> {
        item.status = ItemStatus::Analyzing;
        item.progress = PROGRESS_ANALYZING;
        observer.item_changed(item);

        let placement = suggest_or_fallback(&self.advisor, &asset.bytes, options.padding).await;
        debug!(item = %asset.name, corner = %placement.corner, "Placement resolved");
        // Attached for display regardless of advisor success or fallback.
        item.placement = Some(placement.clone());

        item.status = ItemStatus::Processing;
        item.progress = PROGRESS_PROCESSING;
        observer.item_changed(item);

        let branded = compose(&asset.bytes, Some(logo), &placement, compose_options)?;

        item.progress = PROGRESS_ARCHIVING;
        observer.item_changed(item);

        let entry_name = unique_entry_name(&asset.name, used_names);
        sink.append(&entry_name, &branded.full_res)?;

        item.status = ItemStatus::Completed;
        item.progress = PROGRESS_DONE;
        // Only the thumbnail is retained in item state; the full-resolution
        // bytes drop with `branded` at the end of this scope.
        item.thumbnail = Some(branded.thumbnail);
        observer.item_changed(item);

        Ok(())
    }
}

/// Derive a deterministic, collision-free archive entry name from the
/// source file name.
fn unique_entry_name(source_name: &str, used: &mut HashSet<String>) -> String {
    let base = branded_name(source_name);
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = branded_name_numbered(source_name, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
