//! Bounded worker pool around the blocking cut-out pipeline.
//!
//! ```text
//! request task                    blocking pool
//! ────────────                    ─────────────
//! acquire permit ──(waits while all workers busy)
//! spawn_blocking ───────────────► decode → segment → mask → PNG
//! await JoinHandle ◄────────────── result (permit released on drop)
//! ```
//!
//! If the awaiting request is dropped (client disconnect), the blocking job
//! still runs to completion and keeps its permit until then; the result is
//! discarded.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::cutout::cut_out;
use super::segmenter::Segmenter;
use crate::error::ProcessingError;

/// Default number of concurrent background removals.
pub const DEFAULT_WORKERS: usize = 4;

/// Removes image backgrounds off the async runtime.
///
/// # Type Parameters
///
/// * `S` - The segmentation model
///
/// # Example
///
/// ```ignore
/// use bg_remover::remover::{BackgroundRemover, OnnxSegmenter};
///
/// let segmenter = OnnxSegmenter::load("models/u2net.onnx", 4, 1)?;
/// let remover = BackgroundRemover::with_workers(segmenter, 4);
///
/// let png = remover.remove_background(jpeg_bytes).await?;
/// ```
pub struct BackgroundRemover<S: Segmenter> {
    segmenter: Arc<S>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl<S: Segmenter> BackgroundRemover<S> {
    /// Create a remover with [`DEFAULT_WORKERS`] workers.
    pub fn new(segmenter: S) -> Self {
        Self::with_workers(segmenter, DEFAULT_WORKERS)
    }

    /// Create a remover with a fixed number of workers (at least one).
    pub fn with_workers(segmenter: S, workers: usize) -> Self {
        Self::with_shared_segmenter(Arc::new(segmenter), workers)
    }

    /// Create a remover around a segmenter shared with other components.
    pub fn with_shared_segmenter(segmenter: Arc<S>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            segmenter,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// The underlying segmenter.
    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Pool size.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running a removal.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Remove the background from encoded image bytes.
    ///
    /// Returns PNG bytes with an alpha channel. Waits for a free worker when
    /// the pool is saturated. Every call recomputes; nothing is cached.
    pub async fn remove_background(&self, data: Bytes) -> Result<Bytes, ProcessingError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ProcessingError::Worker(e.to_string()))?;

        let segmenter = Arc::clone(&self.segmenter);
        let input_bytes = data.len();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            cut_out(segmenter.as_ref(), &data)
        })
        .await
        .map_err(|e| {
            error!("Background removal worker failed: {}", e);
            ProcessingError::Worker(e.to_string())
        })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => debug!(
                model = self.segmenter.name(),
                input_bytes,
                output_bytes = output.len(),
                elapsed_ms,
                "Background removed"
            ),
            Err(e) => debug!(
                model = self.segmenter.name(),
                input_bytes,
                elapsed_ms,
                "Background removal failed: {}",
                e
            ),
        }

        result
    }

    /// Read an image file, remove its background and write the PNG result.
    ///
    /// Returns the number of bytes written.
    pub async fn remove_background_from_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<usize, ProcessingError> {
        let input = input.as_ref();
        let output = output.as_ref();

        let data = tokio::fs::read(input)
            .await
            .map_err(|e| ProcessingError::Io(format!("{}: {}", input.display(), e)))?;

        let png = self.remove_background(Bytes::from(data)).await?;

        tokio::fs::write(output, &png)
            .await
            .map_err(|e| ProcessingError::Io(format!("{}: {}", output.display(), e)))?;

        Ok(png.len())
    }
}

impl<S: Segmenter> Clone for BackgroundRemover<S> {
    fn clone(&self) -> Self {
        Self {
            segmenter: Arc::clone(&self.segmenter),
            permits: Arc::clone(&self.permits),
            workers: self.workers,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
