//! Background removal.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ Bytes
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           BackgroundRemover             │
//! │   (semaphore-bounded spawn_blocking)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                 cut_out                 │
//! │  decode → Segmenter → alpha mask → PNG  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   Segmenter trait (OnnxSegmenter/U²Net) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`BackgroundRemover`]: async entry point, owns the worker pool
//! - [`Segmenter`]: model interface producing a foreground mask
//! - [`OnnxSegmenter`]: ONNX Runtime implementation for U²-Net style models
//! - [`cut_out`]: the synchronous pipeline run on each worker

mod cutout;
mod onnx;
mod segmenter;
mod service;

pub use cutout::{apply_mask, cut_out, decode_image, encode_png, is_png, PNG_SIGNATURE};
pub use onnx::{OnnxSegmenter, DEFAULT_INTRA_THREADS, DEFAULT_MODEL_PATH};
pub use segmenter::{image_to_tensor, prediction_to_mask, Segmenter, MEAN, MODEL_INPUT_SIZE, STD};
pub use service::{BackgroundRemover, DEFAULT_WORKERS};
