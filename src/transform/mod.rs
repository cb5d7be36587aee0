//! Image transform adapter: the narrow interface the pipeline uses to decode, resize and
//! re-encode images, plus the backend factory.
//!
//! A backend is chosen once at startup from [`ProcessorKind`] and shared by every worker
//! as `Arc<dyn ImageProcessor>`. Each job decodes its own [`ImageHandle`]; the handle's
//! resources are released when it is dropped.

pub mod image_rs;

use crossbeam_channel::{Receiver, select};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ConfigError, TransformError};
use crate::pipeline::CancelToken;
use crate::types::OutputFormat;

pub use image_rs::ImageRsProcessor;

/// A decoded image owned by one job.
pub trait ImageHandle: Send {
    /// Drop EXIF/XMP/ICC data from the encoded output.
    fn strip_metadata(&mut self) -> Result<(), TransformError>;

    /// Select the encoding used by [`encoded_bytes`](Self::encoded_bytes).
    fn set_format(&mut self, format: OutputFormat) -> Result<(), TransformError>;

    /// Scale along one axis, preserving aspect ratio. `(0, 0)` and upscaling are no-ops.
    /// Must abort with `Cancelled` / `DeadlineExceeded` when `ctx` fires mid-resize.
    fn resize(&mut self, ctx: &JobContext, width: u32, height: u32)
    -> Result<(), TransformError>;

    /// Encode in the selected format.
    fn encoded_bytes(&mut self) -> Result<Vec<u8>, TransformError>;

    /// Representative colour as `#RRGGBB`.
    fn dominant_color(&self) -> Result<String, TransformError>;

    /// Current pixel dimensions.
    fn dimensions(&self) -> (u32, u32);
}

/// An image processing backend.
pub trait ImageProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Formats this backend encodes well, in preferred order.
    fn best_formats(&self) -> Vec<OutputFormat>;

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ImageHandle>, TransformError>;
}

/// Backends selectable by name (`--processor`, `processor = ".."`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessorKind {
    /// Pure-Rust backend on the `image` crate.
    #[default]
    ImageRs,
}

impl ProcessorKind {
    pub fn name(self) -> &'static str {
        match self {
            ProcessorKind::ImageRs => "image",
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "image-rs" | "imagers" => Ok(ProcessorKind::ImageRs),
            other => Err(ConfigError::UnknownProcessor(other.to_string())),
        }
    }
}

/// Construct the backend for `kind`.
pub fn build_processor(kind: ProcessorKind) -> Arc<dyn ImageProcessor> {
    match kind {
        ProcessorKind::ImageRs => Arc::new(ImageRsProcessor::new()),
    }
}

/// Per-job context: cancellation plus an optional deadline.
#[derive(Clone)]
pub struct JobContext {
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl JobContext {
    /// Context whose deadline is `timeout` from now. `None` means no deadline.
    pub fn with_timeout(cancel: CancelToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
            timeout,
        }
    }

    /// Fail fast when cancelled or past the deadline.
    pub fn check(&self) -> Result<(), TransformError> {
        if self.cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }
        if let (Some(deadline), Some(timeout)) = (self.deadline, self.timeout)
            && Instant::now() >= deadline
        {
            return Err(TransformError::DeadlineExceeded(timeout));
        }
        Ok(())
    }

    /// Block on `rx` until a value arrives, the token is cancelled or the deadline passes.
    /// `Ok(None)` when the sending side went away without a value.
    pub fn wait_for<T>(&self, rx: &Receiver<T>) -> Result<Option<T>, TransformError> {
        self.check()?;
        let done = self.cancel.done();
        match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                select! {
                    recv(rx) -> msg => Ok(msg.ok()),
                    recv(done) -> _ => Err(TransformError::Cancelled),
                    default(remaining) => Err(TransformError::DeadlineExceeded(timeout)),
                }
            }
            _ => select! {
                recv(rx) -> msg => Ok(msg.ok()),
                recv(done) -> _ => Err(TransformError::Cancelled),
            },
        }
    }
}

/// Target size for a one-axis resize of a `src_w`×`src_h` image.
///
/// `None` when nothing has to happen: both targets zero, or the scale factor is ≥ 1
/// (never upscale). Asking for both axes at once is an error.
pub fn scaled_dimensions(
    src_w: u32,
    src_h: u32,
    width: u32,
    height: u32,
) -> Result<Option<(u32, u32)>, TransformError> {
    let scale = match (width, height) {
        (0, 0) => return Ok(None),
        (w, 0) => w as f64 / src_w.max(1) as f64,
        (0, h) => h as f64 / src_h.max(1) as f64,
        (w, h) => return Err(TransformError::BothDimensions { width: w, height: h }),
    };
    if scale >= 1.0 {
        return Ok(None);
    }
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    let (w, h) = match (width, height) {
        (w, 0) => (w, scaled(src_h)),
        (_, h) => (scaled(src_w), h),
    };
    Ok(Some((w, h)))
}

/// Run the standard transform sequence for one variant: decode → strip metadata →
/// set format → resize (skipped when both dimensions are zero) → encode.
pub fn render_variant(
    processor: &dyn ImageProcessor,
    ctx: &JobContext,
    source: &[u8],
    format: OutputFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, TransformError> {
    let mut handle = processor.decode(source)?;
    handle.strip_metadata()?;
    handle.set_format(format)?;
    if width != 0 || height != 0 {
        handle.resize(ctx, width, height)?;
    }
    handle.encoded_bytes()
}
