//! `image` crate backend.

use crossbeam_channel::bounded;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use crate::error::TransformError;
use crate::types::OutputFormat;
use crate::utils::config::EncodeConsts;

use super::{ImageHandle, ImageProcessor, JobContext, scaled_dimensions};

#[derive(Clone, Debug, Default)]
pub struct ImageRsProcessor;

impl ImageRsProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl ImageProcessor for ImageRsProcessor {
    fn name(&self) -> &'static str {
        "image"
    }

    fn best_formats(&self) -> Vec<OutputFormat> {
        vec![OutputFormat::Jpeg, OutputFormat::Webp]
    }

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ImageHandle>, TransformError> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(format!("cannot detect image format: {e}")))?
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        Ok(Box::new(ImageRsHandle {
            image: Arc::new(image),
            format: None,
            strip_metadata: false,
        }))
    }
}

/// Decoded pixels. The image sits behind an `Arc` so a resize can run on a helper thread
/// that is abandoned if the job is cancelled.
pub struct ImageRsHandle {
    image: Arc<DynamicImage>,
    format: Option<OutputFormat>,
    strip_metadata: bool,
}

impl ImageHandle for ImageRsHandle {
    fn strip_metadata(&mut self) -> Result<(), TransformError> {
        self.strip_metadata = true;
        Ok(())
    }

    fn set_format(&mut self, format: OutputFormat) -> Result<(), TransformError> {
        self.format = Some(format);
        Ok(())
    }

    fn resize(
        &mut self,
        ctx: &JobContext,
        width: u32,
        height: u32,
    ) -> Result<(), TransformError> {
        let (src_w, src_h) = ImageHandle::dimensions(self);
        let Some((w, h)) = scaled_dimensions(src_w, src_h, width, height)? else {
            return Ok(());
        };

        let (tx, rx) = bounded(1);
        let src = Arc::clone(&self.image);
        thread::spawn(move || {
            // Receiver is gone when the job was cancelled; nothing to report then.
            let _ = tx.send(src.resize_exact(w, h, FilterType::Lanczos3));
        });

        match ctx.wait_for(&rx)? {
            Some(resized) => {
                self.image = Arc::new(resized);
                Ok(())
            }
            None => Err(TransformError::Resize {
                width: w,
                height: h,
                message: "resize thread exited without a result".to_string(),
            }),
        }
    }

    fn encoded_bytes(&mut self) -> Result<Vec<u8>, TransformError> {
        let format = self.format.ok_or(TransformError::FormatNotSet)?;
        // Encoding from decoded pixels never carries the source's EXIF/ICC blocks, so the
        // output is metadata-free whether or not strip_metadata was requested.
        if !self.strip_metadata {
            log::trace!("encoding {format} without source metadata");
        }
        let encode_err = |e: image::ImageError| TransformError::Encode {
            format,
            message: e.to_string(),
        };

        let mut buf = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut buf,
                    EncodeConsts::JPEG_QUALITY,
                ))
                .map_err(encode_err)?;
            }
            OutputFormat::Webp => {
                let rgba = DynamicImage::ImageRgba8(self.image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
                    .map_err(encode_err)?;
            }
        }
        Ok(buf)
    }

    fn dominant_color(&self) -> Result<String, TransformError> {
        let sample = self
            .image
            .thumbnail(
                EncodeConsts::DOMINANT_COLOR_SAMPLE,
                EncodeConsts::DOMINANT_COLOR_SAMPLE,
            )
            .to_rgb8();
        let n = sample.width() as u64 * sample.height() as u64;
        if n == 0 {
            return Err(TransformError::DominantColor("empty image".to_string()));
        }
        let (r, g, b) = sample.pixels().fold((0u64, 0u64, 0u64), |(r, g, b), p| {
            (r + p[0] as u64, g + p[1] as u64, b + p[2] as u64)
        });
        Ok(format!("#{:02X}{:02X}{:02X}", r / n, g / n, b / n))
    }

    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
