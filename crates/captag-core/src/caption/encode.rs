//! Downsizes and re-encodes images before sending them to a caption model.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use super::provider::ImageInput;
use crate::error::PipelineError;

/// Shrink to `max_edge` (aspect preserved, never upscaled) and encode as JPEG.
pub fn encode_for_caption(
    image: &DynamicImage,
    max_edge: u32,
    path: &Path,
) -> Result<ImageInput, PipelineError> {
    let resized = if image.width() > max_edge || image.height() > max_edge {
        image.thumbnail(max_edge, max_edge)
    } else {
        image.clone()
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Failed to encode image for captioning: {e}"),
        })?;

    tracing::trace!(
        "Encoded {:?} for captioning at {}x{}",
        path,
        rgb.width(),
        rgb.height()
    );
    Ok(ImageInput::from_bytes(&buffer.into_inner(), "jpeg"))
}
