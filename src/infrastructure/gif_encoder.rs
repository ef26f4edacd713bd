// GIF animation encoder - stitches exported frames into a looping GIF
use crate::application::frame_exporter::AnimationEncoder;
use crate::error::AnimatorResult;
use image::codecs::gif::{GifEncoder, Repeat};
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::imageops::FilterType;
use image::{Delay, Frame, GenericImageView};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct GifAnimationEncoder;

fn invalid(message: &str) -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::Generic(
        message.to_string(),
    )))
}

impl AnimationEncoder for GifAnimationEncoder {
    /// Frames play in the order given. Every frame is fitted to the size of
    /// the first one, and the animation loops forever.
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> AnimatorResult<PathBuf> {
        if frames.is_empty() {
            return Err(invalid("cannot encode an animation without frames").into());
        }
        if fps == 0 {
            return Err(invalid("frame rate must be at least 1").into());
        }

        let delay = Delay::from_numer_denom_ms(1000, fps);
        let mut size = None;

        let file = BufWriter::new(File::create(output)?);
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite)?;

        for path in frames {
            let mut image = image::open(path)?;
            let (width, height) = *size.get_or_insert(image.dimensions());
            if image.dimensions() != (width, height) {
                tracing::debug!(
                    "Resizing {} from {:?} to {}x{}",
                    path.display(),
                    image.dimensions(),
                    width,
                    height
                );
                image = image.resize_exact(width, height, FilterType::Triangle);
            }
            encoder.encode_frame(Frame::from_parts(image.to_rgba8(), 0, 0, delay))?;
        }
        drop(encoder);

        tracing::info!("Wrote {} frames to {}", frames.len(), output.display());
        Ok(output.to_path_buf())
    }
}
