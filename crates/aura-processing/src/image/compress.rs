use crate::error::ProcessingResult;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

/// Size-capped JPEG derivative encoding.
pub struct ImageCompressor;

impl ImageCompressor {
    /// Produce the compressed JPEG derivative of a decoded image.
    ///
    /// The image is shrunk (aspect-preserving) only when a dimension exceeds
    /// the cap; it is never upscaled. Output is always JPEG at the given
    /// quality.
    pub fn compress(
        img: &DynamicImage,
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> ProcessingResult<Bytes> {
        let (width, height) = img.dimensions();

        let resized = if width > max_width || height > max_height {
            img.thumbnail(max_width, max_height)
        } else {
            img.clone()
        };

        // JPEG cannot carry an alpha channel.
        let rgb = resized.to_rgb8();

        let estimated_size = (rgb.width() * rgb.height() * 3) as usize;
        let mut buffer = Vec::with_capacity(estimated_size);
        let mut cursor = Cursor::new(&mut buffer);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        rgb.write_with_encoder(encoder)?;

        Ok(Bytes::from(buffer))
    }
}
