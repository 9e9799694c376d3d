use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Placeholder emitted when an image cannot be decoded: a uniform gray tile,
/// so clients always receive a renderable data URL.
pub static BLUR_FALLBACK: LazyLock<String> = LazyLock::new(|| {
    let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([128, 128, 128])));
    encode_data_url(&gray, 5).expect("encoding a solid 5x5 tile cannot fail")
});

/// Tiny-thumbnail blur placeholders, emitted as `data:image/jpeg;base64,` URLs.
///
/// Downscaling to a handful of pixels and letting the client stretch the
/// result back up is what produces the blur; no blur kernel is applied here.
pub struct BlurPlaceholder;

impl BlurPlaceholder {
    /// Generate a placeholder from raw encoded bytes.
    ///
    /// Never fails: undecodable input yields the gray fallback tile.
    pub fn generate(data: &Bytes, edge: u32) -> String {
        match image::load_from_memory(data) {
            Ok(img) => Self::from_image(&img, edge),
            Err(e) => {
                tracing::warn!(error = %e, "Blur placeholder fell back: image decode failed");
                BLUR_FALLBACK.clone()
            }
        }
    }

    /// Generate a placeholder from an already-decoded image.
    pub fn from_image(img: &DynamicImage, edge: u32) -> String {
        match encode_data_url(img, edge) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Blur placeholder fell back: encode failed");
                BLUR_FALLBACK.clone()
            }
        }
    }
}

fn encode_data_url(img: &DynamicImage, edge: u32) -> Result<String, image::ImageError> {
    // Exact NxN output regardless of the source aspect ratio.
    let tiny = img.resize_exact(edge, edge, FilterType::Triangle);
    let rgb = tiny.to_rgb8();

    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let encoder = JpegEncoder::new(&mut cursor);
    rgb.write_with_encoder(encoder)?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(&buffer)
    ))
}
