use image::{imageops, DynamicImage};
use std::io::Cursor;

/// EXIF-driven orientation correction.
pub struct ImageOrientation;

impl ImageOrientation {
    /// Apply EXIF orientation correction to a decoded image.
    ///
    /// Only the three rotation-only codes are handled: tag 3 rotates 180°,
    /// tag 6 rotates 90° clockwise, tag 8 rotates 270° clockwise. Mirrored
    /// orientations and any missing or unreadable EXIF leave the image
    /// untouched; this step never fails the pipeline.
    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        let rotate = Self::rotation_for(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            "Applying EXIF orientation"
        );

        match rotate {
            Some(angle) => Self::rotate_by_angle(img, angle),
            None => img,
        }
    }

    /// Read the EXIF orientation tag (1-8) from raw container bytes.
    /// Returns 1 (normal) when the tag is missing or unreadable.
    pub fn read_exif_orientation(data: &[u8]) -> u32 {
        let mut cursor = Cursor::new(data);
        let parsed = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(parsed) => parsed,
            Err(_) => return 1,
        };

        parsed
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1)
    }

    /// Clockwise rotation angle for an orientation code; `None` for the
    /// normal, mirrored, and unknown codes.
    pub fn rotation_for(orientation: u32) -> Option<u16> {
        match orientation {
            3 => Some(180),
            6 => Some(90),
            8 => Some(270),
            _ => None,
        }
    }

    /// Rotate image by specified angle (90, 180, or 270 degrees clockwise)
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
            270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
            _ => img,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::bare_exif_jpeg;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn two_pixel_strip() -> DynamicImage {
        // Left pixel red, right pixel blue.
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_read_orientation_from_exif() {
        assert_eq!(
            ImageOrientation::read_exif_orientation(&bare_exif_jpeg(3)),
            3
        );
        assert_eq!(
            ImageOrientation::read_exif_orientation(&bare_exif_jpeg(6)),
            6
        );
        assert_eq!(
            ImageOrientation::read_exif_orientation(&bare_exif_jpeg(8)),
            8
        );
    }

    #[test]
    fn test_read_orientation_missing_defaults_to_normal() {
        assert_eq!(ImageOrientation::read_exif_orientation(b""), 1);
        assert_eq!(ImageOrientation::read_exif_orientation(b"not a jpeg"), 1);
    }

    #[test]
    fn test_rotation_only_codes() {
        assert_eq!(ImageOrientation::rotation_for(3), Some(180));
        assert_eq!(ImageOrientation::rotation_for(6), Some(90));
        assert_eq!(ImageOrientation::rotation_for(8), Some(270));
        // Normal and mirrored codes are left alone.
        for code in [0, 1, 2, 4, 5, 7, 9] {
            assert_eq!(ImageOrientation::rotation_for(code), None);
        }
    }

    #[test]
    fn test_tag_three_rotates_half_turn() {
        let img = two_pixel_strip();
        let oriented = ImageOrientation::apply_exif_orientation(img, &bare_exif_jpeg(3));

        assert_eq!(oriented.dimensions(), (2, 1));
        // 180° swaps the two pixels.
        assert_eq!(oriented.to_rgba8().get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(
            oriented.to_rgba8().get_pixel(1, 0),
            &Rgba([255, 0, 0, 255])
        );
    }

    #[test]
    fn test_tag_six_rotates_quarter_turn_clockwise() {
        let img = two_pixel_strip();
        let oriented = ImageOrientation::apply_exif_orientation(img, &bare_exif_jpeg(6));

        // 90° CW turns the horizontal strip vertical, red on top.
        assert_eq!(oriented.dimensions(), (1, 2));
        assert_eq!(
            oriented.to_rgba8().get_pixel(0, 0),
            &Rgba([255, 0, 0, 255])
        );
        assert_eq!(oriented.to_rgba8().get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_tag_eight_rotates_quarter_turn_counter_clockwise() {
        let img = two_pixel_strip();
        let oriented = ImageOrientation::apply_exif_orientation(img, &bare_exif_jpeg(8));

        // 270° CW turns the strip vertical the other way, blue on top.
        assert_eq!(oriented.dimensions(), (1, 2));
        assert_eq!(oriented.to_rgba8().get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(
            oriented.to_rgba8().get_pixel(0, 1),
            &Rgba([255, 0, 0, 255])
        );
    }

    #[test]
    fn test_normal_and_mirrored_tags_leave_pixels_unchanged() {
        for code in [1, 2, 4] {
            let img = two_pixel_strip();
            let oriented = ImageOrientation::apply_exif_orientation(img, &bare_exif_jpeg(code));
            assert_eq!(oriented.dimensions(), (2, 1));
            assert_eq!(
                oriented.to_rgba8().get_pixel(0, 0),
                &Rgba([255, 0, 0, 255])
            );
        }
    }

    #[test]
    fn test_absent_exif_leaves_image_unchanged() {
        let img = two_pixel_strip();
        let oriented = ImageOrientation::apply_exif_orientation(img.clone(), b"");
        assert_eq!(oriented.to_rgba8(), img.to_rgba8());
    }
}
