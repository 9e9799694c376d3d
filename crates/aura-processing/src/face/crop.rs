use aura_core::config::FaceSettings;
use aura_core::models::{BoundingBox, FaceDetection};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

use crate::error::{ProcessingError, ProcessingResult};

/// A padded face crop, JPEG-encoded, tagged with the index of the detection
/// it was cut from. Indices are positions in the provider's detection list
/// and survive the frontal filter, so they stay stable identifiers for the
/// photo's faces.
#[derive(Clone, Debug)]
pub struct FaceCrop {
    pub index: usize,
    pub jpeg: Bytes,
}

pub struct FaceCropper;

impl FaceCropper {
    /// Whether a detection passes the frontal filter: yaw and pitch within
    /// their thresholds (inclusive) and box width/height strictly above the
    /// ratio threshold. Profile shots and heavily tilted heads make poor
    /// index entries, so they are dropped here.
    pub fn is_frontal(detection: &FaceDetection, settings: &FaceSettings) -> bool {
        let bbox = &detection.bounding_box;
        if bbox.height <= 0.0 {
            return false;
        }
        let ratio = bbox.width / bbox.height;

        detection.pose.yaw.abs() <= settings.yaw_threshold
            && detection.pose.pitch.abs() <= settings.pitch_threshold
            && ratio > settings.ratio_threshold
    }

    /// Pixel rectangle `(x, y, width, height)` for a normalized bounding box
    /// with padding applied on every side, clamped to the image bounds.
    ///
    /// `padding` is a fraction of the box size; half of it is added on each
    /// side. Returns `None` when clamping leaves an empty rectangle.
    pub fn padded_region(
        (img_width, img_height): (u32, u32),
        bbox: &BoundingBox,
        padding: f32,
    ) -> Option<(u32, u32, u32, u32)> {
        let pad_w = bbox.width * padding / 2.0;
        let pad_h = bbox.height * padding / 2.0;

        let left = ((bbox.left - pad_w) * img_width as f32) as i64;
        let top = ((bbox.top - pad_h) * img_height as f32) as i64;
        let right = ((bbox.left + bbox.width + pad_w) * img_width as f32) as i64;
        let bottom = ((bbox.top + bbox.height + pad_h) * img_height as f32) as i64;

        let left = left.clamp(0, i64::from(img_width));
        let right = right.clamp(0, i64::from(img_width));
        let top = top.clamp(0, i64::from(img_height));
        let bottom = bottom.clamp(0, i64::from(img_height));

        if right <= left || bottom <= top {
            return None;
        }

        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    /// Cut padded JPEG crops for every frontal detection.
    ///
    /// Non-frontal detections are skipped but their indices are not reused:
    /// each crop keeps the index of its detection in the input slice.
    pub fn crop_frontal_faces(
        img: &DynamicImage,
        detections: &[FaceDetection],
        settings: &FaceSettings,
    ) -> Vec<FaceCrop> {
        let dimensions = img.dimensions();
        let mut crops = Vec::new();

        for (index, detection) in detections.iter().enumerate() {
            if !Self::is_frontal(detection, settings) {
                continue;
            }

            let Some((x, y, width, height)) =
                Self::padded_region(dimensions, &detection.bounding_box, settings.crop_padding)
            else {
                tracing::warn!(index, "Skipping face with a degenerate bounding box");
                continue;
            };

            let crop = img.crop_imm(x, y, width, height);
            match encode_jpeg(&crop) {
                Ok(jpeg) => crops.push(FaceCrop { index, jpeg }),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping face crop that failed to encode");
                }
            }
        }

        crops
    }
}

/// Decode the original and cut frontal crops on the blocking pool.
///
/// `detections` is consumed in provider order; each crop keeps the index of
/// the detection it came from.
pub async fn extract_face_crops(
    data: Bytes,
    detections: Vec<FaceDetection>,
    settings: FaceSettings,
) -> ProcessingResult<Vec<FaceCrop>> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&data)?;
        Ok(FaceCropper::crop_frontal_faces(&img, &detections, &settings))
    })
    .await
    .map_err(|e| ProcessingError::TaskJoin(e.to_string()))?
}

fn encode_jpeg(img: &DynamicImage) -> Result<Bytes, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    rgb.write_with_encoder(JpegEncoder::new(&mut cursor))?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::models::HeadPose;
    use image::{Rgba, RgbaImage};

    fn detection(bbox: BoundingBox, yaw: f32, pitch: f32) -> FaceDetection {
        FaceDetection {
            bounding_box: bbox,
            pose: HeadPose { yaw, pitch },
            confidence: Some(99.0),
        }
    }

    fn wide_box() -> BoundingBox {
        BoundingBox {
            left: 0.2,
            top: 0.2,
            width: 0.4,
            height: 0.4,
        }
    }

    #[test]
    fn test_padded_region_clamps_to_image() {
        let bbox = BoundingBox {
            left: 0.4,
            top: 0.2,
            width: 0.2,
            height: 0.4,
        };
        let region = FaceCropper::padded_region((1000, 500), &bbox, 1.2);
        assert_eq!(region, Some((280, 0, 440, 420)));
    }

    #[test]
    fn test_padded_region_without_padding() {
        let bbox = BoundingBox {
            left: 0.4,
            top: 0.2,
            width: 0.2,
            height: 0.4,
        };
        let region = FaceCropper::padded_region((1000, 500), &bbox, 0.0);
        assert_eq!(region, Some((400, 100, 200, 200)));
    }

    #[test]
    fn test_padded_region_rejects_empty_box() {
        let bbox = BoundingBox {
            left: 0.5,
            top: 0.5,
            width: 0.0,
            height: 0.0,
        };
        assert_eq!(FaceCropper::padded_region((1000, 500), &bbox, 1.2), None);
    }

    #[test]
    fn test_frontal_yaw_boundary_is_inclusive() {
        let settings = FaceSettings::default();
        assert!(FaceCropper::is_frontal(
            &detection(wide_box(), 30.0, 0.0),
            &settings
        ));
        assert!(!FaceCropper::is_frontal(
            &detection(wide_box(), 30.5, 0.0),
            &settings
        ));
        assert!(FaceCropper::is_frontal(
            &detection(wide_box(), -30.0, 0.0),
            &settings
        ));
    }

    #[test]
    fn test_frontal_pitch_boundary_is_inclusive() {
        let settings = FaceSettings::default();
        assert!(FaceCropper::is_frontal(
            &detection(wide_box(), 0.0, -30.0),
            &settings
        ));
        assert!(!FaceCropper::is_frontal(
            &detection(wide_box(), 0.0, 31.0),
            &settings
        ));
    }

    #[test]
    fn test_frontal_ratio_is_strict() {
        let settings = FaceSettings::default();
        let narrow = BoundingBox {
            left: 0.1,
            top: 0.1,
            width: 0.6,
            height: 1.0,
        };
        assert!(!FaceCropper::is_frontal(&detection(narrow, 0.0, 0.0), &settings));

        let wider = BoundingBox {
            left: 0.1,
            top: 0.1,
            width: 0.7,
            height: 1.0,
        };
        assert!(FaceCropper::is_frontal(&detection(wider, 0.0, 0.0), &settings));
    }

    #[test]
    fn test_frontal_rejects_zero_height() {
        let settings = FaceSettings::default();
        let flat = BoundingBox {
            left: 0.1,
            top: 0.1,
            width: 0.4,
            height: 0.0,
        };
        assert!(!FaceCropper::is_frontal(&detection(flat, 0.0, 0.0), &settings));
    }

    #[test]
    fn test_crops_keep_detection_indices() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            100,
            100,
            Rgba([90, 90, 90, 255]),
        ));
        let settings = FaceSettings::default();

        let detections = vec![
            detection(wide_box(), 80.0, 0.0), // profile shot, filtered out
            detection(wide_box(), 0.0, 0.0),
        ];

        let crops = FaceCropper::crop_frontal_faces(&img, &detections, &settings);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].index, 1);

        let decoded = image::load_from_memory(&crops[0].jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (84, 84));
    }

    #[test]
    fn test_no_frontal_faces_yields_no_crops() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            50,
            50,
            Rgba([90, 90, 90, 255]),
        ));
        let settings = FaceSettings::default();
        let detections = vec![detection(wide_box(), 45.0, 45.0)];
        assert!(FaceCropper::crop_frontal_faces(&img, &detections, &settings).is_empty());
    }

    #[tokio::test]
    async fn test_extract_face_crops_decodes_off_thread() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            100,
            100,
            Rgba([90, 90, 90, 255]),
        ));
        let mut png = Vec::new();
        img.write_to(
            &mut Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .unwrap();

        let crops = extract_face_crops(
            Bytes::from(png),
            vec![detection(wide_box(), 0.0, 0.0)],
            FaceSettings::default(),
        )
        .await
        .unwrap();

        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].index, 0);
    }

    #[tokio::test]
    async fn test_extract_face_crops_rejects_undecodable_bytes() {
        let result = extract_face_crops(
            Bytes::from_static(b"not an image"),
            vec![detection(wide_box(), 0.0, 0.0)],
            FaceSettings::default(),
        )
        .await;

        assert!(matches!(result, Err(ProcessingError::Image(_))));
    }
}
