use serde_json::{Map, Value};
use std::io::Cursor;

/// EXIF attribute extraction for the photo metadata column.
pub struct ExifMetadata;

impl ExifMetadata {
    /// Read all primary-image EXIF fields into a string attribute map.
    ///
    /// Thumbnail (IFD1) duplicates are skipped. Input without a parseable
    /// EXIF segment yields an empty map; metadata is never load-bearing.
    pub fn attribute_map(data: &[u8]) -> Map<String, Value> {
        let mut attributes = Map::new();

        let mut cursor = Cursor::new(data);
        let parsed = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "No EXIF metadata extracted");
                return attributes;
            }
        };

        for field in parsed.fields() {
            if field.ifd_num != exif::In::PRIMARY {
                continue;
            }
            let rendered = field.display_value().to_string();
            attributes.insert(
                field.tag.to_string(),
                Value::String(rendered.trim_matches('"').to_string()),
            );
        }

        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::bare_exif_jpeg;

    #[test]
    fn test_attribute_map_extracts_orientation() {
        let data = bare_exif_jpeg(6);
        let map = ExifMetadata::attribute_map(&data);
        assert!(map.contains_key("Orientation"));
    }

    #[test]
    fn test_attribute_map_values_are_strings() {
        let data = bare_exif_jpeg(1);
        let map = ExifMetadata::attribute_map(&data);
        assert!(map.values().all(|v| v.is_string()));
    }

    #[test]
    fn test_attribute_map_empty_without_exif() {
        let map = ExifMetadata::attribute_map(b"garbage bytes");
        assert!(map.is_empty());
    }
}
