//! Hand-built image fixtures shared by the tests in this crate.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// A minimal APP1 segment (`Exif\0\0` + little-endian TIFF) carrying a single
/// orientation field.
pub(crate) fn app1_exif_segment(orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes()); // offset of the 0th IFD
    tiff.extend_from_slice(&1u16.to_le_bytes()); // one field
    tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes()); // count
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]); // value padding
    tiff.extend_from_slice(&0u32.to_le_bytes()); // no next IFD

    let mut app1 = Vec::new();
    app1.extend_from_slice(&[0xFF, 0xE1]);
    app1.extend_from_slice(&((tiff.len() as u16 + 8).to_be_bytes()));
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);
    app1
}

/// Bytes that parse as EXIF-bearing JPEG but carry no scan data. Enough for
/// the metadata readers; not decodable as pixels.
pub(crate) fn bare_exif_jpeg(orientation: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&app1_exif_segment(orientation));
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// A decodable JPEG of `img` with the given EXIF orientation spliced in
/// after the SOI marker.
pub(crate) fn jpeg_with_orientation(img: &DynamicImage, orientation: u16) -> Vec<u8> {
    // The JPEG encoder rejects alpha channels.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut plain = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut plain), ImageFormat::Jpeg)
        .unwrap();

    let mut out = Vec::with_capacity(plain.len() + 40);
    out.extend_from_slice(&plain[..2]);
    out.extend_from_slice(&app1_exif_segment(orientation));
    out.extend_from_slice(&plain[2..]);
    out
}

/// PNG-encode an image for tests that need valid container bytes.
pub(crate) fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}
