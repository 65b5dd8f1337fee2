//! JPEG decoding is delegated to an external codec behind [`JpegDecoder`].

use std::path::Path;

use image::{ImageFormat, ImageReader};

use crate::texture::DecodedImage;

/// A pure decode function: file in, pixels out, `None` on any failure.
pub trait JpegDecoder {
    fn decompress(&self, path: &Path, requested_channels: u32) -> Option<DecodedImage>;
}

/// Default decoder backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageJpegDecoder;

impl JpegDecoder for ImageJpegDecoder {
    fn decompress(&self, path: &Path, requested_channels: u32) -> Option<DecodedImage> {
        let mut reader = ImageReader::open(path)
            .inspect_err(|e| log::debug!("Failed to open image {:?}: {}", path, e))
            .ok()?;
        reader.set_format(ImageFormat::Jpeg);
        let img = reader
            .decode()
            .inspect_err(|e| log::debug!("Failed to decode JPEG {:?}: {}", path, e))
            .ok()?;

        let (width, height, channels, data) = match requested_channels {
            1 => {
                let luma = img.to_luma8();
                let (w, h) = luma.dimensions();
                (w, h, 1, luma.into_raw())
            }
            4 => {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                (w, h, 4, rgba.into_raw())
            }
            _ => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                (w, h, 3, rgb.into_raw())
            }
        };
        log::debug!("Decoded JPEG {}x{} with {} bytes", width, height, data.len());
        Some(DecodedImage::new(width, height, channels, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        assert!(
            ImageJpegDecoder
                .decompress(Path::new("/nonexistent/photo.jpg"), 3)
                .is_none()
        );
    }

    #[test]
    fn non_jpeg_bytes_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(ImageJpegDecoder.decompress(&path, 3).is_none());
    }
}
