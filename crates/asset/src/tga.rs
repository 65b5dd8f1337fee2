//! Raw TGA decoder (uncompressed true-colour).

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::bmp::swap_red_blue;
use crate::texture::{DecodedImage, TextureError, TextureResult, pixel_bytes};

/// The 18-byte TGA header.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct TgaHeader {
    pub id_length: u8,
    pub color_map_type: u8,
    pub image_type: u8,
    pub color_map_origin: u16,
    pub color_map_length: u16,
    pub color_map_depth: u8,
    pub x_origin: u16,
    pub y_origin: u16,
    pub width: u16,
    pub height: u16,
    pub bit_count: u8,
    pub descriptor: u8,
}

const HEADER_LEN: usize = size_of::<TgaHeader>();

/// Uncompressed RGB.
pub const TYPE_TRUE_COLOR: u8 = 2;
/// Uncompressed greyscale.
pub const TYPE_GREYSCALE: u8 = 3;

/// Read and decode a TGA file.
pub fn decode_file(path: &Path) -> TextureResult<DecodedImage> {
    let bytes = std::fs::read(path).map_err(|source| TextureError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes, path)
}

/// Decode TGA bytes. Pixel data is read straight after the header; the image
/// type is reported but not enforced.
pub fn decode(bytes: &[u8], path: &Path) -> TextureResult<DecodedImage> {
    let truncated = |expected: usize| TextureError::Truncated {
        path: path.to_path_buf(),
        expected,
        available: bytes.len(),
    };

    let header: TgaHeader = bytes
        .get(..HEADER_LEN)
        .map(bytemuck::pod_read_unaligned)
        .ok_or_else(|| truncated(HEADER_LEN))?;

    let image_type = header.image_type;
    if image_type != TYPE_TRUE_COLOR && image_type != TYPE_GREYSCALE {
        log::warn!(
            "{}: TGA image type {} is not uncompressed, reading as raw",
            path.display(),
            image_type
        );
    }

    let width = u32::from(u16::from_le(header.width));
    let height = u32::from(u16::from_le(header.height));
    let bit_count = header.bit_count;
    // 3 = BGR, 4 = BGRA
    let color_mode = u32::from(bit_count / 8);

    if width == 0 || height == 0 {
        return Err(TextureError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("invalid dimensions {width}x{height}"),
        });
    }
    if !(3..=4).contains(&color_mode) {
        return Err(TextureError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("unsupported bit depth {bit_count}"),
        });
    }

    let end = pixel_bytes(width, height, color_mode)
        .and_then(|size| size.checked_add(HEADER_LEN))
        .ok_or_else(|| TextureError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("image size overflows ({width}x{height})"),
        })?;
    let pixels = bytes.get(HEADER_LEN..end).ok_or_else(|| truncated(end))?;

    let mut data = pixels.to_vec();
    swap_red_blue(&mut data, color_mode as usize);
    Ok(DecodedImage::new(width, height, color_mode, data))
}
