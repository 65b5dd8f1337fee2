//! Uncompressed bitmap decoder.
//!
//! Reads the 14-byte file header and 40-byte info header, then takes
//! `width * height * bitCount / 8` bytes from the declared pixel offset.
//! Rows are assumed tightly packed. Pixels come out with red and blue swapped
//! back into RGB order.

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::texture::{DecodedImage, TextureError, TextureResult, pixel_bytes};

/// `BM` read as a little-endian u16.
pub const BITMAP_MAGIC: u16 = 0x4D42;

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BitmapFileHeader {
    pub bf_type: u16,
    pub bf_size: u32,
    pub bf_reserved1: u16,
    pub bf_reserved2: u16,
    pub bf_off_bits: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BitmapInfoHeader {
    pub bi_size: u32,
    pub bi_width: i32,
    pub bi_height: i32,
    pub bi_planes: u16,
    pub bi_bit_count: u16,
    pub bi_compression: u32,
    pub bi_size_image: u32,
    pub bi_x_pels_per_meter: i32,
    pub bi_y_pels_per_meter: i32,
    pub bi_clr_used: u32,
    pub bi_clr_important: u32,
}

const FILE_HEADER_LEN: usize = size_of::<BitmapFileHeader>();
const INFO_HEADER_LEN: usize = size_of::<BitmapInfoHeader>();

/// Read and decode a bitmap file.
pub fn decode_file(path: &Path) -> TextureResult<DecodedImage> {
    let bytes = std::fs::read(path).map_err(|source| TextureError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes, path)
}

/// Decode bitmap bytes; `path` is only used for error reporting.
pub fn decode(bytes: &[u8], path: &Path) -> TextureResult<DecodedImage> {
    let truncated = |expected: usize| TextureError::Truncated {
        path: path.to_path_buf(),
        expected,
        available: bytes.len(),
    };
    let invalid = |reason: String| TextureError::InvalidHeader {
        path: path.to_path_buf(),
        reason,
    };

    let file_header: BitmapFileHeader = bytes
        .get(..FILE_HEADER_LEN)
        .map(bytemuck::pod_read_unaligned)
        .ok_or_else(|| truncated(FILE_HEADER_LEN))?;

    let magic = u16::from_le(file_header.bf_type);
    if magic != BITMAP_MAGIC {
        return Err(TextureError::BadMagic {
            path: path.to_path_buf(),
            found: magic,
        });
    }

    let info: BitmapInfoHeader = bytes
        .get(FILE_HEADER_LEN..FILE_HEADER_LEN + INFO_HEADER_LEN)
        .map(bytemuck::pod_read_unaligned)
        .ok_or_else(|| truncated(FILE_HEADER_LEN + INFO_HEADER_LEN))?;

    let width = i32::from_le(info.bi_width);
    let height = i32::from_le(info.bi_height);
    let bit_count = u16::from_le(info.bi_bit_count);
    let data_offset = u32::from_le(file_header.bf_off_bits) as usize;

    log::debug!(
        "{}: biSize={} biWidth={} biHeight={} biPlanes={} biBitCount={} biCompression={} biSizeImage={}",
        path.display(),
        u32::from_le(info.bi_size),
        width,
        height,
        u16::from_le(info.bi_planes),
        bit_count,
        u32::from_le(info.bi_compression),
        u32::from_le(info.bi_size_image),
    );

    if width <= 0 || height == 0 {
        return Err(invalid(format!("invalid dimensions {width}x{height}")));
    }
    let channels = u32::from(bit_count / 8);
    if channels == 0 {
        return Err(invalid(format!("unsupported bit depth {bit_count}")));
    }

    // Negative height marks a top-down bitmap; the byte count is the same.
    let width = width.unsigned_abs();
    let height = height.unsigned_abs();
    let size = pixel_bytes(width, height, channels)
        .ok_or_else(|| invalid(format!("image size overflows ({width}x{height})")))?;

    let end = data_offset
        .checked_add(size)
        .ok_or_else(|| invalid(format!("pixel offset {data_offset} overflows")))?;
    let pixels = bytes.get(data_offset..end).ok_or_else(|| truncated(end))?;

    let mut data = pixels.to_vec();
    swap_red_blue(&mut data, 3);
    Ok(DecodedImage::new(width, height, channels, data))
}

/// Swap the first and third byte of every `stride`-byte pixel (BGR <-> RGB).
pub(crate) fn swap_red_blue(data: &mut [u8], stride: usize) {
    for px in data.chunks_exact_mut(stride) {
        px.swap(0, 2);
    }
}

/// Build a minimal 24-bit bitmap around `bgr` pixel bytes.
#[cfg(test)]
pub(crate) fn encode_bmp24(width: i32, height: i32, bgr: &[u8]) -> Vec<u8> {
    let off = (FILE_HEADER_LEN + INFO_HEADER_LEN) as u32;
    let file_header = BitmapFileHeader {
        bf_type: BITMAP_MAGIC.to_le(),
        bf_size: (off + bgr.len() as u32).to_le(),
        bf_reserved1: 0,
        bf_reserved2: 0,
        bf_off_bits: off.to_le(),
    };
    let info = BitmapInfoHeader {
        bi_size: (INFO_HEADER_LEN as u32).to_le(),
        bi_width: width.to_le(),
        bi_height: height.to_le(),
        bi_planes: 1u16.to_le(),
        bi_bit_count: 24u16.to_le(),
        ..Zeroable::zeroed()
    };
    let mut out = Vec::new();
    out.extend_from_slice(bytemuck::bytes_of(&file_header));
    out.extend_from_slice(bytemuck::bytes_of(&info));
    out.extend_from_slice(bgr);
    out
}
