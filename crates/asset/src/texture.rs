//! Texture slot pool backing the shared texture atlas.
//!
//! The pool is a fixed number of indexed slots. Each slot owns the pixel
//! buffer of one decoded image; all slots together address one logically
//! contiguous atlas in index order. Every slot records its byte offset into
//! that atlas, and the offsets are recomputed after every successful load.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::jpeg::{ImageJpegDecoder, JpegDecoder};
use crate::{bmp, tga};

/// Number of slots in the atlas pool.
pub const MAX_TEXTURES: usize = 32;

/// Channel count requested from the JPEG decoder.
pub const JPEG_CHANNELS: u32 = 3;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to load {}, wrong bitmap id {found:#06x}", .path.display())]
    BadMagic { path: PathBuf, found: u16 },
    #[error("Failed to load {}: {reason}", .path.display())]
    InvalidHeader { path: PathBuf, reason: String },
    #[error("Failed to load {}: header declares {expected} bytes, only {available} present", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        available: usize,
    },
    #[error("Failed to decode {}", .path.display())]
    Decode { path: PathBuf },
    #[error("Unsupported texture format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Texture slot {slot} out of range (pool has {capacity} slots)")]
    SlotOutOfRange { slot: usize, capacity: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Pixel data produced by a decoder, before it is placed in a slot.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Size in bytes implied by the dimensions, `None` if it overflows.
    pub fn byte_size(&self) -> Option<usize> {
        pixel_bytes(self.width, self.height, self.channels)
    }

    /// Check that the buffer matches the dimensions and is not empty.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.byte_size() == Some(self.data.len())
    }
}

/// `width * height * channels` in bytes, `None` on overflow.
pub(crate) fn pixel_bytes(width: u32, height: u32, channels: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels as usize)
}

/// One atlas slot. Empty slots have no pixels and zero size.
#[derive(Clone, Debug, Default)]
pub struct TextureSlot {
    pub pixels: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub atlas_offset: usize,
    pub source_path: Option<PathBuf>,
}

impl TextureSlot {
    pub fn is_loaded(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn byte_size(&self) -> usize {
        self.pixels.as_ref().map_or(0, Vec::len)
    }
}

/// Image formats the pool can load, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Bitmap,
    Tga,
    Jpeg,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bmp" => Some(Self::Bitmap),
            "tga" => Some(Self::Tga),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Fixed-capacity pool of texture slots.
///
/// Load failures are returned to the caller and not logged here.
pub struct TexturePool {
    slots: Vec<TextureSlot>,
    jpeg: Box<dyn JpegDecoder>,
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TexturePool {
    pub fn new() -> Self {
        Self::with_capacity(MAX_TEXTURES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![TextureSlot::default(); capacity],
            jpeg: Box::new(ImageJpegDecoder),
        }
    }

    /// Replace the external JPEG decoder.
    pub fn with_jpeg_decoder(mut self, decoder: impl JpegDecoder + 'static) -> Self {
        self.jpeg = Box::new(decoder);
        self
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&TextureSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[TextureSlot] {
        &self.slots
    }

    /// Read-only view of a slot's pixels.
    pub fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index)?.pixels.as_deref()
    }

    pub fn offset(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|s| s.atlas_offset)
    }

    pub fn source_path(&self, index: usize) -> Option<&Path> {
        self.slots.get(index)?.source_path.as_deref()
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(TextureSlot::is_loaded)
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_loaded()).count()
    }

    /// Total atlas size in bytes.
    pub fn total_size(&self) -> usize {
        self.slots.iter().map(TextureSlot::byte_size).sum()
    }

    /// Concatenate all slot buffers in index order.
    pub fn atlas_bytes(&self) -> Vec<u8> {
        let mut atlas = Vec::with_capacity(self.total_size());
        for slot in &self.slots {
            if let Some(pixels) = &slot.pixels {
                atlas.extend_from_slice(pixels);
            }
        }
        atlas
    }

    /// Load an uncompressed bitmap into `index`.
    pub fn load_bitmap(&mut self, index: usize, path: impl AsRef<Path>) -> TextureResult<()> {
        let path = path.as_ref();
        self.check_slot(index)?;
        let image = bmp::decode_file(path)?;
        self.install(index, image, path);
        Ok(())
    }

    /// Load an uncompressed TGA into `index`.
    pub fn load_tga(&mut self, index: usize, path: impl AsRef<Path>) -> TextureResult<()> {
        let path = path.as_ref();
        self.check_slot(index)?;
        let image = tga::decode_file(path)?;
        self.install(index, image, path);
        Ok(())
    }

    /// Load a JPEG into `index` through the external decoder.
    pub fn load_jpeg(&mut self, index: usize, path: impl AsRef<Path>) -> TextureResult<()> {
        let path = path.as_ref();
        self.check_slot(index)?;
        let image = self
            .jpeg
            .decompress(path, JPEG_CHANNELS)
            .filter(DecodedImage::is_valid)
            .ok_or_else(|| TextureError::Decode {
                path: path.to_path_buf(),
            })?;
        self.install(index, image, path);
        Ok(())
    }

    /// Load `path` into `index`, picking the decoder from the file extension.
    pub fn load_from_file(&mut self, index: usize, path: impl AsRef<Path>) -> TextureResult<()> {
        let path = path.as_ref();
        match ImageKind::from_path(path) {
            Some(ImageKind::Bitmap) => self.load_bitmap(index, path),
            Some(ImageKind::Tga) => self.load_tga(index, path),
            Some(ImageKind::Jpeg) => self.load_jpeg(index, path),
            None => Err(TextureError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Release the buffer in `index`. Returns whether anything was freed.
    pub fn clear_slot(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let was_loaded = slot.is_loaded();
        *slot = TextureSlot::default();
        self.recompute_offsets();
        was_loaded
    }

    /// Set every slot's atlas offset to the byte size of all slots before it.
    pub fn recompute_offsets(&mut self) {
        let mut total = 0;
        for slot in &mut self.slots {
            slot.atlas_offset = total;
            total += slot.byte_size();
        }
    }

    fn check_slot(&self, index: usize) -> TextureResult<()> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(TextureError::SlotOutOfRange {
                slot: index,
                capacity: self.slots.len(),
            })
        }
    }

    fn install(&mut self, index: usize, image: DecodedImage, path: &Path) {
        let slot = &mut self.slots[index];
        if slot.is_loaded() {
            log::info!("Replacing existing texture {}", index);
        }
        *slot = TextureSlot {
            pixels: Some(image.data),
            width: image.width,
            height: image.height,
            bytes_per_pixel: image.channels,
            atlas_offset: 0,
            source_path: Some(path.to_path_buf()),
        };
        self.recompute_offsets();

        log::info!(
            "Slot {}: Successfully loaded texture {} ({},{},{})",
            index,
            path.display(),
            image.width,
            image.height,
            image.channels
        );
    }
}
