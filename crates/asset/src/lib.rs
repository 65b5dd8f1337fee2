//! Scene file codec and texture atlas loading.
//!
//! - `codec`: positional `;`-separated record schemas.
//! - `scene`: load/save passes against a [`corelib::RenderKernel`].
//! - `texture`: fixed slot pool with BMP, TGA and JPEG decoding.

pub mod bmp;
pub mod bounds;
pub mod codec;
pub mod jpeg;
pub mod scene;
pub mod texture;
pub mod tga;

pub use bounds::Bounds;
pub use scene::{
    LoadOptions, LoadReport, SaveReport, load_scene_from_path, load_scene_from_reader,
    load_scene_from_str, save_scene_to_path, save_scene_to_string, save_scene_to_writer,
};
pub use texture::{DecodedImage, MAX_TEXTURES, TextureError, TexturePool, TextureSlot};
