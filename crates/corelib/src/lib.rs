//! Core shared types: math re-exports, scene records, kernel interface, errors.

pub use glam::{IVec2, IVec4, Vec3, Vec4, ivec2, ivec4, vec3, vec4};
use thiserror::Error;

pub mod kernel;
pub mod scene;

pub use kernel::{RenderKernel, SceneStore};
pub use scene::{
    MATERIAL_NONE, MaterialRecord, PrimitiveKind, PrimitiveRecord, SceneInfo, TextureRecord,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Primitive capacity exceeded ({0} max)")]
    PrimitiveCapacity(usize),
    #[error("Material id {id} exceeds capacity {capacity}")]
    MaterialCapacity { id: usize, capacity: usize },
    #[error("Invalid scale ratio: {0}")]
    InvalidScale(f32),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_readable_messages() {
        let e = CoreError::MaterialCapacity { id: 9, capacity: 4 };
        assert_eq!(e.to_string(), "Material id 9 exceeds capacity 4");
    }

    #[test]
    fn store_round_trips_scene_info() {
        let mut store = SceneStore::new();
        let info = SceneInfo {
            width: 640,
            height: 480,
            view_distance: 5000.0,
            background_color: vec4(0.1, 0.2, 0.3, 1.0),
            ..Default::default()
        };
        store.set_scene_info(info);
        assert_eq!(store.scene_info(), info);
    }
}
