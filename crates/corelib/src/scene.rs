//! Scene records exchanged between the scene file codec and the kernel.
//!
//! These are plain value types with no identity of their own. The loader
//! builds them from text and hands them to a [`RenderKernel`](crate::kernel::RenderKernel);
//! the saver reads them back out of the kernel.

use crate::{IVec2, IVec4, Vec3, Vec4, ivec4};

/// Reserved id meaning "no material" or "no texture".
pub const MATERIAL_NONE: i32 = -1;

/// Geometric primitive type as stored in the scene file.
///
/// Codes outside the known set are kept verbatim in [`PrimitiveKind::Other`]
/// so a load/save pass never loses them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    #[default]
    Sphere,
    Cylinder,
    Checkboard,
    Camera,
    XyPlane,
    YzPlane,
    XzPlane,
    MagicCarpet,
    Environment,
    Ellipsoid,
    Triangle,
    Other(i32),
}

impl PrimitiveKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Sphere => 0,
            Self::Cylinder => 1,
            Self::Checkboard => 2,
            Self::Camera => 3,
            Self::XyPlane => 4,
            Self::YzPlane => 5,
            Self::XzPlane => 6,
            Self::MagicCarpet => 7,
            Self::Environment => 8,
            Self::Ellipsoid => 9,
            Self::Triangle => 10,
            Self::Other(code) => code,
        }
    }
}

impl From<i32> for PrimitiveKind {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Sphere,
            1 => Self::Cylinder,
            2 => Self::Checkboard,
            3 => Self::Camera,
            4 => Self::XyPlane,
            5 => Self::YzPlane,
            6 => Self::XzPlane,
            7 => Self::MagicCarpet,
            8 => Self::Environment,
            9 => Self::Ellipsoid,
            10 => Self::Triangle,
            other => Self::Other(other),
        }
    }
}

/// Global render settings (`SCENEINFO` line).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneInfo {
    pub width: i32,
    pub height: i32,
    pub graphics_level: i32,
    pub ray_iterations: i32,
    pub transparent_color: f32,
    pub view_distance: f32,
    pub shadow_intensity: f32,
    pub width_3d_vision: f32,
    pub background_color: Vec4,
    pub rendering_type: i32,
    pub render_boxes: i32,
    pub path_tracing_iteration: i32,
    pub max_path_tracing_iterations: i32,
    pub misc: IVec2,
}

/// One geometric primitive (`PRIMITIVE` line).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PrimitiveRecord {
    pub kind: PrimitiveKind,
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    pub n0: Vec3,
    pub n1: Vec3,
    pub n2: Vec3,
    pub size: Vec3,
    pub material_id: i32,
    pub vt0: Vec3,
    pub vt1: Vec3,
    pub vt2: Vec3,
}

impl PrimitiveRecord {
    #[inline]
    pub fn control_points(&self) -> [Vec3; 3] {
        [self.p0, self.p1, self.p2]
    }

    /// Translate all control points by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        self.p0 += offset;
        self.p1 += offset;
        self.p2 += offset;
    }
}

/// Surface description (`MATERIAL` line).
///
/// `texture_mapping.z` is the texture slot, or [`MATERIAL_NONE`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialRecord {
    pub color: Vec4,
    pub inner_illumination: Vec4,
    pub reflection: f32,
    pub refraction: f32,
    pub specular: Vec4,
    pub attributes: IVec4,
    pub transparency: f32,
    pub texture_mapping: IVec4,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            color: Vec4::ZERO,
            inner_illumination: Vec4::ZERO,
            reflection: 0.0,
            refraction: 0.0,
            specular: Vec4::ZERO,
            attributes: IVec4::ZERO,
            transparency: 0.0,
            texture_mapping: ivec4(0, 0, MATERIAL_NONE, 0),
        }
    }
}

impl MaterialRecord {
    #[inline]
    pub fn texture_slot(&self) -> i32 {
        self.texture_mapping.z
    }

    #[inline]
    pub fn has_texture(&self) -> bool {
        self.texture_mapping.z != MATERIAL_NONE
    }

    /// Emissive materials turn their primitives into lights.
    #[inline]
    pub fn is_light(&self) -> bool {
        self.inner_illumination.x != 0.0
    }
}

/// Texture reference (`TEXTURE` line): load `path` into atlas slot `slot`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRecord {
    pub slot: i32,
    pub path: String,
}

impl Default for TextureRecord {
    fn default() -> Self {
        Self {
            slot: MATERIAL_NONE,
            path: String::new(),
        }
    }
}
