//! Rendering kernel interface plus a small in-memory implementation.

use std::ops::Range;

use crate::scene::{MaterialRecord, PrimitiveRecord, SceneInfo};
use crate::{CoreError, CoreResult};

/// Default primitive capacity of [`SceneStore`].
pub const MAX_PRIMITIVES: usize = 1 << 20;
/// Default material capacity of [`SceneStore`].
pub const MAX_MATERIALS: usize = 1 << 16;

/// Primitive id (dense, index into the primitive array).
pub type PrimitiveId = usize;

/// What the scene loader and saver need from the renderer that owns the scene.
pub trait RenderKernel {
    fn scene_info(&self) -> SceneInfo;
    fn set_scene_info(&mut self, info: SceneInfo);

    /// Register a primitive and return its id.
    fn add_primitive(&mut self, primitive: PrimitiveRecord) -> CoreResult<PrimitiveId>;
    fn primitive_count(&self) -> usize;
    fn primitive(&self, id: PrimitiveId) -> Option<&PrimitiveRecord>;

    /// Store a material under `id`, replacing whatever was there.
    fn set_material(&mut self, id: usize, material: MaterialRecord) -> CoreResult<()>;
    fn material(&self, id: i32) -> Option<&MaterialRecord>;

    /// Multiply control points and sizes of every primitive in `range` by `ratio`.
    fn scale_primitives(&mut self, ratio: f32, range: Range<PrimitiveId>) -> CoreResult<()>;
}

/// Dense in-memory scene: primitives in insertion order, materials by id.
///
/// Material slots that were never set stay `None`.
#[derive(Debug)]
pub struct SceneStore {
    info: SceneInfo,
    primitives: Vec<PrimitiveRecord>,
    materials: Vec<Option<MaterialRecord>>,
    max_primitives: usize,
    max_materials: usize,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::with_capacity(MAX_PRIMITIVES, MAX_MATERIALS)
    }
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_primitives: usize, max_materials: usize) -> Self {
        Self {
            info: SceneInfo::default(),
            primitives: Vec::new(),
            materials: Vec::new(),
            max_primitives,
            max_materials,
        }
    }

    pub fn with_scene_info(mut self, info: SceneInfo) -> Self {
        self.info = info;
        self
    }

    /// Number of material ids that hold a material.
    pub fn material_count(&self) -> usize {
        self.materials.iter().filter(|m| m.is_some()).count()
    }

    /// Iterate over all primitives in id order.
    pub fn primitives(&self) -> impl Iterator<Item = &PrimitiveRecord> {
        self.primitives.iter()
    }

    /// Drop all primitives and materials; scene info is kept.
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.materials.clear();
    }
}

impl RenderKernel for SceneStore {
    fn scene_info(&self) -> SceneInfo {
        self.info
    }

    fn set_scene_info(&mut self, info: SceneInfo) {
        self.info = info;
    }

    fn add_primitive(&mut self, primitive: PrimitiveRecord) -> CoreResult<PrimitiveId> {
        if self.primitives.len() >= self.max_primitives {
            return Err(CoreError::PrimitiveCapacity(self.max_primitives));
        }
        let id = self.primitives.len();
        self.primitives.push(primitive);
        Ok(id)
    }

    #[inline]
    fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    fn primitive(&self, id: PrimitiveId) -> Option<&PrimitiveRecord> {
        self.primitives.get(id)
    }

    fn set_material(&mut self, id: usize, material: MaterialRecord) -> CoreResult<()> {
        if id >= self.max_materials {
            return Err(CoreError::MaterialCapacity {
                id,
                capacity: self.max_materials,
            });
        }
        if id >= self.materials.len() {
            // grow in powers of two, like the primitive array would
            let new_len = (id + 1).next_power_of_two().max(8).min(self.max_materials);
            self.materials.resize(new_len, None);
        }
        self.materials[id] = Some(material);
        Ok(())
    }

    #[inline]
    fn material(&self, id: i32) -> Option<&MaterialRecord> {
        let idx = usize::try_from(id).ok()?;
        self.materials.get(idx).and_then(Option::as_ref)
    }

    fn scale_primitives(&mut self, ratio: f32, range: Range<PrimitiveId>) -> CoreResult<()> {
        if !ratio.is_finite() {
            return Err(CoreError::InvalidScale(ratio));
        }
        let end = range.end.min(self.primitives.len());
        let start = range.start.min(end);
        for p in &mut self.primitives[start..end] {
            p.p0 *= ratio;
            p.p1 *= ratio;
            p.p2 *= ratio;
            p.size *= ratio;
        }
        log::debug!("Scaled primitives {}..{} by {}", start, end, ratio);
        Ok(())
    }
}
