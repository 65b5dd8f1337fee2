//! Scene file load and save passes.
//!
//! Loading reads lines in order and applies each record to the kernel as soon
//! as it is decoded. Nothing is transactional: a malformed line still applies
//! whatever it managed to fill in, and a bad record never stops the pass.
//!
//! Saving walks the kernel, drops light primitives, renumbers the materials the
//! remaining primitives use, and writes scene info, primitives, textures and
//! materials in that order.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use corelib::{
    MATERIAL_NONE, MaterialRecord, PrimitiveRecord, RenderKernel, SceneInfo, TextureRecord, Vec3,
};

use crate::bounds::Bounds;
use crate::codec::{Record, RecordKind, decode_line, encode_line};
use crate::texture::TexturePool;

/// Value forced into `innerIllumination.y` of every loaded material.
pub const FORCED_ILLUMINATION_Y: f32 = 40000.0;
/// `innerIllumination.z` of every loaded material is this times the view distance.
pub const ILLUMINATION_RANGE_FACTOR: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadOptions {
    /// Added to every primitive control point read from the file.
    pub center: Vec3,
    /// Target Y extent of the loaded geometry.
    pub desired_height: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            desired_height: 1.0,
        }
    }
}

/// What a load pass did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Absolute per-axis size of the loaded geometry, before scaling.
    pub extent: Vec3,
    /// Ratio applied to all primitives, if scaling happened.
    pub scale_ratio: Option<f32>,
    pub scene_info: usize,
    pub primitives: usize,
    pub materials: usize,
    pub textures_loaded: usize,
    pub textures_failed: usize,
    /// Materials whose texture slot had no buffer and fell back to no texture.
    pub textures_downgraded: usize,
    pub kernel_errors: usize,
}

impl LoadReport {
    pub fn records(&self) -> usize {
        self.scene_info
            + self.primitives
            + self.materials
            + self.textures_loaded
            + self.textures_failed
    }
}

/// State of one load pass: the kernel and pool being filled, the running
/// bounds, and the id the next `MATERIAL` line will receive.
pub struct LoadPass<'a, K: RenderKernel + ?Sized> {
    kernel: &'a mut K,
    pool: &'a mut TexturePool,
    options: LoadOptions,
    bounds: Bounds,
    next_material_id: usize,
    report: LoadReport,
}

impl<'a, K: RenderKernel + ?Sized> LoadPass<'a, K> {
    pub fn new(kernel: &'a mut K, pool: &'a mut TexturePool, options: LoadOptions) -> Self {
        let bounds = Bounds::new(kernel.scene_info().view_distance);
        Self {
            kernel,
            pool,
            options,
            bounds,
            next_material_id: 0,
            report: LoadReport::default(),
        }
    }

    /// Decode one line and apply it. Lines with no known keyword are ignored.
    pub fn apply_line(&mut self, line: &str) {
        let Some(kind) = RecordKind::detect(line) else {
            return;
        };
        match decode_line(line, kind) {
            Record::SceneInfo(info) => self.apply_scene_info(info),
            Record::Primitive(primitive) => self.apply_primitive(primitive),
            Record::Material(material) => {
                let id = self.next_material_id;
                self.next_material_id += 1;
                self.apply_material(id, material);
            }
            Record::Texture(texture) => self.apply_texture(texture),
        }
    }

    /// The kernel keeps its own output size; everything else is replaced.
    pub fn apply_scene_info(&mut self, mut info: SceneInfo) {
        let current = self.kernel.scene_info();
        info.width = current.width;
        info.height = current.height;
        self.kernel.set_scene_info(info);
        self.report.scene_info += 1;
    }

    pub fn apply_primitive(&mut self, mut primitive: PrimitiveRecord) {
        primitive.translate(self.options.center);
        self.bounds.include_primitive(&primitive);
        match self.kernel.add_primitive(primitive) {
            Ok(_) => self.report.primitives += 1,
            Err(e) => {
                log::error!("Failed to add primitive: {e}");
                self.report.kernel_errors += 1;
            }
        }
    }

    pub fn apply_material(&mut self, id: usize, mut material: MaterialRecord) {
        material.inner_illumination.y = FORCED_ILLUMINATION_Y;
        material.inner_illumination.z =
            ILLUMINATION_RANGE_FACTOR * self.kernel.scene_info().view_distance;

        let slot = material.texture_slot();
        if slot != MATERIAL_NONE {
            let loaded = usize::try_from(slot).is_ok_and(|s| self.pool.is_loaded(s));
            if loaded {
                log::info!("Texture {} assigned to material {}", slot, id);
            } else {
                log::error!(
                    "Texture {} could not be loaded. Default color will be used for material {}",
                    slot,
                    id
                );
                material.texture_mapping.z = MATERIAL_NONE;
                self.report.textures_downgraded += 1;
            }
        }

        match self.kernel.set_material(id, material) {
            Ok(()) => {
                self.report.materials += 1;
                log::debug!(
                    "Added material [{}] color={} specular={} texture={}",
                    id,
                    material.color,
                    material.specular,
                    material.texture_slot()
                );
            }
            Err(e) => {
                log::error!("Failed to set material {id}: {e}");
                self.report.kernel_errors += 1;
            }
        }
    }

    pub fn apply_texture(&mut self, texture: TextureRecord) {
        if texture.slot == MATERIAL_NONE {
            return;
        }
        log::info!("Loading texture {} into slot {}", texture.path, texture.slot);
        let result = match usize::try_from(texture.slot) {
            Ok(slot) => self.pool.load_from_file(slot, &texture.path).map_err(|e| e.to_string()),
            Err(_) => Err(format!("invalid slot {}", texture.slot)),
        };
        match result {
            Ok(()) => self.report.textures_loaded += 1,
            Err(e) => {
                log::error!(
                    "Failed to load texture {} into slot {}: {}",
                    texture.path,
                    texture.slot,
                    e
                );
                self.report.textures_failed += 1;
            }
        }
    }

    /// Report the extent and scale the geometry to the desired height.
    pub fn finish(mut self) -> LoadReport {
        let extent = self.bounds.extent();
        self.report.extent = extent;

        if self.report.primitives > 0 {
            match self.bounds.scale_ratio(self.options.desired_height) {
                Some(ratio) => {
                    let count = self.kernel.primitive_count();
                    match self.kernel.scale_primitives(ratio, 0..count) {
                        Ok(()) => self.report.scale_ratio = Some(ratio),
                        Err(e) => log::error!("Failed to scale primitives: {e}"),
                    }
                }
                None => log::warn!("Loaded geometry has no height, scaling skipped"),
            }
        }

        log::info!("Object size: {}, {}, {}", extent.x, extent.y, extent.z);
        self.report
    }
}

/// Load a scene file. A missing file loads nothing and is not an error.
pub fn load_scene_from_path<K: RenderKernel + ?Sized>(
    kernel: &mut K,
    pool: &mut TexturePool,
    path: impl AsRef<Path>,
    options: LoadOptions,
) -> Result<LoadReport> {
    let path = path.as_ref();
    log::info!("Loading 3D scene from {}", path.display());
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Scene file {} not found, nothing loaded", path.display());
            return Ok(LoadReport::default());
        }
        Err(e) => {
            log::error!("Failed to open scene file {}: {}", path.display(), e);
            return Err(e)
                .with_context(|| format!("Failed to open scene file: {}", path.display()));
        }
    };
    load_scene_from_reader(kernel, pool, BufReader::new(file), options)
}

/// Load a scene from a [`BufRead`] implementation.
pub fn load_scene_from_reader<K: RenderKernel + ?Sized, R: BufRead>(
    kernel: &mut K,
    pool: &mut TexturePool,
    reader: R,
    options: LoadOptions,
) -> Result<LoadReport> {
    let mut pass = LoadPass::new(kernel, pool, options);
    for (line_no, line) in reader.split(b'\n').enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        pass.apply_line(&String::from_utf8_lossy(&line));
    }
    Ok(pass.finish())
}

/// Convenience helper to load a scene from a string.
pub fn load_scene_from_str<K: RenderKernel + ?Sized>(
    kernel: &mut K,
    pool: &mut TexturePool,
    contents: &str,
    options: LoadOptions,
) -> Result<LoadReport> {
    load_scene_from_reader(kernel, pool, io::Cursor::new(contents), options)
}

/// Dense renumbering of material ids, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct MaterialIndex {
    order: Vec<i32>,
    index: HashMap<i32, usize>,
}

impl MaterialIndex {
    pub fn build<'p>(primitives: impl IntoIterator<Item = &'p PrimitiveRecord>) -> Self {
        let mut this = Self::default();
        for p in primitives {
            if !this.index.contains_key(&p.material_id) {
                this.index.insert(p.material_id, this.order.len());
                this.order.push(p.material_id);
            }
        }
        this
    }

    /// Compact index of a kernel material id.
    pub fn get(&self, material_id: i32) -> Option<usize> {
        self.index.get(&material_id).copied()
    }

    /// Kernel material ids, in compact index order.
    pub fn ids(&self) -> &[i32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// What a save pass wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub primitives: usize,
    pub lights_skipped: usize,
    pub materials: usize,
    pub textures: usize,
}

/// Save the kernel's scene to `path`, replacing the file.
pub fn save_scene_to_path<K: RenderKernel + ?Sized>(
    kernel: &K,
    pool: &TexturePool,
    path: impl AsRef<Path>,
) -> Result<SaveReport> {
    let path = path.as_ref();
    log::info!("Saving 3D scene to {}", path.display());
    let file = File::create(path)
        .with_context(|| format!("Failed to create scene file: {}", path.display()))?;
    save_scene_to_writer(kernel, pool, BufWriter::new(file))
}

/// Save the kernel's scene to a string.
pub fn save_scene_to_string<K: RenderKernel + ?Sized>(
    kernel: &K,
    pool: &TexturePool,
) -> Result<String> {
    let mut buf = Vec::new();
    save_scene_to_writer(kernel, pool, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Save the kernel's scene to any writer.
pub fn save_scene_to_writer<K: RenderKernel + ?Sized, W: Write>(
    kernel: &K,
    pool: &TexturePool,
    mut writer: W,
) -> Result<SaveReport> {
    let mut report = SaveReport::default();
    let mut emit = |record: Record| -> Result<()> {
        writer
            .write_all(encode_line(&record).as_bytes())
            .context("Failed to write scene line")
    };

    emit(Record::SceneInfo(kernel.scene_info()))?;

    let primitive_count = kernel.primitive_count();
    log::info!("{} primitives", primitive_count);
    let mut geometry = Vec::with_capacity(primitive_count);
    for id in 0..primitive_count {
        let Some(primitive) = kernel.primitive(id) else {
            continue;
        };
        if kernel
            .material(primitive.material_id)
            .is_some_and(MaterialRecord::is_light)
        {
            report.lights_skipped += 1;
            continue;
        }
        geometry.push(*primitive);
    }

    let index = MaterialIndex::build(&geometry);
    for primitive in &geometry {
        let mut out = *primitive;
        out.material_id = index
            .get(primitive.material_id)
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(MATERIAL_NONE);
        emit(Record::Primitive(out))?;
        report.primitives += 1;
    }

    let mut materials: Vec<MaterialRecord> = index
        .ids()
        .iter()
        .map(|&id| match kernel.material(id) {
            Some(material) => *material,
            None => {
                log::warn!("Primitive references unknown material {id}, writing a blank one");
                MaterialRecord::default()
            }
        })
        .collect();

    // A slot without a source file cannot be reloaded, so its materials go untextured.
    let mut slots: BTreeMap<i32, String> = BTreeMap::new();
    for material in materials.iter_mut().filter(|m| m.has_texture()) {
        let slot = material.texture_slot();
        if slots.contains_key(&slot) {
            continue;
        }
        let path = usize::try_from(slot)
            .ok()
            .and_then(|s| pool.source_path(s))
            .map(|p| p.display().to_string());
        match path {
            Some(path) => {
                slots.insert(slot, path);
            }
            None => {
                log::warn!(
                    "Texture slot {} has no source file, saving material untextured",
                    slot
                );
                material.texture_mapping.z = MATERIAL_NONE;
            }
        }
    }
    for (slot, path) in slots {
        emit(Record::Texture(TextureRecord { slot, path }))?;
        report.textures += 1;
    }

    log::info!("{} materials", materials.len());
    for material in materials {
        emit(Record::Material(material))?;
        report.materials += 1;
    }

    drop(emit);
    writer.flush().context("Failed to flush scene file")?;
    Ok(report)
}
