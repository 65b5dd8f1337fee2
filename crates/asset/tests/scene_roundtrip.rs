use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use asset::codec::RecordKind;
use asset::{LoadOptions, TextureError, TexturePool, load_scene_from_path, save_scene_to_path};
use corelib::{MATERIAL_NONE, RenderKernel, SceneInfo, SceneStore};
use tempfile::tempdir;

fn bmp24(width: i32, height: i32, bgr: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(54 + bgr.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&[0; 24]);
    out.extend_from_slice(bgr);
    out
}

fn tga32(width: u16, height: u16, bgra: &[u8]) -> Vec<u8> {
    let mut out = vec![0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.push(32);
    out.push(0);
    out.extend_from_slice(bgra);
    out
}

fn kernel() -> SceneStore {
    SceneStore::new().with_scene_info(SceneInfo {
        width: 320,
        height: 240,
        view_distance: 10_000.0,
        ..Default::default()
    })
}

/// (color, attributes, texture slot) of every material the primitives use.
fn material_tuples(kernel: &SceneStore) -> BTreeSet<String> {
    kernel
        .primitives()
        .filter_map(|p| kernel.material(p.material_id))
        .map(|m| format!("{} {} {}", m.color, m.attributes, m.texture_slot()))
        .collect()
}

fn texture_slots(kernel: &SceneStore) -> BTreeSet<i32> {
    kernel
        .primitives()
        .filter_map(|p| kernel.material(p.material_id))
        .filter(|m| m.has_texture())
        .map(|m| m.texture_slot())
        .collect()
}

#[test]
fn load_save_load_keeps_structure() -> Result<()> {
    let dir = tempdir()?;
    let wood = dir.path().join("wood.bmp");
    let sky = dir.path().join("sky.tga");
    std::fs::write(&wood, bmp24(2, 2, &[0; 12]))?;
    std::fs::write(&sky, tga32(1, 3, &[1; 12]))?;

    let scene = format!(
        "SCENEINFO;1;1;3;5;0;10000;0.5;0;0;0;0;1;0;0;0;10;0;0\n\
         TEXTURE;1;{wood}\n\
         TEXTURE;4;{sky}\n\
         MATERIAL;1;0;0;1;0;0;0;0;0.5;0;1;1;1;1;0;1;0;0;0;0;0;1;0\n\
         MATERIAL;0;0;1;1;0;0;0;0;0;0;1;1;1;1;0;0;1;0;0;0;0;4;0\n\
         MATERIAL;1;1;1;1;5;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;-1;0\n\
         MATERIAL;0;1;0;1;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;-1;0\n\
         PRIMITIVE;10;0;0;0;1;0;0;0;1;0;0;0;1;0;0;1;0;0;1;1;1;1;0;0;0;0;1;0;0;0;1;0\n\
         PRIMITIVE;0;0;2;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;1;1;1;1;0;0;0;0;0;0;0;0;0\n\
         PRIMITIVE;0;5;5;5;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;1;1;1;2;0;0;0;0;0;0;0;0;0\n\
         PRIMITIVE;0;-1;-1;-1;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;1;1;1;3;0;0;0;0;0;0;0;0;0\n",
        wood = wood.display(),
        sky = sky.display(),
    );
    let scene_path = dir.path().join("scene.txt");
    std::fs::write(&scene_path, scene)?;

    let mut first = kernel();
    let mut pool = TexturePool::new();
    let report = load_scene_from_path(&mut first, &mut pool, &scene_path, LoadOptions::default())?;
    assert_eq!(report.textures_loaded, 2);
    assert_eq!(report.materials, 4);
    assert_eq!(report.primitives, 4);
    assert_eq!(report.textures_downgraded, 0);
    assert_eq!((first.scene_info().width, first.scene_info().height), (320, 240));
    assert_eq!(first.scene_info().graphics_level, 3);

    let saved_path = dir.path().join("saved.txt");
    let saved = save_scene_to_path(&first, &pool, &saved_path)?;
    // material 2 is emissive, so its primitive is a light
    assert_eq!(saved.lights_skipped, 1);
    assert_eq!(saved.primitives, 3);
    assert_eq!(saved.materials, 3);
    assert_eq!(saved.textures, 2);

    let saved_text = std::fs::read_to_string(&saved_path)?;
    let kinds: Vec<RecordKind> = saved_text.lines().filter_map(RecordKind::detect).collect();
    let first_of = |kind| kinds.iter().position(|k| *k == kind);
    assert_eq!(first_of(RecordKind::SceneInfo), Some(0));
    assert!(first_of(RecordKind::Primitive) < first_of(RecordKind::Texture));
    assert!(first_of(RecordKind::Texture) < first_of(RecordKind::Material));

    let mut second = kernel();
    let mut second_pool = TexturePool::new();
    let reloaded = load_scene_from_path(
        &mut second,
        &mut second_pool,
        &saved_path,
        LoadOptions::default(),
    )?;
    assert_eq!(reloaded.primitives, saved.primitives);
    assert_eq!(reloaded.textures_loaded, 2);

    let mut resaved = kernel();
    let mut third_pool = TexturePool::new();
    let again_path = dir.path().join("again.txt");
    save_scene_to_path(&second, &second_pool, &again_path)?;
    load_scene_from_path(&mut resaved, &mut third_pool, &again_path, LoadOptions::default())?;

    assert_eq!(second.primitive_count(), resaved.primitive_count());
    assert_eq!(material_tuples(&second), material_tuples(&resaved));
    assert_eq!(texture_slots(&second), BTreeSet::from([1, 4]));
    assert_eq!(texture_slots(&second), texture_slots(&resaved));
    Ok(())
}

#[test]
fn atlas_offsets_track_mixed_loads() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("a.bmp");
    let b = dir.path().join("b.tga");
    let c = dir.path().join("c.bmp");
    std::fs::write(&a, bmp24(2, 1, &[0; 6]))?;
    std::fs::write(&b, tga32(2, 2, &[0; 16]))?;
    std::fs::write(&c, bmp24(3, 3, &[0; 27]))?;

    let mut pool = TexturePool::with_capacity(8);
    pool.load_from_file(5, &b)?;
    pool.load_from_file(2, &a)?;
    pool.load_from_file(7, &c)?;
    // replace with a bigger image
    pool.load_from_file(2, &c)?;

    let mut expected = 0;
    for i in 0..pool.capacity() {
        assert_eq!(pool.offset(i), Some(expected), "slot {i}");
        expected += pool.slot(i).map_or(0, |s| s.byte_size());
    }
    assert_eq!(pool.offset(5), Some(27));
    assert_eq!(pool.offset(7), Some(43));
    assert_eq!(pool.atlas_bytes().len(), 70);
    Ok(())
}

#[test]
fn bad_magic_keeps_previous_buffer() -> Result<()> {
    let dir = tempdir()?;
    let good = dir.path().join("good.bmp");
    let bad = dir.path().join("bad.bmp");
    std::fs::write(&good, bmp24(1, 1, &[1, 2, 3]))?;
    let mut bad_bytes = bmp24(4, 4, &[0; 48]);
    bad_bytes[..2].copy_from_slice(b"MB");
    std::fs::write(&bad, bad_bytes)?;

    let mut pool = TexturePool::new();
    pool.load_bitmap(0, &good)?;
    let err = pool.load_bitmap(0, &bad).unwrap_err();
    assert!(matches!(err, TextureError::BadMagic { found: 0x424D, .. }));
    assert_eq!(pool.buffer(0), Some(&[3u8, 2, 1][..]));
    assert_eq!(pool.source_path(0), Some(good.as_path()));
    Ok(())
}

#[test]
fn unreadable_texture_leaves_material_untextured() -> Result<()> {
    let dir = tempdir()?;
    let scene_path = dir.path().join("scene.txt");
    std::fs::write(
        &scene_path,
        "TEXTURE;0;does/not/exist.bmp\n\
         MATERIAL;1;1;1;1;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0;0\n\
         PRIMITIVE;0;0;0;0;0;1;0;0;0;0;0;0;0;0;0;0;0;0;0;1;1;1;0;0;0;0;0;0;0;0;0;0\n",
    )?;

    let mut k = kernel();
    let mut pool = TexturePool::new();
    let report = load_scene_from_path(&mut k, &mut pool, &scene_path, LoadOptions::default())?;
    assert_eq!(report.textures_failed, 1);
    assert_eq!(report.textures_downgraded, 1);
    assert_eq!(report.primitives, 1);
    assert_eq!(k.material(0).map(|m| m.texture_slot()), Some(MATERIAL_NONE));
    assert!(!Path::new("does/not/exist.bmp").exists());
    Ok(())
}
