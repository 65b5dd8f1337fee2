//! Entry point for rayscene: load a scene file, report it, optionally save it back.

use anyhow::Result;
use asset::{LoadOptions, TexturePool, load_scene_from_path, save_scene_to_path};
use corelib::{RenderKernel, SceneInfo, SceneStore, Vec3, vec3};

const DEFAULT_VIEW_DISTANCE: f32 = 10_000.0;

fn arg_value(name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    std::env::args().find_map(|arg| arg.strip_prefix(&prefix).map(str::to_owned))
}

fn parse_size_args() -> (i32, i32) {
    let mut w: Option<i32> = None;
    let mut h: Option<i32> = None;

    for arg in std::env::args() {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<i32>(), sh.parse::<i32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<i32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<i32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

fn parse_f32_arg(name: &str, default: f32) -> f32 {
    match arg_value(name) {
        Some(v) => v.parse::<f32>().unwrap_or_else(|_| {
            log::warn!("Invalid --{}='{}', using {}", name, v, default);
            default
        }),
        None => default,
    }
}

fn parse_center_arg() -> Vec3 {
    // --center=x,y,z
    let Some(v) = arg_value("center") else {
        return Vec3::ZERO;
    };
    let parts: Vec<f32> = v.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    match parts.as_slice() {
        [x, y, z] => vec3(*x, *y, *z),
        _ => {
            log::warn!("Invalid --center='{}', expected x,y,z", v);
            Vec3::ZERO
        }
    }
}

fn parse_texture_args() -> Vec<(usize, String)> {
    // --texture=SLOT:PATH, repeatable
    std::env::args()
        .filter_map(|arg| {
            let v = arg.strip_prefix("--texture=")?.to_owned();
            let parsed = v
                .split_once(':')
                .and_then(|(slot, path)| Some((slot.parse::<usize>().ok()?, path.to_owned())));
            if parsed.is_none() {
                log::warn!("Invalid --texture='{}', expected SLOT:PATH", v);
            }
            parsed
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(scene_path) = arg_value("scene") else {
        log::error!(
            "Usage: rayscene --scene=PATH [--save=PATH] [--center=X,Y,Z] [--scale=F] \
             [--size=WxH] [--view-distance=F] [--texture=SLOT:PATH]..."
        );
        std::process::exit(2);
    };
    let save_path = arg_value("save");
    let (width, height) = parse_size_args();
    let options = LoadOptions {
        center: parse_center_arg(),
        desired_height: parse_f32_arg("scale", 1.0),
    };
    let view_distance = parse_f32_arg("view-distance", DEFAULT_VIEW_DISTANCE);
    log::info!(
        "Starting rayscene. scene={}, size={}x{}, center={}, scale={}",
        scene_path,
        width,
        height,
        options.center,
        options.desired_height
    );

    let mut kernel = SceneStore::new().with_scene_info(SceneInfo {
        width,
        height,
        view_distance,
        ..Default::default()
    });
    let mut pool = TexturePool::new();

    for (slot, path) in parse_texture_args() {
        if let Err(e) = pool.load_from_file(slot, &path) {
            log::error!("Failed to preload texture {} into slot {}: {}", path, slot, e);
        }
    }

    let report = load_scene_from_path(&mut kernel, &mut pool, &scene_path, options)?;
    log::info!(
        "Loaded {} primitives, {} materials, {} textures ({} failed, {} downgraded)",
        report.primitives,
        report.materials,
        report.textures_loaded,
        report.textures_failed,
        report.textures_downgraded
    );
    match report.scale_ratio {
        Some(ratio) => log::info!("Extent {} scaled by {}", report.extent, ratio),
        None => log::info!("Extent {} (not scaled)", report.extent),
    }
    log::info!(
        "Atlas: {} of {} slots loaded, {} bytes",
        pool.loaded_count(),
        pool.capacity(),
        pool.total_size()
    );
    log::info!("Kernel holds {} primitives", kernel.primitive_count());

    if let Some(out) = save_path {
        let saved = save_scene_to_path(&kernel, &pool, &out)?;
        log::info!(
            "Saved {} primitives ({} lights skipped), {} materials, {} textures to {}",
            saved.primitives,
            saved.lights_skipped,
            saved.materials,
            saved.textures,
            out
        );
    }

    log::info!("Done.");
    Ok(())
}
