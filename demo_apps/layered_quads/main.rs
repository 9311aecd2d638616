//! Layered Quads
//!
//! Rasterizes a stack of overlapping translucent rectangles, submitted far to
//! near, gathers them into the OIT buckets and writes the composite to a PNG.
//!
//! ```text
//! cargo run -p layered_quads -- [settings.json] [output.png]
//! ```

use anyhow::Context;
use strata::glam::{Vec3, Vec4};
use strata::prelude::*;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;

/// World-space z of the opaque floor band, in the middle of the quad stack.
const FLOOR_Z: f32 = 0.0;

struct Quad {
    min: (u32, u32),
    max: (u32, u32),
    /// World-space z of the quad plane, facing the camera.
    z: f32,
    /// Window-space depth of the plane.
    depth: f32,
    color: Vec4,
}

fn camera() -> Camera {
    let mut camera = Camera::new_perspective(45.0, WIDTH as f32 / HEIGHT as f32, 0.1, 100.0);
    camera.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    camera
}

fn window_depth(camera: &Camera, z: f32) -> f32 {
    camera
        .view_projection_matrix()
        .project_point3(Vec3::new(0.0, 0.0, z))
        .z
}

/// Quads from nearest (index 0) to farthest, one plane every 0.2 units.
fn quads(camera: &Camera) -> Vec<Quad> {
    let palette = [
        Vec4::new(0.95, 0.25, 0.2, 0.55),
        Vec4::new(0.2, 0.8, 0.35, 0.5),
        Vec4::new(0.25, 0.4, 0.95, 0.5),
        Vec4::new(0.95, 0.85, 0.2, 0.45),
        Vec4::new(0.7, 0.3, 0.9, 0.4),
        Vec4::new(0.2, 0.85, 0.85, 0.4),
        Vec4::new(1.0, 0.55, 0.1, 0.35),
        Vec4::new(0.9, 0.9, 0.9, 0.3),
        Vec4::new(0.5, 0.2, 0.2, 0.3),
        Vec4::new(0.1, 0.5, 0.6, 0.3),
    ];

    palette
        .iter()
        .enumerate()
        .map(|(i, &color)| {
            let z = 1.0 - i as f32 * 0.2;
            let i = i as u32;
            Quad {
                min: (40 + i * 36, 30 + i * 20),
                max: (300 + i * 30, 220 + i * 14),
                z,
                depth: window_depth(camera, z),
                color,
            }
        })
        .collect()
}

/// World bounds of the quad planes, used to derive the frame's depth range.
fn bounds(quads: &[Quad]) -> Option<BoundingBox> {
    BoundingBox::from_points(quads.iter().flat_map(|quad| {
        [Vec3::new(-1.0, -1.0, quad.z), Vec3::new(1.0, 1.0, quad.z)]
    }))
}

fn rasterize(quad: &Quad) -> impl Iterator<Item = Fragment> + '_ {
    let color = PremultipliedColor::from_straight(quad.color.x, quad.color.y, quad.color.z, quad.color.w);
    (quad.min.1..quad.max.1.min(HEIGHT)).flat_map(move |y| {
        (quad.min.0..quad.max.0.min(WIDTH)).map(move |x| Fragment::new(x, y, quad.depth, color))
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = match args.iter().find(|arg| arg.ends_with(".json")) {
        Some(path) => OitSettings::from_json_file(path)
            .with_context(|| format!("failed to load OIT settings from {path}"))?,
        None => OitSettings::default(),
    };
    let output_path = args
        .iter()
        .find(|arg| !arg.ends_with(".json"))
        .cloned()
        .unwrap_or_else(|| "layered_quads.png".to_string());

    let camera = camera();
    let quads = quads(&camera);

    let mut oit = OitRenderer::new(settings)?;
    oit.create(WIDTH, HEIGHT)?;

    // Opaque pass: a plain backdrop with a floor band cutting through the
    // quad stack. Quads behind the band are hidden where it covers them.
    let floor_depth = window_depth(&camera, FLOOR_Z);
    if let Some(scene) = oit.scene_targets_mut() {
        scene.clear(PremultipliedColor::new(0.08, 0.08, 0.1, 1.0));
        for y in (HEIGHT - 60)..HEIGHT {
            for x in 0..WIDTH {
                scene.color.set(x, y, PremultipliedColor::new(0.25, 0.22, 0.2, 1.0));
                scene.depth.set(x, y, floor_depth);
            }
        }
    }

    let bounds = bounds(&quads).context("no quads to render")?;
    let frame = oit.set_screen_space_bounding_box(&bounds, &camera);
    log::info!("Transparent depth range [{:.4}, {:.4}]", frame.min_depth, frame.max_depth);

    // Quads are submitted back to front on purpose; the result must not care.
    let fragments: Vec<Fragment> = quads.iter().rev().flat_map(rasterize).collect();

    let stats = {
        let stage = oit.gather_begin()?;
        stage.draw(&fragments);
        stage.end()
    };
    log::info!(
        "Gathered {} fragments: {} stored, {} merged, {} discarded",
        stats.submitted,
        stats.stored,
        stats.merged,
        stats.discarded
    );

    let mut output = ColorBuffer::new(WIDTH, HEIGHT, PremultipliedColor::TRANSPARENT)?;
    oit.render_to_screen(&mut output)?;

    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, output.to_rgba8())
        .context("output buffer does not match image dimensions")?;
    image
        .save(&output_path)
        .with_context(|| format!("failed to write {output_path}"))?;

    log::info!("Wrote {output_path}");
    Ok(())
}
