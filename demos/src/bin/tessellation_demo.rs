//! Tessellation Demo
//!
//! Builds one of the demo scenes for a number of frames, flushes each frame
//! into a statistics sink and logs what a GPU backend would have received.

use clap::{Parser, ValueEnum};

use redlilium_demos::scenes;
use redlilium_tessellator::math::perspective_rh;
use redlilium_tessellator::{
    BatchStats, RenderContext, RenderMode, RendererCaps, TessConfig, TessResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum Scene {
    /// Rectangles, ellipses, arcs, caps and joins.
    #[default]
    Shapes,
    /// Bezier and Catmull-Rom polygons with holes and textures.
    Curves,
    /// Boxes, spheres and strips in 3D.
    Solids,
    /// One huge triangle fan split across index caches.
    Stress,
}

/// Drive the RedLilium tessellator without a GPU.
#[derive(Parser, Debug)]
#[command(name = "tessellation_demo", version)]
struct Args {
    /// Scene to build.
    #[arg(long, value_enum, default_value = "shapes")]
    scene: Scene,

    /// Number of frames to build and flush.
    #[arg(long, default_value = "3")]
    frames: usize,

    /// Sort polygon triangles back to front (3D scenes).
    #[arg(long)]
    depth_sort: bool,

    /// Tessellate once into a retained shape instead of every frame.
    #[arg(long)]
    retained: bool,

    /// Emulate a backend without line and point shaders.
    #[arg(long)]
    no_shader_strokes: bool,

    /// Vertices of the stress fan.
    #[arg(long, default_value = "100000")]
    fan_vertices: usize,
}

fn build(ctx: &mut RenderContext, args: &Args, frame: usize) -> TessResult<()> {
    match args.scene {
        Scene::Shapes => scenes::shapes_2d(ctx),
        Scene::Curves => scenes::curves_and_holes(ctx),
        Scene::Solids => scenes::solids_3d(ctx, frame),
        Scene::Stress => scenes::stress_fan(ctx, args.fan_vertices),
    }
}

fn run(args: &Args) -> TessResult<BatchStats> {
    let caps = RendererCaps::default()
        .with_shader_lines(!args.no_shader_strokes)
        .with_shader_points(!args.no_shader_strokes);
    let mode = if args.retained {
        RenderMode::Retained
    } else {
        RenderMode::Immediate
    };
    let config = TessConfig::new()
        .with_3d(args.scene == Scene::Solids)
        .with_render_mode(mode)
        .with_caps(caps);

    let mut ctx = RenderContext::new(config);
    ctx.set_projection(&perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0));
    ctx.hint_depth_sort(args.depth_sort);
    let mut stats = BatchStats::default();

    if args.retained {
        build(&mut ctx, args, 0)?;
        let shape = ctx.take_retained();
        for _ in 0..args.frames {
            shape.draw(ctx.layouts(), &mut stats);
        }
        return Ok(stats);
    }

    for frame in 0..args.frames {
        build(&mut ctx, args, frame)?;
        ctx.flush(&mut stats);
    }
    Ok(stats)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting RedLilium Tessellation Demo: {:?}", args.scene);
    log::info!("Core version: {}", redlilium_core::VERSION);
    log::info!("Tessellator version: {}", redlilium_tessellator::VERSION);
    redlilium_tessellator::init();

    match run(&args) {
        Ok(stats) => {
            log::info!(
                "{} frames: {} vertices ({} bytes), {} indices, {} draw calls ({} textured), {} depth sorted",
                stats.frames,
                stats.vertices,
                stats.vertex_bytes,
                stats.indices,
                stats.draw_calls,
                stats.textured_calls,
                stats.sorted_frames
            );
        }
        Err(e) => {
            log::error!("Tessellation failed: {}", e);
            std::process::exit(1);
        }
    }
}
