//! Render a single frame to a file, no server involved.
//!
//! Useful for eyeballing scene changes and for benchmarking one render in
//! isolation. The pose is given either as sphere coordinates (`--u`/`--v`)
//! or defaults to a point on the orbit sphere.

use clap::{Parser, ValueEnum};
use scenecast::engine::{Channels, RenderBackend, SoftwareTracer, World};
use scenecast::image_output::{encode_rgb, OutputFormat};
use scenecast::pose::{pose_on_sphere, DEFAULT_ORBIT_RADIUS};
use scenecast::scene::{Scene, SceneConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Render one frame of the demo scene to disk
#[derive(Parser, Debug)]
#[command(name = "render_frame", version, about)]
struct Args {
  /// Output file
  #[arg(long, short, default_value = "frame.png")]
  out: PathBuf,

  /// First sphere coordinate in [0, 1)
  #[arg(long, default_value_t = 0.25)]
  u: f32,

  /// Second sphere coordinate in [0, 1)
  #[arg(long, default_value_t = 0.5)]
  v: f32,

  /// Orbit radius
  #[arg(long, default_value_t = DEFAULT_ORBIT_RADIUS)]
  radius: f32,

  /// Frame width in pixels
  #[arg(long, default_value_t = 512)]
  width: u32,

  /// Frame height in pixels
  #[arg(long, default_value_t = 512)]
  height: u32,

  /// Samples per pixel
  #[arg(long, default_value_t = 4)]
  spp: u32,

  /// Image container
  #[arg(long, value_enum, default_value_t = FormatArg::Png)]
  format: FormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
  Png,
  Jpeg,
}

fn main() {
  env_logger::init();
  let args = Args::parse();

  let backend: Arc<dyn RenderBackend> = match SoftwareTracer::initialize() {
    Ok(tracer) => Arc::new(tracer),
    Err(err) => {
      eprintln!("backend init failed: {}", err);
      std::process::exit(1);
    }
  };
  let world = Arc::new(World::demo());
  let config = SceneConfig::new()
    .with_size(args.width, args.height)
    .with_samples_per_pixel(args.spp);
  let mut scene = match Scene::build(0, &config, world, backend) {
    Ok(scene) => scene,
    Err(err) => {
      eprintln!("scene construction failed: {}", err);
      std::process::exit(1);
    }
  };

  let pose = pose_on_sphere(args.u, args.v, args.radius);
  scene.camera.set_position(pose.eye);
  scene.camera.set_up(pose.up);
  scene.camera.set_direction(pose.direction);
  scene.camera.commit();
  scene.framebuffer.clear(Channels::COLOR);

  let start = Instant::now();
  let variance = match scene.render(Channels::COLOR) {
    Ok(variance) => variance,
    Err(err) => {
      eprintln!("render failed: {}", err);
      std::process::exit(1);
    }
  };
  let elapsed = start.elapsed();

  let format = match args.format {
    FormatArg::Png => OutputFormat::Png,
    FormatArg::Jpeg => OutputFormat::Jpeg(90),
  };
  let pixels = scene.framebuffer.read_pixels(Channels::COLOR);
  let encoded = match encode_rgb(pixels, args.width, args.height, format) {
    Ok(encoded) => encoded,
    Err(err) => {
      eprintln!("encode failed: {}", err);
      std::process::exit(1);
    }
  };

  if let Err(err) = std::fs::write(&args.out, &encoded) {
    eprintln!("write {} failed: {}", args.out.display(), err);
    std::process::exit(1);
  }

  println!(
    "rendered {}x{} at {} spp in {:.1?} (variance {:.5}) -> {}",
    args.width,
    args.height,
    args.spp,
    elapsed,
    variance,
    args.out.display()
  );
}
