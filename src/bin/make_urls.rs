//! Mass-generate request URLs for load testing.
//!
//! Prints one URL per line, each a camera pose drawn uniformly from the
//! orbit sphere with the same mapping the server's `/random` route uses.
//! Pipe the output into your load generator of choice.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenecast::dispatch::pose_path;
use scenecast::pose::{pose_on_sphere, DEFAULT_ORBIT_RADIUS};

/// Generate render-request URLs for load testing
#[derive(Parser, Debug)]
#[command(name = "make_urls", version, about)]
struct Args {
  /// Number of URLs to emit
  #[arg(long, short, default_value_t = 100_000)]
  count: usize,

  /// Base URL of the server
  #[arg(long, default_value = "http://localhost:8819")]
  base: String,

  /// Orbit radius for the synthesized poses
  #[arg(long, default_value_t = DEFAULT_ORBIT_RADIUS)]
  radius: f32,

  /// RNG seed for a reproducible batch
  #[arg(long)]
  seed: Option<u64>,
}

fn main() {
  let args = Args::parse();
  let mut rng = match args.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };

  let base = args.base.trim_end_matches('/');
  for _ in 0..args.count {
    let pose = pose_on_sphere(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), args.radius);
    println!("{}{}", base, pose_path(&pose));
  }
}
