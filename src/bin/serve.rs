//! scenecast HTTP server.
//!
//! Binds the listen socket, pre-warms the scene pool, and serves frames
//! until killed. `RUST_LOG` controls log filtering; `--verbose` forces
//! debug level.

use clap::{Parser, ValueEnum};
use scenecast::scene::SceneConfig;
use scenecast::server::{ServerConfig, ServerRuntime, Strategy};
use scenecast::OutputFormat;
use std::time::Duration;

/// Serve rendered frames over HTTP
#[derive(Parser, Debug)]
#[command(name = "serve", version, about)]
struct Args {
  /// Port to listen on
  #[arg(long, default_value_t = 8819)]
  port: u16,

  /// Address to bind
  #[arg(long, default_value = "0.0.0.0")]
  bind: String,

  /// Concurrency strategy for accepted connections
  #[arg(long, value_enum, default_value_t = StrategyArg::Threaded)]
  strategy: StrategyArg,

  /// Number of scenes pre-warmed into the pool
  #[arg(long, default_value_t = 3)]
  pool_size: usize,

  /// Frame width in pixels
  #[arg(long, default_value_t = 512)]
  width: u32,

  /// Frame height in pixels
  #[arg(long, default_value_t = 512)]
  height: u32,

  /// Image container for responses
  #[arg(long, value_enum, default_value_t = FormatArg::Png)]
  format: FormatArg,

  /// JPEG quality (0-100), ignored for PNG
  #[arg(long, default_value_t = 90)]
  quality: u8,

  /// Samples per pixel
  #[arg(long, default_value_t = 4)]
  spp: u32,

  /// Give up on a scene lease after this many seconds and answer 503;
  /// waits indefinitely when unset
  #[arg(long)]
  lease_timeout: Option<u64>,

  /// Log at debug level
  #[arg(long, short)]
  verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
  Serial,
  Threaded,
  Forked,
}

impl StrategyArg {
  fn as_strategy(self) -> Strategy {
    match self {
      StrategyArg::Serial => Strategy::Serial,
      StrategyArg::Threaded => Strategy::Threaded,
      StrategyArg::Forked => Strategy::Forked,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
  Png,
  Jpeg,
}

fn init_logging(verbose: bool) {
  let mut builder = env_logger::Builder::new();
  if let Ok(filter) = std::env::var("RUST_LOG") {
    builder.parse_filters(&filter);
  } else if verbose {
    builder.filter_level(log::LevelFilter::Debug);
  } else {
    builder.filter_level(log::LevelFilter::Info);
  }
  builder.init();
}

fn main() {
  let args = Args::parse();
  init_logging(args.verbose);

  let format = match args.format {
    FormatArg::Png => OutputFormat::Png,
    FormatArg::Jpeg => OutputFormat::Jpeg(args.quality),
  };

  let config = ServerConfig::new()
    .with_addr(format!("{}:{}", args.bind, args.port))
    .with_strategy(args.strategy.as_strategy())
    .with_pool_capacity(args.pool_size)
    .with_scene(
      SceneConfig::new()
        .with_size(args.width, args.height)
        .with_samples_per_pixel(args.spp),
    )
    .with_format(format)
    .with_lease_timeout(args.lease_timeout.map(Duration::from_secs));

  let runtime = match ServerRuntime::bind(config) {
    Ok(runtime) => runtime,
    Err(err) => {
      log::error!("startup failed: {}", err);
      std::process::exit(1);
    }
  };

  if let Err(err) = runtime.run() {
    log::error!("server stopped: {}", err);
    std::process::exit(1);
  }
}
