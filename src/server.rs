//! Server runtime: accept connections and dispatch them under a strategy.
//!
//! The runtime pre-warms the scene pool, binds the listen socket, and then
//! runs one of three accept-and-dispatch loops:
//!
//! - [`Strategy::Serial`] handles each connection inline on the accept
//!   thread.
//! - [`Strategy::Threaded`] spawns a thread per connection; parallel
//!   progress is bounded by the pool's capacity, not by thread count.
//! - [`Strategy::Forked`] (Unix only) forks a child per connection. The
//!   child serves exactly one request against its copy-on-write snapshot of
//!   the pool and exits, so no pool state ever needs to be shared back to
//!   the parent or to sibling children.

use crate::dispatch::RequestDispatcher;
use crate::engine::{RenderBackend, SoftwareTracer, World};
use crate::error::{InitError, Result};
use crate::http::{self, Response};
use crate::image_output::OutputFormat;
use crate::pool::ScenePool;
use crate::scene::{Scene, SceneConfig};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How accepted connections are bound to dispatch work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// One accept-and-process loop. Pool capacity beyond 1 is wasted.
  Serial,
  /// A worker thread per connection.
  Threaded,
  /// A forked child process per connection (Unix only).
  Forked,
}

/// Everything needed to bring a server up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
  /// Address to listen on, e.g. `0.0.0.0:8819`.
  pub addr: String,
  pub strategy: Strategy,
  /// Number of scenes pre-warmed into the pool.
  pub pool_capacity: usize,
  pub scene: SceneConfig,
  pub format: OutputFormat,
  /// Bound on the wait for a free scene; `None` blocks indefinitely.
  pub lease_timeout: Option<Duration>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    ServerConfig {
      addr: "0.0.0.0:8819".to_string(),
      strategy: Strategy::Threaded,
      pool_capacity: 3,
      scene: SceneConfig::default(),
      format: OutputFormat::Png,
      lease_timeout: None,
    }
  }
}

impl ServerConfig {
  pub fn new() -> ServerConfig {
    ServerConfig::default()
  }

  pub fn with_addr(mut self, addr: impl Into<String>) -> ServerConfig {
    self.addr = addr.into();
    self
  }

  pub fn with_strategy(mut self, strategy: Strategy) -> ServerConfig {
    self.strategy = strategy;
    self
  }

  pub fn with_pool_capacity(mut self, capacity: usize) -> ServerConfig {
    self.pool_capacity = capacity;
    self
  }

  pub fn with_scene(mut self, scene: SceneConfig) -> ServerConfig {
    self.scene = scene;
    self
  }

  pub fn with_format(mut self, format: OutputFormat) -> ServerConfig {
    self.format = format;
    self
  }

  pub fn with_lease_timeout(mut self, timeout: Option<Duration>) -> ServerConfig {
    self.lease_timeout = timeout;
    self
  }
}

/// A bound server, ready to run.
pub struct ServerRuntime {
  listener: TcpListener,
  dispatcher: Arc<RequestDispatcher>,
  strategy: Strategy,
}

impl ServerRuntime {
  /// Initialize the engine, pre-warm the pool, and bind the listen socket.
  ///
  /// Construction cost is paid here, before the first connection is
  /// accepted; failures are fatal.
  pub fn bind(config: ServerConfig) -> Result<ServerRuntime> {
    if config.pool_capacity == 0 {
      return Err(
        InitError::InvalidConfig {
          message: "pool capacity must be at least 1".to_string(),
        }
        .into(),
      );
    }
    if config.strategy == Strategy::Forked && !cfg!(unix) {
      return Err(
        InitError::InvalidConfig {
          message: "the forked strategy requires a Unix host".to_string(),
        }
        .into(),
      );
    }

    let backend: Arc<dyn RenderBackend> = Arc::new(SoftwareTracer::initialize()?);
    let world = Arc::new(World::demo());
    log::info!(
      "world holds {} geometry object(s) and {} volume(s)",
      world.geometry_count(),
      world.volume_count()
    );

    let mut scenes = Vec::with_capacity(config.pool_capacity);
    for id in 0..config.pool_capacity {
      scenes.push(Scene::build(id, &config.scene, Arc::clone(&world), Arc::clone(&backend))?);
    }
    log::info!(
      "pre-warmed {} scene(s) at {}x{}, {} spp",
      scenes.len(),
      config.scene.width,
      config.scene.height,
      config.scene.samples_per_pixel
    );

    let pool = Arc::new(ScenePool::new(scenes));
    let dispatcher = Arc::new(
      RequestDispatcher::new(pool, config.format).with_lease_timeout(config.lease_timeout),
    );

    let listener = TcpListener::bind(&config.addr).map_err(|source| InitError::Bind {
      addr: config.addr.clone(),
      source,
    })?;

    Ok(ServerRuntime {
      listener,
      dispatcher,
      strategy: config.strategy,
    })
  }

  /// The address the listener actually bound (useful with port 0).
  pub fn local_addr(&self) -> SocketAddr {
    self.listener.local_addr().expect("listener has a local addr")
  }

  /// Accept and dispatch connections forever.
  pub fn run(self) -> Result<()> {
    log::info!("serving on {} ({:?})", self.local_addr(), self.strategy);
    loop {
      let stream = match self.listener.accept() {
        Ok((stream, peer)) => {
          log::debug!("connection from {}", peer);
          stream
        }
        Err(err) => {
          log::warn!("accept failed: {}", err);
          continue;
        }
      };

      match self.strategy {
        Strategy::Serial => serve_connection(&self.dispatcher, stream),
        Strategy::Threaded => {
          let dispatcher = Arc::clone(&self.dispatcher);
          thread::spawn(move || serve_connection(&dispatcher, stream));
        }
        Strategy::Forked => self.fork_connection(stream),
      }
    }
  }

  #[cfg(unix)]
  fn fork_connection(&self, stream: TcpStream) {
    reap_children();
    // The child inherits a point-in-time copy of the pool. It serves this
    // one connection from that copy and exits; the parent's pool is never
    // touched by it.
    match unsafe { libc::fork() } {
      -1 => {
        log::error!("fork failed: {}", std::io::Error::last_os_error());
        let mut stream = stream;
        let _ = Response::server_error("worker fork failed".to_string()).write_to(&mut stream);
      }
      0 => {
        serve_connection(&self.dispatcher, stream);
        std::process::exit(0);
      }
      pid => {
        log::debug!("forked worker {}", pid);
        drop(stream); // the child owns its copy of the fd
      }
    }
  }

  #[cfg(not(unix))]
  fn fork_connection(&self, _stream: TcpStream) {
    unreachable!("bind() rejects the forked strategy off Unix");
  }
}

/// Read one request, dispatch it, write the response.
fn serve_connection(dispatcher: &RequestDispatcher, mut stream: TcpStream) {
  let response = match http::read_request(&mut stream) {
    Ok(request) => {
      let response = dispatcher.handle(&request);
      log::info!(
        "{} {} -> {} ({} bytes)",
        request.method,
        request.path,
        response.status(),
        response.body_len()
      );
      response
    }
    Err(err) => {
      log::debug!("unreadable request: {}", err);
      Response::bad_request(err.to_string())
    }
  };
  if let Err(err) = response.write_to(&mut stream) {
    log::debug!("client went away: {}", err);
  }
}

/// Collect exited forked workers without blocking.
#[cfg(unix)]
fn reap_children() {
  loop {
    let pid = unsafe { libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) };
    if pid <= 0 {
      break;
    }
    log::debug!("reaped worker {}", pid);
  }
}
