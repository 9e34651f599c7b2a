//! End-to-end tests against real listening servers.

use scenecast::dispatch::RequestDispatcher;
use scenecast::engine::{
  Camera, Channels, FrameBuffer, RenderBackend, RendererSettings, World,
};
use scenecast::error::RenderError;
use scenecast::http::Request;
use scenecast::scene::{Scene, SceneConfig};
use scenecast::server::{ServerConfig, ServerRuntime, Strategy};
use scenecast::{OutputFormat, ScenePool};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const FRAME: u32 = 32;

/// Boot a server on an ephemeral port, or skip when the environment cannot
/// bind localhost.
fn start_server(strategy: Strategy, pool_capacity: usize) -> Option<SocketAddr> {
  let config = ServerConfig::new()
    .with_addr("127.0.0.1:0")
    .with_strategy(strategy)
    .with_pool_capacity(pool_capacity)
    .with_scene(SceneConfig::new().with_size(FRAME, FRAME).with_samples_per_pixel(1))
    .with_format(OutputFormat::Png);
  let runtime = match ServerRuntime::bind(config) {
    Ok(runtime) => runtime,
    Err(err) => {
      eprintln!("skipping: cannot bind localhost in this environment: {err}");
      return None;
    }
  };
  let addr = runtime.local_addr();
  thread::spawn(move || {
    let _ = runtime.run();
  });
  Some(addr)
}

fn client() -> ureq::Agent {
  let config = ureq::Agent::config_builder()
    .http_status_as_error(false)
    .timeout_global(Some(Duration::from_secs(10)))
    .build();
  config.into()
}

fn get(agent: &ureq::Agent, addr: SocketAddr, path: &str) -> (u16, Option<String>, Vec<u8>) {
  let mut response = agent
    .get(&format!("http://{addr}{path}"))
    .call()
    .expect("request failed");
  let status = response.status().as_u16();
  let content_type = response
    .headers()
    .get("content-type")
    .and_then(|h| h.to_str().ok())
    .map(|s| s.to_string());
  let body = response.body_mut().read_to_vec().expect("read body");
  (status, content_type, body)
}

#[test]
fn serial_server_serves_the_static_surface() {
  let Some(addr) = start_server(Strategy::Serial, 1) else {
    return;
  };
  let agent = client();

  let (status, content_type, body) = get(&agent, addr, "/");
  assert_eq!(status, 200);
  assert_eq!(content_type.as_deref(), Some("text/html"));
  assert!(!body.is_empty());

  let (status, _, _) = get(&agent, addr, "/favicon.ico");
  assert_eq!(status, 404);
}

#[test]
fn pose_request_returns_a_frame_of_the_configured_size() {
  let Some(addr) = start_server(Strategy::Threaded, 2) else {
    return;
  };
  let agent = client();

  let (status, content_type, body) = get(&agent, addr, "/0/0/200/0/1/0/0/0/-200");
  assert_eq!(status, 200);
  assert_eq!(content_type.as_deref(), Some("image/png"));
  let decoded = image::load_from_memory(&body).expect("valid png");
  assert_eq!(decoded.width(), FRAME);
  assert_eq!(decoded.height(), FRAME);
}

#[test]
fn random_route_returns_a_frame() {
  let Some(addr) = start_server(Strategy::Threaded, 1) else {
    return;
  };
  let agent = client();

  let (status, content_type, body) = get(&agent, addr, "/random");
  assert_eq!(status, 200);
  assert_eq!(content_type.as_deref(), Some("image/png"));
  assert!(image::load_from_memory(&body).is_ok());
}

#[test]
fn malformed_paths_get_deterministic_400s_and_the_server_keeps_going() {
  let Some(addr) = start_server(Strategy::Serial, 1) else {
    return;
  };
  let agent = client();

  let (first_status, _, first_body) = get(&agent, addr, "/abc/def");
  let (second_status, _, second_body) = get(&agent, addr, "/abc/def");
  assert_eq!(first_status, 400);
  assert_eq!(second_status, 400);
  assert_eq!(first_body, second_body, "error responses must be deterministic");

  let (status, _, _) = get(&agent, addr, "/1/2/3/4/5/6/7/8/not-a-number");
  assert_eq!(status, 400);

  // The serving loop survived all of that.
  let (status, _, _) = get(&agent, addr, "/0/0/200/0/1/0/0/0/-200");
  assert_eq!(status, 200);
}

#[test]
fn non_get_methods_are_rejected() {
  let Some(addr) = start_server(Strategy::Serial, 1) else {
    return;
  };
  let agent = client();

  let response = agent
    .post(&format!("http://{addr}/"))
    .send_empty()
    .expect("request failed");
  assert_eq!(response.status().as_u16(), 405);
}

#[test]
fn capacity_one_pool_serves_concurrent_requests() {
  let Some(addr) = start_server(Strategy::Threaded, 1) else {
    return;
  };

  let start = Arc::new(Barrier::new(2));
  let handles: Vec<_> = (0..2)
    .map(|_| {
      let start = Arc::clone(&start);
      thread::spawn(move || {
        let agent = client();
        start.wait();
        get(&agent, addr, "/0/0/200/0/1/0/0/0/-200")
      })
    })
    .collect();

  for handle in handles {
    let (status, _, body) = handle.join().unwrap();
    assert_eq!(status, 200);
    let decoded = image::load_from_memory(&body).expect("valid png");
    assert_eq!(decoded.width(), FRAME);
  }
}

/// Backend that asserts render passes never overlap, as they cannot when a
/// single scene serializes all requests.
struct OverlapDetector {
  in_flight: AtomicBool,
  renders: AtomicUsize,
}

impl RenderBackend for OverlapDetector {
  fn render(
    &self,
    _world: &World,
    _camera: &Camera,
    _settings: &RendererSettings,
    frame: &mut FrameBuffer,
    _channels: Channels,
  ) -> Result<f32, RenderError> {
    assert!(
      !self.in_flight.swap(true, Ordering::SeqCst),
      "two renders overlapped on a capacity-1 pool"
    );
    thread::sleep(Duration::from_millis(40));
    frame.clear(Channels::COLOR);
    self.in_flight.store(false, Ordering::SeqCst);
    self.renders.fetch_add(1, Ordering::SeqCst);
    Ok(0.0)
  }
}

#[test]
fn capacity_one_pool_never_overlaps_renders() {
  let backend = Arc::new(OverlapDetector {
    in_flight: AtomicBool::new(false),
    renders: AtomicUsize::new(0),
  });
  let world = Arc::new(World::demo());
  let config = SceneConfig::new().with_size(8, 8).with_samples_per_pixel(1);
  let scenes = vec![Scene::build(
    0,
    &config,
    world,
    Arc::clone(&backend) as Arc<dyn RenderBackend>,
  )
  .unwrap()];
  let dispatcher = Arc::new(RequestDispatcher::new(
    Arc::new(ScenePool::new(scenes)),
    OutputFormat::Png,
  ));

  let start = Arc::new(Barrier::new(4));
  let handles: Vec<_> = (0..4)
    .map(|_| {
      let dispatcher = Arc::clone(&dispatcher);
      let start = Arc::clone(&start);
      thread::spawn(move || {
        start.wait();
        let request = Request {
          method: "GET".to_string(),
          path: "/0/0/200/0/1/0/0/0/-200".to_string(),
        };
        dispatcher.handle(&request).status()
      })
    })
    .collect();

  for handle in handles {
    assert_eq!(handle.join().unwrap(), 200);
  }
  assert_eq!(backend.renders.load(Ordering::SeqCst), 4);
  assert_eq!(dispatcher.pool().available(), 1);
}
