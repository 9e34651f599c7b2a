//! Request dispatch: one HTTP request in, one rendered frame out.
//!
//! The dispatcher owns the request-to-image pipeline: route the path, lease
//! a scene, stage and commit the camera pose, render, encode, respond. The
//! scene lease is an RAII guard, so release happens on every path out of
//! the leased window, including render failures.

use crate::engine::Channels;
use crate::error::RequestError;
use crate::geometry::Vec3;
use crate::http::{Request, Response};
use crate::image_output::{self, OutputFormat};
use crate::pool::{SceneLease, ScenePool};
use crate::pose::{self, CameraPose};
use std::sync::Arc;
use std::time::Duration;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// The paths the service recognizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
  Index,
  Favicon,
  Random,
  Pose(CameraPose),
}

impl Route {
  pub fn parse(path: &str) -> Result<Route, RequestError> {
    match path {
      "/" => Ok(Route::Index),
      "/favicon.ico" => Ok(Route::Favicon),
      "/random" => Ok(Route::Random),
      _ => parse_pose_path(path).map(Route::Pose),
    }
  }
}

/// Parse `/<x>/<y>/<z>/<ux>/<uy>/<uz>/<vx>/<vy>/<vz>` into a camera pose.
///
/// Fails unless the path splits into exactly nine components, each a valid
/// decimal floating-point literal.
pub fn parse_pose_path(path: &str) -> Result<CameraPose, RequestError> {
  let components: Vec<&str> = path.strip_prefix('/').unwrap_or(path).split('/').collect();
  if components.len() != 9 {
    return Err(RequestError::ComponentCount {
      found: components.len(),
    });
  }
  let mut values = [0.0f32; 9];
  for (index, raw) in components.iter().enumerate() {
    values[index] = raw.parse::<f32>().map_err(|_| RequestError::InvalidComponent {
      index,
      value: (*raw).to_string(),
    })?;
  }
  Ok(CameraPose {
    eye: Vec3::new(values[0], values[1], values[2]),
    up: Vec3::new(values[3], values[4], values[5]),
    direction: Vec3::new(values[6], values[7], values[8]),
  })
}

/// Render the path a pose would be requested under. Inverse of
/// [`parse_pose_path`] up to floating-point formatting.
pub fn pose_path(pose: &CameraPose) -> String {
  format!(
    "/{}/{}/{}/{}/{}/{}/{}/{}/{}",
    pose.eye.x,
    pose.eye.y,
    pose.eye.z,
    pose.up.x,
    pose.up.y,
    pose.up.z,
    pose.direction.x,
    pose.direction.y,
    pose.direction.z
  )
}

/// Translates requests into rendered, encoded images.
pub struct RequestDispatcher {
  pool: Arc<ScenePool>,
  format: OutputFormat,
  orbit_radius: f32,
  lease_timeout: Option<Duration>,
}

impl RequestDispatcher {
  pub fn new(pool: Arc<ScenePool>, format: OutputFormat) -> RequestDispatcher {
    RequestDispatcher {
      pool,
      format,
      orbit_radius: pose::DEFAULT_ORBIT_RADIUS,
      lease_timeout: None,
    }
  }

  /// Bound the wait for a free scene; timeouts surface as 503.
  pub fn with_lease_timeout(mut self, timeout: Option<Duration>) -> RequestDispatcher {
    self.lease_timeout = timeout;
    self
  }

  pub fn pool(&self) -> &ScenePool {
    &self.pool
  }

  /// Handle one request. Never panics the serving context: every outcome is
  /// an HTTP response.
  pub fn handle(&self, request: &Request) -> Response {
    if request.method != "GET" {
      return Response::method_not_allowed();
    }
    let route = match Route::parse(&request.path) {
      Ok(route) => route,
      Err(err) => {
        log::debug!("rejecting {:?}: {}", request.path, err);
        return Response::bad_request(err.to_string());
      }
    };
    match route {
      Route::Index => Response::ok("text/html", INDEX_HTML.as_bytes().to_vec()),
      Route::Favicon => Response::not_found(),
      Route::Random => self.render_pose(pose::random_pose(self.orbit_radius)),
      Route::Pose(pose) => self.render_pose(pose),
    }
  }

  fn lease(&self) -> Result<SceneLease<'_>, Response> {
    match self.lease_timeout {
      None => Ok(self.pool.acquire()),
      Some(timeout) => self.pool.acquire_timeout(timeout).map_err(|err| {
        log::warn!("{}", err);
        Response::unavailable(err.to_string())
      }),
    }
  }

  fn render_pose(&self, pose: CameraPose) -> Response {
    let mut scene = match self.lease() {
      Ok(lease) => lease,
      Err(response) => return response,
    };

    scene.camera.set_position(pose.eye);
    scene.camera.set_up(pose.up);
    scene.camera.set_direction(pose.direction);
    scene.camera.commit();
    if scene.renderer.is_dirty() {
      scene.renderer.commit();
    }
    scene.framebuffer.clear(Channels::COLOR);

    let variance = match scene.render(Channels::COLOR) {
      Ok(variance) => variance,
      Err(err) => {
        // The lease guard still releases the scene when we return here.
        log::error!("render failed on scene {}: {}", scene.id(), err);
        return Response::server_error(err.to_string());
      }
    };
    log::debug!("scene {} rendered, variance {:.5}", scene.id(), variance);

    let (width, height) = (scene.framebuffer.width(), scene.framebuffer.height());
    let pixels = scene.framebuffer.read_pixels(Channels::COLOR);
    drop(scene); // encoding does not need the lease

    match image_output::encode_rgb(pixels, width, height, self.format) {
      Ok(body) => Response::ok(self.format.content_type(), body),
      Err(err) => {
        log::error!("encode failed: {}", err);
        Response::server_error(err.to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::{RenderBackend, SoftwareTracer, World};
  use crate::scene::{Scene, SceneConfig};

  fn dispatcher(capacity: usize) -> RequestDispatcher {
    let world = Arc::new(World::demo());
    let backend: Arc<dyn RenderBackend> = Arc::new(SoftwareTracer::initialize().unwrap());
    let config = SceneConfig::new().with_size(16, 16).with_samples_per_pixel(1);
    let scenes = (0..capacity)
      .map(|id| Scene::build(id, &config, Arc::clone(&world), Arc::clone(&backend)).unwrap())
      .collect();
    RequestDispatcher::new(Arc::new(ScenePool::new(scenes)), OutputFormat::Png)
  }

  fn get(path: &str) -> Request {
    Request {
      method: "GET".to_string(),
      path: path.to_string(),
    }
  }

  #[test]
  fn pose_path_round_trips() {
    for pose in [
      CameraPose {
        eye: Vec3::new(0.0, 0.0, 200.0),
        up: Vec3::new(0.0, 1.0, 0.0),
        direction: Vec3::new(0.0, 0.0, -200.0),
      },
      pose::pose_on_sphere(0.31, 0.77, 200.0),
      CameraPose {
        eye: Vec3::new(-1.5, 2.25e-3, 1e7),
        up: Vec3::new(0.0, -1.0, 0.0),
        direction: Vec3::new(1.5, -2.25e-3, -1e7),
      },
    ] {
      let parsed = parse_pose_path(&pose_path(&pose)).unwrap();
      assert_eq!(parsed, pose);
    }
  }

  #[test]
  fn parse_rejects_wrong_arity() {
    assert_eq!(
      parse_pose_path("/abc/def"),
      Err(RequestError::ComponentCount { found: 2 })
    );
    assert_eq!(
      parse_pose_path("/1/2/3/4/5/6/7/8/9/"),
      Err(RequestError::ComponentCount { found: 10 })
    );
  }

  #[test]
  fn parse_rejects_non_numeric_components() {
    let err = parse_pose_path("/1/2/3/4/5/x/7/8/9").unwrap_err();
    assert_eq!(
      err,
      RequestError::InvalidComponent {
        index: 5,
        value: "x".to_string()
      }
    );
  }

  #[test]
  fn routes_are_distinguished() {
    assert_eq!(Route::parse("/").unwrap(), Route::Index);
    assert_eq!(Route::parse("/favicon.ico").unwrap(), Route::Favicon);
    assert_eq!(Route::parse("/random").unwrap(), Route::Random);
    assert!(matches!(Route::parse("/0/0/200/0/1/0/0/0/-200"), Ok(Route::Pose(_))));
    assert!(Route::parse("/nine/eight").is_err());
  }

  #[test]
  fn index_and_favicon_and_method_responses() {
    let dispatcher = dispatcher(1);
    assert_eq!(dispatcher.handle(&get("/")).status(), 200);
    assert_eq!(dispatcher.handle(&get("/favicon.ico")).status(), 404);
    let mut post = get("/");
    post.method = "POST".to_string();
    assert_eq!(dispatcher.handle(&post).status(), 405);
  }

  #[test]
  fn malformed_paths_yield_400_and_leave_the_pool_intact() {
    let dispatcher = dispatcher(1);
    assert_eq!(dispatcher.handle(&get("/abc/def")).status(), 400);
    assert_eq!(dispatcher.handle(&get("/1/2/3")).status(), 400);
    assert_eq!(dispatcher.pool().available(), 1);
  }

  #[test]
  fn pose_request_renders_an_image() {
    let dispatcher = dispatcher(1);
    let response = dispatcher.handle(&get("/0/0/200/0/1/0/0/0/-200"));
    assert_eq!(response.status(), 200);
    assert!(response.body_len() > 0);
    assert_eq!(dispatcher.pool().available(), 1);
  }

  #[test]
  fn render_failure_releases_the_scene() {
    struct FailingBackend;
    impl RenderBackend for FailingBackend {
      fn render(
        &self,
        _world: &World,
        _camera: &crate::engine::Camera,
        _settings: &crate::engine::RendererSettings,
        _frame: &mut crate::engine::FrameBuffer,
        _channels: Channels,
      ) -> Result<f32, crate::error::RenderError> {
        Err(crate::error::RenderError::Backend {
          reason: "injected".to_string(),
        })
      }
    }

    let world = Arc::new(World::demo());
    let backend: Arc<dyn RenderBackend> = Arc::new(FailingBackend);
    let config = SceneConfig::new().with_size(8, 8).with_samples_per_pixel(1);
    let scenes = vec![Scene::build(0, &config, world, backend).unwrap()];
    let dispatcher =
      RequestDispatcher::new(Arc::new(ScenePool::new(scenes)), OutputFormat::Png);

    let response = dispatcher.handle(&get("/0/0/200/0/1/0/0/0/-200"));
    assert_eq!(response.status(), 500);
    assert_eq!(dispatcher.pool().available(), 1);
  }
}
