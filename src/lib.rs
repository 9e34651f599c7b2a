//! scenecast, an HTTP scene-rendering service.
//!
//! Clients request a frame of a fixed scene from an arbitrary camera pose
//! encoded in the request path; the service renders it and returns a
//! compressed image. The interesting part is not the rendering (that sits
//! behind the [`engine::RenderBackend`] seam) but sharing a small, bounded
//! set of expensive rendering contexts across concurrent requests:
//!
//! - [`scene::Scene`] bundles one context (camera, renderer settings,
//!   framebuffer) over a shared immutable world.
//! - [`pool::ScenePool`] leases scenes exclusively, with guaranteed return
//!   on every exit path via the [`pool::SceneLease`] guard.
//! - [`dispatch::RequestDispatcher`] turns one request into one frame.
//! - [`server::ServerRuntime`] accepts connections under a serial,
//!   threaded, or forked strategy.
//!
//! # Example
//!
//! ```rust,no_run
//! use scenecast::server::{ServerConfig, ServerRuntime, Strategy};
//!
//! let config = ServerConfig::new()
//!     .with_addr("0.0.0.0:8819")
//!     .with_strategy(Strategy::Threaded)
//!     .with_pool_capacity(3);
//! let runtime = ServerRuntime::bind(config)?;
//! runtime.run()?;
//! # Ok::<(), scenecast::Error>(())
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod http;
pub mod image_output;
pub mod pool;
pub mod pose;
pub mod scene;
pub mod server;

pub use error::{Error, Result};
pub use image_output::OutputFormat;
pub use pool::{SceneLease, ScenePool};
pub use scene::{Scene, SceneConfig};
pub use server::{ServerConfig, ServerRuntime, Strategy};
