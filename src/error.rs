//! Error types for scenecast
//!
//! This module provides error types for the service's subsystems:
//! - Initialization errors (backend, world, listener): the only fatal class
//! - Request errors (unparsable paths, bad request lines): map to 4xx
//! - Render errors (backend failure, encoding, pool exhaustion): map to 5xx
//!
//! All errors use the `thiserror` crate for minimal boilerplate and proper
//! error trait implementations.

use thiserror::Error;

/// Result type alias for scenecast operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for scenecast.
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// Startup failure; aborts the process.
  #[error("Initialization error: {0}")]
  Init(#[from] InitError),

  /// The client sent something we cannot turn into a render.
  #[error("Request error: {0}")]
  Request(#[from] RequestError),

  /// The render itself (or its encoding) failed after a scene was leased.
  #[error("Render error: {0}")]
  Render(#[from] RenderError),

  /// Socket or stream failure.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors that abort server startup.
///
/// Initialization failure is the only fatal, process-terminating condition;
/// everything else stays local to one request.
#[derive(Error, Debug)]
pub enum InitError {
  /// The render backend could not be brought up.
  #[error("render backend unavailable: {reason}")]
  BackendUnavailable { reason: String },

  /// A scene was configured with dimensions or parameters that cannot work.
  #[error("invalid configuration: {message}")]
  InvalidConfig { message: String },

  /// The listen socket could not be bound.
  #[error("failed to bind {addr}: {source}")]
  Bind {
    addr: String,
    #[source]
    source: std::io::Error,
  },
}

/// Errors caused by the request itself.
///
/// These map to deterministic client-error responses; they never reach the
/// pool or mutate a scene.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
  /// The path did not split into exactly nine camera components.
  #[error("expected 9 camera components, found {found}")]
  ComponentCount { found: usize },

  /// One of the nine components failed to parse as a real number.
  #[error("camera component {index} is not a number: {value:?}")]
  InvalidComponent { index: usize, value: String },

  /// The request line was missing or unparsable.
  #[error("malformed request line")]
  BadRequestLine,

  /// The request head exceeded the size cap.
  #[error("request head larger than {limit} bytes")]
  TooLarge { limit: usize },

  /// Anything that is not a GET.
  #[error("unsupported method {method}")]
  UnsupportedMethod { method: String },
}

/// Errors inside the leased window or while producing the response body.
///
/// A scene lease is always released before one of these surfaces.
#[derive(Error, Debug)]
pub enum RenderError {
  /// The backend's render pass failed.
  #[error("render backend failed: {reason}")]
  Backend { reason: String },

  /// The pixel buffer handed to the encoder had the wrong size.
  #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
  BufferMismatch { expected: usize, actual: usize },

  /// Image encoding failed.
  #[error("{format} encoding failed: {reason}")]
  EncodeFailed {
    format: &'static str,
    reason: String,
  },

  /// No scene became available within the configured lease timeout.
  #[error("no scene available after {waited_ms}ms")]
  PoolTimeout { waited_ms: u64 },
}
