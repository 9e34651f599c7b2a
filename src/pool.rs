//! Bounded pool of scenes with exclusive-lease semantics.
//!
//! The pool models a leasing protocol over a scarce, expensive resource: a
//! fixed set of [`Scene`]s is pre-warmed at startup and handed out one
//! holder at a time. [`ScenePool::acquire`] blocks until a scene is free;
//! the returned [`SceneLease`] is an RAII guard whose drop returns the scene
//! on every exit path (early returns, error propagation, panics), so a
//! failed render can never shrink the pool.
//!
//! Invariant: leased + available == capacity, always.

use crate::error::RenderError;
use crate::scene::Scene;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Thread-safe bounded container of scenes.
pub struct ScenePool {
  available: Mutex<VecDeque<Scene>>,
  returned: Condvar,
  capacity: usize,
}

impl ScenePool {
  /// Build a pool over a pre-warmed set of scenes. The pool's capacity is
  /// fixed at the size of this set for the life of the process.
  pub fn new(scenes: Vec<Scene>) -> ScenePool {
    let capacity = scenes.len();
    ScenePool {
      available: Mutex::new(scenes.into()),
      returned: Condvar::new(),
      capacity,
    }
  }

  /// Lease a scene, blocking until one is available.
  ///
  /// Hand-out is FIFO over the available set, which approximates
  /// first-requested-first-served under contention (condvar wakeup order is
  /// not a hard guarantee). There is no timeout on this path: if a holder
  /// never releases (a stalled render, a stuck client), every subsequent
  /// caller blocks here indefinitely. Use [`ScenePool::acquire_timeout`] to
  /// bound the wait.
  pub fn acquire(&self) -> SceneLease<'_> {
    let mut queue = self.available.lock().expect("scene pool mutex poisoned");
    loop {
      if let Some(scene) = queue.pop_front() {
        log::trace!("scene {} leased, {} left", scene.id(), queue.len());
        return SceneLease {
          pool: self,
          scene: Some(scene),
        };
      }
      queue = self.returned.wait(queue).expect("scene pool mutex poisoned");
    }
  }

  /// Lease a scene, giving up after `timeout`.
  pub fn acquire_timeout(&self, timeout: Duration) -> Result<SceneLease<'_>, RenderError> {
    let deadline = Instant::now() + timeout;
    let mut queue = self.available.lock().expect("scene pool mutex poisoned");
    loop {
      if let Some(scene) = queue.pop_front() {
        log::trace!("scene {} leased, {} left", scene.id(), queue.len());
        return Ok(SceneLease {
          pool: self,
          scene: Some(scene),
        });
      }
      let now = Instant::now();
      if now >= deadline {
        return Err(RenderError::PoolTimeout {
          waited_ms: timeout.as_millis() as u64,
        });
      }
      let (guard, wait) = self
        .returned
        .wait_timeout(queue, deadline - now)
        .expect("scene pool mutex poisoned");
      queue = guard;
      if wait.timed_out() && queue.is_empty() {
        return Err(RenderError::PoolTimeout {
          waited_ms: timeout.as_millis() as u64,
        });
      }
    }
  }

  /// Scenes currently available for lease.
  pub fn available(&self) -> usize {
    self.available.lock().expect("scene pool mutex poisoned").len()
  }

  /// Total scenes this pool owns, leased or not.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  fn restore(&self, scene: Scene) {
    let mut queue = self.available.lock().expect("scene pool mutex poisoned");
    // A second return of the same lease is impossible through the guard; a
    // queue already at capacity means the invariant is broken.
    assert!(
      queue.len() < self.capacity,
      "scene returned to a full pool (capacity {})",
      self.capacity
    );
    queue.push_back(scene);
    drop(queue);
    self.returned.notify_one();
  }
}

/// Exclusive lease on one scene.
///
/// Dereferences to the scene. Dropping the lease returns the scene to the
/// pool, exactly once, unconditionally.
pub struct SceneLease<'a> {
  pool: &'a ScenePool,
  scene: Option<Scene>,
}

impl std::fmt::Debug for SceneLease<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SceneLease")
      .field("scene", &self.scene.as_ref().map(Scene::id))
      .finish()
  }
}

impl Deref for SceneLease<'_> {
  type Target = Scene;
  fn deref(&self) -> &Scene {
    self.scene.as_ref().expect("lease already released")
  }
}

impl DerefMut for SceneLease<'_> {
  fn deref_mut(&mut self) -> &mut Scene {
    self.scene.as_mut().expect("lease already released")
  }
}

impl Drop for SceneLease<'_> {
  fn drop(&mut self) {
    if let Some(scene) = self.scene.take() {
      log::trace!("scene {} released", scene.id());
      self.pool.restore(scene);
    }
  }
}
