//! Exclusive write access.
//!
//! All recording, normalization and execution happen under a single-owner,
//! reentrant write lock. The scheduler only needs to know whether the lock is
//! held by the current thread and how to run a block under it.

use std::cell::Cell;

use parking_lot::ReentrantMutex;

/// Coordinator for exclusive document access.
pub trait WriteAccess: Send + Sync {
	/// Returns true if the current thread holds write access.
	fn is_held(&self) -> bool;

	/// Runs `f` with write access held. Must call `f` exactly once.
	fn run_exclusive(&self, f: &mut dyn FnMut());
}

/// Reentrant write lock backed by `parking_lot`.
///
/// The owner thread may acquire it again while holding it; other threads
/// block until the outermost holder releases it.
#[derive(Default)]
pub struct ReentrantWriteLock {
	/// Acquisition depth of the owning thread.
	depth: ReentrantMutex<Cell<usize>>,
}

impl ReentrantWriteLock {
	pub fn new() -> Self {
		Self::default()
	}
}

impl WriteAccess for ReentrantWriteLock {
	fn is_held(&self) -> bool {
		self.depth.try_lock().is_some_and(|depth| depth.get() > 0)
	}

	fn run_exclusive(&self, f: &mut dyn FnMut()) {
		struct Release<'a>(&'a Cell<usize>);

		impl Drop for Release<'_> {
			fn drop(&mut self) {
				self.0.set(self.0.get() - 1);
			}
		}

		let guard = self.depth.lock();
		guard.set(guard.get() + 1);
		let _release = Release(&guard);
		f();
	}
}
