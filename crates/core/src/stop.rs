// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

/// Cooperative stop signal shared between a step copy, its execution and any
/// sub-executions it starts.
///
/// A child flag reports stopped once it or any of its ancestors is stopped.
/// Stopping a child never affects its parent.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
	inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
	stopped: AtomicBool,
	parent: Option<StopFlag>,
}

impl StopFlag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a flag that observes this one.
	pub fn child(&self) -> StopFlag {
		StopFlag {
			inner: Arc::new(StopInner {
				stopped: AtomicBool::new(false),
				parent: Some(self.clone()),
			}),
		}
	}

	pub fn stop(&self) {
		self.inner.stopped.store(true, Ordering::SeqCst);
	}

	pub fn is_stopped(&self) -> bool {
		if self.inner.stopped.load(Ordering::SeqCst) {
			return true;
		}

		match &self.inner.parent {
			Some(parent) => parent.is_stopped(),
			None => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_stop_propagates_to_children() {
		let execution = StopFlag::new();
		let step = execution.child();
		let sub_job = step.child();

		assert!(!sub_job.is_stopped());
		execution.stop();
		assert!(step.is_stopped());
		assert!(sub_job.is_stopped());
	}

	#[test]
	fn test_child_stop_does_not_reach_parent() {
		let execution = StopFlag::new();
		let step = execution.child();

		step.stop();
		assert!(step.is_stopped());
		assert!(!execution.is_stopped());
	}
}
