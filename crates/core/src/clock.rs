// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of wall-clock time in milliseconds since the epoch.
pub trait Clock: Send + Sync {
	fn now_millis(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> i64 {
		Utc::now().timestamp_millis()
	}
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicI64,
}

impl ManualClock {
	pub fn new(start_millis: i64) -> Self {
		Self {
			now: AtomicI64::new(start_millis),
		}
	}

	pub fn set(&self, millis: i64) {
		self.now.store(millis, Ordering::SeqCst);
	}

	pub fn advance(&self, millis: i64) {
		self.now.fetch_add(millis, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_millis(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock_advances() {
		let clock = ManualClock::new(1_000);
		clock.advance(250);
		assert_eq!(clock.now_millis(), 1_250);
		clock.set(10);
		assert_eq!(clock.now_millis(), 10);
	}
}
