// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::Result;

mod context;
mod runner;
mod state;

pub use context::{DEFAULT_ROW_WAIT_TIMEOUT, StepContext, StepCounters, StepEnvironment};
pub use runner::{StepHandle, StepReport, dispose_step, init_step, run_step, spawn_step};
pub use state::StepState;

/// Capability every step kind implements.
///
/// A copy is driven by exactly one thread: `init` once, then `process_row`
/// until it returns `false`, then `dispose` exactly once, also when `init` or
/// `process_row` failed.
pub trait Step: Send {
	/// Validate configuration and allocate private state.
	fn init(&mut self, ctx: &mut StepContext) -> Result<()>;

	/// Handle at most one input row. Returns `false` once the input is
	/// exhausted and every pending row has been flushed and the outputs are
	/// marked done.
	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool>;

	/// Release buffers, caches and connections.
	fn dispose(&mut self, ctx: &mut StepContext);
}

impl<S: Step + ?Sized> Step for Box<S> {
	fn init(&mut self, ctx: &mut StepContext) -> Result<()> {
		(**self).init(ctx)
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		(**self).process_row(ctx)
	}

	fn dispose(&mut self, ctx: &mut StepContext) {
		(**self).dispose(ctx)
	}
}
