// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Drives one step copy on a dedicated thread.

use std::thread;

use rowflow_type::{Error, Result, internal_error};
use tracing::{debug, error, warn};

use crate::{
	error::StepError,
	log::LogChannelId,
	rowset::StepRef,
	step::{Step, StepContext, StepCounters, StepState},
};

/// Final account of one step copy.
#[derive(Debug, Clone)]
pub struct StepReport {
	pub step: StepRef,
	pub state: StepState,
	pub counters: StepCounters,
	pub log_channel: Option<LogChannelId>,
	pub error: Option<Error>,
}

impl StepReport {
	fn from_context(ctx: &StepContext, error: Option<Error>) -> Self {
		Self {
			step: ctx.step().clone(),
			state: ctx.state(),
			counters: ctx.counters().clone(),
			log_channel: Some(ctx.log_channel()),
			error,
		}
	}
}

/// Initialize a copy. On failure the copy is left in `Failed` and still
/// needs [`dispose_step`].
pub fn init_step<S: Step + ?Sized>(step: &mut S, ctx: &mut StepContext) -> Result<()> {
	match step.init(ctx) {
		Ok(()) => {
			ctx.transition(StepState::Initialized)?;
			debug!(step = %ctx.step(), "step initialized");
			Ok(())
		}
		Err(err) => {
			let err = err.with_step(ctx.name());
			error!(step = %ctx.step(), error = %err, "step failed to initialize");
			ctx.counters_mut().errors += 1;
			ctx.log_line(format!("failed to initialize: {}", err.message));
			ctx.transition(StepState::Failed)?;
			Err(err)
		}
	}
}

/// Dispose a copy that will not run, for example because another copy of the
/// execution failed to initialize.
pub fn dispose_step<S: Step + ?Sized>(step: &mut S, ctx: &mut StepContext) -> StepReport {
	ctx.set_output_done();
	step.dispose(ctx);

	let error = ctx.transition(StepState::Done).err();
	StepReport::from_context(ctx, error)
}

/// Run an initialized copy to completion on the current thread.
///
/// The loop ends when `process_row` returns `false`, the stop flag is raised
/// or a row fails. A failure stops the whole execution. The outputs are always
/// marked done and `dispose` is always called.
pub fn run_step<S: Step + ?Sized>(step: &mut S, ctx: &mut StepContext) -> StepReport {
	let mut failure = ctx.transition(StepState::Running).err();

	if failure.is_none() {
		loop {
			if ctx.is_stopped() {
				debug!(step = %ctx.step(), "step stopped");
				failure = ctx.transition(StepState::Stopping).err();
				break;
			}

			match step.process_row(ctx) {
				Ok(true) => continue,
				Ok(false) => {
					if ctx.is_stopped() {
						failure = ctx.transition(StepState::Stopping).err();
					}
					break;
				}
				Err(err) => {
					failure = Some(err.with_step(ctx.name()));
					break;
				}
			}
		}
	}

	if let Some(err) = &failure {
		error!(step = %ctx.step(), error = %err, "step failed");
		ctx.counters_mut().errors += 1;
		ctx.log_line(format!("step failed: {}", err.message));
		ctx.stop_execution();
		if let Err(transition) = ctx.transition(StepState::Failed) {
			warn!(step = %ctx.step(), error = %transition, "could not mark step as failed");
		}
	}

	ctx.set_output_done();
	step.dispose(ctx);

	if let Err(transition) = ctx.transition(StepState::Done) {
		warn!(step = %ctx.step(), error = %transition, "could not mark step as done");
	}

	debug!(
		step = %ctx.step(),
		read = ctx.counters().lines_read,
		written = ctx.counters().lines_written,
		errors = ctx.counters().errors,
		"step finished"
	);

	StepReport::from_context(ctx, failure)
}

/// Handle to a step copy running on its own thread.
pub struct StepHandle {
	step: StepRef,
	join_handle: thread::JoinHandle<StepReport>,
}

impl StepHandle {
	pub fn step(&self) -> &StepRef {
		&self.step
	}

	pub fn is_finished(&self) -> bool {
		self.join_handle.is_finished()
	}

	/// Wait for the copy to finish. A panicking copy yields a failed report.
	pub fn join(self) -> StepReport {
		match self.join_handle.join() {
			Ok(report) => report,
			Err(_) => {
				let err: Error = StepError::Panicked {
					step: self.step.to_string(),
				}
				.into();
				error!(step = %self.step, "step thread panicked");
				StepReport {
					step: self.step,
					state: StepState::Failed,
					counters: StepCounters {
						errors: 1,
						..StepCounters::default()
					},
					log_channel: None,
					error: Some(err),
				}
			}
		}
	}
}

/// Run an initialized copy on a new named thread.
pub fn spawn_step(mut step: Box<dyn Step>, mut ctx: StepContext) -> Result<StepHandle> {
	let step_ref = ctx.step().clone();
	let thread_name = step_ref.to_string();

	let join_handle = thread::Builder::new()
		.name(thread_name)
		.spawn(move || run_step(step.as_mut(), &mut ctx))
		.map_err(|e| rowflow_type::error!(internal_error!("failed to spawn thread for {}: {}", step_ref, e)))?;

	Ok(StepHandle {
		step: step_ref,
		join_handle,
	})
}
