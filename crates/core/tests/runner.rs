// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Lifecycle of step copies driven by the runner

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use rowflow_core::{
	RowSet, Step, StepContext, StepEnvironment, StepError, StepRef, StepState, StopFlag,
	step::{dispose_step, init_step, run_step, spawn_step},
};
use rowflow_type::{FieldMeta, Result, RowMeta, ValueType, row};

const WAIT: Duration = Duration::from_millis(2);

fn meta() -> Arc<RowMeta> {
	Arc::new(RowMeta::new(vec![FieldMeta::new("n", ValueType::Integer)]))
}

fn environment() -> StepEnvironment {
	let mut environment = StepEnvironment::new();
	environment.row_wait_timeout = WAIT;
	environment
}

/// Copies its input to its output, optionally failing on one value.
struct Relay {
	fail_on: Option<i64>,
	disposed: Arc<AtomicBool>,
	fail_init: bool,
}

impl Relay {
	fn new(disposed: Arc<AtomicBool>) -> Self {
		Self {
			fail_on: None,
			disposed,
			fail_init: false,
		}
	}
}

impl Step for Relay {
	fn init(&mut self, ctx: &mut StepContext) -> Result<()> {
		if self.fail_init {
			return Err(StepError::InvalidConfiguration {
				step: ctx.name().to_string(),
				reason: "bad setting".to_string(),
			}
			.into());
		}
		Ok(())
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		let Some((meta, row)) = ctx.get_row() else {
			ctx.set_output_done();
			return Ok(false);
		};

		if row[0].as_integer() == self.fail_on {
			return Err(StepError::RowProcessing {
				step: ctx.name().to_string(),
				reason: format!("cannot handle {}", row[0]),
			}
			.into());
		}

		ctx.put_row(&meta, row)?;
		Ok(true)
	}

	fn dispose(&mut self, _ctx: &mut StepContext) {
		self.disposed.store(true, Ordering::SeqCst);
	}
}

fn wire(env: &StepEnvironment) -> (StepContext, Arc<RowSet>, Arc<RowSet>) {
	let input = Arc::new(RowSet::new(StepRef::new("source", 0), StepRef::new("relay", 0), 64));
	let output = Arc::new(RowSet::new(StepRef::new("relay", 0), StepRef::new("sink", 0), 64));

	let mut ctx = StepContext::new(StepRef::new("relay", 0), env);
	ctx.add_input(input.clone());
	ctx.add_output(output.clone());
	(ctx, input, output)
}

#[test]
fn test_run_to_completion() {
	let env = environment();
	let (mut ctx, input, output) = wire(&env);
	let disposed = Arc::new(AtomicBool::new(false));
	let mut step = Relay::new(disposed.clone());

	let meta = meta();
	let stop = StopFlag::new();
	for i in 0..3i64 {
		input.put_row(&meta, row![i], &stop, WAIT).unwrap();
	}
	input.set_done();

	init_step(&mut step, &mut ctx).unwrap();
	let report = run_step(&mut step, &mut ctx);

	assert!(report.error.is_none());
	assert_eq!(report.state, StepState::Done);
	assert_eq!(report.counters.lines_read, 3);
	assert_eq!(report.counters.lines_written, 3);
	assert!(output.is_done());
	assert!(disposed.load(Ordering::SeqCst));
	assert!(!env.stop.is_stopped());
}

#[test]
fn test_row_failure_stops_execution() {
	let env = environment();
	let (mut ctx, input, output) = wire(&env);
	let disposed = Arc::new(AtomicBool::new(false));
	let mut step = Relay {
		fail_on: Some(1),
		..Relay::new(disposed.clone())
	};

	let meta = meta();
	let stop = StopFlag::new();
	for i in 0..3i64 {
		input.put_row(&meta, row![i], &stop, WAIT).unwrap();
	}
	input.set_done();

	init_step(&mut step, &mut ctx).unwrap();
	let report = run_step(&mut step, &mut ctx);

	let err = report.error.unwrap();
	assert_eq!(err.code(), "ROW_001");
	assert_eq!(err.step.as_deref(), Some("relay"));
	assert_eq!(report.counters.errors, 1);
	assert_eq!(output.rows_written(), 1);
	assert!(output.is_done());
	assert!(disposed.load(Ordering::SeqCst));
	assert!(env.stop.is_stopped());
}

#[test]
fn test_init_failure_still_disposes() {
	let env = environment();
	let (mut ctx, _input, output) = wire(&env);
	let disposed = Arc::new(AtomicBool::new(false));
	let mut step = Relay {
		fail_init: true,
		..Relay::new(disposed.clone())
	};

	let err = init_step(&mut step, &mut ctx).unwrap_err();
	assert_eq!(err.code(), "CONFIG_001");
	assert_eq!(ctx.state(), StepState::Failed);

	let report = dispose_step(&mut step, &mut ctx);
	assert_eq!(report.state, StepState::Done);
	assert!(disposed.load(Ordering::SeqCst));
	assert!(output.is_done());
}

#[test]
fn test_stop_ends_blocked_step() {
	let env = environment();
	let (mut ctx, _input, output) = wire(&env);
	let disposed = Arc::new(AtomicBool::new(false));
	let mut step = Relay::new(disposed.clone());

	init_step(&mut step, &mut ctx).unwrap();
	let handle = spawn_step(Box::new(step), ctx).unwrap();

	std::thread::sleep(Duration::from_millis(20));
	assert!(!handle.is_finished());

	env.stop.stop();
	let report = handle.join();

	assert!(report.error.is_none());
	assert_eq!(report.state, StepState::Done);
	assert!(output.is_done());
	assert!(disposed.load(Ordering::SeqCst));
}
