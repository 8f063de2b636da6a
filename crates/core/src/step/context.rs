// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Local;
use rowflow_type::{Result, Row, RowMeta};
use serde::{Deserialize, Serialize};

use crate::{
	clock::{Clock, SystemClock},
	error::StepError,
	log::{LogChannelId, LogContext},
	rowset::{RowPair, RowSet, StepRef},
	step::StepState,
	stop::StopFlag,
	variables::Variables,
};

/// Default time a blocked read or write waits before re-checking the stop flag.
pub const DEFAULT_ROW_WAIT_TIMEOUT: Duration = Duration::from_millis(50);

/// What every step copy of one execution shares.
#[derive(Clone)]
pub struct StepEnvironment {
	pub variables: Variables,
	pub log: LogContext,
	pub clock: Arc<dyn Clock>,
	pub stop: StopFlag,
	pub row_wait_timeout: Duration,
}

impl StepEnvironment {
	pub fn new() -> Self {
		Self {
			variables: Variables::new(),
			log: LogContext::new(),
			clock: Arc::new(SystemClock),
			stop: StopFlag::new(),
			row_wait_timeout: DEFAULT_ROW_WAIT_TIMEOUT,
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}
}

impl Default for StepEnvironment {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
	/// Rows read from input row sets
	pub lines_read: u64,
	/// Rows written to output row sets
	pub lines_written: u64,
	/// Rows read from an external source
	pub lines_input: u64,
	/// Rows written to an external target
	pub lines_output: u64,
	pub lines_updated: u64,
	pub lines_rejected: u64,
	pub errors: u64,
}

/// Runtime handle of one step copy: its row sets, variables, log channel,
/// stop flag and counters.
pub struct StepContext {
	step: StepRef,
	inputs: Vec<Arc<RowSet>>,
	active_inputs: Vec<Arc<RowSet>>,
	input_cursor: usize,
	outputs: Vec<Arc<RowSet>>,
	output_cursor: usize,
	target_cursors: HashMap<String, usize>,
	variables: Variables,
	log: LogContext,
	log_channel: LogChannelId,
	clock: Arc<dyn Clock>,
	stop: StopFlag,
	execution_stop: StopFlag,
	row_wait_timeout: Duration,
	counters: StepCounters,
	state: StepState,
}

impl StepContext {
	pub fn new(step: StepRef, environment: &StepEnvironment) -> Self {
		Self {
			step,
			inputs: vec![],
			active_inputs: vec![],
			input_cursor: 0,
			outputs: vec![],
			output_cursor: 0,
			target_cursors: HashMap::new(),
			variables: environment.variables.clone(),
			log: environment.log.clone(),
			log_channel: environment.log.open_channel(),
			clock: environment.clock.clone(),
			stop: environment.stop.child(),
			execution_stop: environment.stop.clone(),
			row_wait_timeout: environment.row_wait_timeout,
			counters: StepCounters::default(),
			state: StepState::Created,
		}
	}

	pub fn add_input(&mut self, rowset: Arc<RowSet>) {
		self.inputs.push(rowset.clone());
		self.active_inputs.push(rowset);
	}

	pub fn add_output(&mut self, rowset: Arc<RowSet>) {
		self.outputs.push(rowset);
	}

	pub fn step(&self) -> &StepRef {
		&self.step
	}

	pub fn name(&self) -> &str {
		&self.step.name
	}

	pub fn copy(&self) -> usize {
		self.step.copy
	}

	pub fn inputs(&self) -> &[Arc<RowSet>] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[Arc<RowSet>] {
		&self.outputs
	}

	/// Read the next row from the input row sets, rotating over them.
	///
	/// Returns `None` once every input is done and drained, or when the step
	/// is stopped.
	pub fn get_row(&mut self) -> Option<RowPair> {
		loop {
			if self.is_stopped() || self.active_inputs.is_empty() {
				return None;
			}

			let index = self.input_cursor % self.active_inputs.len();
			let rowset = self.active_inputs[index].clone();

			match rowset.get_row(self.row_wait_timeout) {
				Some(pair) => {
					self.input_cursor = index + 1;
					self.counters.lines_read += 1;
					return Some(pair);
				}
				None if rowset.is_finished() => {
					self.active_inputs.remove(index);
					self.input_cursor = index;
				}
				None => self.input_cursor = index + 1,
			}
		}
	}

	/// Write a row to the next output row set in rotation. Rows are dropped
	/// when the step has no outputs.
	pub fn put_row(&mut self, meta: &Arc<RowMeta>, row: Row) -> Result<()> {
		if self.outputs.is_empty() {
			return Ok(());
		}

		let index = self.output_cursor % self.outputs.len();
		self.output_cursor = index + 1;

		let rowset = self.outputs[index].clone();
		self.put_row_to(&rowset, meta, row)
	}

	/// Write a row to one of the row sets leading to `target`, rotating over
	/// its copies.
	pub fn put_row_to_step(&mut self, target: &str, meta: &Arc<RowMeta>, row: Row) -> Result<()> {
		let candidates: Vec<Arc<RowSet>> =
			self.outputs.iter().filter(|rs| rs.destination().name == target).cloned().collect();

		if candidates.is_empty() {
			return Err(StepError::TargetNotConnected {
				step: self.step.name.clone(),
				target: target.to_string(),
			}
			.into());
		}

		let cursor = self.target_cursors.entry(target.to_string()).or_insert(0);
		let index = *cursor % candidates.len();
		*cursor = index + 1;

		self.put_row_to(&candidates[index], meta, row)
	}

	pub fn put_row_to(&mut self, rowset: &Arc<RowSet>, meta: &Arc<RowMeta>, row: Row) -> Result<()> {
		if rowset.put_row(meta, row, &self.stop, self.row_wait_timeout)? {
			self.counters.lines_written += 1;
		}
		Ok(())
	}

	pub fn has_output_to(&self, target: &str) -> bool {
		self.outputs.iter().any(|rs| rs.destination().name == target)
	}

	pub fn set_output_done(&self) {
		for rowset in &self.outputs {
			rowset.set_done();
		}
	}

	pub fn variables(&self) -> &Variables {
		&self.variables
	}

	pub fn variables_mut(&mut self) -> &mut Variables {
		&mut self.variables
	}

	pub fn log(&self) -> &LogContext {
		&self.log
	}

	pub fn log_channel(&self) -> LogChannelId {
		self.log_channel
	}

	/// Append a line to this copy's captured log.
	pub fn log_line(&self, message: impl AsRef<str>) {
		let line = format!("{} - {} - {}", Local::now().format("%Y/%m/%d %H:%M:%S"), self.step, message.as_ref());
		self.log.append_line(self.log_channel, line);
	}

	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	pub fn now_millis(&self) -> i64 {
		self.clock.now_millis()
	}

	pub fn stop_flag(&self) -> &StopFlag {
		&self.stop
	}

	pub fn is_stopped(&self) -> bool {
		self.stop.is_stopped()
	}

	/// Stop this copy only.
	pub fn stop(&self) {
		self.stop.stop();
	}

	/// Stop every step of the execution this copy belongs to.
	pub fn stop_execution(&self) {
		self.execution_stop.stop();
	}

	pub fn counters(&self) -> &StepCounters {
		&self.counters
	}

	pub fn counters_mut(&mut self) -> &mut StepCounters {
		&mut self.counters
	}

	pub fn state(&self) -> StepState {
		self.state
	}

	pub fn transition(&mut self, next: StepState) -> Result<()> {
		if !self.state.can_transition_to(next) {
			return Err(StepError::InvalidTransition {
				step: self.step.to_string(),
				from: self.state,
				to: next,
			}
			.into());
		}
		self.state = next;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use rowflow_type::{FieldMeta, ValueType, row};

	use super::*;

	const CAPACITY: usize = 16;

	fn meta() -> Arc<RowMeta> {
		Arc::new(RowMeta::new(vec![FieldMeta::new("n", ValueType::Integer)]))
	}

	fn environment() -> StepEnvironment {
		let mut environment = StepEnvironment::new();
		environment.row_wait_timeout = Duration::from_millis(2);
		environment
	}

	fn rowset(from: &str, to: &str, copy: usize) -> Arc<RowSet> {
		Arc::new(RowSet::new(StepRef::new(from, 0), StepRef::new(to, copy), CAPACITY))
	}

	#[test]
	fn test_put_row_round_robin() {
		let env = environment();
		let mut ctx = StepContext::new(StepRef::new("source", 0), &env);
		let first = rowset("source", "sink", 0);
		let second = rowset("source", "sink", 1);
		ctx.add_output(first.clone());
		ctx.add_output(second.clone());

		let meta = meta();
		for i in 0..4i64 {
			ctx.put_row(&meta, row![i]).unwrap();
		}

		assert_eq!(first.rows_written(), 2);
		assert_eq!(second.rows_written(), 2);
		assert_eq!(first.get_row(Duration::ZERO).unwrap().1, row![0i64]);
		assert_eq!(second.get_row(Duration::ZERO).unwrap().1, row![1i64]);
		assert_eq!(ctx.counters().lines_written, 4);
	}

	#[test]
	fn test_get_row_drains_every_input() {
		let env = environment();
		let mut ctx = StepContext::new(StepRef::new("sink", 0), &env);
		let a = rowset("a", "sink", 0);
		let b = rowset("b", "sink", 0);
		ctx.add_input(a.clone());
		ctx.add_input(b.clone());

		let meta = meta();
		let stop = StopFlag::new();
		a.put_row(&meta, row![1i64], &stop, Duration::ZERO).unwrap();
		b.put_row(&meta, row![2i64], &stop, Duration::ZERO).unwrap();
		b.put_row(&meta, row![3i64], &stop, Duration::ZERO).unwrap();
		a.set_done();
		b.set_done();

		let mut seen = vec![];
		while let Some((_, row)) = ctx.get_row() {
			seen.push(row[0].as_integer().unwrap());
		}
		seen.sort();
		assert_eq!(seen, vec![1, 2, 3]);
		assert_eq!(ctx.counters().lines_read, 3);
	}

	#[test]
	fn test_put_row_to_unknown_target() {
		let env = environment();
		let mut ctx = StepContext::new(StepRef::new("executor", 0), &env);
		ctx.add_output(rowset("executor", "results", 0));

		assert!(ctx.has_output_to("results"));
		let err = ctx.put_row_to_step("files", &meta(), row![1i64]).unwrap_err();
		assert_eq!(err.code(), "CONFIG_002");
	}

	#[test]
	fn test_stopped_step_reads_nothing() {
		let env = environment();
		let mut ctx = StepContext::new(StepRef::new("sink", 0), &env);
		let input = rowset("a", "sink", 0);
		input.put_row(&meta(), row![1i64], &StopFlag::new(), Duration::ZERO).unwrap();
		ctx.add_input(input);

		env.stop.stop();
		assert!(ctx.get_row().is_none());
	}

	#[test]
	fn test_invalid_transition_is_internal_error() {
		let env = environment();
		let mut ctx = StepContext::new(StepRef::new("s", 0), &env);
		let err = ctx.transition(StepState::Running).unwrap_err();
		assert_eq!(err.code(), "INTERNAL_ERROR");
	}

	#[test]
	fn test_log_line_goes_to_own_channel() {
		let env = environment();
		let ctx = StepContext::new(StepRef::new("lookup", 1), &env);
		ctx.log_line("cache warmed");
		assert!(env.log.read_all(ctx.log_channel()).ends_with("lookup.1 - cache warmed"));
	}
}
