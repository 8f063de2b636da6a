// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::{Duration, Instant};

use rowflow_core::{
	LogContext, StepState, StopFlag,
	step::{StepHandle, StepReport},
};
use rowflow_type::Error;
use tracing::{info, warn};

/// A started transformation: one thread per step copy.
pub struct Execution {
	name: String,
	handles: Vec<StepHandle>,
	stop: StopFlag,
	log: LogContext,
	started_at: Instant,
}

impl Execution {
	pub(crate) fn new(name: String, handles: Vec<StepHandle>, stop: StopFlag, log: LogContext) -> Self {
		Self {
			name,
			handles,
			stop,
			log,
			started_at: Instant::now(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Ask every step copy to stop. Blocked reads and writes notice within
	/// one wait timeout.
	pub fn stop(&self) {
		info!(transformation = %self.name, "stopping transformation");
		self.stop.stop();
	}

	pub fn is_stopped(&self) -> bool {
		self.stop.is_stopped()
	}

	pub fn is_finished(&self) -> bool {
		self.handles.iter().all(StepHandle::is_finished)
	}

	/// Wait for every copy and summarize.
	pub fn wait(self) -> ExecutionSummary {
		let stopped = self.stop.is_stopped();
		let steps: Vec<StepReport> = self.handles.into_iter().map(StepHandle::join).collect();

		let summary = ExecutionSummary {
			name: self.name,
			steps,
			stopped: stopped || self.stop.is_stopped(),
			elapsed: self.started_at.elapsed(),
			log: self.log,
		};

		if summary.is_success() {
			info!(
				transformation = %summary.name,
				steps = summary.steps.len(),
				elapsed_ms = summary.elapsed.as_millis() as u64,
				"transformation finished"
			);
		} else {
			warn!(
				transformation = %summary.name,
				errors = summary.errors(),
				elapsed_ms = summary.elapsed.as_millis() as u64,
				"transformation finished with errors"
			);
		}
		summary
	}
}

/// Outcome of a finished transformation.
pub struct ExecutionSummary {
	pub name: String,
	/// One report per step copy
	pub steps: Vec<StepReport>,
	/// Whether the execution was stopped, by request or by a failing step
	pub stopped: bool,
	pub elapsed: Duration,
	log: LogContext,
}

impl ExecutionSummary {
	pub fn errors(&self) -> u64 {
		self.steps.iter().map(|r| r.counters.errors).sum()
	}

	pub fn is_success(&self) -> bool {
		self.errors() == 0 && self.steps.iter().all(|r| r.error.is_none() && r.state == StepState::Done)
	}

	pub fn failures(&self) -> Vec<&Error> {
		self.steps.iter().filter_map(|r| r.error.as_ref()).collect()
	}

	pub fn reports(&self, step: &str) -> Vec<&StepReport> {
		self.steps.iter().filter(|r| r.step.name == step).collect()
	}

	/// Rows read by all copies of `step`.
	pub fn lines_read(&self, step: &str) -> u64 {
		self.reports(step).iter().map(|r| r.counters.lines_read).sum()
	}

	/// Rows written by all copies of `step`.
	pub fn lines_written(&self, step: &str) -> u64 {
		self.reports(step).iter().map(|r| r.counters.lines_written).sum()
	}

	/// Captured log lines of one copy.
	pub fn log_text(&self, report: &StepReport) -> String {
		report.log_channel.map(|channel| self.log.read_all(channel)).unwrap_or_default()
	}
}
