// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::Result;
use tracing::{debug, instrument};

use crate::{
	job::{Job, JobContext, JobParameterDefinition},
	result::ExecutionResult,
};

/// One unit of work inside a job.
pub trait JobEntry: Send + Sync {
	fn name(&self) -> &str;

	fn execute(&self, ctx: &mut JobContext, previous: ExecutionResult) -> Result<ExecutionResult>;
}

/// A job entry backed by a closure.
pub struct FnEntry<F> {
	name: String,
	f: F,
}

impl<F> FnEntry<F>
where
	F: Fn(&mut JobContext, ExecutionResult) -> Result<ExecutionResult> + Send + Sync,
{
	pub fn new(name: impl Into<String>, f: F) -> Self {
		Self {
			name: name.into(),
			f,
		}
	}
}

impl<F> JobEntry for FnEntry<F>
where
	F: Fn(&mut JobContext, ExecutionResult) -> Result<ExecutionResult> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn execute(&self, ctx: &mut JobContext, previous: ExecutionResult) -> Result<ExecutionResult> {
		(self.f)(ctx, previous)
	}
}

/// Runs its entries one after the other, passing each entry the result of
/// the previous one. A failed entry or a raised stop flag ends the job.
pub struct SequentialJob {
	name: String,
	parameters: Vec<JobParameterDefinition>,
	entries: Vec<Box<dyn JobEntry>>,
}

impl SequentialJob {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			parameters: vec![],
			entries: vec![],
		}
	}

	pub fn with_parameter(mut self, parameter: JobParameterDefinition) -> Self {
		self.parameters.push(parameter);
		self
	}

	pub fn with_entry(mut self, entry: impl JobEntry + 'static) -> Self {
		self.entries.push(Box::new(entry));
		self
	}

	pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&mut JobContext, ExecutionResult) -> Result<ExecutionResult> + Send + Sync + 'static,
	{
		self.with_entry(FnEntry::new(name, f))
	}
}

impl Job for SequentialJob {
	fn name(&self) -> &str {
		&self.name
	}

	fn parameters(&self) -> &[JobParameterDefinition] {
		&self.parameters
	}

	#[instrument(name = "job::execute", level = "debug", skip_all, fields(job = %self.name))]
	fn execute(&self, ctx: &mut JobContext, previous: ExecutionResult) -> Result<ExecutionResult> {
		let mut result = previous;
		result.result = true;
		result.log_channel = Some(ctx.log_channel());

		ctx.log_line(format!("starting job '{}'", self.name));

		for entry in &self.entries {
			if ctx.is_stopped() {
				ctx.log_line(format!("job '{}' stopped before entry '{}'", self.name, entry.name()));
				result.stopped = true;
				result.result = false;
				break;
			}

			debug!(entry = entry.name(), "running job entry");
			ctx.log_line(format!("starting entry '{}'", entry.name()));

			result = entry.execute(ctx, result)?;
			result.log_channel = Some(ctx.log_channel());

			if !result.result {
				ctx.log_line(format!("entry '{}' failed", entry.name()));
				break;
			}
		}

		ctx.log_line(format!("job '{}' finished, result={}", self.name, result.result));
		Ok(result)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use super::*;
	use crate::{log::LogContext, stop::StopFlag, variables::Variables};

	fn context(log: &LogContext, stop: &StopFlag) -> JobContext {
		JobContext::new(Variables::new(), log.clone(), stop.clone())
	}

	#[test]
	fn test_empty_job_succeeds() {
		let log = LogContext::new();
		let job = SequentialJob::new("empty");
		let result = job.execute(&mut context(&log, &StopFlag::new()), ExecutionResult::new()).unwrap();
		assert!(result.result);
		assert_eq!(result.nr_errors, 0);
	}

	#[test]
	fn test_failed_entry_ends_job() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();

		let job = SequentialJob::new("two-steps")
			.with_fn("fail", |_ctx, previous| {
				Ok(ExecutionResult {
					nr_errors: 1,
					..previous
				}
				.into_failure())
			})
			.with_fn("never", move |_ctx, previous| {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(previous)
			});

		let log = LogContext::new();
		let mut ctx = context(&log, &StopFlag::new());
		let result = job.execute(&mut ctx, ExecutionResult::new()).unwrap();

		assert!(!result.result);
		assert_eq!(result.nr_errors, 1);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(log.read_all(ctx.log_channel()).contains("entry 'fail' failed"));
	}

	#[test]
	fn test_stop_flag_ends_job() {
		let stop = StopFlag::new();
		let job = SequentialJob::new("stoppable").with_fn("stop", |ctx, previous| {
			ctx.stop_flag().stop();
			Ok(previous)
		});
		let job = job.with_fn("after", |_ctx, _previous| panic!("must not run"));

		let log = LogContext::new();
		let result = job.execute(&mut context(&log, &stop), ExecutionResult::new()).unwrap();
		assert!(result.stopped);
		assert!(!result.result);
	}

	#[test]
	fn test_entries_see_source_rows() {
		use rowflow_type::{FieldMeta, RowMeta, ValueType, row};

		let job = SequentialJob::new("count").with_fn("count", |ctx, mut previous| {
			previous.lines_input = ctx.source_rows().len() as u64;
			Ok(previous)
		});

		let meta = Arc::new(RowMeta::new(vec![FieldMeta::new("id", ValueType::Integer)]));
		let log = LogContext::new();
		let mut ctx = context(&log, &StopFlag::new()).with_source_rows(meta, vec![row![1i64], row![2i64]]);
		let result = job.execute(&mut ctx, ExecutionResult::new()).unwrap();
		assert_eq!(result.lines_input, 2);
	}
}
