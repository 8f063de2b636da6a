// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Runs a job once per group of input rows.
//!
//! The group is the job's complete input. The outcome of every execution
//! fans out to up to three outputs: one summary row per execution, the rows
//! the job returned, and one row per file the job reported.

use std::sync::Arc;

use rowflow_core::{
	ExecutionResult, Step, StepContext, StepError, Variables,
	job::{Job, JobContext, JobResolver},
};
use rowflow_type::{
	Error, IntoDiagnostic, Result, Row, RowMeta,
	error::diagnostic::schema::{field_type_mismatch, row_arity_mismatch},
	internal_error,
};
use tracing::{debug, info, instrument, warn};

mod config;

pub use config::{
	ExecutionField, ExecutionResultFields, ExecutionSummary, JobExecutorConfig, JobExecutorParameters,
	ParameterMapping,
};

use crate::grouping::{Group, GroupBuffer, GroupPolicy};

pub struct JobExecutorStep {
	config: JobExecutorConfig,
	resolver: Arc<dyn JobResolver>,
	job: Option<Arc<dyn Job>>,
	buffer: Option<GroupBuffer>,
	execution_meta: Arc<RowMeta>,
	rows_meta: Arc<RowMeta>,
	files_meta: Arc<RowMeta>,
	executions: u64,
	failed_executions: u64,
}

impl JobExecutorStep {
	pub fn new(config: JobExecutorConfig, resolver: Arc<dyn JobResolver>) -> Self {
		let execution_meta = Arc::new(config.execution_result_fields.meta());
		let rows_meta = Arc::new(config.result_rows_meta());
		let files_meta = Arc::new(config.result_files_meta());

		Self {
			config,
			resolver,
			job: None,
			buffer: None,
			execution_meta,
			rows_meta,
			files_meta,
			executions: 0,
			failed_executions: 0,
		}
	}

	pub fn config(&self) -> &JobExecutorConfig {
		&self.config
	}

	/// Number of buffered rows not yet handed to the job.
	pub fn buffered(&self) -> usize {
		self.buffer.as_ref().map(GroupBuffer::len).unwrap_or(0)
	}

	pub fn executions(&self) -> u64 {
		self.executions
	}

	fn job_variables(&self, ctx: &StepContext, job: &dyn Job, group: &Group) -> Result<Variables> {
		let mut variables = Variables::new();
		if self.config.parameters.inherit_all_variables {
			variables.inherit(ctx.variables());
		}

		let mut configured = Variables::new();
		for mapping in &self.config.parameters.parameters {
			let value = match (&mapping.field, &mapping.value) {
				(Some(field), _) if !field.is_empty() => {
					let Some(index) = group.meta.index_of(field) else {
						return Err(StepError::FieldNotFound {
							step: ctx.name().to_string(),
							field: field.clone(),
						}
						.into());
					};

					match group.rows.first().and_then(|row| row.get(index)) {
						Some(value) if !value.is_null() => value.to_string(),
						_ => String::new(),
					}
				}
				(_, Some(value)) => ctx.variables().substitute(value),
				_ => String::new(),
			};
			configured.set(mapping.variable.clone(), value);
		}

		for parameter in job.parameters() {
			match configured.get(&parameter.name) {
				Some(value) if !value.is_empty() => {}
				_ => {
					if let Some(default) = &parameter.default_value {
						configured.set(parameter.name.clone(), ctx.variables().substitute(default));
					}
				}
			}
		}

		variables.inherit(&configured);
		Ok(variables)
	}

	#[instrument(name = "job_executor::execute", level = "debug", skip_all, fields(step = %ctx.step(), rows = group.len()))]
	fn execute(&mut self, ctx: &mut StepContext, group: Group) -> Result<()> {
		let Some(job) = self.job.clone() else {
			return Err(rowflow_type::error!(internal_error!("job executor {} has no job", ctx.step())));
		};

		let variables = self.job_variables(ctx, job.as_ref(), &group)?;
		let started_at = group.started_at;
		let mut job_ctx = JobContext::new(variables, ctx.log().clone(), ctx.stop_flag().child())
			.with_source_rows(group.meta, group.rows);
		let channel = job_ctx.log_channel();

		self.executions += 1;
		let result = match job.execute(&mut job_ctx, ExecutionResult::new()) {
			Ok(result) => result,
			Err(err) => {
				warn!(step = %ctx.step(), job = job.name(), error = %err, "job execution failed");
				job_ctx.log_line(format!("job '{}' failed: {}", job.name(), err));
				ExecutionResult {
					log_channel: Some(channel),
					..ExecutionResult::new()
				}
				.into_failure()
			}
		};

		if !result.result {
			self.failed_executions += 1;
		}

		let elapsed_millis = ctx.now_millis() - started_at;
		let log_text = ctx.log().read_all(channel);
		ctx.log().discard(channel);

		debug!(
			step = %ctx.step(),
			result = result.result,
			errors = result.nr_errors,
			rows = result.rows.len(),
			files = result.files.len(),
			elapsed_millis,
			"job executed"
		);

		let rows = self.conform_result_rows(&result)?;
		self.emit_execution_result(ctx, &result, elapsed_millis, &log_text, channel.to_string())?;
		self.emit_result_rows(ctx, rows)?;
		self.emit_result_files(ctx, &result)?;
		Ok(())
	}

	fn emit_execution_result(
		&self,
		ctx: &mut StepContext,
		result: &ExecutionResult,
		elapsed_millis: i64,
		log_text: &str,
		channel: String,
	) -> Result<()> {
		let Some(target) = &self.config.execution_result_target else {
			return Ok(());
		};

		let summary = ExecutionSummary {
			result,
			elapsed_millis,
			log_text,
			log_channel_id: result.log_channel.map(|c| c.to_string()).unwrap_or(channel),
		};
		let row = Row::new(self.config.execution_result_fields.values(&summary));
		ctx.put_row_to_step(target, &self.execution_meta, row)
	}

	/// Every result row in the declared layout, checked before anything of
	/// the execution is emitted.
	fn conform_result_rows(&self, result: &ExecutionResult) -> Result<Vec<Row>> {
		if self.config.result_rows_target.is_none() {
			return Ok(vec![]);
		}

		result.rows.iter().map(|r| self.conform_result_row(&r.meta, &r.row)).collect()
	}

	fn emit_result_rows(&self, ctx: &mut StepContext, rows: Vec<Row>) -> Result<()> {
		let Some(target) = &self.config.result_rows_target else {
			return Ok(());
		};

		for row in rows {
			ctx.put_row_to_step(target, &self.rows_meta, row)?;
		}
		Ok(())
	}

	/// Copy the declared fields of a job result row, position by position.
	/// A declared type that differs from the job's type is an error.
	fn conform_result_row(&self, meta: &RowMeta, row: &Row) -> Result<Row> {
		let declared = &self.rows_meta;
		if row.len() < declared.len() {
			return Err(Error::new(row_arity_mismatch(declared.len(), row.len())));
		}

		let mut output = Row::with_capacity(declared.len());
		for (index, field) in declared.fields.iter().enumerate() {
			let value = &row[index];
			let actual = meta.field(index).map(|f| f.value_type).or_else(|| value.value_type());

			let value_matches = value.value_type().is_none_or(|t| t == field.value_type);
			if actual != Some(field.value_type) || !value_matches {
				return Err(Error::new(field_type_mismatch(&field.name, field.value_type, actual)));
			}
			output.push(value.clone());
		}
		Ok(output)
	}

	fn emit_result_files(&self, ctx: &mut StepContext, result: &ExecutionResult) -> Result<()> {
		let Some(target) = &self.config.result_files_target else {
			return Ok(());
		};

		for file in &result.files {
			let row = Row::new(vec![file.path.as_str().into()]);
			ctx.put_row_to_step(target, &self.files_meta, row)?;
		}
		Ok(())
	}
}

impl Step for JobExecutorStep {
	fn init(&mut self, ctx: &mut StepContext) -> Result<()> {
		let job = self.resolver.resolve(&self.config.specification, ctx.variables()).map_err(|err| {
			let reason = format!("unable to load job {}", self.config.specification);
			Error::new(
				StepError::InvalidConfiguration {
					step: ctx.name().to_string(),
					reason,
				}
				.into_diagnostic()
				.with_cause(err.diagnostic()),
			)
		})?;

		for target in self.config.targets() {
			if !ctx.has_output_to(target) {
				return Err(StepError::TargetNotConnected {
					step: ctx.name().to_string(),
					target: target.to_string(),
				}
				.into());
			}
		}

		let policy = GroupPolicy::select(
			self.config.group_size,
			self.config.group_field.as_deref(),
			self.config.group_time_ms,
		);
		debug!(step = %ctx.step(), job = job.name(), policy = ?policy, "job executor initialized");

		self.buffer = Some(GroupBuffer::new(ctx.name(), policy));
		self.job = Some(job);
		Ok(())
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		let Some(buffer) = self.buffer.as_mut() else {
			return Err(rowflow_type::error!(internal_error!("job executor {} is not initialized", ctx.step())));
		};

		match ctx.get_row() {
			Some((meta, row)) => {
				let now = ctx.now_millis();
				if let Some(group) = buffer.push(&meta, row, now)? {
					self.execute(ctx, group)?;
				}
				Ok(true)
			}
			None => {
				if !ctx.is_stopped() {
					if let Some(group) = buffer.finish() {
						self.execute(ctx, group)?;
					}
				}
				ctx.set_output_done();
				Ok(false)
			}
		}
	}

	fn dispose(&mut self, ctx: &mut StepContext) {
		if let Some(buffer) = self.buffer.as_mut() {
			buffer.clear();
		}
		self.buffer = None;
		self.job = None;

		info!(
			step = %ctx.step(),
			executions = self.executions,
			failed = self.failed_executions,
			"job executor finished"
		);
		ctx.log_line(format!("{} executions, {} failed", self.executions, self.failed_executions));
	}
}
