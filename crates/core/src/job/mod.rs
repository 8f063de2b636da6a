// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Jobs a step can run as a sub-execution.

use std::sync::Arc;

use chrono::Local;
use rowflow_type::{Result, Row, RowMeta};
use serde::{Deserialize, Serialize};

mod catalog;
mod sequential;

pub use catalog::{JobCatalog, JobResolver, JobSpecification};
pub use sequential::{FnEntry, JobEntry, SequentialJob};

use crate::{
	log::{LogChannelId, LogContext},
	result::ExecutionResult,
	stop::StopFlag,
	variables::Variables,
};

/// A named parameter a job declares, with the value used when the caller
/// does not set it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameterDefinition {
	pub name: String,
	#[serde(default)]
	pub default_value: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

impl JobParameterDefinition {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			default_value: None,
			description: None,
		}
	}

	pub fn with_default(mut self, value: impl Into<String>) -> Self {
		self.default_value = Some(value.into());
		self
	}
}

pub trait Job: Send + Sync {
	fn name(&self) -> &str;

	fn parameters(&self) -> &[JobParameterDefinition] {
		&[]
	}

	/// Run the job to completion on the calling thread, starting from
	/// `previous`.
	fn execute(&self, ctx: &mut JobContext, previous: ExecutionResult) -> Result<ExecutionResult>;
}

/// Everything one execution of a job sees: its variables, the rows it was
/// given as input, its log channel and its stop flag.
pub struct JobContext {
	variables: Variables,
	source_meta: Option<Arc<RowMeta>>,
	source_rows: Vec<Row>,
	log: LogContext,
	log_channel: LogChannelId,
	stop: StopFlag,
}

impl JobContext {
	pub fn new(variables: Variables, log: LogContext, stop: StopFlag) -> Self {
		let log_channel = log.open_channel();
		Self {
			variables,
			source_meta: None,
			source_rows: vec![],
			log,
			log_channel,
			stop,
		}
	}

	pub fn with_source_rows(mut self, meta: Arc<RowMeta>, rows: Vec<Row>) -> Self {
		self.source_meta = Some(meta);
		self.source_rows = rows;
		self
	}

	pub fn variables(&self) -> &Variables {
		&self.variables
	}

	pub fn variables_mut(&mut self) -> &mut Variables {
		&mut self.variables
	}

	pub fn variable(&self, name: &str) -> Option<&str> {
		self.variables.get(name)
	}

	pub fn source_meta(&self) -> Option<&Arc<RowMeta>> {
		self.source_meta.as_ref()
	}

	pub fn source_rows(&self) -> &[Row] {
		&self.source_rows
	}

	pub fn log_channel(&self) -> LogChannelId {
		self.log_channel
	}

	pub fn log_line(&self, message: impl AsRef<str>) {
		let line = format!("{} - {}", Local::now().format("%Y/%m/%d %H:%M:%S"), message.as_ref());
		self.log.append_line(self.log_channel, line);
	}

	pub fn stop_flag(&self) -> &StopFlag {
		&self.stop
	}

	pub fn is_stopped(&self) -> bool {
		self.stop.is_stopped()
	}
}
