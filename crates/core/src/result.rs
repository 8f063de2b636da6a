// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	sync::Arc,
};

use rowflow_type::{Row, RowMeta};
use serde::{Deserialize, Serialize};

use crate::log::LogChannelId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFileKind {
	General,
	Log,
	Error,
	Warning,
}

impl Display for ResultFileKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ResultFileKind::General => f.write_str("general"),
			ResultFileKind::Log => f.write_str("log"),
			ResultFileKind::Error => f.write_str("error"),
			ResultFileKind::Warning => f.write_str("warning"),
		}
	}
}

/// A file a job reports as part of its result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultFile {
	pub kind: ResultFileKind,
	pub path: String,
	pub origin_parent: Option<String>,
	pub origin: Option<String>,
}

impl ResultFile {
	pub fn new(kind: ResultFileKind, path: impl Into<String>) -> Self {
		Self {
			kind,
			path: path.into(),
			origin_parent: None,
			origin: None,
		}
	}

	pub fn with_origin(mut self, parent: impl Into<String>, origin: impl Into<String>) -> Self {
		self.origin_parent = Some(parent.into());
		self.origin = Some(origin.into());
		self
	}
}

/// A row a job hands back to its caller, with its own layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
	pub meta: Arc<RowMeta>,
	pub row: Row,
}

impl ResultRow {
	pub fn new(meta: Arc<RowMeta>, row: Row) -> Self {
		Self {
			meta,
			row,
		}
	}
}

/// Outcome of one job execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionResult {
	pub result: bool,
	pub nr_errors: u64,
	pub lines_read: u64,
	pub lines_written: u64,
	pub lines_input: u64,
	pub lines_output: u64,
	pub lines_rejected: u64,
	pub lines_updated: u64,
	pub lines_deleted: u64,
	pub files_retrieved: u64,
	pub exit_status: i32,
	pub rows: Vec<ResultRow>,
	pub files: Vec<ResultFile>,
	pub log_channel: Option<LogChannelId>,
	pub stopped: bool,
}

impl ExecutionResult {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mark this result as failed with at least one error.
	pub fn into_failure(mut self) -> Self {
		self.result = false;
		self.nr_errors = self.nr_errors.max(1);
		self
	}

	pub fn add_row(&mut self, meta: Arc<RowMeta>, row: Row) {
		self.rows.push(ResultRow::new(meta, row));
	}

	pub fn add_file(&mut self, file: ResultFile) {
		self.files.push(file);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_into_failure_keeps_higher_error_count() {
		let mut result = ExecutionResult::new();
		result.result = true;
		assert_eq!(result.clone().into_failure().nr_errors, 1);

		result.nr_errors = 4;
		let failed = result.into_failure();
		assert!(!failed.result);
		assert_eq!(failed.nr_errors, 4);
	}
}
