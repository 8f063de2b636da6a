// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_core::{ExecutionResult, job::JobSpecification};
use rowflow_type::{FieldMeta, RowMeta, Value, ValueType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobExecutorConfig {
	pub specification: JobSpecification,

	/// Rows per execution, 0 when grouping by field or time
	#[serde(default)]
	pub group_size: usize,
	#[serde(default)]
	pub group_field: Option<String>,
	#[serde(default)]
	pub group_time_ms: u64,

	#[serde(default)]
	pub parameters: JobExecutorParameters,

	#[serde(default)]
	pub execution_result_target: Option<String>,
	#[serde(default)]
	pub execution_result_fields: ExecutionResultFields,

	#[serde(default)]
	pub result_rows_target: Option<String>,
	#[serde(default)]
	pub result_rows_fields: Vec<FieldMeta>,

	#[serde(default)]
	pub result_files_target: Option<String>,
	#[serde(default = "default_result_files_field")]
	pub result_files_field: String,
}

fn default_result_files_field() -> String {
	"FileName".to_string()
}

impl JobExecutorConfig {
	pub fn new(specification: JobSpecification) -> Self {
		Self {
			specification,
			group_size: 0,
			group_field: None,
			group_time_ms: 0,
			parameters: JobExecutorParameters::default(),
			execution_result_target: None,
			execution_result_fields: ExecutionResultFields::default(),
			result_rows_target: None,
			result_rows_fields: vec![],
			result_files_target: None,
			result_files_field: default_result_files_field(),
		}
	}

	/// Every configured output target.
	pub fn targets(&self) -> impl Iterator<Item = &str> {
		[&self.execution_result_target, &self.result_rows_target, &self.result_files_target]
			.into_iter()
			.filter_map(|t| t.as_deref())
	}

	/// Layout of the rows this step sends to `target`.
	pub fn output_meta(&self, target: &str) -> Option<RowMeta> {
		if self.result_rows_target.as_deref() == Some(target) {
			return Some(self.result_rows_meta());
		}

		if self.result_files_target.as_deref() == Some(target) {
			return Some(self.result_files_meta());
		}

		if self.execution_result_target.as_deref() == Some(target) {
			return Some(self.execution_result_fields.meta());
		}

		None
	}

	pub fn result_rows_meta(&self) -> RowMeta {
		RowMeta::new(self.result_rows_fields.clone())
	}

	pub fn result_files_meta(&self) -> RowMeta {
		RowMeta::new(vec![FieldMeta::new(&self.result_files_field, ValueType::String).with_length(255)])
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutorParameters {
	#[serde(default = "inherit_by_default")]
	pub inherit_all_variables: bool,
	#[serde(default)]
	pub parameters: Vec<ParameterMapping>,
}

fn inherit_by_default() -> bool {
	true
}

impl Default for JobExecutorParameters {
	fn default() -> Self {
		Self {
			inherit_all_variables: true,
			parameters: vec![],
		}
	}
}

/// A job variable set either from a field of the first row of the group or
/// from a static value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapping {
	pub variable: String,
	#[serde(default)]
	pub field: Option<String>,
	#[serde(default)]
	pub value: Option<String>,
}

impl ParameterMapping {
	pub fn from_field(variable: impl Into<String>, field: impl Into<String>) -> Self {
		Self {
			variable: variable.into(),
			field: Some(field.into()),
			value: None,
		}
	}

	pub fn from_value(variable: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			variable: variable.into(),
			field: None,
			value: Some(value.into()),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionField {
	Time,
	Result,
	NrErrors,
	LinesRead,
	LinesWritten,
	LinesInput,
	LinesOutput,
	LinesRejected,
	LinesUpdated,
	LinesDeleted,
	FilesRetrieved,
	ExitStatus,
	LogText,
	LogChannelId,
}

impl ExecutionField {
	fn meta(&self, name: &str) -> FieldMeta {
		match self {
			ExecutionField::Time => FieldMeta::new(name, ValueType::Integer).with_length(15),
			ExecutionField::Result => FieldMeta::new(name, ValueType::Boolean),
			ExecutionField::ExitStatus => FieldMeta::new(name, ValueType::Integer).with_length(3),
			ExecutionField::LogText => FieldMeta::new(name, ValueType::String),
			ExecutionField::LogChannelId => FieldMeta::new(name, ValueType::String).with_length(50),
			_ => FieldMeta::new(name, ValueType::Integer).with_length(9),
		}
	}
}

/// What one execution looks like as a row.
pub struct ExecutionSummary<'a> {
	pub result: &'a ExecutionResult,
	pub elapsed_millis: i64,
	pub log_text: &'a str,
	pub log_channel_id: String,
}

/// Names of the execution result fields. A field set to `None` is left out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResultFields {
	pub time: Option<String>,
	pub result: Option<String>,
	pub nr_errors: Option<String>,
	pub lines_read: Option<String>,
	pub lines_written: Option<String>,
	pub lines_input: Option<String>,
	pub lines_output: Option<String>,
	pub lines_rejected: Option<String>,
	pub lines_updated: Option<String>,
	pub lines_deleted: Option<String>,
	pub files_retrieved: Option<String>,
	pub exit_status: Option<String>,
	pub log_text: Option<String>,
	pub log_channel_id: Option<String>,
}

impl Default for ExecutionResultFields {
	fn default() -> Self {
		let name = |n: &str| Some(n.to_string());
		Self {
			time: name("ExecutionTime"),
			result: name("ExecutionResult"),
			nr_errors: name("ExecutionNrErrors"),
			lines_read: name("ExecutionLinesRead"),
			lines_written: name("ExecutionLinesWritten"),
			lines_input: name("ExecutionLinesInput"),
			lines_output: name("ExecutionLinesOutput"),
			lines_rejected: name("ExecutionLinesRejected"),
			lines_updated: name("ExecutionLinesUpdated"),
			lines_deleted: name("ExecutionLinesDeleted"),
			files_retrieved: name("ExecutionFilesRetrieved"),
			exit_status: name("ExecutionExitStatus"),
			log_text: name("ExecutionLogText"),
			log_channel_id: name("ExecutionLogChannelId"),
		}
	}
}

impl ExecutionResultFields {
	/// No fields at all.
	pub fn none() -> Self {
		Self {
			time: None,
			result: None,
			nr_errors: None,
			lines_read: None,
			lines_written: None,
			lines_input: None,
			lines_output: None,
			lines_rejected: None,
			lines_updated: None,
			lines_deleted: None,
			files_retrieved: None,
			exit_status: None,
			log_text: None,
			log_channel_id: None,
		}
	}

	/// Configured fields in their fixed order.
	pub fn enabled(&self) -> Vec<(ExecutionField, &str)> {
		let all = [
			(ExecutionField::Time, &self.time),
			(ExecutionField::Result, &self.result),
			(ExecutionField::NrErrors, &self.nr_errors),
			(ExecutionField::LinesRead, &self.lines_read),
			(ExecutionField::LinesWritten, &self.lines_written),
			(ExecutionField::LinesInput, &self.lines_input),
			(ExecutionField::LinesOutput, &self.lines_output),
			(ExecutionField::LinesRejected, &self.lines_rejected),
			(ExecutionField::LinesUpdated, &self.lines_updated),
			(ExecutionField::LinesDeleted, &self.lines_deleted),
			(ExecutionField::FilesRetrieved, &self.files_retrieved),
			(ExecutionField::ExitStatus, &self.exit_status),
			(ExecutionField::LogText, &self.log_text),
			(ExecutionField::LogChannelId, &self.log_channel_id),
		];

		all.into_iter()
			.filter_map(|(field, name)| name.as_deref().filter(|n| !n.is_empty()).map(|n| (field, n)))
			.collect()
	}

	pub fn meta(&self) -> RowMeta {
		self.enabled().into_iter().map(|(field, name)| field.meta(name)).collect()
	}

	pub fn values(&self, summary: &ExecutionSummary<'_>) -> Vec<Value> {
		let counter = |v: u64| Value::Integer(v.min(i64::MAX as u64) as i64);
		let result = summary.result;

		self.enabled()
			.into_iter()
			.map(|(field, _)| match field {
				ExecutionField::Time => Value::Integer(summary.elapsed_millis),
				ExecutionField::Result => Value::Boolean(result.result),
				ExecutionField::NrErrors => counter(result.nr_errors),
				ExecutionField::LinesRead => counter(result.lines_read),
				ExecutionField::LinesWritten => counter(result.lines_written),
				ExecutionField::LinesInput => counter(result.lines_input),
				ExecutionField::LinesOutput => counter(result.lines_output),
				ExecutionField::LinesRejected => counter(result.lines_rejected),
				ExecutionField::LinesUpdated => counter(result.lines_updated),
				ExecutionField::LinesDeleted => counter(result.lines_deleted),
				ExecutionField::FilesRetrieved => counter(result.files_retrieved),
				ExecutionField::ExitStatus => Value::Integer(result.exit_status as i64),
				ExecutionField::LogText => Value::string(summary.log_text),
				ExecutionField::LogChannelId => Value::string(summary.log_channel_id.clone()),
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> JobExecutorConfig {
		let mut config = JobExecutorConfig::new(JobSpecification::Filename {
			filename: "child.kjb".to_string(),
		});
		config.execution_result_target = Some("results".to_string());
		config.result_rows_target = Some("rows".to_string());
		config.result_rows_fields = vec![FieldMeta::new("customer", ValueType::String)];
		config.result_files_target = Some("files".to_string());
		config
	}

	#[test]
	fn test_output_meta_per_target() {
		let config = config();

		let rows = config.output_meta("rows").unwrap();
		assert_eq!(rows.to_string(), "customer:string");

		let files = config.output_meta("files").unwrap();
		assert_eq!(files.to_string(), "FileName:string");

		let results = config.output_meta("results").unwrap();
		assert_eq!(results.len(), 14);
		assert_eq!(results.field(0).unwrap().name, "ExecutionTime");
		assert_eq!(results.field(1).unwrap().value_type, ValueType::Boolean);
		assert_eq!(results.field(13).unwrap().length, Some(50));

		assert!(config.output_meta("elsewhere").is_none());
	}

	#[test]
	fn test_subset_keeps_canonical_order() {
		let mut fields = ExecutionResultFields::none();
		fields.log_text = Some("log".to_string());
		fields.result = Some("ok".to_string());
		fields.nr_errors = Some("errors".to_string());

		assert_eq!(fields.meta().to_string(), "ok:boolean, errors:integer, log:string");

		let mut result = ExecutionResult::new();
		result.result = true;
		let summary = ExecutionSummary {
			result: &result,
			elapsed_millis: 12,
			log_text: "done",
			log_channel_id: "id".to_string(),
		};
		assert_eq!(fields.values(&summary), vec![Value::Boolean(true), Value::Integer(0), Value::string("done")]);
	}

	#[test]
	fn test_deserialize_with_defaults() {
		let config: JobExecutorConfig = serde_json::from_str(
			r#"{
				"specification": {"method": "filename", "filename": "child.kjb"},
				"group_size": 5,
				"execution_result_fields": {"log_text": null}
			}"#,
		)
		.unwrap();

		assert_eq!(config.group_size, 5);
		assert!(config.parameters.inherit_all_variables);
		assert_eq!(config.result_files_field, "FileName");
		assert_eq!(config.execution_result_fields.log_text, None);
		assert_eq!(config.execution_result_fields.time.as_deref(), Some("ExecutionTime"));
	}
}
