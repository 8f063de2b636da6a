// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::{Diagnostic, Error, IntoDiagnostic};

use crate::step::StepState;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
	#[error("step '{step}' is not configured correctly: {reason}")]
	InvalidConfiguration {
		step: String,
		reason: String,
	},

	#[error("step '{step}' sends rows to '{target}' which is not connected")]
	TargetNotConnected {
		step: String,
		target: String,
	},

	#[error("field '{field}' required by step '{step}' is not present in its input")]
	FieldNotFound {
		step: String,
		field: String,
	},

	#[error("step '{step}' failed to process a row: {reason}")]
	RowProcessing {
		step: String,
		reason: String,
	},

	#[error("step '{step}' cannot move from {from} to {to}")]
	InvalidTransition {
		step: String,
		from: StepState,
		to: StepState,
	},

	#[error("step '{step}' thread terminated abnormally")]
	Panicked {
		step: String,
	},
}

impl IntoDiagnostic for StepError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			StepError::InvalidConfiguration {
				step,
				reason,
			} => {
				let mut diagnostic = Diagnostic::new("CONFIG_001", message)
					.with_label(reason)
					.with_help("check the step configuration before starting the transformation");
				diagnostic.step = Some(step);
				diagnostic
			}

			StepError::TargetNotConnected {
				step,
				target,
			} => {
				let mut diagnostic = Diagnostic::new("CONFIG_002", message)
					.with_label(format!("no hop from '{}' to '{}'", step, target))
					.with_help("add a hop to the target step or clear the target in the configuration");
				diagnostic.step = Some(step);
				diagnostic
			}

			StepError::FieldNotFound {
				step,
				field,
			} => {
				let mut diagnostic = Diagnostic::new("CONFIG_003", message)
					.with_help(format!("make sure an upstream step produces a field named '{}'", field));
				diagnostic.step = Some(step);
				diagnostic
			}

			StepError::RowProcessing {
				step,
				reason,
			} => {
				let mut diagnostic = Diagnostic::new("ROW_001", message).with_label(reason);
				diagnostic.step = Some(step);
				diagnostic
			}

			StepError::InvalidTransition {
				step,
				..
			} => {
				let mut diagnostic = Diagnostic::new("INTERNAL_ERROR", message)
					.with_help("This is an internal error that should never occur in normal operation.");
				diagnostic.step = Some(step);
				diagnostic
			}

			StepError::Panicked {
				step,
			} => {
				let mut diagnostic = Diagnostic::new("INTERNAL_ERROR", message);
				diagnostic.step = Some(step);
				diagnostic
			}
		}
	}
}

impl From<StepError> for Error {
	fn from(err: StepError) -> Self {
		Error::new(err.into_diagnostic())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("job {specification} could not be found")]
	NotFound {
		specification: String,
	},

	#[error("job specification is invalid: {reason}")]
	InvalidSpecification {
		reason: String,
	},

	#[error("job '{job}' failed in entry '{entry}': {reason}")]
	EntryFailed {
		job: String,
		entry: String,
		reason: String,
	},
}

impl IntoDiagnostic for JobError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			JobError::NotFound {
				..
			} => Diagnostic::new("JOB_001", message)
				.with_help("register the job in the catalog or fix the file name, name or reference"),

			JobError::InvalidSpecification {
				..
			} => Diagnostic::new("JOB_002", message),

			JobError::EntryFailed {
				entry,
				..
			} => Diagnostic::new("JOB_003", message).with_label(format!("in entry '{}'", entry)),
		}
	}
}

impl From<JobError> for Error {
	fn from(err: JobError) -> Self {
		Error::new(err.into_diagnostic())
	}
}
