// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::{Diagnostic, Error, IntoDiagnostic};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	#[error("step '{step}' is defined more than once")]
	DuplicateStep {
		step: String,
	},

	#[error("{context} refers to unknown step '{step}'")]
	UnknownStep {
		context: String,
		step: String,
	},

	#[error("step '{step}' must run at least one copy")]
	NoCopies {
		step: String,
	},

	#[error("invalid hop {from} -> {to}: {reason}")]
	InvalidHop {
		from: String,
		to: String,
		reason: String,
	},

	#[error("invalid transformation definition: {reason}")]
	InvalidDefinition {
		reason: String,
	},

	#[error("step '{step}' already writes to other steps and cannot be collected")]
	OutputTaken {
		step: String,
	},
}

impl IntoDiagnostic for EngineError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			EngineError::DuplicateStep {
				..
			} => Diagnostic::new("CONFIG_004", message).with_help("give every step a unique name"),

			EngineError::UnknownStep {
				step,
				..
			} => Diagnostic::new("CONFIG_005", message).with_label(format!("no step named '{}'", step)),

			EngineError::NoCopies {
				..
			} => Diagnostic::new("CONFIG_006", message),

			EngineError::InvalidHop {
				reason,
				..
			} => Diagnostic::new("CONFIG_007", message).with_label(reason),

			EngineError::InvalidDefinition {
				reason,
			} => Diagnostic::new("CONFIG_008", message).with_label(reason),

			EngineError::OutputTaken {
				..
			} => Diagnostic::new("CONFIG_009", message)
				.with_help("collect from a step without outgoing hops, or add a dummy step after it"),
		}
	}
}

impl From<EngineError> for Error {
	fn from(err: EngineError) -> Self {
		Error::new(err.into_diagnostic())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes() {
		let err: Error = EngineError::UnknownStep {
			context: "hop lookup -> out".to_string(),
			step: "out".to_string(),
		}
		.into();
		assert_eq!(err.code(), "CONFIG_005");
		assert_eq!(err.message, "hop lookup -> out refers to unknown step 'out'");

		let err: Error = EngineError::NoCopies {
			step: "lookup".to_string(),
		}
		.into();
		assert_eq!(err.code(), "CONFIG_006");

		let err: Error = EngineError::OutputTaken {
			step: "lookup".to_string(),
		}
		.into();
		assert_eq!(err.code(), "CONFIG_009");
		assert!(err.help.is_some());
	}
}
