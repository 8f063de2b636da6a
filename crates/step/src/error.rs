// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::{Diagnostic, Error, IntoDiagnostic};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
	#[error("connection '{connection}' is not configured")]
	UnknownConnection {
		connection: String,
	},

	#[error("cannot open connection '{connection}': {reason}")]
	ConnectionFailed {
		connection: String,
		reason: String,
	},

	#[error("table '{table}' does not exist")]
	TableNotFound {
		table: String,
	},

	#[error("column '{column}' does not exist in table '{table}'")]
	ColumnNotFound {
		table: String,
		column: String,
	},

	#[error("lookup in table '{table}' failed: {reason}")]
	QueryFailed {
		table: String,
		reason: String,
	},

	#[error("lookup in table '{table}' returned more than one row")]
	MultipleResults {
		table: String,
	},
}

impl IntoDiagnostic for LookupError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			LookupError::UnknownConnection {
				..
			} => Diagnostic::new("STORE_001", message)
				.with_help("register the connection with the store connector used by the transformation"),

			LookupError::ConnectionFailed {
				reason,
				..
			} => Diagnostic::new("STORE_002", message).with_label(reason),

			LookupError::TableNotFound {
				..
			} => Diagnostic::new("STORE_003", message).with_help("check the table name of the lookup"),

			LookupError::ColumnNotFound {
				column,
				..
			} => Diagnostic::new("STORE_004", message).with_label(format!("unknown column '{}'", column)),

			LookupError::QueryFailed {
				reason,
				..
			} => Diagnostic::new("STORE_005", message).with_label(reason),

			LookupError::MultipleResults {
				..
			} => Diagnostic::new("STORE_006", message)
				.with_help("tighten the key conditions or disable failing on multiple results"),
		}
	}
}

impl From<LookupError> for Error {
	fn from(err: LookupError) -> Self {
		Error::new(err.into_diagnostic())
	}
}
