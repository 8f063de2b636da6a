// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use crate::{error::diagnostic::Diagnostic, row::RowMeta, value::ValueType};

/// A row was written to a channel whose schema was already fixed by an
/// earlier row with different metadata
pub fn row_meta_mismatch(channel: impl Into<String>, expected: &RowMeta, actual: &RowMeta) -> Diagnostic {
	Diagnostic::new("SCHEMA_001", format!("row layout changed on channel {}", channel.into()))
		.with_label(format!("expected [{}], got [{}]", expected, actual))
		.with_help("every row written to one channel must share the layout of the first row")
}

/// A field declared with one type carried a value of another type
pub fn field_type_mismatch(
	field: impl Into<String>,
	expected: ValueType,
	actual: Option<ValueType>,
) -> Diagnostic {
	let actual = actual.map(|t| t.to_string()).unwrap_or_else(|| "a missing field".to_string());
	Diagnostic::new(
		"SCHEMA_002",
		format!("field '{}' is declared as {} but the value is {}", field.into(), expected, actual),
	)
	.with_help("declare the field with the type the producer actually delivers; values are never coerced here")
}

/// A row carried a different number of values than its metadata declares
pub fn row_arity_mismatch(expected: usize, actual: usize) -> Diagnostic {
	Diagnostic::new("SCHEMA_003", format!("row has {} values but its layout declares {} fields", actual, expected))
}
