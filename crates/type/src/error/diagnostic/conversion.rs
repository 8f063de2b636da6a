// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use crate::{error::diagnostic::Diagnostic, value::ValueType};

/// A value could not be converted into the requested type
pub fn conversion_error(value: impl Into<String>, from: &str, to: ValueType) -> Diagnostic {
	let value = value.into();
	Diagnostic::new("TYPE_001", format!("cannot convert {} value '{}' to {}", from, value, to))
		.with_label(format!("expected {}", to))
		.with_help(format!("make sure the value can be represented as {}", to))
}

/// A textual date did not match any of the accepted formats
pub fn date_parse_error(value: impl Into<String>) -> Diagnostic {
	Diagnostic::new("TYPE_002", format!("cannot parse '{}' as a date", value.into()))
		.with_help("use 'yyyy/MM/dd HH:mm:ss.SSS', 'yyyy-MM-dd HH:mm:ss' or 'yyyy-MM-dd'")
}

/// A type name in a configuration is not known
pub fn unknown_type(name: impl Into<String>) -> Diagnostic {
	Diagnostic::new("TYPE_003", format!("unknown value type '{}'", name.into())).with_help(
		"valid types are string, integer, number, boolean, date, binary and bignumber",
	)
}
