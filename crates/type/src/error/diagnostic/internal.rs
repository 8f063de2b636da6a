// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use crate::error::diagnostic::Diagnostic;

/// A broken invariant inside rowflow itself, tagged with where it was raised
pub fn internal_at(reason: impl Into<String>, file: &str, line: u32, module: &str) -> Diagnostic {
	Diagnostic::new("INTERNAL_ERROR", format!("internal error: {}", reason.into()))
		.with_label(format!("raised at {}:{}", file, line))
		.with_help("this points at a bug in rowflow, please report it with the step configuration")
		.with_note(format!("in {}", module))
}

/// Same as [`internal_at`] when no location is known
pub fn internal(reason: impl Into<String>) -> Diagnostic {
	internal_at(reason, "<unknown>", 0, "<unknown>")
}

/// Build an internal error diagnostic at the call site
#[macro_export]
macro_rules! internal_error {
	($reason:expr) => {
		$crate::error::diagnostic::internal::internal_at($reason, file!(), line!(), module_path!())
	};
	($fmt:expr, $($arg:tt)*) => {
		$crate::error::diagnostic::internal::internal_at(format!($fmt, $($arg)*), file!(), line!(), module_path!())
	};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_records_call_site() {
		let diagnostic = internal_error!("row set vanished");

		assert_eq!(diagnostic.code, "INTERNAL_ERROR");
		assert_eq!(diagnostic.message, "internal error: row set vanished");
		assert!(diagnostic.label.as_deref().unwrap().contains("internal.rs"));
		assert!(diagnostic.notes[0].contains("internal::tests"));
	}

	#[test]
	fn test_formats_arguments() {
		let diagnostic = internal_error!("lookup {} is not prepared", "customers#0");
		assert!(diagnostic.message.ends_with("lookup customers#0 is not prepared"));
	}

	#[test]
	fn test_without_location() {
		assert_eq!(internal("gone").label.as_deref(), Some("raised at <unknown>:0"));
	}
}
