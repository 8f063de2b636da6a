// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod conversion;
pub mod internal;
pub mod schema;

/// Structured description of a failure, rendered for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub code: String,
	pub message: String,
	/// Step the failure surfaced in, when known
	pub step: Option<String>,
	pub label: Option<String>,
	pub help: Option<String>,
	pub notes: Vec<String>,
	pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
	pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			message: message.into(),
			step: None,
			label: None,
			help: None,
			notes: vec![],
			cause: None,
		}
	}

	pub fn with_help(mut self, help: impl Into<String>) -> Self {
		self.help = Some(help.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_note(mut self, note: impl Into<String>) -> Self {
		self.notes.push(note.into());
		self
	}

	pub fn with_cause(mut self, cause: Diagnostic) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}
}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match &self.step {
			Some(step) => write!(f, "[{}] {}: {}", self.code, step, self.message)?,
			None => write!(f, "[{}] {}", self.code, self.message)?,
		}

		if let Some(label) = &self.label {
			write!(f, " ({})", label)?;
		}

		if let Some(help) = &self.help {
			write!(f, "\n  help: {}", help)?;
		}

		for note in &self.notes {
			write!(f, "\n  note: {}", note)?;
		}

		if let Some(cause) = &self.cause {
			write!(f, "\n  caused by: {}", cause)?;
		}

		Ok(())
	}
}

pub trait IntoDiagnostic {
	fn into_diagnostic(self) -> Diagnostic;
}
