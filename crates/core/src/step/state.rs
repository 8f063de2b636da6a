// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Lifecycle of one step copy.
///
/// ```text
/// Created -> Initialized -> Running -> Done
///                           Running -> Stopping -> Done
/// any state -> Failed -> Done
/// ```
///
/// An initialized copy that never gets to run, because another copy failed to
/// initialize, goes straight to `Done` when it is disposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepState {
	Created,
	Initialized,
	Running,
	Stopping,
	Failed,
	Done,
}

impl StepState {
	pub fn can_transition_to(&self, next: StepState) -> bool {
		use StepState::*;

		matches!(
			(self, next),
			(Created, Initialized)
				| (Created, Failed)
				| (Initialized, Running)
				| (Initialized, Done)
				| (Initialized, Failed)
				| (Running, Stopping)
				| (Running, Done)
				| (Running, Failed)
				| (Stopping, Done)
				| (Stopping, Failed)
				| (Failed, Done)
		)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, StepState::Done)
	}
}

impl Display for StepState {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			StepState::Created => "created",
			StepState::Initialized => "initialized",
			StepState::Running => "running",
			StepState::Stopping => "stopping",
			StepState::Failed => "failed",
			StepState::Done => "done",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_normal_path() {
		assert!(StepState::Created.can_transition_to(StepState::Initialized));
		assert!(StepState::Initialized.can_transition_to(StepState::Running));
		assert!(StepState::Running.can_transition_to(StepState::Done));
	}

	#[test]
	fn test_any_state_can_fail() {
		for state in [StepState::Created, StepState::Initialized, StepState::Running, StepState::Stopping] {
			assert!(state.can_transition_to(StepState::Failed), "{} -> failed", state);
		}
		assert!(StepState::Failed.can_transition_to(StepState::Done));
	}

	#[test]
	fn test_invalid_transitions() {
		assert!(!StepState::Created.can_transition_to(StepState::Running));
		assert!(!StepState::Done.can_transition_to(StepState::Running));
		assert!(!StepState::Failed.can_transition_to(StepState::Running));
		assert!(!StepState::Stopping.can_transition_to(StepState::Running));
	}
}
