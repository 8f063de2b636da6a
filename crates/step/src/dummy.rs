// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_core::{Step, StepContext};
use rowflow_type::Result;

/// Passes every row through unchanged.
#[derive(Debug, Default)]
pub struct DummyStep;

impl DummyStep {
	pub fn new() -> Self {
		Self
	}
}

impl Step for DummyStep {
	fn init(&mut self, _ctx: &mut StepContext) -> Result<()> {
		Ok(())
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		let Some((meta, row)) = ctx.get_row() else {
			ctx.set_output_done();
			return Ok(false);
		};

		ctx.put_row(&meta, row)?;
		Ok(true)
	}

	fn dispose(&mut self, _ctx: &mut StepContext) {}
}
