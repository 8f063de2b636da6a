// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use rowflow_core::{Step, StepContext, job::JobResolver};
use rowflow_type::Result;
use serde::{Deserialize, Serialize};

use crate::{
	dummy::DummyStep,
	job_executor::{JobExecutorConfig, JobExecutorStep},
	lookup::{DatabaseLookupConfig, DatabaseLookupStep, StoreConnector},
};

/// Configuration of one step, tagged by its kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
	Dummy,
	JobExecutor(JobExecutorConfig),
	DatabaseLookup(DatabaseLookupConfig),
}

impl StepConfig {
	pub fn kind(&self) -> &'static str {
		match self {
			StepConfig::Dummy => "dummy",
			StepConfig::JobExecutor(_) => "job_executor",
			StepConfig::DatabaseLookup(_) => "database_lookup",
		}
	}

	/// Names of the steps this step addresses directly.
	pub fn targets(&self) -> Vec<&str> {
		match self {
			StepConfig::JobExecutor(config) => config.targets().collect(),
			_ => vec![],
		}
	}
}

/// Every step kind a transformation can run.
pub enum Steps {
	Dummy(DummyStep),
	JobExecutor(JobExecutorStep),
	DatabaseLookup(DatabaseLookupStep),
}

impl Step for Steps {
	fn init(&mut self, ctx: &mut StepContext) -> Result<()> {
		match self {
			Steps::Dummy(step) => step.init(ctx),
			Steps::JobExecutor(step) => step.init(ctx),
			Steps::DatabaseLookup(step) => step.init(ctx),
		}
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		match self {
			Steps::Dummy(step) => step.process_row(ctx),
			Steps::JobExecutor(step) => step.process_row(ctx),
			Steps::DatabaseLookup(step) => step.process_row(ctx),
		}
	}

	fn dispose(&mut self, ctx: &mut StepContext) {
		match self {
			Steps::Dummy(step) => step.dispose(ctx),
			Steps::JobExecutor(step) => step.dispose(ctx),
			Steps::DatabaseLookup(step) => step.dispose(ctx),
		}
	}
}

/// Builds step instances, one per copy, from their configuration.
#[derive(Clone)]
pub struct StepFactory {
	resolver: Arc<dyn JobResolver>,
	connector: Arc<dyn StoreConnector>,
}

impl StepFactory {
	pub fn new(resolver: Arc<dyn JobResolver>, connector: Arc<dyn StoreConnector>) -> Self {
		Self {
			resolver,
			connector,
		}
	}

	pub fn create(&self, config: &StepConfig) -> Steps {
		match config {
			StepConfig::Dummy => Steps::Dummy(DummyStep::new()),
			StepConfig::JobExecutor(config) => {
				Steps::JobExecutor(JobExecutorStep::new(config.clone(), self.resolver.clone()))
			}
			StepConfig::DatabaseLookup(config) => {
				Steps::DatabaseLookup(DatabaseLookupStep::new(config.clone(), self.connector.clone()))
			}
		}
	}
}
