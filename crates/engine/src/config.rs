// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::BTreeMap, time::Duration};

use rowflow_step::StepConfig;
use rowflow_type::Result;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const DEFAULT_ROW_SET_SIZE: usize = 10_000;
pub const DEFAULT_ROW_WAIT_TIMEOUT_MS: u64 = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformationConfig {
	pub name: String,
	pub steps: Vec<StepDefinition>,
	#[serde(default)]
	pub hops: Vec<Hop>,
	#[serde(default)]
	pub engine: EngineConfig,
	/// Variables every step starts with
	#[serde(default)]
	pub variables: BTreeMap<String, String>,
}

impl TransformationConfig {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			steps: vec![],
			hops: vec![],
			engine: EngineConfig::default(),
			variables: BTreeMap::new(),
		}
	}

	pub fn from_json(json: &str) -> Result<Self> {
		serde_json::from_str(json).map_err(|err| {
			EngineError::InvalidDefinition {
				reason: err.to_string(),
			}
			.into()
		})
	}

	pub fn with_step(mut self, step: StepDefinition) -> Self {
		self.steps.push(step);
		self
	}

	pub fn with_hop(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
		self.hops.push(Hop {
			from: from.into(),
			to: to.into(),
		});
		self
	}

	pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.variables.insert(name.into(), value.into());
		self
	}

	pub fn step(&self, name: &str) -> Option<&StepDefinition> {
		self.steps.iter().find(|s| s.name == name)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
	pub name: String,
	#[serde(default = "default_copies")]
	pub copies: usize,
	#[serde(flatten)]
	pub config: StepConfig,
}

fn default_copies() -> usize {
	1
}

impl StepDefinition {
	pub fn new(name: impl Into<String>, config: StepConfig) -> Self {
		Self {
			name: name.into(),
			copies: 1,
			config,
		}
	}

	pub fn with_copies(mut self, copies: usize) -> Self {
		self.copies = copies;
		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
	pub from: String,
	pub to: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Capacity of every row set
	pub row_set_size: usize,
	pub row_wait_timeout_ms: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			row_set_size: DEFAULT_ROW_SET_SIZE,
			row_wait_timeout_ms: DEFAULT_ROW_WAIT_TIMEOUT_MS,
		}
	}
}

impl EngineConfig {
	pub fn row_wait_timeout(&self) -> Duration {
		Duration::from_millis(self.row_wait_timeout_ms.max(1))
	}
}
