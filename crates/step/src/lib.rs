// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod dummy;
pub mod error;
pub mod grouping;
pub mod job_executor;
pub mod lookup;
pub mod steps;

pub use dummy::DummyStep;
pub use error::LookupError;
pub use grouping::{Group, GroupBuffer, GroupPolicy};
pub use job_executor::{JobExecutorConfig, JobExecutorStep};
pub use lookup::{
	DatabaseLookupConfig, DatabaseLookupStep, KeyField, LookupStore, MemoryConnector, ReturnField, SqliteConnector,
	StoreConnector,
};
pub use steps::{StepConfig, StepFactory, Steps};
