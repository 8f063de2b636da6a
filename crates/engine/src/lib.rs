// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod config;
pub mod error;
pub mod execution;
pub mod handle;
pub mod transformation;

pub use config::{EngineConfig, Hop, StepDefinition, TransformationConfig};
pub use error::EngineError;
pub use execution::{Execution, ExecutionSummary};
pub use handle::{RowCollector, RowProducer};
pub use transformation::{EngineServices, PreparedTransformation, Transformation};
