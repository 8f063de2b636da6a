// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod clock;
pub mod error;
pub mod job;
pub mod log;
pub mod result;
pub mod rowset;
pub mod step;
pub mod stop;
pub mod variables;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{JobError, StepError};
pub use log::{LogChannelId, LogContext};
pub use result::{ExecutionResult, ResultFile, ResultFileKind, ResultRow};
pub use rowset::{RowPair, RowSet, StepRef};
pub use step::{Step, StepContext, StepCounters, StepEnvironment, StepState};
pub use stop::StopFlag;
pub use variables::Variables;
