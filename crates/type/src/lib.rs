// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod error;
pub mod row;
pub mod value;

pub use error::{Diagnostic, Error, IntoDiagnostic};
pub use row::{FieldMeta, Row, RowMeta};
pub use value::{DEFAULT_DATE_FORMAT, OrderedF64, Value, ValueType, parse_date};

pub type Result<T> = std::result::Result<T, Error>;
