// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::{
	Result,
	error::diagnostic::conversion::{conversion_error, date_parse_error},
	return_error,
	value::{Value, ValueType},
};

/// Date layout used when rendering dates as text.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

const DATE_TIME_FORMATS: &[&str] = &[
	"%Y/%m/%d %H:%M:%S%.f",
	"%Y/%m/%d %H:%M:%S",
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%dT%H:%M:%S%.f",
	"%Y-%m-%d %H:%M:%S",
	"%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

pub fn parse_date(text: &str) -> Result<NaiveDateTime> {
	let text = text.trim();

	for format in DATE_TIME_FORMATS {
		if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
			return Ok(parsed);
		}
	}

	for format in DATE_FORMATS {
		if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
			if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
				return Ok(midnight);
			}
		}
	}

	return_error!(date_parse_error(text))
}

fn date_from_millis(millis: i64, source: &Value) -> Result<NaiveDateTime> {
	match DateTime::from_timestamp_millis(millis) {
		Some(dt) => Ok(dt.naive_utc()),
		None => return_error!(conversion_error(source.to_string(), type_name(source), ValueType::Date)),
	}
}

fn type_name(value: &Value) -> &'static str {
	value.value_type().map(|t| t.as_str()).unwrap_or("null")
}

impl Value {
	/// Convert this value to `target`, following the usual ETL conversion
	/// rules. Null converts to null, and an empty string converts to null for
	/// every non-string target.
	pub fn convert_to(&self, target: ValueType) -> Result<Value> {
		if self.is_null() || self.value_type() == Some(target) {
			return Ok(self.clone());
		}

		let fail = || crate::error!(conversion_error(self.to_string(), type_name(self), target));

		let converted = match (self, target) {
			(Value::String(s), _) if s.trim().is_empty() => Value::Null,

			(Value::String(s), ValueType::Integer) => Value::Integer(s.trim().parse().map_err(|_| fail())?),
			(Value::String(s), ValueType::Number) => {
				Value::number(s.trim().parse::<f64>().map_err(|_| fail())?)
			}
			(Value::String(s), ValueType::BigNumber) => {
				Value::BigNumber(BigDecimal::from_str(s.trim()).map_err(|_| fail())?)
			}
			(Value::String(s), ValueType::Boolean) => match s.trim().to_ascii_uppercase().as_str() {
				"Y" | "YES" | "TRUE" | "1" => Value::Boolean(true),
				"N" | "NO" | "FALSE" | "0" => Value::Boolean(false),
				_ => return Err(fail()),
			},
			(Value::String(s), ValueType::Date) => Value::Date(parse_date(s)?),
			(Value::String(s), ValueType::Binary) => Value::Binary(s.as_bytes().to_vec()),

			(Value::Integer(v), ValueType::String) => Value::String(v.to_string()),
			(Value::Integer(v), ValueType::Number) => Value::number(*v as f64),
			(Value::Integer(v), ValueType::BigNumber) => Value::BigNumber(BigDecimal::from(*v)),
			(Value::Integer(v), ValueType::Boolean) => Value::Boolean(*v != 0),
			(Value::Integer(v), ValueType::Date) => Value::Date(date_from_millis(*v, self)?),

			(Value::Number(v), ValueType::String) => Value::String(v.to_string()),
			(Value::Number(v), ValueType::Integer) => {
				let rounded = v.value().round();
				if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
					return Err(fail());
				}
				Value::Integer(rounded as i64)
			}
			(Value::Number(v), ValueType::BigNumber) => {
				Value::BigNumber(BigDecimal::from_f64(v.value()).ok_or_else(fail)?)
			}
			(Value::Number(v), ValueType::Boolean) => Value::Boolean(v.value() != 0.0),
			(Value::Number(v), ValueType::Date) => {
				if !v.value().is_finite() {
					return Err(fail());
				}
				Value::Date(date_from_millis(v.value() as i64, self)?)
			}

			(Value::BigNumber(v), ValueType::String) => Value::String(v.to_string()),
			(Value::BigNumber(v), ValueType::Integer) => Value::Integer(v.to_i64().ok_or_else(fail)?),
			(Value::BigNumber(v), ValueType::Number) => Value::number(v.to_f64().ok_or_else(fail)?),
			(Value::BigNumber(v), ValueType::Boolean) => Value::Boolean(!v.is_zero()),

			(Value::Boolean(v), ValueType::String) => Value::String(if *v { "Y" } else { "N" }.to_string()),
			(Value::Boolean(v), ValueType::Integer) => Value::Integer(*v as i64),
			(Value::Boolean(v), ValueType::Number) => Value::number(if *v { 1.0 } else { 0.0 }),
			(Value::Boolean(v), ValueType::BigNumber) => Value::BigNumber(BigDecimal::from(*v as i64)),

			(Value::Date(v), ValueType::String) => Value::String(v.format(DEFAULT_DATE_FORMAT).to_string()),
			(Value::Date(v), ValueType::Integer) => Value::Integer(v.and_utc().timestamp_millis()),
			(Value::Date(v), ValueType::Number) => Value::number(v.and_utc().timestamp_millis() as f64),
			(Value::Date(v), ValueType::BigNumber) => {
				Value::BigNumber(BigDecimal::from(v.and_utc().timestamp_millis()))
			}

			(Value::Binary(v), ValueType::String) => {
				Value::String(String::from_utf8(v.clone()).map_err(|_| fail())?)
			}

			_ => return Err(fail()),
		};

		Ok(converted)
	}
}
