// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

/// Wrap a diagnostic into an [`Error`](crate::error::Error).
#[macro_export]
macro_rules! error {
	($diagnostic:expr) => {
		$crate::error::Error::new($diagnostic)
	};
}

/// Wrap a diagnostic into an `Err` result.
#[macro_export]
macro_rules! err {
	($diagnostic:expr) => {
		Err($crate::error!($diagnostic))
	};
}

/// Return early with the given diagnostic.
#[macro_export]
macro_rules! return_error {
	($diagnostic:expr) => {
		return $crate::err!($diagnostic)
	};
}
