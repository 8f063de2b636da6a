// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::HashMap,
	fmt::{Display, Formatter},
	sync::Arc,
};

use parking_lot::RwLock;
use rowflow_type::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::JobError, job::Job, variables::Variables};

/// How a step refers to the job it runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum JobSpecification {
	Filename {
		filename: String,
	},
	RepositoryByName {
		name: String,
		#[serde(default = "root_directory")]
		directory: String,
	},
	RepositoryByReference {
		reference: String,
	},
}

fn root_directory() -> String {
	"/".to_string()
}

impl JobSpecification {
	/// Resolve variable references in the file name, name and directory.
	pub fn substitute(&self, variables: &Variables) -> JobSpecification {
		match self {
			JobSpecification::Filename {
				filename,
			} => JobSpecification::Filename {
				filename: variables.substitute(filename),
			},
			JobSpecification::RepositoryByName {
				name,
				directory,
			} => JobSpecification::RepositoryByName {
				name: variables.substitute(name),
				directory: variables.substitute(directory),
			},
			JobSpecification::RepositoryByReference {
				reference,
			} => JobSpecification::RepositoryByReference {
				reference: reference.clone(),
			},
		}
	}
}

impl Display for JobSpecification {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			JobSpecification::Filename {
				filename,
			} => write!(f, "file '{}'", filename),
			JobSpecification::RepositoryByName {
				name,
				directory,
			} => write!(f, "'{}' in directory '{}'", name, directory),
			JobSpecification::RepositoryByReference {
				reference,
			} => write!(f, "reference '{}'", reference),
		}
	}
}

/// Turns a [`JobSpecification`] into a runnable job.
pub trait JobResolver: Send + Sync {
	fn resolve(&self, specification: &JobSpecification, variables: &Variables) -> Result<Arc<dyn Job>>;
}

/// In-memory registry of jobs addressable by file name, by name within a
/// directory, or by reference.
#[derive(Default)]
pub struct JobCatalog {
	by_filename: RwLock<HashMap<String, Arc<dyn Job>>>,
	by_name: RwLock<HashMap<(String, String), Arc<dyn Job>>>,
	by_reference: RwLock<HashMap<String, Arc<dyn Job>>>,
}

impl JobCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_file(&self, filename: impl Into<String>, job: Arc<dyn Job>) {
		self.by_filename.write().insert(filename.into(), job);
	}

	pub fn register(&self, directory: &str, job: Arc<dyn Job>) {
		let key = (normalize_directory(directory), job.name().to_string());
		self.by_name.write().insert(key, job);
	}

	pub fn register_reference(&self, reference: impl Into<String>, job: Arc<dyn Job>) {
		self.by_reference.write().insert(reference.into(), job);
	}

	pub fn len(&self) -> usize {
		self.by_filename.read().len() + self.by_name.read().len() + self.by_reference.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl JobResolver for JobCatalog {
	fn resolve(&self, specification: &JobSpecification, variables: &Variables) -> Result<Arc<dyn Job>> {
		let specification = specification.substitute(variables);

		let found = match &specification {
			JobSpecification::Filename {
				filename,
			} => {
				if filename.trim().is_empty() {
					return Err(JobError::InvalidSpecification {
						reason: "file name is empty".to_string(),
					}
					.into());
				}
				self.by_filename.read().get(filename).cloned()
			}
			JobSpecification::RepositoryByName {
				name,
				directory,
			} => {
				if name.trim().is_empty() {
					return Err(JobError::InvalidSpecification {
						reason: "job name is empty".to_string(),
					}
					.into());
				}
				self.by_name.read().get(&(normalize_directory(directory), name.clone())).cloned()
			}
			JobSpecification::RepositoryByReference {
				reference,
			} => self.by_reference.read().get(reference).cloned(),
		};

		match found {
			Some(job) => {
				debug!(job = job.name(), specification = %specification, "job resolved");
				Ok(job)
			}
			None => Err(JobError::NotFound {
				specification: specification.to_string(),
			}
			.into()),
		}
	}
}

fn normalize_directory(directory: &str) -> String {
	let trimmed = directory.trim().trim_end_matches('/');
	if trimmed.starts_with('/') {
		trimmed.to_string()
	} else {
		format!("/{}", trimmed)
	}
}
